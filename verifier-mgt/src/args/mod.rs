// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use {
    clap::Parser,
    consts::{PUBKEY_SIZE, SERIAL_SPEED},
    frame_protocol::{NextApp, ResetType},
    key::{load_secret, parse_pubkey},
    std::path::PathBuf,
};

mod cli;
mod config;
mod key;

pub use {config::Error as ConfigError, key::KeyError};

/// Command line merged with the config file.
#[derive(Debug, Clone)]
pub struct Args {
    /// Number of `-v` flags.
    pub verbose: u8,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    /// Print the public key of a secret key.
    Pubkey {
        secret: secp256k1::SecretKey,
        output: Option<PathBuf>,
    },
    /// Sign an app binary.
    Sign {
        input: PathBuf,
        secret: secp256k1::SecretKey,
        output: Option<PathBuf>,
    },
    /// Print the digest of an app binary.
    Digest { input: PathBuf },
    /// Read the key the verifier trusts.
    GetPubkey { device: Device },
    /// Upload a signed app to the device.
    Install {
        input: PathBuf,
        sig: PathBuf,
        device: Device,
    },
    /// Have the verifier check a signed app for the client.
    Boot {
        input: PathBuf,
        sig: PathBuf,
        device: Device,
    },
    /// Reset the device.
    Reset {
        kind: ResetType,
        dst: NextApp,
        device: Device,
    },
}

/// Where and how to reach the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub port: String,
    pub baudrate: u32,
    pub expect_close: bool,
    pub pubkey: Option<[u8; PUBKEY_SIZE]>,
}

pub fn args<I, T>(args: I) -> Result<Args, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Args::try_parse_from(args).map_err(Error::Cli)?;
    let config = match &cli.config {
        Some(path) => config::Config::load(path)?,
        None => config::Config::default(),
    };

    let command = match cli.command {
        cli::Command::Pubkey { secret, output } => {
            let secret = load_secret(&secret_path(secret, &config)?)?;
            Command::Pubkey { secret, output }
        }
        cli::Command::Sign { input, secret, output } => {
            let secret = load_secret(&secret_path(secret, &config)?)?;
            Command::Sign { input, secret, output }
        }
        cli::Command::Digest { input } => Command::Digest { input },
        cli::Command::GetPubkey { device } => Command::GetPubkey {
            device: device_args(device, &config)?,
        },
        cli::Command::Install { input, sig, device } => Command::Install {
            input,
            sig,
            device: device_args(device, &config)?,
        },
        cli::Command::Boot { input, sig, device } => Command::Boot {
            input,
            sig,
            device: device_args(device, &config)?,
        },
        cli::Command::Reset { kind, dst, device } => Command::Reset {
            kind: match kind {
                cli::ResetType::StartDefault => ResetType::StartDefault,
                cli::ResetType::StartFlash0 => ResetType::StartFlash0,
                cli::ResetType::StartFlash1 => ResetType::StartFlash1,
                cli::ResetType::StartFlash0Ver => ResetType::StartFlash0Ver,
                cli::ResetType::StartFlash1Ver => ResetType::StartFlash1Ver,
                cli::ResetType::StartClient => ResetType::StartClient,
                cli::ResetType::StartClientVer => ResetType::StartClientVer,
            },
            dst: match dst {
                cli::Destination::App1 => NextApp::BootApp1,
                cli::Destination::CommandMode => NextApp::WaitForCommand,
            },
            device: device_args(device, &config)?,
        },
    };

    Ok(Args {
        verbose: cli.verbose,
        command,
    })
}

/// Pick one of a CLI value and a config value, refusing both.
fn either<T>(name: &'static str, cli: Option<T>, config: Option<T>) -> Result<Option<T>, Error> {
    match (cli, config) {
        (Some(_), Some(_)) => Err(Error::Conflict(name)),
        (cli, config) => Ok(cli.or(config)),
    }
}

fn secret_path(cli: Option<PathBuf>, config: &config::Config) -> Result<PathBuf, Error> {
    if let (None, Some(path)) = (&cli, &config.secret) {
        if !path.is_absolute() {
            return Err(Error::SecretNotAbsolute(path.clone()));
        }
    }
    either("secret", cli, config.secret.clone())?.ok_or(Error::SecretMissing)
}

fn device_args(cli: cli::DeviceArgs, config: &config::Config) -> Result<Device, Error> {
    let dev = &config.device;
    let port = either("port", cli.port, dev.port.clone())?.ok_or(Error::PortMissing)?;
    let baudrate = either("baudrate", cli.baudrate, dev.baudrate)?.unwrap_or(SERIAL_SPEED);
    // The flag can only switch expect_close off
    let no_expect_close = cli.no_expect_close.then_some(false);
    let expect_close = either("expect_close (--no-expect-close)", no_expect_close, dev.expect_close)?
        .unwrap_or(true);
    let pubkey = either("pubkey", cli.pubkey, dev.pubkey.clone())?
        .map(|text| parse_pubkey(&text))
        .transpose()?;

    Ok(Device {
        port,
        baudrate,
        expect_close,
        pubkey,
    })
}

#[derive(Debug)]
pub enum Error {
    Cli(clap::Error),
    Config(ConfigError),
    /// A setting was given both on the command line and in the config file.
    Conflict(&'static str),
    Key(KeyError),
    PortMissing,
    SecretMissing,
    SecretNotAbsolute(PathBuf),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<KeyError> for Error {
    fn from(e: KeyError) -> Self {
        Error::Key(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Cli(e) => write!(f, "{}", e.render().ansi()),
            Error::Config(e) => write!(f, "{e}"),
            Error::Conflict(name) => {
                write!(f, "{name} given both in the config file and on the command line")
            }
            Error::Key(e) => write!(f, "{e}"),
            Error::PortMissing => {
                write!(f, "no serial port: pass --port or set port under [device] in the config file")
            }
            Error::SecretMissing => {
                write!(f, "no secret key: pass --secret or set secret in the config file")
            }
            Error::SecretNotAbsolute(path) => {
                write!(f, "secret key path in the config file must be absolute: {}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}
