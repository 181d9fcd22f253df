// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use {
    colored::Colorize,
    consts::{DIGEST_SIZE, PUBKEY_SIZE, SIGNATURE_SIZE},
    std::{
        ffi::OsString,
        io::Write,
        path::{Path, PathBuf},
    },
    tracing_subscriber::{fmt, prelude::*, EnvFilter},
    verifier::{crypto::Sha256, verify::Hasher},
};

mod args;
mod client;

#[cfg(test)]
mod tests;

fn main() -> std::process::ExitCode {
    main_args(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .into()
}

fn main_args<I, T>(args: I, stdout: impl Write, mut stderr: impl Write) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match run(args, stdout) {
        Ok(()) => ExitCode(0),
        Err(Error::Args(e @ args::Error::Cli(_))) => {
            // Clap already does the "error: {}" formatting.
            writeln!(stderr, "{e}").expect("write error to stderr");
            ExitCode(1)
        }
        Err(e) => {
            writeln!(stderr, "{} {e}", "error:".bold().red()).expect("write error to stderr");
            ExitCode(1)
        }
    }
}

fn run<I, T>(args: I, mut stdout: impl Write) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = args::args(args)?;
    init_tracing(args.verbose);

    match args.command {
        args::Command::Pubkey { secret, output } => {
            let pubkey = Schnorr::new(secret).pubkey();
            emit(&mut stdout, output.as_deref(), &hex::encode(pubkey))?;
        }
        args::Command::Sign {
            input,
            secret,
            output,
        } => {
            let app = std::fs::read(&input).map_err(Error::ReadInputFile)?;
            let signature = Schnorr::new(secret).sign(&Sha256.hash(&app));
            emit(&mut stdout, output.as_deref(), &hex::encode(signature))?;
        }
        args::Command::Digest { input } => {
            let app = std::fs::read(&input).map_err(Error::ReadInputFile)?;
            writeln!(&mut stdout, "{}", hex::encode(Sha256.hash(&app))).map_err(Error::Stdout)?;
        }
        args::Command::GetPubkey { device } => {
            let pubkey = open(&device)?.client().get_pubkey()?;
            writeln!(&mut stdout, "{}", hex::encode(pubkey)).map_err(Error::Stdout)?;
            if device.pubkey.is_some_and(|expected| expected != pubkey) {
                writeln!(&mut stdout, "{}", "not the expected key".bold().yellow())
                    .map_err(Error::Stdout)?;
            }
        }
        args::Command::Install { input, sig, device } => {
            let app = std::fs::read(&input).map_err(Error::ReadInputFile)?;
            let signature = read_signature(&sig)?;
            open(&device)?.install(&app, &signature, device.pubkey)?;
            writeln!(&mut stdout, "{}", "app installed".bold()).map_err(Error::Stdout)?;
        }
        args::Command::Boot { input, sig, device } => {
            let app = std::fs::read(&input).map_err(Error::ReadInputFile)?;
            let signature = read_signature(&sig)?;
            open(&device)?.boot(&app, &signature, device.pubkey)?;
            writeln!(&mut stdout, "{}", "app accepted".bold()).map_err(Error::Stdout)?;
        }
        args::Command::Reset { kind, dst, device } => {
            open(&device)?.client().reset(kind, dst)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Tests run the whole program more than once per process.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn open(
    device: &args::Device,
) -> Result<client::Session<client::SerialConnector>, client::Error> {
    client::Session::open(
        client::SerialConnector {
            path: device.port.clone(),
            baudrate: device.baudrate,
        },
        device.expect_close,
        client::Delays::default(),
    )
}

/// Write `text` to `output`, or to stdout when no file is given.
fn emit(stdout: &mut impl Write, output: Option<&Path>, text: &str) -> Result<(), Error> {
    match output {
        Some(path) => std::fs::write(path, format!("{text}\n")).map_err(Error::WriteOutputFile),
        None => writeln!(stdout, "{text}").map_err(Error::Stdout),
    }
}

/// Signature files hold the signature as one line of hex.
fn read_signature(path: &Path) -> Result<[u8; SIGNATURE_SIZE], Error> {
    let text = std::fs::read_to_string(path).map_err(Error::ReadSignatureFile)?;
    hex::decode(text.trim())
        .ok()
        .and_then(|sig| sig.try_into().ok())
        .ok_or_else(|| Error::InvalidSignatureFile(path.to_owned()))
}

/// BIP-340 signing, the counterpart of the verifier's check.
#[derive(Debug)]
struct Schnorr {
    secp256k1: secp256k1::Secp256k1<secp256k1::All>,
    keypair: secp256k1::Keypair,
}

impl Schnorr {
    fn new(secret: secp256k1::SecretKey) -> Self {
        let secp256k1 = secp256k1::Secp256k1::new();
        let keypair = secp256k1::Keypair::from_secret_key(&secp256k1, &secret);
        Self { secp256k1, keypair }
    }

    fn pubkey(&self) -> [u8; PUBKEY_SIZE] {
        self.keypair.x_only_public_key().0.serialize()
    }

    fn sign(&self, digest: &[u8; DIGEST_SIZE]) -> [u8; SIGNATURE_SIZE] {
        self.secp256k1
            .sign_schnorr_no_aux_rand(&secp256k1::Message::from_digest(*digest), &self.keypair)
            .serialize()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExitCode(u8);

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        code.0.into()
    }
}

#[derive(Debug)]
enum Error {
    Args(args::Error),
    Client(client::Error),
    InvalidSignatureFile(PathBuf),
    ReadInputFile(std::io::Error),
    ReadSignatureFile(std::io::Error),
    Stdout(std::io::Error),
    WriteOutputFile(std::io::Error),
}

impl From<args::Error> for Error {
    fn from(e: args::Error) -> Self {
        Error::Args(e)
    }
}

impl From<client::Error> for Error {
    fn from(e: client::Error) -> Self {
        Error::Client(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Args(e) => write!(f, "{e}"),
            Error::Client(e) => write!(f, "{e}"),
            Error::InvalidSignatureFile(path) => write!(
                f,
                r#"signature file "{}" does not hold {SIGNATURE_SIZE} bytes of hex"#,
                path.display()
            ),
            Error::ReadInputFile(e) => write!(f, "failed to read input file: {e}"),
            Error::ReadSignatureFile(e) => write!(f, "failed to read signature file: {e}"),
            Error::Stdout(e) => write!(f, "failed to write to stdout: {e}"),
            Error::WriteOutputFile(e) => write!(f, "failed to write to output file: {e}"),
        }
    }
}

impl std::error::Error for Error {}
