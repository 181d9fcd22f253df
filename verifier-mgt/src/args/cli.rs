// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command line arguments.

use std::path::PathBuf;

#[derive(clap::Parser)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    /// Path to config file.
    #[clap(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// Increase log output, may be repeated.
    #[clap(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Options for commands talking to a device.
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Serial port of the device.
    #[clap(long, short, env = "VERIFIER_PORT")]
    pub port: Option<String>,
    /// Serial port speed.
    #[clap(long)]
    pub baudrate: Option<u32>,
    /// Do not expect the serial port to disappear when the device resets.
    #[clap(long)]
    pub no_expect_close: bool,
    /// The x-only public key in hex the device must report before anything
    /// is sent to it.
    #[clap(long)]
    pub pubkey: Option<String>,
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Print the x-only public key of a secret key.
    Pubkey {
        /// Path to PEM-encoded secret key.
        #[clap(long)]
        secret: Option<PathBuf>,
        /// Write the key to this file instead of stdout.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Sign an app binary.
    Sign {
        /// The app binary.
        #[clap(short, long)]
        input: PathBuf,
        /// Path to PEM-encoded secret key.
        #[clap(long)]
        secret: Option<PathBuf>,
        /// Write the signature to this file instead of stdout.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the digest of an app binary.
    Digest {
        /// The app binary.
        #[clap(short, long)]
        input: PathBuf,
    },
    /// Read the public key the verifier trusts.
    GetPubkey {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Replace the app stored on the device.
    Install {
        /// The app binary.
        #[clap(short, long)]
        input: PathBuf,
        /// Signature file written by `sign`.
        #[clap(long)]
        sig: PathBuf,
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Ask the verifier to accept an app the client will load.
    Boot {
        /// The app binary.
        #[clap(short, long)]
        input: PathBuf,
        /// Signature file written by `sign`.
        #[clap(long)]
        sig: PathBuf,
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Reset the device.
    Reset {
        /// What the firmware starts after the reset.
        #[clap(long = "type", value_enum, default_value_t = ResetType::StartFlash0)]
        kind: ResetType,
        /// What the verifier does once it runs.
        #[clap(long, value_enum, default_value_t = Destination::CommandMode)]
        dst: Destination,
        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    StartDefault,
    StartFlash0,
    StartFlash1,
    StartFlash0Ver,
    StartFlash1Ver,
    StartClient,
    StartClientVer,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    App1,
    CommandMode,
}
