// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Optional TOML config file.
//!
//! ```toml
//! secret = "/home/me/keys/app-signing.pem"
//!
//! [device]
//! port = "/dev/ttyACM0"
//! baudrate = 62500
//! pubkey = "71a3e606578281f6bcb461a8ada671829c3348b688787c68baa75ad51916edfc"
//! expect_close = true
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Absolute path of the PEM signing key.
    pub secret: Option<PathBuf>,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub port: Option<String>,
    pub baudrate: Option<u32>,
    /// Hex x-only key the device is expected to trust.
    pub pubkey: Option<String>,
    pub expect_close: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Read(path.to_owned(), e))?;
        toml::from_str(&text).map_err(|e| Error::Parse(path.to_owned(), e))
    }
}

#[derive(Debug)]
pub enum Error {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Read(path, e) => write!(f, "failed to read {}: {e}", path.display()),
            Error::Parse(path, e) => write!(f, "invalid TOML in {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for Error {}
