// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keys handed to the tool: the PEM signing secret and the x-only key the
//! device is expected to report.

use {
    consts::PUBKEY_SIZE,
    sec1::der::Decode,
    std::path::{Path, PathBuf},
};

const PEM_TAG: &str = "EC PRIVATE KEY";

/// Load a SEC1 secp256k1 secret from a PEM file.
pub fn load_secret(path: &Path) -> Result<secp256k1::SecretKey, KeyError> {
    let text = std::fs::read(path).map_err(|e| KeyError::Read(path.to_owned(), e))?;
    let block = pem::parse(text).map_err(KeyError::Pem)?;
    if block.tag() != PEM_TAG {
        return Err(KeyError::WrongBlock(block.tag().to_owned()));
    }

    let sec1 = sec1::EcPrivateKey::from_der(block.contents()).map_err(KeyError::Sec1)?;
    secp256k1::SecretKey::from_slice(sec1.private_key).map_err(KeyError::Secret)
}

/// Decode 64 hex digits into an x-only public key.
pub fn parse_pubkey(text: &str) -> Result<[u8; PUBKEY_SIZE], KeyError> {
    let bytes = hex::decode(text).map_err(|_| KeyError::PubkeyHex)?;
    let pubkey: [u8; PUBKEY_SIZE] = bytes.try_into().map_err(|_| KeyError::PubkeyHex)?;
    secp256k1::XOnlyPublicKey::from_slice(&pubkey).map_err(KeyError::Pubkey)?;
    Ok(pubkey)
}

#[derive(Debug)]
pub enum KeyError {
    Read(PathBuf, std::io::Error),
    Pem(pem::PemError),
    WrongBlock(String),
    Sec1(sec1::der::Error),
    Secret(secp256k1::Error),
    PubkeyHex,
    Pubkey(secp256k1::Error),
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::Read(path, e) => write!(f, "cannot read secret key {}: {e}", path.display()),
            KeyError::Pem(e) => write!(f, "secret key is not a PEM file: {e}"),
            KeyError::WrongBlock(tag) => write!(f, r#"PEM block is "{tag}", not an {PEM_TAG}"#),
            KeyError::Sec1(e) => write!(f, "malformed SEC1 key in PEM file: {e}"),
            KeyError::Secret(e) => write!(f, "secret key out of range: {e}"),
            KeyError::PubkeyHex => write!(f, "public key must be 64 hex digits"),
            KeyError::Pubkey(e) => write!(f, "not an x-only secp256k1 public key: {e}"),
        }
    }
}

impl std::error::Error for KeyError {}
