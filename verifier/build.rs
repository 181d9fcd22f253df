// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Turns the `VERIFIER_TRUSTED_PUBKEY` environment variable (64 hex digits,
//! a BIP-340 x-only public key) into a constant compiled into the verifier.
//! Without the variable a well known development key is used, which must
//! never end up on a production device.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

const PUBKEY_ENV: &str = "VERIFIER_TRUSTED_PUBKEY";

// x coordinate of the secp256k1 generator point
const DEV_PUBKEY: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

fn main() {
    println!("cargo:rerun-if-env-changed={PUBKEY_ENV}");

    let (hex_key, dev) = match env::var(PUBKEY_ENV) {
        Ok(key) => (key, false),
        Err(_) => (DEV_PUBKEY.to_owned(), true),
    };
    if dev {
        println!("cargo:warning={PUBKEY_ENV} not set, using the development key");
    }

    let key: [u8; 32] = hex::decode(hex_key.trim())
        .unwrap_or_else(|e| panic!("{PUBKEY_ENV} is not valid hex: {e}"))
        .try_into()
        .unwrap_or_else(|v: Vec<u8>| panic!("{PUBKEY_ENV} must be 32 bytes, got {}", v.len()));

    let content = format!(
        "/// Public key every app signature is checked against.\n\
         pub const TRUSTED_PUBKEY: [u8; 32] = {key:?};\n\
         /// Set when [`TRUSTED_PUBKEY`] is the development key.\n\
         pub const TRUSTED_PUBKEY_IS_DEV: bool = {dev};\n"
    );

    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("trusted_pubkey.rs"))
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
}
