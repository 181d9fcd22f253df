// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use consts::PUBKEY_SIZE;

include!(concat!(env!("OUT_DIR"), "/trusted_pubkey.rs"));

/// What goes into the measurement handed to the next app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementPolicy {
    /// Hash of the trusted public key
    #[default]
    Pubkey,
    /// Hash of the trusted public key followed by the app digest
    PubkeyAndDigest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VerifierConfig {
    /// Key every app signature is checked against, on boot and on client request
    pub trusted_pubkey: [u8; PUBKEY_SIZE],
    pub measurement: MeasurementPolicy,
    /// Serve client commands right away instead of looking at the reset data
    pub start_in_command_mode: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            trusted_pubkey: TRUSTED_PUBKEY,
            measurement: MeasurementPolicy::default(),
            start_in_command_mode: cfg!(feature = "boot-into-command-mode"),
        }
    }
}
