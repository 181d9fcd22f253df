// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Secure boot verifier and app update controller.
//!
//! On every start the verifier either checks the app in the preload slot
//! against the trusted public key and resets into it, or serves a client
//! that can read the key, ask for an app to be verified and booted, reset
//! the device, or replace the app. Anything unexpected halts the device.
//!
//! Hardware and firmware services come in through the traits in
//! [`platform`], client bytes through a [`FrameTransport`](transport::FrameTransport).

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible everywhere
mod fmt;

pub mod boot;
pub mod command;
pub mod config;
pub mod crypto;
mod error;
pub mod platform;
pub mod transport;
pub mod update;
pub mod verify;
pub mod write_app;

#[cfg(test)]
mod tests;

pub use boot::{run, State, Verifier};
#[cfg(feature = "secp256k1")]
pub use boot::start;
pub use config::{MeasurementPolicy, VerifierConfig};
pub use error::{Error, Fatal, Violation};
