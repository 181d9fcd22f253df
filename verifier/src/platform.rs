// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Capabilities the verifier needs from the hardware and the resident firmware.
//! The verifier never touches registers itself, it is handed a [`Board`].

use bitflags::bitflags;
use consts::{DIGEST_SIZE, PRELOAD_WRITE_SIZE, PUBKEY_SIZE, RESET_DATA_SIZE, RESET_DIGEST_SIZE, SIGNATURE_SIZE};
use core::convert::Infallible;
use frame_protocol::{NextApp, ResetType};

/// Failure reported by the preload slot, with the firmware's return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageError(pub i32);

/// Failure reported by a firmware system call, with its return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyscallError(pub i32);

/// Digest and signature recorded for the app in the preload slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Metadata {
    pub digest: [u8; DIGEST_SIZE],
    pub signature: [u8; SIGNATURE_SIZE],
    /// Key recorded by the firmware. The verifier only trusts its own.
    pub pubkey: [u8; PUBKEY_SIZE],
}

/// The application slot, persistent across resets.
///
/// Cells read `0xff` after [`delete`](Preload::delete) and a store can only
/// clear bits.
pub trait Preload {
    /// Erase the whole slot and its metadata.
    fn delete(&mut self) -> Result<(), StorageError>;

    /// Write one aligned block at `offset` from the start of the slot.
    fn store(&mut self, offset: u32, block: &[u8; PRELOAD_WRITE_SIZE]) -> Result<(), StorageError>;

    /// Commit size, digest and signature once the whole app is written.
    fn store_final(
        &mut self,
        len: u32,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<(), StorageError>;

    fn get_metadata(&mut self) -> Result<Metadata, StorageError>;
}

bitflags! {
    /// Fields of a [`Reset`] the firmware should take over.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResetMask: u32 {
        const SEED_DIGEST = 1 << 0;
        const APP_DIGEST = 1 << 1;
        const NEXT_APP_DATA = 1 << 2;
    }
}

/// Request handed to the firmware to reset the device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reset {
    pub kind: ResetType,
    /// Mixed into the secret of the next app
    pub measurement: Option<[u8; RESET_DIGEST_SIZE]>,
    /// Digest the next app must match
    pub app_digest: Option<[u8; DIGEST_SIZE]>,
    /// Readable by the next app, the first byte is a [`NextApp`]
    pub next_app_data: Option<[u8; RESET_DATA_SIZE]>,
}

impl Reset {
    /// Reset into `kind` telling the next verifier instance what to do.
    pub fn to(kind: ResetType, next: NextApp) -> Self {
        let mut data = [0; RESET_DATA_SIZE];
        data[0] = next as u8;

        Self {
            kind,
            measurement: None,
            app_digest: None,
            next_app_data: Some(data),
        }
    }

    /// Reset into a verified app.
    pub fn verified(kind: ResetType, measurement: [u8; RESET_DIGEST_SIZE], digest: [u8; DIGEST_SIZE]) -> Self {
        Self {
            kind,
            measurement: Some(measurement),
            app_digest: Some(digest),
            next_app_data: None,
        }
    }

    pub fn mask(&self) -> ResetMask {
        let mut mask = ResetMask::empty();
        mask.set(ResetMask::SEED_DIGEST, self.measurement.is_some());
        mask.set(ResetMask::APP_DIGEST, self.app_digest.is_some());
        mask.set(ResetMask::NEXT_APP_DATA, self.next_app_data.is_some());
        mask
    }
}

/// Firmware services.
pub trait System {
    /// Data the previous app passed along with its reset.
    fn reset_data(&mut self) -> Result<[u8; RESET_DATA_SIZE], SyscallError>;

    /// Reset the device. Only ever returns on failure.
    fn reset(&mut self, reset: &Reset) -> Result<Infallible, SyscallError>;
}

/// Colour of the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Off,
    Red,
    Green,
    Blue,
    Yellow,
}

/// Hardware registers and board peripherals.
pub trait Platform {
    /// Hardware version register.
    fn version(&self) -> u32;

    /// First address after the verifier's own image in RAM.
    fn app_end(&self) -> u32;

    /// Trap execution of any instruction fetched from `first..=last`.
    fn set_protected_range(&mut self, first: u32, last: u32);

    fn set_indicator(&mut self, indicator: Indicator);

    /// Stop for good. The device must be power cycled.
    fn halt(&mut self) -> !;
}

/// Everything the verifier is given to run on.
pub trait Board: Preload + System + Platform {}

impl<T: Preload + System + Platform> Board for T {}
