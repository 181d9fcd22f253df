// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

/// What the firmware starts after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResetType {
    /// Whatever the firmware starts by default
    StartDefault = 0,
    /// App in flash slot 0
    StartFlash0 = 1,
    /// App in flash slot 1
    StartFlash1 = 2,
    /// App in flash slot 0, checked against the passed digest
    StartFlash0Ver = 3,
    /// App in flash slot 1, checked against the passed digest
    StartFlash1Ver = 4,
    /// Wait for an app from the client
    StartClient = 5,
    /// Wait for an app from the client, checked against the passed digest
    StartClientVer = 6,
}

impl TryFrom<u8> for ResetType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResetType::StartDefault),
            1 => Ok(ResetType::StartFlash0),
            2 => Ok(ResetType::StartFlash1),
            3 => Ok(ResetType::StartFlash0Ver),
            4 => Ok(ResetType::StartFlash1Ver),
            5 => Ok(ResetType::StartClient),
            6 => Ok(ResetType::StartClientVer),
            other => Err(other),
        }
    }
}

/// Instruction to the verifier carried in the first byte of the next-app
/// data across a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NextApp {
    /// Verify and boot the app in slot 1
    BootApp1 = 0,
    /// Stay in the verifier and serve client commands
    WaitForCommand = 1,
}

impl TryFrom<u8> for NextApp {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NextApp::BootApp1),
            1 => Ok(NextApp::WaitForCommand),
            other => Err(other),
        }
    }
}
