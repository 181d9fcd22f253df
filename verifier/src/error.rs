// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::platform::{StorageError, SyscallError};
use frame_protocol::{AppCmd, CmdLen, Endpoint};

/// Command level inconsistencies. Any of these means the client can't be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Violation {
    /// Frame addressed to a hardware core
    Endpoint(Endpoint),
    /// Opcode unknown or not accepted in the current state
    Opcode(u8),
    /// Known opcode with a length class other than its own
    Length { cmd: AppCmd, len: CmdLen },
    ResetType(u8),
    NextApp(u8),
}

/// Conditions after which the verifier can't go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fatal {
    /// A reset request came back
    ResetReturned(SyscallError),
    ResetData(SyscallError),
    Metadata(StorageError),
    Finalize(StorageError),
    /// A reply did not fit its frame
    Reply(AppCmd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Malformed frame header
    Parse,
    /// Transport failure or end of stream in the middle of a frame
    Io,
    Protocol(Violation),
    /// Update size of zero or beyond the app slot
    Size(u32),
    Write(StorageError),
    /// Signature does not match the digest under the trusted key
    VerificationFailure,
    Fatal(Fatal),
}

impl Error {
    /// Everything but a failed verification stops the verifier.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::VerificationFailure)
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Self::Protocol(v)
    }
}

impl From<Fatal> for Error {
    fn from(f: Fatal) -> Self {
        Self::Fatal(f)
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Endpoint(e) => write!(f, "frame for endpoint {e:?}"),
            Self::Opcode(op) => write!(f, "unexpected opcode {op:#04x}"),
            Self::Length { cmd, len } => write!(f, "{cmd:?} with {} bytes", len.bytelen()),
            Self::ResetType(t) => write!(f, "unknown reset type {t}"),
            Self::NextApp(n) => write!(f, "unknown reset destination {n}"),
        }
    }
}

impl core::fmt::Display for Fatal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ResetReturned(e) => write!(f, "reset returned {}", e.0),
            Self::ResetData(e) => write!(f, "reading reset data failed with {}", e.0),
            Self::Metadata(e) => write!(f, "reading app metadata failed with {}", e.0),
            Self::Finalize(e) => write!(f, "committing app metadata failed with {}", e.0),
            Self::Reply(cmd) => write!(f, "can't encode reply to {cmd:?}"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parse => write!(f, "malformed frame header"),
            Self::Io => write!(f, "transport failure"),
            Self::Protocol(v) => write!(f, "protocol violation: {v}"),
            Self::Size(size) => write!(f, "invalid app size {size}"),
            Self::Write(e) => write!(f, "storage write failed with {}", e.0),
            Self::VerificationFailure => write!(f, "signature verification failed"),
            Self::Fatal(fatal) => write!(f, "fatal: {fatal}"),
        }
    }
}
