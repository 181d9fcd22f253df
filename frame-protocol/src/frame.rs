// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! One byte frame header.
//!
//! ```text
//!   7   6 5   4 3   2    1 0
//! +---+-----+-----+----+-----+
//! | 0 | id  | end | rsp| len |
//! +---+-----+-----+----+-----+
//! ```

const VERSION_BIT: u8 = 0x80;
const ID_MASK: u8 = 0x60;
const ID_SHIFT: u8 = 5;
const ENDPOINT_MASK: u8 = 0x18;
const ENDPOINT_SHIFT: u8 = 3;
const RESPONSE_BIT: u8 = 0x04;
const LEN_MASK: u8 = 0x03;

/// Destination of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Endpoint {
    /// Hardware core in the internal FPGA
    HwIfpga = 0,
    /// Hardware core in the application FPGA
    HwAfpga = 1,
    /// Resident firmware
    Firmware = 2,
    /// The application currently running, e.g. the verifier
    App = 3,
}

impl Endpoint {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Endpoint::HwIfpga,
            1 => Endpoint::HwAfpga,
            2 => Endpoint::Firmware,
            _ => Endpoint::App,
        }
    }
}

/// Length class of a frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CmdLen {
    Len1 = 0,
    Len4 = 1,
    Len32 = 2,
    Len128 = 3,
}

impl CmdLen {
    /// Number of payload bytes following the header.
    pub const fn bytelen(self) -> usize {
        match self {
            CmdLen::Len1 => 1,
            CmdLen::Len4 => 4,
            CmdLen::Len32 => 32,
            CmdLen::Len128 => consts::CMDLEN_MAXBYTES,
        }
    }
}

impl TryFrom<u8> for CmdLen {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CmdLen::Len1),
            1 => Ok(CmdLen::Len4),
            2 => Ok(CmdLen::Len32),
            3 => Ok(CmdLen::Len128),
            other => Err(ParseError::Length(other)),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    /// Request id, echoed in the reply (0..=3)
    pub id: u8,
    pub endpoint: Endpoint,
    /// Set on replies that report "not OK"
    pub response: bool,
    pub len: CmdLen,
}

impl FrameHeader {
    pub fn new(id: u8, endpoint: Endpoint, response: bool, len: CmdLen) -> Self {
        Self {
            id: id & (ID_MASK >> ID_SHIFT),
            endpoint,
            response,
            len,
        }
    }

    /// Payload length announced by this header.
    pub fn bytelen(&self) -> usize {
        self.len.bytelen()
    }

    /// Encode the header into its wire byte.
    pub fn encode(&self) -> u8 {
        let mut b = (self.id << ID_SHIFT) & ID_MASK;
        b |= ((self.endpoint as u8) << ENDPOINT_SHIFT) & ENDPOINT_MASK;
        if self.response {
            b |= RESPONSE_BIT;
        }
        b | (self.len as u8 & LEN_MASK)
    }
}

/// Reasons a header byte is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Reserved version bit is set
    Version,
    /// Length class is not one of the defined values
    Length(u8),
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Version => write!(f, "unsupported frame version"),
            Self::Length(v) => write!(f, "undefined length class {v}"),
        }
    }
}

/// Parse the leading byte of a frame.
pub fn parse_frame(b: u8) -> Result<FrameHeader, ParseError> {
    if b & VERSION_BIT != 0 {
        return Err(ParseError::Version);
    }

    Ok(FrameHeader {
        id: (b & ID_MASK) >> ID_SHIFT,
        endpoint: Endpoint::from_bits((b & ENDPOINT_MASK) >> ENDPOINT_SHIFT),
        response: b & RESPONSE_BIT != 0,
        len: CmdLen::try_from(b & LEN_MASK)?,
    })
}
