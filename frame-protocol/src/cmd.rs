// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::frame::{CmdLen, Endpoint, FrameHeader};
use consts::CMDLEN_MAXBYTES;

/// Header byte plus the longest payload.
pub const FRAME_MAX: usize = 1 + CMDLEN_MAXBYTES;

/// A complete encoded frame, header included.
pub type Frame = heapless::Vec<u8, FRAME_MAX>;

/// Commands understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AppCmd {
    /// Verify a client supplied digest and signature, boot on success
    Verify = 0x01,
    /// Start replacing the resident app: size, digest, signature
    UpdateAppInit = 0x03,
    /// Next piece of the app being uploaded
    UpdateAppChunk = 0x04,
    /// Read the trusted public key
    GetPubkey = 0x05,
    /// Reset into a named destination
    Reset = 0xfe,
    /// Never sent on the wire. Stands in for any frame addressed to the
    /// firmware endpoint.
    FwProbe = 0xff,
}

impl AppCmd {
    /// Length class a request for this command must use.
    pub const fn cmd_len(self) -> Option<CmdLen> {
        match self {
            AppCmd::GetPubkey => Some(CmdLen::Len1),
            AppCmd::Reset => Some(CmdLen::Len4),
            // The verify request only uses 1 + 32 + 64 bytes of the frame.
            AppCmd::Verify | AppCmd::UpdateAppInit | AppCmd::UpdateAppChunk => Some(CmdLen::Len128),
            AppCmd::FwProbe => None,
        }
    }

    /// Length class of the reply to this command, if it has one.
    pub const fn rsp_len(self) -> Option<CmdLen> {
        match self {
            AppCmd::GetPubkey => Some(CmdLen::Len128),
            AppCmd::Verify | AppCmd::UpdateAppInit | AppCmd::UpdateAppChunk => Some(CmdLen::Len4),
            AppCmd::Reset | AppCmd::FwProbe => None,
        }
    }
}

impl TryFrom<u8> for AppCmd {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(AppCmd::Verify),
            0x03 => Ok(AppCmd::UpdateAppInit),
            0x04 => Ok(AppCmd::UpdateAppChunk),
            0x05 => Ok(AppCmd::GetPubkey),
            0xfe => Ok(AppCmd::Reset),
            0xff => Ok(AppCmd::FwProbe),
            other => Err(other),
        }
    }
}

/// First payload byte of a status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    Bad = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The command has no reply frame
    NoReply(AppCmd),
    /// The command is never sent by a client
    NoRequest(AppCmd),
    /// Payload does not fit in the command's length class
    PayloadTooLong { max: usize, actual: usize },
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoReply(cmd) => write!(f, "{cmd:?} has no reply"),
            Self::NoRequest(cmd) => write!(f, "{cmd:?} is not a request"),
            Self::PayloadTooLong { max, actual } => {
                write!(f, "payload of {actual} bytes does not fit in {max} bytes")
            }
        }
    }
}

fn build(header: FrameHeader, code: u8, payload: &[u8]) -> Frame {
    let len = header.bytelen();
    let mut buf = [0u8; FRAME_MAX];
    buf[0] = header.encode();
    buf[1] = code;
    let n = payload.len().min(len - 1);
    buf[2..2 + n].copy_from_slice(&payload[..n]);

    // 1 + len never exceeds FRAME_MAX
    Frame::from_slice(&buf[..1 + len]).unwrap_or_default()
}

/// Build the reply to `request`: header echoing id and endpoint, the reply
/// code and at most `len - 1` bytes of `payload`.
pub fn encode_reply(request: FrameHeader, rsp: AppCmd, payload: &[u8]) -> Result<Frame, EncodeError> {
    let len = rsp.rsp_len().ok_or(EncodeError::NoReply(rsp))?;
    let header = FrameHeader::new(request.id, request.endpoint, false, len);

    Ok(build(header, rsp as u8, payload))
}

/// Shortest possible "not OK" reply. The single payload byte is unused.
pub fn encode_nok(request: FrameHeader) -> [u8; 2] {
    let header = FrameHeader::new(request.id, request.endpoint, true, CmdLen::Len1);

    [header.encode(), 0]
}

/// Build a client request for the app endpoint. Unused payload bytes are zero.
pub fn encode_request(id: u8, cmd: AppCmd, payload: &[u8]) -> Result<Frame, EncodeError> {
    let len = cmd.cmd_len().ok_or(EncodeError::NoRequest(cmd))?;
    let max = len.bytelen() - 1;
    if payload.len() > max {
        return Err(EncodeError::PayloadTooLong {
            max,
            actual: payload.len(),
        });
    }
    let header = FrameHeader::new(id, Endpoint::App, false, len);

    Ok(build(header, cmd as u8, payload))
}

/// Reasons a reply is refused by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyError {
    /// The verifier answered "not OK"
    Nok,
    WrongEndpoint(Endpoint),
    UnexpectedLength(CmdLen),
    UnexpectedCode(u8),
}

impl core::fmt::Display for ReplyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Nok => write!(f, "reply was NOK"),
            Self::WrongEndpoint(e) => write!(f, "reply from unexpected endpoint {e:?}"),
            Self::UnexpectedLength(l) => write!(f, "reply has unexpected length {}", l.bytelen()),
            Self::UnexpectedCode(c) => write!(f, "reply has unexpected code {c:#04x}"),
        }
    }
}

/// Check a reply to `expected` and return the bytes after the reply code.
pub fn parse_reply(header: FrameHeader, payload: &[u8], expected: AppCmd) -> Result<&[u8], ReplyError> {
    if header.response {
        return Err(ReplyError::Nok);
    }
    if header.endpoint != Endpoint::App {
        return Err(ReplyError::WrongEndpoint(header.endpoint));
    }
    if expected.rsp_len() != Some(header.len) || payload.len() != header.bytelen() {
        return Err(ReplyError::UnexpectedLength(header.len));
    }
    match payload.split_first() {
        Some((&code, rest)) if code == expected as u8 => Ok(rest),
        Some((&code, _)) => Err(ReplyError::UnexpectedCode(code)),
        None => Err(ReplyError::UnexpectedLength(header.len)),
    }
}
