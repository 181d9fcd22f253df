// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{Error, Fatal, Violation};
use crate::transport::FrameTransport;
use consts::CMDLEN_MAXBYTES;
use frame_protocol::{encode_nok, encode_reply, parse_frame, AppCmd, Endpoint, FrameHeader};

/// One request from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    pub hdr: FrameHeader,
    /// Opcode followed by the rest of the payload. Bytes past the header's
    /// length are zero.
    pub cmd: [u8; CMDLEN_MAXBYTES],
}

impl Packet {
    pub fn opcode(&self) -> u8 {
        self.cmd[0]
    }

    /// Fail unless the frame uses the length class of `cmd`.
    pub fn expect_len(&self, cmd: AppCmd) -> Result<(), Error> {
        match cmd.cmd_len() {
            Some(len) if len == self.hdr.len => Ok(()),
            _ => Err(Violation::Length { cmd, len: self.hdr.len }.into()),
        }
    }
}

/// Read one complete frame.
///
/// Frames for the firmware are answered NOK right away and come back as
/// [`AppCmd::FwProbe`]. Frames for a hardware endpoint are refused, but only
/// after their payload was consumed.
pub fn read_command(transport: &mut impl FrameTransport) -> Result<Packet, Error> {
    let mut lead = [0u8; 1];
    transport.read_exact(&mut lead)?;

    let hdr = parse_frame(lead[0]).map_err(|e| {
        warn!("couldn't parse header {:#x}: {}", lead[0], e);
        Error::Parse
    })?;

    let mut cmd = [0u8; CMDLEN_MAXBYTES];
    transport.read_exact(&mut cmd[..hdr.bytelen()])?;

    if hdr.response {
        warn!("request with the response flag set");
        return Err(Error::Parse);
    }

    match hdr.endpoint {
        Endpoint::App => {}
        Endpoint::Firmware => {
            transport.write_all(&encode_nok(hdr))?;
            debug!("responded NOK to message meant for fw");
            cmd[0] = AppCmd::FwProbe as u8;
        }
        other => {
            warn!("message not meant for app, endpoint {:?}", other);
            return Err(Violation::Endpoint(other).into());
        }
    }

    Ok(Packet { hdr, cmd })
}

/// Answer `request` with `rsp` and its payload.
pub fn reply(transport: &mut impl FrameTransport, request: FrameHeader, rsp: AppCmd, payload: &[u8]) -> Result<(), Error> {
    let frame = encode_reply(request, rsp, payload).map_err(|e| {
        error!("can't encode reply: {}", e);
        Error::Fatal(Fatal::Reply(rsp))
    })?;

    transport.write_all(&frame)
}
