// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Client to verifier communication protocol.
//! The client (a host computer) sends one command per frame and the verifier
//! running on the token answers with at most one reply frame.
//! Defines the frame header codec, the verifier command set and the values
//! carried across a reset.

#![no_std]

mod cmd;
mod frame;
mod reset;


pub use cmd::{encode_nok, encode_reply, encode_request, parse_reply, AppCmd, EncodeError, Frame, ReplyError, Status, FRAME_MAX};
pub use frame::{parse_frame, CmdLen, Endpoint, FrameHeader, ParseError};
pub use reset::{NextApp, ResetType};
