// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

/// Longest command or response payload carried by a single frame.
/// Every payload is one of the length classes 1, 4, 32 or this value.
pub const CMDLEN_MAXBYTES: usize = 128;

/// Firmware image bytes carried by one update chunk command.
/// The first byte of the payload is the opcode, the rest is image data.
pub const CHUNK_PAYLOAD_LEN: usize = CMDLEN_MAXBYTES - 1;

/// Capacity of the application slot (128 KiB).
/// An update announcing a larger image is rejected before anything is erased.
pub const APP_MAX_SIZE: usize = 128 * 1024;

/// Physical write unit of the preload slot.
/// Writes are always issued as full, block aligned buffers of this size.
pub const PRELOAD_WRITE_SIZE: usize = 256;

/// Size of an application digest.
pub const DIGEST_SIZE: usize = 32;

/// Size of an application signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Size of the trusted public key.
pub const PUBKEY_SIZE: usize = 32;

/// Size of the measurement handed to the next boot stage.
pub const RESET_DIGEST_SIZE: usize = 32;

/// Bytes of data that survive a reset and are readable by the next app.
/// Only the first byte is interpreted by the verifier.
pub const RESET_DATA_SIZE: usize = 220;

/// First hardware version that routes client traffic through the
/// multiplexed CDC endpoint instead of the raw UART.
pub const TKEY_VERSION_CASTOR: u32 = 6;

/// Base address of RAM.
pub const RAM_BASE: u32 = 0x4000_0000;

/// Size of RAM (128 KiB).
pub const RAM_SIZE: u32 = 0x2_0000;

/// Serial speed used by the host side of the protocol.
pub const SERIAL_SPEED: u32 = 62_500;
