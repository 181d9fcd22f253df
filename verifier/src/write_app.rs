// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::platform::Preload;
use crate::Error;
use consts::PRELOAD_WRITE_SIZE;

const WRITE_ALIGN_MASK: u32 = !(PRELOAD_WRITE_SIZE as u32 - 1);

/// Write `data` at `addr` in the app slot.
///
/// The slot only takes whole aligned blocks, so every touched block is sent
/// as a buffer of `0xff` with `data` copied in at its offset in the block.
/// Erased cells stay untouched by the padding since a write only clears bits.
pub fn write_app(preload: &mut impl Preload, addr: u32, data: &[u8]) -> Result<(), Error> {
    trace!("app write addr={:#x} size={}", addr, data.len());

    let mut addr = addr;
    let mut rest = data;
    while !rest.is_empty() {
        // Only non-zero for the first block
        let buf_offset = (addr & !WRITE_ALIGN_MASK) as usize;
        let len = rest.len().min(PRELOAD_WRITE_SIZE - buf_offset);

        let mut buf = [0xff; PRELOAD_WRITE_SIZE];
        buf[buf_offset..buf_offset + len].copy_from_slice(&rest[..len]);

        preload.store(addr & WRITE_ALIGN_MASK, &buf).map_err(|e| {
            error!("write app failed, addr={:#x} ret={}", addr, e.0);
            Error::Write(e)
        })?;

        addr += len as u32;
        rest = &rest[len..];
    }

    Ok(())
}
