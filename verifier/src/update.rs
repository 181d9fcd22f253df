// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{Error, Fatal};
use crate::platform::Preload;
use crate::write_app::write_app;
use consts::{APP_MAX_SIZE, DIGEST_SIZE, SIGNATURE_SIZE};

/// An app upload in progress.
///
/// Data is written strictly in order, starting at the beginning of the slot.
/// Digest and signature are only committed by [`finalize`](UpdateSession::finalize)
/// once every byte is in place.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateSession {
    size: u32,
    offset: u32,
    digest: [u8; DIGEST_SIZE],
    signature: [u8; SIGNATURE_SIZE],
}

impl UpdateSession {
    /// Erase the app slot and start an upload of `size` bytes.
    ///
    /// Nothing is erased if the size is rejected.
    pub fn init(
        preload: &mut impl Preload,
        size: u32,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<Self, Error> {
        if size == 0 || size as usize > APP_MAX_SIZE {
            warn!("invalid app size {}", size);
            return Err(Error::Size(size));
        }

        preload.delete().map_err(Error::Write)?;
        debug!("app slot erased, expecting {} bytes", size);

        Ok(Self {
            size,
            offset: 0,
            digest: *digest,
            signature: *signature,
        })
    }

    /// Write the next piece of the app. Anything past the announced size is
    /// dropped. Returns the number of bytes written.
    pub fn write(&mut self, preload: &mut impl Preload, data: &[u8]) -> Result<usize, Error> {
        let len = data.len().min(self.remaining() as usize);
        write_app(preload, self.offset, &data[..len])?;
        self.offset += len as u32;

        Ok(len)
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.size
    }

    /// Commit size, digest and signature. The session is gone afterwards,
    /// whatever the outcome.
    pub fn finalize(self, preload: &mut impl Preload) -> Result<(), Error> {
        preload
            .store_final(self.size, &self.digest, &self.signature)
            .map_err(|e| Fatal::Finalize(e).into())
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    fn remaining(&self) -> u32 {
        self.size.saturating_sub(self.offset)
    }
}
