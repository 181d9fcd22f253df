// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::MeasurementPolicy;
use crate::error::{Error, Fatal};
use crate::platform::{Reset, System};
use consts::{DIGEST_SIZE, PUBKEY_SIZE, RESET_DIGEST_SIZE, SIGNATURE_SIZE};
use core::convert::Infallible;
use frame_protocol::ResetType;

/// SHA-256 hash function.
pub trait Hasher {
    fn hash(&self, data: &[u8]) -> [u8; 32];
}

/// Signature verification over an app digest.
pub trait SignatureVerifier {
    /// Verify `signature` over `digest` against the given public key.
    fn verify(
        &self,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
        pubkey: &[u8; PUBKEY_SIZE],
    ) -> VerificationResult;
}

/// Verification result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum VerificationResult {
    // Far apart in Hamming distance so a single glitched bit can't turn one into the other.
    Valid = 0xcafebabe,
    Invalid = 0xdeadbeef,
}

/// Decides whether an app may run and hands control to it if so.
pub struct Gate<V, H> {
    verifier: V,
    hasher: H,
    policy: MeasurementPolicy,
}

impl<V: SignatureVerifier, H: Hasher> Gate<V, H> {
    pub fn new(verifier: V, hasher: H, policy: MeasurementPolicy) -> Self {
        Self {
            verifier,
            hasher,
            policy,
        }
    }

    /// Measurement handed to the next app as part of its identity.
    pub fn measure(&self, pubkey: &[u8; PUBKEY_SIZE], digest: &[u8; DIGEST_SIZE]) -> [u8; RESET_DIGEST_SIZE] {
        match self.policy {
            MeasurementPolicy::Pubkey => self.hasher.hash(pubkey),
            MeasurementPolicy::PubkeyAndDigest => {
                let mut buf = [0u8; PUBKEY_SIZE + DIGEST_SIZE];
                buf[..PUBKEY_SIZE].copy_from_slice(pubkey);
                buf[PUBKEY_SIZE..].copy_from_slice(digest);
                self.hasher.hash(&buf)
            }
        }
    }

    /// Reset into `kind` if `signature` is valid for `digest` under `pubkey`.
    ///
    /// Only returns on failure. A mismatching signature is
    /// [`Error::VerificationFailure`] and nothing else happens. A reset
    /// that comes back is fatal.
    pub fn reset_if_verified(
        &self,
        system: &mut impl System,
        pubkey: &[u8; PUBKEY_SIZE],
        kind: ResetType,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<Infallible, Error> {
        const CF1: u32 = 3;
        const CF2: u32 = 5;
        const CFI_SUCCESS: u32 = CF1 + CF2;
        let mut control_flow_integrity_counter = 0;

        let result = self.verifier.verify(digest, signature, pubkey);
        if result != VerificationResult::Valid {
            info!("signature verification failed");
            return Err(Error::VerificationFailure);
        }
        control_flow_integrity_counter += CF1;

        let measurement = self.measure(pubkey, digest);
        control_flow_integrity_counter += CF2;

        // Check again through an opaque copy in case the first branch was skipped
        if core::hint::black_box(result as u32) != VerificationResult::Valid as u32
            || core::hint::black_box(control_flow_integrity_counter) != CFI_SUCCESS
        {
            error!("verification result changed");
            return Err(Error::VerificationFailure);
        }

        info!("signature verified, resetting into {:?}", kind);
        match system.reset(&Reset::verified(kind, measurement, *digest)) {
            Ok(never) => match never {},
            Err(e) => Err(Fatal::ResetReturned(e).into()),
        }
    }
}
