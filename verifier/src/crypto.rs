// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Software implementations of the primitives the [`Gate`](crate::verify::Gate) uses.

use crate::verify::Hasher;
#[cfg(feature = "secp256k1")]
use crate::verify::{SignatureVerifier, VerificationResult};
#[cfg(feature = "secp256k1")]
use consts::{DIGEST_SIZE, PUBKEY_SIZE, SIGNATURE_SIZE};
use sha2::{Digest, Sha256 as Sha};

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256;

impl Hasher for Sha256 {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        Sha::digest(data).into()
    }
}

/// BIP-340 Schnorr signatures over secp256k1 with 32 byte x-only keys.
#[cfg(feature = "secp256k1")]
pub struct SchnorrVerifier {
    secp: secp256k1::Secp256k1<secp256k1::VerifyOnly>,
}

#[cfg(feature = "secp256k1")]
impl SchnorrVerifier {
    pub fn new() -> Self {
        Self {
            secp: secp256k1::Secp256k1::verification_only(),
        }
    }
}

#[cfg(feature = "secp256k1")]
impl Default for SchnorrVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "secp256k1")]
impl SignatureVerifier for SchnorrVerifier {
    fn verify(
        &self,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
        pubkey: &[u8; PUBKEY_SIZE],
    ) -> VerificationResult {
        use secp256k1::{schnorr::Signature, Message, XOnlyPublicKey};

        let Ok(pubkey) = XOnlyPublicKey::from_slice(pubkey) else {
            warn!("trusted key is not a curve point");
            return VerificationResult::Invalid;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return VerificationResult::Invalid;
        };
        let msg = Message::from_digest(*digest);

        match self.secp.verify_schnorr(&signature, &msg, &pubkey) {
            Ok(()) => VerificationResult::Valid,
            Err(_) => VerificationResult::Invalid,
        }
    }
}
