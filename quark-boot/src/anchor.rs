// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Trust anchors and the RSA public-key wire view.
//!
//! The chain is two levels deep and strictly ordered: a fused bank digest
//! anchors a signed key module, and the OEM key recovered from that module
//! anchors every image. [`TrustAnchor`] makes the level explicit at the call
//! site so an image can never be checked directly against the fuses.

use ring::digest;

use crate::csh::{RSA2048_EXPONENT_SIZE, RSA2048_MODULUS_SIZE};
use crate::fuse::KeyBank;
use crate::SecurityError;

/// Borrowed view of an RSA-2048 public key.
///
/// The wire form is the modulus followed by the exponent in big-endian
/// order; the exponent may be stored shorter than 4 bytes in an OEM key
/// record and is zero-extended for digest purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey<'a> {
    modulus: &'a [u8],
    exponent: &'a [u8],
}

impl<'a> PublicKey<'a> {
    pub fn new(modulus: &'a [u8], exponent: &'a [u8]) -> Result<Self, SecurityError> {
        if modulus.len() != RSA2048_MODULUS_SIZE {
            return Err(SecurityError::SecurityViolation);
        }
        if exponent.is_empty() || exponent.len() > RSA2048_EXPONENT_SIZE {
            return Err(SecurityError::SecurityViolation);
        }
        Ok(PublicKey { modulus, exponent })
    }

    /// Split a trailing key block (modulus | 4-byte exponent).
    pub fn from_key_block(block: &'a [u8]) -> Result<Self, SecurityError> {
        if block.len() != RSA2048_MODULUS_SIZE + RSA2048_EXPONENT_SIZE {
            return Err(SecurityError::SecurityViolation);
        }
        PublicKey::new(
            &block[..RSA2048_MODULUS_SIZE],
            &block[RSA2048_MODULUS_SIZE..],
        )
    }

    pub fn modulus(&self) -> &'a [u8] {
        self.modulus
    }

    pub fn exponent(&self) -> &'a [u8] {
        self.exponent
    }

    /// SHA-256 over the canonical key block form, the digest fused into a
    /// key bank and the one keys are compared by throughout the chain.
    pub fn key_digest(&self) -> [u8; 32] {
        let mut exponent = [0u8; RSA2048_EXPONENT_SIZE];
        exponent[RSA2048_EXPONENT_SIZE - self.exponent.len()..].copy_from_slice(self.exponent);

        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(self.modulus);
        ctx.update(&exponent);

        let mut out = [0u8; 32];
        out.copy_from_slice(ctx.finish().as_ref());
        out
    }

    /// Copy into a caller-owned key, for callers that outlive the validated
    /// module buffer.
    pub fn to_owned(&self) -> OwnedPublicKey {
        let mut modulus = [0u8; RSA2048_MODULUS_SIZE];
        modulus.copy_from_slice(self.modulus);
        let mut exponent = [0u8; RSA2048_EXPONENT_SIZE];
        exponent[RSA2048_EXPONENT_SIZE - self.exponent.len()..].copy_from_slice(self.exponent);
        OwnedPublicKey { modulus, exponent }
    }
}

/// Owned copy of a validated public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedPublicKey {
    modulus: [u8; RSA2048_MODULUS_SIZE],
    exponent: [u8; RSA2048_EXPONENT_SIZE],
}

impl OwnedPublicKey {
    pub fn as_public_key(&self) -> PublicKey<'_> {
        PublicKey {
            modulus: &self.modulus,
            exponent: &self.exponent,
        }
    }
}

/// Where trust for a validation call comes from.
#[derive(Clone, Copy, Debug)]
pub enum TrustAnchor<'a> {
    /// A hardware fuse bank holding a root-key digest. Anchors key modules.
    Fused(KeyBank),
    /// An OEM key recovered from a validated key module. Anchors images.
    Oem(PublicKey<'a>),
}
