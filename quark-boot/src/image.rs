// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Image validation: the single security-critical decision point.
//!
//! No other code path in the system may treat a firmware volume, capsule
//! payload or recovery image as trustworthy without a call through here
//! succeeding first.

use crate::anchor::{PublicKey, TrustAnchor};
use crate::csh::CshHeader;
use crate::fuse::KeyBank;
use crate::keymod;
use crate::rom::{RomOracle, Scratch};
use crate::SecurityError;

/// Parsed view of a signed image, ready to verify.
pub struct ImageVerifier<'a> {
    header: CshHeader,
    module: &'a [u8],
}

impl<'a> ImageVerifier<'a> {
    /// Parse and sanity-check `signed_image`. The identifier check comes
    /// first; a corrupted module never reaches the signature math.
    pub fn new(signed_image: &'a [u8]) -> Result<Self, SecurityError> {
        let header = CshHeader::read_from(signed_image)?;
        header.validate(signed_image.len())?;
        Ok(ImageVerifier {
            header,
            module: &signed_image[..header.total_size()],
        })
    }

    pub fn header(&self) -> &CshHeader {
        &self.header
    }

    /// The image's declared security version as `(index, value)`.
    pub fn svn(&self) -> (u32, u32) {
        (self.header.svn_index, self.header.svn)
    }

    /// The public key travelling with the image.
    pub fn embedded_key(&self) -> Result<PublicKey<'a>, SecurityError> {
        PublicKey::from_key_block(&self.module[self.header.key_block_range()])
    }

    /// The body of a signed image, without validating it. For staging and
    /// layout work only; dispatch decisions go through [`Self::verify`].
    pub fn image_body(signed_image: &'a [u8]) -> Result<&'a [u8], SecurityError> {
        let header = CshHeader::read_from(signed_image)?;
        header.validate(signed_image.len())?;
        Ok(&signed_image[header.body_range()])
    }

    /// Check the image against `anchor` through the oracle.
    ///
    /// The embedded key must digest-match the anchored OEM key, then the
    /// oracle must accept the signature over the contiguous signed region.
    /// Images chain from an OEM key; a fused anchor is refused here.
    pub fn verify<R: RomOracle>(
        &self,
        rom: &R,
        anchor: &TrustAnchor<'_>,
        scratch: &mut Scratch<'_>,
    ) -> Result<(), SecurityError> {
        let trusted = match anchor {
            TrustAnchor::Oem(key) => key,
            TrustAnchor::Fused(_) => return Err(SecurityError::Unsupported),
        };

        let embedded = self.embedded_key()?;
        if embedded.key_digest() != trusted.key_digest() {
            log::error!("image key block does not match the validated OEM key");
            return Err(SecurityError::SecurityViolation);
        }

        rom.validate_image(self.module, trusted, scratch.zeroed())?;
        Ok(())
    }
}

/// Authenticate `signed_image` end to end.
///
/// When `auth_key_module` is set the key module is first validated against
/// the root key fused into `bank`; otherwise its OEM key is extracted
/// structurally, for callers that validated it in an earlier boot stage.
/// The call is stateless: repeating it on unchanged inputs yields the same
/// result, and nothing outlives the call but the returned status.
pub fn authenticate_image<R: RomOracle>(
    rom: &R,
    signed_image: &[u8],
    key_module: &[u8],
    auth_key_module: bool,
    bank: KeyBank,
    scratch: &mut Scratch<'_>,
) -> Result<(), SecurityError> {
    let oem = if auth_key_module {
        keymod::validate_key_module(rom, key_module, bank, scratch)?
    } else {
        keymod::trusted_oem_key(key_module)?
    };

    let verifier = ImageVerifier::new(signed_image)?;
    verifier.verify(rom, &TrustAnchor::Oem(oem), scratch)
}
