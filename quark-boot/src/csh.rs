// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! CSH security header: the fixed-layout record prefixed to every signable
//! flash module.
//!
//! A signed module is laid out as
//!
//! ```text
//! 0            .. 56            CshHeader
//! 56           .. header_size   signer padding
//! header_size  .. module_size   body
//! module_size  .. +260          key block (modulus 256 | exponent 4, big endian)
//! module_size+260 .. +516       signature block (RSA-2048 PKCS#1 v1.5, SHA-256)
//! ```
//!
//! The signature covers `[0, module_size)` — header, padding and body as one
//! contiguous run. Field order and sizes are fixed; existing signed flash
//! content depends on them bit for bit.

use core::mem::size_of;
use core::ops::Range;
use core::ptr::slice_from_raw_parts;

use scroll::{Pread, Pwrite};

use crate::SecurityError;

/// `'_','C','S','H'` — the first field of every signable module. Nothing
/// else in the header may be interpreted before this matches.
pub const CSH_IDENTIFIER: u32 = 0x5F43_5348;

pub const CSH_VERSION_V1: u32 = 0x01;
pub const CSH_HASH_SHA256: u32 = 0x01;
pub const CSH_CRYPTO_RSA2048_PKCS15: u32 = 0x01;

pub const RSA2048_MODULUS_SIZE: usize = 256;
pub const RSA2048_EXPONENT_SIZE: usize = 4;
pub const RSA2048_SIGNATURE_SIZE: usize = 256;

/// Trailing key block: modulus followed by the big-endian exponent.
pub const CSH_KEY_BLOCK_SIZE: u32 = (RSA2048_MODULUS_SIZE + RSA2048_EXPONENT_SIZE) as u32;
pub const CSH_SIGNATURE_SIZE: u32 = RSA2048_SIGNATURE_SIZE as u32;

/// Highest valid `svn_index`.
pub const CSH_SVN_INDEX_MAX: u32 = 15;

/// A single module cannot exceed the flash part.
pub const MAX_MODULE_SIZE: u32 = quark_layout::build_time::FLASH_SIZE;

#[repr(C, align(4))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pread, Pwrite)]
pub struct CshHeader {
    pub identifier: u32,
    pub version: u32,
    pub module_size: u32,
    pub svn_index: u32,
    pub svn: u32,
    pub module_id: u32,
    pub module_vendor: u32,
    pub date: u32,
    pub header_size: u32,
    pub hash_algorithm: u32,
    pub crypto_algorithm: u32,
    pub key_size: u32,
    pub signature_size: u32,
    pub next_header: u32,
}

impl CshHeader {
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { &*slice_from_raw_parts(self as *const Self as *const u8, size_of::<Self>()) }
    }

    /// Read a header from the start of `module`.
    ///
    /// Only the identifier is checked here; it gates interpretation of every
    /// other field, so a corrupted module is rejected before any size or
    /// algorithm field is even looked at.
    pub fn read_from(module: &[u8]) -> Result<Self, SecurityError> {
        let header = module
            .pread::<CshHeader>(0)
            .map_err(|_| SecurityError::SecurityViolation)?;
        if header.identifier != CSH_IDENTIFIER {
            return Err(SecurityError::SecurityViolation);
        }
        Ok(header)
    }

    /// Sanity-check the size and algorithm fields against the containing
    /// buffer. Must be called before any of the range accessors below.
    pub fn validate(&self, module_len: usize) -> Result<(), SecurityError> {
        if self.identifier != CSH_IDENTIFIER {
            return Err(SecurityError::SecurityViolation);
        }
        if self.version != CSH_VERSION_V1
            || self.hash_algorithm != CSH_HASH_SHA256
            || self.crypto_algorithm != CSH_CRYPTO_RSA2048_PKCS15
        {
            return Err(SecurityError::Unsupported);
        }
        if self.key_size != CSH_KEY_BLOCK_SIZE || self.signature_size != CSH_SIGNATURE_SIZE {
            return Err(SecurityError::Unsupported);
        }
        if self.header_size < size_of::<CshHeader>() as u32
            || self.module_size < self.header_size
            || self.module_size > MAX_MODULE_SIZE
        {
            return Err(SecurityError::SecurityViolation);
        }
        if self.svn_index > CSH_SVN_INDEX_MAX {
            return Err(SecurityError::SecurityViolation);
        }
        if module_len < self.total_size() {
            return Err(SecurityError::SecurityViolation);
        }
        Ok(())
    }

    /// Size of the module including the trailing key and signature blocks.
    pub fn total_size(&self) -> usize {
        self.module_size as usize + self.key_size as usize + self.signature_size as usize
    }

    /// The contiguous run the signature covers: header, padding and body.
    pub fn signed_region(&self) -> Range<usize> {
        0..self.module_size as usize
    }

    pub fn body_range(&self) -> Range<usize> {
        self.header_size as usize..self.module_size as usize
    }

    pub fn key_block_range(&self) -> Range<usize> {
        let start = self.module_size as usize;
        start..start + self.key_size as usize
    }

    pub fn signature_range(&self) -> Range<usize> {
        let start = self.module_size as usize + self.key_size as usize;
        start..start + self.signature_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> CshHeader {
        CshHeader {
            identifier: CSH_IDENTIFIER,
            version: CSH_VERSION_V1,
            module_size: 4096,
            svn_index: 2,
            svn: 7,
            module_id: 0,
            module_vendor: 0,
            date: 0x2026_0807,
            header_size: 1024,
            hash_algorithm: CSH_HASH_SHA256,
            crypto_algorithm: CSH_CRYPTO_RSA2048_PKCS15,
            key_size: CSH_KEY_BLOCK_SIZE,
            signature_size: CSH_SIGNATURE_SIZE,
            next_header: 0,
        }
    }

    #[test]
    fn test_header_size() {
        assert_eq!(size_of::<CshHeader>(), 56);
    }

    #[test]
    fn test_read_from() {
        let header = well_formed();
        let read = CshHeader::read_from(header.as_bytes()).unwrap();
        assert_eq!(read.module_size, 4096);
        assert_eq!(read.svn, 7);

        // Too short for a header at all.
        assert!(CshHeader::read_from(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_identifier_gates_everything() {
        // A corrupted identifier is rejected even though every other field
        // is valid; the size fields are never interpreted.
        let mut header = well_formed();
        header.identifier = 0;
        assert_eq!(
            CshHeader::read_from(header.as_bytes()),
            Err(SecurityError::SecurityViolation)
        );
    }

    #[test]
    fn test_validate() {
        let header = well_formed();
        assert!(header.validate(header.total_size()).is_ok());

        // Buffer shorter than the declared module.
        assert_eq!(
            header.validate(header.total_size() - 1),
            Err(SecurityError::SecurityViolation)
        );

        let mut h = well_formed();
        h.header_size = 40;
        assert_eq!(
            h.validate(h.total_size()),
            Err(SecurityError::SecurityViolation)
        );

        let mut h = well_formed();
        h.module_size = h.header_size - 1;
        assert_eq!(
            h.validate(h.total_size()),
            Err(SecurityError::SecurityViolation)
        );

        let mut h = well_formed();
        h.version = 2;
        assert_eq!(h.validate(h.total_size()), Err(SecurityError::Unsupported));

        let mut h = well_formed();
        h.crypto_algorithm = 3;
        assert_eq!(h.validate(h.total_size()), Err(SecurityError::Unsupported));

        let mut h = well_formed();
        h.svn_index = 16;
        assert_eq!(
            h.validate(h.total_size()),
            Err(SecurityError::SecurityViolation)
        );
    }

    #[test]
    fn test_ranges() {
        let header = well_formed();
        assert_eq!(header.signed_region(), 0..4096);
        assert_eq!(header.body_range(), 1024..4096);
        assert_eq!(header.key_block_range(), 4096..4356);
        assert_eq!(header.signature_range(), 4356..4612);
        assert_eq!(header.total_size(), 4612);
    }

    #[test]
    fn test_pwrite_roundtrip() {
        let header = well_formed();
        let mut buf = [0u8; 56];
        buf.pwrite(header, 0).unwrap();
        assert_eq!(&buf, header.as_bytes());
    }
}
