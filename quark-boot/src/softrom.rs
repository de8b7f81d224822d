// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Software oracle with the same semantics as the masked ROM routines.
//!
//! Used on hosts and in tests, and as the reference for what the ROM is
//! expected to decide: fuse digest comparison, SVN floor check, then an
//! RSA-2048 PKCS#1 v1.5 / SHA-256 verification of the contiguous signed
//! region. The caller's scratch heap stages the DER-encoded public key, the
//! way the ROM uses it for its own transient allocations.

use der::asn1::UintRef;
use der::{Encode, Sequence};
use ring::digest;
use ring::signature::{self, UnparsedPublicKey};

use crate::anchor::PublicKey;
use crate::csh::{CshHeader, CSH_CRYPTO_RSA2048_PKCS15, CSH_HASH_SHA256, CSH_IDENTIFIER,
    CSH_KEY_BLOCK_SIZE, CSH_SIGNATURE_SIZE, CSH_VERSION_V1, MAX_MODULE_SIZE};
use crate::fuse::{FuseMap, KeyBank};
use crate::keymod::MAX_KEY_MODULE_SIZE;
use crate::rom::{RomError, RomOracle, SCRATCH_HEAP_SIZE};

use core::mem::size_of;

use scroll::Pread;

/// Upper bound on the DER encoding of an RSA-2048 public key
/// (`SEQUENCE { modulus INTEGER, exponent INTEGER }`).
const RSA2048_MAX_DER_PUBLIC_KEY_SIZE: usize = 280;

// rfc3279#section-2.3.1 RSA Keys
//
// RSAPublicKey ::= SEQUENCE {
//     modulus            INTEGER,    -- n
//     publicExponent     INTEGER  }  -- e
//
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
struct RsaPublicKeyDer<'a> {
    pub modulus: UintRef<'a>,
    pub exponent: UintRef<'a>,
}

/// Software implementation of the ROM validation services over a fuse map.
pub struct SoftRom {
    fuses: FuseMap,
}

impl SoftRom {
    pub fn new(fuses: FuseMap) -> Self {
        SoftRom { fuses }
    }
}

// The ROM re-derives everything from the raw bytes; it does not trust any
// checking its caller may have done.
fn split(module: &[u8]) -> Result<(CshHeader, &[u8], &[u8], &[u8]), RomError> {
    if module.len() < size_of::<CshHeader>() {
        return Err(RomError::OutOfBounds);
    }
    let header: CshHeader = module.pread(0).map_err(|_| RomError::OutOfBounds)?;
    if header.identifier != CSH_IDENTIFIER {
        return Err(RomError::NoValidModules);
    }
    if header.version != CSH_VERSION_V1
        || header.hash_algorithm != CSH_HASH_SHA256
        || header.crypto_algorithm != CSH_CRYPTO_RSA2048_PKCS15
        || header.key_size != CSH_KEY_BLOCK_SIZE
        || header.signature_size != CSH_SIGNATURE_SIZE
    {
        return Err(RomError::NoValidModules);
    }
    if header.header_size < size_of::<CshHeader>() as u32 || header.module_size < header.header_size
    {
        return Err(RomError::OutOfBounds);
    }
    if header.module_size > MAX_MODULE_SIZE {
        return Err(RomError::ModuleTooLarge);
    }
    if module.len() < header.total_size() {
        return Err(RomError::OutOfBounds);
    }
    let signed = &module[header.signed_region()];
    let key_block = &module[header.key_block_range()];
    let signature = &module[header.signature_range()];
    Ok((header, signed, key_block, signature))
}

fn strip_leading_zeroes(bytes: &[u8]) -> &[u8] {
    let mut bytes = bytes;
    while bytes.len() > 1 && bytes[0] == 0 {
        bytes = &bytes[1..];
    }
    bytes
}

fn verify_rsa(
    key: &PublicKey<'_>,
    message: &[u8],
    raw_signature: &[u8],
    scratch: &mut [u8],
) -> Result<(), ()> {
    let der_key = RsaPublicKeyDer {
        modulus: UintRef::new(strip_leading_zeroes(key.modulus())).map_err(|_| ())?,
        exponent: UintRef::new(strip_leading_zeroes(key.exponent())).map_err(|_| ())?,
    };
    let encoded = der_key
        .encode_to_slice(&mut scratch[..RSA2048_MAX_DER_PUBLIC_KEY_SIZE])
        .map_err(|_| ())?;

    UnparsedPublicKey::new(&signature::RSA_PKCS1_2048_8192_SHA256, encoded)
        .verify(message, raw_signature)
        .map_err(|_| ())
}

impl RomOracle for SoftRom {
    fn validate_key_module(
        &self,
        module: &[u8],
        bank: KeyBank,
        scratch: &mut [u8],
    ) -> Result<(), RomError> {
        if scratch.len() < SCRATCH_HEAP_SIZE {
            return Err(RomError::ScratchTooSmall);
        }
        let fuses = self.fuses.bank(bank).ok_or(RomError::InvalidKeyBank)?;

        let (header, signed, key_block, raw_signature) = split(module)?;
        if header.module_size > MAX_KEY_MODULE_SIZE {
            return Err(RomError::ModuleTooLarge);
        }

        // The trailing key block must be the fused root key before it is
        // allowed to speak for anything.
        let root_key = PublicKey::from_key_block(key_block).map_err(|_| RomError::OutOfBounds)?;
        if root_key.key_digest() != fuses.key_digest {
            return Err(RomError::FuseCompareFail);
        }

        // A correctly signed module below the fused floor stays revoked.
        if fuses.is_revoked(header.svn_index, header.svn) {
            return Err(RomError::SvnRevoked);
        }

        verify_rsa(&root_key, signed, raw_signature, scratch)
            .map_err(|_| RomError::KeyValidationFail)
    }

    fn validate_image(
        &self,
        image: &[u8],
        key: &PublicKey<'_>,
        scratch: &mut [u8],
    ) -> Result<(), RomError> {
        if scratch.len() < SCRATCH_HEAP_SIZE {
            return Err(RomError::ScratchTooSmall);
        }
        let (_header, signed, _key_block, raw_signature) = split(image)?;
        verify_rsa(key, signed, raw_signature, scratch).map_err(|_| RomError::SignatureFail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuse::FuseBank;
    use crate::testutil::{provisioned_rom, KEY_MODULE, ROOT_KEY_DIGEST};

    #[test]
    fn test_key_module_validates() {
        let rom = provisioned_rom();
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE];
        assert_eq!(
            rom.validate_key_module(KEY_MODULE, KeyBank::DEFAULT, &mut scratch),
            Ok(())
        );
    }

    #[test]
    fn test_unprovisioned_bank() {
        let rom = provisioned_rom();
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE];
        assert_eq!(
            rom.validate_key_module(KEY_MODULE, KeyBank::new(1).unwrap(), &mut scratch),
            Err(RomError::InvalidKeyBank)
        );
    }

    #[test]
    fn test_fuse_compare() {
        let rom = SoftRom::new(
            FuseMap::new().provision(KeyBank::DEFAULT, FuseBank::new([0u8; 32])),
        );
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE];
        assert_eq!(
            rom.validate_key_module(KEY_MODULE, KeyBank::DEFAULT, &mut scratch),
            Err(RomError::FuseCompareFail)
        );
    }

    #[test]
    fn test_svn_floor_revokes_signed_module() {
        // The fixture key module declares svn 3 at index 0; a floor of 5
        // revokes it no matter how good the signature is.
        let bank = FuseBank::new(ROOT_KEY_DIGEST).with_svn_floor(0, 5);
        let rom = SoftRom::new(FuseMap::new().provision(KeyBank::DEFAULT, bank));
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE];
        assert_eq!(
            rom.validate_key_module(KEY_MODULE, KeyBank::DEFAULT, &mut scratch),
            Err(RomError::SvnRevoked)
        );
    }

    #[test]
    fn test_tampered_key_module() {
        let rom = provisioned_rom();
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE];
        let mut module = [0u8; 840];
        module.copy_from_slice(KEY_MODULE);
        // Flip one bit inside the signed OEM key record.
        module[100] ^= 0x01;
        assert_eq!(
            rom.validate_key_module(&module, KeyBank::DEFAULT, &mut scratch),
            Err(RomError::KeyValidationFail)
        );
    }

    #[test]
    fn test_scratch_too_small() {
        let rom = provisioned_rom();
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE - 1];
        assert_eq!(
            rom.validate_key_module(KEY_MODULE, KeyBank::DEFAULT, &mut scratch),
            Err(RomError::ScratchTooSmall)
        );
    }

    #[test]
    fn test_split_rejects_garbage() {
        let mut scratch = [0u8; SCRATCH_HEAP_SIZE];
        let rom = provisioned_rom();
        assert_eq!(
            rom.validate_key_module(&[0u8; 64], KeyBank::DEFAULT, &mut scratch),
            Err(RomError::NoValidModules)
        );
        assert_eq!(
            rom.validate_key_module(&[0u8; 8], KeyBank::DEFAULT, &mut scratch),
            Err(RomError::OutOfBounds)
        );
    }
}
