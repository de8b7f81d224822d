// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Key-module validation: turning a fused root-key digest into a usable OEM
//! public key.
//!
//! A key module's body is an OEM public-key record; its trailing key block
//! is the root key the fuses vouch for, and its signature is by that root
//! key. Once the oracle accepts the module, the OEM key is extracted
//! zero-copy from the validated buffer.

use scroll::Pread;

use crate::anchor::{PublicKey, TrustAnchor};
use crate::csh::{CshHeader, RSA2048_EXPONENT_SIZE, RSA2048_MODULUS_SIZE};
use crate::fuse::KeyBank;
use crate::rom::{RomOracle, Scratch};
use crate::SecurityError;

/// Hard cap on a key module, well under the flash region reserved for it.
pub const MAX_KEY_MODULE_SIZE: u32 = 0x2000;

/// Validate `module` against the root key fused into `bank` and return the
/// OEM public key it carries.
///
/// Every failure is terminal for the call; there is no partial-trust state.
/// The scratch heap is zero-filled before the oracle runs and must be
/// treated as garbage afterwards.
pub fn validate_key_module<'a, R: RomOracle>(
    rom: &R,
    module: &'a [u8],
    bank: KeyBank,
    scratch: &mut Scratch<'_>,
) -> Result<PublicKey<'a>, SecurityError> {
    let header = CshHeader::read_from(module)?;
    header.validate(module.len())?;
    if header.module_size > MAX_KEY_MODULE_SIZE || header.module_size == header.header_size {
        return Err(SecurityError::SecurityViolation);
    }

    rom.validate_key_module(&module[..header.total_size()], bank, scratch.zeroed())?;

    oem_key_from_body(&module[header.body_range()])
}

/// Re-extract the OEM key from a module validated earlier in the boot,
/// without repeating the cryptographic work.
///
/// Callers own the judgement that the module really was validated; this
/// only re-checks the structure.
pub fn trusted_oem_key(module: &[u8]) -> Result<PublicKey<'_>, SecurityError> {
    let header = CshHeader::read_from(module)?;
    header.validate(module.len())?;
    if header.module_size > MAX_KEY_MODULE_SIZE || header.module_size == header.header_size {
        return Err(SecurityError::SecurityViolation);
    }
    oem_key_from_body(&module[header.body_range()])
}

/// Validate a key module under a fused anchor, yielding the next anchor in
/// the chain. The only legal advance is `Fused` -> `Oem`.
pub fn advance_anchor<'a, R: RomOracle>(
    rom: &R,
    anchor: &TrustAnchor<'_>,
    module: &'a [u8],
    scratch: &mut Scratch<'_>,
) -> Result<TrustAnchor<'a>, SecurityError> {
    match anchor {
        TrustAnchor::Fused(bank) => {
            let oem = validate_key_module(rom, module, *bank, scratch)?;
            Ok(TrustAnchor::Oem(oem))
        }
        TrustAnchor::Oem(_) => Err(SecurityError::Unsupported),
    }
}

// OEM key record: { modulus_size: u32, exponent_size: u32, modulus, exponent }.
fn oem_key_from_body(body: &[u8]) -> Result<PublicKey<'_>, SecurityError> {
    let mut offset = 0usize;
    let modulus_size = body
        .gread::<u32>(&mut offset)
        .map_err(|_| SecurityError::SecurityViolation)? as usize;
    let exponent_size = body
        .gread::<u32>(&mut offset)
        .map_err(|_| SecurityError::SecurityViolation)? as usize;

    if modulus_size != RSA2048_MODULUS_SIZE
        || exponent_size == 0
        || exponent_size > RSA2048_EXPONENT_SIZE
    {
        return Err(SecurityError::SecurityViolation);
    }
    if body.len() < offset + modulus_size + exponent_size {
        return Err(SecurityError::SecurityViolation);
    }

    let modulus = &body[offset..offset + modulus_size];
    let exponent = &body[offset + modulus_size..offset + modulus_size + exponent_size];
    PublicKey::new(modulus, exponent)
}
