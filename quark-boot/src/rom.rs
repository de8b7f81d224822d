// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! The boundary to the masked BootROM validation services.
//!
//! The ROM publishes two immutable routines behind fixed addresses: one
//! validates a signed key module against a fuse bank, one validates an image
//! against a supplied public key. This module treats them as an opaque
//! oracle: bytes in, a closed status enumeration out. [`RomEntrypoints`]
//! binds the real ROM table; [`crate::softrom::SoftRom`] implements the same
//! contract in software.

use core::fmt::{self, Display, Formatter};

use crate::anchor::PublicKey;
use crate::fuse::KeyBank;
use crate::SecurityError;

/// Status codes produced by a validation oracle. One-to-one with the raw
/// word the ROM routines return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RomError {
    /// No module with a valid security header was found.
    NoValidModules,
    /// The embedded key digest does not match the selected fuse bank.
    FuseCompareFail,
    /// The module's SVN is below the fused floor for its index.
    SvnRevoked,
    /// The key-module signature did not verify against the root key.
    KeyValidationFail,
    /// The image signature did not verify against the supplied key.
    SignatureFail,
    /// A declared size or offset leaves the module buffer.
    OutOfBounds,
    /// The module exceeds what the routine will process.
    ModuleTooLarge,
    /// The key bank index does not name a provisioned bank.
    InvalidKeyBank,
    /// The caller-supplied scratch heap is smaller than the routine needs.
    ScratchTooSmall,
    /// The routine detected internal corruption. Not recoverable.
    StackCorrupt,
}

impl Display for RomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValidModules => write!(f, "no valid modules"),
            Self::FuseCompareFail => write!(f, "fuse digest compare failed"),
            Self::SvnRevoked => write!(f, "security version revoked"),
            Self::KeyValidationFail => write!(f, "key module validation failed"),
            Self::SignatureFail => write!(f, "image signature validation failed"),
            Self::OutOfBounds => write!(f, "module out of bounds"),
            Self::ModuleTooLarge => write!(f, "module too large"),
            Self::InvalidKeyBank => write!(f, "invalid key bank"),
            Self::ScratchTooSmall => write!(f, "scratch heap too small"),
            Self::StackCorrupt => write!(f, "validation stack corrupt"),
        }
    }
}

/// Signature-check primitive the verification chain is built on.
///
/// Implementations must be pure pass/fail: no partial results, nothing
/// retained from the scratch heap after return.
pub trait RomOracle {
    /// Validate a complete signed key module (header through signature
    /// block) against the root key fused into `bank`.
    fn validate_key_module(
        &self,
        module: &[u8],
        bank: KeyBank,
        scratch: &mut [u8],
    ) -> Result<(), RomError>;

    /// Validate a complete signed image against `key`, covering the
    /// contiguous signed region declared by its header.
    fn validate_image(
        &self,
        image: &[u8],
        key: &PublicKey<'_>,
        scratch: &mut [u8],
    ) -> Result<(), RomError>;
}

/// Minimum scratch heap the ROM routines require for their own transient
/// allocations.
pub const SCRATCH_HEAP_SIZE: usize = 0x1400;

/// Caller-provided scratch heap, checked once at construction.
///
/// The buffer is zero-filled before every oracle call and must be treated as
/// garbage afterwards; the validators never retain a pointer into it. An
/// undersized buffer is rejected here, before any oracle is invoked.
pub struct Scratch<'a> {
    buf: &'a mut [u8],
}

impl<'a> Scratch<'a> {
    pub fn new(buf: &'a mut [u8]) -> Result<Self, SecurityError> {
        if buf.len() < SCRATCH_HEAP_SIZE {
            return Err(SecurityError::InvalidParameter);
        }
        Ok(Scratch { buf })
    }

    /// Zero-fill and hand out the raw heap for one oracle call.
    pub(crate) fn zeroed(&mut self) -> &mut [u8] {
        self.buf.fill(0);
        self.buf
    }
}

// Raw calling signatures of the ROM table entries.
pub type RomValidateKeyFn = unsafe extern "C" fn(
    module: *const u8,
    module_len: u32,
    key_bank: u32,
    scratch: *mut u8,
    scratch_len: u32,
) -> u32;

pub type RomValidateModuleFn = unsafe extern "C" fn(
    module: *const u8,
    module_len: u32,
    key_modulus: *const u8,
    key_exponent: u32,
    scratch: *mut u8,
    scratch_len: u32,
) -> u32;

// Raw status words returned by the ROM routines.
const ROM_STATUS_SUCCESS: u32 = 0;
const ROM_STATUS_NO_VALID_MODULES: u32 = 1;
const ROM_STATUS_FUSE_COMPARE_FAIL: u32 = 2;
const ROM_STATUS_SVN_REVOKED: u32 = 3;
const ROM_STATUS_KEY_VALIDATION_FAIL: u32 = 4;
const ROM_STATUS_SIGNATURE_FAIL: u32 = 5;
const ROM_STATUS_OUT_OF_BOUNDS: u32 = 6;
const ROM_STATUS_MODULE_TOO_LARGE: u32 = 7;
const ROM_STATUS_INVALID_KEY_BANK: u32 = 8;
const ROM_STATUS_SCRATCH_TOO_SMALL: u32 = 9;

fn status_to_result(status: u32) -> Result<(), RomError> {
    match status {
        ROM_STATUS_SUCCESS => Ok(()),
        ROM_STATUS_NO_VALID_MODULES => Err(RomError::NoValidModules),
        ROM_STATUS_FUSE_COMPARE_FAIL => Err(RomError::FuseCompareFail),
        ROM_STATUS_SVN_REVOKED => Err(RomError::SvnRevoked),
        ROM_STATUS_KEY_VALIDATION_FAIL => Err(RomError::KeyValidationFail),
        ROM_STATUS_SIGNATURE_FAIL => Err(RomError::SignatureFail),
        ROM_STATUS_OUT_OF_BOUNDS => Err(RomError::OutOfBounds),
        ROM_STATUS_MODULE_TOO_LARGE => Err(RomError::ModuleTooLarge),
        ROM_STATUS_INVALID_KEY_BANK => Err(RomError::InvalidKeyBank),
        ROM_STATUS_SCRATCH_TOO_SMALL => Err(RomError::ScratchTooSmall),
        // Anything else means the ROM itself is confused.
        _ => Err(RomError::StackCorrupt),
    }
}

/// The hardware oracle: the two ROM routines reached through their fixed
/// table addresses.
pub struct RomEntrypoints {
    validate_key: RomValidateKeyFn,
    validate_module: RomValidateModuleFn,
}

impl RomEntrypoints {
    /// Bind caller-supplied entry points, e.g. from a relocated ROM table.
    ///
    /// # Safety
    ///
    /// Both pointers must be the genuine ROM routines with the signatures
    /// above, callable for the lifetime of the returned value.
    pub unsafe fn new(
        validate_key: RomValidateKeyFn,
        validate_module: RomValidateModuleFn,
    ) -> Self {
        RomEntrypoints {
            validate_key,
            validate_module,
        }
    }

    /// Bind the fixed table addresses from the flash layout.
    ///
    /// # Safety
    ///
    /// Only meaningful on the target, where the ROM is actually mapped at
    /// those addresses.
    pub unsafe fn from_fixed_addresses() -> Self {
        RomEntrypoints {
            validate_key: core::mem::transmute::<usize, RomValidateKeyFn>(
                quark_layout::build_time::BOOTROM_VALIDATE_KEY_ENTRYPOINT_ADDRESS,
            ),
            validate_module: core::mem::transmute::<usize, RomValidateModuleFn>(
                quark_layout::build_time::BOOTROM_VALIDATE_MODULE_ENTRYPOINT_ADDRESS,
            ),
        }
    }
}

impl RomOracle for RomEntrypoints {
    fn validate_key_module(
        &self,
        module: &[u8],
        bank: KeyBank,
        scratch: &mut [u8],
    ) -> Result<(), RomError> {
        let status = unsafe {
            (self.validate_key)(
                module.as_ptr(),
                module.len() as u32,
                bank.index() as u32,
                scratch.as_mut_ptr(),
                scratch.len() as u32,
            )
        };
        status_to_result(status)
    }

    fn validate_image(
        &self,
        image: &[u8],
        key: &PublicKey<'_>,
        scratch: &mut [u8],
    ) -> Result<(), RomError> {
        let mut exponent = [0u8; 4];
        exponent[4 - key.exponent().len()..].copy_from_slice(key.exponent());
        let status = unsafe {
            (self.validate_module)(
                image.as_ptr(),
                image.len() as u32,
                key.modulus().as_ptr(),
                u32::from_be_bytes(exponent),
                scratch.as_mut_ptr(),
                scratch.len() as u32,
            )
        };
        status_to_result(status)
    }
}
