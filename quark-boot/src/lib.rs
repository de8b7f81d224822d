// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

#![no_std]

//! Secure-boot verification chain for Quark-class firmware modules.
//!
//! Every module loaded from SPI flash (stage images, firmware volumes,
//! recovery capsules) carries a CSH security header followed by the module
//! body, a public-key block and an RSA-2048 signature. The chain of trust is
//! two levels deep: a hardware-fused root-key digest authenticates a signed
//! key module, and the OEM public key recovered from that module
//! authenticates every other image. The signature math itself lives behind
//! the [`rom::RomOracle`] boundary, which is either the masked BootROM
//! validation services ([`rom::RomEntrypoints`]) or a software oracle with
//! identical semantics ([`softrom::SoftRom`]).
//!
//! The decision produced by this crate is binary: a module validates, or the
//! boot does not proceed with it. No caller may treat a firmware volume or
//! capsule payload as trustworthy without [`image::authenticate_image`] (or
//! the orchestration wrappers built on it) succeeding first.

use core::fmt::{self, Display, Formatter};

pub mod anchor;
pub mod csh;
pub mod fuse;
pub mod fv;
pub mod fvsec;
pub mod image;
pub mod keymod;
pub mod recovery;
pub mod rom;
pub mod softrom;
pub mod svn;

#[cfg(test)]
mod testutil;

/// Failure taxonomy surfaced by the verification chain.
///
/// Every failure is surfaced to the immediate caller as one of these; no
/// layer converts a failure into success. On the boot path the caller's
/// response to any variant is to halt, not to continue degraded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityError {
    /// Malformed call, e.g. an undersized scratch heap.
    InvalidParameter,
    /// A fixed-capacity table filled up.
    OutOfResources,
    /// A cryptographic check failed or the module is not well formed.
    SecurityViolation,
    /// The module's security version number is below the revocation floor.
    Revoked,
    /// The embedded key does not match the fused root-key digest.
    FuseCompareFail,
    /// Unknown key bank, algorithm identifier or header version.
    Unsupported,
    /// The ROM reported an internal inconsistency; not recoverable.
    Fatal,
}

impl Display for SecurityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::OutOfResources => write!(f, "out of resources"),
            Self::SecurityViolation => write!(f, "security violation"),
            Self::Revoked => write!(f, "security version number revoked"),
            Self::FuseCompareFail => write!(f, "fused key digest mismatch"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Fatal => write!(f, "fatal validation state"),
        }
    }
}

impl From<rom::RomError> for SecurityError {
    fn from(err: rom::RomError) -> Self {
        match err {
            rom::RomError::NoValidModules
            | rom::RomError::KeyValidationFail
            | rom::RomError::SignatureFail
            | rom::RomError::OutOfBounds
            | rom::RomError::ModuleTooLarge => SecurityError::SecurityViolation,
            rom::RomError::FuseCompareFail => SecurityError::FuseCompareFail,
            rom::RomError::SvnRevoked => SecurityError::Revoked,
            rom::RomError::InvalidKeyBank => SecurityError::Unsupported,
            rom::RomError::ScratchTooSmall => SecurityError::InvalidParameter,
            rom::RomError::StackCorrupt => SecurityError::Fatal,
        }
    }
}
