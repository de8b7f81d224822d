// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Recovery image scan.
//!
//! When the normal boot path is lost, the recovery region is swept for
//! candidate signed modules: any 4-byte-aligned CSH identifier starts a
//! candidate. Candidates that fail to parse are simply passed over; only an
//! exhausted sweep is fatal. The first candidate that validates against the
//! fused hierarchy wins.

use log::{error, info};

use crate::csh::CSH_IDENTIFIER;
use crate::fuse::KeyBank;
use crate::image;
use crate::rom::{RomOracle, Scratch};
use crate::SecurityError;

/// Iterator over candidate module offsets in a flash region.
pub struct ModuleCandidates<'a> {
    region: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for ModuleCandidates<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let magic = CSH_IDENTIFIER.to_le_bytes();
        while self.offset + 4 <= self.region.len() {
            let offset = self.offset;
            self.offset += 4;
            if self.region[offset..offset + 4] == magic {
                return Some(offset);
            }
        }
        None
    }
}

/// All 4-byte-aligned offsets in `region` that carry the CSH identifier.
pub fn find_modules(region: &[u8]) -> ModuleCandidates<'_> {
    ModuleCandidates { region, offset: 0 }
}

/// A module that survived the recovery sweep.
#[derive(Debug, PartialEq, Eq)]
pub struct RecoveredModule<'a> {
    /// Offset of the module within the swept region.
    pub offset: usize,
    /// The full signed module, header through signature block.
    pub module: &'a [u8],
}

/// Sweep `region` and return the first module that authenticates under the
/// key module and fuse bank. Exhausting the sweep fails closed.
pub fn authenticate_recovery_image<'a, R: RomOracle>(
    rom: &R,
    region: &'a [u8],
    key_module: &[u8],
    bank: KeyBank,
    scratch: &mut Scratch<'_>,
) -> Result<RecoveredModule<'a>, SecurityError> {
    // Validate the key hierarchy once, not per candidate.
    let oem = crate::keymod::validate_key_module(rom, key_module, bank, scratch)?;

    for offset in find_modules(region) {
        let candidate = &region[offset..];
        let verifier = match image::ImageVerifier::new(candidate) {
            Ok(v) => v,
            // A stray identifier in the middle of other data; keep sweeping.
            Err(_) => continue,
        };
        match verifier.verify(rom, &crate::anchor::TrustAnchor::Oem(oem), scratch) {
            Ok(()) => {
                info!("recovery module found at offset {offset:#x}");
                let total = verifier.header().total_size();
                return Ok(RecoveredModule {
                    offset,
                    module: &candidate[..total],
                });
            }
            Err(err) => {
                info!("recovery candidate at {offset:#x} rejected: {err}");
            }
        }
    }

    error!("recovery sweep found no valid modules");
    Err(SecurityError::SecurityViolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::SCRATCH_HEAP_SIZE;
    use crate::testutil::{provisioned_rom, KEY_MODULE, SIGNED_IMAGE};

    #[test]
    fn test_find_modules_is_aligned() {
        let mut region = [0u8; 64];
        region[8..12].copy_from_slice(&CSH_IDENTIFIER.to_le_bytes());
        // An unaligned occurrence is not a candidate.
        region[21..25].copy_from_slice(&CSH_IDENTIFIER.to_le_bytes());
        let found: [Option<usize>; 2] = {
            let mut it = find_modules(&region);
            [it.next(), it.next()]
        };
        assert_eq!(found, [Some(8), None]);
    }

    #[test]
    fn test_recovery_sweep_finds_image() {
        let rom = provisioned_rom();
        let mut buf = [0u8; SCRATCH_HEAP_SIZE];
        let mut scratch = Scratch::new(&mut buf).unwrap();

        // Region: noise, a decoy identifier with no valid module behind it,
        // then the real image at an aligned offset.
        let mut region = [0xEEu8; 8192];
        region[16..20].copy_from_slice(&CSH_IDENTIFIER.to_le_bytes());
        region[1024..1024 + SIGNED_IMAGE.len()].copy_from_slice(SIGNED_IMAGE);

        let recovered =
            authenticate_recovery_image(&rom, &region, KEY_MODULE, KeyBank::DEFAULT, &mut scratch)
                .unwrap();
        assert_eq!(recovered.offset, 1024);
        assert_eq!(recovered.module, SIGNED_IMAGE);
    }

    #[test]
    fn test_exhausted_sweep_fails_closed() {
        let rom = provisioned_rom();
        let mut buf = [0u8; SCRATCH_HEAP_SIZE];
        let mut scratch = Scratch::new(&mut buf).unwrap();

        let region = [0u8; 4096];
        assert_eq!(
            authenticate_recovery_image(&rom, &region, KEY_MODULE, KeyBank::DEFAULT, &mut scratch),
            Err(SecurityError::SecurityViolation)
        );
    }

    #[test]
    fn test_tampered_candidate_is_passed_over() {
        let rom = provisioned_rom();
        let mut buf = [0u8; SCRATCH_HEAP_SIZE];
        let mut scratch = Scratch::new(&mut buf).unwrap();

        // A tampered copy first, the good copy later; the sweep lands on
        // the good one.
        let mut region = [0u8; 16384];
        let mut tampered = [0u8; 4612];
        tampered.copy_from_slice(SIGNED_IMAGE);
        tampered[1500] ^= 0x10;
        region[0..4612].copy_from_slice(&tampered);
        region[8192..8192 + 4612].copy_from_slice(SIGNED_IMAGE);

        let recovered =
            authenticate_recovery_image(&rom, &region, KEY_MODULE, KeyBank::DEFAULT, &mut scratch)
                .unwrap();
        assert_eq!(recovered.offset, 8192);
    }
}
