// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Hardware fuse banks backing the root of trust.
//!
//! Each bank holds the SHA-256 digest of one root public key plus the
//! per-index security-version floors. Banks are immutable once blown; the
//! software view here is read-only and is handed to the oracle that performs
//! the fuse comparison.

use crate::SecurityError;

/// Number of root-key fuse banks in the part.
pub const KEY_BANK_COUNT: usize = 3;

/// Number of independent security-version counters.
pub const SVN_INDEX_COUNT: usize = 16;

/// Index of a root-key fuse bank, range checked at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyBank(u8);

impl KeyBank {
    /// Bank 0, the one production parts are provisioned with.
    pub const DEFAULT: KeyBank = KeyBank(0);

    pub fn new(index: u8) -> Result<Self, SecurityError> {
        if (index as usize) < KEY_BANK_COUNT {
            Ok(KeyBank(index))
        } else {
            Err(SecurityError::Unsupported)
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One provisioned fuse bank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuseBank {
    /// SHA-256 over the root key block (modulus | big-endian exponent).
    pub key_digest: [u8; 32],
    /// Minimum acceptable SVN per index; a module below its floor is revoked.
    pub svn_floor: [u32; SVN_INDEX_COUNT],
}

impl FuseBank {
    pub fn new(key_digest: [u8; 32]) -> Self {
        FuseBank {
            key_digest,
            svn_floor: [0; SVN_INDEX_COUNT],
        }
    }

    pub fn with_svn_floor(mut self, index: usize, floor: u32) -> Self {
        self.svn_floor[index] = floor;
        self
    }

    /// A module declaring `svn` for `svn_index` is revoked when the value is
    /// strictly below the fused floor. An out-of-range index is revoked
    /// outright; there is no floor to compare against.
    pub fn is_revoked(&self, svn_index: u32, svn: u32) -> bool {
        match self.svn_floor.get(svn_index as usize) {
            Some(floor) => svn < *floor,
            None => true,
        }
    }
}

/// The part's full set of fuse banks. Unprovisioned banks stay `None` and
/// fail validation as an unknown bank.
#[derive(Clone, Debug, Default)]
pub struct FuseMap {
    banks: [Option<FuseBank>; KEY_BANK_COUNT],
}

impl FuseMap {
    pub fn new() -> Self {
        FuseMap::default()
    }

    pub fn provision(mut self, bank: KeyBank, fuses: FuseBank) -> Self {
        self.banks[bank.index()] = Some(fuses);
        self
    }

    pub fn bank(&self, bank: KeyBank) -> Option<&FuseBank> {
        self.banks[bank.index()].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bank_range() {
        assert!(KeyBank::new(0).is_ok());
        assert!(KeyBank::new(2).is_ok());
        assert_eq!(KeyBank::new(3), Err(SecurityError::Unsupported));
        assert_eq!(KeyBank::default(), KeyBank::DEFAULT);
    }

    #[test]
    fn test_svn_floor() {
        let bank = FuseBank::new([0u8; 32]).with_svn_floor(2, 5);
        assert!(!bank.is_revoked(2, 5));
        assert!(!bank.is_revoked(2, 6));
        assert!(bank.is_revoked(2, 4));
        // Indexes with no explicit floor accept anything.
        assert!(!bank.is_revoked(0, 0));
        // An index beyond the fuse array cannot be compared.
        assert!(bank.is_revoked(16, 100));
    }

    #[test]
    fn test_unprovisioned_bank() {
        let map = FuseMap::new().provision(KeyBank::DEFAULT, FuseBank::new([1u8; 32]));
        assert!(map.bank(KeyBank::DEFAULT).is_some());
        assert!(map.bank(KeyBank::new(1).unwrap()).is_none());
    }
}
