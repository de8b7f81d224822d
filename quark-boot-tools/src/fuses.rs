// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Fuse-record enrollment.
//!
//! A fuse record is the JSON description of what gets blown into one key
//! bank: the SHA-256 digest of the root public key and the SVN floors. The
//! provisioning flow consumes it; test harnesses load it into a
//! [`quark_boot::fuse::FuseBank`] directly.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use quark_boot::anchor::PublicKey;
use quark_boot::fuse::{FuseBank, SVN_INDEX_COUNT};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct FuseRecord {
    /// Hex SHA-256 of the root key block (modulus | big-endian exponent).
    pub key_digest: String,
    /// One floor per SVN index.
    pub svn_floor: Vec<u32>,
}

impl FuseRecord {
    pub fn from_public_key(
        modulus: &[u8],
        exponent: &[u8],
        svn_floor: [u32; SVN_INDEX_COUNT],
    ) -> Result<Self> {
        let key = PublicKey::new(modulus, exponent)
            .map_err(|e| anyhow::anyhow!("invalid public key: {e}"))?;
        Ok(FuseRecord {
            key_digest: hex::encode(key.key_digest()),
            svn_floor: svn_floor.to_vec(),
        })
    }

    pub fn to_fuse_bank(&self) -> Result<FuseBank> {
        let digest = hex::decode(&self.key_digest).context("invalid key digest hex")?;
        if digest.len() != 32 {
            bail!("key digest must be 32 bytes, got {}", digest.len());
        }
        if self.svn_floor.len() != SVN_INDEX_COUNT {
            bail!(
                "expected {} SVN floors, got {}",
                SVN_INDEX_COUNT,
                self.svn_floor.len()
            );
        }
        let mut key_digest = [0u8; 32];
        key_digest.copy_from_slice(&digest);
        let mut svn_floor = [0u32; SVN_INDEX_COUNT];
        svn_floor.copy_from_slice(&self.svn_floor);
        Ok(FuseBank {
            key_digest,
            svn_floor,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize fuse record")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse fuse record")
    }
}
