// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Shared fixtures for the unit tests: pre-signed modules plus the fuse
//! digests of the keys that signed them.

use crate::fuse::{FuseBank, FuseMap, KeyBank};
use crate::softrom::SoftRom;

/// Signed key module: OEM key record body, signed by the root key,
/// `header_size` 56, svn index 0, svn 3.
pub(crate) const KEY_MODULE: &[u8] = include_bytes!("../testdata/key_module.bin");

/// Signed image: 3072-byte patterned body, signed by the OEM key,
/// `header_size` 1024, svn index 2, svn 7.
pub(crate) const SIGNED_IMAGE: &[u8] = include_bytes!("../testdata/signed_image.bin");

/// Signed module whose body is a 4096-byte firmware volume, signed by the
/// OEM key, svn index 1, svn 2.
pub(crate) const SIGNED_FV: &[u8] = include_bytes!("../testdata/signed_fv.bin");

/// SHA-256 of the root key block trailing `key_module.bin`.
pub(crate) const ROOT_KEY_DIGEST: [u8; 32] = [
    0xc5, 0xbc, 0xb7, 0xeb, 0x18, 0x7a, 0x05, 0x64, 0xc0, 0xd4, 0x0f, 0x82, 0xf1, 0x13, 0xce,
    0x3d, 0x07, 0xd3, 0x2d, 0xd3, 0x00, 0x46, 0xce, 0x56, 0x8a, 0xc3, 0x73, 0x89, 0xca, 0xd4,
    0xee, 0x91,
];

/// SHA-256 of the OEM key block trailing `signed_image.bin`.
pub(crate) const OEM_KEY_DIGEST: [u8; 32] = [
    0xdc, 0x49, 0xc1, 0x7f, 0x0e, 0xaa, 0x77, 0x23, 0x3f, 0xb6, 0x3f, 0xcb, 0x32, 0xb3, 0x4c,
    0x61, 0x0e, 0x58, 0x13, 0x3f, 0xb4, 0x63, 0x96, 0xae, 0xb4, 0xbf, 0x5e, 0xf4, 0xd4, 0xea,
    0x43, 0x57,
];

/// A soft ROM whose default bank is fused to the fixture root key.
pub(crate) fn provisioned_rom() -> SoftRom {
    SoftRom::new(FuseMap::new().provision(KeyBank::DEFAULT, FuseBank::new(ROOT_KEY_DIGEST)))
}
