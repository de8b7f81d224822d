// Copyright (c) 2023 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Abstract access to platform variables.
//!
//! Firmware backs this with the runtime variable services; tests back it
//! with memory. Attribute words follow the platform's encoding.

use alloc::vec::Vec;

use r_efi::efi::Guid;

pub const VARIABLE_NON_VOLATILE: u32 = 0x0000_0001;
pub const VARIABLE_BOOTSERVICE_ACCESS: u32 = 0x0000_0002;
pub const VARIABLE_RUNTIME_ACCESS: u32 = 0x0000_0004;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarError {
    NotFound,
    /// The backend refused the write, e.g. authenticated-write policy.
    AccessDenied,
    DeviceError,
}

pub trait VarStore {
    fn get(&self, name: &str, vendor: &Guid) -> Result<(Vec<u8>, u32), VarError>;

    /// Write a variable. An empty `data` deletes it.
    fn set(&mut self, name: &str, vendor: &Guid, attributes: u32, data: &[u8])
        -> Result<(), VarError>;
}
