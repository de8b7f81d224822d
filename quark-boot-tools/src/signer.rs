// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Module signing.
//!
//! A signed module is the CSH header, signer padding and body as one
//! contiguous signed run, followed by the public key block and the RSA-2048
//! PKCS#1 v1.5 / SHA-256 signature. Key modules are the same shape with an
//! OEM public-key record as the body and the minimal 56-byte header region.

use std::io;
use std::mem::size_of;

use log::error;
use ring::rand;
use ring::signature::{KeyPair, RsaKeyPair, RSA_PKCS1_SHA256};

use quark_boot::csh::{
    CshHeader, CSH_CRYPTO_RSA2048_PKCS15, CSH_HASH_SHA256, CSH_IDENTIFIER, CSH_KEY_BLOCK_SIZE,
    CSH_SIGNATURE_SIZE, CSH_SVN_INDEX_MAX, CSH_VERSION_V1, RSA2048_EXPONENT_SIZE,
    RSA2048_MODULUS_SIZE,
};

/// Header region used for key modules: the bare header, no padding.
pub const KEY_MODULE_HEADER_SIZE: u32 = size_of::<CshHeader>() as u32;

/// Default header region for images, leaving signers room to grow.
pub const DEFAULT_IMAGE_HEADER_SIZE: u32 = 0x400;

/// Utility structure to sign one flash module.
pub struct ModuleSigner<'a> {
    key: RsaKeyPair,
    body: &'a [u8],
    header_size: u32,
    signed_module: Vec<u8>,
}

impl<'a> ModuleSigner<'a> {
    /// Create a new instance of `ModuleSigner`.
    pub fn new(body: &'a [u8], key: RsaKeyPair, header_size: u32) -> io::Result<Self> {
        if key.public_modulus_len() != RSA2048_MODULUS_SIZE {
            error!(
                "Invalid RSA public modulus length: {}",
                key.public_modulus_len()
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid RSA public modulus length",
            ));
        }
        if header_size < size_of::<CshHeader>() as u32 {
            error!("Invalid header region size: {:#x}", header_size);
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid header region size",
            ));
        }
        Ok(ModuleSigner {
            key,
            body,
            header_size,
            signed_module: Vec::new(),
        })
    }

    /// Create a `CshHeader` describing the module to be signed.
    pub fn build_header(&self, svn_index: u32, svn: u32, date: u32) -> io::Result<CshHeader> {
        if svn_index > CSH_SVN_INDEX_MAX {
            error!("Invalid SVN index {}, max {}", svn_index, CSH_SVN_INDEX_MAX);
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid SVN index",
            ));
        }

        Ok(CshHeader {
            identifier: CSH_IDENTIFIER,
            version: CSH_VERSION_V1,
            module_size: self.header_size + self.body.len() as u32,
            svn_index,
            svn,
            module_id: 0,
            module_vendor: 0,
            date,
            header_size: self.header_size,
            hash_algorithm: CSH_HASH_SHA256,
            crypto_algorithm: CSH_CRYPTO_RSA2048_PKCS15,
            key_size: CSH_KEY_BLOCK_SIZE,
            signature_size: CSH_SIGNATURE_SIZE,
            next_header: 0,
        })
    }

    /// Sign the module with the given header.
    pub fn sign(&mut self, header: CshHeader) -> io::Result<&[u8]> {
        let rng = rand::SystemRandom::new();

        self.signed_module = header.as_bytes().to_vec();
        self.signed_module
            .resize(self.header_size as usize, 0u8);
        self.signed_module.extend_from_slice(self.body);

        let modulus = self
            .key
            .public_key()
            .modulus()
            .big_endian_without_leading_zero();
        if modulus.len() != RSA2048_MODULUS_SIZE {
            error!("Invalid RSA modulus length: {}", modulus.len());
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid RSA modulus length",
            ));
        }

        let exponent = self
            .key
            .public_key()
            .exponent()
            .big_endian_without_leading_zero();
        if exponent.len() > RSA2048_EXPONENT_SIZE {
            error!(
                "Invalid RSA exponent length: {}, max {}",
                exponent.len(),
                RSA2048_EXPONENT_SIZE
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid RSA exponent size",
            ));
        }
        let mut exp_bytes = [0u8; RSA2048_EXPONENT_SIZE];
        exp_bytes[RSA2048_EXPONENT_SIZE - exponent.len()..].copy_from_slice(exponent);

        let mut signature = vec![0u8; self.key.public_modulus_len()];
        self.key
            .sign(&RSA_PKCS1_SHA256, &rng, &self.signed_module, &mut signature)
            .map_err(|e| {
                error!("Failed to sign module: {}", e);
                io::Error::new(io::ErrorKind::Other, "failed to sign module")
            })?;

        self.signed_module.extend_from_slice(modulus);
        self.signed_module.extend_from_slice(&exp_bytes);
        self.signed_module.extend_from_slice(&signature);

        Ok(&self.signed_module)
    }
}

/// Build the OEM public-key record carried as a key module's body:
/// `{ modulus_size, exponent_size, modulus, exponent }`.
pub fn oem_key_record(modulus: &[u8], exponent: &[u8]) -> io::Result<Vec<u8>> {
    if modulus.len() != RSA2048_MODULUS_SIZE {
        error!("Invalid OEM modulus length: {}", modulus.len());
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid OEM modulus length",
        ));
    }
    if exponent.is_empty() || exponent.len() > RSA2048_EXPONENT_SIZE {
        error!("Invalid OEM exponent length: {}", exponent.len());
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid OEM exponent length",
        ));
    }

    let mut record = Vec::with_capacity(8 + RSA2048_MODULUS_SIZE + RSA2048_EXPONENT_SIZE);
    record.extend_from_slice(&(RSA2048_MODULUS_SIZE as u32).to_le_bytes());
    record.extend_from_slice(&(RSA2048_EXPONENT_SIZE as u32).to_le_bytes());
    record.extend_from_slice(modulus);
    let mut exp_bytes = [0u8; RSA2048_EXPONENT_SIZE];
    exp_bytes[RSA2048_EXPONENT_SIZE - exponent.len()..].copy_from_slice(exponent);
    record.extend_from_slice(&exp_bytes);
    Ok(record)
}

/// Build a signed key module: the OEM public key as body, signed by the
/// root key the fuses vouch for.
pub fn build_key_module(
    oem_modulus: &[u8],
    oem_exponent: &[u8],
    root_key: RsaKeyPair,
    svn_index: u32,
    svn: u32,
    date: u32,
) -> io::Result<Vec<u8>> {
    let record = oem_key_record(oem_modulus, oem_exponent)?;
    let mut signer = ModuleSigner::new(&record, root_key, KEY_MODULE_HEADER_SIZE)?;
    let header = signer.build_header(svn_index, svn, date)?;
    let signed = signer.sign(header)?;
    Ok(signed.to_vec())
}
