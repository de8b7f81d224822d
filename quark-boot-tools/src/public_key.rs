// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! DER parsing for key files supplied to the tools.

use anyhow::{anyhow, bail, Result};
use der::asn1::{AnyRef, BitStringRef, ObjectIdentifier, UintRef};
use der::{Decode, Sequence};

use quark_boot::csh::RSA2048_MODULUS_SIZE;

// rsaEncryption OBJECT IDENTIFIER ::= {
//    iso(1) member-body(2) us(840) rsadsi(113549) pkcs(1) pkcs-1(1) 1
// }
pub const RSA_PUBKEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

// As specified in rfc3280#section-4.1.2.7
// AlgorithmIdentifier  ::=  SEQUENCE  {
//    algorithm               OBJECT IDENTIFIER,
//    parameters              ANY DEFINED BY algorithm OPTIONAL
// }
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub struct AlgorithmIdentifier<'a> {
    pub algorithm: ObjectIdentifier,
    pub parameters: Option<AnyRef<'a>>,
}

// As specified in rfc3280#section-4.1.1.2
// SubjectPublicKeyInfo  ::=  SEQUENCE  {
//    algorithm            AlgorithmIdentifier,
//    subjectPublicKey     BIT STRING
// }
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub struct SubjectPublicKeyInfo<'a> {
    pub algorithm: AlgorithmIdentifier<'a>,
    pub subject_public_key: BitStringRef<'a>,
}

// rfc3279#section-2.3.1 RSA Keys
//
// RSAPublicKey ::= SEQUENCE {
//     modulus            INTEGER,    -- n
//     publicExponent     INTEGER  }  -- e
//
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub struct RsaPublicKeyInfo<'a> {
    pub modulus: UintRef<'a>,
    pub exponent: UintRef<'a>,
}

/// Extract `(modulus, exponent)` from a DER `SubjectPublicKeyInfo` holding
/// an RSA-2048 key.
pub fn rsa_components(spki_der: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let spki = SubjectPublicKeyInfo::from_der(spki_der)
        .map_err(|e| anyhow!("invalid SubjectPublicKeyInfo: {e}"))?;
    if spki.algorithm.algorithm != RSA_PUBKEY_OID {
        bail!("unsupported key type {}", spki.algorithm.algorithm);
    }

    let key_bits = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| anyhow!("public key BIT STRING has unused bits"))?;
    let key = RsaPublicKeyInfo::from_der(key_bits)
        .map_err(|e| anyhow!("invalid RSAPublicKey: {e}"))?;

    let modulus = key.modulus.as_bytes();
    if modulus.len() != RSA2048_MODULUS_SIZE {
        bail!("unsupported RSA modulus length {}", modulus.len());
    }
    Ok((modulus.to_vec(), key.exponent.as_bytes().to_vec()))
}
