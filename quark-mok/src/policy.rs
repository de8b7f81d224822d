// Copyright (c) 2023 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Platform-authentication chaining with a Machine Owner Key fallback.
//!
//! The platform's own verifier always speaks first. Only when it denies a
//! file does the operator-controlled trust list get a say, and when that
//! list also declines, the platform's original status is what the caller
//! sees. There is no path on which a denial is upgraded to success without
//! an explicit trust-list hit.

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use log::info;
use ring::digest;

/// Denial statuses the chained platform verifier can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformDenial {
    SecurityViolation,
    AccessDenied,
}

impl Display for PlatformDenial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecurityViolation => write!(f, "security violation"),
            Self::AccessDenied => write!(f, "access denied"),
        }
    }
}

/// The platform's own file-authentication service.
pub trait PlatformVerifier {
    fn authenticate(&self, file: &[u8]) -> Result<(), PlatformDenial>;
}

/// Operator-controlled trust list: SHA-256 digests of whole files the
/// machine owner has enrolled.
#[derive(Clone, Debug, Default)]
pub struct MokList {
    digests: Vec<[u8; 32]>,
}

impl MokList {
    pub fn new() -> Self {
        MokList::default()
    }

    pub fn enroll(&mut self, file_digest: [u8; 32]) {
        if !self.digests.contains(&file_digest) {
            self.digests.push(file_digest);
        }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Whether the file's digest is enrolled.
    pub fn contains(&self, file: &[u8]) -> bool {
        let d = digest::digest(&digest::SHA256, file);
        self.digests.iter().any(|known| known == d.as_ref())
    }
}

/// Extra admission hook consulted alongside the enrolled digests.
pub type ExtraCheck = fn(&[u8]) -> bool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyError {
    /// Platform denial that the trust list did not override. Carries the
    /// platform's original status, untouched.
    Platform(PlatformDenial),
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform(denial) => write!(f, "platform denied file: {denial}"),
        }
    }
}

/// The chained policy: platform first, trust list as fallback.
pub struct SecurityPolicy<'a, P: PlatformVerifier> {
    platform: &'a P,
    mok: &'a MokList,
    extra_check: Option<ExtraCheck>,
}

impl<'a, P: PlatformVerifier> SecurityPolicy<'a, P> {
    pub fn new(platform: &'a P, mok: &'a MokList) -> Self {
        SecurityPolicy {
            platform,
            mok,
            extra_check: None,
        }
    }

    pub fn with_extra_check(mut self, check: ExtraCheck) -> Self {
        self.extra_check = Some(check);
        self
    }

    /// Authenticate a file for execution.
    pub fn authenticate_file(&self, file: &[u8]) -> Result<(), PolicyError> {
        let denial = match self.platform.authenticate(file) {
            Ok(()) => return Ok(()),
            Err(denial) => denial,
        };

        if self.mok.contains(file) {
            info!("file admitted by machine owner key list");
            return Ok(());
        }
        if let Some(check) = self.extra_check {
            if check(file) {
                info!("file admitted by extra check");
                return Ok(());
            }
        }

        Err(PolicyError::Platform(denial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPlatform(Result<(), PlatformDenial>);
    impl PlatformVerifier for FixedPlatform {
        fn authenticate(&self, _file: &[u8]) -> Result<(), PlatformDenial> {
            self.0
        }
    }

    fn digest_of(file: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(digest::digest(&digest::SHA256, file).as_ref());
        out
    }

    #[test]
    fn test_platform_accept_short_circuits() {
        let platform = FixedPlatform(Ok(()));
        let mok = MokList::new();
        let policy = SecurityPolicy::new(&platform, &mok);
        assert!(policy.authenticate_file(b"anything").is_ok());
    }

    #[test]
    fn test_mok_fallback_admits_enrolled_file() {
        let platform = FixedPlatform(Err(PlatformDenial::SecurityViolation));
        let mut mok = MokList::new();
        mok.enroll(digest_of(b"owner blessed image"));
        let policy = SecurityPolicy::new(&platform, &mok);

        assert!(policy.authenticate_file(b"owner blessed image").is_ok());
        // A different file stays denied.
        assert_eq!(
            policy.authenticate_file(b"something else"),
            Err(PolicyError::Platform(PlatformDenial::SecurityViolation))
        );
    }

    #[test]
    fn test_original_status_is_surfaced() {
        // The fallback declining must not re-color the platform's status.
        let platform = FixedPlatform(Err(PlatformDenial::AccessDenied));
        let mok = MokList::new();
        let policy = SecurityPolicy::new(&platform, &mok).with_extra_check(|_| false);
        assert_eq!(
            policy.authenticate_file(b"image"),
            Err(PolicyError::Platform(PlatformDenial::AccessDenied))
        );
    }

    #[test]
    fn test_extra_check_admits() {
        let platform = FixedPlatform(Err(PlatformDenial::SecurityViolation));
        let mok = MokList::new();
        let policy =
            SecurityPolicy::new(&platform, &mok).with_extra_check(|file| file.starts_with(b"ok:"));
        assert!(policy.authenticate_file(b"ok: image").is_ok());
        assert!(policy.authenticate_file(b"image").is_err());
    }

    #[test]
    fn test_enroll_deduplicates() {
        let mut mok = MokList::new();
        mok.enroll([7u8; 32]);
        mok.enroll([7u8; 32]);
        assert_eq!(mok.len(), 1);
        assert!(!mok.is_empty());
    }
}
