// Copyright (c) 2023 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! SBAT generation-number revocations.
//!
//! Revocation data is CSV, one record per line. The first record is the
//! dated header row:
//!
//! ```text
//! sbat,1,2023012900
//! component,2
//! ```
//!
//! A component is revoked when its generation is below the one listed here.
//! The list is persisted in the `SbatLevel` platform variable and kept no
//! older than the copy embedded in the boot loader: a newer stored list
//! wins, an older, missing or malformed one is rewritten from the embedded
//! copy, and wrong attributes force a delete before the rewrite.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter, Write};

use log::info;
use r_efi::efi::Guid;

use crate::varstore::{VarError, VarStore, VARIABLE_BOOTSERVICE_ACCESS, VARIABLE_NON_VOLATILE};

/// Name of the platform variable holding the persisted revocation list.
pub const SBAT_LEVEL_VARIABLE_NAME: &str = "SbatLevel";

/// Vendor namespace of the variable, shared with other SBAT-aware loaders.
pub const SBAT_VENDOR_GUID: Guid = Guid::from_fields(
    0x605dab50,
    0xe046,
    0x4300,
    0xab,
    0xb6,
    &[0x3d, 0xd8, 0x10, 0xdd, 0x8b, 0x23],
); // {605DAB50-E046-4300-ABB6-3DD810DD8B23}

/// The variable persists across reboots and is sealed once boot services
/// end; without runtime access it cannot be altered from the OS.
pub const SBAT_LEVEL_ATTRIBUTES: u32 = VARIABLE_NON_VOLATILE | VARIABLE_BOOTSERVICE_ACCESS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SbatError {
    /// Not UTF-8, or a record is structurally malformed.
    Malformed,
    /// A generation field is not a decimal number.
    InvalidGeneration,
    /// The first record is not the `sbat` header row.
    MissingHeader,
    /// The revocation data carries no datestamp.
    Undated,
    Var(VarError),
}

impl Display for SbatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed revocation data"),
            Self::InvalidGeneration => write!(f, "invalid generation number"),
            Self::MissingHeader => write!(f, "missing sbat header row"),
            Self::Undated => write!(f, "revocation data has no datestamp"),
            Self::Var(err) => write!(f, "variable access failed: {err:?}"),
        }
    }
}

/// One `(component, generation)` revocation record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
    pub component: String,
    pub generation: u32,
}

/// Outcome of checking an image's SBAT records against the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageValidation<'a> {
    Allowed,
    Revoked(&'a Generation),
}

/// A parsed revocation list. The `sbat` header row is itself an entry and
/// participates in revocation like any other component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevocationList {
    date: Option<u64>,
    entries: Vec<Generation>,
}

impl RevocationList {
    pub fn parse(data: &[u8]) -> Result<Self, SbatError> {
        let text = core::str::from_utf8(data).map_err(|_| SbatError::Malformed)?;

        let mut date = None;
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let component = fields.next().ok_or(SbatError::Malformed)?;
            if component.is_empty() {
                return Err(SbatError::Malformed);
            }
            let generation = fields
                .next()
                .ok_or(SbatError::Malformed)?
                .parse::<u32>()
                .map_err(|_| SbatError::InvalidGeneration)?;

            if entries.is_empty() {
                if component != "sbat" {
                    return Err(SbatError::MissingHeader);
                }
                if let Some(stamp) = fields.next() {
                    date = Some(stamp.parse::<u64>().map_err(|_| SbatError::Malformed)?);
                }
            }

            entries.push(Generation {
                component: component.to_string(),
                generation,
            });
        }

        if entries.is_empty() {
            return Err(SbatError::MissingHeader);
        }
        Ok(RevocationList { date, entries })
    }

    /// The header row's datestamp, when present.
    pub fn date(&self) -> Option<u64> {
        self.date
    }

    pub fn entries(&self) -> &[Generation] {
        &self.entries
    }

    /// Whether `component` at `generation` is revoked by this list.
    /// Components the list does not mention are allowed.
    pub fn is_revoked(&self, component: &str, generation: u32) -> bool {
        self.entries
            .iter()
            .any(|e| e.component == component && generation < e.generation)
    }

    /// Check every SBAT record an image declares.
    pub fn validate_image(&self, image_records: &[(&str, u32)]) -> ImageValidation<'_> {
        for (component, generation) in image_records {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|e| e.component == *component && *generation < e.generation)
            {
                return ImageValidation::Revoked(entry);
            }
        }
        ImageValidation::Allowed
    }

    /// Serialize back to the CSV wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let _ = write!(out, "{},{}", entry.component, entry.generation);
            if index == 0 {
                if let Some(date) = self.date {
                    let _ = write!(out, ",{date}");
                }
            }
            out.push('\n');
        }
        out.into_bytes()
    }
}

fn read_stored<S: VarStore>(store: &S) -> Result<RevocationList, SbatError> {
    let (data, attributes) = store
        .get(SBAT_LEVEL_VARIABLE_NAME, &SBAT_VENDOR_GUID)
        .map_err(SbatError::Var)?;
    if attributes != SBAT_LEVEL_ATTRIBUTES {
        return Err(SbatError::Var(VarError::AccessDenied));
    }
    let stored = RevocationList::parse(&data)?;
    if stored.date().is_none() {
        return Err(SbatError::Undated);
    }
    Ok(stored)
}

fn write_embedded<S: VarStore>(store: &mut S, embedded: &[u8]) {
    if let Err(err) = store.set(
        SBAT_LEVEL_VARIABLE_NAME,
        &SBAT_VENDOR_GUID,
        SBAT_LEVEL_ATTRIBUTES,
        embedded,
    ) {
        info!("failed to write revocation variable: {err:?}");
    }
}

/// Reconcile the persisted revocation list with the embedded one and return
/// the list to enforce this boot.
///
/// The embedded copy must parse and carry a datestamp. A stored list that is
/// valid and at least as new is kept; anything else is replaced by the
/// embedded copy, deleting first when the attributes are wrong.
pub fn sync_level<S: VarStore>(store: &mut S, embedded: &[u8]) -> Result<RevocationList, SbatError> {
    let embedded_list = RevocationList::parse(embedded)?;
    let embedded_date = embedded_list.date().ok_or(SbatError::Undated)?;

    match read_stored(store) {
        Ok(stored) => {
            // Checked in read_stored.
            let stored_date = stored.date().unwrap_or(0);
            if embedded_date > stored_date {
                write_embedded(store, embedded);
                Ok(embedded_list)
            } else {
                Ok(stored)
            }
        }
        Err(SbatError::Var(VarError::AccessDenied)) => {
            info!("revocation variable has wrong attributes; rewriting");
            // Deleting first lets the rewrite change the attributes.
            let _ = store.set(SBAT_LEVEL_VARIABLE_NAME, &SBAT_VENDOR_GUID, SBAT_LEVEL_ATTRIBUTES, &[]);
            write_embedded(store, embedded);
            Ok(embedded_list)
        }
        Err(err) => {
            info!("revocation variable unusable ({err}); rewriting");
            write_embedded(store, embedded);
            Ok(embedded_list)
        }
    }
}

/// Administrative read of the persisted level.
pub fn stored_level<S: VarStore>(store: &S) -> Result<Vec<u8>, SbatError> {
    let (data, _) = store
        .get(SBAT_LEVEL_VARIABLE_NAME, &SBAT_VENDOR_GUID)
        .map_err(SbatError::Var)?;
    Ok(data)
}

/// Administrative replacement of the persisted level. The candidate must be
/// a well-formed, dated revocation list; the backend enforces its own write
/// authentication on top.
pub fn set_stored_level<S: VarStore>(store: &mut S, data: &[u8]) -> Result<(), SbatError> {
    let list = RevocationList::parse(data)?;
    if list.date().is_none() {
        return Err(SbatError::Undated);
    }
    store
        .set(
            SBAT_LEVEL_VARIABLE_NAME,
            &SBAT_VENDOR_GUID,
            SBAT_LEVEL_ATTRIBUTES,
            data,
        )
        .map_err(SbatError::Var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;

    #[derive(Default)]
    struct MemStore {
        vars: BTreeMap<String, (Vec<u8>, u32)>,
    }

    impl VarStore for MemStore {
        fn get(&self, name: &str, _vendor: &Guid) -> Result<(Vec<u8>, u32), VarError> {
            self.vars.get(name).cloned().ok_or(VarError::NotFound)
        }

        fn set(
            &mut self,
            name: &str,
            _vendor: &Guid,
            attributes: u32,
            data: &[u8],
        ) -> Result<(), VarError> {
            if data.is_empty() {
                self.vars.remove(name);
            } else {
                self.vars
                    .insert(name.to_string(), (data.to_vec(), attributes));
            }
            Ok(())
        }
    }

    fn seeded(data: &[u8], attributes: u32) -> MemStore {
        let mut store = MemStore::default();
        store
            .vars
            .insert(SBAT_LEVEL_VARIABLE_NAME.to_string(), (data.to_vec(), attributes));
        store
    }

    #[test]
    fn test_parse() {
        let list = RevocationList::parse(b"sbat,1,2023012900\ngrub,3\nshim,2\n").unwrap();
        assert_eq!(list.date(), Some(2023012900));
        assert_eq!(list.entries().len(), 3);
        assert_eq!(list.entries()[1].component, "grub");
        assert_eq!(list.entries()[1].generation, 3);

        // Dateless header parses; the date is simply absent.
        let list = RevocationList::parse(b"sbat,1").unwrap();
        assert_eq!(list.date(), None);

        assert_eq!(RevocationList::parse(b""), Err(SbatError::MissingHeader));
        assert_eq!(
            RevocationList::parse(b"grub,3\n"),
            Err(SbatError::MissingHeader)
        );
        assert_eq!(
            RevocationList::parse(b"sbat,one\n"),
            Err(SbatError::InvalidGeneration)
        );
        assert_eq!(
            RevocationList::parse(b"sbat\n"),
            Err(SbatError::Malformed)
        );
        assert_eq!(
            RevocationList::parse(&[0xFF, 0xFE]),
            Err(SbatError::Malformed)
        );
    }

    #[test]
    fn test_revocation_semantics() {
        let list = RevocationList::parse(b"sbat,1,2023012900\ngrub,3\n").unwrap();
        assert!(list.is_revoked("grub", 2));
        assert!(!list.is_revoked("grub", 3));
        assert!(!list.is_revoked("grub", 4));
        // Unlisted components are allowed.
        assert!(!list.is_revoked("systemd-boot", 1));

        match list.validate_image(&[("shim", 1), ("grub", 1)]) {
            ImageValidation::Revoked(entry) => assert_eq!(entry.component, "grub"),
            ImageValidation::Allowed => panic!("revoked generation was allowed"),
        }
        assert_eq!(
            list.validate_image(&[("grub", 3)]),
            ImageValidation::Allowed
        );
    }

    #[test]
    fn test_serialize_roundtrip() {
        let data = b"sbat,1,2023012900\ngrub,3\nshim,2\n";
        let list = RevocationList::parse(data).unwrap();
        assert_eq!(list.to_bytes(), data.to_vec());
        assert_eq!(RevocationList::parse(&list.to_bytes()).unwrap(), list);
    }

    #[test]
    fn test_sync_keeps_newer_stored() {
        let mut store = seeded(b"sbat,1,2023", SBAT_LEVEL_ATTRIBUTES);
        let level = sync_level(&mut store, b"sbat,1,2022").unwrap();
        assert_eq!(level.date(), Some(2023));
        // The variable was not touched.
        assert_eq!(stored_level(&store).unwrap(), b"sbat,1,2023".to_vec());
    }

    #[test]
    fn test_sync_replaces_older_stored() {
        let mut store = seeded(b"sbat,1,2021", SBAT_LEVEL_ATTRIBUTES);
        let level = sync_level(&mut store, b"sbat,1,2022").unwrap();
        assert_eq!(level.date(), Some(2022));
        assert_eq!(stored_level(&store).unwrap(), b"sbat,1,2022".to_vec());
    }

    #[test]
    fn test_sync_equal_dates_keep_stored() {
        let mut store = seeded(b"sbat,1,2022", SBAT_LEVEL_ATTRIBUTES);
        let level = sync_level(&mut store, b"sbat,1,2022").unwrap();
        assert_eq!(level.date(), Some(2022));
    }

    #[test]
    fn test_sync_rewrites_bad_attributes() {
        let mut store = seeded(b"sbat,1,2023", VARIABLE_BOOTSERVICE_ACCESS);
        let level = sync_level(&mut store, b"sbat,1,2022").unwrap();
        // Stored data was newer, but its attributes disqualify it.
        assert_eq!(level.date(), Some(2022));
        assert_eq!(
            store.vars[SBAT_LEVEL_VARIABLE_NAME].1,
            SBAT_LEVEL_ATTRIBUTES
        );
    }

    #[test]
    fn test_sync_writes_when_missing_or_garbage() {
        let mut store = MemStore::default();
        let level = sync_level(&mut store, b"sbat,1,2022").unwrap();
        assert_eq!(level.date(), Some(2022));
        assert_eq!(stored_level(&store).unwrap(), b"sbat,1,2022".to_vec());

        let mut store = seeded(b"bad_data", SBAT_LEVEL_ATTRIBUTES);
        sync_level(&mut store, b"sbat,1,2022").unwrap();
        assert_eq!(stored_level(&store).unwrap(), b"sbat,1,2022".to_vec());

        // A dateless stored list cannot be compared, so it is replaced.
        let mut store = seeded(b"sbat,1", SBAT_LEVEL_ATTRIBUTES);
        sync_level(&mut store, b"sbat,1,2022").unwrap();
        assert_eq!(stored_level(&store).unwrap(), b"sbat,1,2022".to_vec());
    }

    #[test]
    fn test_sync_requires_dated_embedded() {
        let mut store = MemStore::default();
        assert_eq!(
            sync_level(&mut store, b"sbat,1"),
            Err(SbatError::Undated)
        );
    }

    #[test]
    fn test_set_stored_level_validates() {
        let mut store = MemStore::default();
        assert_eq!(
            set_stored_level(&mut store, b"nonsense"),
            Err(SbatError::MissingHeader)
        );
        assert_eq!(
            set_stored_level(&mut store, b"sbat,1"),
            Err(SbatError::Undated)
        );
        assert!(set_stored_level(&mut store, b"sbat,2,2024010100\n").is_ok());
        assert_eq!(
            stored_level(&store).unwrap(),
            b"sbat,2,2024010100\n".to_vec()
        );
    }
}
