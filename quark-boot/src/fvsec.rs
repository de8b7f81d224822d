// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Firmware-volume security orchestration.
//!
//! Both PEI and DXE run one of these per boot: each discovered volume moves
//! through a small state machine and either validates, is skipped by policy,
//! or is rejected. Rejection is terminal and fatal; the dispatcher must not
//! install a rejected volume, ever. Trust does not implicitly carry across
//! the phase boundary — a later phase starts fresh and learns about earlier
//! coverage only through explicit prior-stage records.
//!
//! Policy skips exist for exactly three cases: the NV variable store (its
//! contents change at runtime and cannot be signed), volumes that lie inside
//! an already-validated parent's signed span (the parent signature already
//! covers them), and volumes covered by a prior boot-stage record.

use log::{error, info};

use crate::anchor::{OwnedPublicKey, TrustAnchor};
use crate::fuse::{KeyBank, SVN_INDEX_COUNT};
use crate::fv;
use crate::image::ImageVerifier;
use crate::keymod;
use crate::rom::{RomOracle, Scratch};
use crate::svn::SvnLedger;
use crate::SecurityError;

/// How many distinct volumes one boot phase will track.
pub const MAX_TRACKED_VOLUMES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FvState {
    Undiscovered,
    PendingValidation,
    Validated,
    Rejected,
    SkippedByPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The designated NV variable store; unsignable by design.
    NvStorage,
    /// Inside the signed span of an already-validated parent volume.
    CoveredByParent,
    /// Covered by a record handed over from an earlier boot stage.
    PriorStageRecord,
}

/// Outcome of a discovery notification that did not reject the volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FvDisposition {
    Validated,
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug)]
struct TrackedVolume {
    base: u32,
    span: u32,
    state: FvState,
    skip: Option<SkipReason>,
}

/// Per-phase orchestrator over the image validator.
pub struct FvSecurity<'a, R: RomOracle> {
    rom: &'a R,
    key_module: &'a [u8],
    bank: KeyBank,
    nv_storage_base: u32,
    // OEM key is validated once per boot cycle and cached per bank.
    oem: Option<OwnedPublicKey>,
    ledger: SvnLedger,
    volumes: [Option<TrackedVolume>; MAX_TRACKED_VOLUMES],
    prior: [Option<(u32, u32)>; MAX_TRACKED_VOLUMES],
}

impl<'a, R: RomOracle> FvSecurity<'a, R> {
    pub fn new(rom: &'a R, key_module: &'a [u8], bank: KeyBank, nv_storage_base: u32) -> Self {
        FvSecurity {
            rom,
            key_module,
            bank,
            nv_storage_base,
            oem: None,
            ledger: SvnLedger::new(),
            volumes: [None; MAX_TRACKED_VOLUMES],
            prior: [None; MAX_TRACKED_VOLUMES],
        }
    }

    /// Seed the rollback ledger, e.g. from the fused floors.
    pub fn seed_svn_floors(&mut self, floors: &[u32; SVN_INDEX_COUNT]) {
        self.ledger = SvnLedger::seeded(floors);
    }

    /// Record a span an earlier boot stage already validated, so this phase
    /// skips re-validating anything inside it.
    pub fn record_prior_coverage(&mut self, base: u32, length: u32) -> Result<(), SecurityError> {
        let slot = self
            .prior
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(SecurityError::OutOfResources)?;
        *slot = Some((base, length));
        Ok(())
    }

    /// Spans validated by this phase, for handoff to the next one.
    pub fn covered_spans(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.volumes.iter().filter_map(|v| match v {
            Some(t) if t.state == FvState::Validated => Some((t.base, t.span)),
            _ => None,
        })
    }

    pub fn state(&self, base: u32) -> FvState {
        self.tracked(base)
            .map(|t| t.state)
            .unwrap_or(FvState::Undiscovered)
    }

    /// Handle a volume-discovery notification.
    ///
    /// Returns the volume's disposition, or an error that the caller must
    /// treat as fatal for the boot. A rejected volume stays rejected; a
    /// repeated notification for it fails again without new work.
    pub fn volume_discovered(
        &mut self,
        base: u32,
        signed_fv: &[u8],
        scratch: &mut Scratch<'_>,
    ) -> Result<FvDisposition, SecurityError> {
        if let Some(tracked) = self.tracked(base) {
            return match tracked.state {
                FvState::Validated => Ok(FvDisposition::Validated),
                FvState::SkippedByPolicy => {
                    // Skip entries always carry their reason.
                    Ok(FvDisposition::Skipped(
                        tracked.skip.unwrap_or(SkipReason::PriorStageRecord),
                    ))
                }
                _ => Err(SecurityError::SecurityViolation),
            };
        }

        if let Some(reason) = self.skip_reason(base) {
            info!("firmware volume {base:#x} skipped by policy: {reason:?}");
            self.track(base, 0, FvState::SkippedByPolicy, Some(reason))?;
            return Ok(FvDisposition::Skipped(reason));
        }

        self.track(base, 0, FvState::PendingValidation, None)?;
        match self.validate_volume(base, signed_fv, scratch) {
            Ok(span) => {
                self.set_state(base, FvState::Validated, span);
                info!("firmware volume {base:#x} validated");
                Ok(FvDisposition::Validated)
            }
            Err(err) => {
                self.set_state(base, FvState::Rejected, 0);
                error!("firmware volume {base:#x} rejected: {err}");
                Err(err)
            }
        }
    }

    fn validate_volume(
        &mut self,
        _base: u32,
        signed_fv: &[u8],
        scratch: &mut Scratch<'_>,
    ) -> Result<u32, SecurityError> {
        if self.oem.is_none() {
            let oem = keymod::validate_key_module(self.rom, self.key_module, self.bank, scratch)?;
            self.oem = Some(oem.to_owned());
        }
        // Unwrap is fine: just populated above.
        let oem = self.oem.as_ref().unwrap().clone();

        let verifier = ImageVerifier::new(signed_fv)?;

        // The body must actually be a firmware volume before the dispatcher
        // may ever walk it.
        let body = ImageVerifier::image_body(signed_fv)?;
        if fv::read_fv_header(body).is_none() {
            return Err(SecurityError::SecurityViolation);
        }

        let (svn_index, svn) = verifier.svn();
        if !self.ledger.check(svn_index, svn) {
            return Err(SecurityError::Revoked);
        }

        verifier.verify(
            self.rom,
            &TrustAnchor::Oem(oem.as_public_key()),
            scratch,
        )?;

        self.ledger.record(svn_index, svn)?;
        Ok(verifier.header().module_size)
    }

    fn skip_reason(&self, base: u32) -> Option<SkipReason> {
        if base == self.nv_storage_base {
            return Some(SkipReason::NvStorage);
        }
        for span in self.prior.iter().flatten() {
            if contains(*span, base) {
                return Some(SkipReason::PriorStageRecord);
            }
        }
        for tracked in self.volumes.iter().flatten() {
            if tracked.state == FvState::Validated && contains((tracked.base, tracked.span), base) {
                return Some(SkipReason::CoveredByParent);
            }
        }
        None
    }

    fn tracked(&self, base: u32) -> Option<&TrackedVolume> {
        self.volumes
            .iter()
            .flatten()
            .find(|t| t.base == base)
    }

    fn track(
        &mut self,
        base: u32,
        span: u32,
        state: FvState,
        skip: Option<SkipReason>,
    ) -> Result<(), SecurityError> {
        let slot = self
            .volumes
            .iter_mut()
            .find(|s| s.is_none())
            .ok_or(SecurityError::OutOfResources)?;
        *slot = Some(TrackedVolume {
            base,
            span,
            state,
            skip,
        });
        Ok(())
    }

    fn set_state(&mut self, base: u32, state: FvState, span: u32) {
        if let Some(tracked) = self
            .volumes
            .iter_mut()
            .flatten()
            .find(|t| t.base == base)
        {
            tracked.state = state;
            tracked.span = span;
        }
    }
}

// Strictly-inside check: a base equal to the span start is the parent
// itself, not a child.
fn contains(span: (u32, u32), base: u32) -> bool {
    let (start, length) = span;
    base > start && (base - start) < length
}
