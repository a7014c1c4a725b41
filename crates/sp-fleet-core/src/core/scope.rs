// crates/sp-fleet-core/src/core/scope.rs
// ============================================================================
// Module: SP Fleet Operation Scopes
// Description: Named target selections for start, stop, and reconcile.
// Purpose: Replace empty-set sentinels with explicit default variants.
// Dependencies: crate::core::target
// ============================================================================

//! ## Overview
//! Start, stop and reconcile each have a different default selection. Each
//! default is a named variant so a caller never gets "all targets" by
//! accidentally passing an empty set.
//!
//! ## Invariants
//! - [`StartScope`] defaults to targets that are not running.
//! - [`StopScope`] defaults to every known target, including stopped ones.
//! - [`ReconcileScope`] defaults to targets whose record is stale.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::target::TargetName;

// ============================================================================
// SECTION: Scopes
// ============================================================================

/// Selection of targets to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartScope {
    /// Every target that is not running in the last snapshot.
    AllNotRunning,
    /// Exactly these targets.
    Only(BTreeSet<TargetName>),
}

impl StartScope {
    /// Maps a caller-supplied set, treating an empty set as
    /// [`StartScope::AllNotRunning`].
    #[must_use]
    pub fn from_requested(targets: BTreeSet<TargetName>) -> Self {
        if targets.is_empty() { Self::AllNotRunning } else { Self::Only(targets) }
    }
}

/// Selection of targets to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopScope {
    /// Every known target, whether or not it is already stopped.
    AllKnown,
    /// Exactly these targets.
    Only(BTreeSet<TargetName>),
}

impl StopScope {
    /// Maps a caller-supplied set, treating an empty set as
    /// [`StopScope::AllKnown`].
    #[must_use]
    pub fn from_requested(targets: BTreeSet<TargetName>) -> Self {
        if targets.is_empty() { Self::AllKnown } else { Self::Only(targets) }
    }
}

/// Selection of targets whose records should be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileScope {
    /// Every target whose record requires an update.
    AllStale,
    /// Targets within the set whose record requires an update.
    StaleAmong(BTreeSet<TargetName>),
    /// Exactly these targets, upserted unconditionally.
    Only(BTreeSet<TargetName>),
}

impl ReconcileScope {
    /// Maps a caller-supplied set, treating an empty set as
    /// [`ReconcileScope::AllStale`].
    #[must_use]
    pub fn from_requested(targets: BTreeSet<TargetName>) -> Self {
        if targets.is_empty() { Self::AllStale } else { Self::StaleAmong(targets) }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
