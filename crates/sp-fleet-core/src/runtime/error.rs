// crates/sp-fleet-core/src/runtime/error.rs
// ============================================================================
// Module: SP Fleet Errors
// Description: Error taxonomy shared by every fleet runtime component.
// Purpose: Surface provider failures and timeouts without retries or masking.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! Every variant is fatal to the operation that raised it. Nothing here is
//! retried internally; retries belong to the calling layer. Timeouts leave the
//! instance directory at its last refresh, so callers must refresh before
//! trusting it again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::Ipv4Addr;
use std::time::Duration;

use thiserror::Error;

use crate::core::ChangeId;
use crate::core::InstanceId;
use crate::core::InstanceState;
use crate::core::TargetName;
use crate::interfaces::ProviderError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fleet runtime errors.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Directory refresh failed or returned unusable data.
    #[error("provider query failed: {0}")]
    ProviderQuery(ProviderError),
    /// A mutating provider request was rejected.
    #[error("{operation} request failed: {source}")]
    ProviderOperation {
        /// Operation label.
        operation: &'static str,
        /// Provider error, unmodified.
        source: ProviderError,
    },
    /// The provider accepted a lifecycle request but never reached the state.
    #[error(
        "{operation} did not reach {target_state} within {}s for {}",
        waited.as_secs(),
        join_ids(instance_ids)
    )]
    LifecycleTimeout {
        /// Operation label.
        operation: &'static str,
        /// Requested power state.
        target_state: InstanceState,
        /// Instances in the batch.
        instance_ids: Vec<InstanceId>,
        /// Waiter bound.
        waited: Duration,
    },
    /// The DNS provider accepted a change but never reported it applied.
    #[error("dns change {change_id} not applied within {}s", waited.as_secs())]
    DnsChangeTimeout {
        /// Provider change identifier.
        change_id: ChangeId,
        /// Waiter bound.
        waited: Duration,
    },
    /// Public resolution never returned the expected address.
    #[error(
        "address for {domain} never updated to {expected} (last observed: {}) after {}s",
        observed.map_or_else(|| "none".to_string(), |ip| ip.to_string()),
        waited.as_secs()
    )]
    PropagationTimeout {
        /// Domain being resolved.
        domain: String,
        /// Address the directory expects.
        expected: Ipv4Addr,
        /// Last address observed, if any.
        observed: Option<Ipv4Addr>,
        /// Poll budget consumed.
        waited: Duration,
    },
    /// The target is not configured or has no instance.
    #[error("unknown target: {0}")]
    UnknownTarget(TargetName),
    /// The target has no public address in the last snapshot.
    #[error("target {0} has no public address; is it running?")]
    AddressUnavailable(TargetName),
    /// The directory has never been refreshed.
    #[error("instance directory has not been refreshed")]
    DirectoryNotRefreshed,
}

/// Joins instance identifiers for display.
fn join_ids(ids: &[InstanceId]) -> String {
    ids.iter().map(InstanceId::as_str).collect::<Vec<_>>().join(", ")
}
