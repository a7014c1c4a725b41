// crates/sp-fleet-core/src/interfaces/mod.rs
// ============================================================================
// Module: SP Fleet Interfaces
// Description: Backend-agnostic interfaces for compute, DNS, resolution, time.
// Purpose: Define the contract surfaces the fleet runtime depends on.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the fleet integrates with external providers without
//! embedding provider-specific details. All calls are blocking. Providers
//! report failures as [`ProviderError`] carrying the provider's own error code
//! so that callers can classify specific signals (such as a successful dry
//! run) without swallowing genuine failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::core::ChangeBatch;
use crate::core::ChangeId;
use crate::core::DnsRecord;
use crate::core::InstanceFilter;
use crate::core::InstanceId;
use crate::core::InstanceState;
use crate::core::ProviderInstance;

// ============================================================================
// SECTION: Provider Errors
// ============================================================================

/// Error reported by a compute or DNS provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Provider error code, when the provider supplied one.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl ProviderError {
    /// Creates an error without a provider code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Creates an error carrying a provider code.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Failure of a provider-side waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The waiter exhausted its time bound.
    #[error("waiter timed out after {}s", waited.as_secs())]
    TimedOut {
        /// Time spent waiting.
        waited: Duration,
    },
    /// The provider failed while waiting.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

// ============================================================================
// SECTION: Compute Provider
// ============================================================================

/// Compute provider hosting the target instances.
pub trait ComputeProvider {
    /// Lists every instance matching the discovery filters.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the query fails.
    fn describe_instances(
        &self,
        filters: &[InstanceFilter],
    ) -> Result<Vec<ProviderInstance>, ProviderError>;

    /// Requests a batched start of the given instances.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the request is rejected, including the
    /// provider's dry-run acknowledgement when `dry_run` is set.
    fn start_instances(&self, ids: &[InstanceId], dry_run: bool) -> Result<(), ProviderError>;

    /// Requests a batched stop of the given instances.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the request is rejected, including the
    /// provider's dry-run acknowledgement when `dry_run` is set.
    fn stop_instances(&self, ids: &[InstanceId], dry_run: bool) -> Result<(), ProviderError>;

    /// Blocks until every instance reports `state` or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::TimedOut`] when the bound is exceeded and
    /// [`WaitError::Provider`] when the provider fails.
    fn wait_for_state(
        &self,
        ids: &[InstanceId],
        state: InstanceState,
        timeout: Duration,
    ) -> Result<(), WaitError>;
}

// ============================================================================
// SECTION: DNS Provider
// ============================================================================

/// Authoritative DNS provider hosting the targets' zone.
pub trait DnsProvider {
    /// Lists every record in the zone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the listing fails.
    fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, ProviderError>;

    /// Submits a batch of upserts as one change.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the change is rejected.
    fn submit_changes(&self, zone_id: &str, batch: &ChangeBatch)
    -> Result<ChangeId, ProviderError>;

    /// Blocks until the change is applied on every authoritative server.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError`] when the change is not applied in time or the
    /// provider fails.
    fn wait_for_change(&self, change_id: &ChangeId, timeout: Duration) -> Result<(), WaitError>;
}

// ============================================================================
// SECTION: Address Resolution
// ============================================================================

/// Resolution failure (treated as "not yet matching" by the waiter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resolution of {domain} failed: {message}")]
pub struct ResolveError {
    /// Domain being resolved.
    pub domain: String,
    /// Resolver message.
    pub message: String,
}

/// Live DNS resolution through the resolver the tests will use.
pub trait AddressResolver {
    /// Resolves the domain to its first IPv4 address, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the lookup itself fails.
    fn resolve_ipv4(&self, domain: &str) -> Result<Option<Ipv4Addr>, ResolveError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic time source used for polling budgets.
pub trait Clock {
    /// Returns elapsed time since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Blocks the caller for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by [`Instant`] and thread sleep.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Origin instant for [`Clock::now`].
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
