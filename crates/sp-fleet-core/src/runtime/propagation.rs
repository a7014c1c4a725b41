// crates/sp-fleet-core/src/runtime/propagation.rs
// ============================================================================
// Module: Propagation Waiter
// Description: Polls live resolution until targets resolve to their address.
// Purpose: Confirm DNS changes are visible through the tests' resolver.
// Dependencies: crate::{audit, core, interfaces, runtime::directory}
// ============================================================================

//! ## Overview
//! Authoritative application of a change says nothing about cached answers in
//! recursive resolvers. The waiter polls the resolver the tests will use,
//! comparing each target's first IPv4 answer against the directory address.
//!
//! Each target gets its own budget of `ttl + margin_polls * interval`, where
//! `interval = ttl / poll_divisor`. Resolver failures count as "not yet".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::audit::AuditOutcome;
use crate::audit::FleetAuditEvent;
use crate::audit::SharedAuditSink;
use crate::core::TargetName;
use crate::interfaces::AddressResolver;
use crate::interfaces::Clock;
use crate::runtime::directory::InstanceDirectory;
use crate::runtime::error::FleetError;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Default divisor applied to the TTL to derive the poll interval.
pub const DEFAULT_POLL_DIVISOR: u32 = 10;
/// Default number of extra poll intervals allowed past the TTL.
pub const DEFAULT_MARGIN_POLLS: u32 = 1;

/// Poll interval and budget derived from the zone TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPolicy {
    /// Zone TTL used as the base budget.
    pub ttl: Duration,
    /// Divisor applied to the TTL for the poll interval. Zero is treated as one.
    pub poll_divisor: u32,
    /// Extra intervals allowed past the TTL.
    pub margin_polls: u32,
}

impl PropagationPolicy {
    /// Creates a policy with default divisor and margin.
    #[must_use]
    pub const fn from_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            poll_divisor: DEFAULT_POLL_DIVISOR,
            margin_polls: DEFAULT_MARGIN_POLLS,
        }
    }

    /// Returns the interval between resolution attempts.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.ttl / self.poll_divisor.max(1)
    }

    /// Returns the per-target budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.ttl.saturating_add(self.poll_interval().saturating_mul(self.margin_polls))
    }
}

// ============================================================================
// SECTION: Waiter
// ============================================================================

/// Polls live resolution for each target.
pub struct PropagationWaiter<R, K> {
    /// Resolver under test.
    resolver: R,
    /// Time source.
    clock: K,
    /// Interval and budget.
    policy: PropagationPolicy,
    /// Audit sink.
    audit: SharedAuditSink,
}

impl<R: AddressResolver, K: Clock> PropagationWaiter<R, K> {
    /// Creates a waiter.
    #[must_use]
    pub const fn new(resolver: R, clock: K, policy: PropagationPolicy, audit: SharedAuditSink) -> Self {
        Self {
            resolver,
            clock,
            policy,
            audit,
        }
    }

    /// Blocks until every target resolves to its directory address.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::AddressUnavailable`] for a target with no
    /// address, [`FleetError::UnknownTarget`] for an unconfigured name, and
    /// [`FleetError::PropagationTimeout`] when a budget runs out.
    pub fn await_propagation(
        &self,
        directory: &InstanceDirectory,
        targets: &BTreeSet<TargetName>,
        dry_run: bool,
    ) -> Result<(), FleetError> {
        if dry_run {
            self.audit.record(
                &FleetAuditEvent::new("dns_propagation", targets, true, AuditOutcome::Skipped)
                    .with_detail("dry run"),
            );
            return Ok(());
        }
        for name in targets {
            let target = directory
                .catalog()
                .get(name)
                .ok_or_else(|| FleetError::UnknownTarget(name.clone()))?;
            let expected =
                directory.address_of(name).ok_or_else(|| FleetError::AddressUnavailable(name.clone()))?;
            self.await_target(name, &target.domain(), expected)?;
        }
        Ok(())
    }

    /// Polls one domain until it resolves to `expected` or the budget ends.
    fn await_target(
        &self,
        name: &TargetName,
        domain: &str,
        expected: Ipv4Addr,
    ) -> Result<(), FleetError> {
        let interval = self.policy.poll_interval();
        let budget = self.policy.timeout();
        let started = self.clock.now();
        self.audit.record(
            &FleetAuditEvent::new("dns_propagation", [name], false, AuditOutcome::Requested)
                .with_detail(format!("waiting for {domain} -> {expected}")),
        );
        let mut observed = None;
        loop {
            observed = match self.resolver.resolve_ipv4(domain) {
                Ok(answer) => answer,
                Err(err) => {
                    self.audit.record(
                        &FleetAuditEvent::new(
                            "dns_resolve",
                            [name],
                            false,
                            AuditOutcome::Failed,
                        )
                        .with_detail(err.to_string()),
                    );
                    None
                }
            };
            if observed == Some(expected) {
                self.audit.record(&FleetAuditEvent::new(
                    "dns_propagation",
                    [name],
                    false,
                    AuditOutcome::Completed,
                ));
                return Ok(());
            }
            let elapsed = self.clock.now().saturating_sub(started);
            if elapsed >= budget {
                self.audit.record(
                    &FleetAuditEvent::new("dns_propagation", [name], false, AuditOutcome::Failed)
                        .with_detail(format!("budget of {}s exhausted", budget.as_secs())),
                );
                return Err(FleetError::PropagationTimeout {
                    domain: domain.to_string(),
                    expected,
                    observed,
                    waited: elapsed,
                });
            }
            self.clock.sleep(interval.min(budget - elapsed));
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
