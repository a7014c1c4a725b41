// crates/sp-fleet-core/src/runtime/readiness.rs
// ============================================================================
// Module: Readiness Facade
// Description: Composes directory, lifecycle, DNS, and propagation steps.
// Purpose: Bring a set of targets to "running and resolvable" in one call.
// Dependencies: crate::{audit, core, interfaces, runtime::*}
// ============================================================================

//! ## Overview
//! [`Fleet`] owns the instance directory and one of each runtime component.
//! Every operation refreshes the directory explicitly before acting, and a
//! target that is already running is never assumed to have a correct record.
//!
//! Session helpers wrap the facade for suite-level setup and teardown: start
//! everything up front and stop everything at the end, each behind a flag.
//!
//! ## Invariants
//! - `ensure_ready` starts only the not-running subset of its targets.
//! - Records are reconciled and verified for the full requested set.
//! - The facade's dry-run option applies to every step it runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::audit::AuditOutcome;
use crate::audit::FleetAuditEvent;
use crate::audit::SharedAuditSink;
use crate::core::HostedZone;
use crate::core::InstanceId;
use crate::core::InstanceRecord;
use crate::core::InstanceState;
use crate::core::ReconcileScope;
use crate::core::StartScope;
use crate::core::StopScope;
use crate::core::TargetCatalog;
use crate::core::TargetName;
use crate::interfaces::AddressResolver;
use crate::interfaces::Clock;
use crate::interfaces::ComputeProvider;
use crate::interfaces::DnsProvider;
use crate::runtime::directory::InstanceDirectory;
use crate::runtime::dns::DnsReconciler;
use crate::runtime::dns::ReconcileReport;
use crate::runtime::dns::record_requires_update;
use crate::runtime::error::FleetError;
use crate::runtime::lifecycle::LifecycleController;
use crate::runtime::lifecycle::LifecycleReport;
use crate::runtime::lifecycle::LifecycleTimeouts;
use crate::runtime::propagation::PropagationPolicy;
use crate::runtime::propagation::PropagationWaiter;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Settings shared by every facade operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetOptions {
    /// Zone holding the target records.
    pub zone: HostedZone,
    /// Lifecycle waiter bounds.
    pub lifecycle: LifecycleTimeouts,
    /// Propagation interval and budget.
    pub propagation: PropagationPolicy,
    /// Run every step in dry-run mode.
    pub dry_run: bool,
}

/// Suite-level setup and teardown flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Start and verify every target when the session begins.
    pub start_all_upfront: bool,
    /// Stop every known target when the session ends.
    pub stop_on_finish: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            start_all_upfront: true,
            stop_on_finish: true,
        }
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Outcome of [`Fleet::ensure_ready`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    /// Targets that were started, or on a dry run would have been.
    pub started: BTreeSet<TargetName>,
    /// Targets whose records were upserted, or on a dry run would have been.
    pub dns_updated: BTreeSet<TargetName>,
    /// Targets confirmed through live resolution. Always empty on a dry run.
    pub verified: BTreeSet<TargetName>,
    /// Whether every step ran in dry-run mode.
    pub dry_run: bool,
}

/// Point-in-time view of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    /// Target name.
    pub name: TargetName,
    /// Fully qualified domain.
    pub domain: String,
    /// HTTPS URL the tests will drive.
    pub url: String,
    /// Provider instance id.
    pub instance_id: InstanceId,
    /// Power state at refresh time.
    pub state: InstanceState,
    /// Public address while running.
    pub public_ip: Option<Ipv4Addr>,
    /// Whether the zone record differs from the address.
    pub dns_stale: bool,
}

// ============================================================================
// SECTION: Facade
// ============================================================================

/// Readiness facade over the fleet runtime.
pub struct Fleet<C, D, R, K> {
    /// Instance snapshot.
    directory: InstanceDirectory,
    /// Start/stop controller.
    lifecycle: LifecycleController<C>,
    /// Record reconciler.
    reconciler: DnsReconciler<D>,
    /// Resolution waiter.
    waiter: PropagationWaiter<R, K>,
    /// Dry-run flag for every step.
    dry_run: bool,
    /// Audit sink.
    audit: SharedAuditSink,
}

impl<C, D, R, K> Fleet<C, D, R, K>
where
    C: ComputeProvider,
    D: DnsProvider,
    R: AddressResolver,
    K: Clock,
{
    /// Wires the runtime components around a target catalog.
    #[must_use]
    pub fn new(
        catalog: TargetCatalog,
        compute: C,
        dns: D,
        resolver: R,
        clock: K,
        options: FleetOptions,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            directory: InstanceDirectory::new(catalog, audit.clone()),
            lifecycle: LifecycleController::new(compute, options.lifecycle, audit.clone()),
            reconciler: DnsReconciler::new(dns, options.zone, audit.clone()),
            waiter: PropagationWaiter::new(resolver, clock, options.propagation, audit.clone()),
            dry_run: options.dry_run,
            audit,
        }
    }

    /// Returns the instance directory.
    #[must_use]
    pub const fn directory(&self) -> &InstanceDirectory {
        &self.directory
    }

    /// Returns true when every step runs in dry-run mode.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Rebuilds the instance directory.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::ProviderQuery`] when the refresh fails.
    pub fn refresh(&mut self) -> Result<&BTreeMap<TargetName, InstanceRecord>, FleetError> {
        self.lifecycle.refresh(&mut self.directory)?;
        Ok(self.directory.records())
    }

    /// Brings the targets to running and resolvable.
    ///
    /// An empty set means every configured target.
    ///
    /// # Errors
    ///
    /// Returns the first [`FleetError`] raised by any step.
    pub fn ensure_ready(
        &mut self,
        targets: &BTreeSet<TargetName>,
    ) -> Result<ReadinessReport, FleetError> {
        let targets = self.resolve_targets(targets)?;
        let dry_run = self.dry_run;
        self.audit.record(&FleetAuditEvent::new(
            "ensure_ready",
            &targets,
            dry_run,
            AuditOutcome::Requested,
        ));
        self.refresh()?;
        let not_running: BTreeSet<TargetName> =
            targets.iter().filter(|name| !self.directory.is_running(name)).cloned().collect();
        let started = self.lifecycle.start(
            &mut self.directory,
            StartScope::Only(not_running),
            dry_run,
        )?;
        let reconciled = self.reconciler.reconcile(
            &self.directory,
            ReconcileScope::StaleAmong(targets.clone()),
            dry_run,
        )?;
        self.waiter.await_propagation(&self.directory, &targets, dry_run)?;
        self.audit.record(&FleetAuditEvent::new(
            "ensure_ready",
            &targets,
            dry_run,
            AuditOutcome::Completed,
        ));
        Ok(ReadinessReport {
            started: started.requested,
            dns_updated: reconciled.updated,
            verified: if dry_run { BTreeSet::new() } else { targets },
            dry_run,
        })
    }

    /// Stops the targets, or every known target when the set is empty.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the refresh or stop fails.
    pub fn release(
        &mut self,
        targets: &BTreeSet<TargetName>,
    ) -> Result<LifecycleReport, FleetError> {
        self.ensure_configured(targets)?;
        self.refresh()?;
        self.lifecycle.stop(
            &mut self.directory,
            StopScope::from_requested(targets.clone()),
            self.dry_run,
        )
    }

    /// Reconciles stale records and waits for the upserted ones to resolve.
    ///
    /// An empty set considers every known target.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when any step fails.
    pub fn reconcile_records(
        &mut self,
        targets: &BTreeSet<TargetName>,
    ) -> Result<ReconcileReport, FleetError> {
        self.ensure_configured(targets)?;
        self.refresh()?;
        let report = self.reconciler.reconcile(
            &self.directory,
            ReconcileScope::from_requested(targets.clone()),
            self.dry_run,
        )?;
        self.waiter.await_propagation(&self.directory, &report.updated, self.dry_run)?;
        Ok(report)
    }

    /// Refreshes and describes every configured target.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the refresh or record listing fails.
    pub fn status(&mut self) -> Result<Vec<TargetStatus>, FleetError> {
        self.refresh()?;
        let records = self.reconciler.list_records()?;
        let mut statuses = Vec::with_capacity(self.directory.catalog().len());
        for target in self.directory.catalog().iter() {
            let record = self
                .directory
                .record(&target.name)
                .ok_or_else(|| FleetError::UnknownTarget(target.name.clone()))?;
            let address = self.directory.address_of(&target.name);
            statuses.push(TargetStatus {
                name: target.name.clone(),
                domain: target.domain(),
                url: target.url(),
                instance_id: record.instance_id.clone(),
                state: record.state,
                public_ip: address,
                dns_stale: address.is_some() && record_requires_update(&records, target, address),
            });
        }
        Ok(statuses)
    }

    /// Runs suite setup.
    ///
    /// Returns `None` when the policy defers starts to `ensure_ready`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when readiness fails.
    pub fn begin_session(
        &mut self,
        policy: SessionPolicy,
    ) -> Result<Option<ReadinessReport>, FleetError> {
        if !policy.start_all_upfront {
            self.audit.record(
                &FleetAuditEvent::new(
                    "session_begin",
                    Vec::<String>::new(),
                    self.dry_run,
                    AuditOutcome::Skipped,
                )
                .with_detail("targets start on demand"),
            );
            return Ok(None);
        }
        self.ensure_ready(&BTreeSet::new()).map(Some)
    }

    /// Runs suite teardown.
    ///
    /// Returns `None` when the policy leaves targets running.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the stop fails.
    pub fn finish_session(
        &mut self,
        policy: SessionPolicy,
    ) -> Result<Option<LifecycleReport>, FleetError> {
        if !policy.stop_on_finish {
            self.audit.record(
                &FleetAuditEvent::new(
                    "session_finish",
                    Vec::<String>::new(),
                    self.dry_run,
                    AuditOutcome::Skipped,
                )
                .with_detail("targets left running"),
            );
            return Ok(None);
        }
        self.release(&BTreeSet::new()).map(Some)
    }

    /// Validates names and expands an empty set to the full catalog.
    fn resolve_targets(
        &self,
        targets: &BTreeSet<TargetName>,
    ) -> Result<BTreeSet<TargetName>, FleetError> {
        if targets.is_empty() {
            return Ok(self.directory.catalog().names());
        }
        self.ensure_configured(targets)?;
        Ok(targets.clone())
    }

    /// Fails on the first name that is not configured.
    fn ensure_configured(&self, targets: &BTreeSet<TargetName>) -> Result<(), FleetError> {
        match targets.iter().find(|name| !self.directory.catalog().contains(name)) {
            Some(name) => Err(FleetError::UnknownTarget(name.clone())),
            None => Ok(()),
        }
    }
}
