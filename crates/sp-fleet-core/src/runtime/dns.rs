// crates/sp-fleet-core/src/runtime/dns.rs
// ============================================================================
// Module: DNS Reconciler
// Description: Upserts A records so each running target resolves to its IP.
// Purpose: Keep the authoritative zone aligned with the instance directory.
// Dependencies: crate::{audit, core, interfaces, runtime::directory}
// ============================================================================

//! ## Overview
//! The reconciler compares the zone's A records against the directory's
//! current addresses and submits one batched upsert for every target that
//! differs. It only guarantees the authoritative provider has applied the
//! change; public resolution is the propagation waiter's concern.
//!
//! Targets without a current address are never upserted. They are reported
//! as skipped so callers can tell them apart from targets already in sync.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::audit::AuditOutcome;
use crate::audit::FleetAuditEvent;
use crate::audit::SharedAuditSink;
use crate::core::ChangeBatch;
use crate::core::ChangeId;
use crate::core::DnsRecord;
use crate::core::HostedZone;
use crate::core::RecordChange;
use crate::core::ReconcileScope;
use crate::core::Target;
use crate::core::TargetName;
use crate::interfaces::DnsProvider;
use crate::interfaces::WaitError;
use crate::runtime::directory::InstanceDirectory;
use crate::runtime::error::FleetError;

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Returns true when the zone lacks an A record for the target's domain or
/// the record's first value differs from `address`.
///
/// A missing `address` compares unequal to every record value.
#[must_use]
pub fn record_requires_update(
    records: &[DnsRecord],
    target: &Target,
    address: Option<Ipv4Addr>,
) -> bool {
    let domain = target.domain();
    let Some(record) = records.iter().find(|record| record.is_a_record_for(&domain)) else {
        return true;
    };
    let Some(address) = address else {
        return true;
    };
    record.first_value().is_none_or(|value| value != address.to_string())
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of a reconcile call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Targets included in the upsert batch.
    pub updated: BTreeSet<TargetName>,
    /// Selected targets skipped because they have no current address.
    pub skipped: BTreeSet<TargetName>,
    /// Provider change identifier for a submitted batch.
    pub change_id: Option<ChangeId>,
    /// Whether the call was a dry run.
    pub dry_run: bool,
}

// ============================================================================
// SECTION: Reconciler
// ============================================================================

/// Aligns zone records with the instance directory.
pub struct DnsReconciler<D> {
    /// DNS provider handle.
    dns: D,
    /// Zone holding the target records.
    zone: HostedZone,
    /// Audit sink.
    audit: SharedAuditSink,
}

impl<D: DnsProvider> DnsReconciler<D> {
    /// Creates a reconciler for a hosted zone.
    #[must_use]
    pub const fn new(dns: D, zone: HostedZone, audit: SharedAuditSink) -> Self {
        Self {
            dns,
            zone,
            audit,
        }
    }

    /// Lists the zone's current records.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::ProviderQuery`] when the listing fails.
    pub fn list_records(&self) -> Result<Vec<DnsRecord>, FleetError> {
        self.dns.list_records(&self.zone.id).map_err(FleetError::ProviderQuery)
    }

    /// Upserts the records selected by `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the directory is stale, a target is
    /// unknown, the provider rejects the change, or the change waiter fails.
    pub fn reconcile(
        &self,
        directory: &InstanceDirectory,
        scope: ReconcileScope,
        dry_run: bool,
    ) -> Result<ReconcileReport, FleetError> {
        directory.ensure_refreshed()?;
        let selected = match scope {
            ReconcileScope::AllStale => {
                let records = self.list_records()?;
                select_stale(directory, &directory.known_targets(), &records)?
            }
            ReconcileScope::StaleAmong(candidates) => {
                let records = self.list_records()?;
                select_stale(directory, &candidates, &records)?
            }
            ReconcileScope::Only(targets) => {
                ensure_known(directory, &targets)?;
                targets
            }
        };
        let (batch, updated, skipped) = self.plan(directory, selected)?;
        if !skipped.is_empty() {
            self.audit.record(
                &FleetAuditEvent::new("dns_reconcile", &skipped, dry_run, AuditOutcome::Skipped)
                    .with_detail("no public address"),
            );
        }
        let mut report = ReconcileReport {
            updated,
            skipped,
            change_id: None,
            dry_run,
        };
        if batch.is_empty() {
            self.audit.record(
                &FleetAuditEvent::new(
                    "dns_reconcile",
                    Vec::<String>::new(),
                    dry_run,
                    AuditOutcome::Skipped,
                )
                .with_detail("all records up to date"),
            );
            return Ok(report);
        }
        self.audit.record(
            &FleetAuditEvent::new("dns_reconcile", &report.updated, dry_run, AuditOutcome::Requested)
                .with_detail(describe_batch(&batch)),
        );
        if dry_run {
            return Ok(report);
        }
        let change_id = self.dns.submit_changes(&self.zone.id, &batch).map_err(|err| {
            self.audit.record(
                &FleetAuditEvent::new("dns_reconcile", &report.updated, false, AuditOutcome::Failed)
                    .with_detail(err.to_string()),
            );
            FleetError::ProviderOperation {
                operation: "dns upsert",
                source: err,
            }
        })?;
        self.wait_for_change(&change_id)?;
        self.audit.record(
            &FleetAuditEvent::new("dns_reconcile", &report.updated, false, AuditOutcome::Completed)
                .with_detail(format!("change {change_id} applied")),
        );
        report.change_id = Some(change_id);
        Ok(report)
    }

    /// Builds the upsert batch, splitting off targets without an address.
    fn plan(
        &self,
        directory: &InstanceDirectory,
        selected: BTreeSet<TargetName>,
    ) -> Result<(ChangeBatch, BTreeSet<TargetName>, BTreeSet<TargetName>), FleetError> {
        let mut batch = ChangeBatch::default();
        let mut updated = BTreeSet::new();
        let mut skipped = BTreeSet::new();
        for name in selected {
            let target = directory
                .catalog()
                .get(&name)
                .ok_or_else(|| FleetError::UnknownTarget(name.clone()))?;
            match directory.address_of(&name) {
                Some(address) => {
                    batch.changes.push(RecordChange {
                        name: target.domain(),
                        ttl: self.zone.record_ttl,
                        address,
                    });
                    updated.insert(name);
                }
                None => {
                    skipped.insert(name);
                }
            }
        }
        Ok((batch, updated, skipped))
    }

    /// Blocks on the provider change waiter.
    fn wait_for_change(&self, change_id: &ChangeId) -> Result<(), FleetError> {
        match self.dns.wait_for_change(change_id, self.zone.change_timeout) {
            Ok(()) => Ok(()),
            Err(WaitError::TimedOut {
                waited,
            }) => Err(FleetError::DnsChangeTimeout {
                change_id: change_id.clone(),
                waited,
            }),
            Err(WaitError::Provider(err)) => Err(FleetError::ProviderOperation {
                operation: "dns change wait",
                source: err,
            }),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Selects candidates whose records require an update.
fn select_stale(
    directory: &InstanceDirectory,
    candidates: &BTreeSet<TargetName>,
    records: &[DnsRecord],
) -> Result<BTreeSet<TargetName>, FleetError> {
    let mut stale = BTreeSet::new();
    for name in candidates {
        let target =
            directory.catalog().get(name).ok_or_else(|| FleetError::UnknownTarget(name.clone()))?;
        if record_requires_update(records, target, directory.address_of(name)) {
            stale.insert(name.clone());
        }
    }
    Ok(stale)
}

/// Fails on the first name that is not a configured target.
fn ensure_known(
    directory: &InstanceDirectory,
    targets: &BTreeSet<TargetName>,
) -> Result<(), FleetError> {
    match targets.iter().find(|name| !directory.catalog().contains(name)) {
        Some(name) => Err(FleetError::UnknownTarget(name.clone())),
        None => Ok(()),
    }
}

/// Formats `domain -> address` pairs for audit detail.
fn describe_batch(batch: &ChangeBatch) -> String {
    batch
        .changes
        .iter()
        .map(|change| format!("{} -> {}", change.name, change.address))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
