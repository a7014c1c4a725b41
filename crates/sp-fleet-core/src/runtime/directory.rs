// crates/sp-fleet-core/src/runtime/directory.rs
// ============================================================================
// Module: Instance Directory
// Description: Point-in-time snapshot of each target's instance record.
// Purpose: Map provider instances back to targets via their business tag.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! The directory is a read-through cache of the compute provider. Each
//! [`InstanceDirectory::refresh`] rebuilds the map wholesale; nothing is ever
//! patched in place. Read helpers never refresh implicitly, so staleness is
//! managed explicitly by the caller.
//!
//! ## Invariants
//! - After a successful refresh every configured target has exactly one record.
//! - A failed refresh leaves the previous snapshot untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::audit::AuditOutcome;
use crate::audit::FleetAuditEvent;
use crate::audit::SharedAuditSink;
use crate::core::InstanceId;
use crate::core::InstanceRecord;
use crate::core::InstanceState;
use crate::core::ProviderInstance;
use crate::core::TargetCatalog;
use crate::core::TargetName;
use crate::interfaces::ComputeProvider;
use crate::interfaces::ProviderError;
use crate::runtime::error::FleetError;

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Snapshot of instance records keyed by target.
pub struct InstanceDirectory {
    /// Configured targets and discovery rules.
    catalog: TargetCatalog,
    /// Records from the last successful refresh.
    records: BTreeMap<TargetName, InstanceRecord>,
    /// Whether a refresh has ever succeeded.
    refreshed: bool,
    /// Audit sink for refresh events.
    audit: SharedAuditSink,
}

impl InstanceDirectory {
    /// Creates an empty directory for the catalog.
    #[must_use]
    pub fn new(catalog: TargetCatalog, audit: SharedAuditSink) -> Self {
        Self {
            catalog,
            records: BTreeMap::new(),
            refreshed: false,
            audit,
        }
    }

    /// Returns the target catalog.
    #[must_use]
    pub const fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    /// Rebuilds the snapshot from the compute provider.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::ProviderQuery`] when the provider call fails or
    /// its data cannot be mapped onto the configured targets.
    pub fn refresh<C: ComputeProvider>(
        &mut self,
        compute: &C,
    ) -> Result<&BTreeMap<TargetName, InstanceRecord>, FleetError> {
        let instances = compute.describe_instances(self.catalog.filters()).map_err(|err| {
            self.audit.record(
                &FleetAuditEvent::new(
                    "directory_refresh",
                    Vec::<String>::new(),
                    false,
                    AuditOutcome::Failed,
                )
                .with_detail(err.to_string()),
            );
            FleetError::ProviderQuery(err)
        })?;
        let records = self.build_records(instances)?;
        self.records = records;
        self.refreshed = true;
        self.audit.record(&FleetAuditEvent::new(
            "directory_refresh",
            self.records.keys(),
            false,
            AuditOutcome::Completed,
        ));
        Ok(&self.records)
    }

    /// Maps provider instances onto configured targets.
    fn build_records(
        &self,
        instances: Vec<ProviderInstance>,
    ) -> Result<BTreeMap<TargetName, InstanceRecord>, FleetError> {
        let mut records = BTreeMap::new();
        for instance in instances {
            let Some(tag) = instance.tag(self.catalog.tag_key()) else {
                self.audit.record(
                    &FleetAuditEvent::new(
                        "directory_ignore_instance",
                        Vec::<String>::new(),
                        false,
                        AuditOutcome::Skipped,
                    )
                    .with_detail(format!(
                        "{} has no {} tag",
                        instance.instance_id,
                        self.catalog.tag_key()
                    )),
                );
                continue;
            };
            let name = TargetName::new(tag);
            if !self.catalog.contains(&name) {
                self.audit.record(
                    &FleetAuditEvent::new(
                        "directory_ignore_instance",
                        [&name],
                        false,
                        AuditOutcome::Skipped,
                    )
                    .with_detail(format!("{} is not a configured target", instance.instance_id)),
                );
                continue;
            }
            let record = instance_record(&name, &instance)?;
            if matches!(record.state, InstanceState::Terminated | InstanceState::ShuttingDown) {
                self.audit.record(
                    &FleetAuditEvent::new(
                        "directory_ignore_instance",
                        [&name],
                        false,
                        AuditOutcome::Skipped,
                    )
                    .with_detail(format!("{} is {}", instance.instance_id, record.state)),
                );
                continue;
            }
            if records.insert(name.clone(), record).is_some() {
                return Err(query_error(format!("more than one instance tagged as {name}")));
            }
        }
        if let Some(missing) = self.catalog.iter().find(|target| !records.contains_key(&target.name))
        {
            return Err(query_error(format!("no instance found for target {}", missing.name)));
        }
        Ok(records)
    }

    /// Returns true once a refresh has succeeded.
    #[must_use]
    pub const fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    /// Returns the records from the last refresh.
    #[must_use]
    pub const fn records(&self) -> &BTreeMap<TargetName, InstanceRecord> {
        &self.records
    }

    /// Returns the record for a target.
    #[must_use]
    pub fn record(&self, target: &TargetName) -> Option<&InstanceRecord> {
        self.records.get(target)
    }

    /// Returns true when the target was running at the last refresh.
    #[must_use]
    pub fn is_running(&self, target: &TargetName) -> bool {
        self.record(target).is_some_and(InstanceRecord::is_running)
    }

    /// Returns true when the target was stopped at the last refresh.
    #[must_use]
    pub fn is_stopped(&self, target: &TargetName) -> bool {
        self.record(target).is_some_and(InstanceRecord::is_stopped)
    }

    /// Returns the target's address when it was running at the last refresh.
    #[must_use]
    pub fn address_of(&self, target: &TargetName) -> Option<Ipv4Addr> {
        self.record(target).filter(|record| record.is_running()).and_then(|record| record.public_ip)
    }

    /// Returns the known targets matching a predicate.
    pub fn targets_where<F>(&self, mut predicate: F) -> BTreeSet<TargetName>
    where
        F: FnMut(&InstanceRecord) -> bool,
    {
        self.records
            .iter()
            .filter(|(_, record)| predicate(record))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns every known target.
    #[must_use]
    pub fn known_targets(&self) -> BTreeSet<TargetName> {
        self.records.keys().cloned().collect()
    }

    /// Fails unless the directory has been refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DirectoryNotRefreshed`] before the first refresh.
    pub fn ensure_refreshed(&self) -> Result<(), FleetError> {
        if self.refreshed { Ok(()) } else { Err(FleetError::DirectoryNotRefreshed) }
    }

    /// Resolves target names to instance identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::UnknownTarget`] for names without a record.
    pub fn instance_ids(&self, targets: &BTreeSet<TargetName>) -> Result<Vec<InstanceId>, FleetError> {
        targets
            .iter()
            .map(|name| {
                self.record(name)
                    .map(|record| record.instance_id.clone())
                    .ok_or_else(|| FleetError::UnknownTarget(name.clone()))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a record from a provider instance.
fn instance_record(
    name: &TargetName,
    instance: &ProviderInstance,
) -> Result<InstanceRecord, FleetError> {
    let state = InstanceState::parse(&instance.state).ok_or_else(|| {
        query_error(format!("unknown state {} for target {name}", instance.state))
    })?;
    let public_ip = instance
        .public_ip
        .as_deref()
        .map(|raw| {
            raw.parse::<Ipv4Addr>()
                .map_err(|_| query_error(format!("invalid public address {raw} for target {name}")))
        })
        .transpose()?;
    Ok(InstanceRecord {
        instance_id: instance.instance_id.clone(),
        state,
        public_ip,
    })
}

/// Builds a query error for malformed provider data.
fn query_error(message: String) -> FleetError {
    FleetError::ProviderQuery(ProviderError::new(message))
}
