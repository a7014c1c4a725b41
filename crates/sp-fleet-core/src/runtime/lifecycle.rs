// crates/sp-fleet-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Compute Lifecycle Controller
// Description: Batched start/stop of target instances with provider waiters.
// Purpose: Drive instances to a power state and refresh the directory after.
// Dependencies: crate::{audit, core, interfaces, runtime::directory}
// ============================================================================

//! ## Overview
//! [`LifecycleController`] issues one batched provider request per call,
//! blocks on the provider's waiter for real runs, and always refreshes the
//! [`InstanceDirectory`] afterwards so address data is current.
//!
//! Dry runs still reach the provider with its dry-run flag set. The provider
//! acknowledges a well-formed dry run with a specific error code, which
//! [`is_benign_dry_run_signal`] recognizes; every other error propagates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use crate::audit::AuditOutcome;
use crate::audit::FleetAuditEvent;
use crate::audit::SharedAuditSink;
use crate::core::InstanceId;
use crate::core::InstanceState;
use crate::core::StartScope;
use crate::core::StopScope;
use crate::core::TargetName;
use crate::interfaces::ComputeProvider;
use crate::interfaces::ProviderError;
use crate::interfaces::WaitError;
use crate::runtime::directory::InstanceDirectory;
use crate::runtime::error::FleetError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Provider error code acknowledging a well-formed dry-run request.
pub const DRY_RUN_OPERATION_CODE: &str = "DryRunOperation";
/// Default bound for the instance-running waiter.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(600);
/// Default bound for the instance-stopped waiter.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(600);

// ============================================================================
// SECTION: Dry Run Classification
// ============================================================================

/// Returns true when the error is the provider's dry-run acknowledgement.
#[must_use]
pub fn is_benign_dry_run_signal(error: &ProviderError) -> bool {
    error.code.as_deref() == Some(DRY_RUN_OPERATION_CODE)
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Waiter bounds for lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTimeouts {
    /// Bound for the instance-running waiter.
    pub start: Duration,
    /// Bound for the instance-stopped waiter.
    pub stop: Duration,
}

impl Default for LifecycleTimeouts {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_TIMEOUT,
            stop: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// Lifecycle operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOperation {
    /// Start instances.
    Start,
    /// Stop instances.
    Stop,
}

impl LifecycleOperation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// Returns the power state the operation drives toward.
    #[must_use]
    pub const fn target_state(self) -> InstanceState {
        match self {
            Self::Start => InstanceState::Running,
            Self::Stop => InstanceState::Stopped,
        }
    }

    /// Returns the audit event identifier for the operation.
    const fn event(self) -> &'static str {
        match self {
            Self::Start => "instances_start",
            Self::Stop => "instances_stop",
        }
    }
}

/// Outcome of a lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleReport {
    /// Operation performed.
    pub operation: LifecycleOperation,
    /// Targets included in the provider request (empty for a no-op).
    pub requested: BTreeSet<TargetName>,
    /// Whether the request was a dry run.
    pub dry_run: bool,
}

impl LifecycleReport {
    /// Returns true when no provider request was issued.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.requested.is_empty()
    }
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Starts and stops target instances.
pub struct LifecycleController<C> {
    /// Compute provider handle.
    compute: C,
    /// Waiter bounds.
    timeouts: LifecycleTimeouts,
    /// Audit sink.
    audit: SharedAuditSink,
}

impl<C: ComputeProvider> LifecycleController<C> {
    /// Creates a controller.
    #[must_use]
    pub const fn new(compute: C, timeouts: LifecycleTimeouts, audit: SharedAuditSink) -> Self {
        Self {
            compute,
            timeouts,
            audit,
        }
    }

    /// Rebuilds the directory from this controller's provider.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::ProviderQuery`] when the refresh fails.
    pub fn refresh(&self, directory: &mut InstanceDirectory) -> Result<(), FleetError> {
        directory.refresh(&self.compute).map(|_| ())
    }

    /// Starts the targets selected by `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the directory is stale, a target is unknown,
    /// the provider rejects the request, or the waiter times out.
    pub fn start(
        &self,
        directory: &mut InstanceDirectory,
        scope: StartScope,
        dry_run: bool,
    ) -> Result<LifecycleReport, FleetError> {
        directory.ensure_refreshed()?;
        let targets = match scope {
            StartScope::AllNotRunning => directory.targets_where(|record| !record.is_running()),
            StartScope::Only(targets) => targets,
        };
        self.transition(directory, LifecycleOperation::Start, targets, dry_run)
    }

    /// Stops the targets selected by `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] when the directory is stale, a target is unknown,
    /// the provider rejects the request, or the waiter times out.
    pub fn stop(
        &self,
        directory: &mut InstanceDirectory,
        scope: StopScope,
        dry_run: bool,
    ) -> Result<LifecycleReport, FleetError> {
        directory.ensure_refreshed()?;
        let targets = match scope {
            StopScope::AllKnown => directory.known_targets(),
            StopScope::Only(targets) => targets,
        };
        self.transition(directory, LifecycleOperation::Stop, targets, dry_run)
    }

    /// Issues the batched request, waits, and refreshes.
    fn transition(
        &self,
        directory: &mut InstanceDirectory,
        operation: LifecycleOperation,
        targets: BTreeSet<TargetName>,
        dry_run: bool,
    ) -> Result<LifecycleReport, FleetError> {
        if targets.is_empty() {
            self.audit.record(
                &FleetAuditEvent::new(
                    operation.event(),
                    Vec::<String>::new(),
                    dry_run,
                    AuditOutcome::Skipped,
                )
                .with_detail("no instances require this transition"),
            );
            return Ok(LifecycleReport {
                operation,
                requested: targets,
                dry_run,
            });
        }
        let ids = directory.instance_ids(&targets)?;
        self.audit.record(
            &FleetAuditEvent::new(operation.event(), &targets, dry_run, AuditOutcome::Requested)
                .with_detail(describe_batch(&targets, &ids)),
        );
        let result = match operation {
            LifecycleOperation::Start => self.compute.start_instances(&ids, dry_run),
            LifecycleOperation::Stop => self.compute.stop_instances(&ids, dry_run),
        };
        match result {
            Ok(()) => {}
            Err(err) if dry_run && is_benign_dry_run_signal(&err) => {}
            Err(err) => {
                self.audit.record(
                    &FleetAuditEvent::new(operation.event(), &targets, dry_run, AuditOutcome::Failed)
                        .with_detail(err.to_string()),
                );
                return Err(FleetError::ProviderOperation {
                    operation: operation.as_str(),
                    source: err,
                });
            }
        }
        if !dry_run {
            self.wait(operation, &targets, ids)?;
        }
        directory.refresh(&self.compute)?;
        self.audit.record(&FleetAuditEvent::new(
            operation.event(),
            &targets,
            dry_run,
            AuditOutcome::Completed,
        ));
        Ok(LifecycleReport {
            operation,
            requested: targets,
            dry_run,
        })
    }

    /// Blocks on the provider waiter for the batch.
    fn wait(
        &self,
        operation: LifecycleOperation,
        targets: &BTreeSet<TargetName>,
        ids: Vec<InstanceId>,
    ) -> Result<(), FleetError> {
        let timeout = match operation {
            LifecycleOperation::Start => self.timeouts.start,
            LifecycleOperation::Stop => self.timeouts.stop,
        };
        let state = operation.target_state();
        match self.compute.wait_for_state(&ids, state, timeout) {
            Ok(()) => Ok(()),
            Err(WaitError::TimedOut {
                waited,
            }) => {
                self.audit.record(
                    &FleetAuditEvent::new(
                        operation.event(),
                        targets,
                        false,
                        AuditOutcome::Failed,
                    )
                    .with_detail(format!("waiter for {state} timed out")),
                );
                Err(FleetError::LifecycleTimeout {
                    operation: operation.as_str(),
                    target_state: state,
                    instance_ids: ids,
                    waited,
                })
            }
            Err(WaitError::Provider(err)) => Err(FleetError::ProviderOperation {
                operation: operation.as_str(),
                source: err,
            }),
        }
    }
}

/// Formats `name (id)` pairs for audit detail.
fn describe_batch(targets: &BTreeSet<TargetName>, ids: &[InstanceId]) -> String {
    targets
        .iter()
        .zip(ids)
        .map(|(name, id)| format!("{name} ({id})"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_dry_run_code_is_benign() {
        assert!(is_benign_dry_run_signal(&ProviderError::with_code(
            DRY_RUN_OPERATION_CODE,
            "Request would have succeeded, but DryRun flag is set."
        )));
        assert!(!is_benign_dry_run_signal(&ProviderError::with_code(
            "UnauthorizedOperation",
            "You are not authorized to perform this operation."
        )));
        assert!(!is_benign_dry_run_signal(&ProviderError::new("DryRunOperation")));
    }
}
