// crates/sp-fleet-core/src/lib.rs
// ============================================================================
// Module: SP Fleet Core Library
// Description: Public API surface for the SP fleet core.
// Purpose: Expose target types, provider interfaces, and runtime components.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! SP fleet core brings externally hosted test endpoints to a known state
//! before a test session: instances running, authoritative A records pointing
//! at their current public addresses, and those records visible through live
//! resolution. It is provider-agnostic and integrates through explicit
//! interfaces; the AWS bindings live in `sp-fleet-providers`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use audit::AuditOutcome;
pub use audit::FileAuditSink;
pub use audit::FleetAuditEvent;
pub use audit::FleetAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::SharedAuditSink;
pub use audit::StderrAuditSink;
pub use interfaces::AddressResolver;
pub use interfaces::Clock;
pub use interfaces::ComputeProvider;
pub use interfaces::DnsProvider;
pub use interfaces::ProviderError;
pub use interfaces::ResolveError;
pub use interfaces::SystemClock;
pub use interfaces::WaitError;
pub use runtime::InstanceDirectory;
pub use runtime::DnsReconciler;
pub use runtime::ReconcileReport;
pub use runtime::record_requires_update;
pub use runtime::FleetError;
pub use runtime::DEFAULT_START_TIMEOUT;
pub use runtime::DEFAULT_STOP_TIMEOUT;
pub use runtime::DRY_RUN_OPERATION_CODE;
pub use runtime::LifecycleController;
pub use runtime::LifecycleOperation;
pub use runtime::LifecycleReport;
pub use runtime::LifecycleTimeouts;
pub use runtime::is_benign_dry_run_signal;
pub use runtime::ComputeCall;
pub use runtime::ComputeOperation;
pub use runtime::InMemoryCompute;
pub use runtime::InMemoryDnsZone;
pub use runtime::ManualClock;
pub use runtime::ScriptedAnswer;
pub use runtime::ScriptedResolver;
pub use runtime::DEFAULT_MARGIN_POLLS;
pub use runtime::DEFAULT_POLL_DIVISOR;
pub use runtime::PropagationPolicy;
pub use runtime::PropagationWaiter;
pub use runtime::Fleet;
pub use runtime::FleetOptions;
pub use runtime::ReadinessReport;
pub use runtime::SessionPolicy;
pub use runtime::TargetStatus;
