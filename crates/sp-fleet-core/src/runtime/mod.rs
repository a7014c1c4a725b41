// crates/sp-fleet-core/src/runtime/mod.rs
// ============================================================================
// Module: SP Fleet Runtime
// Description: Directory, lifecycle, DNS, propagation, and readiness logic.
// Purpose: Drive targets to "running and resolvable" through the interfaces.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components are generic over the provider interfaces and compose
//! into the [`Fleet`] facade. In-memory providers live alongside them so
//! tests and embedding callers can run the full flow without a cloud account.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod directory;
pub mod dns;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod propagation;
pub mod readiness;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use directory::InstanceDirectory;
pub use dns::DnsReconciler;
pub use dns::ReconcileReport;
pub use dns::record_requires_update;
pub use error::FleetError;
pub use lifecycle::DEFAULT_START_TIMEOUT;
pub use lifecycle::DEFAULT_STOP_TIMEOUT;
pub use lifecycle::DRY_RUN_OPERATION_CODE;
pub use lifecycle::LifecycleController;
pub use lifecycle::LifecycleOperation;
pub use lifecycle::LifecycleReport;
pub use lifecycle::LifecycleTimeouts;
pub use lifecycle::is_benign_dry_run_signal;
pub use memory::ComputeCall;
pub use memory::ComputeOperation;
pub use memory::InMemoryCompute;
pub use memory::InMemoryDnsZone;
pub use memory::ManualClock;
pub use memory::ScriptedAnswer;
pub use memory::ScriptedResolver;
pub use propagation::DEFAULT_MARGIN_POLLS;
pub use propagation::DEFAULT_POLL_DIVISOR;
pub use propagation::PropagationPolicy;
pub use propagation::PropagationWaiter;
pub use readiness::Fleet;
pub use readiness::FleetOptions;
pub use readiness::ReadinessReport;
pub use readiness::SessionPolicy;
pub use readiness::TargetStatus;
