// crates/sp-fleet-core/src/core/mod.rs
// ============================================================================
// Module: SP Fleet Core Types
// Description: Data model for targets, instances, DNS records, and scopes.
// Purpose: Group the value types shared by every fleet component.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types are plain values. They hold no provider handles and perform no
//! I/O; the runtime components own all side effects.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dns;
pub mod instance;
pub mod scope;
pub mod target;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dns::ChangeBatch;
pub use dns::ChangeId;
pub use dns::DEFAULT_RECORD_TTL_SECS;
pub use dns::DnsRecord;
pub use dns::HostedZone;
pub use dns::RecordChange;
pub use dns::RecordType;
pub use dns::normalize_record_name;
pub use instance::InstanceFilter;
pub use instance::InstanceId;
pub use instance::InstanceRecord;
pub use instance::InstanceState;
pub use instance::ProviderInstance;
pub use scope::ReconcileScope;
pub use scope::StartScope;
pub use scope::StopScope;
pub use target::DEFAULT_TARGET_TAG;
pub use target::Target;
pub use target::TargetCatalog;
pub use target::TargetName;
