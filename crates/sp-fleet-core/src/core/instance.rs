// crates/sp-fleet-core/src/core/instance.rs
// ============================================================================
// Module: SP Fleet Instances
// Description: Flat value types for compute instances and their snapshots.
// Purpose: Isolate fleet logic from the compute provider's nested schema.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Compute providers return deeply nested instance descriptions. Provider
//! adapters flatten them into [`ProviderInstance`] values with explicit
//! accessors, and the instance directory derives one [`InstanceRecord`] per
//! target from those values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Instance Identifier
// ============================================================================

/// Opaque provider-assigned instance identifier (stable across restarts).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Creates a new instance identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Instance State
// ============================================================================

/// Power state reported by the compute provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    /// Instance is starting.
    Pending,
    /// Instance is running and has a public address.
    Running,
    /// Instance is being terminated.
    ShuttingDown,
    /// Instance is stopping.
    Stopping,
    /// Instance is stopped.
    Stopped,
    /// Instance is terminated.
    Terminated,
}

impl InstanceState {
    /// Returns the provider label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        }
    }

    /// Parses a provider state label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "shutting-down" => Some(Self::ShuttingDown),
            "stopping" => Some(Self::Stopping),
            "stopped" => Some(Self::Stopped),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Discovery Filters
// ============================================================================

/// Provider-side filter used to discover test-target instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFilter {
    /// Filter name (for example `tag-key` or `tag:purpose`).
    pub name: String,
    /// Accepted values.
    #[serde(default)]
    pub values: Vec<String>,
}

impl InstanceFilter {
    /// Creates a filter.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// SECTION: Provider Instance
// ============================================================================

/// Flattened provider description of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInstance {
    /// Provider instance identifier.
    pub instance_id: InstanceId,
    /// Raw provider state label.
    pub state: String,
    /// Public address as reported (absent while stopped).
    pub public_ip: Option<String>,
    /// Instance tags.
    pub tags: BTreeMap<String, String>,
}

impl ProviderInstance {
    /// Returns the value of the named tag.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

// ============================================================================
// SECTION: Instance Record
// ============================================================================

/// Per-target snapshot held by the instance directory.
///
/// # Invariants
/// - `public_ip` is `None` whenever the provider reported no address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Provider instance identifier.
    pub instance_id: InstanceId,
    /// Last known power state.
    pub state: InstanceState,
    /// Current public address.
    pub public_ip: Option<Ipv4Addr>,
}

impl InstanceRecord {
    /// Returns true when the instance is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == InstanceState::Running
    }

    /// Returns true when the instance is stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state == InstanceState::Stopped
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
