// crates/sp-fleet-core/src/core/dns.rs
// ============================================================================
// Module: SP Fleet DNS Model
// Description: Zone records, upsert changes, and hosted zone settings.
// Purpose: Describe DNS state independently of the DNS provider's API.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Records are compared by normalized name (lowercase, no trailing dot). Only
//! `A` records are managed, and every change is an upsert so that replaying a
//! change for an unchanged target is always safe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default TTL written on upserted records, in seconds.
pub const DEFAULT_RECORD_TTL_SECS: u64 = 60;

// ============================================================================
// SECTION: Record Types
// ============================================================================

/// DNS record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// Any other record type, kept by label.
    Other(String),
}

impl RecordType {
    /// Parses a record type label.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        if label.eq_ignore_ascii_case("A") { Self::A } else { Self::Other(label.to_string()) }
    }

    /// Returns the record type label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::A => "A",
            Self::Other(label) => label,
        }
    }
}

/// Normalizes a record name for comparison.
#[must_use]
pub fn normalize_record_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// One zone entry as listed by the DNS provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record name as returned by the provider.
    pub name: String,
    /// Record type.
    pub record_type: RecordType,
    /// Time-to-live in seconds, when present.
    pub ttl: Option<u64>,
    /// Record values.
    pub values: Vec<String>,
}

impl DnsRecord {
    /// Creates an `A` record with a single address.
    #[must_use]
    pub fn a(name: impl Into<String>, ttl: u64, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            ttl: Some(ttl),
            values: vec![address.to_string()],
        }
    }

    /// Returns true when this is an `A` record for the given domain.
    #[must_use]
    pub fn is_a_record_for(&self, domain: &str) -> bool {
        self.record_type == RecordType::A
            && normalize_record_name(&self.name) == normalize_record_name(domain)
    }

    /// Returns the first record value.
    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

// ============================================================================
// SECTION: Changes
// ============================================================================

/// Upsert of a single `A` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    /// Fully qualified record name.
    pub name: String,
    /// TTL in seconds.
    pub ttl: u64,
    /// Address the record should point to.
    pub address: Ipv4Addr,
}

impl RecordChange {
    /// Returns the change as the record it produces.
    #[must_use]
    pub fn to_record(&self) -> DnsRecord {
        DnsRecord::a(self.name.clone(), self.ttl, self.address)
    }
}

/// Batch of upserts submitted as one provider request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Changes in submission order.
    pub changes: Vec<RecordChange>,
}

impl ChangeBatch {
    /// Returns true when the batch holds no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Provider-assigned identifier of a submitted change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    /// Creates a change identifier.
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

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Hosted Zone
// ============================================================================

/// Authoritative zone the targets' records live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    /// Zone name (domain suffix for targets).
    pub name: String,
    /// Provider zone identifier.
    pub id: String,
    /// TTL written on upserted records.
    pub record_ttl: u64,
    /// Upper bound for the provider's change-applied waiter.
    pub change_timeout: Duration,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_match_ignores_trailing_dot_and_case() {
        let record = DnsRecord::a("Diafine6.Zone.Test.", 60, Ipv4Addr::new(10, 0, 0, 1));
        assert!(record.is_a_record_for("diafine6.zone.test"));
        assert!(!record.is_a_record_for("diafine7.zone.test"));
    }

    #[test]
    fn non_a_records_never_match() {
        let record = DnsRecord {
            name: "diafine6.zone.test.".to_string(),
            record_type: RecordType::parse("CNAME"),
            ttl: Some(300),
            values: vec!["elsewhere.test".to_string()],
        };
        assert!(!record.is_a_record_for("diafine6.zone.test"));
        assert_eq!(record.record_type.as_str(), "CNAME");
    }
}
