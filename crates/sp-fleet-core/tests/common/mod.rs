// crates/sp-fleet-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fixtures for sp-fleet-core integration tests.
// Purpose: Build fleets over in-memory providers with a recorded audit trail.
// Dependencies: sp-fleet-core
// ============================================================================

//! ## Overview
//! Provides a two-target fleet wired to in-memory providers, plus handles to
//! every fake so tests can seed state and inspect calls.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use sp_fleet_core::Fleet;
use sp_fleet_core::FleetOptions;
use sp_fleet_core::HostedZone;
use sp_fleet_core::InMemoryCompute;
use sp_fleet_core::InMemoryDnsZone;
use sp_fleet_core::InstanceDirectory;
use sp_fleet_core::InstanceFilter;
use sp_fleet_core::LifecycleTimeouts;
use sp_fleet_core::ManualClock;
use sp_fleet_core::MemoryAuditSink;
use sp_fleet_core::PropagationPolicy;
use sp_fleet_core::ScriptedResolver;
use sp_fleet_core::TargetCatalog;
use sp_fleet_core::TargetName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Zone every fixture target lives in.
pub const ZONE: &str = "sp.example.com";
/// First fixture target.
pub const ALPHA: &str = "diafine6";
/// Second fixture target.
pub const BETA: &str = "wordpress";
/// Stale address used for outdated records.
pub const OLD_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 10);
/// Address handed out on the next start.
pub const NEW_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 20);
/// Address handed out on the start after that.
pub const NEXT_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 30);

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Handles to every fake behind a fixture fleet.
pub struct Harness {
    /// Compute fake.
    pub compute: InMemoryCompute,
    /// Zone fake.
    pub zone: InMemoryDnsZone,
    /// Resolver fake.
    pub resolver: ScriptedResolver,
    /// Clock fake.
    pub clock: ManualClock,
    /// Recorded audit events.
    pub audit: Arc<MemoryAuditSink>,
}

/// Fixture fleet type.
pub type TestFleet = Fleet<InMemoryCompute, InMemoryDnsZone, ScriptedResolver, ManualClock>;

impl Harness {
    /// Creates empty fakes; the resolver reads the zone unless scripted.
    pub fn new() -> Self {
        let zone = InMemoryDnsZone::new();
        Self {
            compute: InMemoryCompute::new(),
            resolver: ScriptedResolver::backed_by(zone.clone()),
            zone,
            clock: ManualClock::new(),
            audit: Arc::new(MemoryAuditSink::new()),
        }
    }

    /// Builds a fleet over the fixture catalog.
    pub fn fleet(&self, dry_run: bool) -> TestFleet {
        self.fleet_over(catalog(), dry_run)
    }

    /// Builds a fleet over an arbitrary catalog.
    pub fn fleet_over(&self, catalog: TargetCatalog, dry_run: bool) -> TestFleet {
        Fleet::new(
            catalog,
            self.compute.clone(),
            self.zone.clone(),
            self.resolver.clone(),
            self.clock.clone(),
            options(dry_run),
            self.audit.clone(),
        )
    }

    /// Builds a bare directory over the fixture catalog.
    pub fn directory(&self) -> InstanceDirectory {
        InstanceDirectory::new(catalog(), self.audit.clone())
    }
}

/// Two-target catalog.
pub fn catalog() -> TargetCatalog {
    TargetCatalog::from_names(
        [ALPHA, BETA],
        ZONE,
        vec![InstanceFilter::new("instance-state-name", ["pending", "running", "stopping", "stopped"])],
    )
}

/// Two-target catalog without discovery filters, as a profile with no
/// `discovery.filters` produces.
pub fn unfiltered_catalog() -> TargetCatalog {
    TargetCatalog::from_names([ALPHA, BETA], ZONE, Vec::new())
}

/// Fixture zone.
pub fn hosted_zone() -> HostedZone {
    HostedZone {
        name: ZONE.to_string(),
        id: "Z0FIXTURE".to_string(),
        record_ttl: 60,
        change_timeout: Duration::from_secs(120),
    }
}

/// Fixture facade options.
pub fn options(dry_run: bool) -> FleetOptions {
    FleetOptions {
        zone: hosted_zone(),
        lifecycle: LifecycleTimeouts::default(),
        propagation: PropagationPolicy::from_ttl(Duration::from_secs(60)),
        dry_run,
    }
}

/// Fully qualified domain for a fixture target.
pub fn domain(name: &str) -> String {
    format!("{name}.{ZONE}")
}

/// Builds a target-name set.
pub fn names(items: &[&str]) -> BTreeSet<TargetName> {
    items.iter().map(|item| TargetName::new(*item)).collect()
}
