// crates/sp-fleet-core/tests/dns_reconcile.rs
// ============================================================================
// Module: DNS Reconciler Tests
// Description: Stale detection, batching, skips, and change waiter failures.
// Purpose: Ensure only stale records for addressed targets are upserted.
// Dependencies: sp-fleet-core, proptest
// ============================================================================

//! ## Overview
//! Drives `DnsReconciler` against the in-memory zone and checks the record
//! comparison rule with generated inputs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::net::Ipv4Addr;

use common::ALPHA;
use common::BETA;
use common::Harness;
use common::NEW_IP;
use common::OLD_IP;
use common::domain;
use common::hosted_zone;
use common::names;
use proptest::prelude::*;
use sp_fleet_core::DnsReconciler;
use sp_fleet_core::DnsRecord;
use sp_fleet_core::FleetError;
use sp_fleet_core::InMemoryDnsZone;
use sp_fleet_core::InstanceDirectory;
use sp_fleet_core::InstanceState;
use sp_fleet_core::ProviderError;
use sp_fleet_core::ReconcileScope;
use sp_fleet_core::RecordType;
use sp_fleet_core::Target;
use sp_fleet_core::record_requires_update;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Alpha running at NEW_IP with a stale record, beta stopped.
fn seeded(harness: &Harness) -> (DnsReconciler<InMemoryDnsZone>, InstanceDirectory) {
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.zone.put_record(DnsRecord::a(format!("{}.", domain(ALPHA)), 60, OLD_IP));
    let mut directory = harness.directory();
    directory.refresh(&harness.compute).unwrap();
    let reconciler = DnsReconciler::new(harness.zone.clone(), hosted_zone(), harness.audit.clone());
    (reconciler, directory)
}

// ============================================================================
// SECTION: Reconcile
// ============================================================================

#[test]
fn all_stale_upserts_running_targets_and_skips_the_rest() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    let report = reconciler.reconcile(&directory, ReconcileScope::AllStale, false).unwrap();

    assert_eq!(report.updated, names(&[ALPHA]));
    assert_eq!(report.skipped, names(&[BETA]));
    assert!(report.change_id.is_some());
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(NEW_IP));
    assert_eq!(harness.zone.address_of(&domain(BETA)), None);

    let submissions = harness.zone.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].changes.len(), 1);
    assert_eq!(submissions[0].changes[0].ttl, 60);
}

#[test]
fn current_records_produce_no_write() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    reconciler.reconcile(&directory, ReconcileScope::AllStale, false).unwrap();

    let report =
        reconciler.reconcile(&directory, ReconcileScope::StaleAmong(names(&[ALPHA])), false).unwrap();
    assert!(report.updated.is_empty());
    assert!(report.change_id.is_none());
    assert_eq!(harness.zone.submissions().len(), 1);
}

#[test]
fn explicit_scope_upserts_unconditionally() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    reconciler.reconcile(&directory, ReconcileScope::AllStale, false).unwrap();

    let report =
        reconciler.reconcile(&directory, ReconcileScope::Only(names(&[ALPHA])), false).unwrap();
    assert_eq!(report.updated, names(&[ALPHA]));
    assert_eq!(harness.zone.submissions().len(), 2);
}

#[test]
fn explicit_scope_rejects_unknown_targets() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    let err = reconciler
        .reconcile(&directory, ReconcileScope::Only(names(&["ghost"])), false)
        .unwrap_err();
    assert!(matches!(err, FleetError::UnknownTarget(_)));
}

#[test]
fn dry_run_lists_but_never_writes() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    let report = reconciler.reconcile(&directory, ReconcileScope::AllStale, true).unwrap();

    assert_eq!(report.updated, names(&[ALPHA]));
    assert!(report.change_id.is_none());
    assert!(harness.zone.submissions().is_empty());
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(OLD_IP));
}

#[test]
fn rejected_change_surfaces_provider_error() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    harness.zone.fail_submissions(ProviderError::with_code("InvalidChangeBatch", "bad batch"));
    let err = reconciler.reconcile(&directory, ReconcileScope::AllStale, false).unwrap_err();
    assert!(matches!(err, FleetError::ProviderOperation { operation: "dns upsert", .. }));
}

#[test]
fn unapplied_change_surfaces_change_timeout() {
    let harness = Harness::new();
    let (reconciler, directory) = seeded(&harness);
    harness.zone.stall_changes(true);
    let err = reconciler.reconcile(&directory, ReconcileScope::AllStale, false).unwrap_err();
    assert!(matches!(err, FleetError::DnsChangeTimeout { .. }));
}

// ============================================================================
// SECTION: Comparison Properties
// ============================================================================

fn ipv4() -> impl Strategy<Value = Ipv4Addr> {
    any::<u32>().prop_map(Ipv4Addr::from)
}

proptest! {
    #[test]
    fn record_needs_update_iff_first_value_differs(
        current in ipv4(),
        desired in ipv4(),
        trailing_dot in any::<bool>(),
        extra in prop::collection::vec(ipv4(), 0..3),
    ) {
        let target = Target::new("diafine6", "sp.example.com");
        let name = if trailing_dot { "diafine6.sp.example.com." } else { "diafine6.sp.example.com" };
        let mut values = vec![current.to_string()];
        values.extend(extra.iter().map(ToString::to_string));
        let records = vec![
            DnsRecord {
                name: name.to_string(),
                record_type: RecordType::Other("TXT".to_string()),
                ttl: Some(60),
                values: vec![desired.to_string()],
            },
            DnsRecord {
                name: name.to_string(),
                record_type: RecordType::A,
                ttl: Some(60),
                values,
            },
        ];
        prop_assert_eq!(record_requires_update(&records, &target, Some(desired)), current != desired);
        prop_assert!(record_requires_update(&records, &target, None));
    }
}
