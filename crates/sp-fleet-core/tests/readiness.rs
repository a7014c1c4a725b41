// crates/sp-fleet-core/tests/readiness.rs
// ============================================================================
// Module: Readiness Facade Tests
// Description: End-to-end readiness, release, status, and session helpers.
// Purpose: Ensure the facade issues the minimum provider calls per scenario.
// Dependencies: sp-fleet-core
// ============================================================================

//! ## Overview
//! Runs `Fleet` over the in-memory providers. The resolver reads the
//! in-memory zone, so an upsert becomes visible on the next lookup.

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

use std::collections::BTreeSet;

use common::ALPHA;
use common::BETA;
use common::Harness;
use common::NEW_IP;
use common::NEXT_IP;
use common::OLD_IP;
use common::domain;
use common::names;
use common::unfiltered_catalog;
use sp_fleet_core::DnsRecord;
use sp_fleet_core::FleetError;
use sp_fleet_core::InstanceState;
use sp_fleet_core::SessionPolicy;

// ============================================================================
// SECTION: Ensure Ready
// ============================================================================

#[test]
fn stopped_target_with_stale_record_is_started_and_repointed() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Stopped, None);
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.compute.queue_addresses([NEW_IP]);
    harness.zone.put_record(DnsRecord::a(format!("{}.", domain(ALPHA)), 60, OLD_IP));
    let mut fleet = harness.fleet(false);

    let report = fleet.ensure_ready(&names(&[ALPHA])).unwrap();

    assert_eq!(report.started, names(&[ALPHA]));
    assert_eq!(report.dns_updated, names(&[ALPHA]));
    assert_eq!(report.verified, names(&[ALPHA]));
    assert_eq!(harness.compute.start_requests().len(), 1);
    assert_eq!(harness.zone.submissions().len(), 1);
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(NEW_IP));
    assert_eq!(harness.compute.state_of("i-b"), Some(InstanceState::Stopped));
}

#[test]
fn already_correct_target_makes_no_mutating_calls() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.zone.put_record(DnsRecord::a(domain(ALPHA), 60, NEW_IP));
    let mut fleet = harness.fleet(false);

    let report = fleet.ensure_ready(&names(&[ALPHA])).unwrap();

    assert!(report.started.is_empty());
    assert!(report.dns_updated.is_empty());
    assert_eq!(report.verified, names(&[ALPHA]));
    assert!(harness.compute.start_requests().is_empty());
    assert!(harness.zone.submissions().is_empty());
    assert!(harness.clock.sleeps().is_empty());
}

#[test]
fn running_target_with_stale_record_is_repointed_without_start() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.zone.put_record(DnsRecord::a(domain(ALPHA), 60, OLD_IP));
    let mut fleet = harness.fleet(false);

    let report = fleet.ensure_ready(&names(&[ALPHA])).unwrap();

    assert!(report.started.is_empty());
    assert_eq!(report.dns_updated, names(&[ALPHA]));
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(NEW_IP));
}

#[test]
fn empty_request_readies_every_configured_target() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.compute.queue_addresses([NEXT_IP]);
    let mut fleet = harness.fleet(false);

    let report = fleet.ensure_ready(&BTreeSet::new()).unwrap();

    assert_eq!(report.started, names(&[BETA]));
    assert_eq!(report.dns_updated, names(&[ALPHA, BETA]));
    assert_eq!(harness.zone.submissions().len(), 1);
    assert_eq!(harness.zone.address_of(&domain(BETA)), Some(NEXT_IP));
}

#[test]
fn terminated_predecessor_does_not_block_readiness() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-old", ALPHA, InstanceState::Terminated, None);
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Running, Some(NEXT_IP));
    let mut fleet = harness.fleet_over(unfiltered_catalog(), false);

    let report = fleet.ensure_ready(&BTreeSet::new()).unwrap();

    assert!(report.started.is_empty());
    assert_eq!(report.verified, names(&[ALPHA, BETA]));
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(NEW_IP));
    assert_eq!(harness.compute.state_of("i-old"), Some(InstanceState::Terminated));
}

#[test]
fn dry_run_touches_nothing() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Stopped, None);
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Running, Some(NEW_IP));
    harness.zone.put_record(DnsRecord::a(domain(BETA), 60, OLD_IP));
    let mut fleet = harness.fleet(true);

    let report = fleet.ensure_ready(&BTreeSet::new()).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.started, names(&[ALPHA]));
    assert!(report.verified.is_empty());
    assert_eq!(harness.compute.state_of("i-a"), Some(InstanceState::Stopped));
    assert!(harness.compute.start_requests().is_empty());
    assert_eq!(harness.compute.wait_count(), 0);
    assert!(harness.zone.submissions().is_empty());
    assert!(harness.resolver.lookups().is_empty());
}

#[test]
fn unknown_target_fails_before_provider_calls() {
    let harness = Harness::new();
    let mut fleet = harness.fleet(false);
    let err = fleet.ensure_ready(&names(&["ghost"])).unwrap_err();
    assert!(matches!(err, FleetError::UnknownTarget(_)));
    assert!(harness.compute.calls().is_empty());
}

#[test]
fn propagation_timeout_propagates_from_facade() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.resolver.answer(&domain(ALPHA), Some(OLD_IP));
    let mut fleet = harness.fleet(false);

    let err = fleet.ensure_ready(&names(&[ALPHA])).unwrap_err();
    assert!(matches!(err, FleetError::PropagationTimeout { .. }));
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(NEW_IP));
}

// ============================================================================
// SECTION: Release and Status
// ============================================================================

#[test]
fn release_stops_exactly_the_named_targets() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Running, Some(OLD_IP));
    let mut fleet = harness.fleet(false);

    let report = fleet.release(&names(&[BETA])).unwrap();

    assert_eq!(report.requested, names(&[BETA]));
    assert_eq!(harness.compute.state_of("i-a"), Some(InstanceState::Running));
    assert_eq!(harness.compute.state_of("i-b"), Some(InstanceState::Stopped));
}

#[test]
fn status_reports_stale_records_for_running_targets() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.zone.put_record(DnsRecord::a(domain(ALPHA), 60, OLD_IP));
    let mut fleet = harness.fleet(false);

    let statuses = fleet.status().unwrap();

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].name.as_str(), ALPHA);
    assert_eq!(statuses[0].url, format!("https://{}", domain(ALPHA)));
    assert!(statuses[0].dns_stale);
    assert_eq!(statuses[0].public_ip, Some(NEW_IP));
    assert_eq!(statuses[1].state, InstanceState::Stopped);
    assert!(!statuses[1].dns_stale);
}

#[test]
fn reconcile_records_waits_only_for_updated_targets() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(NEW_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    let mut fleet = harness.fleet(false);

    let report = fleet.reconcile_records(&BTreeSet::new()).unwrap();

    assert_eq!(report.updated, names(&[ALPHA]));
    assert_eq!(report.skipped, names(&[BETA]));
    assert_eq!(harness.resolver.lookups(), vec![domain(ALPHA)]);
}

// ============================================================================
// SECTION: Sessions
// ============================================================================

#[test]
fn session_starts_everything_up_front_and_stops_everything_after() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Stopped, None);
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.compute.queue_addresses([NEW_IP, NEXT_IP]);
    let mut fleet = harness.fleet(false);
    let policy = SessionPolicy::default();

    let ready = fleet.begin_session(policy).unwrap().unwrap();
    assert_eq!(ready.started, names(&[ALPHA, BETA]));
    assert_eq!(harness.zone.address_of(&domain(ALPHA)), Some(NEW_IP));
    assert_eq!(harness.zone.address_of(&domain(BETA)), Some(NEXT_IP));

    let released = fleet.finish_session(policy).unwrap().unwrap();
    assert_eq!(released.requested, names(&[ALPHA, BETA]));
    assert_eq!(harness.compute.state_of("i-a"), Some(InstanceState::Stopped));
}

#[test]
fn session_flags_disable_setup_and_teardown() {
    let harness = Harness::new();
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Stopped, None);
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Running, Some(NEW_IP));
    let mut fleet = harness.fleet(false);
    let policy = SessionPolicy {
        start_all_upfront: false,
        stop_on_finish: false,
    };

    assert!(fleet.begin_session(policy).unwrap().is_none());
    assert!(fleet.finish_session(policy).unwrap().is_none());
    assert!(harness.compute.calls().is_empty());
    assert_eq!(harness.audit.event_names(), vec!["session_begin", "session_finish"]);
}
