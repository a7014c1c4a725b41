// crates/sp-fleet-core/tests/lifecycle.rs
// ============================================================================
// Module: Lifecycle Controller Tests
// Description: Start/stop scopes, dry-run handling, and waiter failures.
// Purpose: Ensure one batched request per call with the right instance set.
// Dependencies: sp-fleet-core
// ============================================================================

//! ## Overview
//! Drives `LifecycleController` against the in-memory compute provider.

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

use std::time::Duration;

use common::ALPHA;
use common::BETA;
use common::Harness;
use common::NEW_IP;
use common::OLD_IP;
use common::names;
use sp_fleet_core::ComputeCall;
use sp_fleet_core::ComputeOperation;
use sp_fleet_core::FleetError;
use sp_fleet_core::InMemoryCompute;
use sp_fleet_core::InstanceDirectory;
use sp_fleet_core::InstanceId;
use sp_fleet_core::InstanceState;
use sp_fleet_core::LifecycleController;
use sp_fleet_core::LifecycleTimeouts;
use sp_fleet_core::ProviderError;
use sp_fleet_core::StartScope;
use sp_fleet_core::StopScope;
use sp_fleet_core::TargetName;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Seeds one running and one stopped target and returns a refreshed directory.
fn seeded(harness: &Harness) -> (LifecycleController<InMemoryCompute>, InstanceDirectory) {
    harness.compute.add_target_instance("i-a", ALPHA, InstanceState::Running, Some(OLD_IP));
    harness.compute.add_target_instance("i-b", BETA, InstanceState::Stopped, None);
    harness.compute.queue_addresses([NEW_IP]);
    let controller = LifecycleController::new(
        harness.compute.clone(),
        LifecycleTimeouts {
            start: Duration::from_secs(300),
            stop: Duration::from_secs(200),
        },
        harness.audit.clone(),
    );
    let mut directory = harness.directory();
    controller.refresh(&mut directory).unwrap();
    (controller, directory)
}

fn ids(items: &[&str]) -> Vec<InstanceId> {
    items.iter().map(|item| InstanceId::new(*item)).collect()
}

// ============================================================================
// SECTION: Start
// ============================================================================

#[test]
fn default_start_selects_only_not_running_targets() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    let report = controller.start(&mut directory, StartScope::AllNotRunning, false).unwrap();

    assert_eq!(report.requested, names(&[BETA]));
    assert_eq!(harness.compute.start_requests(), vec![ids(&["i-b"])]);
    assert!(directory.is_running(&TargetName::new(BETA)));
    assert_eq!(directory.address_of(&TargetName::new(BETA)), Some(NEW_IP));
}

#[test]
fn explicit_start_issues_one_batched_request() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    controller.start(&mut directory, StartScope::Only(names(&[ALPHA, BETA])), false).unwrap();
    assert_eq!(harness.compute.start_requests(), vec![ids(&["i-a", "i-b"])]);
    assert_eq!(harness.compute.wait_count(), 1);
}

#[test]
fn start_with_nothing_to_do_skips_provider_and_refresh() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    controller.start(&mut directory, StartScope::AllNotRunning, false).unwrap();
    let calls_before = harness.compute.calls().len();

    let report = controller.start(&mut directory, StartScope::AllNotRunning, false).unwrap();
    assert!(report.is_noop());
    assert_eq!(harness.compute.calls().len(), calls_before);
}

#[test]
fn unknown_target_is_rejected_before_any_request() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    let err =
        controller.start(&mut directory, StartScope::Only(names(&["ghost"])), false).unwrap_err();
    assert!(matches!(err, FleetError::UnknownTarget(ref name) if name.as_str() == "ghost"));
    assert!(harness.compute.start_requests().is_empty());
}

#[test]
fn start_requires_a_refreshed_directory() {
    let harness = Harness::new();
    let (controller, _) = seeded(&harness);
    let mut fresh = harness.directory();
    let err = controller.start(&mut fresh, StartScope::AllNotRunning, false).unwrap_err();
    assert!(matches!(err, FleetError::DirectoryNotRefreshed));
}

// ============================================================================
// SECTION: Stop
// ============================================================================

#[test]
fn default_stop_includes_already_stopped_targets() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    let report = controller.stop(&mut directory, StopScope::AllKnown, false).unwrap();

    assert_eq!(report.requested, names(&[ALPHA, BETA]));
    assert_eq!(harness.compute.stop_requests(), vec![ids(&["i-a", "i-b"])]);
    assert!(directory.is_stopped(&TargetName::new(ALPHA)));
    assert_eq!(directory.address_of(&TargetName::new(ALPHA)), None);
}

#[test]
fn start_and_stop_defaults_differ_on_the_same_fleet() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    let start = controller.start(&mut directory, StartScope::from_requested(names(&[])), true).unwrap();
    let stop = controller.stop(&mut directory, StopScope::from_requested(names(&[])), true).unwrap();
    assert_eq!(start.requested, names(&[BETA]));
    assert_eq!(stop.requested, names(&[ALPHA, BETA]));
    assert_eq!(harness.compute.wait_count(), 0);
    assert_eq!(harness.compute.state_of("i-a"), Some(InstanceState::Running));
    assert_eq!(harness.compute.state_of("i-b"), Some(InstanceState::Stopped));
}

// ============================================================================
// SECTION: Dry Run
// ============================================================================

#[test]
fn dry_run_accepts_acknowledgement_and_never_waits() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    let report = controller.start(&mut directory, StartScope::AllNotRunning, true).unwrap();

    assert!(report.dry_run);
    assert_eq!(harness.compute.wait_count(), 0);
    assert!(harness.compute.calls().contains(&ComputeCall::Start {
        ids: ids(&["i-b"]),
        dry_run: true,
    }));
    assert_eq!(harness.compute.state_of("i-b"), Some(InstanceState::Stopped));
}

#[test]
fn dry_run_stop_never_waits_or_changes_state() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    let report = controller.stop(&mut directory, StopScope::AllKnown, true).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.requested, names(&[ALPHA, BETA]));
    assert_eq!(harness.compute.wait_count(), 0);
    assert!(harness.compute.calls().contains(&ComputeCall::Stop {
        ids: ids(&["i-a", "i-b"]),
        dry_run: true,
    }));
    assert_eq!(harness.compute.state_of("i-a"), Some(InstanceState::Running));
    assert_eq!(harness.compute.state_of("i-b"), Some(InstanceState::Stopped));
    assert!(directory.is_running(&TargetName::new(ALPHA)));
    assert_eq!(directory.address_of(&TargetName::new(ALPHA)), Some(OLD_IP));
}

#[test]
fn dry_run_propagates_other_provider_errors() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    harness.compute.fail(
        ComputeOperation::Stop,
        ProviderError::with_code("UnauthorizedOperation", "You are not authorized"),
    );
    let err = controller.stop(&mut directory, StopScope::AllKnown, true).unwrap_err();
    match err {
        FleetError::ProviderOperation {
            operation,
            source,
        } => {
            assert_eq!(operation, "stop");
            assert_eq!(source.code.as_deref(), Some("UnauthorizedOperation"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// SECTION: Waiters
// ============================================================================

#[test]
fn stalled_start_surfaces_lifecycle_timeout() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    harness.compute.stall_transitions(true);
    let err = controller.start(&mut directory, StartScope::AllNotRunning, false).unwrap_err();
    match err {
        FleetError::LifecycleTimeout {
            target_state,
            instance_ids,
            waited,
            ..
        } => {
            assert_eq!(target_state, InstanceState::Running);
            assert_eq!(instance_ids, ids(&["i-b"]));
            assert_eq!(waited, Duration::from_secs(300));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(directory.is_stopped(&TargetName::new(BETA)));
}

#[test]
fn lifecycle_steps_are_audited() {
    let harness = Harness::new();
    let (controller, mut directory) = seeded(&harness);
    controller.stop(&mut directory, StopScope::AllKnown, false).unwrap();
    assert!(harness.audit.events().iter().any(|event| event.event == "instances_stop"
        && event.detail.as_deref() == Some("diafine6 (i-a), wordpress (i-b)")));
    assert_eq!(harness.audit.event_names().last(), Some(&"instances_stop"));
}
