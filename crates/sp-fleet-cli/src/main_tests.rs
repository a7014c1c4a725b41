// crates/sp-fleet-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and report rendering.
// Purpose: Ensure every subcommand parses and reports render predictably.
// Dependencies: sp-fleet-cli main helpers
// ============================================================================

//! ## Overview
//! Parses each subcommand through clap and checks the text renderers used by
//! the target commands.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use sp_fleet_core::ChangeId;
use sp_fleet_core::InstanceId;
use sp_fleet_core::InstanceState;
use sp_fleet_core::LifecycleOperation;
use sp_fleet_core::LifecycleReport;
use sp_fleet_core::ReadinessReport;
use sp_fleet_core::ReconcileReport;
use sp_fleet_core::TargetName;
use sp_fleet_core::TargetStatus;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::SessionCommand;
use super::StatusFormat;
use super::lifecycle_lines;
use super::readiness_lines;
use super::reconcile_lines;
use super::status_lines;
use super::target_set;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("sp-fleet").chain(args.iter().copied()))
        .expect("arguments parse")
}

fn names(values: &[&str]) -> BTreeSet<TargetName> {
    values.iter().map(|value| TargetName::new(*value)).collect()
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn global_options_default_to_base_profile() {
    let cli = parse(&["status"]);
    assert_eq!(cli.profile, "base");
    assert_eq!(cli.config, None);
    match cli.command {
        Some(Commands::Status(command)) => assert_eq!(command.format, StatusFormat::Text),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_options_are_accepted_after_subcommand() {
    let cli = parse(&["start", "--profile", "ci", "--config", "fleet.toml"]);
    assert_eq!(cli.profile, "ci");
    assert_eq!(cli.config, Some(PathBuf::from("fleet.toml")));
}

#[test]
fn start_collects_repeated_targets_and_dry_run() {
    let cli = parse(&["start", "--target", "diafine6", "--target", "wordpress", "--dry-run"]);
    match cli.command {
        Some(Commands::Start(command)) => {
            assert_eq!(command.targets, vec!["diafine6", "wordpress"]);
            assert!(command.dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn stop_without_targets_is_empty() {
    let cli = parse(&["stop"]);
    match cli.command {
        Some(Commands::Stop(command)) => {
            assert!(command.targets.is_empty());
            assert!(!command.dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn reconcile_accepts_targets() {
    let cli = parse(&["reconcile", "--target", "wordpress"]);
    assert!(matches!(cli.command, Some(Commands::Reconcile(command)) if command.targets == ["wordpress"]));
}

#[test]
fn status_accepts_json_format() {
    let cli = parse(&["status", "--format", "json"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Status(command)) if command.format == StatusFormat::Json
    ));
}

#[test]
fn status_rejects_unknown_format() {
    let result = Cli::try_parse_from(["sp-fleet", "status", "--format", "yaml"]);
    assert!(result.is_err());
}

#[test]
fn session_subcommands_parse() {
    let cli = parse(&["session", "begin", "--dry-run"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Session { command: SessionCommand::Begin(args) }) if args.dry_run
    ));
    let cli = parse(&["session", "finish"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Session { command: SessionCommand::Finish(args) }) if !args.dry_run
    ));
}

#[test]
fn config_subcommands_parse() {
    let cli = parse(&["config", "validate"]);
    assert!(matches!(cli.command, Some(Commands::Config { command: ConfigCommand::Validate })));
    let cli = parse(&["config", "example"]);
    assert!(matches!(cli.command, Some(Commands::Config { command: ConfigCommand::Example })));
}

#[test]
fn version_flag_needs_no_subcommand() {
    let cli = parse(&["--version"]);
    assert!(cli.show_version);
    assert!(cli.command.is_none());
}

#[test]
fn target_set_trims_and_deduplicates() {
    let set = target_set(&[" diafine6".to_string(), "diafine6".to_string()]);
    assert_eq!(set, names(&["diafine6"]));
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

#[test]
fn readiness_report_lists_each_step() {
    let report = ReadinessReport {
        started: names(&["diafine6"]),
        dns_updated: names(&["diafine6", "wordpress"]),
        verified: names(&["diafine6", "wordpress"]),
        dry_run: false,
    };
    assert_eq!(
        readiness_lines(&report),
        vec![
            "started: diafine6".to_string(),
            "dns updated: diafine6, wordpress".to_string(),
            "verified: diafine6, wordpress".to_string(),
        ]
    );
}

#[test]
fn dry_run_readiness_report_says_what_would_change() {
    let report = ReadinessReport {
        started: names(&["diafine6"]),
        dns_updated: names(&["diafine6", "wordpress"]),
        verified: BTreeSet::new(),
        dry_run: true,
    };
    assert_eq!(
        readiness_lines(&report),
        vec![
            "would start (dry run): diafine6".to_string(),
            "would update dns (dry run): diafine6, wordpress".to_string(),
            "verified: skipped (dry run)".to_string(),
        ]
    );
}

#[test]
fn dry_run_stop_and_reconcile_reports_are_qualified() {
    let stop = LifecycleReport {
        operation: LifecycleOperation::Stop,
        requested: names(&["wordpress"]),
        dry_run: true,
    };
    assert_eq!(lifecycle_lines(&stop), vec!["would stop (dry run): wordpress".to_string()]);

    let reconcile = ReconcileReport {
        updated: names(&["diafine6"]),
        skipped: BTreeSet::new(),
        change_id: None,
        dry_run: true,
    };
    assert_eq!(
        reconcile_lines(&reconcile),
        vec!["would update dns (dry run): diafine6".to_string()]
    );
}

#[test]
fn reconcile_report_mentions_skips_and_change() {
    let report = ReconcileReport {
        updated: names(&["diafine6"]),
        skipped: names(&["wordpress"]),
        change_id: Some(ChangeId::new("C123")),
        dry_run: false,
    };
    let lines = reconcile_lines(&report);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "dns skipped (no address): wordpress");
    assert_eq!(lines[2], "change: C123");
}

#[test]
fn status_lines_show_address_and_alignment() {
    let statuses = vec![
        TargetStatus {
            name: TargetName::new("diafine6"),
            domain: "diafine6.sp.example.com".to_string(),
            url: "https://diafine6.sp.example.com".to_string(),
            instance_id: InstanceId::new("i-a"),
            state: InstanceState::Running,
            public_ip: Some(Ipv4Addr::new(203, 0, 113, 7)),
            dns_stale: true,
        },
        TargetStatus {
            name: TargetName::new("wordpress"),
            domain: "wordpress.sp.example.com".to_string(),
            url: "https://wordpress.sp.example.com".to_string(),
            instance_id: InstanceId::new("i-b"),
            state: InstanceState::Stopped,
            public_ip: None,
            dns_stale: false,
        },
    ];
    let lines = status_lines(&statuses);
    assert_eq!(
        lines[0],
        "diafine6  running  203.0.113.7  dns=stale  i-a  https://diafine6.sp.example.com"
    );
    assert_eq!(
        lines[1],
        "wordpress  stopped  -  dns=current  i-b  https://wordpress.sp.example.com"
    );
}
