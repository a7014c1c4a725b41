// crates/sp-fleet-cli/src/main.rs
// ============================================================================
// Module: SP Fleet CLI Entry Point
// Description: Command dispatcher for fleet readiness and teardown workflows.
// Purpose: Start, stop, reconcile, and inspect test targets from the shell.
// Dependencies: clap, sp-fleet-config, sp-fleet-core, sp-fleet-providers
// ============================================================================

//! ## Overview
//! The `sp-fleet` binary loads a profile from `sp-fleet.toml`, wires the AWS
//! providers into the readiness facade, and runs one operation. Every
//! mutating command accepts `--dry-run`; a dry run still exercises provider
//! permission checks but changes nothing. All user-facing strings are routed
//! through the message catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use sp_fleet_cli::t;
use sp_fleet_config::DEFAULT_PROFILE;
use sp_fleet_config::ProfileConfig;
use sp_fleet_config::SpFleetConfig;
use sp_fleet_config::config_toml_example;
use sp_fleet_core::Fleet;
use sp_fleet_core::LifecycleReport;
use sp_fleet_core::ReadinessReport;
use sp_fleet_core::ReconcileReport;
use sp_fleet_core::SystemClock;
use sp_fleet_core::TargetName;
use sp_fleet_core::TargetStatus;
use sp_fleet_providers::AwsSession;
use sp_fleet_providers::AwsSettings;
use sp_fleet_providers::Ec2Compute;
use sp_fleet_providers::Route53Zone;
use sp_fleet_providers::SystemResolver;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sp-fleet", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Config file path (defaults to `SP_FLEET_CONFIG`, then sp-fleet.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Profile to select from the config file.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_PROFILE, global = true)]
    profile: String,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start targets, align their DNS records, and wait for propagation.
    Start(TargetCommand),
    /// Stop targets.
    Stop(TargetCommand),
    /// Align DNS records with current addresses and wait for propagation.
    Reconcile(TargetCommand),
    /// Show each target's instance state and DNS alignment.
    Status(StatusCommand),
    /// Suite-level setup and teardown driven by the profile's session flags.
    Session {
        /// Selected session subcommand.
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments shared by target-scoped commands.
#[derive(Args, Debug)]
struct TargetCommand {
    /// Target to act on (repeatable; defaults depend on the command).
    #[arg(long = "target", value_name = "NAME")]
    targets: Vec<String>,
    /// Check permissions without changing anything.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

/// Arguments for the `status` command.
#[derive(Args, Debug)]
struct StatusCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = StatusFormat::Text)]
    format: StatusFormat,
}

/// Status output formats.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StatusFormat {
    /// One line per target.
    Text,
    /// Pretty-printed JSON array.
    Json,
}

/// Session subcommands.
#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Start every target up front unless the profile sets `skip_start`.
    Begin(SessionArgs),
    /// Stop every target unless the profile sets `skip_stop`.
    Finish(SessionArgs),
}

/// Arguments for session commands.
#[derive(Args, Debug)]
struct SessionArgs {
    /// Check permissions without changing anything.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the config file and selected profile.
    Validate,
    /// Print a complete example config.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Facade wired to the AWS providers and live resolution.
type AwsFleet = Fleet<Ec2Compute, Route53Zone, SystemResolver, SystemClock>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let selection = ProfileSelection {
        config: cli.config,
        profile: cli.profile,
    };
    match command {
        Commands::Start(command) => command_start(&selection, &command),
        Commands::Stop(command) => command_stop(&selection, &command),
        Commands::Reconcile(command) => command_reconcile(&selection, &command),
        Commands::Status(command) => command_status(&selection, &command),
        Commands::Session {
            command,
        } => command_session(&selection, &command),
        Commands::Config {
            command,
        } => command_config(&selection, &command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Profile Wiring
// ============================================================================

/// Config location and profile chosen on the command line.
struct ProfileSelection {
    /// Explicit config path.
    config: Option<PathBuf>,
    /// Profile name.
    profile: String,
}

impl ProfileSelection {
    /// Loads the config file and returns the selected profile.
    fn load(&self) -> CliResult<ProfileConfig> {
        let config = SpFleetConfig::load(self.config.as_deref())
            .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
        let profile = config
            .profile(&self.profile)
            .map_err(|err| CliError::new(t!("config.profile_failed", error = err)))?;
        Ok(profile.clone())
    }
}

/// Wires the readiness facade for a profile.
fn build_fleet(profile: &ProfileConfig, dry_run: bool) -> CliResult<AwsFleet> {
    let audit = profile
        .audit_sink()
        .map_err(|err| CliError::new(t!("audit.open_failed", error = err)))?;
    let settings = AwsSettings {
        region: profile.aws.region.clone(),
        endpoint: profile.aws.endpoint.clone(),
    };
    let session = AwsSession::load(&settings)
        .map_err(|err| CliError::new(t!("aws.session_failed", error = err)))?;
    let session = Arc::new(session);
    let fleet = Fleet::new(
        profile.catalog(),
        Ec2Compute::new(Arc::clone(&session)),
        Route53Zone::new(session),
        SystemResolver,
        SystemClock::new(),
        profile.fleet_options(dry_run),
        audit,
    );
    if fleet.is_dry_run() {
        write_stderr_line(&t!("dry_run.disclaimer"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(fleet)
}

/// Converts repeated `--target` values into target names.
fn target_set(targets: &[String]) -> BTreeSet<TargetName> {
    targets.iter().map(|name| TargetName::new(name.trim())).collect()
}

// ============================================================================
// SECTION: Target Commands
// ============================================================================

/// Executes the `start` command.
fn command_start(selection: &ProfileSelection, command: &TargetCommand) -> CliResult<ExitCode> {
    let profile = selection.load()?;
    let mut fleet = build_fleet(&profile, command.dry_run)?;
    let report = fleet
        .ensure_ready(&target_set(&command.targets))
        .map_err(|err| CliError::new(t!("start.failed", error = err)))?;
    write_lines(&readiness_lines(&report))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `stop` command.
fn command_stop(selection: &ProfileSelection, command: &TargetCommand) -> CliResult<ExitCode> {
    let profile = selection.load()?;
    let mut fleet = build_fleet(&profile, command.dry_run)?;
    let report = fleet
        .release(&target_set(&command.targets))
        .map_err(|err| CliError::new(t!("stop.failed", error = err)))?;
    write_lines(&lifecycle_lines(&report))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `reconcile` command.
fn command_reconcile(
    selection: &ProfileSelection,
    command: &TargetCommand,
) -> CliResult<ExitCode> {
    let profile = selection.load()?;
    let mut fleet = build_fleet(&profile, command.dry_run)?;
    let report = fleet
        .reconcile_records(&target_set(&command.targets))
        .map_err(|err| CliError::new(t!("reconcile.failed", error = err)))?;
    write_lines(&reconcile_lines(&report))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `status` command.
fn command_status(selection: &ProfileSelection, command: &StatusCommand) -> CliResult<ExitCode> {
    let profile = selection.load()?;
    let mut fleet = build_fleet(&profile, false)?;
    let statuses =
        fleet.status().map_err(|err| CliError::new(t!("status.failed", error = err)))?;
    match command.format {
        StatusFormat::Text => write_lines(&status_lines(&statuses))?,
        StatusFormat::Json => {
            let json = serde_json::to_string_pretty(&statuses)
                .map_err(|err| CliError::new(t!("status.serialize_failed", error = err)))?;
            write_stdout_line(&json).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Session Commands
// ============================================================================

/// Dispatches session subcommands.
fn command_session(selection: &ProfileSelection, command: &SessionCommand) -> CliResult<ExitCode> {
    let profile = selection.load()?;
    let policy = profile.session_policy();
    match command {
        SessionCommand::Begin(args) => {
            let mut fleet = build_fleet(&profile, args.dry_run)?;
            let report = fleet
                .begin_session(policy)
                .map_err(|err| CliError::new(t!("session.begin.failed", error = err)))?;
            match report {
                Some(report) => write_lines(&readiness_lines(&report))?,
                None => write_lines(&[t!("session.begin.skipped")])?,
            }
        }
        SessionCommand::Finish(args) => {
            let mut fleet = build_fleet(&profile, args.dry_run)?;
            let report = fleet
                .finish_session(policy)
                .map_err(|err| CliError::new(t!("session.finish.failed", error = err)))?;
            match report {
                Some(report) => write_lines(&lifecycle_lines(&report))?,
                None => write_lines(&[t!("session.finish.skipped")])?,
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(selection: &ProfileSelection, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            let profile = selection.load()?;
            write_stdout_line(&t!(
                "config.validate.ok",
                profile = selection.profile,
                count = profile.targets.len()
            ))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Joins target names, or the catalog's "none" for an empty set.
fn join_targets(targets: &BTreeSet<TargetName>) -> String {
    if targets.is_empty() {
        return t!("report.none");
    }
    targets.iter().map(TargetName::as_str).collect::<Vec<_>>().join(", ")
}

/// Renders a readiness report.
///
/// A dry run reports what would change and never claims verification.
fn readiness_lines(report: &ReadinessReport) -> Vec<String> {
    if report.dry_run {
        return vec![
            t!("report.would_start", targets = join_targets(&report.started)),
            t!("report.would_update_dns", targets = join_targets(&report.dns_updated)),
            t!("report.verified_skipped"),
        ];
    }
    vec![
        t!("report.started", targets = join_targets(&report.started)),
        t!("report.dns_updated", targets = join_targets(&report.dns_updated)),
        t!("report.verified", targets = join_targets(&report.verified)),
    ]
}

/// Renders a stop report.
fn lifecycle_lines(report: &LifecycleReport) -> Vec<String> {
    let targets = join_targets(&report.requested);
    if report.dry_run {
        vec![t!("report.would_stop", targets = targets)]
    } else {
        vec![t!("report.stopped", targets = targets)]
    }
}

/// Renders a reconcile report.
fn reconcile_lines(report: &ReconcileReport) -> Vec<String> {
    let updated = join_targets(&report.updated);
    let mut lines = if report.dry_run {
        vec![t!("report.would_update_dns", targets = updated)]
    } else {
        vec![t!("report.dns_updated", targets = updated)]
    };
    if !report.skipped.is_empty() {
        lines.push(t!("report.dns_skipped", targets = join_targets(&report.skipped)));
    }
    if let Some(change_id) = &report.change_id {
        lines.push(t!("report.change", change_id = change_id));
    }
    lines
}

/// Renders one line per target status.
fn status_lines(statuses: &[TargetStatus]) -> Vec<String> {
    statuses
        .iter()
        .map(|status| {
            let address = status
                .public_ip
                .map_or_else(|| t!("status.address.none"), |address| address.to_string());
            let dns =
                if status.dns_stale { t!("status.dns.stale") } else { t!("status.dns.current") };
            t!(
                "status.entry",
                name = status.name,
                state = status.state,
                address = address,
                dns = dns,
                instance = status.instance_id,
                url = status.url
            )
        })
        .collect()
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes each line to stdout.
fn write_lines(lines: &[String]) -> CliResult<()> {
    for line in lines {
        write_stdout_line(line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(())
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
