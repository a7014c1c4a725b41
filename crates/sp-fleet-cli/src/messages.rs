// crates/sp-fleet-cli/src/messages.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and formatting utilities for the CLI.
// Purpose: Centralize user-facing strings for consistent CLI output.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! User-facing strings live in one static catalog keyed by dotted names. All
//! runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"error"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "sp-fleet {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.profile_failed", "Failed to select profile: {error}"),
    ("config.validate.ok", "Config valid (profile {profile}, {count} targets)."),
    ("audit.open_failed", "Failed to open audit sink: {error}"),
    ("aws.session_failed", "Failed to initialize AWS session: {error}"),
    (
        "dry_run.disclaimer",
        "Dry run: permissions are checked but no instance or DNS record is changed.",
    ),
    ("start.failed", "Failed to ready targets: {error}"),
    ("stop.failed", "Failed to stop targets: {error}"),
    ("reconcile.failed", "Failed to reconcile DNS records: {error}"),
    ("status.failed", "Failed to read fleet status: {error}"),
    ("status.serialize_failed", "Failed to serialize fleet status: {error}"),
    ("status.entry", "{name}  {state}  {address}  dns={dns}  {instance}  {url}"),
    ("status.address.none", "-"),
    ("status.dns.current", "current"),
    ("status.dns.stale", "stale"),
    ("session.begin.failed", "Failed to begin session: {error}"),
    ("session.begin.skipped", "Session start skipped; targets start on demand."),
    ("session.finish.failed", "Failed to finish session: {error}"),
    ("session.finish.skipped", "Session finish skipped; targets left running."),
    ("report.started", "started: {targets}"),
    ("report.stopped", "stopped: {targets}"),
    ("report.dns_updated", "dns updated: {targets}"),
    ("report.dns_skipped", "dns skipped (no address): {targets}"),
    ("report.verified", "verified: {targets}"),
    ("report.would_start", "would start (dry run): {targets}"),
    ("report.would_stop", "would stop (dry run): {targets}"),
    ("report.would_update_dns", "would update dns (dry run): {targets}"),
    ("report.verified_skipped", "verified: skipped (dry run)"),
    ("report.change", "change: {change_id}"),
    ("report.none", "none"),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Looks up `key` in the catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns true when the catalog defines `key`.
#[must_use]
pub fn has_message(key: &str) -> bool {
    catalog().contains_key(key)
}

/// Returns the static catalog used by the CLI.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::messages::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::messages::translate($key, args)
    }};
}
