// crates/sp-fleet-core/src/audit.rs
// ============================================================================
// Module: SP Fleet Audit Logging
// Description: Structured audit events for fleet lifecycle operations.
// Purpose: Emit JSON-line records of every provider request, wait, and skip.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every fleet component reports what it asked the providers to do through a
//! [`FleetAuditSink`]. Events serialize as one JSON object per line so they
//! can be routed to stderr, an append-only file, or collected in memory by
//! tests. Sinks never fail the operation that emits an event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome classification for an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The request or wait was issued.
    Requested,
    /// The step completed successfully.
    Completed,
    /// The step had nothing to do.
    Skipped,
    /// The step failed.
    Failed,
}

/// Fleet audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct FleetAuditEvent {
    /// Event identifier (for example `instances_start`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Target names the event concerns.
    pub targets: Vec<String>,
    /// Whether the step ran in dry-run mode.
    pub dry_run: bool,
    /// Outcome classification.
    pub outcome: AuditOutcome,
    /// Optional free-form detail.
    pub detail: Option<String>,
}

impl FleetAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new<I, S>(event: &'static str, targets: I, dry_run: bool, outcome: AuditOutcome) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            targets: targets.into_iter().map(|target| target.to_string()).collect(),
            dry_run,
            outcome,
            detail: None,
        }
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for fleet events.
pub trait FleetAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &FleetAuditEvent);
}

/// Shared audit sink handle used by fleet components.
pub type SharedAuditSink = Arc<dyn FleetAuditSink>;

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl FleetAuditSink for StderrAuditSink {
    fn record(&self, event: &FleetAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl FleetAuditSink for FileAuditSink {
    fn record(&self, event: &FleetAuditEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl FleetAuditSink for NoopAuditSink {
    fn record(&self, _event: &FleetAuditEvent) {}
}

/// In-memory audit sink for tests and embedding callers.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<FleetAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<FleetAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the identifiers of recorded events in order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().into_iter().map(|event| event.event).collect()
    }
}

impl FleetAuditSink for MemoryAuditSink {
    fn record(&self, event: &FleetAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
