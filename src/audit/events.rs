//! Audit event types and emission functions.

use crate::core::{ScanResult, ScanStrategy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Timestamp of the result.
    pub timestamp: DateTime<Utc>,

    /// Correlation ID shared with the matching `scan_started` event.
    pub scan_id: String,

    /// Transport strategy used.
    pub strategy: ScanStrategy,

    /// File path or name that was scanned.
    pub file: String,

    /// `clean`, `infected` or `error`.
    pub outcome: String,

    /// Summed malware count, when a verdict was reached.
    pub malware_count: Option<u64>,

    /// Failure message, if any.
    pub error: Option<String>,
}

impl ScanAuditEvent {
    /// Builds the event for `result`.
    pub fn from_result(
        scan_id: &str,
        strategy: ScanStrategy,
        file: &str,
        result: &ScanResult,
    ) -> Self {
        Self {
            timestamp: result.timestamp(),
            scan_id: scan_id.to_string(),
            strategy,
            file: file.to_string(),
            outcome: outcome_label(result).to_string(),
            malware_count: result.malware_count(),
            error: result.error().map(str::to_string),
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// `clean`, `infected` or `error` for a result.
pub fn outcome_label(result: &ScanResult) -> &'static str {
    if result.error().is_some() {
        "error"
    } else if result.is_clean() {
        "clean"
    } else {
        "infected"
    }
}

/// Emits an audit event for a session acquiring its handle.
pub fn emit_session_opened(region: &str, endpoint: &str, tls: bool) {
    tracing::info!(
        target: "blobscan::audit",
        event_type = "session_opened",
        region = %region,
        endpoint = %endpoint,
        tls = tls,
        "Scanner session opened"
    );
}

/// Emits an audit event for a session releasing its handle.
pub fn emit_session_closed(region: &str, clean_release: bool) {
    tracing::info!(
        target: "blobscan::audit",
        event_type = "session_closed",
        region = %region,
        clean_release = clean_release,
        "Scanner session closed"
    );
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(scan_id: &str, strategy: ScanStrategy, file: &str) {
    tracing::info!(
        target: "blobscan::audit",
        event_type = "scan_started",
        scan_id = %scan_id,
        strategy = %strategy,
        file = %file,
        "Scan started"
    );
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(event: &ScanAuditEvent) {
    tracing::info!(
        target: "blobscan::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        strategy = %event.strategy,
        file = %event.file,
        outcome = %event.outcome,
        malware_count = ?event.malware_count,
        error = ?event.error,
        timestamp = %event.timestamp,
        "Scan completed"
    );
}
