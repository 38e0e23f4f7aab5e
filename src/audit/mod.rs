//! Structured audit logging.
//!
//! Events are emitted through `tracing` under the `blobscan::audit`
//! target, so any subscriber (JSON file, OpenTelemetry, etc.) can capture
//! them. Nothing here installs a subscriber.

mod events;

pub use events::{
    emit_scan_completed, emit_scan_started, emit_session_closed, emit_session_opened,
    outcome_label, AuditEvent, ScanAuditEvent,
};
