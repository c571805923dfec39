// crates/ledger-bridge-runtime/src/audit.rs
// ============================================================================
// Module: Bridge Audit Logging
// Description: Structured audit events for command and event lifecycles.
// Purpose: Emit JSON-line diagnostics for every transition and failure.
// Dependencies: ledger-bridge-core, ledger-bridge-config, serde
// ============================================================================

//! ## Overview
//! Every command transition, projected event, dead letter, and halt is
//! emitted as one JSON line through an [`AuditSink`]. Events carry ids,
//! statuses, and positions only; command and event payloads are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use ledger_bridge_config::AuditConfig;
use ledger_bridge_config::AuditSinkKind;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::CommandId;
use ledger_bridge_core::CommandStatus;
use ledger_bridge_core::EventId;
use ledger_bridge_core::EventPosition;
use ledger_bridge_core::FailureClass;
use ledger_bridge_core::Timestamp;
use serde::Serialize;

use crate::error::RuntimeError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bridge audit event payload.
///
/// # Invariants
/// - `event` is one of the stable labels produced by the constructors below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Outbox command id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    /// Resulting command status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    /// Failed attempts recorded on the command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Projector channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Ledger event id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Ledger event position rendered as `(block,tx)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Failure class for dead letters and halts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<&'static str>,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BridgeAuditEvent {
    /// Creates an empty event with the given label.
    const fn base(event: &'static str, at: Timestamp) -> Self {
        Self {
            event,
            timestamp_ms: at.as_unix_millis(),
            command_id: None,
            status: None,
            attempts: None,
            channel: None,
            event_id: None,
            position: None,
            failure_class: None,
            detail: None,
        }
    }

    /// Command durably accepted into the outbox.
    #[must_use]
    pub fn command_enqueued(at: Timestamp, command_id: CommandId, created: bool) -> Self {
        Self {
            command_id: Some(command_id.to_string()),
            status: Some(CommandStatus::Pending.as_str()),
            detail: (!created).then(|| "duplicate request".to_string()),
            ..Self::base("command_enqueued", at)
        }
    }

    /// Command moved to a new status after a submission attempt.
    #[must_use]
    pub fn command_transition(
        at: Timestamp,
        command_id: CommandId,
        status: CommandStatus,
        attempts: u32,
        detail: Option<String>,
    ) -> Self {
        Self {
            command_id: Some(command_id.to_string()),
            status: Some(status.as_str()),
            attempts: Some(attempts),
            detail,
            ..Self::base("command_transition", at)
        }
    }

    /// Worker lost its lease before recording a result.
    #[must_use]
    pub fn lease_lost(at: Timestamp, command_id: CommandId) -> Self {
        Self {
            command_id: Some(command_id.to_string()),
            detail: Some("result dropped".to_string()),
            ..Self::base("lease_lost", at)
        }
    }

    /// Event applied to the read model.
    #[must_use]
    pub fn event_applied(
        at: Timestamp,
        channel: &ChannelName,
        event_id: EventId,
        position: EventPosition,
    ) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event_id: Some(event_id.to_string()),
            position: Some(position.to_string()),
            ..Self::base("event_applied", at)
        }
    }

    /// Event already reflected; nothing changed.
    #[must_use]
    pub fn event_duplicate(
        at: Timestamp,
        channel: &ChannelName,
        event_id: EventId,
        position: EventPosition,
    ) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event_id: Some(event_id.to_string()),
            position: Some(position.to_string()),
            ..Self::base("event_duplicate", at)
        }
    }

    /// Event recorded as a dead letter.
    #[must_use]
    pub fn event_dead_lettered(
        at: Timestamp,
        channel: &ChannelName,
        event_id: EventId,
        failure_class: FailureClass,
        reason: &str,
    ) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event_id: Some(event_id.to_string()),
            failure_class: Some(failure_class.as_str()),
            detail: Some(reason.to_string()),
            ..Self::base("event_dead_lettered", at)
        }
    }

    /// Event validated against a deprecated schema version.
    #[must_use]
    pub fn schema_deprecated(
        at: Timestamp,
        channel: &ChannelName,
        event_id: EventId,
        schema: String,
    ) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event_id: Some(event_id.to_string()),
            detail: Some(schema),
            ..Self::base("schema_deprecated", at)
        }
    }

    /// Projector channel stopped.
    #[must_use]
    pub fn projector_halted(
        at: Timestamp,
        channel: &ChannelName,
        event_id: Option<EventId>,
        reason: &str,
    ) -> Self {
        Self {
            channel: Some(channel.to_string()),
            event_id: event_id.map(|id| id.to_string()),
            detail: Some(reason.to_string()),
            ..Self::base("projector_halted", at)
        }
    }

    /// Worker pass failed and will be retried on the next poll.
    #[must_use]
    pub fn store_retry(at: Timestamp, worker: &str, error: &str) -> Self {
        Self {
            detail: Some(format!("{worker}: {error}")),
            ..Self::base("store_retry", at)
        }
    }

    /// Worker stopped on a permanent failure.
    #[must_use]
    pub fn worker_stopped(at: Timestamp, worker: &str, error: &str) -> Self {
        Self {
            detail: Some(format!("{worker}: {error}")),
            ..Self::base("worker_stopped", at)
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for bridge events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &BridgeAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &BridgeAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens a file-backed audit sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &BridgeAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &BridgeAuditEvent) {}
}

/// Builds the sink selected by configuration.
///
/// # Errors
///
/// Returns [`RuntimeError::Audit`] when a file sink cannot be opened.
pub fn sink_from_config(config: &AuditConfig) -> Result<Arc<dyn AuditSink>, RuntimeError> {
    match (config.sink, &config.path) {
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::File, Some(path)) => FileAuditSink::new(path)
            .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>)
            .map_err(|err| RuntimeError::Audit(err.to_string())),
        (AuditSinkKind::File, None) => {
            Err(RuntimeError::Audit("file audit sink requires a path".to_string()))
        }
    }
}
