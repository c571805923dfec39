// crates/ledger-bridge-core/src/core/dead_letter.rs
// ============================================================================
// Module: Ledger Bridge Dead Letters
// Description: Permanent-failure records and the failure class taxonomy.
// Purpose: Preserve every dropped command or event for operator triage.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`DeadLetterEntry`] is written whenever a command or event fails
//! permanently. Entries are never retried automatically; operators inspect and
//! resolve them, and replay happens outside the core.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::DeadLetterId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Failure Classes
// ============================================================================

/// Failure taxonomy shared by the submitter and projector.
///
/// # Invariants
/// - Only [`Self::TransientInfrastructure`] is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Malformed command or event payload.
    Validation,
    /// Timeout or connectivity failure.
    TransientInfrastructure,
    /// Business-rule rejection reported by the ledger.
    PermanentLedgerRejection,
    /// Event contradicts projected state or checkpoint.
    ConsistencyViolation,
}

impl FailureClass {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::TransientInfrastructure => "transient_infrastructure",
            Self::PermanentLedgerRejection => "permanent_ledger_rejection",
            Self::ConsistencyViolation => "consistency_violation",
        }
    }

    /// Parses a stable label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "validation" => Some(Self::Validation),
            "transient_infrastructure" => Some(Self::TransientInfrastructure),
            "permanent_ledger_rejection" => Some(Self::PermanentLedgerRejection),
            "consistency_violation" => Some(Self::ConsistencyViolation),
            _ => None,
        }
    }

    /// Returns true when the failure may be retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientInfrastructure)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Dead Letters
// ============================================================================

/// Kind of unit that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadLetterSource {
    /// Outbox command.
    Command,
    /// Ledger event.
    Event,
}

impl DeadLetterSource {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Event => "EVENT",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "COMMAND" => Some(Self::Command),
            "EVENT" => Some(Self::Event),
            _ => None,
        }
    }
}

/// Dead letter to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeadLetter {
    /// Kind of failed unit.
    pub source_type: DeadLetterSource,
    /// Command id or event id, as text.
    pub source_id: String,
    /// Failure class.
    pub failure_class: FailureClass,
    /// Failure reason, verbatim.
    pub reason: String,
    /// Snapshot of the failed payload.
    pub payload_snapshot: Value,
}

/// Stored dead letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// Row identifier.
    pub id: DeadLetterId,
    /// Kind of failed unit.
    pub source_type: DeadLetterSource,
    /// Command id or event id, as text.
    pub source_id: String,
    /// Failure class.
    pub failure_class: FailureClass,
    /// Failure reason, verbatim.
    pub reason: String,
    /// Snapshot of the failed payload.
    pub payload_snapshot: Value,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time an operator marked the entry resolved.
    pub resolved_at: Option<Timestamp>,
}
