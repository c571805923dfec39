// crates/ledger-bridge-core/src/core/command.rs
// ============================================================================
// Module: Ledger Bridge Outbox Commands
// Description: Closed command variants, outbox rows, and submission outcomes.
// Purpose: Define the write-side data model shared by stores and workers.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Commands are a closed tagged variant ([`LedgerCommand`]) with one payload
//! shape per command type. An [`OutboxCommand`] is the durable row tracking a
//! command through `PENDING → SUBMITTING → {SUCCESS | PENDING | FAILED}`.
//! Payload validation happens once, at enqueue; invalid commands never reach
//! the outbox.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::IdempotencyKey;
use crate::core::identifiers::AssetId;
use crate::core::identifiers::CommandId;
use crate::core::identifiers::LedgerTxId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::ServiceName;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::WorkerId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of tenant, service, request, asset, and owner identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 256;
/// Maximum length of free-text reasons carried in command payloads.
pub const MAX_REASON_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Command payload validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; messages never embed full payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandValidationError {
    /// A required field was empty or whitespace.
    #[error("{0} must be non-empty")]
    Empty(&'static str),
    /// A field exceeded its length limit.
    #[error("{field} exceeds max length {max}")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// Semantic rule violation.
    #[error("invalid command: {0}")]
    Invalid(String),
    /// Command type label is not part of the closed set.
    #[error("unknown command type: {0}")]
    UnknownType(String),
    /// Payload did not decode into the command's shape.
    #[error("malformed payload: {0}")]
    Payload(String),
}

// ============================================================================
// SECTION: Command Variants
// ============================================================================

/// Registers a new asset on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterAsset {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Initial owner.
    pub owner: String,
    /// Asset value in minor units.
    pub value: u64,
}

/// Transfers an asset between owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferAsset {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Current owner expected by the caller.
    pub from_owner: String,
    /// New owner.
    pub to_owner: String,
}

/// Retires an asset permanently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetireAsset {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Operator-facing retirement reason.
    pub reason: String,
}

/// Closed set of commands accepted by the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command_type", content = "payload", rename_all = "snake_case")]
pub enum LedgerCommand {
    /// Register a new asset.
    RegisterAsset(RegisterAsset),
    /// Transfer an existing asset.
    TransferAsset(TransferAsset),
    /// Retire an existing asset.
    RetireAsset(RetireAsset),
}

/// Command type tag (the discriminant of [`LedgerCommand`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// [`LedgerCommand::RegisterAsset`].
    RegisterAsset,
    /// [`LedgerCommand::TransferAsset`].
    TransferAsset,
    /// [`LedgerCommand::RetireAsset`].
    RetireAsset,
}

impl CommandType {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegisterAsset => "register_asset",
            Self::TransferAsset => "transfer_asset",
            Self::RetireAsset => "retire_asset",
        }
    }

    /// Parses a wire label.
    ///
    /// # Errors
    ///
    /// Returns [`CommandValidationError::UnknownType`] for labels outside the closed set.
    pub fn parse(label: &str) -> Result<Self, CommandValidationError> {
        match label {
            "register_asset" => Ok(Self::RegisterAsset),
            "transfer_asset" => Ok(Self::TransferAsset),
            "retire_asset" => Ok(Self::RetireAsset),
            other => Err(CommandValidationError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerCommand {
    /// Returns the command type tag.
    #[must_use]
    pub const fn command_type(&self) -> CommandType {
        match self {
            Self::RegisterAsset(_) => CommandType::RegisterAsset,
            Self::TransferAsset(_) => CommandType::TransferAsset,
            Self::RetireAsset(_) => CommandType::RetireAsset,
        }
    }

    /// Validates the payload for the command type.
    ///
    /// # Errors
    ///
    /// Returns [`CommandValidationError`] when a field is empty, too long, or inconsistent.
    pub fn validate(&self) -> Result<(), CommandValidationError> {
        match self {
            Self::RegisterAsset(command) => {
                check_field("asset_id", command.asset_id.as_str(), MAX_IDENTIFIER_LENGTH)?;
                check_field("owner", &command.owner, MAX_IDENTIFIER_LENGTH)
            }
            Self::TransferAsset(command) => {
                check_field("asset_id", command.asset_id.as_str(), MAX_IDENTIFIER_LENGTH)?;
                check_field("from_owner", &command.from_owner, MAX_IDENTIFIER_LENGTH)?;
                check_field("to_owner", &command.to_owner, MAX_IDENTIFIER_LENGTH)?;
                if command.from_owner == command.to_owner {
                    return Err(CommandValidationError::Invalid(
                        "transfer requires distinct owners".to_string(),
                    ));
                }
                Ok(())
            }
            Self::RetireAsset(command) => {
                check_field("asset_id", command.asset_id.as_str(), MAX_IDENTIFIER_LENGTH)?;
                check_field("reason", &command.reason, MAX_REASON_LENGTH)
            }
        }
    }

    /// Serializes only the payload (without the type tag).
    ///
    /// # Errors
    ///
    /// Returns [`CommandValidationError::Payload`] if serialization fails.
    pub fn payload_json(&self) -> Result<Value, CommandValidationError> {
        let result = match self {
            Self::RegisterAsset(command) => serde_json::to_value(command),
            Self::TransferAsset(command) => serde_json::to_value(command),
            Self::RetireAsset(command) => serde_json::to_value(command),
        };
        result.map_err(|err| CommandValidationError::Payload(err.to_string()))
    }

    /// Rebuilds a command from its type tag and payload.
    ///
    /// # Errors
    ///
    /// Returns [`CommandValidationError::Payload`] when the payload does not match the type.
    pub fn from_parts(
        command_type: CommandType,
        payload: Value,
    ) -> Result<Self, CommandValidationError> {
        let decoded = match command_type {
            CommandType::RegisterAsset => serde_json::from_value(payload).map(Self::RegisterAsset),
            CommandType::TransferAsset => serde_json::from_value(payload).map(Self::TransferAsset),
            CommandType::RetireAsset => serde_json::from_value(payload).map(Self::RetireAsset),
        };
        decoded.map_err(|err| CommandValidationError::Payload(err.to_string()))
    }
}

/// Checks a required text field for emptiness and length.
fn check_field(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), CommandValidationError> {
    if value.trim().is_empty() {
        return Err(CommandValidationError::Empty(field));
    }
    if value.len() > max {
        return Err(CommandValidationError::TooLong {
            field,
            max,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Outbox Rows
// ============================================================================

/// Outbox command lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    /// Waiting to be claimed (initial state and retry state).
    Pending,
    /// Claimed by a worker under lease.
    Submitting,
    /// Confirmed by the ledger.
    Success,
    /// Permanently failed; a dead letter exists.
    Failed,
}

impl CommandStatus {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitting => "SUBMITTING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(Self::Pending),
            "SUBMITTING" => Some(Self::Submitting),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true for statuses that no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable outbox row.
///
/// # Invariants
/// - `(tenant_id, service, request_id)` is unique across the outbox.
/// - `attempts` counts failed submissions only.
/// - `ledger_tx_id` is set iff `status == Success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxCommand {
    /// Command identifier.
    pub id: CommandId,
    /// Tenant identifier.
    pub tenant_id: TenantId,
    /// Originating service.
    pub service: ServiceName,
    /// Client-supplied idempotency key.
    pub request_id: RequestId,
    /// Typed command.
    pub command: LedgerCommand,
    /// Lifecycle status.
    pub status: CommandStatus,
    /// Failed submission count.
    pub attempts: u32,
    /// Last failure reason, verbatim.
    pub last_error: Option<String>,
    /// Ledger transaction id after success.
    pub ledger_tx_id: Option<LedgerTxId>,
    /// Earliest time the command may be claimed again.
    pub next_attempt_at: Timestamp,
    /// Worker holding the current lease.
    pub lease_owner: Option<WorkerId>,
    /// Lease expiry for the current holder.
    pub lease_expires_at: Option<Timestamp>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

impl OutboxCommand {
    /// Returns the ledger idempotency key for this command.
    #[must_use]
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::derive(&self.tenant_id, &self.service, &self.request_id)
    }
}

/// Command intake request from the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommand {
    /// Tenant identifier.
    pub tenant_id: TenantId,
    /// Originating service.
    pub service: ServiceName,
    /// Client-supplied idempotency key.
    pub request_id: RequestId,
    /// Typed command.
    pub command: LedgerCommand,
}

impl NewCommand {
    /// Validates identity fields and the command payload.
    ///
    /// # Errors
    ///
    /// Returns [`CommandValidationError`] when any field is invalid.
    pub fn validate(&self) -> Result<(), CommandValidationError> {
        check_field("tenant_id", self.tenant_id.as_str(), MAX_IDENTIFIER_LENGTH)?;
        check_field("service", self.service.as_str(), MAX_IDENTIFIER_LENGTH)?;
        check_field("request_id", self.request_id.as_str(), MAX_IDENTIFIER_LENGTH)?;
        self.command.validate()
    }
}

/// Result of an idempotent enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// The stored command (new or pre-existing).
    pub command: OutboxCommand,
    /// False when an existing row was returned unchanged.
    pub created: bool,
}

// ============================================================================
// SECTION: Leases and Outcomes
// ============================================================================

/// Claim parameters for a worker poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Claiming worker.
    pub owner: WorkerId,
    /// Maximum rows to claim.
    pub limit: usize,
    /// Lease duration granted to each claimed row.
    pub lease_duration: Duration,
}

/// Fencing token for a claimed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLease {
    /// Leased command.
    pub command_id: CommandId,
    /// Lease holder.
    pub owner: WorkerId,
    /// Lease expiry.
    pub expires_at: Timestamp,
}

/// Command claimed for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedCommand {
    /// Command row as of the claim.
    pub command: OutboxCommand,
    /// Lease granted by the claim.
    pub lease: CommandLease,
}

/// Outcome of one submission attempt, as recorded by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Ledger confirmed the transaction.
    Succeeded {
        /// Ledger transaction id.
        ledger_tx_id: LedgerTxId,
    },
    /// Transient failure; retry after `next_attempt_at` unless attempts are exhausted.
    Retry {
        /// Failure reason.
        error: String,
        /// Earliest retry time.
        next_attempt_at: Timestamp,
        /// Attempt ceiling; reaching it fails the command.
        max_attempts: u32,
    },
    /// Permanent failure; never retried.
    Failed {
        /// Failure reason, preserved verbatim.
        error: String,
    },
}
