// crates/ledger-bridge-core/src/interfaces/mod.rs
// ============================================================================
// Module: Ledger Bridge Interfaces
// Description: Backend-agnostic contracts for storage, the ledger, and event feeds.
// Purpose: Define the seams between the workers and their collaborators.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! Storage contracts are synchronous and transactional; workers call them from
//! blocking tasks. Ledger and event-feed contracts are asynchronous because
//! they cross the network. Implementations must fail closed on missing or
//! invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AssetId;
use crate::core::AssetTransferRecord;
use crate::core::AssetView;
use crate::core::ChannelName;
use crate::core::ClaimRequest;
use crate::core::ClaimedCommand;
use crate::core::CommandId;
use crate::core::CommandLease;
use crate::core::CommandOutcome;
use crate::core::CommandValidationError;
use crate::core::ConsistencyViolation;
use crate::core::DeadLetterEntry;
use crate::core::DeadLetterId;
use crate::core::EnqueueOutcome;
use crate::core::EventId;
use crate::core::EventPayload;
use crate::core::EventPosition;
use crate::core::FailureClass;
use crate::core::IdempotencyKey;
use crate::core::LedgerCommand;
use crate::core::LedgerEvent;
use crate::core::LedgerTxId;
use crate::core::NewCommand;
use crate::core::NewDeadLetter;
use crate::core::OutboxCommand;
use crate::core::ProjectorCheckpoint;
use crate::core::RequestId;
use crate::core::ServiceName;
use crate::core::TenantId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Storage errors surfaced through the store interfaces.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Only [`Self::Busy`] is transient.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("store error: {0}")]
    Store(String),
    /// Store is locked or busy; the caller should retry.
    #[error("store busy: {0}")]
    Busy(String),
    /// Stored data failed integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or request.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Command payload failed validation at enqueue.
    #[error("command rejected: {0}")]
    Validation(#[from] CommandValidationError),
    /// Referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Caller no longer holds the lease on the command.
    #[error("lease lost for command {command_id}")]
    LeaseLost {
        /// Command whose lease was lost.
        command_id: CommandId,
    },
}

impl StoreError {
    /// Returns true when the operation may succeed if retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

// ============================================================================
// SECTION: Command Store
// ============================================================================

/// Durable outbox of ledger commands.
pub trait CommandStore: Send + Sync {
    /// Enqueues a command idempotently on `(tenant_id, service, request_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for invalid payloads or a storage error.
    fn enqueue(&self, request: NewCommand, now: Timestamp) -> Result<EnqueueOutcome, StoreError>;

    /// Atomically claims claimable commands and leases them to `request.owner`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the claim transaction fails.
    fn claim_pending(
        &self,
        request: &ClaimRequest,
        now: Timestamp,
    ) -> Result<Vec<ClaimedCommand>, StoreError>;

    /// Records a submission outcome for a leased command.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LeaseLost`] when the lease is no longer held.
    fn mark_result(
        &self,
        lease: &CommandLease,
        outcome: CommandOutcome,
        now: Timestamp,
    ) -> Result<OutboxCommand, StoreError>;

    /// Loads a command by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row cannot be read.
    fn get_command(&self, id: CommandId) -> Result<Option<OutboxCommand>, StoreError>;

    /// Loads a command by its request identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row cannot be read.
    fn find_by_request(
        &self,
        tenant_id: &TenantId,
        service: &ServiceName,
        request_id: &RequestId,
    ) -> Result<Option<OutboxCommand>, StoreError>;
}

// ============================================================================
// SECTION: Dead Letter Store
// ============================================================================

/// Durable record of permanent failures.
pub trait DeadLetterStore: Send + Sync {
    /// Records a dead letter outside any other unit of work.
    ///
    /// An event that already has an unresolved dead letter is not recorded
    /// twice; the existing id is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn record_dead_letter(
        &self,
        entry: NewDeadLetter,
        now: Timestamp,
    ) -> Result<DeadLetterId, StoreError>;

    /// Lists dead letters, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn list_dead_letters(
        &self,
        include_resolved: bool,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, StoreError>;

    /// Marks a dead letter resolved. Returns false if it was already resolved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the entry does not exist.
    fn resolve_dead_letter(&self, id: DeadLetterId, now: Timestamp) -> Result<bool, StoreError>;

    /// Counts unresolved dead letters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn unresolved_dead_letters(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Projection Store
// ============================================================================

/// Result of projecting a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Read models mutated and checkpoint advanced.
    Applied(ProjectorCheckpoint),
    /// Event dead-lettered and checkpoint advanced past it.
    Skipped(ProjectorCheckpoint),
    /// Event was already reflected; nothing changed.
    Duplicate,
}

/// Projection failures.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Storage failure; nothing was committed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Event contradicts projected state; nothing was committed.
    #[error("consistency violation: {0}")]
    Consistency(#[from] ConsistencyViolation),
}

/// Read-model store owned by the projector.
pub trait ProjectionStore: Send + Sync {
    /// Returns the checkpoint of a channel.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn checkpoint(&self, channel: &ChannelName) -> Result<Option<ProjectorCheckpoint>, StoreError>;

    /// Returns true if the event is already in the apply log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn is_event_recorded(&self, event_id: EventId) -> Result<bool, StoreError>;

    /// Applies a validated event and advances the checkpoint in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`]; on error nothing was committed.
    fn apply_event(
        &self,
        event: &LedgerEvent,
        payload: &EventPayload,
        now: Timestamp,
    ) -> Result<ApplyOutcome, ProjectionError>;

    /// Records a dead letter for an invalid event and advances the checkpoint past it
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`]; on error nothing was committed.
    fn skip_event(
        &self,
        event: &LedgerEvent,
        dead_letter: NewDeadLetter,
        now: Timestamp,
    ) -> Result<ApplyOutcome, ProjectionError>;

    /// Loads an asset view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn asset(
        &self,
        channel: &ChannelName,
        asset_id: &AssetId,
    ) -> Result<Option<AssetView>, StoreError>;

    /// Loads an asset's transfer history in position order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn asset_transfers(
        &self,
        channel: &ChannelName,
        asset_id: &AssetId,
    ) -> Result<Vec<AssetTransferRecord>, StoreError>;

    /// Verifies the store can serve queries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Ledger Adapter
// ============================================================================

/// Submission handed to the ledger adapter.
///
/// # Invariants
/// - `idempotency_key` is identical across every retry of the same command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSubmission {
    /// Outbox command id.
    pub command_id: CommandId,
    /// Typed command.
    pub command: LedgerCommand,
    /// Ledger-side deduplication key.
    pub idempotency_key: IdempotencyKey,
}

/// Ledger acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Ledger transaction id.
    pub ledger_tx_id: LedgerTxId,
}

/// Ledger adapter failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Timeout, network failure, or adapter-reported retry-safe failure.
    #[error("transient ledger failure: {0}")]
    Transient(String),
    /// Validation or business-rule rejection by the ledger.
    #[error("ledger rejected command: {0}")]
    Permanent(String),
}

impl LedgerError {
    /// Returns the failure class.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Transient(_) => FailureClass::TransientInfrastructure,
            Self::Permanent(_) => FailureClass::PermanentLedgerRejection,
        }
    }
}

/// Wrapper around the ledger SDK.
///
/// Implementations must deduplicate on `idempotency_key`: a retried submission
/// whose earlier attempt committed must return the original receipt.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Submits a command to the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] classified as transient or permanent.
    async fn submit(&self, submission: &LedgerSubmission) -> Result<LedgerReceipt, LedgerError>;

    /// Looks up a previously committed submission by idempotency key.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the lookup itself fails.
    async fn lookup(&self, _key: &IdempotencyKey) -> Result<Option<LedgerReceipt>, LedgerError> {
        Ok(None)
    }
}

// ============================================================================
// SECTION: Event Source
// ============================================================================

/// Event feed failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSourceError {
    /// Feed temporarily unavailable.
    #[error("event source unavailable: {0}")]
    Unavailable(String),
    /// Feed returned data that violates its contract.
    #[error("event source invalid: {0}")]
    Invalid(String),
}

/// Ordered, resumable per-channel event feed.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns up to `limit` events strictly after `after`, in position order.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError`] when the feed cannot be read.
    async fn fetch(
        &self,
        channel: &ChannelName,
        after: Option<EventPosition>,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, EventSourceError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time for workers.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
