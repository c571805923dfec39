// crates/ledger-bridge-core/src/core/mod.rs
// ============================================================================
// Module: Ledger Bridge Core Types
// Description: Data model for the outbox, events, projections, and dead letters.
// Purpose: Group the backend-agnostic types shared by every crate.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! Core types are plain data plus pure functions. Nothing in this module
//! performs I/O or reads the clock.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backoff;
pub mod command;
pub mod dead_letter;
pub mod event;
pub mod hashing;
pub mod identifiers;
pub mod projection;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backoff::BackoffPolicy;
pub use command::ClaimRequest;
pub use command::ClaimedCommand;
pub use command::CommandLease;
pub use command::CommandOutcome;
pub use command::CommandStatus;
pub use command::CommandType;
pub use command::CommandValidationError;
pub use command::EnqueueOutcome;
pub use command::LedgerCommand;
pub use command::NewCommand;
pub use command::OutboxCommand;
pub use command::RegisterAsset;
pub use command::RetireAsset;
pub use command::TransferAsset;
pub use dead_letter::DeadLetterEntry;
pub use dead_letter::DeadLetterSource;
pub use dead_letter::FailureClass;
pub use dead_letter::NewDeadLetter;
pub use event::AssetRegistered;
pub use event::AssetRetired;
pub use event::AssetTransferred;
pub use event::EventName;
pub use event::EventPayload;
pub use event::EventPosition;
pub use event::LedgerEvent;
pub use event::ValidatedEvent;
pub use hashing::IdempotencyKey;
pub use identifiers::AssetId;
pub use identifiers::ChannelName;
pub use identifiers::CommandId;
pub use identifiers::DeadLetterId;
pub use identifiers::EventId;
pub use identifiers::LedgerTxId;
pub use identifiers::RequestId;
pub use identifiers::ServiceName;
pub use identifiers::TenantId;
pub use identifiers::WorkerId;
pub use projection::ApplyDisposition;
pub use projection::AssetStatus;
pub use projection::AssetTransferRecord;
pub use projection::AssetView;
pub use projection::ConsistencyViolation;
pub use projection::EventContext;
pub use projection::ProjectorCheckpoint;
pub use projection::ReadModelChange;
pub use projection::apply_event;
pub use time::Timestamp;
