// crates/ledger-bridge-core/src/lib.rs
// ============================================================================
// Module: Ledger Bridge Core Library
// Description: Public API surface for the ledger bridge core.
// Purpose: Expose the data model, pure projection logic, and interfaces.
// Dependencies: crate::{core, interfaces, schema}
// ============================================================================

//! ## Overview
//! Ledger bridge core defines the transactional outbox model, the event
//! schema registry, and the pure read-model projection used to mirror ledger
//! state into a relational store. It performs no I/O; storage, the ledger
//! SDK, and the event feed plug in through [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ApplyOutcome;
pub use interfaces::Clock;
pub use interfaces::CommandStore;
pub use interfaces::DeadLetterStore;
pub use interfaces::EventSource;
pub use interfaces::EventSourceError;
pub use interfaces::LedgerAdapter;
pub use interfaces::LedgerError;
pub use interfaces::LedgerReceipt;
pub use interfaces::LedgerSubmission;
pub use interfaces::ProjectionError;
pub use interfaces::ProjectionStore;
pub use interfaces::StoreError;
pub use schema::SchemaRegistry;
pub use schema::SchemaRegistryError;
pub use schema::SchemaStatus;
pub use schema::SchemaViolation;
