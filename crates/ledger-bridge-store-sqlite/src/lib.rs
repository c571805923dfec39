// crates/ledger-bridge-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Bridge Store
// Description: Durable outbox and projection backend using SQLite WAL.
// Purpose: Provide production-grade persistence for commands, dead letters,
//          checkpoints, and read models.
// Dependencies: ledger-bridge-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteLedgerStore`], a single `SQLite` database that
//! implements the command outbox, the dead-letter table, and the projection
//! tables. Claims and projections run under `BEGIN IMMEDIATE` so that several
//! processes may share one database file. Security posture: stored rows are
//! untrusted and are re-validated when decoded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteLedgerStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
