// crates/ledger-bridge-config/src/lib.rs
// ============================================================================
// Module: Ledger Bridge Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for ledger-bridge.toml semantics.
// Dependencies: ledger-bridge-core, ledger-bridge-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `ledger-bridge-config` defines the configuration model for the submitter,
//! projector, health monitor, audit sink, and store. Validation is strict and
//! fails closed; every optional field has a documented fallback.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
