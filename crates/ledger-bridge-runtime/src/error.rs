// crates/ledger-bridge-runtime/src/error.rs
// ============================================================================
// Module: Runtime Errors
// Description: Error type surfaced by runtime construction and worker passes.
// Purpose: Unify store, config, schema, and task failures at the runtime edge.
// Dependencies: ledger-bridge-core, ledger-bridge-config, thiserror
// ============================================================================

//! Runtime error type.

use ledger_bridge_config::ConfigError;
use ledger_bridge_core::EventSourceError;
use ledger_bridge_core::SchemaRegistryError;
use ledger_bridge_core::StoreError;
use thiserror::Error;

/// Runtime failures.
///
/// # Invariants
/// - [`Self::is_transient`] is true only for failures a later poll may clear.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Event feed failed.
    #[error(transparent)]
    EventSource(#[from] EventSourceError),
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Built-in schemas failed to compile.
    #[error(transparent)]
    Schema(#[from] SchemaRegistryError),
    /// Audit sink could not be opened.
    #[error("audit sink error: {0}")]
    Audit(String),
    /// Blocking task panicked or was cancelled.
    #[error("runtime task failed: {0}")]
    Join(String),
}

impl RuntimeError {
    /// Returns true when retrying on the next poll may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::EventSource(EventSourceError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for RuntimeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}
