// crates/ledger-bridge-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration for ledger-bridge.toml.
// Purpose: Give operators a valid starting point that tracks the model.
// Dependencies: none
// ============================================================================

//! Canonical `ledger-bridge.toml` example.

/// Returns a complete, valid `ledger-bridge.toml` example.
#[must_use]
pub fn config_toml_example() -> String {
    r#"# ledger-bridge.toml

[store]
path = "ledger-bridge.db"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"

[submitter]
# worker_id = "submitter-1"
poll_interval_ms = 1000
batch_size = 16
lease_duration_ms = 30000
submit_timeout_ms = 10000
max_attempts = 5
backoff_base_ms = 500
backoff_cap_ms = 60000
reconcile_before_retry = false

[projector]
channels = ["assets"]
poll_interval_ms = 1000
batch_size = 100
poison_pill = "halt"

[health]
lag_threshold_ms = 30000
dead_letter_ceiling = 100

[audit]
sink = "stderr"
"#
    .to_string()
}
