//! Shared helpers for ledger-bridge-config integration tests.

#![allow(dead_code, reason = "Helpers are shared across test binaries.")]

use ledger_bridge_config::ConfigError;
use ledger_bridge_config::LedgerBridgeConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Minimal valid configuration.
pub const MINIMAL_TOML: &str = r#"
[store]
path = "bridge.db"

[projector]
channels = ["assets"]
"#;

/// Parses `sections` appended to the minimal store section.
pub fn parse_with(sections: &str) -> Result<LedgerBridgeConfig, ConfigError> {
    let content = format!("[store]\npath = \"bridge.db\"\n\n{sections}");
    LedgerBridgeConfig::from_toml(&content)
}

/// Asserts that `result` is an error whose message contains `needle`.
pub fn assert_invalid(result: Result<LedgerBridgeConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Ok(_) => Err(format!("expected error containing {needle:?}, got Ok")),
        Err(err) => {
            let message = err.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("expected error containing {needle:?}, got {message:?}"))
            }
        }
    }
}
