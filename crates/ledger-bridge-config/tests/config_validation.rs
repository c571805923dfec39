//! Validation tests for ledger-bridge-config.
// crates/ledger-bridge-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Fail-closed rejection of inconsistent configuration.
// Purpose: Ensure invalid settings never reach the runtime.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use common::TestResult;
use common::assert_invalid;
use common::parse_with;
use ledger_bridge_config::ConfigError;
use ledger_bridge_config::LedgerBridgeConfig;

const PROJECTOR: &str = "[projector]\nchannels = [\"assets\"]\n";

#[test]
fn rejects_unknown_fields() -> TestResult {
    assert_invalid(parse_with(&format!("{PROJECTOR}surprise = 1\n")), "unknown field")
}

#[test]
fn rejects_missing_projector_section() -> TestResult {
    assert_invalid(parse_with(""), "projector")
}

#[test]
fn rejects_empty_channel_list() -> TestResult {
    assert_invalid(parse_with("[projector]\nchannels = []\n"), "at least one channel")
}

#[test]
fn rejects_duplicate_channels() -> TestResult {
    assert_invalid(
        parse_with("[projector]\nchannels = [\"assets\", \"assets\"]\n"),
        "duplicate channel",
    )
}

#[test]
fn rejects_blank_channel_name() -> TestResult {
    assert_invalid(parse_with("[projector]\nchannels = [\"  \"]\n"), "non-empty")
}

#[test]
fn rejects_zero_max_attempts() -> TestResult {
    assert_invalid(
        parse_with(&format!("{PROJECTOR}\n[submitter]\nmax_attempts = 0\n")),
        "max_attempts",
    )
}

#[test]
fn rejects_cap_below_base() -> TestResult {
    assert_invalid(
        parse_with(&format!(
            "{PROJECTOR}\n[submitter]\nbackoff_base_ms = 1000\nbackoff_cap_ms = 10\n"
        )),
        "backoff_cap_ms",
    )
}

#[test]
fn rejects_lease_not_exceeding_submit_timeout() -> TestResult {
    assert_invalid(
        parse_with(&format!(
            "{PROJECTOR}\n[submitter]\nlease_duration_ms = 5000\nsubmit_timeout_ms = 5000\n"
        )),
        "lease_duration_ms",
    )
}

#[test]
fn rejects_zero_batch_size() -> TestResult {
    assert_invalid(
        parse_with("[projector]\nchannels = [\"assets\"]\nbatch_size = 0\n"),
        "projector.batch_size",
    )
}

#[test]
fn rejects_zero_lag_threshold() -> TestResult {
    assert_invalid(
        parse_with(&format!("{PROJECTOR}\n[health]\nlag_threshold_ms = 0\n")),
        "lag_threshold_ms",
    )
}

#[test]
fn file_audit_sink_requires_path() -> TestResult {
    assert_invalid(
        parse_with(&format!("{PROJECTOR}\n[audit]\nsink = \"file\"\n")),
        "audit.path is required",
    )
}

#[test]
fn audit_path_without_file_sink_is_rejected() -> TestResult {
    assert_invalid(
        parse_with(&format!("{PROJECTOR}\n[audit]\nsink = \"none\"\npath = \"audit.log\"\n")),
        "only valid",
    )
}

#[test]
fn file_audit_sink_with_path_is_accepted() -> TestResult {
    parse_with(&format!("{PROJECTOR}\n[audit]\nsink = \"file\"\npath = \"audit.log\"\n"))
        .map(|_| ())
        .map_err(|err| err.to_string())
}

#[test]
fn rejects_unknown_poison_pill_policy() -> TestResult {
    assert_invalid(
        parse_with("[projector]\nchannels = [\"assets\"]\npoison_pill = \"ignore\"\n"),
        "unknown variant",
    )
}

#[test]
fn rejects_empty_store_path() -> TestResult {
    let result = LedgerBridgeConfig::from_toml(&format!("[store]\npath = \"\"\n\n{PROJECTOR}"));
    assert_invalid(result, "store.path")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let temp = tempfile::TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    std::fs::write(&path, padding).map_err(|err| err.to_string())?;
    assert_invalid(LedgerBridgeConfig::load(Some(&path)), "size limit")
}

#[test]
fn load_reports_missing_file_as_io() -> TestResult {
    let temp = tempfile::TempDir::new().map_err(|err| err.to_string())?;
    match LedgerBridgeConfig::load(Some(&temp.path().join("absent.toml"))) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let temp = tempfile::TempDir::new().map_err(|err| err.to_string())?;
    let path = temp.path().join("bad.toml");
    std::fs::write(&path, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    assert_invalid(LedgerBridgeConfig::load(Some(&path)), "utf-8")
}
