// crates/ledger-bridge-core/tests/schema_registry.rs
// ============================================================================
// Module: Event Schema Registry Tests
// Description: Versioned validation, deprecation, and unknown-version handling.
// Purpose: Ensure only well-formed, known event versions reach the projector.
// ============================================================================

//! Schema registry behavior tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use ledger_bridge_core::AssetId;
use ledger_bridge_core::EventPayload;
use ledger_bridge_core::SchemaRegistry;
use ledger_bridge_core::SchemaStatus;
use ledger_bridge_core::SchemaViolation;
use serde_json::json;

fn registry() -> SchemaRegistry {
    SchemaRegistry::builtin().expect("builtin schemas compile")
}

#[test]
fn registered_v2_decodes_with_metadata() {
    let validated = registry()
        .validate(
            "AssetRegistered",
            "2.0",
            &json!({"asset_id": "a-1", "owner": "alice", "value": 10, "metadata": {"k": "v"}}),
        )
        .unwrap();
    assert!(!validated.deprecated);
    let EventPayload::AssetRegistered(event) = validated.payload else {
        panic!("expected AssetRegistered");
    };
    assert_eq!(event.asset_id, AssetId::new("a-1"));
    assert_eq!(event.metadata, Some(json!({"k": "v"})));
}

#[test]
fn registered_v1_is_accepted_but_flagged_deprecated() {
    let registry = registry();
    assert_eq!(registry.status("AssetRegistered", "1.0"), Some(SchemaStatus::Deprecated));
    let validated = registry
        .validate("AssetRegistered", "1.0", &json!({"asset_id": "a-1", "owner": "alice", "value": 3}))
        .unwrap();
    assert!(validated.deprecated);
    let EventPayload::AssetRegistered(event) = validated.payload else {
        panic!("expected AssetRegistered");
    };
    assert_eq!(event.metadata, None);
}

#[test]
fn registered_v1_rejects_v2_only_fields() {
    let errors = registry()
        .validate(
            "AssetRegistered",
            "1.0",
            &json!({"asset_id": "a-1", "owner": "alice", "value": 3, "metadata": {}}),
        )
        .unwrap_err();
    assert!(errors.iter().all(|err| matches!(err, SchemaViolation::Constraint(_))));
}

#[test]
fn unknown_version_is_a_single_violation() {
    let errors = registry()
        .validate("AssetTransferred", "9.9", &json!({"asset_id": "a-1"}))
        .unwrap_err();
    assert_eq!(
        errors,
        vec![SchemaViolation::UnknownSchema {
            name: "AssetTransferred".to_string(),
            version: "9.9".to_string(),
        }]
    );
}

#[test]
fn unknown_event_name_is_rejected() {
    let errors = registry().validate("AssetMinted", "1.0", &json!({})).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], SchemaViolation::UnknownSchema { .. }));
}

#[test]
fn missing_required_fields_report_every_violation() {
    let errors = registry().validate("AssetTransferred", "1.0", &json!({"asset_id": ""})).unwrap_err();
    assert!(errors.len() >= 2, "expected several violations, got {errors:?}");
}

#[test]
fn negative_value_is_rejected() {
    let errors = registry()
        .validate("AssetRegistered", "2.0", &json!({"asset_id": "a", "owner": "o", "value": -1}))
        .unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn value_above_storable_range_is_rejected() {
    let registry = registry();
    let too_large = json!({"asset_id": "a", "owner": "o", "value": 9_223_372_036_854_775_808_u64});
    let errors = registry.validate("AssetRegistered", "2.0", &too_large).unwrap_err();
    assert!(matches!(errors[0], SchemaViolation::Constraint(_)), "got {errors:?}");

    let at_limit = json!({"asset_id": "a", "owner": "o", "value": i64::MAX});
    assert!(registry.validate("AssetRegistered", "2.0", &at_limit).is_ok());
}

#[test]
fn retired_decodes() {
    let validated = registry()
        .validate("AssetRetired", "1.0", &json!({"asset_id": "a-9", "reason": "burned"}))
        .unwrap();
    assert_eq!(validated.payload.asset_id(), &AssetId::new("a-9"));
}

#[test]
fn versions_are_listed_in_order() {
    let versions = registry().versions();
    assert_eq!(
        versions,
        vec![
            ("AssetRegistered".to_string(), "1.0".to_string()),
            ("AssetRegistered".to_string(), "2.0".to_string()),
            ("AssetRetired".to_string(), "1.0".to_string()),
            ("AssetTransferred".to_string(), "1.0".to_string()),
        ]
    );
}
