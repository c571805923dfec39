// crates/ledger-bridge-core/src/schema/mod.rs
// ============================================================================
// Module: Ledger Bridge Event Schema Registry
// Description: Versioned JSON Schema validation and typed decoding of event payloads.
// Purpose: Gate every ledger event before the projector trusts it.
// Dependencies: crate::core, jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Schemas are keyed by `(event_name, event_version)`. Validation is a pure
//! function: a JSON Schema (draft 2020-12) check followed by a typed decode
//! through a closed match on the payload shape. Unknown versions are permanent
//! failures and are never coerced onto a neighbouring version. Deprecated
//! versions validate and are flagged on the result so callers can log them.
//! Security posture: event payloads are untrusted until this module accepts
//! them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use jsonschema::Draft;
use jsonschema::Validator;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::AssetId;
use crate::core::AssetRegistered;
use crate::core::AssetRetired;
use crate::core::AssetTransferred;
use crate::core::EventName;
use crate::core::EventPayload;
use crate::core::ValidatedEvent;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A single reason an event payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// No schema is registered for the `(name, version)` pair.
    #[error("unknown event schema {name}@{version}")]
    UnknownSchema {
        /// Event name.
        name: String,
        /// Event version.
        version: String,
    },
    /// JSON Schema constraint failure.
    #[error("schema constraint: {0}")]
    Constraint(String),
    /// Payload passed the schema but failed typed decoding.
    #[error("payload decode failed: {0}")]
    Decode(String),
}

/// Registry construction errors.
#[derive(Debug, Error)]
pub enum SchemaRegistryError {
    /// A schema document failed to compile.
    #[error("invalid schema {name}@{version}: {message}")]
    Compile {
        /// Event name.
        name: String,
        /// Event version.
        version: String,
        /// Compiler message.
        message: String,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle status of a schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Current version.
    Active,
    /// Still accepted; producers should migrate.
    Deprecated,
}

/// Wire shape decoded for a schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadShape {
    /// `AssetRegistered` 1.0.
    RegisteredV1,
    /// `AssetRegistered` 2.0.
    RegisteredV2,
    /// `AssetTransferred` 1.0.
    TransferredV1,
    /// `AssetRetired` 1.0.
    RetiredV1,
}

/// `AssetRegistered` 1.0 wire payload.
#[derive(Deserialize)]
struct AssetRegisteredV1 {
    /// Asset identifier.
    asset_id: AssetId,
    /// Initial owner.
    owner: String,
    /// Asset value.
    value: u64,
}

/// `AssetRegistered` 2.0 wire payload.
#[derive(Deserialize)]
struct AssetRegisteredV2 {
    /// Asset identifier.
    asset_id: AssetId,
    /// Initial owner.
    owner: String,
    /// Asset value.
    value: u64,
    /// Optional metadata object.
    #[serde(default)]
    metadata: Option<Value>,
}

/// Compiled schema entry.
struct SchemaEntry {
    /// Lifecycle status.
    status: SchemaStatus,
    /// Decoder shape.
    shape: PayloadShape,
    /// Compiled validator.
    validator: Validator,
}

/// Registry of versioned event schemas.
///
/// # Invariants
/// - Every entry maps to exactly one [`PayloadShape`]; there is no dynamic dispatch.
pub struct SchemaRegistry {
    /// Entries keyed by `(event_name, event_version)`.
    entries: BTreeMap<(String, String), SchemaEntry>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

impl SchemaRegistry {
    /// Builds the registry of built-in asset event schemas.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRegistryError`] if a built-in schema fails to compile.
    pub fn builtin() -> Result<Self, SchemaRegistryError> {
        let mut registry = Self {
            entries: BTreeMap::new(),
        };
        registry.insert(
            EventName::AssetRegistered,
            "1.0",
            SchemaStatus::Deprecated,
            PayloadShape::RegisteredV1,
            &object_schema(
                &[
                    ("asset_id", non_empty_string()),
                    ("owner", non_empty_string()),
                    ("value", unsigned_integer()),
                ],
                &["asset_id", "owner", "value"],
            ),
        )?;
        registry.insert(
            EventName::AssetRegistered,
            "2.0",
            SchemaStatus::Active,
            PayloadShape::RegisteredV2,
            &object_schema(
                &[
                    ("asset_id", non_empty_string()),
                    ("owner", non_empty_string()),
                    ("value", unsigned_integer()),
                    ("metadata", json!({"type": "object"})),
                ],
                &["asset_id", "owner", "value"],
            ),
        )?;
        registry.insert(
            EventName::AssetTransferred,
            "1.0",
            SchemaStatus::Active,
            PayloadShape::TransferredV1,
            &object_schema(
                &[
                    ("asset_id", non_empty_string()),
                    ("from_owner", non_empty_string()),
                    ("to_owner", non_empty_string()),
                ],
                &["asset_id", "from_owner", "to_owner"],
            ),
        )?;
        registry.insert(
            EventName::AssetRetired,
            "1.0",
            SchemaStatus::Active,
            PayloadShape::RetiredV1,
            &object_schema(
                &[("asset_id", non_empty_string()), ("reason", non_empty_string())],
                &["asset_id", "reason"],
            ),
        )?;
        Ok(registry)
    }

    /// Returns the status of a schema version, if registered.
    #[must_use]
    pub fn status(&self, name: &str, version: &str) -> Option<SchemaStatus> {
        self.entries.get(&(name.to_string(), version.to_string())).map(|entry| entry.status)
    }

    /// Returns the registered `(name, version)` pairs in sorted order.
    #[must_use]
    pub fn versions(&self) -> Vec<(String, String)> {
        self.entries.keys().cloned().collect()
    }

    /// Validates and decodes an event payload.
    ///
    /// # Errors
    ///
    /// Returns every [`SchemaViolation`] found; an unknown version yields exactly one.
    pub fn validate(
        &self,
        name: &str,
        version: &str,
        payload: &Value,
    ) -> Result<ValidatedEvent, Vec<SchemaViolation>> {
        let Some(entry) = self.entries.get(&(name.to_string(), version.to_string())) else {
            return Err(vec![SchemaViolation::UnknownSchema {
                name: name.to_string(),
                version: version.to_string(),
            }]);
        };
        let violations: Vec<SchemaViolation> = entry
            .validator
            .iter_errors(payload)
            .map(|err| SchemaViolation::Constraint(err.to_string()))
            .collect();
        if !violations.is_empty() {
            return Err(violations);
        }
        let payload = decode(entry.shape, payload).map_err(|violation| vec![violation])?;
        Ok(ValidatedEvent {
            payload,
            deprecated: entry.status == SchemaStatus::Deprecated,
        })
    }

    /// Compiles and inserts a schema entry.
    fn insert(
        &mut self,
        name: EventName,
        version: &str,
        status: SchemaStatus,
        shape: PayloadShape,
        schema: &Value,
    ) -> Result<(), SchemaRegistryError> {
        let validator =
            jsonschema::options().with_draft(Draft::Draft202012).build(schema).map_err(|err| {
                SchemaRegistryError::Compile {
                    name: name.as_str().to_string(),
                    version: version.to_string(),
                    message: err.to_string(),
                }
            })?;
        self.entries.insert(
            (name.as_str().to_string(), version.to_string()),
            SchemaEntry {
                status,
                shape,
                validator,
            },
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a schema-valid payload into its typed form.
fn decode(shape: PayloadShape, payload: &Value) -> Result<EventPayload, SchemaViolation> {
    match shape {
        PayloadShape::RegisteredV1 => {
            let wire: AssetRegisteredV1 = decode_as(payload)?;
            Ok(EventPayload::AssetRegistered(AssetRegistered {
                asset_id: wire.asset_id,
                owner: wire.owner,
                value: wire.value,
                metadata: None,
            }))
        }
        PayloadShape::RegisteredV2 => {
            let wire: AssetRegisteredV2 = decode_as(payload)?;
            Ok(EventPayload::AssetRegistered(AssetRegistered {
                asset_id: wire.asset_id,
                owner: wire.owner,
                value: wire.value,
                metadata: wire.metadata,
            }))
        }
        PayloadShape::TransferredV1 => {
            decode_as::<AssetTransferred>(payload).map(EventPayload::AssetTransferred)
        }
        PayloadShape::RetiredV1 => decode_as::<AssetRetired>(payload).map(EventPayload::AssetRetired),
    }
}

/// Deserializes a payload, mapping failures to [`SchemaViolation::Decode`].
fn decode_as<T: DeserializeOwned>(payload: &Value) -> Result<T, SchemaViolation> {
    serde_json::from_value(payload.clone()).map_err(|err| SchemaViolation::Decode(err.to_string()))
}

/// Builds a closed object schema.
fn object_schema(properties: &[(&str, Value)], required: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> =
        properties.iter().map(|(name, schema)| ((*name).to_string(), schema.clone())).collect();
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Schema fragment for a non-empty string.
fn non_empty_string() -> Value {
    json!({"type": "string", "minLength": 1})
}

/// Schema fragment for a non-negative integer.
fn unsigned_integer() -> Value {
    json!({"type": "integer", "minimum": 0, "maximum": i64::MAX})
}
