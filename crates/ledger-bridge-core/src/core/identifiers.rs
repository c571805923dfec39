// crates/ledger-bridge-core/src/core/identifiers.rs
// ============================================================================
// Module: Ledger Bridge Identifiers
// Description: Canonical opaque identifiers for commands, events, and channels.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout Ledger Bridge. String
//! identifiers are opaque and serialize transparently. Command and event
//! identifiers are UUIDs; command identifiers are minted locally at enqueue,
//! event identifiers are minted by the ledger side and only parsed here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: String Identifiers
// ============================================================================

/// Declares an opaque string identifier with the canonical accessor set.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_identifier! {
    /// Tenant identifier supplied by the API layer.
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; emptiness is rejected at enqueue, not here.
    TenantId
}

string_identifier! {
    /// Name of the API service that enqueued a command.
    ///
    /// # Invariants
    /// - Opaque UTF-8 string; together with tenant and request id forms the
    ///   outbox uniqueness key.
    ServiceName
}

string_identifier! {
    /// Client-supplied idempotency key for a command request.
    ///
    /// # Invariants
    /// - Unique per `(tenant, service)`.
    RequestId
}

string_identifier! {
    /// Ledger channel name. Projection ordering is scoped to a channel.
    ChannelName
}

string_identifier! {
    /// Transaction identifier assigned by the ledger.
    LedgerTxId
}

string_identifier! {
    /// Identifier of a submitter worker instance holding command leases.
    WorkerId
}

string_identifier! {
    /// Asset identifier used by the asset commands and read models.
    AssetId
}

// ============================================================================
// SECTION: UUID Identifiers
// ============================================================================

/// Outbox command identifier.
///
/// # Invariants
/// - Generated once at enqueue and never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    /// Generates a fresh random command identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parses a command identifier from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns [`uuid::Error`] when the string is not a valid UUID.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value).map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Globally unique ledger event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a random event identifier (feeds and tests).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an event identifier from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns [`uuid::Error`] when the string is not a valid UUID.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value).map(Self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Dead-letter row identifier (store-assigned, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeadLetterId(i64);

impl DeadLetterId {
    /// Wraps a store-assigned row identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DeadLetterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
