//! Error types for the record store and the archive layer.

use uuid::Uuid;

/// Errors that can occur in the record store or archive.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// The record kind ("agent", "step", ...).
        kind: &'static str,
        /// The missing record's ID.
        id: Uuid,
    },

    /// A record with the same ID already exists.
    #[error("duplicate {kind}: {id}")]
    Duplicate {
        /// The record kind.
        kind: &'static str,
        /// The duplicated ID.
        id: Uuid,
    },

    /// A `PostgreSQL` archive operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Shorthand for a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a duplicate error.
    pub fn duplicate(kind: &'static str, id: impl Into<Uuid>) -> Self {
        Self::Duplicate {
            kind,
            id: id.into(),
        }
    }
}
