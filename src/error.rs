//! Error types for the scheduling core.
//!
//! Adapters report their own failures (`StoreError`, `CodecError`); the
//! `Center` maps every one of them to a `CenterError` before returning, so
//! callers only ever see the domain kinds below.

use std::fmt;
use thiserror::Error;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Appointment,
    Person,
    Specialty,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Appointment => "appointment",
            EntityKind::Person => "person",
            EntityKind::Specialty => "specialty",
        };
        f.write_str(label)
    }
}

/// Errors raised at the public boundary of the `Center`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CenterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: EntityKind, key: String },

    #[error("search failed: {0}")]
    SearchFailed(String),

    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl CenterError {
    pub fn appointment_not_found(key: impl fmt::Display) -> Self {
        CenterError::NotFound {
            entity: EntityKind::Appointment,
            key: key.to_string(),
        }
    }

    pub fn person_not_found(key: impl fmt::Display) -> Self {
        CenterError::NotFound {
            entity: EntityKind::Person,
            key: key.to_string(),
        }
    }

    pub fn appointment_already_exists(key: impl fmt::Display) -> Self {
        CenterError::AlreadyExists {
            entity: EntityKind::Appointment,
            key: key.to_string(),
        }
    }

    pub fn person_already_exists(key: impl fmt::Display) -> Self {
        CenterError::AlreadyExists {
            entity: EntityKind::Person,
            key: key.to_string(),
        }
    }

    /// True for `NotFound` errors about the given entity kind.
    pub fn is_not_found(&self, kind: EntityKind) -> bool {
        matches!(self, CenterError::NotFound { entity, .. } if *entity == kind)
    }

    /// True for `AlreadyExists` errors about the given entity kind.
    pub fn is_already_exists(&self, kind: EntityKind) -> bool {
        matches!(self, CenterError::AlreadyExists { entity, .. } if *entity == kind)
    }
}

pub type CenterResult<T> = Result<T, CenterError>;

/// Failures reported by a persistence adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("corrupted record: {0}")]
    Corrupted(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by the document codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("could not encode {shape}: {message}")]
    Encode { shape: &'static str, message: String },

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("file does not contain the expected type: {expected} (found {found})")]
    ShapeMismatch { expected: &'static str, found: String },
}
