use serde::Serialize;
use thiserror::Error;

use crate::types::EntityId;

#[derive(Error, Debug)]
pub enum RotationError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Participant '{id}' is not active")]
    Inactive { id: EntityId },

    #[error("Unknown award tier '{name}'")]
    UnknownTier { name: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Stable error classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Inactive,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound   => "not_found",
            Self::Inactive   => "inactive",
            Self::Conflict   => "conflict",
            Self::Internal   => "internal",
        }
    }
}

impl RotationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)                      => ErrorKind::Validation,
            Self::NotFound { .. } | Self::UnknownTier { .. } => ErrorKind::NotFound,
            Self::Inactive { .. }                    => ErrorKind::Inactive,
            Self::Conflict(_)                        => ErrorKind::Conflict,
            Self::Database(_) | Self::Serialization(_) | Self::Other(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn participant_not_found(id: &str) -> Self {
        Self::NotFound { entity: "Participant", id: id.to_string() }
    }
}

pub type RotationResult<T> = Result<T, RotationError>;
