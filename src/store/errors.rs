//! # Store Errors

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id in the collection
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: Uuid },

    /// Uniqueness constraint violated (e.g. duplicate email)
    #[error("{0}")]
    Conflict(String),

    /// Collection file could not be read or written
    #[error("Storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Collection file exists but does not hold a valid document array
    #[error("Corrupt collection file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize {collection}: {source}")]
    Serialize {
        collection: &'static str,
        source: serde_json::Error,
    },

    #[error("Lock poisoned on {0}")]
    Poisoned(&'static str),
}

impl StoreError {
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::Conflict(_) => 409,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = StoreError::NotFound {
            collection: "jobs",
            id: Uuid::nil(),
        };
        assert_eq!(not_found.status_code(), 404);
        assert_eq!(StoreError::Conflict("dup".into()).status_code(), 409);
        assert_eq!(StoreError::Poisoned("jobs").status_code(), 500);
    }
}
