//! Error handling for rowdelta-store
//!
//! Wraps rowdelta-core ExError with store-specific helpers

use rowdelta_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::BackingStoreFailure)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already-applied migration
pub fn checksum_mismatch(migration_id: &str, recorded: &str, embedded: &str) -> ExError {
    ExError::new(ExErrorKind::BackingStoreFailure)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, recorded, embedded
        ))
}

/// Create a definition validation error
pub fn definition_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidDefinition)
        .with_op("definition_parse")
        .with_message(reason)
}

/// Create a stored-data error (row payload or counter that fails to decode)
pub fn corrupt_row(canonical_key: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::BackingStoreFailure)
        .with_op("sqlite_decode")
        .with_canonical_key(canonical_key)
        .with_message(format!("Stored row does not decode: {}", reason))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::BackingStoreFailure)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
