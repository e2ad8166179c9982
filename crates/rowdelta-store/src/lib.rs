//! rowdelta Store - persistence for diff sides
//!
//! This crate provides:
//! - A SQLite row store implementing `rowdelta_core::RowStore`
//! - Embedded, checksummed schema migrations
//! - The YAML diff definition loader

#![allow(clippy::result_large_err)]

pub mod db;
pub mod definition;
pub mod errors;
pub mod migrations;
pub mod sqlite_store;

pub use definition::{
    parse_definition_file, parse_definition_str, Backend, DiffDefinition, FieldDecl,
    StorageConfig, Translations,
};
pub use sqlite_store::SqliteRowStore;

use errors::Result;
use rowdelta_core::{MemoryStore, RowStore};

/// Open the store a definition's storage section asks for
pub fn open_backend(config: &StorageConfig) -> Result<Box<dyn RowStore>> {
    let store: Box<dyn RowStore> = match (config.backend, &config.path) {
        (Backend::Memory, _) => Box::new(MemoryStore::default()),
        (Backend::Sqlite, Some(path)) => Box::new(SqliteRowStore::open(path)?),
        (Backend::Sqlite, None) => Box::new(SqliteRowStore::open_in_memory()?),
    };
    tracing::debug!(backend = ?config.backend, "backing store opened");
    Ok(store)
}
