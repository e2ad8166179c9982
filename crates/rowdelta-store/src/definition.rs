//! Diff definition format v0
//!
//! A YAML document naming the schema of one diff, optional per-side
//! field translations and the storage backend.
//!
//! ```yaml
//! definition_version: 0
//! name: orders
//! key:
//!   - { name: id, type: integer }
//! value:
//!   - { name: total, type: money }
//! translations:
//!   a: { OrderId: id }
//! storage:
//!   backend: sqlite
//!   path: orders.db
//! ```

#![allow(clippy::result_large_err)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{definition_error, io_error, Result};
use rowdelta_core::errors::ExError;
use rowdelta_core::side::DEFAULT_PAGE_SIZE;
use rowdelta_core::{FieldTranslation, Schema};
use rowdelta_core_types::SideTag;
use serde::{Deserialize, Serialize};

/// Top-level definition document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffDefinition {
    /// Format version (must be 0)
    pub definition_version: u32,

    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,

    /// Key fields, in canonical key order
    pub key: Vec<FieldDecl>,

    /// Value fields, in fingerprint order
    pub value: Vec<FieldDecl>,

    #[serde(default)]
    pub translations: Translations,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,

    /// Type tag as written, resolved when the schema is built
    #[serde(rename = "type")]
    pub type_tag: String,
}

/// Incoming-name to schema-name maps, one per side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Translations {
    #[serde(default)]
    pub a: FieldTranslation,
    #[serde(default)]
    pub b: FieldTranslation,
}

impl Translations {
    pub fn for_side(&self, side: SideTag) -> &FieldTranslation {
        match side {
            SideTag::A => &self.a,
            SideTag::B => &self.b,
        }
    }
}

/// Backing store choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Sqlite,
}

/// Storage section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Database file for the sqlite backend; absent means an in-memory database
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Rows fetched per classification page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            path: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DiffDefinition {
    /// Build the schema the definition declares
    ///
    /// # Errors
    ///
    /// InvalidSchema for unknown type tags or duplicate names, EmptySchema
    /// when either field set is empty.
    pub fn schema(&self) -> Result<Schema> {
        let pairs = |decls: &[FieldDecl]| -> Vec<(String, String)> {
            decls
                .iter()
                .map(|d| (d.name.clone(), d.type_tag.clone()))
                .collect()
        };

        Schema::from_tags(&pairs(&self.key), &pairs(&self.value))
            .map_err(|e| ExError::from(e).with_op("definition_schema"))
    }
}

/// Parse a definition file from a path
pub fn parse_definition_file(path: &Path) -> Result<DiffDefinition> {
    let content = fs::read_to_string(path).map_err(|e| io_error("definition_read", e))?;
    parse_definition_str(&content)
}

/// Parse a definition from a string
pub fn parse_definition_str(content: &str) -> Result<DiffDefinition> {
    let definition: DiffDefinition = serde_yaml::from_str(content)
        .map_err(|e| definition_error(format!("YAML parse error: {}", e)))?;

    validate_definition(&definition)?;

    Ok(definition)
}

fn validate_definition(definition: &DiffDefinition) -> Result<()> {
    if definition.definition_version != 0 {
        return Err(definition_error(format!(
            "Unsupported definition_version: {}. Expected 0",
            definition.definition_version
        )));
    }

    let storage = &definition.storage;
    if storage.backend == Backend::Memory && storage.path.is_some() {
        return Err(definition_error(
            "storage.path is only valid with the sqlite backend",
        ));
    }
    if storage.page_size == 0 {
        return Err(definition_error("storage.page_size must be positive"));
    }

    // Surfaces schema errors at load time rather than at session open
    definition.schema()?;

    Ok(())
}
