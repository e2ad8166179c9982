//! rowdelta Core - schema-driven row diffing between two dataset sides
//!
//! This crate provides the diff engine:
//! - Canonical per-field encoding into normalized values and fragments
//! - Key/value schemas compiled once into field encoders
//! - A linked pair of sides over an abstract ordered keyed store
//! - Conflict resolution for duplicate keys within a side
//! - Lazy classification into new, changed, unchanged and missing rows
//! - Field-level diffs and per-side summaries

pub mod classify;
pub mod diff_row;
pub mod encoder;
pub mod errors;
pub mod logging_facility;
pub mod resolver;
pub mod schema;
pub mod side;
pub mod store;
pub mod summary;

// Re-export commonly used types
pub use classify::{ChainedDiffRows, DiffRows};
pub use diff_row::{DiffRow, FieldChange, FieldDiff, RowChange};
pub use encoder::FieldType;
pub use errors::{DiffError, ExError, ExErrorKind, Result};
pub use resolver::{ConflictResolver, KeepExisting, Overwrite, PreferNonNull};
pub use schema::{EncodedRow, FieldSpec, Record, Schema};
pub use side::{AddOptions, AddOutcome, FieldTranslation, Side, SideMut, SidePair};
pub use store::{JoinedRow, MemoryStore, RowStore, StoredRow};
pub use summary::{render_human_summary, DiffSummary};
