//! Conflict resolution for duplicate keys within one side
//!
//! When a side already holds a row at the incoming row's canonical key, the
//! resolver merges the two payloads. The merged record is re-encoded against
//! the schema before it replaces the stored row; the row keeps its original
//! sort order.

use crate::errors::ExError;
use crate::schema::Record;

/// Merge policy for a second row arriving at an occupied key
///
/// Any `Fn(&Record, &Record) -> Result<Record, ExError>` is a resolver.
///
/// # Example
/// ```
/// use rowdelta_core::errors::ExError;
/// use rowdelta_core::resolver::ConflictResolver;
/// use rowdelta_core::schema::Record;
///
/// let keep_first = |_incoming: &Record, existing: &Record| -> Result<Record, ExError> {
///     Ok(existing.clone())
/// };
/// let merged = keep_first.merge(&Record::new(), &Record::new()).unwrap();
/// assert!(merged.is_empty());
/// ```
pub trait ConflictResolver {
    /// Produce the record to store from the incoming and existing payloads
    ///
    /// # Errors
    ///
    /// Any error aborts the insert; the stored row is left unchanged.
    fn merge(&self, incoming: &Record, existing: &Record) -> Result<Record, ExError>;
}

impl<F> ConflictResolver for F
where
    F: Fn(&Record, &Record) -> Result<Record, ExError>,
{
    fn merge(&self, incoming: &Record, existing: &Record) -> Result<Record, ExError> {
        self(incoming, existing)
    }
}

/// Incoming record replaces the existing one (same as no resolver)
#[derive(Debug, Clone, Copy, Default)]
pub struct Overwrite;

impl ConflictResolver for Overwrite {
    fn merge(&self, incoming: &Record, _existing: &Record) -> Result<Record, ExError> {
        Ok(incoming.clone())
    }
}

/// First row at a key wins
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepExisting;

impl ConflictResolver for KeepExisting {
    fn merge(&self, _incoming: &Record, existing: &Record) -> Result<Record, ExError> {
        Ok(existing.clone())
    }
}

/// Field-wise merge: non-null incoming values override, nulls keep the
/// existing value
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferNonNull;

impl ConflictResolver for PreferNonNull {
    fn merge(&self, incoming: &Record, existing: &Record) -> Result<Record, ExError> {
        let mut merged = existing.clone();
        for (name, value) in incoming {
            if !value.is_null() || !merged.contains_key(name) {
                merged.insert(name.clone(), value.clone());
            }
        }
        Ok(merged)
    }
}
