//! Storage collaborator contract and the in-memory reference store.

use std::collections::{BTreeMap, HashMap};

use rowdelta_core_types::SideTag;

use crate::errors::ExError;
use crate::schema::Record;

/// One stored entry of a side
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub canonical_key: String,
    pub fingerprint: String,
    pub payload: Record,
    pub sort_order: u64,
}

/// A local row with the counterpart row at the same canonical key, if any
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub local: StoredRow,
    pub foreign: Option<StoredRow>,
}

/// Ordered keyed storage for the two sides of a pair
///
/// Implementations keep at most one row per `(side, canonical_key)`.
/// `scan_joined` pages are ordered by the local side's `sort_order`;
/// callers resume with the last `sort_order` they saw.
pub trait RowStore {
    /// Insert or replace the row at `(side, row.canonical_key)`
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` on storage failure.
    fn upsert(&mut self, side: SideTag, row: StoredRow) -> Result<(), ExError>;

    /// Point lookup by canonical key
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` on storage failure.
    fn get(&self, side: SideTag, canonical_key: &str) -> Result<Option<StoredRow>, ExError>;

    /// Allocate the next sort order for a side (strictly increasing)
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` on storage failure.
    fn allocate_sort_order(&mut self, side: SideTag) -> Result<u64, ExError>;

    /// Rows of `side` with `sort_order > after`, ascending, outer-joined
    /// to the counterpart side on canonical key
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` on storage failure.
    fn scan_joined(
        &self,
        side: SideTag,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<JoinedRow>, ExError>;

    /// Remove every row of `side`
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` on storage failure.
    fn clear(&mut self, side: SideTag) -> Result<(), ExError>;

    /// Number of rows of `side`
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` on storage failure.
    fn count(&self, side: SideTag) -> Result<usize, ExError>;
}

impl<S: RowStore + ?Sized> RowStore for Box<S> {
    fn upsert(&mut self, side: SideTag, row: StoredRow) -> Result<(), ExError> {
        (**self).upsert(side, row)
    }

    fn get(&self, side: SideTag, canonical_key: &str) -> Result<Option<StoredRow>, ExError> {
        (**self).get(side, canonical_key)
    }

    fn allocate_sort_order(&mut self, side: SideTag) -> Result<u64, ExError> {
        (**self).allocate_sort_order(side)
    }

    fn scan_joined(
        &self,
        side: SideTag,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<JoinedRow>, ExError> {
        (**self).scan_joined(side, after, limit)
    }

    fn clear(&mut self, side: SideTag) -> Result<(), ExError> {
        (**self).clear(side)
    }

    fn count(&self, side: SideTag) -> Result<usize, ExError> {
        (**self).count(side)
    }
}

#[derive(Debug, Clone, Default)]
struct SideRows {
    /// Canonical key to row
    rows: HashMap<String, StoredRow>,
    /// Sort order to canonical key
    order: BTreeMap<u64, String>,
    /// Next sort order; survives `clear`
    next_sort_order: u64,
}

impl SideRows {
    fn upsert(&mut self, row: StoredRow) {
        if let Some(previous) = self.rows.get(&row.canonical_key) {
            if previous.sort_order != row.sort_order {
                self.order.remove(&previous.sort_order);
            }
        }
        self.order.insert(row.sort_order, row.canonical_key.clone());
        self.rows.insert(row.canonical_key.clone(), row);
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.order.clear();
    }
}

/// In-memory store: hash index per side plus an ordered sort-order index
///
/// Not thread-safe; designed for single-writer use through `SidePair`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    a: SideRows,
    b: SideRows,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn side(&self, side: SideTag) -> &SideRows {
        match side {
            SideTag::A => &self.a,
            SideTag::B => &self.b,
        }
    }

    fn side_mut(&mut self, side: SideTag) -> &mut SideRows {
        match side {
            SideTag::A => &mut self.a,
            SideTag::B => &mut self.b,
        }
    }
}

impl RowStore for MemoryStore {
    fn upsert(&mut self, side: SideTag, row: StoredRow) -> Result<(), ExError> {
        self.side_mut(side).upsert(row);
        Ok(())
    }

    fn get(&self, side: SideTag, canonical_key: &str) -> Result<Option<StoredRow>, ExError> {
        Ok(self.side(side).rows.get(canonical_key).cloned())
    }

    fn allocate_sort_order(&mut self, side: SideTag) -> Result<u64, ExError> {
        let rows = self.side_mut(side);
        rows.next_sort_order += 1;
        Ok(rows.next_sort_order)
    }

    fn scan_joined(
        &self,
        side: SideTag,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<JoinedRow>, ExError> {
        let local = self.side(side);
        let foreign = self.side(side.counterpart());
        let start = after.map_or(0, |n| n.saturating_add(1));

        let page = local
            .order
            .range(start..)
            .filter_map(|(_, key)| local.rows.get(key))
            .take(limit)
            .map(|row| JoinedRow {
                local: row.clone(),
                foreign: foreign.rows.get(&row.canonical_key).cloned(),
            })
            .collect();
        Ok(page)
    }

    fn clear(&mut self, side: SideTag) -> Result<(), ExError> {
        self.side_mut(side).clear();
        Ok(())
    }

    fn count(&self, side: SideTag) -> Result<usize, ExError> {
        Ok(self.side(side).rows.len())
    }
}
