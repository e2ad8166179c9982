//! Lazy classification streams over a side pair.
//!
//! Each stream walks one side in ascending sort order, a page at a time,
//! joined on canonical key to the counterpart side. Pages are separate
//! store calls resumed from the last sort order seen, so no store handle
//! outlives a page and a dropped stream releases nothing.

use std::collections::VecDeque;
use std::sync::Arc;

use rowdelta_core_types::SideTag;

use crate::diff_row::{DiffRow, RowChange};
use crate::errors::ExError;
use crate::schema::Schema;
use crate::store::{JoinedRow, RowStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    New,
    Changed,
    Unchanged,
    NewOrChanged,
    /// Every local row, classified
    Present,
    /// Scans the counterpart side for keys the local side lacks
    Missing,
}

impl Filter {
    fn classify(self, joined: JoinedRow, schema: &Arc<Schema>) -> Option<DiffRow> {
        let JoinedRow { local, foreign } = joined;

        if self == Filter::Missing {
            return match foreign {
                None => Some(DiffRow::new(
                    RowChange::Missing,
                    local.canonical_key,
                    None,
                    Some(local.payload),
                    schema.clone(),
                )),
                Some(_) => None,
            };
        }

        let kind = match &foreign {
            None => RowChange::New,
            Some(f) if f.fingerprint != local.fingerprint => RowChange::Changed,
            Some(_) => RowChange::Unchanged,
        };
        let wanted = match self {
            Filter::New => kind == RowChange::New,
            Filter::Changed => kind == RowChange::Changed,
            Filter::Unchanged => kind == RowChange::Unchanged,
            Filter::NewOrChanged => kind != RowChange::Unchanged,
            Filter::Present => true,
            Filter::Missing => false,
        };
        wanted.then(|| {
            DiffRow::new(
                kind,
                local.canonical_key,
                Some(local.payload),
                foreign.map(|f| f.payload),
                schema.clone(),
            )
        })
    }
}

/// Lazy, ordered stream of classified rows
///
/// Yields `Err` once on a store failure, then ends.
pub struct DiffRows<'a, S: RowStore + ?Sized> {
    store: &'a S,
    schema: Arc<Schema>,
    local: SideTag,
    scan_side: SideTag,
    filter: Filter,
    page_size: usize,
    remaining: Option<usize>,
    after: Option<u64>,
    buffer: VecDeque<JoinedRow>,
    exhausted: bool,
}

impl<'a, S: RowStore + ?Sized> DiffRows<'a, S> {
    fn with_filter(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        filter: Filter,
        page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        let scan_side = match filter {
            Filter::Missing => local.counterpart(),
            _ => local,
        };
        Self {
            store,
            schema,
            local,
            scan_side,
            filter,
            page_size: page_size.max(1),
            remaining: limit,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub(crate) fn new_rows(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        Self::with_filter(store, schema, local, Filter::New, page_size, limit)
    }

    pub(crate) fn changed(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        Self::with_filter(store, schema, local, Filter::Changed, page_size, limit)
    }

    pub(crate) fn unchanged(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        Self::with_filter(store, schema, local, Filter::Unchanged, page_size, limit)
    }

    pub(crate) fn new_or_changed(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        Self::with_filter(store, schema, local, Filter::NewOrChanged, page_size, limit)
    }

    pub(crate) fn present(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        page_size: usize,
    ) -> Self {
        Self::with_filter(store, schema, local, Filter::Present, page_size, None)
    }

    pub(crate) fn missing(
        store: &'a S,
        schema: Arc<Schema>,
        local: SideTag,
        page_size: usize,
        limit: Option<usize>,
    ) -> Self {
        Self::with_filter(store, schema, local, Filter::Missing, page_size, limit)
    }

    /// The side results are reported for
    pub fn local_side(&self) -> SideTag {
        self.local
    }

    fn fetch_page(&mut self) -> Result<(), ExError> {
        let page = self
            .store
            .scan_joined(self.scan_side, self.after, self.page_size)
            .map_err(|e| e.with_side(self.local))?;

        tracing::debug!(
            side = %self.scan_side,
            page_len = page.len(),
            after = ?self.after,
            "fetched joined page"
        );

        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.after = Some(last.local.sort_order);
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl<S: RowStore + ?Sized> Iterator for DiffRows<'_, S> {
    type Item = Result<DiffRow, ExError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }

            if let Some(joined) = self.buffer.pop_front() {
                if let Some(row) = self.filter.classify(joined, &self.schema) {
                    if let Some(n) = self.remaining.as_mut() {
                        *n -= 1;
                    }
                    return Some(Ok(row));
                }
                continue;
            }

            if self.exhausted {
                return None;
            }

            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                self.remaining = Some(0);
                return Some(Err(e));
            }
        }
    }
}

impl<S: RowStore + ?Sized> std::iter::FusedIterator for DiffRows<'_, S> {}

/// Two streams run back to back: the second starts its own ordering once
/// the first is exhausted
///
/// A failure in the first stream ends the whole sequence.
pub struct ChainedDiffRows<'a, S: RowStore + ?Sized> {
    first: DiffRows<'a, S>,
    second: DiffRows<'a, S>,
    failed: bool,
}

impl<'a, S: RowStore + ?Sized> ChainedDiffRows<'a, S> {
    pub(crate) fn new(first: DiffRows<'a, S>, second: DiffRows<'a, S>) -> Self {
        Self {
            first,
            second,
            failed: false,
        }
    }
}

impl<S: RowStore + ?Sized> Iterator for ChainedDiffRows<'_, S> {
    type Item = Result<DiffRow, ExError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match self.first.next() {
            Some(item) => Some(item),
            None => self.second.next(),
        };
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

impl<S: RowStore + ?Sized> std::iter::FusedIterator for ChainedDiffRows<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoredRow};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_tags(&[("id", "int")], &[("v", "string")]).unwrap())
    }

    fn put(store: &mut MemoryStore, side: SideTag, key: &str, fingerprint: &str) {
        let sort_order = store.allocate_sort_order(side).unwrap();
        store
            .upsert(
                side,
                StoredRow {
                    canonical_key: key.to_string(),
                    fingerprint: fingerprint.to_string(),
                    payload: json!({ "id": key }).as_object().cloned().unwrap(),
                    sort_order,
                },
            )
            .unwrap();
    }

    fn keys(rows: impl Iterator<Item = Result<DiffRow, ExError>>) -> Vec<String> {
        rows.map(|r| r.unwrap().canonical_key().to_string()).collect()
    }

    fn fixture() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (key, fp) in [("1", "x"), ("2", "x"), ("3", "x"), ("4", "x")] {
            put(&mut store, SideTag::A, key, fp);
        }
        for (key, fp) in [("2", "x"), ("3", "changed"), ("5", "x")] {
            put(&mut store, SideTag::B, key, fp);
        }
        store
    }

    #[test]
    fn test_each_filter_selects_its_rows() {
        let store = fixture();
        let s = schema();

        let new = DiffRows::new_rows(&store, s.clone(), SideTag::A, 2, None);
        assert_eq!(keys(new), ["1", "4"]);

        let changed = DiffRows::changed(&store, s.clone(), SideTag::A, 2, None);
        assert_eq!(keys(changed), ["3"]);

        let unchanged = DiffRows::unchanged(&store, s.clone(), SideTag::A, 2, None);
        assert_eq!(keys(unchanged), ["2"]);

        let missing = DiffRows::missing(&store, s, SideTag::A, 2, None);
        assert_eq!(keys(missing), ["5"]);
    }

    #[test]
    fn test_limit_is_a_prefix() {
        let store = fixture();
        let limited = DiffRows::new_or_changed(&store, schema(), SideTag::A, 1, Some(2));
        assert_eq!(keys(limited), ["1", "3"]);

        let zero = DiffRows::new_or_changed(&store, schema(), SideTag::A, 1, Some(0));
        assert_eq!(zero.count(), 0);
    }

    #[test]
    fn test_missing_rows_carry_only_foreign_payload() {
        let store = fixture();
        let row = DiffRows::missing(&store, schema(), SideTag::A, 8, None)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(row.kind(), RowChange::Missing);
        assert!(row.local().is_none());
        assert_eq!(row.foreign().map(|p| &p["id"]), Some(&json!("5")));
    }

    struct FailingStore;

    impl RowStore for FailingStore {
        fn upsert(&mut self, _: SideTag, _: StoredRow) -> Result<(), ExError> {
            Ok(())
        }
        fn get(&self, _: SideTag, _: &str) -> Result<Option<StoredRow>, ExError> {
            Ok(None)
        }
        fn allocate_sort_order(&mut self, _: SideTag) -> Result<u64, ExError> {
            Ok(1)
        }
        fn scan_joined(
            &self,
            _: SideTag,
            _: Option<u64>,
            _: usize,
        ) -> Result<Vec<JoinedRow>, ExError> {
            Err(crate::errors::backing_store("scan_joined", "disk on fire"))
        }
        fn clear(&mut self, _: SideTag) -> Result<(), ExError> {
            Ok(())
        }
        fn count(&self, _: SideTag) -> Result<usize, ExError> {
            Ok(0)
        }
    }

    #[test]
    fn test_store_failure_is_yielded_once() {
        let store = FailingStore;
        let mut rows = DiffRows::new_rows(&store, schema(), SideTag::B, 4, None);

        let err = rows.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ExErrorKind::BackingStoreFailure);
        assert_eq!(err.side(), Some(SideTag::B));
        assert!(rows.next().is_none());

        let mut chained = ChainedDiffRows::new(
            DiffRows::new_rows(&store, schema(), SideTag::A, 4, None),
            DiffRows::missing(&store, schema(), SideTag::A, 4, None),
        );
        assert!(chained.next().unwrap().is_err());
        assert!(chained.next().is_none());
    }
}
