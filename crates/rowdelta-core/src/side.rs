//! The linked pair of sides and their read/write views.
//!
//! A [`SidePair`] owns the storage collaborator and the shared schema.
//! [`Side`] borrows the pair shared and answers enumeration, lookup and
//! classification queries; [`SideMut`] borrows it exclusively and is the
//! only way to add or clear rows.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use rowdelta_core_types::{SessionId, SideTag};
use serde::Serialize;

use crate::classify::{ChainedDiffRows, DiffRows};
use crate::errors::{DiffError, ExError, ExErrorKind};
use crate::resolver::ConflictResolver;
use crate::schema::{Record, Schema};
use crate::store::{MemoryStore, RowStore, StoredRow};
use crate::summary::DiffSummary;

/// Rows fetched per store call when streaming
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Source field name to schema field name
pub type FieldTranslation = HashMap<String, String>;

/// Options for one insert call
#[derive(Clone, Copy, Default)]
pub struct AddOptions<'r> {
    pub translation: Option<&'r FieldTranslation>,
    pub resolver: Option<&'r dyn ConflictResolver>,
}

impl<'r> AddOptions<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: &'r FieldTranslation) -> Self {
        self.translation = Some(translation);
        self
    }

    pub fn with_resolver(mut self, resolver: &'r dyn ConflictResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl std::fmt::Debug for AddOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddOptions")
            .field("translation", &self.translation)
            .field("resolver", &self.resolver.map(|_| "<resolver>"))
            .finish()
    }
}

/// What an insert did to the side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New key, fresh sort order
    Inserted,
    /// Existing key overwritten (no resolver)
    Replaced,
    /// Existing key replaced by the resolver's merge
    Merged,
}

/// Two sides sharing one schema and one storage collaborator
///
/// # Example
///
/// ```
/// use rowdelta_core::schema::Schema;
/// use rowdelta_core::side::SidePair;
/// use serde_json::json;
///
/// let schema = Schema::from_tags(&[("id", "integer")], &[("name", "string")]).unwrap();
/// let mut pair = SidePair::new(schema);
///
/// let row = json!({"id": 1, "name": "a"}).as_object().cloned().unwrap();
/// pair.a_mut().add_row(&row).unwrap();
///
/// let new_keys: Vec<_> = pair
///     .a()
///     .get_new(None)
///     .map(|r| r.unwrap().canonical_key().to_string())
///     .collect();
/// assert_eq!(new_keys, ["1"]);
/// ```
pub struct SidePair<S: RowStore = MemoryStore> {
    store: S,
    schema: Arc<Schema>,
    session_id: SessionId,
    page_size: usize,
    resolver: Option<Arc<dyn ConflictResolver>>,
}

impl<S: RowStore + std::fmt::Debug> std::fmt::Debug for SidePair<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidePair")
            .field("store", &self.store)
            .field("schema", &self.schema)
            .field("session_id", &self.session_id)
            .field("page_size", &self.page_size)
            .field("resolver", &self.resolver.as_ref().map(|_| "<resolver>"))
            .finish()
    }
}

impl SidePair<MemoryStore> {
    /// Pair backed by a fresh in-memory store
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_store(schema, MemoryStore::new())
    }
}

impl<S: RowStore> SidePair<S> {
    /// Pair backed by the given store
    pub fn with_store(schema: impl Into<Arc<Schema>>, store: S) -> Self {
        Self {
            store,
            schema: schema.into(),
            session_id: SessionId::new(),
            page_size: DEFAULT_PAGE_SIZE,
            resolver: None,
        }
    }

    /// Resolver used by inserts whose options name none
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Rows fetched per store call (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pair-level resolver, if one was configured
    pub fn resolver(&self) -> Option<&dyn ConflictResolver> {
        self.resolver.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn a(&self) -> Side<'_, S> {
        self.side(SideTag::A)
    }

    pub fn b(&self) -> Side<'_, S> {
        self.side(SideTag::B)
    }

    pub fn side(&self, tag: SideTag) -> Side<'_, S> {
        Side { pair: self, tag }
    }

    pub fn a_mut(&mut self) -> SideMut<'_, S> {
        self.side_mut(SideTag::A)
    }

    pub fn b_mut(&mut self) -> SideMut<'_, S> {
        self.side_mut(SideTag::B)
    }

    pub fn side_mut(&mut self, tag: SideTag) -> SideMut<'_, S> {
        SideMut { pair: self, tag }
    }
}

/// Read view of one side
pub struct Side<'a, S: RowStore> {
    pair: &'a SidePair<S>,
    tag: SideTag,
}

impl<S: RowStore> Clone for Side<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: RowStore> Copy for Side<'_, S> {}

impl<'a, S: RowStore> Side<'a, S> {
    pub fn tag(&self) -> SideTag {
        self.tag
    }

    pub fn counterpart(&self) -> Side<'a, S> {
        Side {
            pair: self.pair,
            tag: self.tag.counterpart(),
        }
    }

    fn context(&self, op: &'static str) -> impl Fn(ExError) -> ExError + '_ {
        move |e| {
            let e = e
                .with_side(self.tag)
                .with_session_id(self.pair.session_id.clone());
            if e.op().is_none() {
                e.with_op(op)
            } else {
                e
            }
        }
    }

    /// Number of rows on this side
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` from the store.
    pub fn count(&self) -> Result<usize, ExError> {
        self.pair.store.count(self.tag).map_err(self.context("count"))
    }

    /// Rows in ascending sort order
    pub fn iter(&self) -> Rows<'a, S> {
        Rows {
            store: &self.pair.store,
            tag: self.tag,
            page_size: self.pair.page_size,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Stored payload for the key fields of `key_record`
    ///
    /// Value fields of the record are ignored and may be absent.
    ///
    /// # Errors
    ///
    /// `MissingField`/`InvalidValue` for a bad key field, or
    /// `BackingStoreFailure` from the store.
    pub fn get(&self, key_record: &Record) -> Result<Option<Record>, ExError> {
        let key = self
            .pair
            .schema
            .canonical_key(key_record)
            .map_err(|e| self.context("get")(e.into()))?;
        let row = self
            .pair
            .store
            .get(self.tag, &key)
            .map_err(self.context("get"))?;
        Ok(row.map(|r| r.payload))
    }

    /// Rows whose key is absent on the counterpart side
    pub fn get_new(&self, limit: Option<usize>) -> DiffRows<'a, S> {
        DiffRows::new_rows(
            &self.pair.store,
            self.pair.schema.clone(),
            self.tag,
            self.pair.page_size,
            limit,
        )
    }

    /// Counterpart rows whose key is absent on this side
    pub fn get_missing(&self, limit: Option<usize>) -> DiffRows<'a, S> {
        DiffRows::missing(
            &self.pair.store,
            self.pair.schema.clone(),
            self.tag,
            self.pair.page_size,
            limit,
        )
    }

    /// Rows on both sides with differing fingerprints
    pub fn get_changed(&self, limit: Option<usize>) -> DiffRows<'a, S> {
        DiffRows::changed(
            &self.pair.store,
            self.pair.schema.clone(),
            self.tag,
            self.pair.page_size,
            limit,
        )
    }

    /// Rows on both sides with equal fingerprints
    pub fn get_unchanged(&self, limit: Option<usize>) -> DiffRows<'a, S> {
        DiffRows::unchanged(
            &self.pair.store,
            self.pair.schema.clone(),
            self.tag,
            self.pair.page_size,
            limit,
        )
    }

    /// New and changed rows interleaved in this side's sort order
    pub fn get_new_or_changed(&self, limit: Option<usize>) -> DiffRows<'a, S> {
        DiffRows::new_or_changed(
            &self.pair.store,
            self.pair.schema.clone(),
            self.tag,
            self.pair.page_size,
            limit,
        )
    }

    /// New-or-changed rows, then missing rows
    ///
    /// The two phases are not merged: missing rows follow in the
    /// counterpart's sort order once the first phase is exhausted, and
    /// `limit` caps each phase separately.
    pub fn get_new_or_changed_or_missing(&self, limit: Option<usize>) -> ChainedDiffRows<'a, S> {
        ChainedDiffRows::new(self.get_new_or_changed(limit), self.get_missing(limit))
    }

    /// True as soon as one new, changed or missing row is found
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` from the store.
    pub fn has_any_changes(&self) -> Result<bool, ExError> {
        if self.get_new_or_changed(Some(1)).next().transpose()?.is_some() {
            return Ok(true);
        }
        Ok(self.get_missing(Some(1)).next().transpose()?.is_some())
    }

    /// Count rows per relationship in one pass over each side
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` from the store.
    pub fn summarize(&self) -> Result<DiffSummary, ExError> {
        let mut summary = DiffSummary::default();
        let present = DiffRows::present(
            &self.pair.store,
            self.pair.schema.clone(),
            self.tag,
            self.pair.page_size,
        );
        for row in present.chain(self.get_missing(None)) {
            summary.record(row?.kind());
        }
        Ok(summary)
    }
}

impl<'a, S: RowStore> IntoIterator for Side<'a, S> {
    type Item = Result<Record, ExError>;
    type IntoIter = Rows<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Payloads of one side in ascending sort order, fetched a page at a time
pub struct Rows<'a, S: RowStore> {
    store: &'a S,
    tag: SideTag,
    page_size: usize,
    after: Option<u64>,
    buffer: VecDeque<StoredRow>,
    exhausted: bool,
}

impl<S: RowStore> Iterator for Rows<'_, S> {
    type Item = Result<Record, ExError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row.payload));
            }
            if self.exhausted {
                return None;
            }
            match self.store.scan_joined(self.tag, self.after, self.page_size) {
                Ok(page) => {
                    self.exhausted = page.len() < self.page_size;
                    if let Some(last) = page.last() {
                        self.after = Some(last.local.sort_order);
                    }
                    self.buffer.extend(page.into_iter().map(|j| j.local));
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e.with_side(self.tag)));
                }
            }
        }
    }
}

impl<S: RowStore> std::iter::FusedIterator for Rows<'_, S> {}

/// Exclusive write view of one side
pub struct SideMut<'a, S: RowStore> {
    pair: &'a mut SidePair<S>,
    tag: SideTag,
}

impl<S: RowStore> SideMut<'_, S> {
    pub fn tag(&self) -> SideTag {
        self.tag
    }

    /// Read view of the same side
    pub fn as_side(&self) -> Side<'_, S> {
        self.pair.side(self.tag)
    }

    fn error(&self, op: &str, err: ExError) -> ExError {
        let err = err
            .with_side(self.tag)
            .with_session_id(self.pair.session_id.clone());
        if err.op().is_none() {
            err.with_op(op)
        } else {
            err
        }
    }

    /// Insert a record with the default overwrite policy
    ///
    /// # Errors
    ///
    /// See [`SideMut::add_row_with`].
    pub fn add_row(&mut self, record: &Record) -> Result<AddOutcome, ExError> {
        self.add_row_with(record, &AddOptions::default())
    }

    /// Insert a record, translating field names and resolving key conflicts
    ///
    /// The resolver in `options` wins over the pair-level one; with neither,
    /// a conflicting row overwrites the stored one.
    ///
    /// # Errors
    ///
    /// - `MissingField`/`InvalidValue` when the record does not encode
    /// - `ConflictResolutionFailure` when the resolver fails, its result does
    ///   not encode, or its result has a different canonical key; the stored
    ///   row is unchanged
    /// - `BackingStoreFailure` from the store
    pub fn add_row_with(
        &mut self,
        record: &Record,
        options: &AddOptions<'_>,
    ) -> Result<AddOutcome, ExError> {
        let translated;
        let record = match options.translation {
            Some(translation) => {
                translated = translate(record, translation);
                &translated
            }
            None => record,
        };

        let encoded = self
            .pair
            .schema
            .encode(record)
            .map_err(|e| self.error("add_row", e.into()))?;

        let existing = self
            .pair
            .store
            .get(self.tag, &encoded.canonical_key)
            .map_err(|e| self.error("add_row", e))?;

        let default_resolver = self.pair.resolver.clone();
        let resolver = options.resolver.or(default_resolver.as_deref());

        let (row, outcome) = match (existing, resolver) {
            (None, _) => {
                let sort_order = self
                    .pair
                    .store
                    .allocate_sort_order(self.tag)
                    .map_err(|e| self.error("add_row", e))?;
                let row = StoredRow {
                    canonical_key: encoded.canonical_key,
                    fingerprint: encoded.fingerprint,
                    payload: encoded.payload,
                    sort_order,
                };
                (row, AddOutcome::Inserted)
            }
            (Some(previous), None) => {
                let row = StoredRow {
                    canonical_key: encoded.canonical_key,
                    fingerprint: encoded.fingerprint,
                    payload: encoded.payload,
                    sort_order: previous.sort_order,
                };
                (row, AddOutcome::Replaced)
            }
            (Some(previous), Some(resolver)) => {
                let row = self.merge(resolver, &encoded.payload, previous)?;
                (row, AddOutcome::Merged)
            }
        };

        tracing::debug!(
            side = %self.tag,
            canonical_key = %row.canonical_key,
            sort_order = row.sort_order,
            outcome = ?outcome,
            "row stored"
        );

        self.pair
            .store
            .upsert(self.tag, row)
            .map_err(|e| self.error("add_row", e))?;
        Ok(outcome)
    }

    fn merge(
        &self,
        resolver: &dyn ConflictResolver,
        incoming: &Record,
        previous: StoredRow,
    ) -> Result<StoredRow, ExError> {
        let failure = |message: &str| {
            self.error(
                "add_row",
                ExError::new(ExErrorKind::ConflictResolutionFailure)
                    .with_canonical_key(previous.canonical_key.clone())
                    .with_message(message),
            )
        };

        let merged = resolver
            .merge(incoming, &previous.payload)
            .map_err(|cause| failure("resolver failed").with_source(cause))?;

        let reencoded = self
            .pair
            .schema
            .reencode(&merged)
            .map_err(|cause| failure("merged record does not encode").with_source(cause.into()))?;

        if reencoded.canonical_key != previous.canonical_key {
            return Err(failure("merged record changed the canonical key"));
        }

        Ok(StoredRow {
            canonical_key: previous.canonical_key,
            fingerprint: reencoded.fingerprint,
            payload: reencoded.payload,
            sort_order: previous.sort_order,
        })
    }

    /// Insert every element in order, stopping at the first failure
    ///
    /// Elements are anything that serializes to a JSON object. Rows added
    /// before a failure stay stored. Returns the number of rows added.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when an element is not an object, `Serialization` when
    /// it does not serialize, or any [`SideMut::add_row_with`] error.
    pub fn add_rows<I, T>(&mut self, rows: I, options: &AddOptions<'_>) -> Result<usize, ExError>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let mut added = 0;
        for item in rows {
            let record = to_record(&item).map_err(|e| self.error("add_rows", e.into()))?;
            self.add_row_with(&record, options)?;
            added += 1;
        }
        Ok(added)
    }

    /// Remove every row of this side; the counterpart is untouched
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` from the store.
    pub fn clear_all(&mut self) -> Result<(), ExError> {
        self.pair
            .store
            .clear(self.tag)
            .map_err(|e| self.error("clear_all", e))?;
        tracing::debug!(side = %self.tag, "side cleared");
        Ok(())
    }

    /// Number of rows on this side
    ///
    /// # Errors
    ///
    /// `BackingStoreFailure` from the store.
    pub fn count(&self) -> Result<usize, ExError> {
        self.as_side().count()
    }
}

/// Rename fields per the translation; unmapped names pass through
fn translate(record: &Record, translation: &FieldTranslation) -> Record {
    record
        .iter()
        .map(|(name, value)| {
            let name = translation.get(name).unwrap_or(name);
            (name.clone(), value.clone())
        })
        .collect()
}

fn to_record<T: Serialize>(item: &T) -> Result<Record, DiffError> {
    match serde_json::to_value(item)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(DiffError::NotARecord {
            found: json_kind(&other).to_string(),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{KeepExisting, PreferNonNull};
    use serde_json::{json, Value};

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn pair() -> SidePair {
        let schema = Schema::from_tags(
            &[("id", "integer")],
            &[("name", "string"), ("total", "money")],
        )
        .unwrap();
        SidePair::new(schema).with_page_size(2)
    }

    #[test]
    fn test_overwrite_keeps_first_sort_order() {
        let mut pair = pair();
        let mut a = pair.a_mut();
        assert_eq!(
            a.add_row(&record(json!({"id": 1, "name": "x", "total": 1}))).unwrap(),
            AddOutcome::Inserted
        );
        a.add_row(&record(json!({"id": 2, "name": "y", "total": 2}))).unwrap();
        assert_eq!(
            a.add_row(&record(json!({"id": 1, "name": "z", "total": 3}))).unwrap(),
            AddOutcome::Replaced
        );

        let rows: Vec<Record> = pair.a().iter().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("z"));
        assert_eq!(rows[0]["total"], json!("3.00"));
        assert_eq!(rows[1]["id"], json!(2));
    }

    #[test]
    fn test_resolver_result_is_stored() {
        let mut pair = pair();
        let options = AddOptions::new().with_resolver(&PreferNonNull);
        let mut a = pair.a_mut();
        a.add_row(&record(json!({"id": 1, "name": "x", "total": 5})))
            .unwrap();
        let outcome = a
            .add_row_with(&record(json!({"id": 1, "name": null, "total": 6})), &options)
            .unwrap();

        assert_eq!(outcome, AddOutcome::Merged);
        let stored = pair.a().get(&record(json!({"id": 1}))).unwrap().unwrap();
        assert_eq!(stored, record(json!({"id": 1, "name": "x", "total": "6.00"})));
    }

    #[test]
    fn test_key_changing_merge_is_rejected() {
        let mut pair = pair();
        let rekey = |incoming: &Record, _existing: &Record| -> Result<Record, ExError> {
            let mut merged = incoming.clone();
            merged.insert("id".to_string(), json!(99));
            Ok(merged)
        };
        let options = AddOptions::new().with_resolver(&rekey);
        let mut a = pair.a_mut();
        a.add_row(&record(json!({"id": 1, "name": "x", "total": 5})))
            .unwrap();
        let err = a
            .add_row_with(&record(json!({"id": 1, "name": "y", "total": 6})), &options)
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::ConflictResolutionFailure);
        assert_eq!(err.side(), Some(SideTag::A));
        let stored = pair.a().get(&record(json!({"id": 1}))).unwrap().unwrap();
        assert_eq!(stored["name"], json!("x"));
        assert_eq!(pair.a().count().unwrap(), 1);
    }

    #[test]
    fn test_translation_renames_fields() {
        let mut pair = pair();
        let translation: FieldTranslation =
            [("OrderId".to_string(), "id".to_string())].into_iter().collect();
        let options = AddOptions::new().with_translation(&translation);

        pair.b_mut()
            .add_row_with(
                &record(json!({"OrderId": 7, "name": "n", "total": "1"})),
                &options,
            )
            .unwrap();
        assert!(pair.b().get(&record(json!({"id": 7}))).unwrap().is_some());
    }

    #[test]
    fn test_add_rows_accepts_serializable_items_and_stops_on_error() {
        #[derive(Serialize)]
        struct Order {
            id: i64,
            name: String,
            total: f64,
        }

        let mut pair = pair();
        let orders = (1..=3).map(|id| Order {
            id,
            name: format!("o{id}"),
            total: 1.5,
        });
        let added = pair.a_mut().add_rows(orders, &AddOptions::default()).unwrap();
        assert_eq!(added, 3);

        let mixed = vec![
            json!({"id": 4, "name": "ok", "total": 1}),
            json!(5),
            json!({"id": 6, "name": "never", "total": 1}),
        ];
        let err = pair
            .a_mut()
            .add_rows(mixed, &AddOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidValue);
        assert_eq!(err.op(), Some("add_rows"));
        assert_eq!(pair.a().count().unwrap(), 4);
    }

    #[test]
    fn test_keep_existing_and_clear_all() {
        let mut pair = pair();
        let options = AddOptions::new().with_resolver(&KeepExisting);
        pair.a_mut()
            .add_rows(
                [
                    json!({"id": 1, "name": "first", "total": 1}),
                    json!({"id": 1, "name": "second", "total": 1}),
                ],
                &options,
            )
            .unwrap();
        pair.b_mut()
            .add_row(&record(json!({"id": 1, "name": "b", "total": 1})))
            .unwrap();

        let stored = pair.a().get(&record(json!({"id": 1}))).unwrap().unwrap();
        assert_eq!(stored["name"], json!("first"));

        pair.a_mut().clear_all().unwrap();
        assert_eq!(pair.a().count().unwrap(), 0);
        assert_eq!(pair.b().count().unwrap(), 1);
    }

    #[test]
    fn test_missing_field_error_carries_context() {
        let mut pair = pair();
        let err = pair
            .b_mut()
            .add_row(&record(json!({"id": 1, "name": "x"})))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MissingField);
        assert_eq!(err.field(), Some("total"));
        assert_eq!(err.side(), Some(SideTag::B));
        assert_eq!(err.op(), Some("add_row"));
        assert_eq!(err.session_id(), Some(pair.session_id()));
    }

    #[test]
    fn test_summarize_and_has_any_changes() {
        let mut pair = pair();
        for id in 1..=3 {
            pair.a_mut()
                .add_row(&record(json!({"id": id, "name": "n", "total": id})))
                .unwrap();
        }
        for id in 1..=2 {
            pair.b_mut()
                .add_row(&record(json!({"id": id, "name": "n", "total": id})))
                .unwrap();
        }
        assert!(pair.a().has_any_changes().unwrap());
        assert!(pair.b().has_any_changes().unwrap());

        let summary = pair.a().summarize().unwrap();
        assert_eq!(
            summary,
            DiffSummary {
                new: 1,
                changed: 0,
                unchanged: 2,
                missing: 0
            }
        );
        assert_eq!(pair.b().summarize().unwrap().missing, 1);

        pair.b_mut()
            .add_row(&record(json!({"id": 3, "name": "n", "total": 3})))
            .unwrap();
        assert!(!pair.a().has_any_changes().unwrap());
    }
}
