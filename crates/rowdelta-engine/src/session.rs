//! Diff sessions with boundary logging.
//!
//! A `DiffSession` owns one side pair built from a `DiffDefinition` and
//! exposes the operations a caller runs against it:
//! - Load rows into a side (applying that side's field translation)
//! - Report a side's summary plus a sample of changed rows
//! - Check for changes, clear a side
//!
//! ## Logging Ownership
//!
//! The engine layer owns lifecycle logging for session operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal details.

#![allow(clippy::result_large_err)]

use std::time::Instant;

use rowdelta_core::{
    log_op_end, log_op_error, log_op_start, render_human_summary, AddOptions, ConflictResolver,
    DiffSummary, ExError, FieldDiff, RowStore, Schema, Side, SidePair,
};
use rowdelta_core_types::{SessionId, SideTag};
use rowdelta_store::errors::Result;
use rowdelta_store::{open_backend, DiffDefinition};
use serde::Serialize;

type SessionPair = SidePair<Box<dyn RowStore>>;

/// One changed row in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangedRowSample {
    pub canonical_key: String,
    pub field_diff: FieldDiff,
}

/// Summary of one side against the other
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffReport {
    pub session_id: SessionId,
    pub side: SideTag,
    pub summary: DiffSummary,
    /// First changed rows in sort order, up to the requested limit
    pub changed_sample: Vec<ChangedRowSample>,
}

impl DiffReport {
    /// Markdown rendering: the summary table followed by sampled field diffs
    pub fn render_human(&self) -> String {
        let mut out = render_human_summary(&self.summary, self.side, self.side.counterpart());

        if self.changed_sample.is_empty() {
            return out;
        }

        out.push_str("\n### Changed rows\n\n");
        for sample in &self.changed_sample {
            out.push_str(&format!("- `{}`\n", sample.canonical_key));
            for (field, change) in sample.field_diff.iter() {
                out.push_str(&format!("  - {}: {}\n", field, change));
            }
        }
        out
    }
}

/// A side pair opened from a definition
pub struct DiffSession {
    definition: DiffDefinition,
    pair: SessionPair,
}

impl std::fmt::Debug for DiffSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffSession")
            .field("name", &self.definition.name)
            .field("session_id", self.pair.session_id())
            .field("backend", &self.definition.storage.backend)
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl DiffSession {
    /// Build the schema and open the configured backing store
    ///
    /// # Errors
    ///
    /// - `InvalidSchema` / `EmptySchema`: the declared fields do not form a schema
    /// - `BackingStoreFailure`: the store could not be opened or migrated
    pub fn open(definition: &DiffDefinition) -> Result<Self> {
        let name = definition.name.as_deref().unwrap_or("");
        log_op_start!("session_open", definition = name);
        let start = Instant::now();

        let session = Self::open_impl(definition).map_err(|e| {
            log_op_error!(
                "session_open",
                e.clone(),
                duration_ms = elapsed_ms(start),
                definition = name
            );
            e
        })?;

        log_op_end!(
            "session_open",
            duration_ms = elapsed_ms(start),
            session_id = %session.session_id(),
            definition = name
        );

        Ok(session)
    }

    fn open_impl(definition: &DiffDefinition) -> Result<Self> {
        let schema = definition.schema()?;
        let store = open_backend(&definition.storage)?;
        let pair =
            SidePair::with_store(schema, store).with_page_size(definition.storage.page_size);

        Ok(Self {
            definition: definition.clone(),
            pair,
        })
    }

    /// Resolver applied by every load that passes none
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.pair = self.pair.with_resolver(resolver);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        self.pair.session_id()
    }

    pub fn definition(&self) -> &DiffDefinition {
        &self.definition
    }

    pub fn schema(&self) -> &Schema {
        self.pair.schema()
    }

    /// Read view of one side for direct classification queries
    pub fn side(&self, tag: SideTag) -> Side<'_, Box<dyn RowStore>> {
        self.pair.side(tag)
    }

    /// Add rows to a side, translating field names first
    ///
    /// Rows are anything that serializes to a JSON object. Loading stops at
    /// the first failing row; earlier rows stay stored. Without `resolver`
    /// the session's default resolver, if any, handles duplicate keys.
    ///
    /// ## Returns
    ///
    /// Number of rows added
    ///
    /// # Errors
    ///
    /// - `MissingField` / `InvalidValue`: a row does not fit the schema
    /// - `ConflictResolutionFailure`: the resolver failed on a duplicate key
    /// - `BackingStoreFailure`: the store failed
    pub fn load<I, T>(
        &mut self,
        tag: SideTag,
        rows: I,
        resolver: Option<&dyn ConflictResolver>,
    ) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let session_id = self.session_id().clone();
        log_op_start!("session_load", session_id = %session_id, side = %tag);
        let start = Instant::now();

        let translation = self.definition.translations.for_side(tag);
        let mut options = AddOptions::new().with_translation(translation);
        if let Some(resolver) = resolver {
            options = options.with_resolver(resolver);
        }

        let added = self
            .pair
            .side_mut(tag)
            .add_rows(rows, &options)
            .map_err(|e| {
                log_op_error!(
                    "session_load",
                    e.clone(),
                    duration_ms = elapsed_ms(start),
                    session_id = %session_id,
                    side = %tag
                );
                e
            })?;

        log_op_end!(
            "session_load",
            duration_ms = elapsed_ms(start),
            session_id = %session_id,
            side = %tag,
            row_count = added
        );

        Ok(added)
    }

    /// Summarize a side and sample its first changed rows
    ///
    /// # Errors
    ///
    /// - `BackingStoreFailure`: the store failed while streaming
    pub fn report(&self, tag: SideTag, sample_limit: usize) -> Result<DiffReport> {
        let session_id = self.session_id();
        log_op_start!("session_report", session_id = %session_id, side = %tag);
        let start = Instant::now();

        let report = self.report_impl(tag, sample_limit).map_err(|e| {
            log_op_error!(
                "session_report",
                e.clone(),
                duration_ms = elapsed_ms(start),
                session_id = %session_id,
                side = %tag
            );
            e
        })?;

        log_op_end!(
            "session_report",
            duration_ms = elapsed_ms(start),
            session_id = %session_id,
            side = %tag,
            has_changes = report.summary.has_changes()
        );

        Ok(report)
    }

    fn report_impl(&self, tag: SideTag, sample_limit: usize) -> Result<DiffReport> {
        let side = self.side(tag);
        let summary = side.summarize()?;

        let changed_sample = side
            .get_changed(Some(sample_limit))
            .map(|row| {
                row.map(|row| ChangedRowSample {
                    canonical_key: row.canonical_key().to_string(),
                    field_diff: row.field_diff(),
                })
            })
            .collect::<std::result::Result<Vec<_>, ExError>>()?;

        Ok(DiffReport {
            session_id: self.session_id().clone(),
            side: tag,
            summary,
            changed_sample,
        })
    }

    /// True when the side has at least one new, changed or missing row
    ///
    /// # Errors
    ///
    /// - `BackingStoreFailure`: the store failed
    pub fn has_any_changes(&self, tag: SideTag) -> Result<bool> {
        let session_id = self.session_id();
        log_op_start!("session_has_any_changes", session_id = %session_id, side = %tag);
        let start = Instant::now();

        let changed = self.side(tag).has_any_changes().map_err(|e| {
            log_op_error!(
                "session_has_any_changes",
                e.clone(),
                duration_ms = elapsed_ms(start),
                session_id = %session_id,
                side = %tag
            );
            e
        })?;

        log_op_end!(
            "session_has_any_changes",
            duration_ms = elapsed_ms(start),
            session_id = %session_id,
            side = %tag,
            changed = changed
        );

        Ok(changed)
    }

    /// Remove every row of one side
    ///
    /// # Errors
    ///
    /// - `BackingStoreFailure`: the store failed
    pub fn clear(&mut self, tag: SideTag) -> Result<()> {
        let session_id = self.session_id().clone();
        log_op_start!("session_clear", session_id = %session_id, side = %tag);
        let start = Instant::now();

        self.pair.side_mut(tag).clear_all().map_err(|e| {
            log_op_error!(
                "session_clear",
                e.clone(),
                duration_ms = elapsed_ms(start),
                session_id = %session_id,
                side = %tag
            );
            e
        })?;

        log_op_end!(
            "session_clear",
            duration_ms = elapsed_ms(start),
            session_id = %session_id,
            side = %tag
        );

        Ok(())
    }
}
