//! SQLite implementation of the row store
//!
//! Both sides share the `side_rows` table. Every method runs its own
//! statements to completion; a page of `scan_joined` is collected before
//! returning, so no statement outlives a call.

#![allow(clippy::result_large_err)]

use std::path::Path;

use crate::db;
use crate::errors::{corrupt_row, from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rowdelta_core::errors::backing_store;
use rowdelta_core::{JoinedRow, Record, RowStore, StoredRow};
use rowdelta_core_types::SideTag;
use rusqlite::{Connection, OptionalExtension};

const SELECT_ROW: &str = "SELECT fingerprint, payload, sort_order
     FROM side_rows
     WHERE side = ?1 AND canonical_key = ?2";

const SELECT_JOINED_PAGE: &str = "SELECT l.canonical_key, l.fingerprint, l.payload, l.sort_order,
            f.fingerprint, f.payload, f.sort_order
     FROM side_rows l
     LEFT JOIN side_rows f
       ON f.side = ?2 AND f.canonical_key = l.canonical_key
     WHERE l.side = ?1 AND l.sort_order > ?3
     ORDER BY l.sort_order
     LIMIT ?4";

type RawJoined = (
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<i64>,
);

/// Row store over a SQLite connection
pub struct SqliteRowStore {
    conn: Connection,
}

impl SqliteRowStore {
    /// Open (or create) a database file and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Wrap an existing connection, applying pending migrations
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl std::fmt::Debug for SqliteRowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRowStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

fn to_sql_order(sort_order: u64) -> Result<i64> {
    i64::try_from(sort_order).map_err(|_| {
        backing_store(
            "sqlite",
            format!("sort order {} exceeds the SQLite range", sort_order),
        )
    })
}

fn decode_row(
    canonical_key: String,
    fingerprint: String,
    payload: &str,
    sort_order: i64,
) -> Result<StoredRow> {
    let payload: Record =
        serde_json::from_str(payload).map_err(|e| corrupt_row(&canonical_key, e))?;
    let sort_order = u64::try_from(sort_order).map_err(|e| corrupt_row(&canonical_key, e))?;
    Ok(StoredRow {
        canonical_key,
        fingerprint,
        payload,
        sort_order,
    })
}

fn decode_joined(raw: RawJoined) -> Result<JoinedRow> {
    let (key, fingerprint, payload, sort_order, f_fingerprint, f_payload, f_sort_order) = raw;

    let foreign = match (f_fingerprint, f_payload, f_sort_order) {
        (Some(fp), Some(p), Some(so)) => Some(decode_row(key.clone(), fp, &p, so)?),
        _ => None,
    };
    let local = decode_row(key, fingerprint, &payload, sort_order)?;

    Ok(JoinedRow { local, foreign })
}

impl RowStore for SqliteRowStore {
    fn upsert(&mut self, side: SideTag, row: StoredRow) -> Result<()> {
        let payload = serde_json::to_string(&row.payload)
            .map_err(|e| corrupt_row(&row.canonical_key, e))?;

        self.conn
            .execute(
                "INSERT INTO side_rows (side, canonical_key, fingerprint, payload, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(side, canonical_key) DO UPDATE SET
                    fingerprint = excluded.fingerprint,
                    payload = excluded.payload,
                    sort_order = excluded.sort_order",
                rusqlite::params![
                    side.as_str(),
                    row.canonical_key,
                    row.fingerprint,
                    payload,
                    to_sql_order(row.sort_order)?,
                ],
            )
            .map_err(from_rusqlite)?;

        Ok(())
    }

    fn get(&self, side: SideTag, canonical_key: &str) -> Result<Option<StoredRow>> {
        let raw: Option<(String, String, i64)> = self
            .conn
            .query_row(SELECT_ROW, rusqlite::params![side.as_str(), canonical_key], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()
            .map_err(from_rusqlite)?;

        raw.map(|(fingerprint, payload, sort_order)| {
            decode_row(canonical_key.to_string(), fingerprint, &payload, sort_order)
        })
        .transpose()
    }

    fn allocate_sort_order(&mut self, side: SideTag) -> Result<u64> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;

        tx.execute(
            "INSERT INTO side_counters (side, last_sort_order) VALUES (?1, 1)
             ON CONFLICT(side) DO UPDATE SET last_sort_order = last_sort_order + 1",
            [side.as_str()],
        )
        .map_err(from_rusqlite)?;

        let allocated: i64 = tx
            .query_row(
                "SELECT last_sort_order FROM side_counters WHERE side = ?1",
                [side.as_str()],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;

        tx.commit().map_err(from_rusqlite)?;

        u64::try_from(allocated).map_err(|e| corrupt_row("side_counters", e))
    }

    fn scan_joined(
        &self,
        side: SideTag,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<JoinedRow>> {
        let after = match after {
            Some(n) => to_sql_order(n)?,
            None => -1,
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = self
            .conn
            .prepare(SELECT_JOINED_PAGE)
            .map_err(from_rusqlite)?;
        let raw: Vec<RawJoined> = stmt
            .query_map(
                rusqlite::params![side.as_str(), side.counterpart().as_str(), after, limit],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        drop(stmt);

        tracing::debug!(side = %side, after, rows = raw.len(), "sqlite joined page");

        raw.into_iter().map(decode_joined).collect()
    }

    fn clear(&mut self, side: SideTag) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM side_rows WHERE side = ?1", [side.as_str()])
            .map_err(from_rusqlite)?;
        tracing::debug!(side = %side, removed, "sqlite side cleared");
        Ok(())
    }

    fn count(&self, side: SideTag) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM side_rows WHERE side = ?1",
                [side.as_str()],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        usize::try_from(count).map_err(|e| corrupt_row("side_rows", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(key: &str, fingerprint: &str, sort_order: u64) -> StoredRow {
        StoredRow {
            canonical_key: key.to_string(),
            fingerprint: fingerprint.to_string(),
            payload: json!({ "id": key, "n": 1.5 }).as_object().cloned().unwrap(),
            sort_order,
        }
    }

    #[test]
    fn test_upsert_and_get_round_trip() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        store.upsert(SideTag::A, row("k1", "f1", 1)).unwrap();

        assert_eq!(store.get(SideTag::A, "k1").unwrap(), Some(row("k1", "f1", 1)));
        assert_eq!(store.get(SideTag::B, "k1").unwrap(), None);

        store.upsert(SideTag::A, row("k1", "f2", 1)).unwrap();
        assert_eq!(store.count(SideTag::A).unwrap(), 1);
        assert_eq!(store.get(SideTag::A, "k1").unwrap().unwrap().fingerprint, "f2");
    }

    #[test]
    fn test_sort_order_counters_survive_clear() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        assert_eq!(store.allocate_sort_order(SideTag::A).unwrap(), 1);
        assert_eq!(store.allocate_sort_order(SideTag::A).unwrap(), 2);
        assert_eq!(store.allocate_sort_order(SideTag::B).unwrap(), 1);

        store.clear(SideTag::A).unwrap();
        assert_eq!(store.allocate_sort_order(SideTag::A).unwrap(), 3);
    }

    #[test]
    fn test_scan_joined_outer_joins_counterpart() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        store.upsert(SideTag::A, row("x", "1", 1)).unwrap();
        store.upsert(SideTag::A, row("y", "1", 2)).unwrap();
        store.upsert(SideTag::A, row("z", "1", 3)).unwrap();
        store.upsert(SideTag::B, row("y", "2", 1)).unwrap();

        let page = store.scan_joined(SideTag::A, None, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].local.canonical_key, "x");
        assert!(page[0].foreign.is_none());
        assert_eq!(page[1].foreign.as_ref().unwrap().fingerprint, "2");

        let rest = store.scan_joined(SideTag::A, Some(2), 2).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].local.canonical_key, "z");
    }

    #[test]
    fn test_clear_only_touches_one_side() {
        let mut store = SqliteRowStore::open_in_memory().unwrap();
        store.upsert(SideTag::A, row("x", "1", 1)).unwrap();
        store.upsert(SideTag::B, row("x", "1", 1)).unwrap();

        store.clear(SideTag::B).unwrap();
        assert_eq!(store.count(SideTag::A).unwrap(), 1);
        assert_eq!(store.count(SideTag::B).unwrap(), 0);
    }
}
