// Relational Rewriter (component F): applies path, image-descriptor, and id
// substitutions to arbitrary columns of the catalog database.
//
// Snapshot-then-iterate throughout: every table is read into a Vec before
// any write touches it, so a column rewrite never observes its own writes
// through a live cursor. Id updates are value-keyed (`WHERE id = ?`, never
// `WHERE rowid = ?`) because duplicate source rows can collapse onto the
// same destination id, and the loser is deleted rather than left to violate
// a UNIQUE index.
//
// None of the functions below open or commit a transaction themselves: a
// table's columns are rewritten one at a time but must land in a single
// commit, so the caller opens one `Transaction` per table, passes it to
// every column call, and commits once after the last one returns.

use std::time::Instant;

use rusqlite::{Connection, ErrorCode};

use crate::constants::PROGRESS_INTERVAL_SECS;
use crate::document;
use crate::error::Result;
use crate::image_descriptor;
use crate::path::id_in_path::IdPathMap;
use crate::path::rewriter::Counters;
use crate::path::ScalarRewrite;

/// Rewrites every row of `table.value_column`, keyed by `key_column`, against
/// a scalar rewriter (a path mapping or an id map). Progress is logged at
/// most once per [`PROGRESS_INTERVAL_SECS`]. `conn` is expected to be the
/// caller's open transaction for the table; nothing here commits it.
pub fn rewrite_path_column(
    conn: &Connection,
    table: &str,
    key_column: &str,
    value_column: &str,
    mapping: &dyn ScalarRewrite,
) -> Result<Counters> {
    rewrite_column(conn, table, key_column, value_column, mapping, |v, m| m.rewrite(v))
}

/// Rewrites every row of an image-descriptor column: only the path portion
/// of each pipe/star entry is substituted.
pub fn rewrite_image_descriptor_column(
    conn: &Connection,
    table: &str,
    key_column: &str,
    value_column: &str,
    mapping: &dyn ScalarRewrite,
) -> Result<Counters> {
    rewrite_column(conn, table, key_column, value_column, mapping, |v, m| {
        let desc = image_descriptor::parse(v);
        let mut counters = Counters::default();
        let rewritten = image_descriptor::rewrite_paths(&desc, |p| {
            let (out, c) = m.rewrite(p);
            counters.add(c);
            out
        });
        (image_descriptor::serialize(&rewritten), counters)
    })
}

/// Rewrites every row of a JSON column, walking every string leaf.
pub fn rewrite_json_column(
    conn: &Connection,
    table: &str,
    key_column: &str,
    value_column: &str,
    mapping: &dyn ScalarRewrite,
) -> Result<Counters> {
    rewrite_column(conn, table, key_column, value_column, mapping, |v, m| {
        let Ok(mut doc) = serde_json::from_str::<serde_json::Value>(v) else {
            return (v.to_string(), Counters::default());
        };
        let counters = document::walk_strings_mut(&mut doc, &mut |s: &str| m.rewrite(s));
        (doc.to_string(), counters)
    })
}

fn rewrite_column<F>(
    conn: &Connection,
    table: &str,
    key_column: &str,
    value_column: &str,
    mapping: &dyn ScalarRewrite,
    mut rewrite_one: F,
) -> Result<Counters>
where
    F: FnMut(&str, &dyn ScalarRewrite) -> (String, Counters),
{
    let snapshot: Vec<(rusqlite::types::Value, Option<String>)> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {key_column}, {value_column} FROM {table}"
        ))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut totals = Counters::default();
    let mut last_log = Instant::now();
    {
        let mut update = conn.prepare(&format!(
            "UPDATE {table} SET {value_column} = ?1 WHERE {key_column} = ?2"
        ))?;
        for (key, value) in &snapshot {
            let Some(value) = value else { continue };
            let (new_value, counters) = rewrite_one(value, mapping);
            totals.add(counters);
            if &new_value != value {
                update.execute(rusqlite::params![new_value, key])?;
            }
            if last_log.elapsed().as_secs() >= PROGRESS_INTERVAL_SECS {
                log::info!(
                    "{table}.{value_column}: {} modified, {} unchanged so far",
                    totals.modified,
                    totals.ignored
                );
                last_log = Instant::now();
            }
        }
    }
    Ok(totals)
}

/// Outcome of an id-column rewrite pass over one table.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdRewriteStats {
    pub updated: u64,
    pub collapsed: u64,
}

/// Rewrites every row of `table.id_column` (a bin, str, or str-dash id
/// column) via the derived id map. Collisions caused by collapsing two
/// source rows onto the same destination id delete the losing row rather
/// than erroring out. `conn` is expected to be the caller's open
/// transaction for the table; nothing here commits it.
pub fn rewrite_id_column(
    conn: &Connection,
    table: &str,
    id_column: &str,
    id_map: &IdPathMap,
) -> Result<IdRewriteStats> {
    let snapshot: Vec<Option<String>> = {
        let mut stmt = conn.prepare(&format!("SELECT {id_column} FROM {table}"))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut stats = IdRewriteStats::default();
    {
        let mut update = conn.prepare(&format!(
            "UPDATE {table} SET {id_column} = ?1 WHERE {id_column} = ?2"
        ))?;
        let mut delete = conn.prepare(&format!("DELETE FROM {table} WHERE {id_column} = ?1"))?;
        for old_id in snapshot.iter().flatten() {
            let Some(new_id) = id_map.map.get(old_id) else {
                continue;
            };
            match update.execute(rusqlite::params![new_id, old_id]) {
                Ok(_) => stats.updated += 1,
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    delete.execute(rusqlite::params![old_id])?;
                    stats.collapsed += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(stats)
}

/// Same as [`rewrite_id_column`] but for raw 16-byte blob id columns (e.g.
/// `TypedBaseItems.guid`, `AncestorIds.ItemId`).
pub fn rewrite_id_bin_column(
    conn: &Connection,
    table: &str,
    id_column: &str,
    bin_map: &std::collections::HashMap<crate::id::codec::Bin, crate::id::codec::Bin>,
) -> Result<IdRewriteStats> {
    let snapshot: Vec<Option<Vec<u8>>> = {
        let mut stmt = conn.prepare(&format!("SELECT {id_column} FROM {table}"))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut stats = IdRewriteStats::default();
    {
        let mut update = conn.prepare(&format!(
            "UPDATE {table} SET {id_column} = ?1 WHERE {id_column} = ?2"
        ))?;
        let mut delete = conn.prepare(&format!("DELETE FROM {table} WHERE {id_column} = ?1"))?;
        for old in snapshot.iter().flatten() {
            if old.len() != 16 {
                continue;
            }
            let mut old_bin = [0u8; 16];
            old_bin.copy_from_slice(old);
            let Some(new_bin) = bin_map.get(&old_bin) else {
                continue;
            };
            match update.execute(rusqlite::params![new_bin.to_vec(), old.clone()]) {
                Ok(_) => stats.updated += 1,
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    delete.execute(rusqlite::params![old.clone()])?;
                    stats.collapsed += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathMapping;
    use std::collections::HashMap;

    fn mapping() -> PathMapping {
        let mut m = PathMapping::new('/');
        m.push("C:/JF/metadata", "/config/metadata");
        m
    }

    #[test]
    fn rewrites_path_column_and_reports_counters() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, path TEXT);
             INSERT INTO items (id, path) VALUES (1, 'C:/JF/metadata/a.jpg');
             INSERT INTO items (id, path) VALUES (2, 'unrelated-value');",
        )
        .unwrap();

        let counters = rewrite_path_column(&conn, "items", "id", "path", &mapping()).unwrap();
        assert_eq!(counters.modified, 1);
        assert_eq!(counters.ignored, 1);

        let updated: String = conn
            .query_row("SELECT path FROM items WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(updated, "/config/metadata/a.jpg");
    }

    #[test]
    fn rewrites_json_column_walking_nested_strings() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, data TEXT);
             INSERT INTO items (id, data) VALUES (1, '{\"path\":\"C:/JF/metadata/a.jpg\",\"n\":1}');",
        )
        .unwrap();

        rewrite_json_column(&conn, "items", "id", "data", &mapping()).unwrap();

        let updated: String = conn
            .query_row("SELECT data FROM items WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&updated).unwrap();
        assert_eq!(value["path"], "/config/metadata/a.jpg");
    }

    #[test]
    fn id_column_rewrite_collapses_duplicate_onto_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id TEXT UNIQUE, name TEXT);
             INSERT INTO items (id, name) VALUES ('old-a', 'first');
             INSERT INTO items (id, name) VALUES ('old-b', 'second');
             INSERT INTO items (id, name) VALUES ('same-new', 'already-there');",
        )
        .unwrap();

        let mut map = HashMap::new();
        map.insert("old-a".to_string(), "same-new".to_string());
        map.insert("old-b".to_string(), "other-new".to_string());
        let id_map = IdPathMap { map, target_path_slash: '/' };

        let stats = rewrite_id_column(&conn, "items", "id", &id_map).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.collapsed, 1);

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 2);
    }
}
