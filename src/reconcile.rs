// File-date reconciliation epilogue (trivial stat-and-update, run after
// pass 3): the catalog stores `DateCreated`/`DateModified` as .NET tick
// counts rendered as ISO-8601 text. A path rewrite or a file move can leave
// a row pointing at a sentinel value from before epoch 1 (a negative tick
// count) if the source server never set it; this pass stats the file on
// disk and fills those in. Every timestamp here is treated as UTC per the
// run's documented timezone assumption.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// Ticks (100ns units) between 0001-01-01T00:00:00 and the Unix epoch.
const DOTNET_TICK_EPOCH_OFFSET: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

fn unix_to_ticks(dt: DateTime<Utc>) -> i64 {
    let secs = dt.timestamp();
    let subsec_ticks = i64::from(dt.timestamp_subsec_nanos()) / 100;
    secs * TICKS_PER_SECOND + subsec_ticks + DOTNET_TICK_EPOCH_OFFSET
}

fn ticks_to_iso(ticks: i64) -> String {
    let unix_ticks = ticks - DOTNET_TICK_EPOCH_OFFSET;
    let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let sub_ticks = unix_ticks.rem_euclid(TICKS_PER_SECOND);
    let nanos = (sub_ticks * 100) as u32;
    let naive = DateTime::from_timestamp(secs, nanos)
        .unwrap_or_else(|| DateTime::from_timestamp(0, 0).expect("epoch is valid"))
        .naive_utc();
    format!("{}Z", naive.format("%Y-%m-%dT%H:%M:%S%.7f"))
}

fn parse_iso_ticks(s: &str) -> Option<i64> {
    let trimmed = s.trim_end_matches('Z');
    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(unix_to_ticks(naive.and_utc()))
}

fn is_negative_tick(s: &str) -> bool {
    parse_iso_ticks(s).is_none_or(|ticks| ticks < 0)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileStats {
    pub fixed: u64,
    pub missing_files: u64,
}

/// Stats every path referenced by `TypedBaseItems` and overwrites
/// `DateCreated`/`DateModified` with the filesystem's timestamps wherever
/// the stored value is missing or predates the .NET epoch.
pub fn reconcile_dates(conn: &mut Connection) -> Result<ReconcileStats> {
    let snapshot: Vec<(i64, String, Option<String>, Option<String>)> = {
        let mut stmt =
            conn.prepare("SELECT rowid, Path, DateCreated, DateModified FROM TypedBaseItems")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        rows.collect::<std::result::Result<_, _>>()?
    };

    let mut stats = ReconcileStats::default();
    let tx = conn.transaction()?;
    {
        let mut update =
            tx.prepare("UPDATE TypedBaseItems SET DateCreated = ?1, DateModified = ?2 WHERE rowid = ?3")?;
        for (rowid, path, created, modified) in &snapshot {
            let needs_created = created.as_deref().is_none_or(is_negative_tick);
            let needs_modified = modified.as_deref().is_none_or(is_negative_tick);
            if !needs_created && !needs_modified {
                continue;
            }

            let Ok(meta) = std::fs::metadata(path) else {
                stats.missing_files += 1;
                continue;
            };

            let new_created = if needs_created {
                meta.created().ok().map(|t| ticks_to_iso(unix_to_ticks(t.into())))
            } else {
                created.clone()
            };
            let new_modified = if needs_modified {
                meta.modified().ok().map(|t| ticks_to_iso(unix_to_ticks(t.into())))
            } else {
                modified.clone()
            };

            if let (Some(new_created), Some(new_modified)) = (new_created, new_modified) {
                update.execute(rusqlite::params![new_created, new_modified, rowid])?;
                stats.fixed += 1;
            }
        }
    }
    tx.commit()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_iso_round_trip_is_stable() {
        let dt = DateTime::parse_from_rfc3339("2023-06-15T12:30:00Z").unwrap().with_timezone(&Utc);
        let ticks = unix_to_ticks(dt);
        let iso = ticks_to_iso(ticks);
        assert_eq!(parse_iso_ticks(&iso), Some(ticks));
    }

    #[test]
    fn negative_and_unparseable_values_are_flagged() {
        assert!(is_negative_tick("0001-01-01T00:00:00.0000000Z"));
        assert!(is_negative_tick("not-a-date"));
        assert!(!is_negative_tick("2023-06-15T12:30:00.0000000Z"));
    }

    #[test]
    fn reconcile_fills_in_missing_dates_from_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        std::fs::write(&file, b"data").unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE TypedBaseItems (Path TEXT, DateCreated TEXT, DateModified TEXT);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO TypedBaseItems (Path, DateCreated, DateModified) VALUES (?1, '0001-01-01T00:00:00.0000000Z', '0001-01-01T00:00:00.0000000Z')",
            rusqlite::params![file.to_string_lossy()],
        )
        .unwrap();

        let stats = reconcile_dates(&mut conn).unwrap();
        assert_eq!(stats.fixed, 1);
        assert_eq!(stats.missing_files, 0);

        let created: String = conn
            .query_row("SELECT DateCreated FROM TypedBaseItems", [], |r| r.get(0))
            .unwrap();
        assert!(!is_negative_tick(&created));
    }

    #[test]
    fn reconcile_counts_missing_files_without_erroring() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE TypedBaseItems (Path TEXT, DateCreated TEXT, DateModified TEXT);
             INSERT INTO TypedBaseItems (Path, DateCreated, DateModified)
             VALUES ('/does/not/exist.mkv', '0001-01-01T00:00:00.0000000Z', '0001-01-01T00:00:00.0000000Z');",
        )
        .unwrap();

        let stats = reconcile_dates(&mut conn).unwrap();
        assert_eq!(stats.fixed, 0);
        assert_eq!(stats.missing_files, 1);
    }
}
