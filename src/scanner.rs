// Id Scanner (component J): an independent diagnostic that looks for
// leftover occurrences of known ids anywhere in an arbitrary database file.
// Grounded in jellyfin_id_scanner.py in its entirety — this is a much more
// direct port than the rewriter components since the scanner's job (find,
// don't modify) maps onto a pure function per column.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::constants::{ID_CANDIDATE_MIN_LEN, ID_CHARSET};
use crate::error::Result;
use crate::id::codec;

/// Every known id, in every variant, shared read-only across the worker pool.
pub struct IdSets {
    pub bin: Arc<HashSet<Vec<u8>>>,
    pub ancestor_bin: Arc<HashSet<Vec<u8>>>,
    pub str: Arc<HashSet<String>>,
    pub str_dash: Arc<HashSet<String>>,
    pub ancestor_str: Arc<HashSet<String>>,
    pub ancestor_str_dash: Arc<HashSet<String>>,
}

impl IdSets {
    /// Harvests every `guid` from the catalog's `TypedBaseItems` table and
    /// expands it into all six known variants.
    pub fn load(library_conn: &Connection) -> Result<Self> {
        let mut bin = HashSet::new();
        let mut ancestor_bin = HashSet::new();
        let mut str_ = HashSet::new();
        let mut str_dash = HashSet::new();
        let mut ancestor_str = HashSet::new();
        let mut ancestor_str_dash = HashSet::new();

        let mut stmt = library_conn.prepare("SELECT guid FROM TypedBaseItems")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
        for guid in rows {
            let guid = guid?;
            if guid.len() != 16 {
                continue;
            }
            let mut b: codec::Bin = [0u8; 16];
            b.copy_from_slice(&guid);
            let variants = crate::id::IdVariants::from_bin(b)?;

            let anc_bin = codec::ancestor_bin(&b);
            bin.insert(b.to_vec());
            ancestor_bin.insert(anc_bin.to_vec());
            str_.insert(variants.str);
            str_dash.insert(variants.str_dash);
            ancestor_str.insert(variants.ancestor_str);
            ancestor_str_dash.insert(variants.ancestor_str_dash);
        }

        Ok(IdSets {
            bin: Arc::new(bin),
            ancestor_bin: Arc::new(ancestor_bin),
            str: Arc::new(str_),
            str_dash: Arc::new(str_dash),
            ancestor_str: Arc::new(ancestor_str),
            ancestor_str_dash: Arc::new(ancestor_str_dash),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    pub table: String,
    pub column: String,
    pub tags: Vec<String>,
}

fn is_index_like(name: &str) -> bool {
    if name.starts_with("idx") || name.starts_with("sqlite_autoindex") {
        return true;
    }
    name.len() >= 6 && name[name.len() - 6..name.len() - 1].eq_ignore_ascii_case("index")
}

fn table_columns(conn: &Connection) -> Result<Vec<(String, Vec<String>)>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;

    let mut out = Vec::new();
    for name in names {
        if is_index_like(&name) {
            continue;
        }
        let mut col_stmt = conn.prepare(&format!("SELECT name FROM pragma_table_info('{name}')"))?;
        let columns: Vec<String> = col_stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        out.push((name, columns));
    }
    Ok(out)
}

fn column_values(conn: &Connection, table: &str, column: &str) -> Result<Vec<Value>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT \"{column}\" FROM \"{table}\" WHERE \"{column}\" IS NOT NULL"
    ))?;
    let values = stmt
        .query_map([], |row| row.get::<_, Value>(0))?
        .collect::<std::result::Result<_, _>>()?;
    Ok(values)
}

/// Splits a string into the id-shaped runs it contains, tagging whether the
/// entire string was id-shaped ("pure") or the runs were embedded in other
/// text.
fn id_candidates(s: &str) -> (bool, HashSet<String>) {
    let cleaned: String = s
        .chars()
        .map(|c| if ID_CHARSET.contains(c) { c } else { ' ' })
        .collect();
    let is_pure = cleaned == s;
    let candidates = cleaned
        .split(' ')
        .filter(|piece| piece.len() >= ID_CANDIDATE_MIN_LEN)
        .map(|piece| piece.to_string())
        .collect();
    (is_pure, candidates)
}

fn scan_column(table: &str, column: &str, values: &[Value], id_sets: &IdSets) -> Option<ColumnReport> {
    let mut tags = Vec::new();

    if matches!(values.first(), Some(Value::Blob(_))) {
        let blobs: HashSet<&[u8]> = values
            .iter()
            .filter_map(|v| match v {
                Value::Blob(b) => Some(b.as_slice()),
                _ => None,
            })
            .collect();
        for (label, set) in [("bin", &id_sets.bin), ("ancestor-bin", &id_sets.ancestor_bin)] {
            if set.iter().any(|id| blobs.contains(id.as_slice())) {
                tags.push(format!("{label} (pure)"));
            }
        }
        return if tags.is_empty() {
            None
        } else {
            Some(ColumnReport { table: table.to_string(), column: column.to_string(), tags })
        };
    }

    let candidates: Vec<(bool, HashSet<String>)> = values
        .iter()
        .filter_map(|v| match v {
            Value::Text(s) => Some(id_candidates(s)),
            _ => None,
        })
        .filter(|(_, c)| !c.is_empty())
        .collect();

    for (label, set) in [
        ("str", &id_sets.str),
        ("str-dash", &id_sets.str_dash),
        ("ancestor-str", &id_sets.ancestor_str),
        ("ancestor-str-dash", &id_sets.ancestor_str_dash),
    ] {
        for (is_pure, cands) in &candidates {
            if cands.iter().any(|c| set.contains(c)) {
                let kind = if *is_pure { "pure" } else { "embedded" };
                tags.push(format!("{label} ({kind})"));
                break;
            }
        }
    }

    if tags.is_empty() {
        None
    } else {
        Some(ColumnReport { table: table.to_string(), column: column.to_string(), tags })
    }
}

/// Scans every table/column of `scan_conn` for occurrences of any known id,
/// fanning the per-column work out over a rayon worker pool.
pub fn scan_database(scan_conn: &Connection, id_sets: &IdSets) -> Result<Vec<ColumnReport>> {
    let mut jobs = Vec::new();
    for (table, columns) in table_columns(scan_conn)? {
        for column in columns {
            let values = column_values(scan_conn, &table, &column)?;
            if values.is_empty() {
                continue;
            }
            jobs.push((table.clone(), column, values));
        }
    }

    let mut results: Vec<ColumnReport> = jobs
        .par_iter()
        .filter_map(|(table, column, values)| scan_column(table, column, values, id_sets))
        .collect();

    results.sort_by(|a, b| {
        let key = |r: &ColumnReport| format!("{}{}{}", r.table, r.column, r.tags.join(", "));
        key(a).cmp(&key(b))
    });
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets_from(ids: &[&str]) -> IdSets {
        let mut str_ = HashSet::new();
        let mut bin = HashSet::new();
        for id in ids {
            let b = codec::str_to_bin(id).unwrap();
            str_.insert(id.to_string());
            bin.insert(b.to_vec());
        }
        IdSets {
            bin: Arc::new(bin),
            ancestor_bin: Arc::new(HashSet::new()),
            str: Arc::new(str_),
            str_dash: Arc::new(HashSet::new()),
            ancestor_str: Arc::new(HashSet::new()),
            ancestor_str_dash: Arc::new(HashSet::new()),
        }
    }

    #[test]
    fn index_like_names_are_filtered() {
        assert!(is_index_like("idx_foo"));
        assert!(is_index_like("sqlite_autoindex_foo_1"));
        assert!(is_index_like("TagIndex1"));
        assert!(!is_index_like("TypedBaseItems"));
    }

    #[test]
    fn detects_pure_binary_id() {
        let id = "71abcdef000000000000000000000001";
        // truncate to 32 chars for a valid id
        let id = &id[..32];
        let sets = sets_from(&[id]);
        let blob = codec::str_to_bin(id).unwrap().to_vec();
        let values = vec![Value::Blob(blob), Value::Blob(vec![9; 16])];
        let report = scan_column("Chapters", "ItemId", &values, &sets).unwrap();
        assert_eq!(report.tags, vec!["bin (pure)"]);
    }

    #[test]
    fn detects_embedded_string_id() {
        let id = "71abcdef0000000000000000000000ab";
        let sets = sets_from(&[id]);
        let values = vec![Value::Text(format!("{{\"ItemId\":\"{id}\"}}"))];
        let report = scan_column("UserData", "Payload", &values, &sets).unwrap();
        assert_eq!(report.tags, vec!["str (embedded)"]);
    }

    #[test]
    fn pure_string_id_is_tagged_pure_not_embedded() {
        let id = "71abcdef0000000000000000000000ab";
        let sets = sets_from(&[id]);
        let values = vec![Value::Text(id.to_string())];
        let report = scan_column("UserData", "ItemIdStr", &values, &sets).unwrap();
        assert_eq!(report.tags, vec!["str (pure)"]);
    }

    #[test]
    fn no_match_returns_none() {
        let sets = sets_from(&["71abcdef0000000000000000000000ab"]);
        let values = vec![Value::Text("nothing interesting here".to_string())];
        assert!(scan_column("UserData", "Notes", &values, &sets).is_none());
    }
}
