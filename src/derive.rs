// Id Derivation & Collision Analyzer (component I): recomputes every
// catalog item's identifier from its (already path-rewritten) location,
// using the same formula the server itself uses to mint ids from paths.
// Grounded in jellyfin_migrator.py::get_ids / get_dotnet_MD5.

use std::collections::HashMap;

use md5::{Digest, Md5};
use rusqlite::Connection;

use crate::id::codec::{self, Bin};
use crate::path::id_in_path::IdPathMap;

/// `new_id = MD5(UTF16LE(item_type + new_path))`, matching Jellyfin's own
/// `LibraryManager.GetNewItemId`. Never change this without changing the
/// server it targets.
pub fn derive_id(item_type: &str, path: &str) -> Bin {
    let mut units = Vec::with_capacity((item_type.len() + path.len()) * 2);
    for unit in item_type.encode_utf16().chain(path.encode_utf16()) {
        units.extend_from_slice(&unit.to_le_bytes());
    }
    let digest = Md5::digest(&units);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

/// One new id that more than one old id derived to, with enough path
/// context for the operator to judge whether the merge is expected. Old
/// paths come from the pre-rewrite source catalog when one was recorded;
/// they're `None` when it wasn't (e.g. the `id` subcommand or a direct test
/// fixture with no pass-1 source to consult).
#[derive(Debug, Clone)]
pub struct CollisionDetail {
    pub new_id: String,
    pub new_path: String,
    pub colliding: Vec<(String, Option<String>)>,
}

/// Every identifier mapping, in every textual variant, plus the raw bin
/// maps used directly against blob columns.
#[derive(Debug, Default)]
pub struct IdMaps {
    pub bin: HashMap<Bin, Bin>,
    pub ancestor_bin: HashMap<Bin, Bin>,
    pub str: HashMap<String, String>,
    pub str_dash: HashMap<String, String>,
    pub ancestor_str: HashMap<String, String>,
    pub ancestor_str_dash: HashMap<String, String>,
    /// Count of new `str` ids that more than one old id derived to. Non-zero
    /// means the migrated catalog will link some items together that
    /// shouldn't be.
    pub collisions: usize,
    pub collision_details: Vec<CollisionDetail>,
}

/// Asks the operator to confirm before pass 3 proceeds to delete colliding
/// rows. Collisions mean the path mapping merged previously distinct
/// library directories onto one target.
pub trait CollisionPrompt {
    fn confirm(&mut self, details: &[CollisionDetail]);
}

/// Blocks on stdin: Enter continues, Ctrl+C aborts the process outright.
pub struct StdinCollisionPrompt;

impl CollisionPrompt for StdinCollisionPrompt {
    fn confirm(&mut self, details: &[CollisionDetail]) {
        let total: usize = details.iter().map(|d| d.colliding.len().saturating_sub(1)).sum();
        println!("{total} id collisions detected: some catalog items will be merged.");
        for detail in details {
            println!("  new id {} -> {}", detail.new_id, detail.new_path);
            for (old_id, old_path) in &detail.colliding {
                println!("    old id {old_id} -> {}", old_path.as_deref().unwrap_or("<unknown>"));
            }
        }
        println!("Press Enter to continue, Ctrl+C to abort.");
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    }
}

impl IdMaps {
    pub fn is_empty(&self) -> bool {
        self.bin.is_empty()
    }

    /// A flat str->str lookup suitable for the id-in-path rewriter and for
    /// text id columns.
    pub fn as_path_map(&self, target_path_slash: char) -> IdPathMap {
        IdPathMap {
            map: self.str.clone(),
            target_path_slash,
        }
    }
}

/// Scans `TypedBaseItems` in the already path-rewritten library database,
/// recomputes each item's id from its current `guid`/`type`/`Path` row, and
/// builds the six-variant replacement maps plus a collision report.
///
/// `source_conn` is the pre-rewrite catalog, used only to look up the old
/// path of a colliding id for the operator prompt; pass `None` when it
/// isn't available (the old path is then reported as unknown).
pub fn derive_ids(conn: &Connection, source_conn: Option<&Connection>) -> crate::error::Result<IdMaps> {
    let mut bin = HashMap::new();
    let mut new_paths: HashMap<Bin, String> = HashMap::new();

    let mut stmt = conn.prepare("SELECT guid, type, Path FROM TypedBaseItems")?;
    let rows = stmt.query_map([], |row| {
        let guid: Vec<u8> = row.get(0)?;
        let item_type: String = row.get(1)?;
        let path: Option<String> = row.get(2)?;
        Ok((guid, item_type, path))
    })?;

    for row in rows {
        let (guid, item_type, path) = row?;
        let Some(path) = path else { continue };
        if path.is_empty() || path.starts_with('%') {
            continue;
        }
        if guid.len() != 16 {
            continue;
        }
        let mut old_bin: Bin = [0u8; 16];
        old_bin.copy_from_slice(&guid);

        let new_bin = derive_id(&item_type, &path);
        if new_bin != old_bin {
            bin.insert(old_bin, new_bin);
            new_paths.insert(old_bin, path);
        }
    }

    Ok(expand(bin, &new_paths, source_conn))
}

fn expand(bin: HashMap<Bin, Bin>, new_paths: &HashMap<Bin, String>, source_conn: Option<&Connection>) -> IdMaps {
    let mut str_map = HashMap::new();
    let mut str_dash = HashMap::new();
    let mut ancestor_bin = HashMap::new();
    let mut ancestor_str = HashMap::new();
    let mut ancestor_str_dash = HashMap::new();

    for (old, new) in &bin {
        let old_str = codec::bin_to_str(old);
        let new_str = codec::bin_to_str(new);

        let old_dash = codec::str_to_str_dash(&old_str).expect("32-char hex string");
        let new_dash = codec::str_to_str_dash(&new_str).expect("32-char hex string");
        str_dash.insert(old_dash, new_dash);

        let old_anc_bin = codec::ancestor_bin(old);
        let new_anc_bin = codec::ancestor_bin(new);
        let old_anc_str = codec::bin_to_str(&old_anc_bin);
        let new_anc_str = codec::bin_to_str(&new_anc_bin);
        ancestor_bin.insert(old_anc_bin, new_anc_bin);
        ancestor_str.insert(old_anc_str.clone(), new_anc_str.clone());
        ancestor_str_dash.insert(
            codec::str_to_str_dash(&old_anc_str).expect("32-char hex string"),
            codec::str_to_str_dash(&new_anc_str).expect("32-char hex string"),
        );

        str_map.insert(old_str, new_str);
    }

    let collision_details = collect_collisions(&bin, new_paths, source_conn);
    let collisions = collision_details.iter().map(|d| d.colliding.len() - 1).sum();

    IdMaps {
        bin,
        ancestor_bin,
        str: str_map,
        str_dash,
        ancestor_str,
        ancestor_str_dash,
        collisions,
        collision_details,
    }
}

/// Groups old ids by the new `str` id they derived to. Any group with more
/// than one member is a collision: those old ids' items will be merged onto
/// one new id.
fn collect_collisions(
    bin: &HashMap<Bin, Bin>,
    new_paths: &HashMap<Bin, String>,
    source_conn: Option<&Connection>,
) -> Vec<CollisionDetail> {
    let mut groups: HashMap<Bin, Vec<Bin>> = HashMap::new();
    for (old, new) in bin {
        groups.entry(*new).or_default().push(*old);
    }

    let mut details: Vec<CollisionDetail> = groups
        .into_iter()
        .filter(|(_, olds)| olds.len() > 1)
        .map(|(new, olds)| {
            let new_path = olds
                .first()
                .and_then(|old| new_paths.get(old))
                .cloned()
                .unwrap_or_default();
            let colliding = olds
                .iter()
                .map(|old| (codec::bin_to_str(old), lookup_old_path(source_conn, old)))
                .collect();
            CollisionDetail { new_id: codec::bin_to_str(&new), new_path, colliding }
        })
        .collect();
    details.sort_by(|a, b| a.new_id.cmp(&b.new_id));
    details
}

fn lookup_old_path(source_conn: Option<&Connection>, old_bin: &Bin) -> Option<String> {
    let conn = source_conn?;
    conn.query_row(
        "SELECT Path FROM TypedBaseItems WHERE guid = ?1",
        rusqlite::params![old_bin.to_vec()],
        |row| row.get(0),
    )
    .ok()
}
