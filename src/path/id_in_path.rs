// Id-in-Path Rewriter (component C): detects and substitutes identifier-
// shaped path components, keeping the "bucket parent" directory in lockstep.
// See jellyfin_migrator.py::recursive_id_path_replacer for the original,
// considerably more tangled, pointer-chasing version of this routine.

use std::collections::HashMap;

use super::{apply_target_slash, split_segments};
use crate::constants::ID_CHARSET;

/// A flat old-id -> new-id lookup plus the output separator, as produced by
/// the id derivation pass (component I) and consumed here and by the
/// relational rewriter's path columns.
pub struct IdPathMap {
    pub map: HashMap<String, String>,
    pub target_path_slash: char,
}

fn is_id_shaped(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| ID_CHARSET.contains(c))
}

/// Rewrites a single scalar path string. Returns the (possibly unchanged)
/// value and whether a substitution happened.
pub fn rewrite_scalar(value: &str, id_map: &IdPathMap) -> (String, bool) {
    let segs = split_segments(value);
    if segs.is_empty() {
        return (value.to_string(), false);
    }
    let (dir_segs, leaf_slice) = segs.split_at(segs.len() - 1);
    let leaf = leaf_slice[0];
    let (stem, ext) = match leaf.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, Some(e)),
        _ => (leaf, None),
    };

    // 1. File stem itself is id-shaped and known.
    if is_id_shaped(stem) {
        if let Some(new_id) = id_map.map.get(stem) {
            let new_leaf = match ext {
                Some(e) => format!("{new_id}.{e}"),
                None => new_id.clone(),
            };
            let mut new_segs: Vec<&str> = dir_segs.to_vec();
            let joined_dirs = new_segs.join("/");
            new_segs.clear();
            let out = if joined_dirs.is_empty() {
                new_leaf
            } else {
                format!("{joined_dirs}/{new_leaf}")
            };
            return (apply_target_slash(&out, id_map.target_path_slash), true);
        }
    }

    // 2. First id-shaped directory component that's known.
    let mut hit = None;
    for (i, seg) in dir_segs.iter().enumerate() {
        if is_id_shaped(seg) {
            if let Some(dst) = id_map.map.get(*seg) {
                hit = Some((i, dst.clone()));
                break;
            }
        }
    }

    let Some((idx, dst)) = hit else {
        return (value.to_string(), false);
    };

    let mut new_segs: Vec<String> = segs.iter().map(|s| s.to_string()).collect();
    let src = dir_segs[idx];
    new_segs[idx] = dst.clone();

    // 3. Bucket-parent lockstep: the parent directory's name is a proper
    // prefix of the id being replaced, so it moves with it.
    if idx > 0 {
        let parent = dir_segs[idx - 1];
        if !parent.is_empty() && parent.len() < src.len() && src.starts_with(parent) {
            let take = parent.len().min(dst.len());
            new_segs[idx - 1] = dst[..take].to_string();
        }
    }

    (apply_target_slash(&new_segs.join("/"), id_map.target_path_slash), true)
}
