// Path Rewriter (component B): longest-prefix path remapping with slash
// normalization. See jellyfin_migrator.py::recursive_root_path_replacer for
// the original single-pass version this generalizes.

use super::{apply_target_slash, split_segments, PathMapping};

/// Running totals a caller accumulates across a whole document or column.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub modified: u64,
    pub ignored: u64,
}

impl Counters {
    pub fn add(&mut self, other: Counters) {
        self.modified += other.modified;
        self.ignored += other.ignored;
    }
}

/// Rewrites a single scalar string against the mapping. Returns the
/// (possibly unchanged) value and whether it matched a prefix.
pub fn rewrite_scalar(value: &str, mapping: &PathMapping) -> (String, bool) {
    let value_segs = split_segments(value);

    for (src, dst) in &mapping.entries {
        let src_segs = split_segments(src);
        if src_segs.is_empty() {
            continue;
        }
        if value_segs.len() >= src_segs.len() && value_segs[..src_segs.len()] == src_segs[..] {
            let remainder = &value_segs[src_segs.len()..];
            let mut out = dst.replace('\\', "/").trim_end_matches('/').to_string();
            for seg in remainder {
                out.push('/');
                out.push_str(seg);
            }
            return (apply_target_slash(&out, mapping.target_path_slash), true);
        }
    }

    (value.to_string(), false)
}

/// Rewrites a scalar, logging a "missed path" diagnostic when nothing
/// matched and the value looks like a real, non-trivial path.
pub fn rewrite_with_counters(value: &str, mapping: &PathMapping) -> (String, Counters) {
    let (out, matched) = rewrite_scalar(value, mapping);
    let mut counters = Counters::default();
    if matched {
        counters.modified = 1;
    } else {
        counters.ignored = 1;
        if looks_like_path(value) && !mapping.log_no_warnings {
            log::warn!("missed path: no entry to change this (presumed) path: {value}");
        }
    }
    (out, counters)
}

fn looks_like_path(value: &str) -> bool {
    if value.starts_with("http:") || value.starts_with("https:") {
        return false;
    }
    split_segments(value).len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: &[(&str, &str)]) -> PathMapping {
        let mut m = PathMapping::new('/');
        for (s, d) in entries {
            m.push(*s, *d);
        }
        m
    }

    #[test]
    fn prefix_specificity_more_specific_wins_when_listed_first() {
        let m = mapping(&[("/a/b", "/x"), ("/a", "/y")]);
        assert_eq!(rewrite_scalar("/a/b/c.txt", &m).0, "/x/c.txt");
        assert_eq!(rewrite_scalar("/a/c.txt", &m).0, "/y/c.txt");
    }

    #[test]
    fn segment_boundary_rejects_textual_prefix_match() {
        let m = mapping(&[("/a/b", "/x")]);
        let (out, matched) = rewrite_scalar("/a/bc/d", &m);
        assert!(!matched);
        assert_eq!(out, "/a/bc/d");
    }

    #[test]
    fn idempotent_when_destination_not_itself_matched() {
        let m = mapping(&[("C:/JF", "/config/data")]);
        let once = rewrite_scalar("C:/JF/metadata/a/poster.jpg", &m).0;
        let twice = rewrite_scalar(&once, &m).0;
        assert_eq!(once, twice);
        assert_eq!(once, "/config/data/metadata/a/poster.jpg");
    }

    #[test]
    fn target_slash_is_applied_globally() {
        let m = mapping(&[("C:/JF", "D:/new")]);
        let mut m = m;
        m.target_path_slash = '\\';
        let out = rewrite_scalar("C:/JF/metadata/a.jpg", &m).0;
        assert_eq!(out, "D:\\new\\metadata\\a.jpg");
    }

    #[test]
    fn self_mapped_prefix_only_normalizes_slashes() {
        let m = mapping(&[("%MetadataPath%", "%MetadataPath%")]);
        let out = rewrite_scalar("%MetadataPath%\\lib\\71\\x.jpg", &m).0;
        assert_eq!(out, "%MetadataPath%/lib/71/x.jpg");
    }

    #[test]
    fn unmatched_path_passes_through() {
        let m = mapping(&[("/a", "/b")]);
        let (out, matched) = rewrite_scalar("/zzz/top/secret", &m);
        assert!(!matched);
        assert_eq!(out, "/zzz/top/secret");
    }
}
