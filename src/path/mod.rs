// Path mapping primitives shared by the path rewriter and id-in-path rewriter.

pub mod id_in_path;
pub mod rewriter;

use serde::{Deserialize, Serialize};

/// An ordered source->destination prefix table plus the output separator.
/// Insertion order is load-bearing: the first matching prefix wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMapping {
    pub entries: Vec<(String, String)>,
    pub target_path_slash: char,
    #[serde(default)]
    pub log_no_warnings: bool,
}

impl PathMapping {
    pub fn new(target_path_slash: char) -> Self {
        PathMapping {
            entries: Vec::new(),
            target_path_slash,
            log_no_warnings: false,
        }
    }

    pub fn push(&mut self, source_prefix: impl Into<String>, dest_prefix: impl Into<String>) {
        self.entries.push((source_prefix.into(), dest_prefix.into()));
    }
}

/// Splits a path-ish string into segments on either `/` or `\`, dropping
/// empty segments produced by a leading separator, a drive-relative prefix,
/// or doubled separators.
pub(crate) fn split_segments(s: &str) -> Vec<&str> {
    s.split(['/', '\\']).filter(|seg| !seg.is_empty()).collect()
}

pub(crate) fn apply_target_slash(s: &str, target_path_slash: char) -> String {
    if target_path_slash == '/' {
        s.to_string()
    } else {
        s.replace('/', &target_path_slash.to_string())
    }
}

/// Unifies the path rewriter and the id-in-path rewriter behind one scalar
/// transform, so database column and document-walking code doesn't need to
/// know which pass is currently running.
pub trait ScalarRewrite {
    fn rewrite(&self, value: &str) -> (String, rewriter::Counters);
}

impl ScalarRewrite for PathMapping {
    fn rewrite(&self, value: &str) -> (String, rewriter::Counters) {
        rewriter::rewrite_with_counters(value, self)
    }
}

impl ScalarRewrite for id_in_path::IdPathMap {
    fn rewrite(&self, value: &str) -> (String, rewriter::Counters) {
        let (out, matched) = id_in_path::rewrite_scalar(value, self);
        let counters = if matched {
            rewriter::Counters { modified: 1, ignored: 0 }
        } else {
            rewriter::Counters { modified: 0, ignored: 1 }
        };
        (out, counters)
    }
}
