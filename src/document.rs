// Document Walker (component D): recursive traversal over JSON-shaped
// documents (config files, Emby/Jellyfin sidecar json, mblink payloads).
// Only map VALUES are recursed; keys are left alone so that id-in-path or
// path rewriting never touches a field name by accident.

use serde_json::Value;

use crate::path::rewriter::Counters;

/// A classification of a leaf value, used by callers (the scanner, mostly)
/// that want to reason about a node without caring which concrete document
/// format it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
    Null,
    Other,
}

pub fn classify(value: &Value) -> Scalar<'_> {
    match value {
        Value::String(s) => Scalar::Text(s),
        Value::Null => Scalar::Null,
        _ => Scalar::Other,
    }
}

/// Walks `value` in place, applying `f` to every string leaf. `f` returns the
/// replacement text plus the counters to fold into the running total.
pub fn walk_strings_mut<F>(value: &mut Value, f: &mut F) -> Counters
where
    F: FnMut(&str) -> (String, Counters),
{
    match value {
        Value::Object(map) => {
            let mut total = Counters::default();
            for (_key, v) in map.iter_mut() {
                total.add(walk_strings_mut(v, f));
            }
            total
        }
        Value::Array(items) => {
            let mut total = Counters::default();
            for v in items.iter_mut() {
                total.add(walk_strings_mut(v, f));
            }
            total
        }
        Value::String(s) => {
            let (new_s, counters) = f(s);
            *s = new_s;
            counters
        }
        _ => Counters::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recurses_map_values_and_sequence_elements_only() {
        let mut doc = json!({
            "/config/path": "untouched-key-name",
            "nested": {
                "list": ["/old/a.jpg", "/old/b.jpg"],
                "num": 7,
            }
        });

        let counters = walk_strings_mut(&mut doc, &mut |s: &str| {
            if let Some(rest) = s.strip_prefix("/old") {
                (format!("/new{rest}"), Counters { modified: 1, ignored: 0 })
            } else {
                (s.to_string(), Counters { modified: 0, ignored: 1 })
            }
        });

        assert_eq!(doc["nested"]["list"][0], "/new/a.jpg");
        assert_eq!(doc["nested"]["list"][1], "/new/b.jpg");
        // The object key itself was never passed to the closure.
        assert!(doc.as_object().unwrap().contains_key("/config/path"));
        assert_eq!(counters.modified, 2);
        assert_eq!(counters.ignored, 1); // the untouched string value
    }

    #[test]
    fn classify_distinguishes_text_and_null() {
        assert_eq!(classify(&json!("hi")), Scalar::Text("hi"));
        assert_eq!(classify(&json!(null)), Scalar::Null);
        assert_eq!(classify(&json!(42)), Scalar::Other);
    }
}
