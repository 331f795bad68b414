// Image-Descriptor Codec (component E): the pipe/star-delimited format used
// by the image cache's keyed lookups. Grammar:
//
//   descriptor := entry ('|' entry)*
//   entry      := path ('*' field)*
//
// Only the path portion of each entry is subject to rewriting; trailing
// `*field` segments (size hints, crop flags, etc.) pass through verbatim.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptor {
    pub entries: Vec<Entry>,
}

pub fn parse(s: &str) -> Descriptor {
    let entries = s
        .split('|')
        .map(|entry| {
            let mut parts = entry.split('*');
            let path = parts.next().unwrap_or("").to_string();
            let fields = parts.map(|f| f.to_string()).collect();
            Entry { path, fields }
        })
        .collect();
    Descriptor { entries }
}

pub fn serialize(desc: &Descriptor) -> String {
    desc.entries
        .iter()
        .map(|entry| {
            if entry.fields.is_empty() {
                entry.path.clone()
            } else {
                format!("{}*{}", entry.path, entry.fields.join("*"))
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Rewrites only the path component of every entry, leaving fields untouched.
pub fn rewrite_paths<F>(desc: &Descriptor, mut f: F) -> Descriptor
where
    F: FnMut(&str) -> String,
{
    Descriptor {
        entries: desc
            .entries
            .iter()
            .map(|e| Entry {
                path: f(&e.path),
                fields: e.fields.clone(),
            })
            .collect(),
    }
}
