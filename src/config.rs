// Run configuration (component L): the JSON-deserializable description of
// one migration run — path mappings, job lists, and the three root paths
// `get_target` needs to resolve "auto" targets.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::path::PathMapping;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Resolve the destination by rewriting `source` through `original_root`
    /// / `path_replacements` / `fs_path_replacements`, then copy the file.
    Auto,
    /// Same resolution as `Auto`, but the file must already exist there —
    /// used by the id-rewrite passes, which run after the copy pass.
    AutoExisting,
    /// Work on this exact path; no copy is performed.
    Explicit(PathBuf),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSpec {
    #[serde(default)]
    pub path_columns: Vec<String>,
    #[serde(default)]
    pub jf_image_columns: Vec<String>,
    #[serde(default)]
    pub json_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTableSpec {
    #[serde(default)]
    pub str: Vec<String>,
    #[serde(rename = "str-dash", default)]
    pub str_dash: Vec<String>,
    #[serde(rename = "ancestor-str", default)]
    pub ancestor_str: Vec<String>,
    #[serde(rename = "ancestor-str-dash", default)]
    pub ancestor_str_dash: Vec<String>,
    #[serde(default)]
    pub bin: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Glob pattern (may contain no wildcard at all), relative to `source_root`.
    pub source: String,
    pub target: Target,
    #[serde(default)]
    pub tables: HashMap<String, TableSpec>,
    #[serde(default)]
    pub id_tables: HashMap<String, IdTableSpec>,
    #[serde(default)]
    pub copy_only: bool,
    #[serde(default)]
    pub no_log: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub original_root: PathBuf,
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub path_replacements: PathMapping,
    pub fs_path_replacements: PathMapping,
    pub path_jobs: Vec<Job>,
    pub id_path_jobs: Vec<Job>,
    pub id_jobs: Vec<Job>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RunConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| MigrateError::Json {
            context: format!("parsing run config {}", path.display()),
            source,
        })
    }
}
