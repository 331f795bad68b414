// Explicit run state threaded through the orchestrator, replacing the
// module-level globals the original tool used for the same three pieces of
// state (the derived id map, the located library.db, and the user's
// decision about in-place warnings).

use std::path::PathBuf;

use crate::derive::IdMaps;

#[derive(Debug, Default)]
pub struct RunContext {
    pub id_maps: Option<IdMaps>,
    pub library_db_target_path: Option<PathBuf>,
    /// Pre-rewrite location of library.db, recorded in pass 1 before the
    /// copy is made. Id derivation reads old paths for colliding ids from
    /// here, since pass 1 overwrites the target's own Path column in place.
    pub library_db_source_path: Option<PathBuf>,
    /// Once the user answers "always" to the "you're about to overwrite your
    /// source file in place" prompt, no further job in this run asks again.
    pub skip_inplace_prompt: bool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}
