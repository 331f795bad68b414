// Rewriter constants

/// Byte permutation applied to the first 8 bytes of an identifier to produce
/// its "ancestor" variants. Bytes 8-15 are left untouched. The permutation is
/// its own inverse.
pub const ANCESTOR_PERMUTATION: [usize; 8] = [3, 2, 1, 0, 5, 4, 7, 6];

/// Characters an identifier-shaped path component or scanner candidate may
/// contain. Anything outside this set breaks the run.
pub const ID_CHARSET: &str = "0123456789abcdef-";

/// Minimum length of a hex run for the scanner to treat it as an id candidate.
pub const ID_CANDIDATE_MIN_LEN: usize = 32;

/// Hard-coded path markers that are real library roots but never get rewritten.
pub const SELF_MAPPED_PREFIXES: [&str; 2] = ["%AppDataPath%", "%MetadataPath%"];

/// Target spec literals recognized in job definitions.
pub const TARGET_AUTO: &str = "auto";
pub const TARGET_AUTO_EXISTING: &str = "auto-existing";

/// Emit a relational-rewrite progress line at most this often.
pub const PROGRESS_INTERVAL_SECS: u64 = 1;

/// Filename that gets its path recorded on the run context for later passes.
pub const LIBRARY_DB_FILENAME: &str = "library.db";

/// XML element tags the path/id rewrite never descends into.
pub const XML_SKIP_TAGS: [&str; 2] = ["biography", "outline"];
