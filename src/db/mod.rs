// Database module: the relational rewriter is the only catalog-facing
// piece left here — opening, migrating, and owning the schema belongs to
// the server whose catalog this tool migrates, not to this tool.

pub mod relational;
