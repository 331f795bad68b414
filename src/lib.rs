// Rewrites a media-server catalog database and its on-disk artifacts onto a
// new path layout: three sequential passes (path rewrite, id derivation, id
// rewrite) plus a file-date reconciliation epilogue, driven by a JSON run
// configuration.

pub mod config;
pub mod constants;
pub mod db;
pub mod derive;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod id;
pub mod image_descriptor;
pub mod job_runner;
pub mod orchestrator;
pub mod path;
pub mod reconcile;
pub mod run_context;
pub mod scanner;
