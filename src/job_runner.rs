// Job Runner (component H): walks an ordered job list, expanding glob
// sources relative to `source_root` and making sure a catch-all copy-only
// job never reprocesses a file an earlier, more specific job already
// touched. Grounded in jellyfin_migrator.py::process_files.

use std::collections::HashSet;
use std::path::PathBuf;

use rusqlite::Connection;

use crate::config::{Job, RunConfig};
use crate::constants::LIBRARY_DB_FILENAME;
use crate::db::relational;
use crate::derive::IdMaps;
use crate::dispatch::{self, InPlacePrompt};
use crate::error::{MigrateError, Result};
use crate::path::id_in_path::IdPathMap;
use crate::run_context::RunContext;

fn expand_job_sources(job: &Job, cfg: &RunConfig) -> Result<Vec<PathBuf>> {
    let pattern = cfg.source_root.join(&job.source);
    if !job.source.contains('*') {
        return Ok(vec![pattern]);
    }
    let pattern_str = pattern.to_string_lossy().into_owned();
    let mut matches = Vec::new();
    for entry in glob::glob(&pattern_str)? {
        let path = entry.map_err(|e| MigrateError::Other(e.to_string()))?;
        if !path.is_dir() {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

/// Pass 1: copies and rewrites plain paths (component B), per `path_jobs`.
pub fn run_path_jobs(
    jobs: &[Job],
    cfg: &RunConfig,
    ctx: &mut RunContext,
    prompt: &mut dyn InPlacePrompt,
) -> Result<()> {
    let mut done: HashSet<PathBuf> = HashSet::new();
    for job in jobs {
        log::info!("path job: {}", job.source);
        for src in expand_job_sources(job, cfg)? {
            if !done.insert(src.clone()) {
                continue;
            }
            if src.file_name().and_then(|n| n.to_str()) == Some(LIBRARY_DB_FILENAME) {
                ctx.library_db_source_path = Some(src.clone());
            }
            let Some(target) =
                dispatch::resolve_target(&src, &job.target, cfg, ctx, job.no_log, prompt)?
            else {
                continue;
            };
            dispatch::process_file(
                &target,
                &cfg.path_replacements,
                &job.tables,
                job.copy_only,
                None,
                ctx,
            )?;
        }
    }
    Ok(())
}

/// Pass 3.1: rewrites id-shaped path components and moves files/folders
/// that live under an id-named directory, per `id_path_jobs`.
pub fn run_id_path_jobs(
    jobs: &[Job],
    cfg: &RunConfig,
    ctx: &mut RunContext,
    id_map: &IdPathMap,
    prompt: &mut dyn InPlacePrompt,
) -> Result<()> {
    let mut done: HashSet<PathBuf> = HashSet::new();
    for job in jobs {
        log::info!("id-path job: {}", job.source);
        for src in expand_job_sources(job, cfg)? {
            if !done.insert(src.clone()) {
                continue;
            }
            let Some(target) =
                dispatch::resolve_target(&src, &job.target, cfg, ctx, job.no_log, prompt)?
            else {
                continue;
            };
            dispatch::process_file(&target, id_map, &job.tables, job.copy_only, Some(id_map), ctx)?;
        }
    }
    Ok(())
}

/// Pass 3.2: rewrites every remaining occurrence of an id in the catalog's
/// own relational tables, per `id_jobs`.
pub fn run_id_jobs(
    jobs: &[Job],
    cfg: &RunConfig,
    ctx: &mut RunContext,
    id_maps: &IdMaps,
    prompt: &mut dyn InPlacePrompt,
) -> Result<()> {
    let str_map = IdPathMap { map: id_maps.str.clone(), target_path_slash: '/' };
    let str_dash_map = IdPathMap { map: id_maps.str_dash.clone(), target_path_slash: '/' };
    let ancestor_str_map = IdPathMap { map: id_maps.ancestor_str.clone(), target_path_slash: '/' };
    let ancestor_str_dash_map =
        IdPathMap { map: id_maps.ancestor_str_dash.clone(), target_path_slash: '/' };

    let mut done: HashSet<PathBuf> = HashSet::new();
    for job in jobs {
        log::info!("id job: {}", job.source);
        for src in expand_job_sources(job, cfg)? {
            if !done.insert(src.clone()) {
                continue;
            }
            let Some(target) =
                dispatch::resolve_target(&src, &job.target, cfg, ctx, job.no_log, prompt)?
            else {
                continue;
            };

            let mut conn = Connection::open(&target)?;
            for (table, spec) in &job.id_tables {
                let tx = conn.transaction()?;
                for column in &spec.str {
                    relational::rewrite_id_column(&tx, table, column, &str_map)?;
                }
                for column in &spec.str_dash {
                    relational::rewrite_id_column(&tx, table, column, &str_dash_map)?;
                }
                for column in &spec.ancestor_str {
                    relational::rewrite_id_column(&tx, table, column, &ancestor_str_map)?;
                }
                for column in &spec.ancestor_str_dash {
                    relational::rewrite_id_column(&tx, table, column, &ancestor_str_dash_map)?;
                }
                for column in &spec.bin {
                    relational::rewrite_id_bin_column(&tx, table, column, &id_maps.bin)?;
                }
                tx.commit()?;
            }
        }
    }
    Ok(())
}
