// Orchestrator (component K): sequences the three passes against one
// `RunConfig`, then runs the file-date reconciliation epilogue. Grounded in
// jellyfin_migrator.py's `main`, which runs the same three job lists back
// to back and threads the derived id map from pass 2 into pass 3.

use rusqlite::Connection;

use crate::config::RunConfig;
use crate::derive::{self, CollisionPrompt};
use crate::dispatch::InPlacePrompt;
use crate::error::{MigrateError, Result};
use crate::job_runner;
use crate::reconcile;
use crate::run_context::RunContext;

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub collisions: usize,
    pub dates_fixed: u64,
    pub dates_missing_files: u64,
}

/// Runs pass 1 (path rewrite), derives ids from the relocated catalog, runs
/// pass 3 (id-path rewrite + id rewrite), then reconciles file dates.
pub fn run(
    cfg: &RunConfig,
    prompt: &mut dyn InPlacePrompt,
    collision_prompt: &mut dyn CollisionPrompt,
) -> Result<RunSummary> {
    let mut ctx = RunContext::new();

    log::info!("pass 1: rewriting paths ({} jobs)", cfg.path_jobs.len());
    job_runner::run_path_jobs(&cfg.path_jobs, cfg, &mut ctx, prompt)?;

    let library_db_path = ctx.library_db_target_path.clone().ok_or_else(|| {
        MigrateError::Config(
            "pass 1 never produced a library.db target; check path_jobs".to_string(),
        )
    })?;

    log::info!("pass 2: deriving ids from {}", library_db_path.display());
    let id_maps = {
        let conn = Connection::open(&library_db_path)?;
        let source_conn = ctx
            .library_db_source_path
            .as_ref()
            .map(Connection::open)
            .transpose()?;
        derive::derive_ids(&conn, source_conn.as_ref())?
    };
    if id_maps.collisions > 0 {
        log::warn!("{} id collisions detected among the newly derived ids", id_maps.collisions);
        collision_prompt.confirm(&id_maps.collision_details);
    }
    let collisions = id_maps.collisions;

    let id_path_map = id_maps.as_path_map(cfg.fs_path_replacements.target_path_slash);
    ctx.id_maps = Some(id_maps);

    log::info!("pass 3a: rewriting id-shaped paths ({} jobs)", cfg.id_path_jobs.len());
    job_runner::run_id_path_jobs(&cfg.id_path_jobs, cfg, &mut ctx, &id_path_map, prompt)?;

    log::info!("pass 3b: rewriting catalog id columns ({} jobs)", cfg.id_jobs.len());
    let id_maps = ctx
        .id_maps
        .take()
        .expect("set immediately above, before either pass 3 job list runs");
    job_runner::run_id_jobs(&cfg.id_jobs, cfg, &mut ctx, &id_maps, prompt)?;
    ctx.id_maps = Some(id_maps);

    log::info!("reconciling file dates against {}", library_db_path.display());
    let mut conn = Connection::open(&library_db_path)?;
    let date_stats = reconcile::reconcile_dates(&mut conn)?;
    if date_stats.missing_files > 0 {
        log::warn!(
            "{} catalog rows referenced a file that no longer exists",
            date_stats.missing_files
        );
    }

    Ok(RunSummary {
        collisions,
        dates_fixed: date_stats.fixed,
        dates_missing_files: date_stats.missing_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdTableSpec, Job, Target};
    use crate::path::PathMapping;
    use std::collections::HashMap;

    struct AlwaysYes;
    impl InPlacePrompt for AlwaysYes {
        fn ask(&mut self, _path: &std::path::Path) -> crate::dispatch::InPlaceDecision {
            crate::dispatch::InPlaceDecision::Yes
        }
    }

    struct PanicOnCollision;
    impl CollisionPrompt for PanicOnCollision {
        fn confirm(&mut self, details: &[crate::derive::CollisionDetail]) {
            panic!("unexpected collisions in a test with none: {details:?}");
        }
    }

    #[test]
    fn full_run_derives_ids_and_reconciles_dates() {
        let dir = tempfile::tempdir().unwrap();
        let source_root = dir.path().join("source");
        let target_root = dir.path().join("target");
        std::fs::create_dir_all(&source_root).unwrap();

        let movie_path = source_root.join("movie.mkv");
        std::fs::write(&movie_path, b"data").unwrap();

        let db_path = source_root.join("library.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE TypedBaseItems (guid BLOB, type TEXT, Path TEXT, DateCreated TEXT, DateModified TEXT);",
            )
            .unwrap();
            let old_guid = derive::derive_id("Movie", "C:/old/movie.mkv");
            conn.execute(
                "INSERT INTO TypedBaseItems (guid, type, Path, DateCreated, DateModified) VALUES (?1, 'Movie', ?2, '0001-01-01T00:00:00.0000000Z', '0001-01-01T00:00:00.0000000Z')",
                rusqlite::params![old_guid.to_vec(), movie_path.to_string_lossy()],
            )
            .unwrap();
        }

        let mut tables = HashMap::new();
        tables.insert(
            "TypedBaseItems".to_string(),
            crate::config::TableSpec {
                path_columns: vec!["Path".to_string()],
                jf_image_columns: vec![],
                json_columns: vec![],
            },
        );

        let mut id_tables = HashMap::new();
        id_tables.insert(
            "TypedBaseItems".to_string(),
            IdTableSpec { bin: vec!["guid".to_string()], ..Default::default() },
        );

        let cfg = RunConfig {
            original_root: source_root.clone(),
            source_root: source_root.clone(),
            target_root: target_root.clone(),
            path_replacements: {
                let mut m = PathMapping::new('/');
                m.push(source_root.to_string_lossy(), target_root.to_string_lossy());
                m
            },
            fs_path_replacements: PathMapping::new('/'),
            path_jobs: vec![
                Job {
                    source: "library.db".to_string(),
                    target: Target::Auto,
                    tables,
                    id_tables: HashMap::new(),
                    copy_only: false,
                    no_log: true,
                },
                Job {
                    source: "movie.mkv".to_string(),
                    target: Target::Auto,
                    tables: HashMap::new(),
                    id_tables: HashMap::new(),
                    copy_only: true,
                    no_log: true,
                },
            ],
            id_path_jobs: vec![],
            id_jobs: vec![Job {
                source: "library.db".to_string(),
                target: Target::AutoExisting,
                tables: HashMap::new(),
                id_tables,
                copy_only: false,
                no_log: true,
            }],
            log_level: "info".to_string(),
            log_file: None,
        };

        let mut prompt = AlwaysYes;
        let mut collision_prompt = PanicOnCollision;
        let summary = run(&cfg, &mut prompt, &mut collision_prompt).unwrap();
        assert_eq!(summary.collisions, 0);
        assert_eq!(summary.dates_fixed, 1);

        let target_db = target_root.join("library.db");
        let conn = Connection::open(target_db).unwrap();
        let guid: Vec<u8> = conn
            .query_row("SELECT guid FROM TypedBaseItems", [], |r| r.get(0))
            .unwrap();
        let target_movie = target_root.join("movie.mkv");
        let expected = derive::derive_id("Movie", &target_movie.to_string_lossy());
        assert_eq!(guid, expected.to_vec());
    }
}
