// File Dispatcher (component G): resolves where a job's target file lives,
// copies it into place when required, and hands its contents to the right
// format-specific rewriter. Grounded in jellyfin_migrator.py's `get_target`
// and `process_file`.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use rusqlite::Connection;

use crate::config::{RunConfig, Target, TableSpec};
use crate::constants::{LIBRARY_DB_FILENAME, XML_SKIP_TAGS};
use crate::db::relational;
use crate::document;
use crate::error::{MigrateError, Result};
use crate::path::id_in_path::IdPathMap;
use crate::path::rewriter::Counters;
use crate::path::ScalarRewrite;
use crate::run_context::RunContext;

/// What the user decided when asked "you're about to overwrite the source
/// file in place".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InPlaceDecision {
    Yes,
    No,
    Always,
}

pub trait InPlacePrompt {
    fn ask(&mut self, path: &Path) -> InPlaceDecision;
}

/// Reads y/n/a from stdin, looping until a valid answer is given. Used by
/// the CLI binary; tests use a scripted prompt instead.
pub struct StdinPrompt;

impl InPlacePrompt for StdinPrompt {
    fn ask(&mut self, path: &Path) -> InPlaceDecision {
        loop {
            print!(
                "Warning! About to work on the original file {}. Continue? [Y]es, [N]o, [A]lways: ",
                path.display()
            );
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return InPlaceDecision::No;
            }
            match line.trim().to_lowercase().chars().next() {
                Some('y') | Some('j') => return InPlaceDecision::Yes,
                Some('n') => return InPlaceDecision::No,
                Some('a') => return InPlaceDecision::Always,
                _ => continue,
            }
        }
    }
}

fn compute_auto_target(source: &Path, cfg: &RunConfig) -> Result<PathBuf> {
    let relative = source.strip_prefix(&cfg.source_root).map_err(|_| {
        MigrateError::Config(format!(
            "{} is not under source_root {}",
            source.display(),
            cfg.source_root.display()
        ))
    })?;
    let original_source = cfg.original_root.join(relative);

    let (step1, _) = crate::path::rewriter::rewrite_scalar(
        &original_source.to_string_lossy(),
        &cfg.path_replacements,
    );
    let (step2, _) = crate::path::rewriter::rewrite_scalar(&step1, &cfg.fs_path_replacements);

    let rel = step2.trim_start_matches(['/', '\\']);
    Ok(cfg.target_root.join(rel))
}

/// Resolves a job's source into a concrete target path, copying the file
/// into place unless the target is `AutoExisting` or the job is an explicit
/// in-place edit the user has approved.
pub fn resolve_target(
    source: &Path,
    target_spec: &Target,
    cfg: &RunConfig,
    ctx: &mut RunContext,
    no_log: bool,
    prompt: &mut dyn InPlacePrompt,
) -> Result<Option<PathBuf>> {
    let (target, skip_copy) = match target_spec {
        Target::Explicit(p) => (p.clone(), false),
        Target::Auto => (compute_auto_target(source, cfg)?, false),
        Target::AutoExisting => (compute_auto_target(source, cfg)?, true),
    };

    if source == target {
        if ctx.skip_inplace_prompt {
            return Ok(Some(target));
        }
        return Ok(match prompt.ask(source) {
            InPlaceDecision::Yes => Some(target),
            InPlaceDecision::Always => {
                ctx.skip_inplace_prompt = true;
                Some(target)
            }
            InPlaceDecision::No => None,
        });
    }

    if !skip_copy {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !no_log {
            log::info!("copying {} -> {}", source.display(), target.display());
        }
        std::fs::copy(source, &target)?;
    }
    Ok(Some(target))
}

/// Processes one resolved target file in place, dispatching on extension.
/// `also_move_id_path` is set only during the id-path pass, where a file's
/// own name/parent may itself be id-shaped and need relocating.
pub fn process_file(
    target: &Path,
    rewriter: &dyn ScalarRewrite,
    tables: &HashMap<String, TableSpec>,
    copy_only: bool,
    also_move_id_path: Option<&IdPathMap>,
    ctx: &mut RunContext,
) -> Result<PathBuf> {
    if copy_only || target.is_dir() {
        return Ok(target.to_path_buf());
    }

    match target.extension().and_then(|e| e.to_str()) {
        Some("db") => {
            if target.file_name().and_then(|n| n.to_str()) == Some(LIBRARY_DB_FILENAME) {
                ctx.library_db_target_path = Some(target.to_path_buf());
            }
            process_db_file(target, rewriter, tables)?;
        }
        Some("xml") | Some("nfo") => process_xml_file(target, rewriter)?,
        Some("mblink") => process_mblink_file(target, rewriter)?,
        Some("json") => process_json_file(target, rewriter)?,
        _ => {}
    }

    if let Some(id_map) = also_move_id_path {
        let (new_path_str, matched) =
            crate::path::id_in_path::rewrite_scalar(&target.to_string_lossy(), id_map);
        if matched {
            let new_path = PathBuf::from(new_path_str);
            if let Some(parent) = new_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(target, &new_path)?;
            log::info!("moved id-shaped path {} -> {}", target.display(), new_path.display());
            return Ok(new_path);
        }
    }

    Ok(target.to_path_buf())
}

fn process_db_file(
    target: &Path,
    rewriter: &dyn ScalarRewrite,
    tables: &HashMap<String, TableSpec>,
) -> Result<()> {
    let mut conn = Connection::open(target)?;
    for (table, spec) in tables {
        let mut total = Counters::default();
        let tx = conn.transaction()?;
        for column in &spec.path_columns {
            total.add(relational::rewrite_path_column(&tx, table, "rowid", column, rewriter)?);
        }
        for column in &spec.jf_image_columns {
            total.add(relational::rewrite_image_descriptor_column(
                &tx, table, "rowid", column, rewriter,
            )?);
        }
        for column in &spec.json_columns {
            total.add(relational::rewrite_json_column(&tx, table, "rowid", column, rewriter)?);
        }
        tx.commit()?;
        log::info!(
            "{}: table {table}: {} modified, {} unchanged",
            target.display(),
            total.modified,
            total.ignored
        );
    }
    Ok(())
}

fn process_xml_file(target: &Path, rewriter: &dyn ScalarRewrite) -> Result<()> {
    let input = std::fs::read(target)?;
    let (output, counters) = rewrite_xml_bytes(&input, rewriter)?;
    log::info!(
        "{}: {} elements processed, {} modified",
        target.display(),
        counters.modified + counters.ignored,
        counters.modified
    );
    std::fs::write(target, output)?;
    Ok(())
}

fn rewrite_xml_bytes(input: &[u8], rewriter: &dyn ScalarRewrite) -> Result<(Vec<u8>, Counters)> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    let mut tag_stack: Vec<String> = Vec::new();
    let mut counters = Counters::default();

    let xml_err = |e: quick_xml::Error| MigrateError::Xml { context: "rewriting xml document".to_string(), source: e };

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Eof => break,
            Event::Start(e) => {
                tag_stack.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                writer.write_event(Event::Start(e)).map_err(|e| xml_err(e.into()))?;
            }
            Event::End(e) => {
                tag_stack.pop();
                writer.write_event(Event::End(e)).map_err(|e| xml_err(e.into()))?;
            }
            Event::Text(e) => {
                let in_skip_tag = tag_stack
                    .last()
                    .is_some_and(|t| XML_SKIP_TAGS.contains(&t.as_str()));
                if in_skip_tag {
                    writer.write_event(Event::Text(e)).map_err(|e| xml_err(e.into()))?;
                } else {
                    let text = e.unescape().map_err(xml_err)?.into_owned();
                    let (new_text, c) = rewriter.rewrite(&text);
                    counters.add(c);
                    writer
                        .write_event(Event::Text(BytesText::new(&new_text)))
                        .map_err(|e| xml_err(e.into()))?;
                }
            }
            other => writer.write_event(other).map_err(|e| xml_err(e.into()))?,
        }
        buf.clear();
    }

    Ok((writer.into_inner(), counters))
}

fn process_mblink_file(target: &Path, rewriter: &dyn ScalarRewrite) -> Result<()> {
    let path = std::fs::read_to_string(target)?;
    let (new_path, counters) = rewriter.rewrite(&path);
    log::info!(
        "{}: {} processed, {} modified",
        target.display(),
        counters.modified + counters.ignored,
        counters.modified
    );
    std::fs::write(target, new_path)?;
    Ok(())
}

fn process_json_file(target: &Path, rewriter: &dyn ScalarRewrite) -> Result<()> {
    let text = std::fs::read_to_string(target)?;
    let mut doc: serde_json::Value = serde_json::from_str(&text).map_err(|source| MigrateError::Json {
        context: format!("parsing {}", target.display()),
        source,
    })?;
    let counters = document::walk_strings_mut(&mut doc, &mut |s: &str| rewriter.rewrite(s));
    log::info!(
        "{}: {} processed, {} modified",
        target.display(),
        counters.modified + counters.ignored,
        counters.modified
    );
    let serialized = serde_json::to_string_pretty(&doc).map_err(|source| MigrateError::Json {
        context: format!("serializing {}", target.display()),
        source,
    })?;
    std::fs::write(target, serialized)?;
    Ok(())
}
