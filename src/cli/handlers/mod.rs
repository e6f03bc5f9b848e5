use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::CommandFactory;

use crate::cli::commands::Cli;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::homes;
use crate::io::session::{Session, SystemSession, dock_document};
use crate::io::store::{StoreOptions, open_store};
use crate::model::config::DockConfig;
use crate::model::document::Document;
use crate::model::section::Section;
use crate::model::tile::{FolderOptions, TileType};
use crate::ops::dock_ops::{self, AddRequest};
use crate::ops::position::PlacementSpec;

/// Raised at the end of a run in which anything failed
#[derive(Debug, thiserror::Error)]
#[error("{0} operation(s) failed")]
pub struct RunFailed(pub usize);

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_io::config_path(cli.config.as_deref());
    let config = config_io::load_config(config_path.as_deref())?;

    if !cli.has_action() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }
    if cli.move_item.is_some()
        && cli.position.is_none()
        && cli.after.is_none()
        && cli.before.is_none()
    {
        return Err("Please specify a 'position' for the move".into());
    }

    let session = SystemSession;
    let cwd = std::env::current_dir()?;
    let homeloc = cli
        .homeloc
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.homeloc));
    let own = session.home_dir().map(|home| dock_document(&home));
    let targets = homes::collect_targets(
        &cli.targets,
        own,
        cli.allhomes.then_some(homeloc.as_path()),
    )?;
    tracing::info!(?targets, "dock documents to process");

    let run = RunOptions::new(&cli, &config);
    let single = targets.len() == 1;
    let mut failures = 0;

    for target in &targets {
        tracing::info!(document = %target, "processing");
        let home = session.home_dir();
        let path = match homes::resolve_target(target, &cwd, home.as_deref()) {
            Ok(path) => path,
            Err(e) if single => return Err(e.into()),
            Err(e) => {
                tracing::error!("{}", e);
                failures += 1;
                continue;
            }
        };

        match process_target(&cli, &run, &path, &session, &cwd) {
            Ok(count) => failures += count,
            Err(e) => {
                tracing::error!(path = %path.display(), "{}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(RunFailed(failures).into());
    }
    Ok(())
}

/// Settings resolved from flags with config fallbacks
struct RunOptions {
    restart: bool,
    folder: FolderOptions,
    store: StoreOptions,
}

impl RunOptions {
    fn new(cli: &Cli, config: &DockConfig) -> Self {
        RunOptions {
            restart: cli.restart_override().unwrap_or(config.restart),
            folder: FolderOptions {
                view: cli.view.unwrap_or(config.folder.view),
                display: cli.display.unwrap_or(config.folder.display),
                sort: cli.sort.unwrap_or(config.folder.sort),
            },
            store: StoreOptions {
                reload_timeout: Duration::from_millis(config.reload.timeout_ms),
                modification_wait: Duration::from_secs(config.reload.modification_wait_secs),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Per-document processing
// ---------------------------------------------------------------------------

/// Run every requested operation against one document: move, removals,
/// additions, find, list. Each operation is attempted even if an earlier one
/// failed, and the document is written once at the end if anything changed.
/// Returns how many operations failed.
fn process_target(
    cli: &Cli,
    run: &RunOptions,
    path: &Path,
    session: &dyn Session,
    cwd: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut store = open_store(path, session, &run.store);
    tracing::debug!(path = %path.display(), mode = %store.mode(), "opened dock document");
    let mut doc = store.read()?;
    let display_path = path.display().to_string();

    let placement = PlacementSpec {
        position: cli.position.as_deref(),
        before: cli.before.as_deref(),
        after: cli.after.as_deref(),
    };
    let mut failures = 0;
    let mut modified = false;

    if let Some(query) = &cli.move_item {
        match dock_ops::move_tile(&mut doc.sections, query, &placement) {
            Ok(p) => {
                tracing::debug!(item = %query, section = %p.section, index = p.index, "moved");
                modified = true;
            }
            Err(e) => {
                println!("Move failed for {}", query);
                tracing::error!("{}", e);
                failures += 1;
            }
        }
    }

    for removal in &cli.remove {
        match dock_ops::remove(&mut doc.sections, removal) {
            Ok(count) => {
                tracing::info!(item = %removal, count, "removed");
                modified = true;
            }
            Err(e) => {
                tracing::error!("{}", e);
                failures += 1;
            }
        }
    }

    if !cli.add.is_empty() {
        let home = homes::home_of_document(path);
        for raw in &cli.add {
            let addition = prepare_addition(
                raw,
                cli.section,
                cli.tile_type.as_ref(),
                &home,
                cwd,
            );
            println!("adding {}", addition.path);
            let req = AddRequest {
                path: &addition.path,
                tile_type: addition.tile_type.clone(),
                section: addition.section,
                label: cli.label.as_deref(),
                replacing: cli.replacing.as_deref(),
                placement,
                folder: run.folder,
            };
            match dock_ops::add(&mut doc.sections, &req) {
                Ok(p) => {
                    tracing::debug!(section = %p.section, index = p.index, "added");
                    modified = true;
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    println!("item {} was not added to Dock", addition.path);
                    failures += 1;
                }
            }
        }
    }

    if let Some(query) = &cli.find {
        let found = dock_ops::find(&doc.sections, query).ok();
        if cli.json {
            let json = find_to_json(query, &display_path, found);
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            println!("{}", format_find(query, &display_path, found));
        }
        if found.is_none() {
            failures += 1;
        }
    }

    if cli.list {
        print_list(&doc, &display_path, cli.json)?;
    }

    if modified {
        store.write(&doc, run.restart)?;
        tracing::info!(path = %display_path, "dock document saved");
    }
    Ok(failures)
}

fn print_list(doc: &Document, path: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let entries = dock_ops::list(&doc.sections);
    if json {
        println!("{}", serde_json::to_string_pretty(&list_to_json(path, &entries))?);
    } else {
        for (section, _, tile) in &entries {
            println!("{}", format_list_line(*section, tile, path));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Addition preprocessing
// ---------------------------------------------------------------------------

/// An `--add` argument after path cleanup and section/type inference
#[derive(Debug, Clone, PartialEq)]
pub struct Addition {
    pub path: String,
    pub section: Section,
    pub tile_type: TileType,
}

/// Normalize one `--add` argument for the document whose home is `home`.
///
/// A `file://` prefix is dropped and `~` means `home`. Without an explicit
/// section, `.app` bundles go to apps and everything else to others. Without
/// an explicit type, existing directories outside apps become folder tiles
/// and anything with a scheme becomes a URL tile in others. Paths are made
/// absolute against `cwd`.
pub fn prepare_addition(
    raw: &str,
    section: Option<Section>,
    tile_type: Option<&TileType>,
    home: &Path,
    cwd: &Path,
) -> Addition {
    let mut path = raw.strip_prefix("file://").unwrap_or(raw).to_string();
    if let Some(rest) = path.strip_prefix('~') {
        path = format!("{}{}", home.display(), rest);
    }

    let mut section = section.unwrap_or_else(|| {
        if path.ends_with(".app") || path.ends_with(".app/") {
            Section::Apps
        } else {
            Section::Others
        }
    });

    let tile_type = match tile_type {
        Some(t) => t.clone(),
        None if section != Section::Apps && Path::new(&path).is_dir() => TileType::Directory,
        None if path.contains("://") => {
            section = Section::Others;
            TileType::Url
        }
        None => TileType::File,
    };

    if tile_type != TileType::Url && !tile_type.is_spacer() {
        path = absolute_path(&path, cwd);
    }

    Addition {
        path,
        section,
        tile_type,
    }
}

/// Absolute form of `path` without a trailing slash
fn absolute_path(path: &str, cwd: &Path) -> String {
    let joined = if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        cwd.join(path)
    };
    let text = joined.to_string_lossy().into_owned();
    match text.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}
