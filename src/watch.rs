//! Rebuild-on-change loop.
//!
//! Events from `notify` are batched until the tree has been quiet for
//! [`DEBOUNCE_MS`], then a full build runs. Files written by the previous
//! build (Generated Files, output, export) never trigger a rebuild.

use log::{debug, error, info};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

use crate::config::SiteConfig;
use crate::pipeline::{build_site, BuildReport};

const DEBOUNCE_MS: u64 = 300;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Editor artifacts that should never trigger a build.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Paths the last build wrote itself.
struct BuildOutputs {
    generated: HashSet<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl BuildOutputs {
    fn new(config: &SiteConfig, report: &BuildReport) -> Self {
        let mut dirs = vec![config.output_dir()];
        if let Some(export) = &config.data.export {
            dirs.push(config.resolve(export));
        }
        if config.library_path.is_some() {
            dirs.push(config.source_dir().join("css/lib"));
            dirs.push(config.source_dir().join("js/lib"));
        }
        Self {
            generated: report.generated.iter().cloned().collect(),
            dirs,
        }
    }

    fn contains(&self, path: &Path) -> bool {
        self.generated.contains(path) || self.dirs.iter().any(|dir| path.starts_with(dir))
    }
}

/// Relevant changed paths carried by one watcher event.
fn changed_paths(event: &Event, ignore: &BuildOutputs) -> Vec<PathBuf> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| !is_temp_file(p) && !ignore.contains(p))
        .cloned()
        .collect()
}

/// Watches the site sources and rebuilds on every change until the watcher
/// shuts down. `last` is the report of the build that ran before watching.
/// Build failures are logged and watching continues.
pub fn watch_site(config: &SiteConfig, last: BuildReport) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;

    for path in config.watch_paths() {
        if path.exists() {
            watcher.watch(&path, RecursiveMode::Recursive)?;
            debug!("Watching {:?}", path);
        }
    }
    info!("Watching for changes (Ctrl+C to stop)");

    let mut outputs = BuildOutputs::new(config, &last);
    while let Ok(first) = rx.recv() {
        let mut pending = HashSet::new();
        let mut collect = |event: notify::Result<Event>| match event {
            Ok(event) => pending.extend(changed_paths(&event, &outputs)),
            Err(e) => error!("watch: {}", e),
        };
        collect(first);
        while let Ok(event) = rx.recv_timeout(Duration::from_millis(DEBOUNCE_MS)) {
            collect(event);
        }
        if pending.is_empty() {
            continue;
        }

        let mut changed: Vec<_> = pending.into_iter().collect();
        changed.sort();
        for path in &changed {
            info!("Changed: {:?}", path.strip_prefix(&config.root).unwrap_or(path));
        }

        match build_site(config) {
            Ok(report) => outputs = BuildOutputs::new(config, &report),
            Err(e) => error!("Build failed: {}", e),
        }
    }
    Ok(())
}
