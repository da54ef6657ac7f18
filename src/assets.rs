use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::AssetTask;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to scan asset directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Copies every file under `from` into `to`, keeping the relative layout.
/// Files whose destination already has the same bytes are skipped. A
/// missing `from` copies nothing. Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize, AssetError> {
    if !from.is_dir() {
        debug!("Asset source does not exist: {:?}", from);
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(relative);
        let contents = fs::read(entry.path()).map_err(|source| AssetError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        if fs::read(&dest).is_ok_and(|current| current == contents) {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| AssetError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&dest, contents).map_err(|source| AssetError::Io {
            path: dest.clone(),
            source,
        })?;
        debug!("{:?}", dest);
        copied += 1;
    }
    Ok(copied)
}

/// Copy tasks that vendor a prebuilt style library: its `css/` goes to the
/// source and output trees, its `js/` to the source tree (from where the
/// regular js task picks it up).
pub fn library_tasks(library: &Path, source: &Path, output: &Path) -> Vec<AssetTask> {
    vec![
        AssetTask {
            from: library.join("css"),
            to: source.join("css/lib"),
        },
        AssetTask {
            from: library.join("css"),
            to: output.join("css/lib"),
        },
        AssetTask {
            from: library.join("js"),
            to: source.join("js/lib"),
        },
    ]
}

/// Runs copy tasks in order. Returns the total number of files copied.
pub fn run_tasks(tasks: &[AssetTask]) -> Result<usize, AssetError> {
    let mut total = 0;
    for task in tasks {
        let copied = copy_tree(&task.from, &task.to)?;
        if copied > 0 {
            info!("Copied {} files {:?} -> {:?}", copied, task.from, task.to);
        }
        total += copied;
    }
    Ok(total)
}
