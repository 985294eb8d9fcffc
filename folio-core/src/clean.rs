// Cleanup of generated archives and browser profiles

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug)]
pub enum CleanOutcome {
    Removed(PathBuf),
    /// Nothing there to begin with.
    Missing(PathBuf),
    Failed(PathBuf, io::Error),
}

impl CleanOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CleanOutcome::Removed(p) | CleanOutcome::Missing(p) | CleanOutcome::Failed(p, _) => p,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CleanOutcome::Failed(..))
    }
}

/// Remove a file or directory tree.
pub fn remove_path(path: &Path) -> CleanOutcome {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return CleanOutcome::Missing(path.to_path_buf());
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("Removed {}", path.display());
            CleanOutcome::Removed(path.to_path_buf())
        }
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            CleanOutcome::Failed(path.to_path_buf(), e)
        }
    }
}

pub fn clean_paths<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Vec<CleanOutcome> {
    paths.into_iter().map(remove_path).collect()
}
