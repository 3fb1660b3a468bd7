//! Mirror a project directory's generated files in a shadow tree, to detect
//! user edits made since the engine last wrote a file.
//!
//! Grounded on `original_source/fashion/mirror.py`: modification-time
//! comparison, not content hashing, is deliberate — generation is frequent
//! and mass-hashing the project tree on every build is too costly. A false
//! positive (unchanged content, bumped mtime) just skips an overwrite,
//! which is always safe.

use crate::core::error::FashionError;
use std::fs;
use std::path::{Path, PathBuf};

/// Decides whether a generated file may be overwritten, and records writes
/// it permits.
#[derive(Debug, Clone)]
pub struct Mirror {
    proj_dir: PathBuf,
    mirror_dir: PathBuf,
    force: bool,
}

impl Mirror {
    pub fn new(proj_dir: impl Into<PathBuf>, mirror_dir: impl Into<PathBuf>, force: bool) -> Self {
        Self { proj_dir: proj_dir.into(), mirror_dir: mirror_dir.into(), force }
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Resolve `path` to its absolute project-relative form, then join it to
    /// the mirror root. Rejects paths outside the project root.
    pub fn get_mirror_path(&self, path: &Path) -> Result<PathBuf, FashionError> {
        let abs = if path.is_absolute() { path.to_path_buf() } else { self.proj_dir.join(path) };
        let rel = abs.strip_prefix(&self.proj_dir).map_err(|_| {
            FashionError::PathError(format!(
                "{} is outside project root {}",
                abs.display(),
                self.proj_dir.display()
            ))
        })?;
        Ok(self.mirror_dir.join(rel))
    }

    /// True iff a mirror snapshot exists for `path`, the working-tree file
    /// exists, and its mtime is strictly newer than the snapshot's. Always
    /// false in force mode.
    pub fn is_changed(&self, path: &Path) -> Result<bool, FashionError> {
        if self.force {
            return Ok(false);
        }
        let mirror_path = self.get_mirror_path(path)?;
        let abs = if path.is_absolute() { path.to_path_buf() } else { self.proj_dir.join(path) };
        if !mirror_path.exists() || !abs.exists() {
            return Ok(false);
        }
        let mirror_mtime = fs::metadata(&mirror_path)?.modified()?;
        let proj_mtime = fs::metadata(&abs)?.modified()?;
        Ok(proj_mtime > mirror_mtime)
    }

    /// Copy the working-tree file to its mirror path, creating parent
    /// directories as needed and preserving its modification time.
    pub fn copy_to_mirror(&self, path: &Path) -> Result<(), FashionError> {
        let mirror_path = self.get_mirror_path(path)?;
        if let Some(parent) = mirror_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let abs = if path.is_absolute() { path.to_path_buf() } else { self.proj_dir.join(path) };
        fs::copy(&abs, &mirror_path)?;
        let mtime = fs::metadata(&abs)?.modified()?;
        let mtime = filetime::FileTime::from_system_time(mtime);
        filetime::set_file_mtime(&mirror_path, mtime)
            .map_err(|e| FashionError::PathError(e.to_string()))?;
        Ok(())
    }
}
