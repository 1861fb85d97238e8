//! Deterministic installation directories under the cache root.
//!
//! Stable releases are fetched at most once per cache root: if
//! `blender-<version>` exists it is returned as is. Nightly directories are
//! thrown away and rebuilt on every request.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    pub destination: PathBuf,
    pub version: String,
    pub nightly: bool,
    /// A stable install is already in place; nothing else needs to happen.
    pub already_satisfied: bool,
}

#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
}

impl CacheManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory downloads and extraction happen in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn destination(&self, version: &str, nightly: bool) -> PathBuf {
        let suffix = if nightly { "-nightly" } else { "" };
        self.root.join(format!("blender-{}{}", version, suffix))
    }

    pub fn locate(&self, version: &str, nightly: bool) -> Result<CacheSlot> {
        let destination = self.destination(version, nightly);
        let mut already_satisfied = false;

        if destination.exists() {
            if nightly {
                tracing::info!(
                    "Removing directory (nightly: {}): {}",
                    nightly,
                    destination.display()
                );
                fs::remove_dir_all(&destination).with_context(|| {
                    format!("Could not remove nightly install {}", destination.display())
                })?;
            } else {
                tracing::info!(
                    "Blender {} (non-nightly) release found at: {}",
                    version,
                    destination.display()
                );
                already_satisfied = true;
            }
        }

        Ok(CacheSlot {
            destination,
            version: version.to_string(),
            nightly,
            already_satisfied,
        })
    }

    /// Moves an extracted release into the slot's destination.
    pub fn commit(&self, slot: &CacheSlot, extracted_root: &Path) -> Result<PathBuf> {
        tracing::info!(
            "Move {} to {}",
            extracted_root.display(),
            slot.destination.display()
        );

        if let Some(parent) = slot.destination.parent() {
            fs::create_dir_all(parent)?;
        }

        if fs::rename(extracted_root, &slot.destination).is_err() {
            // Mounted or cross-device roots can't be renamed.
            tracing::debug!("Rename failed, copying {} instead", extracted_root.display());
            copy_tree(extracted_root, &slot.destination)?;
            fs::remove_dir_all(extracted_root).with_context(|| {
                format!("Could not remove {} after copying", extracted_root.display())
            })?;
        }

        Ok(slot.destination.clone())
    }
}

/// Recursive copy that keeps symlinks as symlinks.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target)?;
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            {
                let resolved = entry.path().parent().unwrap_or(src).join(&link);
                fs::copy(resolved, &target)?;
            }
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Could not copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}
