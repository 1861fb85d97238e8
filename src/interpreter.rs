//! Finding the Python interpreter Blender bundles.

use crate::error::GetBlenderError;
use crate::extract::list_files;
use crate::types::ArchiveManifest;
use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};

// `bin/python.exe` on Windows, `bin/python3.7m` or `bin/python3.10` elsewhere.
const INTERPRETER_PATTERN: &str = r"(^|/)bin/python(\.exe|\d\.\d+m?)$";

fn matcher() -> Result<impl Fn(&Path) -> bool> {
    let re = Regex::new(INTERPRETER_PATTERN)?;
    Ok(move |path: &Path| re.is_match(&path.to_string_lossy().replace('\\', "/")))
}

/// First manifest entry that is the bundled interpreter.
pub fn locate(manifest: &ArchiveManifest) -> Result<PathBuf> {
    let is_interpreter = matcher()?;
    let python = manifest
        .files
        .iter()
        .find(|path| is_interpreter(path.as_path()))
        .cloned()
        .ok_or_else(|| GetBlenderError::InterpreterNotFound {
            root: manifest.root_dir.clone(),
        })?;

    tracing::info!("Blender's bundled python executable was found: {}", python.display());
    Ok(python)
}

/// Same search over an installed tree, for releases served from the cache.
pub fn find_in_tree(root: &Path) -> Result<Option<PathBuf>> {
    let is_interpreter = matcher()?;
    Ok(list_files(root)?.into_iter().find(|path| is_interpreter(path.as_path())))
}
