//! Disk image mounting via `hdiutil`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A mounted disk image, detached when dropped.
pub struct MountPoint {
    pub path: PathBuf,
}

impl Drop for MountPoint {
    fn drop(&mut self) {
        if let Err(e) = detach(&self.path) {
            tracing::warn!("{}", e);
        }
    }
}

pub fn attach(dmg_path: &Path) -> Result<MountPoint> {
    let output = Command::new("hdiutil")
        .arg("attach")
        .arg("-nobrowse")
        .arg("-readonly")
        .arg(dmg_path)
        .output()
        .context("Failed to execute hdiutil")?;

    if !output.status.success() {
        bail!(
            "hdiutil attach {} failed: {}",
            dmg_path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    // Lines look like: /dev/disk4s1 <TAB> Apple_HFS <TAB> /Volumes/Blender
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(idx) = line.find("/Volumes/") {
            let path = PathBuf::from(line[idx..].trim());
            tracing::info!("Mounted {} at {}", dmg_path.display(), path.display());
            return Ok(MountPoint { path });
        }
    }

    bail!("Could not find mount point in hdiutil output");
}

pub fn detach(mount_point: &Path) -> Result<()> {
    let status = Command::new("hdiutil")
        .arg("detach")
        .arg(mount_point)
        .arg("-force")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("Failed to execute hdiutil")?;

    if !status.success() {
        bail!("Failed to detach {}", mount_point.display());
    }
    tracing::debug!("Detached {}", mount_point.display());
    Ok(())
}

/// The application bundle at the top of a mounted image.
pub fn find_app_bundle(mount_point: &Path) -> Result<PathBuf> {
    let preferred = mount_point.join("Blender.app");
    if preferred.is_dir() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(mount_point)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "app") {
            return Ok(path);
        }
    }

    bail!("No application bundle found in {}", mount_point.display())
}
