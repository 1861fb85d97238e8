//! Unpacking downloaded releases.
//!
//! Each archive kind ends up as an [`ArchiveManifest`]: the directory that
//! becomes the installation plus the files it holds. Linux tarballs and
//! Windows zips have a single top-level directory. macOS releases are either a
//! disk image holding `Blender.app`, or (for old releases) a zip whose top-level
//! directory holds `blender.app`; for those the root is the bundle's `Contents`.

use crate::error::GetBlenderError;
use crate::types::{ArchiveKind, ArchiveManifest, ManifestFormat, TarCompression, ZipLayout};
use anyhow::{anyhow, Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use walkdir::WalkDir;

impl ArchiveKind {
    pub fn from_path(archive_path: &Path) -> Result<Self> {
        let name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let kind = if name.ends_with(".zip") {
            ArchiveKind::Zip
        } else if name.ends_with(".dmg") {
            ArchiveKind::DiskImage
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            ArchiveKind::Tar(TarCompression::Bzip2)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveKind::Tar(TarCompression::Gzip)
        } else if name.ends_with(".tar.xz") {
            ArchiveKind::Tar(TarCompression::Xz)
        } else if name.ends_with(".tar") {
            ArchiveKind::Tar(TarCompression::None)
        } else {
            return Err(GetBlenderError::UnknownArchiveFormat {
                path: archive_path.to_path_buf(),
            }
            .into());
        };
        Ok(kind)
    }

    /// Unpacks `archive_path` into `work_dir`, skipping the unpack when the
    /// archive's root directory is already there.
    pub fn extract(self, archive_path: &Path, work_dir: &Path) -> Result<ArchiveManifest> {
        tracing::info!(
            "Extracting {}",
            archive_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        );

        let manifest = match self {
            ArchiveKind::Zip => extract_zip(archive_path, work_dir)?,
            ArchiveKind::Tar(compression) => extract_tar(archive_path, work_dir, compression)?,
            ArchiveKind::DiskImage => extract_disk_image(archive_path, work_dir)?,
        };

        if manifest.format.is_mac_bundle() {
            return rebuild_mac_manifest(manifest);
        }

        tracing::debug!(
            "{} file(s) under {}",
            manifest.files.len(),
            manifest.root_dir.display()
        );
        Ok(manifest)
    }
}

/// First real component of an archive entry path (`./foo/bar` -> `foo`).
fn top_level_dir(entry: &Path) -> Option<PathBuf> {
    entry.components().find_map(|c| match c {
        Component::Normal(name) => Some(PathBuf::from(name)),
        _ => None,
    })
}

fn extract_zip(archive_path: &Path, work_dir: &Path) -> Result<ArchiveManifest> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Could not open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        entries.push((entry.name().to_string(), entry.is_dir()));
    }

    let top = entries
        .first()
        .and_then(|(name, _)| top_level_dir(Path::new(name)))
        .ok_or_else(|| anyhow!("Archive {} is empty", archive_path.display()))?;

    let layout = if entries.iter().any(|(name, _)| name.contains("OSX")) {
        tracing::info!("Detected old-style macOS release: a .zip archive containing blender.app");
        ZipLayout::LegacyMacBundle
    } else {
        ZipLayout::Plain
    };

    let root_dir = match layout {
        ZipLayout::Plain => work_dir.join(&top),
        ZipLayout::LegacyMacBundle => work_dir.join(&top).join("blender.app").join("Contents"),
    };

    if root_dir.is_dir() {
        tracing::info!("{} is already unpacked", root_dir.display());
    } else {
        tracing::info!("Unpacking {}", archive_path.display());
        unpack_zip(&mut archive, work_dir)?;
    }

    let files = entries
        .into_iter()
        .filter(|(_, is_dir)| !is_dir)
        .map(|(name, _)| work_dir.join(name))
        .collect();

    Ok(ArchiveManifest {
        root_dir,
        files,
        format: ManifestFormat::Zip(layout),
    })
}

fn unpack_zip(archive: &mut zip::ZipArchive<fs::File>, extract_dir: &Path) -> Result<()> {
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative) = file.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("Skipping malicious path in zip: {}", file.name());
            continue;
        };
        let outpath = extract_dir.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&outpath)
            .with_context(|| format!("Could not create {}", outpath.display()))?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

fn open_tar(archive_path: &Path, compression: TarCompression) -> Result<Archive<Box<dyn Read>>> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Could not open {}", archive_path.display()))?;
    let reader: Box<dyn Read> = match compression {
        TarCompression::Bzip2 => Box::new(BzDecoder::new(file)),
        TarCompression::Gzip => Box::new(GzDecoder::new(file)),
        TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(file)),
        TarCompression::None => Box::new(file),
    };
    Ok(Archive::new(reader))
}

fn extract_tar(
    archive_path: &Path,
    work_dir: &Path,
    compression: TarCompression,
) -> Result<ArchiveManifest> {
    let mut archive = open_tar(archive_path, compression)?;

    let mut root_dir: Option<PathBuf> = None;
    let mut unpack = false;
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        if root_dir.is_none() {
            let top = top_level_dir(&path)
                .ok_or_else(|| anyhow!("Invalid first entry in {}", archive_path.display()))?;
            let root = work_dir.join(top);
            unpack = !root.is_dir();
            if unpack {
                tracing::info!("Unpacking {}", archive_path.display());
            } else {
                tracing::info!("{} is already unpacked", root.display());
            }
            root_dir = Some(root);
        }

        if unpack && !entry.unpack_in(work_dir)? {
            tracing::warn!("Skipping malicious path in tar: {}", path.display());
            continue;
        }

        if !entry.header().entry_type().is_dir() {
            files.push(work_dir.join(&path));
        }
    }

    let root_dir =
        root_dir.ok_or_else(|| anyhow!("Archive {} is empty", archive_path.display()))?;

    Ok(ArchiveManifest {
        root_dir,
        files,
        format: ManifestFormat::Tar(compression),
    })
}

#[cfg(target_os = "macos")]
fn extract_disk_image(archive_path: &Path, work_dir: &Path) -> Result<ArchiveManifest> {
    let mount = crate::dmg::attach(archive_path)?;
    let app = crate::dmg::find_app_bundle(&mount.path)?;

    tracing::info!(
        "Copying Blender out of mounted space from {} to {}",
        app.display(),
        work_dir.display()
    );
    crate::cache::copy_tree(&app, work_dir)?;
    drop(mount);

    Ok(ArchiveManifest {
        root_dir: work_dir.join("Contents"),
        files: Vec::new(),
        format: ManifestFormat::DiskImage,
    })
}

#[cfg(not(target_os = "macos"))]
fn extract_disk_image(archive_path: &Path, _work_dir: &Path) -> Result<ArchiveManifest> {
    Err(GetBlenderError::DiskImageUnsupported {
        path: archive_path.to_path_buf(),
    }
    .into())
}

/// Checks `Contents/MacOS` for the Blender binary, then lists the bundle as it
/// actually sits on disk.
fn rebuild_mac_manifest(manifest: ArchiveManifest) -> Result<ArchiveManifest> {
    let executable_dir = manifest.root_dir.join("MacOS");
    let executable = fs::read_dir(&executable_dir)
        .ok()
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with("lender"))
        })
        .ok_or_else(|| GetBlenderError::MissingExecutable {
            dir: executable_dir.clone(),
        })?;
    tracing::info!("Blender macOS executable found at: {}", executable.display());

    let files = list_files(&manifest.root_dir)?;
    Ok(ArchiveManifest { files, ..manifest })
}

/// Every non-directory under `root`, sorted by name within each directory.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
