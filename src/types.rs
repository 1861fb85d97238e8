use crate::version::VersionToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which of the two release indexes a link was found on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexSource {
    #[serde(rename = "stable")]
    Stable,
    #[serde(rename = "nightly")]
    Nightly,
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSource::Stable => write!(f, "stable"),
            IndexSource::Nightly => write!(f, "nightly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub source: IndexSource,
    pub url: String,
    /// Version part of the file name up to its first hyphen, e.g. `2.79b`.
    pub advertised_label: String,
    /// `None` when the label holds no `major.minor` pair.
    pub advertised_version: Option<VersionToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub download_url: String,
    pub is_nightly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    Bzip2,
    Gzip,
    Xz,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipLayout {
    Plain,
    /// Old macOS releases shipped as a zip holding `blender.app` instead of a dmg.
    LegacyMacBundle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar(TarCompression),
    DiskImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestFormat {
    Zip(ZipLayout),
    Tar(TarCompression),
    DiskImage,
}

impl ManifestFormat {
    /// Formats whose on-disk layout is an `.app/Contents` tree.
    pub fn is_mac_bundle(&self) -> bool {
        matches!(
            self,
            ManifestFormat::Zip(ZipLayout::LegacyMacBundle) | ManifestFormat::DiskImage
        )
    }
}

/// Extracted archive: the directory that will become the installation plus
/// every file it holds, in archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveManifest {
    pub root_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub format: ManifestFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledRelease {
    pub version: String,
    pub nightly: bool,
    pub executable_dir: PathBuf,
    #[serde(default)]
    pub interpreter_path: Option<PathBuf>,
    #[serde(default)]
    pub from_cache: bool,
}

/// Written next to the installed release once it is committed to the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallReceipt {
    pub version: String,
    pub download_url: String,
    pub channel: IndexSource,
    pub installed_at: String,
}
