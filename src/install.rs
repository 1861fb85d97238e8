//! The whole pipeline: resolve, reuse or download, unpack, bootstrap, commit.

use crate::bootstrap::Bootstrapper;
use crate::cache::{CacheManager, CacheSlot};
use crate::config::{resolve_cache_root, Settings};
use crate::download::{archive_file_name, ensure_local};
use crate::error::GetBlenderError;
use crate::interpreter;
use crate::platform::PlatformProfile;
use crate::resolve::{resolve, HttpIndex};
use crate::types::{
    ArchiveKind, IndexSource, InstallReceipt, InstalledRelease, ResolvedRelease,
};
use crate::version::RequestedVersion;
use anyhow::Result;
use chrono::Utc;
use console::style;
use std::fs;
use std::path::{Path, PathBuf};

pub const RECEIPT_FILE_NAME: &str = ".get-blender.json";

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub requirements: Vec<PathBuf>,
    pub strict_bootstrap: bool,
}

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("get-blender/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Resolves `version_arg` against the configured indexes for this host.
pub async fn resolve_release(
    client: &reqwest::Client,
    settings: &Settings,
    version_arg: &str,
) -> Result<(RequestedVersion, PlatformProfile, ResolvedRelease)> {
    let requested = RequestedVersion::parse(version_arg)?;
    let profile = PlatformProfile::host()?;
    let release = resolve(
        &HttpIndex::new(client.clone()),
        &profile,
        &requested,
        &settings.stable_index,
        &settings.nightly_index,
    )
    .await?;
    Ok((requested, profile, release))
}

/// Makes Blender `version_arg` available under the cache root and returns where.
pub async fn get_blender(
    settings: &Settings,
    version_arg: &str,
    options: &InstallOptions,
) -> Result<InstalledRelease> {
    let client = http_client()?;
    let (requested, profile, release) = resolve_release(&client, settings, version_arg).await?;

    let cwd = std::env::current_dir()?;
    let cache_root = resolve_cache_root(settings.cache_dir.as_deref(), &cwd)?;

    install_release(
        &client,
        &profile,
        &requested,
        &release,
        &CacheManager::new(cache_root),
        options,
    )
    .await
}

pub async fn install_release(
    client: &reqwest::Client,
    profile: &PlatformProfile,
    requested: &RequestedVersion,
    release: &ResolvedRelease,
    cache: &CacheManager,
    options: &InstallOptions,
) -> Result<InstalledRelease> {
    let slot = cache.locate(&requested.label, release.is_nightly)?;
    if slot.already_satisfied {
        return cached_release(&slot);
    }

    // Decided from the name alone so an unknown format never gets downloaded.
    let kind = ArchiveKind::from_path(Path::new(archive_file_name(&release.download_url)))?;

    let work_dir = cache.root();
    let archive = ensure_local(client, &release.download_url, work_dir).await?;
    let manifest = kind.extract(&archive, work_dir)?;
    let python = interpreter::locate(&manifest)?;

    let report = Bootstrapper::new(&python, work_dir, profile.is_windows())
        .with_requirements(options.requirements.clone())
        .run(client)
        .await?;

    if let Some(failed) = report.failures().next() {
        for outcome in report.failures() {
            tracing::warn!(
                "Bootstrap step '{}' failed with {}: {}",
                outcome.step,
                outcome.status_text(),
                outcome.stderr.trim()
            );
        }
        if options.strict_bootstrap {
            return Err(GetBlenderError::BootstrapFailed {
                step: failed.step.to_string(),
                status: failed.status_text(),
                stderr: failed.stderr.trim().to_string(),
            }
            .into());
        }
        eprintln!(
            "{} Blender's python may be missing packages, {} bootstrap step(s) failed",
            style("warning:").yellow().bold(),
            report.failures().count()
        );
    }

    let executable_dir = cache.commit(&slot, &manifest.root_dir)?;
    let interpreter_path = executable_dir.join(python.strip_prefix(&manifest.root_dir)?);

    write_receipt(&executable_dir, requested, release)?;

    tracing::info!("Blender {} is ready at {}", requested, executable_dir.display());
    Ok(InstalledRelease {
        version: requested.label.clone(),
        nightly: release.is_nightly,
        executable_dir,
        interpreter_path: Some(interpreter_path),
        from_cache: false,
    })
}

fn cached_release(slot: &CacheSlot) -> Result<InstalledRelease> {
    if let Some(receipt) = read_receipt(&slot.destination) {
        tracing::debug!(
            "Installed {} from {}",
            receipt.installed_at,
            receipt.download_url
        );
    }

    Ok(InstalledRelease {
        version: slot.version.clone(),
        nightly: slot.nightly,
        executable_dir: slot.destination.clone(),
        interpreter_path: interpreter::find_in_tree(&slot.destination)?,
        from_cache: true,
    })
}

fn write_receipt(
    executable_dir: &Path,
    requested: &RequestedVersion,
    release: &ResolvedRelease,
) -> Result<()> {
    let receipt = InstallReceipt {
        version: requested.label.clone(),
        download_url: release.download_url.clone(),
        channel: if release.is_nightly {
            IndexSource::Nightly
        } else {
            IndexSource::Stable
        },
        installed_at: Utc::now().to_rfc3339(),
    };
    fs::write(
        executable_dir.join(RECEIPT_FILE_NAME),
        serde_json::to_string_pretty(&receipt)?,
    )?;
    Ok(())
}

pub fn read_receipt(executable_dir: &Path) -> Option<InstallReceipt> {
    let content = fs::read_to_string(executable_dir.join(RECEIPT_FILE_NAME)).ok()?;
    serde_json::from_str(&content).ok()
}
