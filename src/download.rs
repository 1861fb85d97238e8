use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name an archive is stored under: the last segment of its URL.
pub fn archive_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Makes sure the archive behind `url` sits in `work_dir`.
///
/// A file with the URL's basename is trusted as is: no size or checksum
/// comparison is made, so a stale or foreign file under that name is reused.
pub async fn ensure_local(client: &reqwest::Client, url: &str, work_dir: &Path) -> Result<PathBuf> {
    let local_path = work_dir.join(archive_file_name(url));

    if local_path.exists() {
        tracing::info!("Using cached archive {}", local_path.display());
        return Ok(local_path);
    }

    download_file(client, url, &local_path).await?;
    Ok(local_path)
}

/// Streams `url` into `local_path`; the file only appears once the body is complete.
pub async fn download_file(client: &reqwest::Client, url: &str, local_path: &Path) -> Result<()> {
    let filename = local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("Invalid download target: {}", local_path.display()))?;
    let parent = local_path
        .parent()
        .ok_or_else(|| anyhow!("Invalid download target: {}", local_path.display()))?;

    tracing::info!("Downloading {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;
    if !response.status().is_success() {
        return Err(anyhow!("Download of {} failed: {}", url, response.status()));
    }
    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {}", filename));

    let mut file = NamedTempFile::new_in(parent)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Transfer of {} interrupted", url))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    file.persist(local_path)
        .with_context(|| format!("Could not save {}", local_path.display()))?;

    pb.finish_with_message("Download complete");
    tracing::debug!("Saved {} bytes to {}", downloaded, local_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            archive_file_name("https://download.test/Blender2.79/blender-2.79b-windows64.zip"),
            "blender-2.79b-windows64.zip"
        );
        assert_eq!(archive_file_name("plain.zip"), "plain.zip");
    }

    #[tokio::test]
    async fn test_existing_file_is_trusted_without_network() {
        let tmp = TempDir::new().unwrap();
        let existing = tmp.path().join("blender-2.79b-linux64.tar.bz2");
        fs::write(&existing, "not really an archive").unwrap();

        // Nothing listens on the discard port: any request would fail the test.
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let path = ensure_local(
            &client,
            "http://127.0.0.1:9/Blender2.79/blender-2.79b-linux64.tar.bz2",
            tmp.path(),
        )
        .await
        .unwrap();

        assert_eq!(path, existing);
        assert_eq!(fs::read_to_string(path).unwrap(), "not really an archive");
    }

    #[tokio::test]
    async fn test_failed_transfer_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        let result = ensure_local(
            &client,
            "http://127.0.0.1:9/Blender2.79/blender-2.79b-linux64.tar.bz2",
            tmp.path(),
        )
        .await;

        assert!(result.is_err());
        assert!(!tmp.path().join("blender-2.79b-linux64.tar.bz2").exists());
    }
}
