//! Release index scanning.
//!
//! Blender publishes stable builds on a per-version directory listing and
//! nightly builds on a single download page. Both are plain HTML; we only care
//! about `href` targets that look like a build for this platform.

use crate::error::GetBlenderError;
use crate::platform::PlatformProfile;
use crate::types::{CandidateLink, IndexSource, ResolvedRelease};
use crate::version::{RequestedVersion, VersionToken};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use reqwest::Url;
use std::collections::BTreeSet;

/// Source of index page bodies.
#[allow(async_fn_in_trait)]
pub trait IndexPages {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// Fetches index pages over HTTP.
pub struct HttpIndex {
    client: reqwest::Client,
}

impl HttpIndex {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl IndexPages for HttpIndex {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching release index: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch release index {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Release index {} returned {}", url, status));
        }

        Ok(response.text().await?)
    }
}

/// The two indexes in scan order.
pub fn index_urls(
    stable_template: &str,
    nightly_url: &str,
    token: &VersionToken,
) -> Vec<(IndexSource, String)> {
    vec![
        (
            IndexSource::Stable,
            stable_template.replace("{version}", token.as_str()),
        ),
        (IndexSource::Nightly, nightly_url.to_string()),
    ]
}

pub fn extract_hrefs(page: &str) -> Result<Vec<String>> {
    let re_href = Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)?;
    Ok(re_href
        .captures_iter(page)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)))
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Every link on `page` that names a build for `profile`, in document order.
pub fn scan_index(
    page: &str,
    index_url: &str,
    source: IndexSource,
    profile: &PlatformProfile,
) -> Result<Vec<CandidateLink>> {
    let re_link = Regex::new(&profile.link_pattern())?;

    // Directory listings use relative hrefs; keep the last segment when joining.
    let base = if index_url.ends_with('/') {
        Url::parse(index_url)
    } else {
        Url::parse(&format!("{}/", index_url))
    }
    .with_context(|| format!("Invalid release index URL: {}", index_url))?;

    let mut candidates = Vec::new();
    for href in extract_hrefs(page)? {
        let Some(cap) = re_link.captures(&href) else {
            continue;
        };
        let advertised_label = cap[1].split('-').next().unwrap_or(&cap[1]).to_string();
        let url = base
            .join(&href)
            .with_context(|| format!("Invalid link '{}' on {}", href, index_url))?;

        let advertised_version = VersionToken::parse(&advertised_label).ok();

        tracing::trace!("Candidate on {} index: {} ({})", source, url, advertised_label);
        candidates.push(CandidateLink {
            source,
            url: url.to_string(),
            advertised_label,
            advertised_version,
        });
    }

    Ok(candidates)
}

/// Picks the release matching `requested` across both indexes.
///
/// A request with a letter suffix (`2.79a`) takes a link advertising exactly that
/// label when there is one. Otherwise links match on the `major.minor` token.
/// When several links match, the last one in scan order wins: a version that
/// shows up on both the stable and the nightly page resolves to the nightly.
pub async fn resolve<P: IndexPages>(
    pages: &P,
    profile: &PlatformProfile,
    requested: &RequestedVersion,
    stable_template: &str,
    nightly_url: &str,
) -> Result<ResolvedRelease> {
    let wants_exact_label = requested.label != requested.token.as_str();
    let mut exact: Option<ResolvedRelease> = None;
    let mut by_token: Option<ResolvedRelease> = None;
    let mut seen = BTreeSet::new();

    for (source, url) in index_urls(stable_template, nightly_url, &requested.token) {
        let page = pages.fetch_page(&url).await?;
        let candidates = scan_index(&page, &url, source, profile)?;
        tracing::debug!("{} candidate(s) on {}", candidates.len(), url);

        for candidate in candidates {
            seen.insert(candidate.advertised_label.clone());

            if candidate.advertised_version.as_ref() != Some(&requested.token) {
                continue;
            }

            let release = ResolvedRelease {
                download_url: candidate.url,
                is_nightly: candidate.source == IndexSource::Nightly,
            };
            if wants_exact_label && candidate.advertised_label == requested.label {
                exact = Some(release.clone());
            }
            if let Some(previous) = &by_token {
                tracing::debug!(
                    "{} replaces earlier match {}",
                    release.download_url,
                    previous.download_url
                );
            }
            by_token = Some(release);
        }
    }

    let resolved = exact.or(by_token);
    let release = resolved.ok_or_else(|| GetBlenderError::VersionNotFound {
        requested: requested.label.clone(),
        seen: seen.into_iter().collect(),
    })?;

    tracing::info!(
        "Resolved Blender {} to {} ({})",
        requested,
        release.download_url,
        if release.is_nightly { "nightly" } else { "stable" }
    );
    Ok(release)
}
