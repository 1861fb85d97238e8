use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "get-blender";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_BLENDER_VERSION: &str = "2.79b";
pub const DEFAULT_STABLE_INDEX: &str =
    "https://ftp.nluug.nl/pub/graphics/blender/release/Blender{version}";
pub const DEFAULT_NIGHTLY_INDEX: &str = "https://builder.blender.org/download";
pub const GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

pub const ENV_CACHE_DIR: &str = "BLENDER_CACHE";
pub const ENV_CONFIG_PATH: &str = "GET_BLENDER_CONFIG";
pub const ENV_STABLE_INDEX: &str = "GET_BLENDER_STABLE_INDEX";
pub const ENV_NIGHTLY_INDEX: &str = "GET_BLENDER_NIGHTLY_INDEX";
pub const ENV_STRICT_BOOTSTRAP: &str = "GET_BLENDER_STRICT_BOOTSTRAP";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Cache root; unset means the parent of the current directory.
    pub cache_dir: Option<String>,
    /// Stable listing, `{version}` is replaced by the `major.minor` token.
    pub stable_index: String,
    pub nightly_index: String,
    /// Extra requirement files installed into Blender's python.
    pub requirements: Vec<PathBuf>,
    pub strict_bootstrap: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            stable_index: DEFAULT_STABLE_INDEX.to_string(),
            nightly_index: DEFAULT_NIGHTLY_INDEX.to_string(),
            requirements: Vec::new(),
            strict_bootstrap: false,
        }
    }
}

pub fn get_config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Defaults, then the settings file if there is one, then the environment.
pub fn load_settings() -> Result<Settings> {
    let mut settings = match get_config_file_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Settings file: {}", path.display());
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Could not read settings file at {}", path.display()))?;
            parse_settings(&content, &path)?
        }
        _ => Settings::default(),
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub fn parse_settings(content: &str, path: &Path) -> Result<Settings> {
    let is_yaml = matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        serde_yaml::from_str(content)
            .with_context(|| format!("Could not parse {} as YAML", path.display()))
    } else {
        serde_json::from_str(content)
            .with_context(|| format!("Could not parse {} as JSON", path.display()))
    }
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(cache_dir) = lookup(ENV_CACHE_DIR) {
        tracing::info!("{} environment variable found {}", ENV_CACHE_DIR, cache_dir);
        settings.cache_dir = Some(cache_dir);
    }

    if let Some(url) = lookup(ENV_STABLE_INDEX) {
        settings.stable_index = url;
    }

    if let Some(url) = lookup(ENV_NIGHTLY_INDEX) {
        settings.nightly_index = url;
    }

    if let Some(strict) = lookup(ENV_STRICT_BOOTSTRAP) {
        settings.strict_bootstrap = strict.to_lowercase() == "true" || strict == "1";
    }
}

pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Requirement files are handed to pip running in the cache root, so relative
/// entries are anchored to `base` (the invocation directory) first.
pub fn absolute_requirements(paths: &[PathBuf], base: &Path) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| {
            let path = expand_home(&path.to_string_lossy());
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        })
        .collect()
}

/// Absolute cache root: the configured directory (created when missing), or
/// the parent of `cwd`.
pub fn resolve_cache_root(cache_dir: Option<&str>, cwd: &Path) -> Result<PathBuf> {
    let root = match cache_dir {
        Some(dir) => {
            let path = expand_home(dir);
            let path = if path.is_absolute() { path } else { cwd.join(path) };
            if path.exists() {
                tracing::info!("Cache directory already exists: {}", path.display());
            } else {
                tracing::info!("Creating cache directory: {}", path.display());
                fs::create_dir_all(&path).with_context(|| {
                    format!("Could not create cache directory {}", path.display())
                })?;
            }
            path
        }
        None => cwd.join(".."),
    };

    let root = root
        .canonicalize()
        .with_context(|| format!("Cache directory {} is not usable", root.display()))?;
    tracing::debug!("Cache root: {}", root.display());
    Ok(root)
}

pub fn render_settings(settings: &Settings, format: &str) -> Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(settings)?),
        "yaml" => Ok(serde_yaml::to_string(settings)?),
        other => Err(anyhow!("Unsupported format '{}'. Use json or yaml", other)),
    }
}
