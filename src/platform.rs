use crate::error::GetBlenderError;
use anyhow::Result;

/// Filename patterns that pick this host's build out of a release index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub os: String,
    pub machine_pattern: &'static str,
    pub extension_pattern: &'static str,
}

impl PlatformProfile {
    pub fn host() -> Result<Self> {
        Self::for_os(&host_os(std::env::consts::OS, |key| std::env::var(key).ok()))
    }

    pub fn for_os(os: &str) -> Result<Self> {
        let (machine_pattern, extension_pattern) = match os {
            "cygwin" | "msys" => {
                return Err(GetBlenderError::DisallowedPlatform { os: os.to_string() }.into());
            }
            "windows" => ("windows64", "zip"),
            "macos" => ("(macOS|OSX)", "(dmg|zip)"),
            _ => ("linux.*64", r"tar\.(bz2|gz|xz)"),
        };

        tracing::debug!(
            "Platform profile for '{}': machine={}, extension={}",
            os,
            machine_pattern,
            extension_pattern
        );

        Ok(PlatformProfile {
            os: os.to_string(),
            machine_pattern,
            extension_pattern,
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Pattern over an href; group 1 holds the advertised version and anything
    /// between it and the machine label.
    pub fn link_pattern(&self) -> String {
        format!(
            r"blender-(.+)-{}.+{}$",
            self.machine_pattern, self.extension_pattern
        )
    }
}

/// Windows builds launched from an MSYS or Cygwin shell report as `msys` or
/// `cygwin`. MinGW shells (`MSYSTEM=MINGW64` and friends) stay `windows`.
pub fn host_os(os: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if os != "windows" {
        return os.to_string();
    }
    if lookup("MSYSTEM").as_deref() == Some("MSYS") {
        return "msys".to_string();
    }
    if lookup("OSTYPE").is_some_and(|t| t.starts_with("cygwin")) {
        return "cygwin".to_string();
    }
    os.to_string()
}
