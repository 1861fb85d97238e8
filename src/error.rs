//! Fatal conditions of a get-blender run.
//!
//! Every variant terminates the run; nothing here is retried. Functions keep
//! returning `anyhow::Result` and convert these with `.into()`, so callers can
//! still `downcast_ref::<GetBlenderError>()` to tell the categories apart.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GetBlenderError {
    /// Input error: no `major.minor` pair in the requested version.
    #[error("Blender version cannot be guessed from '{input}'")]
    UnparseableVersion { input: String },

    /// Resolution error: neither index advertises the requested version.
    #[error("Unable to find Blender {requested} in the release or nightly indexes, versions available: {}", seen.join(", "))]
    VersionNotFound {
        requested: String,
        seen: Vec<String>,
    },

    /// Format error: the archive suffix is not one we know how to unpack.
    #[error("Unknown archive extension: {}. Will not extract it", path.display())]
    UnknownArchiveFormat { path: PathBuf },

    #[error("Disk images can only be mounted on macOS: {}", path.display())]
    #[cfg_attr(target_os = "macos", allow(dead_code))]
    DiskImageUnsupported { path: PathBuf },

    /// Integrity error: the macOS bundle has no Blender executable.
    #[error("Blender macOS executable not found in directory: {}", dir.display())]
    MissingExecutable { dir: PathBuf },

    /// Integrity error: nothing in the archive looks like Blender's bundled python.
    #[error("Blender's bundled python executable could not be found within {}", root.display())]
    InterpreterNotFound { root: PathBuf },

    /// Environment error: running under a POSIX emulation layer on Windows.
    #[error("Do not run this under {os}, run it under Linux, macOS or the Windows command prompt")]
    DisallowedPlatform { os: String },

    #[error("Bootstrap step '{step}' failed with {status}: {stderr}")]
    BootstrapFailed {
        step: String,
        status: String,
        stderr: String,
    },
}
