//! Installing pip and test dependencies into Blender's bundled python.

use crate::config::GET_PIP_URL;
use crate::download::download_file;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Requirements every Blender install gets, before any caller-supplied ones.
pub const BUNDLED_REQUIREMENTS: &str = include_str!("../assets/blender_requirements.txt");
pub const BUNDLED_REQUIREMENTS_FILE: &str = "blender_requirements.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    /// `python -m ensurepip`
    EnsurePip,
    /// `python get-pip.py` (Windows builds ship without ensurepip)
    GetPip,
    InstallRequirements,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapStep::EnsurePip => write!(f, "ensurepip"),
            BootstrapStep::GetPip => write!(f, "get-pip"),
            BootstrapStep::InstallRequirements => write!(f, "pip install"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: BootstrapStep,
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutcome {
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub steps: Vec<StepOutcome>,
}

impl BootstrapReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.success)
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

pub struct Bootstrapper {
    python: PathBuf,
    work_dir: PathBuf,
    windows: bool,
    requirements: Vec<PathBuf>,
}

impl Bootstrapper {
    pub fn new(python: &Path, work_dir: &Path, windows: bool) -> Self {
        Self {
            python: python.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            windows,
            requirements: Vec::new(),
        }
    }

    pub fn with_requirements(mut self, requirements: Vec<PathBuf>) -> Self {
        self.requirements = requirements;
        self
    }

    fn write_bundled_requirements(&self) -> Result<PathBuf> {
        let path = self.work_dir.join(BUNDLED_REQUIREMENTS_FILE);
        fs::write(&path, BUNDLED_REQUIREMENTS)
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(path)
    }

    pub fn install_args(&self, bundled: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-m", "pip", "install", "--upgrade", "-r"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(bundled.into());
        for extra in &self.requirements {
            args.push("-r".into());
            args.push(extra.into());
        }
        args
    }

    /// Runs every step in order and reports how each one ended. A step that
    /// exits non-zero does not stop the next one; a step that cannot be
    /// started at all is an error.
    pub async fn run(&self, client: &reqwest::Client) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::default();

        let pip_step = if self.windows {
            let get_pip = self.work_dir.join("get-pip.py");
            download_file(client, GET_PIP_URL, &get_pip).await?;
            self.run_step(BootstrapStep::GetPip, vec![get_pip.into()])?
        } else {
            self.run_step(BootstrapStep::EnsurePip, vec!["-m".into(), "ensurepip".into()])?
        };
        report.steps.push(pip_step);

        let bundled = self.write_bundled_requirements()?;
        let install_step =
            self.run_step(BootstrapStep::InstallRequirements, self.install_args(&bundled))?;
        report.steps.push(install_step);

        Ok(report)
    }

    fn run_step(&self, step: BootstrapStep, args: Vec<OsString>) -> Result<StepOutcome> {
        tracing::info!("Running {} with {}", step, self.python.display());
        tracing::debug!("{} {:?}", self.python.display(), args);

        let output = Command::new(&self.python)
            .args(&args)
            .current_dir(&self.work_dir)
            .output()
            .with_context(|| format!("Could not run {}", self.python.display()))?;

        let outcome = StepOutcome {
            step,
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::debug!("{} finished with {}", step, outcome.status_text());
        if !outcome.stdout.trim().is_empty() {
            tracing::trace!("{} output:\n{}", step, outcome.stdout.trim_end());
        }
        Ok(outcome)
    }
}
