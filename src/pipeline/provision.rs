//! Interpreter provisioning.
//!
//! Finds a host interpreter that satisfies `[python.version]` and keeps a
//! virtualenv built from it under `.docship/venv`. The venv is recreated
//! when its interpreter stops satisfying the pin (host python upgraded, pin
//! tightened in the config).

use super::{PipelineContext, StepOutcome};
use crate::config::Pin;
use crate::{exec, log};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    sync::OnceLock,
};

/// Handle to the provisioned virtualenv.
pub struct PythonEnv {
    /// The venv directory itself.
    pub root: PathBuf,
    /// Interpreter inside the venv.
    pub interpreter: PathBuf,
    /// The venv's executable directory, for PATH prepending.
    pub bin_dir: PathBuf,
}

pub fn run(ctx: &mut PipelineContext) -> Result<StepOutcome> {
    let config = ctx.config;
    let pin = config.python.pin().with_context(|| {
        format!(
            "[python.version] `{}` is not a dotted version number",
            config.python.version
        )
    })?;

    let venv_dir = config.venv_dir();
    let venv_python = venv_python_path(&venv_dir);

    let outcome = match probe_version(&venv_python) {
        Some(version) if pin.accepts(version) => {
            log!("provision"; "virtualenv python {} satisfies `{}`",
                fmt_version(version), config.python.version);
            StepOutcome::Unchanged
        }
        stale => {
            if stale.is_some() {
                log!("provision"; "virtualenv no longer satisfies `{}`, recreating",
                    config.python.version);
            }
            if venv_dir.exists() {
                fs::remove_dir_all(&venv_dir)
                    .with_context(|| format!("Failed to remove `{}`", venv_dir.display()))?;
            }

            let (host, version) = find_host_interpreter(&pin, &config.python.version)?;
            log!("provision"; "creating virtualenv from `{}` (python {})",
                host.display(), fmt_version(version));
            exec!(&host; "-m", "venv", venv_dir.clone())?;
            StepOutcome::Completed
        }
    };

    ctx.python = Some(PythonEnv {
        root: venv_dir.clone(),
        interpreter: venv_python,
        bin_dir: venv_bin_dir(&venv_dir),
    });
    Ok(outcome)
}

/// Probe the pin's candidates (`python3.11`, `python3`, `python`) until one
/// reports a satisfying version.
fn find_host_interpreter(pin: &Pin, requested: &str) -> Result<(PathBuf, (u32, u32, u32))> {
    let mut rejected = Vec::new();
    for candidate in pin.candidates() {
        let Ok(path) = which::which(&candidate) else {
            continue;
        };
        let Some(version) = probe_version(&path) else {
            continue;
        };
        if pin.accepts(version) {
            return Ok((path, version));
        }
        rejected.push(format!("{candidate} is {}", fmt_version(version)));
    }

    if rejected.is_empty() {
        bail!(
            "No python interpreter found for [python.version] `{requested}`. \
             Install one and make sure it is on PATH."
        );
    }
    bail!(
        "No python interpreter satisfies [python.version] `{requested}` ({})",
        rejected.join(", ")
    )
}

/// Run `<python> --version` quietly and parse the result. Failure to run is
/// an answer here, not an error: candidates get skipped, a missing venv gets
/// built.
fn probe_version(python: &Path) -> Option<(u32, u32, u32)> {
    let output = Command::new(python).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }

    // Old interpreters print the version on stderr
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    parse_version(&text)
}

fn parse_version(text: &str) -> Option<(u32, u32, u32)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"Python (\d+)\.(\d+)\.(\d+)").unwrap());

    let caps = re.captures(text)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

fn fmt_version((major, minor, patch): (u32, u32, u32)) -> String {
    format!("{major}.{minor}.{patch}")
}

fn venv_bin_dir(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts")
    } else {
        venv_dir.join("bin")
    }
}

fn venv_python_path(venv_dir: &Path) -> PathBuf {
    let name = if cfg!(windows) { "python.exe" } else { "python" };
    venv_bin_dir(venv_dir).join(name)
}
