//! Dependency installation.
//!
//! Upgrades pip, then installs each `[python.requirements]` manifest in
//! configured order inside the virtualenv. All manifests are checked before
//! pip runs at all, so a typo in the config cannot leave a half-installed
//! venv behind.

use super::{PipelineContext, StepOutcome};
use crate::utils::exec::FilterRule;
use crate::{exec, log};
use anyhow::{Context, Result, bail};

/// pip repeats itself a lot; keep only the interesting lines.
const PIP_FILTER: FilterRule = FilterRule::new(&[
    "Requirement already satisfied",
    "Collecting ",
    "Downloading ",
    "Using cached ",
    "Preparing metadata",
    "Installing collected packages",
    "Successfully installed",
    "[notice]",
]);

pub fn run(ctx: &mut PipelineContext) -> Result<StepOutcome> {
    let config = ctx.config;
    let python = ctx
        .python
        .as_ref()
        .context("Interpreter provisioning did not run")?;

    let mut manifests = Vec::new();
    for manifest in &config.python.requirements {
        let path = ctx.workdir.join(manifest);
        if !path.is_file() {
            bail!(
                "Dependency manifest `{}` not found in `{}`",
                manifest.display(),
                ctx.workdir.display()
            );
        }
        manifests.push(path);
    }

    log!("install"; "upgrading pip");
    exec!(filter=&PIP_FILTER; &ctx.workdir; &python.interpreter; "-m", "pip", "install", "--upgrade", "pip")?;

    for manifest in &manifests {
        log!("install"; "pip install -r {}", manifest.display());
        exec!(filter=&PIP_FILTER; &ctx.workdir; &python.interpreter; "-m", "pip", "install", "-r", manifest)?;
    }

    Ok(StepOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::super::provision::PythonEnv;
    use super::*;
    use crate::config::PipelineConfig;
    use std::path::{Path, PathBuf};

    fn make_ctx(root: &Path) -> PipelineContext {
        let mut config = PipelineConfig::default();
        config.python.requirements = vec![PathBuf::from("requirements.txt")];
        config.set_root(root);
        let config: &'static PipelineConfig = Box::leak(Box::new(config));
        let mut ctx = PipelineContext::new(config, config.workdir());
        ctx.python = Some(PythonEnv {
            root: PathBuf::from("/definitely/not/here/venv"),
            interpreter: PathBuf::from("/definitely/not/here/venv/bin/python"),
            bin_dir: PathBuf::from("/definitely/not/here/venv/bin"),
        });
        ctx
    }

    #[test]
    fn test_missing_manifest_fails_before_pip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());

        // The interpreter path is unrunnable; reaching pip would be a
        // different error than the one asserted here
        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("requirements.txt"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_manifests_checked_then_pip_invoked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "sphinx\n").unwrap();
        let mut ctx = make_ctx(dir.path());

        // All manifests exist, so the step proceeds to pip and trips over
        // the unrunnable interpreter
        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }

    #[test]
    fn test_requires_provisioned_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path());
        ctx.python = None;

        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("provisioning did not run"));
    }
}
