//! Docs generation.
//!
//! Invokes the configured generator as `<command> <args...> <source>
//! <build>` in the work tree, with the virtualenv's bin directory first on
//! PATH. A generator that exits zero without producing any file fails the
//! step: publishing an empty site is worse than failing loudly.

use super::{PipelineContext, StepOutcome};
use crate::log;
use crate::utils::exec::{EMPTY_FILTER, exec_env};
use anyhow::{Context, Result, bail};
use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

pub fn run(ctx: &mut PipelineContext) -> Result<StepOutcome> {
    let config = ctx.config;
    let source = ctx.workdir.join(&config.docs.source);
    let build = ctx.workdir.join(&config.docs.build);

    if !source.is_dir() {
        bail!(
            "[docs.source] `{}` not found in `{}`",
            config.docs.source.display(),
            ctx.workdir.display()
        );
    }

    let tool = resolve_tool(ctx)?;
    log!("generate"; "{} {} -> {}",
        config.docs.command.join(" "),
        config.docs.source.display(),
        config.docs.build.display());

    let mut args: Vec<OsString> = config.docs.command[1..].iter().map(OsString::from).collect();
    args.extend(config.docs.args.iter().map(OsString::from));
    args.push(source.into());
    args.push(build.clone().into());

    let envs = venv_env(ctx);
    exec_env(Some(&ctx.workdir), &[tool.into()], &args, &envs, &EMPTY_FILTER)?;

    ensure_artifact(&build)?;
    Ok(StepOutcome::Completed)
}

/// The generator usually lives in the venv, installed by the manifests;
/// PATH is the fallback for system-wide tools.
fn resolve_tool(ctx: &PipelineContext) -> Result<PathBuf> {
    let name = ctx
        .config
        .docs
        .command
        .first()
        .context("[docs.command] is empty")?;

    if let Some(python) = &ctx.python {
        let candidate = python.bin_dir.join(tool_file_name(name));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    which::which(name).with_context(|| {
        format!(
            "`{name}` not found in the virtualenv or on PATH. \
             Is it missing from the requirements manifests?"
        )
    })
}

fn tool_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// PATH with the venv's bin directory in front, plus VIRTUAL_ENV, so the
/// generator and anything it spawns resolve inside the venv.
fn venv_env(ctx: &PipelineContext) -> Vec<(OsString, OsString)> {
    let Some(python) = &ctx.python else {
        return Vec::new();
    };

    let mut envs = vec![(
        OsString::from("VIRTUAL_ENV"),
        python.root.clone().into_os_string(),
    )];

    let mut paths = vec![python.bin_dir.clone()];
    if let Some(existing) = env::var_os("PATH") {
        paths.extend(env::split_paths(&existing));
    }
    if let Ok(joined) = env::join_paths(paths) {
        envs.push((OsString::from("PATH"), joined));
    }

    envs
}

/// The build directory must exist and contain at least one real file.
fn ensure_artifact(build: &Path) -> Result<()> {
    if !build.is_dir() {
        bail!(
            "Generator reported success but `{}` does not exist",
            build.display()
        );
    }

    let has_files = WalkDir::new(build)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(Result::ok)
        .any(|entry| entry.file_type().is_file());
    if !has_files {
        bail!("Generator produced no files in `{}`", build.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::provision::PythonEnv;
    use super::*;
    use crate::config::PipelineConfig;
    use std::fs;

    fn make_ctx(root: &Path, command: &[&str]) -> PipelineContext {
        let mut config = PipelineConfig::default();
        config.docs.command = command.iter().map(|s| (*s).to_string()).collect();
        config.set_root(root);
        let config: &'static PipelineConfig = Box::leak(Box::new(config));
        PipelineContext::new(config, config.workdir())
    }

    #[test]
    fn test_ensure_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build");

        // Missing directory
        let err = ensure_artifact(&build).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        // Empty directory
        fs::create_dir_all(&build).unwrap();
        let err = ensure_artifact(&build).unwrap_err();
        assert!(err.to_string().contains("no files"));

        // Only repository metadata does not count as output
        fs::create_dir_all(build.join(".git")).unwrap();
        fs::write(build.join(".git").join("config"), "[core]").unwrap();
        let err = ensure_artifact(&build).unwrap_err();
        assert!(err.to_string().contains("no files"));

        // A real file does
        fs::write(build.join("index.html"), "<html></html>").unwrap();
        assert!(ensure_artifact(&build).is_ok());
    }

    #[test]
    fn test_resolve_tool_prefers_venv() {
        let dir = tempfile::tempdir().unwrap();
        let bin_dir = dir.path().join("venv").join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        let tool = bin_dir.join(tool_file_name("sphinx-build"));
        fs::write(&tool, "#!/bin/sh\n").unwrap();

        let mut ctx = make_ctx(dir.path(), &["sphinx-build"]);
        ctx.python = Some(PythonEnv {
            root: dir.path().join("venv"),
            interpreter: bin_dir.join("python"),
            bin_dir,
        });

        assert_eq!(resolve_tool(&ctx).unwrap(), tool);
    }

    #[test]
    fn test_resolve_tool_unknown_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_ctx(dir.path(), &["docship-no-such-generator"]);

        let err = resolve_tool(&ctx).unwrap_err();
        assert!(err.to_string().contains("not found in the virtualenv"));
    }

    #[test]
    fn test_missing_source_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), &["sphinx-build"]);

        let err = run(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("[docs.source]"));
    }

    #[test]
    fn test_venv_env_prepends_bin_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = make_ctx(dir.path(), &["sphinx-build"]);
        let venv = dir.path().join("venv");
        ctx.python = Some(PythonEnv {
            root: venv.clone(),
            interpreter: venv.join("bin").join("python"),
            bin_dir: venv.join("bin"),
        });

        let envs = venv_env(&ctx);
        let path = envs
            .iter()
            .find(|(key, _)| key == "PATH")
            .map(|(_, value)| value.clone())
            .unwrap();
        let first = env::split_paths(&path).next().unwrap();
        assert_eq!(first, venv.join("bin"));

        assert!(envs.iter().any(|(key, _)| key == "VIRTUAL_ENV"));
    }
}
