//! Project scaffolding.
//!
//! Creates a fresh pipeline project: default configuration, docs source
//! directory, ignore files and an initial commit.

use crate::{config::PipelineConfig, exec, utils::git};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Files to write ignore patterns to
const IGNORE_FILES: &[&str] = &[".gitignore", ".ignore"];

/// Default config filename
const CONFIG_FILE: &str = "docship.toml";

/// Create a new pipeline project with default structure
pub fn new_project(config: &'static PipelineConfig, has_name: bool) -> Result<()> {
    let root = config.get_root();

    // Safety check: if no name was provided (init in current dir),
    // the directory must be completely empty
    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `docship init <NAME>` to create in a subdirectory."
        );
    }

    git::create_repo(root)?;
    init_source_dir(root, config)?;
    init_default_config(root)?;
    init_ignored_files(
        root,
        &[
            "/.docship/".to_string(),
            format!("/{}/", config.docs.build.display()),
        ],
    )?;

    ensure_commit_identity(root)?;
    let repo = git::open_repo(root)?;
    git::commit_all(&repo, "initial commit")?;

    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write default configuration file
fn init_default_config(root: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&PipelineConfig::default())?;
    fs::write(root.join(CONFIG_FILE), content)?;
    Ok(())
}

/// Create the docs source directory
fn init_source_dir(root: &Path, config: &PipelineConfig) -> Result<()> {
    let path = root.join(&config.docs.source);
    if path.exists() {
        bail!(
            "Path `{}` already exists. Try `docship init <NAME>` instead.",
            path.display()
        );
    }
    fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(())
}

/// Initialize .gitignore and .ignore files with the given patterns
fn init_ignored_files(root: &Path, patterns: &[String]) -> Result<()> {
    let content = patterns.join("\n");

    for filename in IGNORE_FILES {
        let path = root.join(filename);
        if !path.exists() {
            fs::write(&path, &content)?;
        }
    }

    Ok(())
}

/// The scaffold commit needs an author. When the host has no git identity
/// configured, fall back to a repo-local one rather than failing the init.
fn ensure_commit_identity(root: &Path) -> Result<()> {
    let has_identity = std::process::Command::new("git")
        .args(["config", "user.email"])
        .current_dir(root)
        .output()
        .map(|out| out.status.success() && !out.stdout.is_empty())
        .unwrap_or(false);

    if !has_identity {
        exec!(root; ["git"]; "config", "user.name", "docship")?;
        exec!(root; ["git"]; "config", "user.email", "docship@localhost")?;
    }
    Ok(())
}
