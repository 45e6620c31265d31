//! Pipeline configuration management for `docship.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                      |
//! |--------------|----------------------------------------------|
//! | `[trigger]`  | Branch patterns that start a run             |
//! | `[checkout]` | Source repository and submodule handling     |
//! | `[python]`   | Interpreter pin and dependency manifests     |
//! | `[docs]`     | Generator command and directories            |
//! | `[publish]`  | Target branch, remote URL, excludes          |
//! | `[serve]`    | Preview server (port, interface)             |
//!
//! # Example
//!
//! ```toml
//! [trigger]
//! branches = ["master", "release/*"]
//!
//! [checkout]
//! url = "https://github.com/user/project.git"
//!
//! [python]
//! version = "3.11"
//! requirements = ["requirements.txt", "docs/requirements-docs.txt"]
//!
//! [docs]
//! source = "docs/source"
//! build = "docs/build"
//! command = ["sphinx-build"]
//!
//! [publish]
//! branch = "gh-pages"
//! token_path = "~/.config/docship/token"
//! ```

mod checkout;
pub mod defaults;
mod docs;
mod error;
mod publish;
mod python;
mod serve;
mod trigger;

// Re-export public types used by other modules
pub use publish::PublishConfig;
pub use python::Pin;

// Internal imports used in this module
use checkout::CheckoutConfig;
use docs::DocsConfig;
use error::ConfigError;
use python::PythonConfig;
use serve::ServeConfig;
use trigger::TriggerConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing docship.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory (set after loading)
    #[serde(skip)]
    pub root: Option<PathBuf>,

    /// Branch filter for push events
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Source repository checkout settings
    #[serde(default)]
    pub checkout: CheckoutConfig,

    /// Interpreter and dependency settings
    #[serde(default)]
    pub python: PythonConfig,

    /// Generator settings
    #[serde(default)]
    pub docs: DocsConfig,

    /// Publish branch and remote settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl PipelineConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = Some(path.to_path_buf())
    }

    /// Get CLI arguments reference
    pub fn get_cli(&self) -> &'static Cli {
        self.cli.unwrap()
    }

    // ========================================================================
    // Pipeline Paths
    // ========================================================================

    /// Pipeline state directory (`<root>/.docship`).
    pub fn state_dir(&self) -> PathBuf {
        self.get_root().join(".docship")
    }

    /// Cached checkout of the source repository.
    pub fn checkout_dir(&self) -> PathBuf {
        self.state_dir().join("checkout")
    }

    /// Virtualenv the pipeline provisions and installs into.
    pub fn venv_dir(&self) -> PathBuf {
        self.state_dir().join("venv")
    }

    /// Record of the most recent run.
    pub fn report_path(&self) -> PathBuf {
        self.state_dir().join("last-run.json")
    }

    /// The work tree the pipeline operates on: the cached checkout when a
    /// remote is configured, the project root otherwise.
    pub fn workdir(&self) -> PathBuf {
        if self.checkout.url.is_some() {
            self.checkout_dir()
        } else {
            self.get_root().to_path_buf()
        }
    }

    /// Directory the generator writes into, resolved against the work tree.
    pub fn artifact_dir(&self) -> PathBuf {
        self.workdir().join(&self.docs.build)
    }

    /// Remote the publish branch is pushed to. `[publish.url]` wins,
    /// `[checkout.url]` is the fallback.
    pub fn publish_url(&self) -> Option<&str> {
        self.publish.url.as_deref().or(self.checkout.url.as_deref())
    }

    // ========================================================================
    // CLI Overrides
    // ========================================================================

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        // Determine the final root path based on command
        let root = match &cli.command {
            Commands::Init { name: Some(name) } => {
                let base = cli
                    .root
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|| self.get_root().to_owned());
                base.join(name)
            }
            _ => cli
                .root
                .as_ref()
                .cloned()
                .unwrap_or_else(|| self.get_root().to_owned()),
        };

        self.set_root(&root);
        self.update_path_with_root(&root);

        match &cli.command {
            Commands::Serve { interface, port } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
            Commands::Publish { force } => {
                Self::update_option(&mut self.publish.force, force.as_ref());
            }
            _ => {}
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize the root-anchored paths to absolute.
    ///
    /// `[docs]` and `[python]` paths deliberately stay relative: they resolve
    /// against the work tree, which may be the cached checkout rather than
    /// the project root.
    fn update_path_with_root(&mut self, root: &Path) {
        let cli = self.get_cli();

        // Normalize root to absolute path
        let root = Self::normalize_path(root);
        self.set_root(&root);

        // Normalize config path
        self.config_path = Self::normalize_path(&root.join(&cli.config));

        // Normalize token path (with tilde expansion)
        if let Some(token_path) = &self.publish.token_path {
            let expanded = shellexpand::tilde(token_path.to_str().unwrap()).into_owned();
            let path = PathBuf::from(expanded);
            self.publish.token_path = Some(if path.is_relative() {
                Self::normalize_path(&root.join(path))
            } else {
                Self::normalize_path(&path)
            });
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        let cli = self.get_cli();

        if !self.config_path.exists() {
            bail!(ConfigError::Missing(self.config_path.clone()));
        }

        if self.trigger.branches.is_empty() {
            bail!(ConfigError::Validation(
                "[trigger.branches] must have at least one pattern".into()
            ));
        }

        if self.trigger.branches.iter().any(|b| b.trim().is_empty()) {
            bail!(ConfigError::Validation(
                "[trigger.branches] must not contain empty patterns".into()
            ));
        }

        if let Some(url) = &self.checkout.url
            && url.trim().is_empty()
        {
            bail!(ConfigError::Validation(
                "[checkout.url] must not be empty".into()
            ));
        }

        if self.python.pin().is_none() {
            bail!(ConfigError::Validation(format!(
                "[python.version] `{}` is not a dotted version number",
                self.python.version
            )));
        }

        if self.python.requirements.is_empty() {
            bail!(ConfigError::Validation(
                "[python.requirements] must have at least one manifest".into()
            ));
        }

        if self.docs.command.is_empty() {
            bail!(ConfigError::Validation(
                "[docs.command] must have at least one element".into()
            ));
        }

        if self.docs.source == self.docs.build {
            bail!(ConfigError::Validation(
                "[docs.source] and [docs.build] must be different directories".into()
            ));
        }

        if self.docs.build.starts_with(&self.docs.source)
            || self.docs.source.starts_with(&self.docs.build)
        {
            bail!(ConfigError::Validation(
                "[docs.source] and [docs.build] must not contain each other".into()
            ));
        }

        if self.publish.branch.trim().is_empty() {
            bail!(ConfigError::Validation(
                "[publish.branch] must not be empty".into()
            ));
        }

        if self.publish.token_path.is_some()
            && let Some(url) = self.publish_url()
            && !url.starts_with("https://")
        {
            bail!(ConfigError::Validation(
                "[publish.token_path] requires an https:// push URL".into()
            ));
        }

        match &cli.command {
            Commands::Run { .. } | Commands::Publish { .. } => {
                Self::check_command_installed("git")?;

                if let Some(path) = &self.publish.token_path {
                    if !path.exists() {
                        bail!(ConfigError::Validation(
                            "[publish.token_path] not found".into()
                        ));
                    }
                    if !path.is_file() {
                        bail!(ConfigError::Validation(
                            "[publish.token_path] is not a file".into()
                        ));
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Check if a command is installed and available
    fn check_command_installed(cmd: &str) -> Result<()> {
        which::which(cmd).with_context(|| format!("`{cmd}` not found. Please install it first."))?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
