//! `[publish]` section configuration.
//!
//! Controls which branch the build output is committed to and where it
//! gets pushed.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[publish]` section in docship.toml - publish branch and remote settings.
///
/// When `url` is unset the `[checkout].url` remote is reused, and when
/// neither is set the publish branch only exists inside the build directory.
///
/// # Example
/// ```toml
/// [publish]
/// branch = "gh-pages"
/// url = "https://github.com/user/project.git"
/// token_path = "~/.config/docship/token"
/// force = true
/// exclude = [".doctrees/", "*.buildinfo"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    /// Branch the build output is committed and pushed to (default: gh-pages).
    #[serde(default = "defaults::publish::branch")]
    #[educe(Default = defaults::publish::branch())]
    pub branch: String,

    /// Remote URL to push to. Falls back to `[checkout].url` when unset.
    #[serde(default = "defaults::publish::url")]
    #[educe(Default = defaults::publish::url())]
    pub url: Option<String>,

    /// Path to a file holding an access token, substituted into https URLs.
    #[serde(default = "defaults::publish::token_path")]
    #[educe(Default = defaults::publish::token_path())]
    pub token_path: Option<PathBuf>,

    /// Overwrite the remote branch history on push (default: true).
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub force: bool,

    /// Gitignore-style patterns excluded from the published tree.
    #[serde(default = "defaults::publish::exclude")]
    #[educe(Default = defaults::publish::exclude())]
    pub exclude: Vec<String>,
}
