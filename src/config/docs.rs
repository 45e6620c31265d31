//! `[docs]` section configuration.
//!
//! Controls the generator invocation and its directories.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[docs]` section in docship.toml - documentation generator settings.
///
/// The generator is invoked as `<command> <args...> <source> <build>`,
/// both directories resolved relative to the work tree. The command is
/// looked up in the virtualenv first, then on `PATH`.
///
/// # Example
/// ```toml
/// [docs]
/// source = "docs/source"
/// build = "docs/build"
/// command = ["sphinx-build"]
/// args = ["-W"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// Source directory handed to the generator (default: docs/source).
    #[serde(default = "defaults::docs::source")]
    #[educe(Default = defaults::docs::source())]
    pub source: PathBuf,

    /// Output directory the generator writes into (default: docs/build).
    #[serde(default = "defaults::docs::build")]
    #[educe(Default = defaults::docs::build())]
    pub build: PathBuf,

    /// Generator command (default: ["sphinx-build"]).
    #[serde(default = "defaults::docs::command")]
    #[educe(Default = defaults::docs::command())]
    pub command: Vec<String>,

    /// Extra arguments inserted before the source/build directories.
    #[serde(default = "defaults::docs::args")]
    #[educe(Default = defaults::docs::args())]
    pub args: Vec<String>,
}
