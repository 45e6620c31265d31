//! `[checkout]` section configuration.
//!
//! Controls where the documentation source is fetched from.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[checkout]` section in docship.toml - source repository settings.
///
/// With a `url`, docship keeps a mirror clone under `.docship/checkout`
/// and updates it on every run. Without one, the project root itself is
/// the work tree (the typical git-hook setup).
///
/// # Example
/// ```toml
/// [checkout]
/// url = "https://github.com/alice/project.git"
/// submodules = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// Clone URL of the source repository. Unset means the project root
    /// is used in place.
    #[serde(default = "defaults::checkout::url")]
    #[educe(Default = defaults::checkout::url())]
    pub url: Option<String>,

    /// Initialize and update nested repositories recursively (default: true).
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub submodules: bool,
}
