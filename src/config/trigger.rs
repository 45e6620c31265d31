//! `[trigger]` section configuration.
//!
//! Controls which pushed branches start a pipeline run.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[trigger]` section in docship.toml - branch filter for push events.
///
/// Patterns use glob matching: `release/*` matches one path segment,
/// `release/**` matches any depth. A push to a branch matching none of
/// the patterns triggers no run at all.
///
/// # Example
/// ```toml
/// [trigger]
/// branches = ["master", "docs", "release/*"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Branch patterns that start a run (default: `["master"]`).
    #[serde(default = "defaults::trigger::branches")]
    #[educe(Default = defaults::trigger::branches())]
    pub branches: Vec<String>,
}
