//! `[python]` section configuration.
//!
//! Controls interpreter pinning and dependency manifests.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[python]` section in docship.toml - interpreter and dependencies.
///
/// The version is a prefix pin: `"3"` accepts any Python 3, `"3.11"`
/// accepts 3.11.x. Manifests are installed strictly in list order, each
/// resolved relative to the work tree.
///
/// # Example
/// ```toml
/// [python]
/// version = "3.11"
/// requirements = ["requirements.txt", "docs/requirements-docs.txt"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PythonConfig {
    /// Interpreter version pin, matched by prefix (default: "3").
    #[serde(default = "defaults::python::version")]
    #[educe(Default = defaults::python::version())]
    pub version: String,

    /// Dependency manifests, installed in order (default: requirements.txt
    /// then docs/requirements-docs.txt).
    #[serde(default = "defaults::python::requirements")]
    #[educe(Default = defaults::python::requirements())]
    pub requirements: Vec<PathBuf>,
}

impl PythonConfig {
    /// Parse the configured version string into a pin.
    pub fn pin(&self) -> Option<Pin> {
        Pin::parse(&self.version)
    }
}

/// A parsed interpreter version pin like `3`, `3.11` or `3.11.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub major: u32,
    pub minor: Option<u32>,
    pub patch: Option<u32>,
}

impl Pin {
    /// Parse a dotted version pin. Returns None for anything but one to
    /// three numeric components.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split('.');

        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => Some(p.parse().ok()?),
            None => None,
        };
        let patch = match parts.next() {
            Some(p) => Some(p.parse().ok()?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
        })
    }

    /// Check whether a concrete interpreter version satisfies this pin.
    pub fn accepts(&self, version: (u32, u32, u32)) -> bool {
        let (major, minor, patch) = version;
        self.major == major
            && self.minor.is_none_or(|m| m == minor)
            && self.patch.is_none_or(|p| p == patch)
    }

    /// Interpreter names to probe, most specific first.
    pub fn candidates(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(minor) = self.minor {
            names.push(format!("python{}.{minor}", self.major));
        }
        names.push(format!("python{}", self.major));
        names.push("python".into());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::super::PipelineConfig;
    use super::*;

    #[test]
    fn test_python_config() {
        let config = r#"
            [python]
            version = "3.11"
            requirements = ["requirements.txt"]
        "#;
        let config: PipelineConfig = toml::from_str(config).unwrap();

        assert_eq!(config.python.version, "3.11");
        assert_eq!(
            config.python.requirements,
            vec![PathBuf::from("requirements.txt")]
        );
    }

    #[test]
    fn test_python_config_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();

        assert_eq!(config.python.version, "3");
        assert_eq!(
            config.python.requirements,
            vec![
                PathBuf::from("requirements.txt"),
                PathBuf::from("docs/requirements-docs.txt"),
            ]
        );
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [python]
            virtualenv = ".venv"
        "#;
        let result: Result<PipelineConfig, _> = toml::from_str(config);

        assert!(result.is_err());
    }

    #[test]
    fn test_pin_parse() {
        assert_eq!(
            Pin::parse("3"),
            Some(Pin {
                major: 3,
                minor: None,
                patch: None
            })
        );
        assert_eq!(
            Pin::parse("3.11"),
            Some(Pin {
                major: 3,
                minor: Some(11),
                patch: None
            })
        );
        assert_eq!(
            Pin::parse("3.11.9"),
            Some(Pin {
                major: 3,
                minor: Some(11),
                patch: Some(9)
            })
        );
    }

    #[test]
    fn test_pin_parse_invalid() {
        assert_eq!(Pin::parse(""), None);
        assert_eq!(Pin::parse("three"), None);
        assert_eq!(Pin::parse("3."), None);
        assert_eq!(Pin::parse("3.x"), None);
        assert_eq!(Pin::parse("3.11.9.1"), None);
    }

    #[test]
    fn test_pin_accepts_prefix() {
        let pin = Pin::parse("3").unwrap();
        assert!(pin.accepts((3, 11, 9)));
        assert!(pin.accepts((3, 8, 0)));
        assert!(!pin.accepts((2, 7, 18)));

        let pin = Pin::parse("3.11").unwrap();
        assert!(pin.accepts((3, 11, 0)));
        assert!(pin.accepts((3, 11, 9)));
        assert!(!pin.accepts((3, 12, 0)));

        let pin = Pin::parse("3.11.9").unwrap();
        assert!(pin.accepts((3, 11, 9)));
        assert!(!pin.accepts((3, 11, 8)));
    }

    #[test]
    fn test_pin_candidates() {
        let pin = Pin::parse("3.11").unwrap();
        assert_eq!(pin.candidates(), vec!["python3.11", "python3", "python"]);

        let pin = Pin::parse("3").unwrap();
        assert_eq!(pin.candidates(), vec!["python3", "python"]);

        // A patch pin narrows verification, not the probe list
        let pin = Pin::parse("3.11.9").unwrap();
        assert_eq!(pin.candidates(), vec!["python3.11", "python3", "python"]);
    }
}
