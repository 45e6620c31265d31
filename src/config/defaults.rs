//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [trigger] Section Defaults
// ============================================================================

pub mod trigger {
    pub fn branches() -> Vec<String> {
        vec!["master".into()]
    }
}

// ============================================================================
// [checkout] Section Defaults
// ============================================================================

pub mod checkout {
    pub fn url() -> Option<String> {
        None
    }
}

// ============================================================================
// [python] Section Defaults
// ============================================================================

pub mod python {
    use std::path::PathBuf;

    pub fn version() -> String {
        "3".into()
    }

    pub fn requirements() -> Vec<PathBuf> {
        vec![
            "requirements.txt".into(),
            "docs/requirements-docs.txt".into(),
        ]
    }
}

// ============================================================================
// [docs] Section Defaults
// ============================================================================

pub mod docs {
    use std::path::PathBuf;

    pub fn source() -> PathBuf {
        "docs/source".into()
    }

    pub fn build() -> PathBuf {
        "docs/build".into()
    }

    pub fn command() -> Vec<String> {
        vec!["sphinx-build".into()]
    }

    pub fn args() -> Vec<String> {
        Vec::new()
    }
}

// ============================================================================
// [publish] Section Defaults
// ============================================================================

pub mod publish {
    use std::path::PathBuf;

    pub fn branch() -> String {
        "gh-pages".into()
    }

    pub fn url() -> Option<String> {
        None
    }

    pub fn token_path() -> Option<PathBuf> {
        None
    }

    pub fn exclude() -> Vec<String> {
        vec![".doctrees/".into(), "*.buildinfo".into()]
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8923
    }
}
