use gix::{
    bstr::{BString, ByteSlice},
    glob::wildmatch,
};

// Constants for gix::ignore::search::pattern::Mode (which is private)
// See: https://github.com/Byron/gitoxide/blob/main/gix-ignore/src/search/pattern.rs
const MODE_NO_SUB_DIR: u32 = 1 << 0; // Pattern has no internal slash (matches basename unless absolute)
const MODE_MUST_MATCH_DIR: u32 = 1 << 2; // Pattern ends with slash (must match directory)
const MODE_NEGATIVE: u32 = 1 << 3; // Pattern starts with ! (negation)
const MODE_ABSOLUTE: u32 = 1 << 4; // Pattern starts with / (rooted at ignore file location)

/// Matches branch names against trigger patterns.
///
/// Patterns are matched against the whole ref name, so `docs/*` matches
/// `docs/sphinx` but neither `sphinx` nor `docs/a/b` (a single `*` never
/// crosses a slash; use `**` for that).
pub struct PatternSet {
    patterns: Vec<BString>,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| BString::from(p.as_ref()))
            .collect();
        Self { patterns }
    }

    /// Check if a name matches any pattern in the set.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            wildmatch(
                pattern.as_bstr(),
                name.into(),
                wildmatch::Mode::NO_MATCH_SLASH_LITERAL,
            )
        })
    }
}

/// Matches paths against gitignore-style exclude patterns.
///
/// Handles the usual gitignore rules:
/// - Pattern negation (!)
/// - Directory-only matches (ending with /)
/// - Absolute paths (starting with /)
/// - Basename vs path-relative matching
pub struct PathMatcher {
    // Store (pattern_text, mode_bits)
    patterns: Vec<(BString, u32)>,
}

impl PathMatcher {
    /// Parse gitignore-style bytes into patterns
    pub fn new(source: &[u8]) -> Self {
        let patterns: Vec<(BString, u32)> = gix::ignore::parse(source)
            .map(|(pattern, _, _)| (pattern.text, pattern.mode.bits()))
            .collect();
        Self { patterns }
    }

    /// Build a matcher from individual pattern lines (e.g. the
    /// `[publish] exclude` list from the config).
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        let joined = patterns
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(joined.as_bytes())
    }

    /// Check if a path matches any exclude pattern
    ///
    /// Implements git's ignore logic:
    /// - Iterates patterns in order (last match wins)
    /// - Handles negation (!)
    /// - Handles directory-only patterns (ending in /)
    /// - Handles basename vs path-relative matching
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        let mut is_excluded = false;
        for (text, mode) in &self.patterns {
            // If pattern must match a directory but path is not a directory, skip
            // e.g. ".doctrees/" should not match a file named ".doctrees"
            if (mode & MODE_MUST_MATCH_DIR != 0) && !is_dir {
                continue;
            }

            let mut match_path = path;
            let text_bytes = text.as_bstr();

            let is_absolute = mode & MODE_ABSOLUTE != 0;
            let has_internal_slash = mode & MODE_NO_SUB_DIR == 0;

            // If pattern is not absolute and has no internal slash, it matches
            // against the basename.
            // Example: "*.buildinfo" matches "html/.buildinfo" (basename).
            // Example: "/objects.inv" matches "objects.inv" but NOT "api/objects.inv".
            if !has_internal_slash && !is_absolute {
                match_path = path.rsplit_once('/').map_or(match_path, |(_, name)| name);
            }

            let is_match = wildmatch(
                text_bytes,
                match_path.into(),
                wildmatch::Mode::NO_MATCH_SLASH_LITERAL,
            );

            if is_match {
                // Negative patterns (starting with !) re-include the path
                is_excluded = mode & MODE_NEGATIVE == 0;
            }
        }
        is_excluded
    }
}
