//! Path exclusion by configured patterns.
//!
//! Patterns are unanchored regexes compiled once per run; a path is
//! excluded when any pattern matches any substring of it. An empty
//! pattern list excludes nothing.

use std::path::{Path, PathBuf};

use regex::Regex;

/// Compiled exclusion patterns for one run.
pub struct ExclusionFilter {
    patterns: Vec<Regex>,
}

impl ExclusionFilter {
    /// Compiles the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile. This is fatal
    /// before any remote call.
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether any pattern matches anywhere in the path.
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.patterns.iter().any(|regex| regex.is_match(&text))
    }

    /// Removes excluded paths, preserving order.
    #[must_use]
    pub fn filter(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        if self.patterns.is_empty() {
            return paths;
        }
        paths
            .into_iter()
            .filter(|path| !self.is_excluded(path))
            .collect()
    }
}
