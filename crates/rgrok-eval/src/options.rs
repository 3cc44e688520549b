//! Compiler and matcher configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rgrok_patterns::{PatternRegistry, cached_registry, default_registry};

use crate::error::Result;

/// Default regex engine memory budget: 100 MiB.
pub const DEFAULT_SIZE_LIMIT: usize = 100 << 20;

/// Default bound on fragment nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options for compiling and matching a grok pattern.
#[derive(Debug, Clone)]
pub struct GrokOptions {
    /// Extra fragments merged over the default set. These win over both the
    /// bundled patterns and `custom_patterns_dir`.
    pub custom_patterns: HashMap<String, String>,

    /// Directory of additional fragment files overlaid on the bundled set.
    /// Loaded once per process per directory.
    pub custom_patterns_dir: Option<PathBuf>,

    /// Require the whole input to match. When `false`, the first matching
    /// substring is used.
    ///
    /// Default: `true`.
    pub full_match: bool,

    /// Turn bare `%{NAME}` references into output fields named `NAME`.
    ///
    /// Default: `false`.
    pub match_unnamed_groks: bool,

    /// Keep groups that did not participate in a match as `null` instead of
    /// dropping them.
    ///
    /// Default: `false`.
    pub keep_empty_captures: bool,

    /// Memory budget forwarded to the regex engine, in bytes.
    ///
    /// Default: [`DEFAULT_SIZE_LIMIT`].
    pub size_limit: usize,

    /// Maximum fragment nesting depth.
    ///
    /// Default: [`DEFAULT_MAX_DEPTH`].
    pub max_depth: usize,
}

impl Default for GrokOptions {
    fn default() -> Self {
        GrokOptions {
            custom_patterns: HashMap::new(),
            custom_patterns_dir: None,
            full_match: true,
            match_unnamed_groks: false,
            keep_empty_captures: false,
            size_limit: DEFAULT_SIZE_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl GrokOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one custom fragment.
    pub fn with_pattern(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.custom_patterns.insert(name.into(), template.into());
        self
    }

    /// Add or replace several custom fragments.
    pub fn with_patterns<I, K, V>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.custom_patterns
            .extend(patterns.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_patterns_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.custom_patterns_dir = Some(dir.into());
        self
    }

    pub fn full_match(mut self, full_match: bool) -> Self {
        self.full_match = full_match;
        self
    }

    pub fn match_unnamed_groks(mut self, enabled: bool) -> Self {
        self.match_unnamed_groks = enabled;
        self
    }

    pub fn keep_empty_captures(mut self, enabled: bool) -> Self {
        self.keep_empty_captures = enabled;
        self
    }

    pub fn size_limit(mut self, bytes: usize) -> Self {
        self.size_limit = bytes;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Resolve the registry these options describe.
    ///
    /// Starts from the cached default (or directory) registry and, if custom
    /// patterns are present, merges them into a private copy.
    pub fn registry(&self) -> Result<Arc<PatternRegistry>> {
        let base = match &self.custom_patterns_dir {
            Some(dir) => cached_registry(dir)?,
            None => default_registry(),
        };

        if self.custom_patterns.is_empty() {
            return Ok(base);
        }
        Ok(Arc::new(base.merge(
            self.custom_patterns
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = GrokOptions::default();
        assert!(opts.full_match);
        assert!(!opts.match_unnamed_groks);
        assert!(!opts.keep_empty_captures);
        assert_eq!(opts.size_limit, 100 * 1024 * 1024);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_registry_without_customs_is_shared_default() {
        let reg = GrokOptions::default().registry().unwrap();
        assert!(Arc::ptr_eq(&reg, &default_registry()));
    }

    #[test]
    fn test_custom_patterns_are_private() {
        let opts = GrokOptions::new().with_pattern("WORD", "[xyz]+");
        let reg = opts.registry().unwrap();
        assert_eq!(reg.get("WORD"), Some("[xyz]+"));
        assert_ne!(default_registry().get("WORD"), Some("[xyz]+"));
    }

    #[test]
    fn test_custom_patterns_win_over_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p"), "CODE [0-9]{3}\nNAME [a-z]+\n").unwrap();
        let opts = GrokOptions::new()
            .with_patterns_dir(dir.path())
            .with_patterns([("NAME", "[A-Z]+")]);
        let reg = opts.registry().unwrap();
        assert_eq!(reg.get("CODE"), Some("[0-9]{3}"));
        assert_eq!(reg.get("NAME"), Some("[A-Z]+"));
        assert!(reg.contains("NUMBER"));
    }
}
