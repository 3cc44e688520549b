//! Name → template registry for grok fragments.
//!
//! A [`PatternRegistry`] is a plain value: build it from fragment sources,
//! derive variants with [`PatternRegistry::merge`], and hand it to the
//! compiler by reference. Nothing mutates a registry after it has been
//! shared.
//!
//! Two process-wide caches sit on top:
//!
//! - [`default_registry`]: the bundled pattern set, built on first use.
//! - [`cached_registry`]: the bundled set overlaid with a pattern directory,
//!   memoized per canonical directory path.
//!
//! Both hand out `Arc<PatternRegistry>` handles; caller-supplied overrides are
//! merged into private copies and never reach the caches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::Result;
use crate::fragment::{FragmentSource, bundled_fragments, load_fragment_directory};

static DEFAULT_REGISTRY: OnceLock<Arc<PatternRegistry>> = OnceLock::new();

static DIRECTORY_REGISTRIES: OnceLock<Mutex<HashMap<PathBuf, Arc<PatternRegistry>>>> =
    OnceLock::new();

/// Registry of fragment templates keyed by fragment name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternRegistry {
    patterns: HashMap<String, String>,
}

impl PatternRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from one source. Later duplicates win.
    pub fn from_source(source: &FragmentSource) -> Self {
        Self::from_sources([source])
    }

    /// Build a registry from several sources applied in order.
    pub fn from_sources<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = &'a FragmentSource>,
    {
        let mut registry = Self::new();
        for source in sources {
            registry.extend_from_source(source);
        }
        registry
    }

    /// A freshly built copy of the bundled pattern set.
    pub fn bundled() -> Self {
        Self::from_source(&bundled_fragments())
    }

    /// Insert or replace one fragment, returning the previous template.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) -> Option<String> {
        self.patterns.insert(name.into(), template.into())
    }

    /// Apply every fragment of `source` on top of this registry.
    pub fn extend_from_source(&mut self, source: &FragmentSource) {
        for fragment in &source.fragments {
            self.insert(fragment.name.clone(), fragment.template.clone());
        }
    }

    /// Return a new registry equal to `self` with `overrides` applied on top.
    /// `self` is left untouched.
    pub fn merge<I, K, V>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        for (name, template) in overrides {
            merged.insert(name, template);
        }
        merged
    }

    /// Look up a fragment template by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.patterns.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// All fragment names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate `(name, template)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.patterns
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PatternRegistry {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        PatternRegistry::new().merge(iter)
    }
}

// =============================================================================
// Process-wide caches
// =============================================================================

/// The bundled pattern set, built once per process.
pub fn default_registry() -> Arc<PatternRegistry> {
    DEFAULT_REGISTRY
        .get_or_init(|| {
            let registry = PatternRegistry::bundled();
            tracing::debug!(fragments = registry.len(), "built default pattern registry");
            Arc::new(registry)
        })
        .clone()
}

/// The bundled pattern set overlaid with every fragment file in `dir`.
///
/// Built at most once per canonical directory path; concurrent callers for the
/// same directory wait for the first build and share its result. A failed
/// load is not cached.
pub fn cached_registry(dir: &Path) -> Result<Arc<PatternRegistry>> {
    let key = dir.canonicalize()?;
    let cache = DIRECTORY_REGISTRIES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(registry) = cache.get(&key) {
        return Ok(Arc::clone(registry));
    }

    let source = load_fragment_directory(&key)?;
    if !source.errors.is_empty() {
        tracing::warn!(
            dir = %key.display(),
            skipped = source.errors.len(),
            "some fragment definitions were skipped"
        );
    }

    let mut registry = (*default_registry()).clone();
    registry.extend_from_source(&source);
    tracing::debug!(
        dir = %key.display(),
        fragments = registry.len(),
        "built pattern registry for directory"
    );

    let registry = Arc::new(registry);
    cache.insert(key, Arc::clone(&registry));
    Ok(registry)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::parse_fragments;

    #[test]
    fn test_later_source_wins() {
        let a = parse_fragments("NUM [0-9]+\nWORD \\w+");
        let b = parse_fragments("NUM [0-9a-f]+");
        let reg = PatternRegistry::from_sources([&a, &b]);
        assert_eq!(reg.get("NUM"), Some("[0-9a-f]+"));
        assert_eq!(reg.get("WORD"), Some(r"\w+"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_duplicate_within_source_last_wins() {
        let reg = PatternRegistry::from_source(&parse_fragments("A one\nA two"));
        assert_eq!(reg.get("A"), Some("two"));
    }

    #[test]
    fn test_merge_does_not_mutate_base() {
        let base: PatternRegistry = [("A", "a"), ("B", "b")].into_iter().collect();
        let merged = base.merge([("B", "bb"), ("C", "c")]);

        assert_eq!(base.get("B"), Some("b"));
        assert!(!base.contains("C"));
        assert_eq!(merged.get("A"), Some("a"));
        assert_eq!(merged.get("B"), Some("bb"));
        assert_eq!(merged.get("C"), Some("c"));
    }

    #[test]
    fn test_names_sorted() {
        let reg: PatternRegistry = [("B", "b"), ("A", "a"), ("C", "c")].into_iter().collect();
        assert_eq!(reg.names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_default_registry_is_shared() {
        let a = default_registry();
        let b = default_registry();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.contains("WORD"));
        assert!(a.contains("GREEDYDATA"));
    }

    #[test]
    fn test_merge_over_default_leaves_cache_clean() {
        let merged = default_registry().merge([("WORD", "custom")]);
        assert_eq!(merged.get("WORD"), Some("custom"));
        assert_ne!(default_registry().get("WORD"), Some("custom"));
    }

    #[test]
    fn test_cached_registry_overlays_and_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("extra"), "MYFIELD [A-Z]{3}\nWORD [a-z]+\n").unwrap();

        let first = cached_registry(dir.path()).unwrap();
        assert_eq!(first.get("MYFIELD"), Some("[A-Z]{3}"));
        assert_eq!(first.get("WORD"), Some("[a-z]+"));
        assert!(first.contains("NUMBER"));

        // Later file edits are not observed: the directory was already built.
        std::fs::write(dir.path().join("extra"), "MYFIELD changed\n").unwrap();
        let second = cached_registry(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get("MYFIELD"), Some("[A-Z]{3}"));
    }

    #[test]
    fn test_cached_registry_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(cached_registry(&missing).is_err());
    }

    #[test]
    fn test_cached_registry_concurrent_single_build() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p"), "ONLY x\n").unwrap();
        let path = dir.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || cached_registry(&path).unwrap())
            })
            .collect();
        let regs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &regs[1..] {
            assert!(Arc::ptr_eq(&regs[0], r));
        }
    }
}
