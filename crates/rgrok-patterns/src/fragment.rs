//! Line-oriented fragment sources.
//!
//! A fragment source is a text file with one definition per line:
//!
//! ```text
//! # comment
//! WORD \b\w+\b
//! GREETING %{WORD:greeting} world
//! ```
//!
//! The name ends at the first whitespace character; the rest of the line,
//! trimmed, is the regex template. Malformed lines are recorded in
//! [`FragmentSource::errors`] and skipped, so one bad line never prevents the
//! rest of a file from loading.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// Pattern files shipped with the crate, in load order.
pub const BUNDLED_PATTERNS: &[(&str, &str)] = &[
    ("grok-patterns", include_str!("../patterns/grok-patterns")),
    ("httpd", include_str!("../patterns/httpd")),
    ("linux-syslog", include_str!("../patterns/linux-syslog")),
];

/// One named, reusable regex template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternFragment {
    pub name: String,
    pub template: String,
}

impl PatternFragment {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        PatternFragment {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// The fragments read from one or more sources, in file order, plus the
/// messages for every line that was skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FragmentSource {
    pub fragments: Vec<PatternFragment>,
    pub errors: Vec<String>,
}

impl FragmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Append another source after this one, keeping load order.
    pub fn extend(&mut self, other: FragmentSource) {
        self.fragments.extend(other.fragments);
        self.errors.extend(other.errors);
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Parse fragment definitions from text.
pub fn parse_fragments(text: &str) -> FragmentSource {
    let mut source = FragmentSource::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Ok(fragment) => source.fragments.push(fragment),
            Err(reason) => {
                let msg = format!("line {}: {reason}", idx + 1);
                tracing::warn!("skipping fragment definition, {msg}");
                source.errors.push(msg);
            }
        }
    }

    source
}

/// Parse a single fragment file.
pub fn load_fragment_file(path: &Path) -> Result<FragmentSource> {
    let content = std::fs::read_to_string(path)?;
    let mut source = parse_fragments(&content);
    for err in &mut source.errors {
        *err = format!("{}: {err}", path.display());
    }
    tracing::debug!(
        path = %path.display(),
        fragments = source.len(),
        skipped = source.errors.len(),
        "loaded fragment file"
    );
    Ok(source)
}

/// Parse every fragment file in a directory.
///
/// Files are read in file-name order so that redefinitions resolve the same
/// way on every platform. Hidden files and subdirectories are ignored.
pub fn load_fragment_directory(dir: &Path) -> Result<FragmentSource> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if path.is_file() && !hidden {
            paths.push(path);
        }
    }
    paths.sort();

    let mut source = FragmentSource::new();
    for path in &paths {
        source.extend(load_fragment_file(path)?);
    }
    Ok(source)
}

/// Parse the pattern files compiled into the crate.
pub fn bundled_fragments() -> FragmentSource {
    let mut source = FragmentSource::new();
    for (name, text) in BUNDLED_PATTERNS {
        let mut sub = parse_fragments(text);
        for err in &mut sub.errors {
            *err = format!("{name}: {err}");
        }
        source.extend(sub);
    }
    source
}

// =============================================================================
// Line parsing
// =============================================================================

fn parse_line(line: &str) -> std::result::Result<PatternFragment, String> {
    let Some((name, template)) = line.split_once(|c: char| c.is_ascii_whitespace()) else {
        return Err(format!("missing template for '{line}'"));
    };

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid fragment name '{name}'"));
    }

    let template = template.trim();
    if template.is_empty() {
        return Err(format!("missing template for '{name}'"));
    }

    Ok(PatternFragment::new(name, template))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_lines() {
        let src = parse_fragments("WORD \\b\\w+\\b\nNUMBER [0-9]+\n");
        assert_eq!(src.len(), 2);
        assert_eq!(src.fragments[0], PatternFragment::new("WORD", r"\b\w+\b"));
        assert_eq!(src.fragments[1], PatternFragment::new("NUMBER", "[0-9]+"));
        assert!(src.errors.is_empty());
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let src = parse_fragments("# header\n\n   \n  # indented comment\nA a\n");
        assert_eq!(src.len(), 1);
        assert!(src.errors.is_empty());
    }

    #[test]
    fn test_template_keeps_inner_spaces() {
        let src = parse_fragments("PAIR   %{WORD:k} = %{WORD:v}  ");
        assert_eq!(src.fragments[0].template, "%{WORD:k} = %{WORD:v}");
    }

    #[test]
    fn test_tab_separator() {
        let src = parse_fragments("TAB\t[a-z]+");
        assert_eq!(src.fragments[0], PatternFragment::new("TAB", "[a-z]+"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let src = parse_fragments("GOOD x\nNOSEPARATOR\nBAD-NAME y\nALSO_GOOD z");
        assert_eq!(src.len(), 2);
        assert_eq!(src.errors.len(), 2);
        assert!(src.errors[0].starts_with("line 2:"));
        assert!(src.errors[1].starts_with("line 3:"));
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let src = parse_fragments("A first\nA second");
        assert_eq!(src.len(), 2);
        assert_eq!(src.fragments[1].template, "second");
    }

    #[test]
    fn test_bundled_patterns_parse_cleanly() {
        let src = bundled_fragments();
        assert!(src.errors.is_empty(), "bundled errors: {:?}", src.errors);
        for name in ["WORD", "NUMBER", "IP", "COMMONAPACHELOG", "SYSLOGBASE"] {
            assert!(
                src.fragments.iter().any(|f| f.name == name),
                "missing bundled fragment {name}"
            );
        }
    }

    #[test]
    fn test_load_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b-patterns"), "X second\n").unwrap();
        std::fs::write(dir.path().join("a-patterns"), "X first\nY y\n").unwrap();
        std::fs::write(dir.path().join(".hidden"), "X hidden\n").unwrap();

        let src = load_fragment_directory(dir.path()).unwrap();
        let xs: Vec<&str> = src
            .fragments
            .iter()
            .filter(|f| f.name == "X")
            .map(|f| f.template.as_str())
            .collect();
        assert_eq!(xs, vec!["first", "second"]);
    }

    #[test]
    fn test_load_file_prefixes_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom");
        std::fs::write(&path, "BROKEN\n").unwrap();
        let src = load_fragment_file(&path).unwrap();
        assert_eq!(src.errors.len(), 1);
        assert!(src.errors[0].contains("custom"));
        assert!(src.errors[0].contains("line 1"));
    }
}
