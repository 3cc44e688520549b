//! Output field names and type annotations.
//!
//! An alias such as `http.request.method` or `[http][request][method]` names a
//! nested output field. The regex engine only accepts flat identifiers as
//! capture-group names, so a [`FieldPath`] is flattened into an
//! identifier-safe group name on the way in ([`flatten_field_path`]) and
//! recovered from the group name on the way out ([`unflatten_field_path`]).
//!
//! ## Group name encoding
//!
//! `_` is the escape character; every other emitted character is an ASCII
//! letter or digit:
//!
//! | Input | Encoded as |
//! |-------|------------|
//! | `a-z A-Z 0-9` | unchanged |
//! | `_` | `__` |
//! | segment boundary | `_D` |
//! | `-` | `_H` |
//! | `@` | `_A` |
//! | leading digit | `_N` prefix |
//!
//! The encoding is injective, so the two functions are exact inverses.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{PatternError, Result};

/// Separator used when displaying a [`FieldPath`].
pub const FIELD_SEPARATOR: char = '.';

// =============================================================================
// FieldType
// =============================================================================

/// Type annotation attached to a field with `%{NAME:alias:type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Int,
    Float,
}

impl FieldType {
    /// Parse a recognized type keyword.
    pub fn parse_keyword(s: &str) -> Option<Self> {
        match s {
            "int" => Some(FieldType::Int),
            "float" => Some(FieldType::Float),
            "string" => Some(FieldType::String),
            _ => None,
        }
    }

    /// Interpret the type suffix of a reference. Unrecognized keywords mean
    /// [`FieldType::String`].
    pub fn from_annotation(s: &str) -> Self {
        Self::parse_keyword(s).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
        }
    }

    /// Returns `true` for types that request a numeric conversion.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FieldPath
// =============================================================================

/// The segments of a (possibly nested) output field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse an alias in dotted (`a.b`), bracketed (`[a][b]`) or mixed
    /// (`a[b].c`) notation.
    pub fn parse(alias: &str) -> Result<Self> {
        let invalid = |reason: &str| PatternError::InvalidAlias {
            alias: alias.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_bracket = false;
        let mut prev: Option<char> = None;

        for c in alias.chars() {
            match c {
                '[' => {
                    if in_bracket {
                        return Err(invalid("nested '['"));
                    }
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                    in_bracket = true;
                }
                ']' => {
                    if !in_bracket {
                        return Err(invalid("unmatched ']'"));
                    }
                    if current.is_empty() {
                        return Err(invalid("empty segment"));
                    }
                    segments.push(std::mem::take(&mut current));
                    in_bracket = false;
                }
                '.' => {
                    if in_bracket {
                        return Err(invalid("'.' inside brackets"));
                    }
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    } else if prev != Some(']') {
                        return Err(invalid("empty segment"));
                    }
                }
                c if is_segment_char(c) => current.push(c),
                other => return Err(invalid(&format!("unsupported character '{other}'"))),
            }
            prev = Some(c);
        }

        if in_bracket {
            return Err(invalid("unclosed '['"));
        }
        if prev == Some('.') {
            return Err(invalid("empty segment"));
        }
        if !current.is_empty() {
            segments.push(current);
        }
        if segments.is_empty() {
            return Err(invalid("empty field name"));
        }

        Ok(FieldPath { segments })
    }

    /// A one-segment path. The name is taken verbatim.
    pub fn single(name: impl Into<String>) -> Self {
        FieldPath {
            segments: vec![name.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if the path has more than one segment.
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Returns `true` if `self` is a strict prefix of `other`, i.e. `self`
    /// names a branch of the tree that `other` lives under.
    pub fn is_strict_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// The dotted display form, e.g. `foo.bar`.
    pub fn dotted(&self) -> String {
        self.segments.join(&FIELD_SEPARATOR.to_string())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '@')
}

// =============================================================================
// Flatten / unflatten
// =============================================================================

/// Encode a field path as a capture-group name accepted by the regex engine.
pub fn flatten_field_path(path: &FieldPath) -> String {
    let mut out = String::new();
    if path
        .segments
        .first()
        .and_then(|s| s.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
    {
        out.push_str("_N");
    }
    for (i, segment) in path.segments.iter().enumerate() {
        if i > 0 {
            out.push_str("_D");
        }
        for c in segment.chars() {
            match c {
                '_' => out.push_str("__"),
                '-' => out.push_str("_H"),
                '@' => out.push_str("_A"),
                c => out.push(c),
            }
        }
    }
    out
}

/// Decode a group name produced by [`flatten_field_path`].
///
/// Returns `None` if `group` is not a valid encoding.
pub fn unflatten_field_path(group: &str) -> Option<FieldPath> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = group.chars().peekable();
    let mut first = true;

    while let Some(c) = chars.next() {
        if c == '_' {
            match chars.next()? {
                '_' => current.push('_'),
                'H' => current.push('-'),
                'A' => current.push('@'),
                'D' => {
                    if current.is_empty() {
                        return None;
                    }
                    segments.push(std::mem::take(&mut current));
                }
                'N' if first && chars.peek().is_some_and(|d| d.is_ascii_digit()) => {}
                _ => return None,
            }
        } else if c.is_ascii_alphanumeric() {
            if first && c.is_ascii_digit() {
                return None;
            }
            current.push(c);
        } else {
            return None;
        }
        first = false;
    }

    if current.is_empty() {
        return None;
    }
    segments.push(current);
    Some(FieldPath { segments })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> FieldPath {
        FieldPath {
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(FieldPath::parse("foo.bar").unwrap(), path(&["foo", "bar"]));
        assert_eq!(FieldPath::parse("foo").unwrap(), path(&["foo"]));
    }

    #[test]
    fn test_parse_bracketed_and_mixed() {
        assert_eq!(FieldPath::parse("[a][b]").unwrap(), path(&["a", "b"]));
        assert_eq!(
            FieldPath::parse("a[b].c").unwrap(),
            path(&["a", "b", "c"])
        );
        assert_eq!(
            FieldPath::parse("[@metadata][host-name]").unwrap(),
            path(&["@metadata", "host-name"])
        );
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        for bad in ["", ".a", "a.", "a..b", "[]", "[a", "a]", "[a.b]", "a b"] {
            assert!(
                matches!(FieldPath::parse(bad), Err(PatternError::InvalidAlias { .. })),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_display_is_dotted() {
        assert_eq!(FieldPath::parse("[a][b][c]").unwrap().to_string(), "a.b.c");
    }

    #[test]
    fn test_flatten_plain_names_unchanged() {
        assert_eq!(flatten_field_path(&path(&["verb"])), "verb");
        assert_eq!(flatten_field_path(&path(&["WORD"])), "WORD");
    }

    #[test]
    fn test_flatten_escapes() {
        assert_eq!(flatten_field_path(&path(&["foo", "bar"])), "foo_Dbar");
        assert_eq!(flatten_field_path(&path(&["a_b"])), "a__b");
        assert_eq!(flatten_field_path(&path(&["@timestamp"])), "_Atimestamp");
        assert_eq!(flatten_field_path(&path(&["x-y"])), "x_Hy");
        assert_eq!(flatten_field_path(&path(&["0x"])), "_N0x");
    }

    #[test]
    fn test_flatten_output_is_identifier_safe() {
        let p = path(&["@meta", "host-name", "a_b", "9lives"]);
        let g = flatten_field_path(&p);
        let first = g.chars().next().unwrap();
        assert!(first == '_' || first.is_ascii_alphabetic());
        assert!(g.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            path(&["foo"]),
            path(&["foo", "bar"]),
            path(&["a_b", "c__d"]),
            path(&["_", "__"]),
            path(&["@timestamp"]),
            path(&["http", "user-agent", "x"]),
            path(&["1st", "2nd"]),
            path(&["SYSLOG_TIMESTAMP"]),
        ];
        for p in cases {
            let g = flatten_field_path(&p);
            assert_eq!(unflatten_field_path(&g), Some(p.clone()), "group {g}");
        }
    }

    #[test]
    fn test_unflatten_rejects_foreign_names() {
        for bad in ["", "a_", "a_Z", "_Da", "a_D", "a_D_Db", "1abc", "_Nabc", "a.b", "a_N1"] {
            assert_eq!(unflatten_field_path(bad), None, "expected '{bad}' rejected");
        }
    }

    #[test]
    fn test_strict_prefix() {
        let ab = path(&["a", "b"]);
        let abc = path(&["a", "b", "c"]);
        assert!(ab.is_strict_prefix_of(&abc));
        assert!(!abc.is_strict_prefix_of(&ab));
        assert!(!ab.is_strict_prefix_of(&ab));
        assert!(!path(&["a", "x"]).is_strict_prefix_of(&abc));
    }

    #[test]
    fn test_field_type_annotation() {
        assert_eq!(FieldType::from_annotation("int"), FieldType::Int);
        assert_eq!(FieldType::from_annotation("float"), FieldType::Float);
        assert_eq!(FieldType::from_annotation("string"), FieldType::String);
        assert_eq!(FieldType::from_annotation("bool"), FieldType::String);
        assert_eq!(FieldType::parse_keyword("INT"), None);
        assert_eq!(FieldType::default(), FieldType::String);
    }
}
