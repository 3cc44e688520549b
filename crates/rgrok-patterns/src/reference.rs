//! Macro-reference parser for grok templates using a pest PEG grammar.
//!
//! Splits a template such as
//! `%{IP:client} %{WORD:method:string} \[%{HTTPDATE}\]`
//! into literal regex text and `%{...}` references. Fragment templates are
//! opaque regex strings: only the reference syntax is recognized, everything
//! else is passed through untouched.

use std::fmt;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde::Serialize;

use crate::error::{PatternError, Result};

// ---------------------------------------------------------------------------
// Pest parser (generated from grok.pest grammar)
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "src/grok.pest"]
struct GrokTemplateParser;

// ---------------------------------------------------------------------------
// Template segments
// ---------------------------------------------------------------------------

/// A `%{FRAGMENT}`, `%{FRAGMENT:alias}` or `%{FRAGMENT:alias:type}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroRef {
    /// Name of the referenced fragment.
    pub fragment: String,
    /// Output field name, as written (dotted or bracketed).
    pub alias: Option<String>,
    /// Type keyword, as written.
    pub type_name: Option<String>,
}

impl MacroRef {
    /// A bare reference without alias or type.
    pub fn bare(fragment: impl Into<String>) -> Self {
        MacroRef {
            fragment: fragment.into(),
            alias: None,
            type_name: None,
        }
    }

    /// Returns `true` if the reference binds an output field name.
    pub fn is_named(&self) -> bool {
        self.alias.is_some()
    }
}

impl fmt::Display for MacroRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{{{}", self.fragment)?;
        if let Some(alias) = &self.alias {
            write!(f, ":{alias}")?;
            if let Some(ty) = &self.type_name {
                write!(f, ":{ty}")?;
            }
        }
        write!(f, "}}")
    }
}

/// A piece of a grok template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Segment {
    /// Regex text passed through unchanged.
    Literal(String),
    /// A macro reference to be expanded.
    Reference(MacroRef),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split a grok template into literal and reference segments.
///
/// # Examples
///
/// ```
/// use rgrok_patterns::reference::{Segment, parse_template};
///
/// let segments = parse_template("%{WORD:verb} %{NUMBER}").unwrap();
/// assert_eq!(segments.len(), 3);
/// assert!(matches!(segments[1], Segment::Literal(ref s) if s == " "));
/// ```
pub fn parse_template(input: &str) -> Result<Vec<Segment>> {
    let mut pairs = GrokTemplateParser::parse(Rule::template, input)
        .map_err(|e| PatternError::Template(e.to_string()))?;

    let Some(template) = pairs.next() else {
        return Ok(Vec::new());
    };

    let mut segments = Vec::new();
    for pair in template.into_inner() {
        match pair.as_rule() {
            Rule::literal => segments.push(Segment::Literal(pair.as_str().to_string())),
            Rule::reference => segments.push(Segment::Reference(parse_reference(pair))),
            Rule::EOI => {}
            other => unreachable!("unexpected template rule: {other:?}"),
        }
    }
    Ok(segments)
}

/// Collect only the references of a template, in order of appearance.
pub fn references(input: &str) -> Result<Vec<MacroRef>> {
    Ok(parse_template(input)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Reference(r) => Some(r),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Returns `true` if the text contains at least one well-formed reference.
pub fn contains_reference(input: &str) -> bool {
    references(input).is_ok_and(|refs| !refs.is_empty())
}

// ---------------------------------------------------------------------------
// Internal parsing helpers
// ---------------------------------------------------------------------------

fn parse_reference(pair: Pair<'_, Rule>) -> MacroRef {
    let mut reference = MacroRef::bare(String::new());
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::fragment_name => reference.fragment = p.as_str().to_string(),
            Rule::alias => reference.alias = Some(p.as_str().to_string()),
            Rule::type_name => reference.type_name = Some(p.as_str().to_string()),
            other => unreachable!("unexpected reference rule: {other:?}"),
        }
    }
    reference
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn reference(fragment: &str, alias: Option<&str>, ty: Option<&str>) -> Segment {
        Segment::Reference(MacroRef {
            fragment: fragment.to_string(),
            alias: alias.map(str::to_string),
            type_name: ty.map(str::to_string),
        })
    }

    #[test]
    fn test_bare_reference() {
        let segs = parse_template("%{WORD}").unwrap();
        assert_eq!(segs, vec![reference("WORD", None, None)]);
    }

    #[test]
    fn test_named_and_typed_references() {
        let segs = parse_template("%{NUMBER:bytes:int} %{IP:client}").unwrap();
        assert_eq!(
            segs,
            vec![
                reference("NUMBER", Some("bytes"), Some("int")),
                lit(" "),
                reference("IP", Some("client"), None),
            ]
        );
    }

    #[test]
    fn test_dotted_and_bracketed_aliases() {
        let segs = parse_template("%{WORD:foo.bar}%{WORD:[a][b]}").unwrap();
        assert_eq!(
            segs,
            vec![
                reference("WORD", Some("foo.bar"), None),
                reference("WORD", Some("[a][b]"), None),
            ]
        );
    }

    #[test]
    fn test_plain_regex_is_one_literal() {
        let segs = parse_template(r"^\d{1,3}(?:\.\d+)?$").unwrap();
        assert_eq!(segs, vec![lit(r"^\d{1,3}(?:\.\d+)?$")]);
    }

    #[test]
    fn test_malformed_reference_stays_literal() {
        let segs = parse_template("%{not valid} %{A:b:c:d}").unwrap();
        assert_eq!(segs, vec![lit("%{not valid} %{A:b:c:d}")]);
    }

    #[test]
    fn test_empty_template() {
        assert!(parse_template("").unwrap().is_empty());
    }

    #[test]
    fn test_reference_embedded_in_regex() {
        let segs = parse_template(r"(?:\[%{POSINT:pid}\])?").unwrap();
        assert_eq!(
            segs,
            vec![
                lit(r"(?:\["),
                reference("POSINT", Some("pid"), None),
                lit(r"\])?"),
            ]
        );
    }

    #[test]
    fn test_display_round_trips_syntax() {
        for src in ["%{A}", "%{A:b}", "%{A:b.c:int}"] {
            let refs = references(src).unwrap();
            assert_eq!(refs[0].to_string(), src);
        }
    }

    #[test]
    fn test_contains_reference() {
        assert!(contains_reference("x %{WORD} y"));
        assert!(!contains_reference(r"\w+"));
        assert!(!contains_reference("%{ WORD }"));
    }
}
