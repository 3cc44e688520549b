//! The grok matcher.
//!
//! A [`Grok`] is compiled once and is immutable afterwards; it can be shared
//! across threads (`Grok: Send + Sync`) and matched concurrently.

use std::sync::Arc;

use regex::Captures;

use rgrok_patterns::{FieldType, PatternRegistry};

use crate::compiler::{CompiledGrok, OutputField, compile};
use crate::error::Result;
use crate::options::GrokOptions;
use crate::projector::{Record, project};

/// A compiled grok pattern.
///
/// # Example
///
/// ```rust
/// use rgrok_eval::Grok;
/// use serde_json::json;
///
/// let grok = Grok::new("%{WORD:verb} %{NUMBER:count:int}").unwrap();
/// let record = grok.parse("GET 12").unwrap();
/// assert_eq!(serde_json::Value::Object(record), json!({"verb": "GET", "count": 12}));
/// assert!(grok.parse("GET twelve").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Grok {
    source: String,
    compiled: CompiledGrok,
    registry: Arc<PatternRegistry>,
    keep_empty_captures: bool,
}

/// The raw (untyped) captures of one successful match.
#[derive(Debug)]
pub struct RawCaptures<'g, 't> {
    fields: &'g [OutputField],
    captures: Captures<'t>,
}

impl<'g, 't> RawCaptures<'g, 't> {
    /// Text captured for a field, looked up by dotted field name.
    pub fn get(&self, field: &str) -> Option<&'t str> {
        let f = self.fields.iter().find(|f| f.path.dotted() == field)?;
        self.captures.name(&f.group).map(|m| m.as_str())
    }

    /// Every output field with its captured text, `None` where the group did
    /// not participate.
    pub fn iter(&self) -> impl Iterator<Item = (&'g OutputField, Option<&'t str>)> + '_ {
        self.fields
            .iter()
            .map(|f| (f, self.captures.name(&f.group).map(|m| m.as_str())))
    }

    /// The full matched text.
    pub fn matched(&self) -> &'t str {
        self.captures.get(0).map_or("", |m| m.as_str())
    }
}

impl Grok {
    /// Compile `pattern` against the bundled fragments with default options.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_options(pattern, GrokOptions::default())
    }

    /// Compile `pattern` with explicit options.
    pub fn with_options(pattern: &str, options: GrokOptions) -> Result<Self> {
        let registry = options.registry()?;
        Self::from_registry(pattern, registry, &options)
    }

    /// Compile `pattern` against a caller-built registry. The registry-related
    /// options (`custom_patterns`, `custom_patterns_dir`) are ignored.
    pub fn from_registry(
        pattern: &str,
        registry: Arc<PatternRegistry>,
        options: &GrokOptions,
    ) -> Result<Self> {
        let compiled = compile(pattern, &registry, options)?;
        Ok(Grok {
            source: pattern.to_string(),
            compiled,
            registry,
            keep_empty_captures: options.keep_empty_captures,
        })
    }

    /// Match `text` and return the captured fields, typed and nested.
    ///
    /// Returns `None` if the text does not match. A successful match always
    /// yields a record, possibly empty.
    pub fn parse(&self, text: &str) -> Option<Record> {
        let captures = self.captures(text)?;
        Some(project(captures.iter(), self.keep_empty_captures))
    }

    /// Match `text` and return the untyped captures.
    pub fn captures<'t>(&self, text: &'t str) -> Option<RawCaptures<'_, 't>> {
        let captures = self.compiled.regex().captures(text)?;
        Some(RawCaptures {
            fields: self.compiled.fields(),
            captures,
        })
    }

    /// Returns `true` if `text` matches, without extracting fields.
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.regex().is_match(text)
    }

    /// The grok pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The expanded regex text.
    pub fn regex_pattern(&self) -> &str {
        self.compiled.pattern()
    }

    /// Output fields in capture-group order.
    pub fn fields(&self) -> &[OutputField] {
        self.compiled.fields()
    }

    /// Declared type of a field, by dotted name.
    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.compiled
            .fields()
            .iter()
            .find(|f| f.path.dotted() == field)
            .map(|f| f.field_type)
    }

    pub fn compiled(&self) -> &CompiledGrok {
        &self.compiled
    }

    /// The registry this pattern was compiled against.
    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }
}

// =============================================================================
// Tests
// =============================================================================
