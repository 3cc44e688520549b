//! Compile grok patterns into a single regular expression.
//!
//! Compilation runs in three phases:
//!
//! 1. **Resolve**: tokenize the user pattern and walk the fragment reference
//!    graph depth-first. Unknown fragments, cycles, and excessive nesting are
//!    rejected here, before any regex text is produced.
//! 2. **Expand**: substitute fragments bottom-up in dependency order. Each
//!    fragment is expanded exactly once; its expansion does not depend on where
//!    it is referenced from.
//! 3. **Build**: compile the expanded text with the regex engine and derive
//!    the output field table from its named groups.
//!
//! Reference substitution:
//!
//! | Reference | Emitted |
//! |-----------|---------|
//! | `%{F:alias}` / `%{F:alias:type}` | `(?P<flat(alias)>F…)` |
//! | `%{F}` (unnamed capture on) | `(?P<flat(F)>F…)` |
//! | `%{F}` (unnamed capture off) | `(?:F…)` |

use std::collections::{BTreeMap, HashMap};

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use rgrok_patterns::{
    FieldPath, FieldType, MacroRef, PatternRegistry, Segment, flatten_field_path, parse_template,
};

use crate::error::{CompileError, Result};
use crate::options::GrokOptions;

// =============================================================================
// Compiled types
// =============================================================================

/// A named capture group of the compiled regex and the field it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputField {
    /// Capture-group name as seen by the regex engine.
    pub group: String,
    /// Reconstructed (nested) field name.
    pub path: FieldPath,
    /// Requested type conversion.
    pub field_type: FieldType,
}

/// The text produced by macro expansion, before regex compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion {
    /// Fully expanded regex text, free of macro references.
    pub pattern: String,
    /// Type annotations keyed by dotted field name.
    pub type_map: BTreeMap<String, FieldType>,
    /// Every group name emitted for a reference, with the field it encodes.
    pub groups: BTreeMap<String, FieldPath>,
}

/// A compiled grok pattern, ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledGrok {
    pattern: String,
    regex: Regex,
    type_map: BTreeMap<String, FieldType>,
    fields: Vec<OutputField>,
    full_match: bool,
}

impl CompiledGrok {
    /// The expanded regex text (without full-match anchors).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled regex. Anchored at both ends in full-match mode.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Type annotations keyed by dotted field name.
    pub fn type_map(&self) -> &BTreeMap<String, FieldType> {
        &self.type_map
    }

    /// Output fields in capture-group order.
    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    pub fn full_match(&self) -> bool {
        self.full_match
    }
}

// =============================================================================
// Reference graph
// =============================================================================

/// The fragments reachable from a pattern and their reference edges.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Tokenized template of every reachable fragment.
    nodes: HashMap<String, Vec<Segment>>,
    /// Fragment names such that each appears after every fragment it references.
    order: Vec<String>,
}

/// Nesting levels at and below a resolved fragment, and the fragment at the
/// bottom of its longest chain.
#[derive(Debug, Clone)]
struct Height {
    levels: usize,
    deepest: String,
}

/// Depth-first walk over fragment references.
struct Resolver<'r> {
    registry: &'r PatternRegistry,
    max_depth: usize,
    stack: Vec<String>,
    finished: HashMap<String, Height>,
    graph: ReferenceGraph,
}

impl Resolver<'_> {
    fn visit(&mut self, name: &str) -> Result<Height> {
        // A finished fragment may be reached again from deeper down.
        if let Some(height) = self.finished.get(name) {
            if self.stack.len() + height.levels > self.max_depth {
                return Err(CompileError::ExpansionTooDeep {
                    fragment: height.deepest.clone(),
                    limit: self.max_depth,
                });
            }
            return Ok(height.clone());
        }

        if let Some(start) = self.stack.iter().position(|n| n == name) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(name.to_string());
            return Err(CompileError::CyclicFragment { cycle });
        }

        if self.stack.len() >= self.max_depth {
            return Err(CompileError::ExpansionTooDeep {
                fragment: name.to_string(),
                limit: self.max_depth,
            });
        }

        let template = self
            .registry
            .get(name)
            .ok_or_else(|| CompileError::UnknownFragment(name.to_string()))?;
        let segments = parse_template(template)?;

        self.stack.push(name.to_string());
        let mut below = Height {
            levels: 0,
            deepest: name.to_string(),
        };
        for r in macro_refs(&segments) {
            let child = self.visit(&r.fragment)?;
            if child.levels > below.levels {
                below = child;
            }
        }
        self.stack.pop();

        let height = Height {
            levels: below.levels + 1,
            deepest: below.deepest,
        };
        self.finished.insert(name.to_string(), height.clone());
        self.graph.order.push(name.to_string());
        self.graph.nodes.insert(name.to_string(), segments);
        Ok(height)
    }
}

impl ReferenceGraph {
    /// Resolve every fragment reachable from `roots`.
    ///
    /// Fails on the first unknown fragment, the first cycle (reported as the
    /// full path), or when any chain of references is longer than
    /// `max_depth`, wherever in the pattern it starts.
    pub fn build(roots: &[Segment], registry: &PatternRegistry, max_depth: usize) -> Result<Self> {
        let mut resolver = Resolver {
            registry,
            max_depth,
            stack: Vec::new(),
            finished: HashMap::new(),
            graph: ReferenceGraph::default(),
        };

        for r in macro_refs(roots) {
            resolver.visit(&r.fragment)?;
        }
        Ok(resolver.graph)
    }

    /// Fragment names in dependency order (leaves first).
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Names of the fragments directly referenced by `name`.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get(name)
            .map(|segs| macro_refs(segs).map(|r| r.fragment.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn macro_refs(segments: &[Segment]) -> impl Iterator<Item = &MacroRef> {
    segments.iter().filter_map(|s| match s {
        Segment::Reference(r) => Some(r),
        Segment::Literal(_) => None,
    })
}

// =============================================================================
// Public API
// =============================================================================

/// Expand all macro references of `pattern` against `registry`.
///
/// The result is the same text that repeatedly substituting every reference
/// by hand would reach, without compiling it.
pub fn expand(
    pattern: &str,
    registry: &PatternRegistry,
    match_unnamed_groks: bool,
    max_depth: usize,
) -> Result<Expansion> {
    let roots = parse_template(pattern)?;
    let graph = ReferenceGraph::build(&roots, registry, max_depth)?;

    let mut emitter = Emitter {
        match_unnamed_groks,
        expanded: HashMap::with_capacity(graph.len()),
        type_map: BTreeMap::new(),
        groups: BTreeMap::new(),
    };

    for name in graph.order() {
        let segments = &graph.nodes[name];
        let body = emitter.emit(segments)?;
        emitter.expanded.insert(name.clone(), body);
    }
    let pattern = emitter.emit(&roots)?;

    Ok(Expansion {
        pattern,
        type_map: emitter.type_map,
        groups: emitter.groups,
    })
}

/// Compile a grok pattern against an explicit registry.
pub fn compile(
    pattern: &str,
    registry: &PatternRegistry,
    options: &GrokOptions,
) -> Result<CompiledGrok> {
    let Expansion {
        pattern,
        type_map,
        groups,
    } = expand(
        pattern,
        registry,
        options.match_unnamed_groks,
        options.max_depth,
    )?;

    let source = if options.full_match {
        format!(r"\A(?:{pattern})\z")
    } else {
        pattern.clone()
    };
    let regex = RegexBuilder::new(&source)
        .size_limit(options.size_limit)
        .dfa_size_limit(options.size_limit)
        .build()?;

    let fields = output_fields(&regex, &groups, &type_map);
    check_field_paths(&fields)?;

    tracing::debug!(
        groups = fields.len(),
        typed = type_map.len(),
        full_match = options.full_match,
        "compiled grok pattern"
    );

    Ok(CompiledGrok {
        pattern,
        regex,
        type_map,
        fields,
        full_match: options.full_match,
    })
}

// =============================================================================
// Emission
// =============================================================================

struct Emitter {
    match_unnamed_groks: bool,
    expanded: HashMap<String, String>,
    type_map: BTreeMap<String, FieldType>,
    groups: BTreeMap<String, FieldPath>,
}

impl Emitter {
    fn emit(&mut self, segments: &[Segment]) -> Result<String> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Reference(r) => self.emit_reference(r, &mut out)?,
            }
        }
        Ok(out)
    }

    fn emit_reference(&mut self, r: &MacroRef, out: &mut String) -> Result<()> {
        let body = self
            .expanded
            .get(&r.fragment)
            .ok_or_else(|| CompileError::UnknownFragment(r.fragment.clone()))?;

        let path = match &r.alias {
            Some(alias) => {
                let path = FieldPath::parse(alias)?;
                if let Some(ty) = &r.type_name {
                    self.type_map
                        .insert(path.dotted(), FieldType::from_annotation(ty));
                }
                Some(path)
            }
            None if self.match_unnamed_groks => Some(FieldPath::single(r.fragment.as_str())),
            None => None,
        };

        match path {
            Some(path) => {
                let group = flatten_field_path(&path);
                out.push_str(&format!("(?P<{group}>{body})"));
                self.groups.insert(group, path);
            }
            None => out.push_str(&format!("(?:{body})")),
        }
        Ok(())
    }
}

// =============================================================================
// Output fields
// =============================================================================

/// Map every named group of `regex` to its output field.
///
/// Groups emitted for a reference map back to their alias. Groups written
/// directly in a template (`(?P<name>…)`) are read as an alias themselves and
/// never decoded, so `user_Data` stays `user_Data`.
fn output_fields(
    regex: &Regex,
    groups: &BTreeMap<String, FieldPath>,
    type_map: &BTreeMap<String, FieldType>,
) -> Vec<OutputField> {
    regex
        .capture_names()
        .flatten()
        .map(|group| {
            let path = groups
                .get(group)
                .cloned()
                .or_else(|| FieldPath::parse(group).ok())
                .unwrap_or_else(|| FieldPath::single(group));
            let field_type = type_map.get(&path.dotted()).copied().unwrap_or_default();
            OutputField {
                group: group.to_string(),
                path,
                field_type,
            }
        })
        .collect()
}

/// Reject field sets that cannot be unflattened without losing a value.
fn check_field_paths(fields: &[OutputField]) -> Result<()> {
    let mut paths: Vec<&FieldPath> = fields.iter().map(|f| &f.path).collect();
    paths.sort();

    // After sorting, any path that has extensions is immediately followed by one.
    for pair in paths.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a == b {
            return Err(CompileError::DuplicateField(a.dotted()));
        }
        if a.is_strict_prefix_of(b) {
            return Err(CompileError::ConflictingFieldPaths {
                leaf: a.dotted(),
                branch: b.dotted(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
