//! Compilation error types.

use thiserror::Error;

/// Errors that can occur while compiling a grok pattern.
///
/// Every variant is raised at construction time; matching never fails.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A macro reference named a fragment the registry does not define.
    #[error("unknown pattern fragment: {0}")]
    UnknownFragment(String),

    /// Fragment references form a cycle. The path starts and ends with the
    /// same fragment, e.g. `A -> B -> A`.
    #[error("cyclic pattern reference: {}", .cycle.join(" -> "))]
    CyclicFragment { cycle: Vec<String> },

    /// Fragment nesting exceeded the configured depth bound.
    #[error("pattern expansion deeper than {limit} levels at fragment {fragment}")]
    ExpansionTooDeep { fragment: String, limit: usize },

    /// The expanded pattern is not a valid regular expression.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// One field is a leaf while another field nests beneath it.
    #[error("field '{leaf}' conflicts with nested field '{branch}'")]
    ConflictingFieldPaths { leaf: String, branch: String },

    /// Two distinct capture groups resolve to the same output field.
    #[error("field '{0}' is captured by more than one group")]
    DuplicateField(String),

    /// A fragment source or template failed to load or parse.
    #[error("pattern error: {0}")]
    Patterns(#[from] rgrok_patterns::PatternError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CompileError>;
