//! # rgrok-patterns
//!
//! Fragment library and template grammar for grok patterns.
//!
//! This crate covers everything that happens before a grok pattern is
//! compiled:
//!
//! - **Fragment sources**: line-oriented `<NAME> <regex>` files, including the
//!   pattern set bundled with the crate
//! - **Registry**: an immutable name → template map with explicit merge
//!   semantics and a process-wide cache for the default set
//! - **Template grammar** ([`pest`]): splitting a template into literal regex
//!   text and `%{NAME}`, `%{NAME:alias}`, `%{NAME:alias:type}` references
//! - **Field paths**: dotted/bracketed aliases, their flat capture-group
//!   encoding, and type annotations
//!
//! ## Quick Start
//!
//! ```rust
//! use rgrok_patterns::{PatternRegistry, parse_fragments, parse_template};
//!
//! let source = parse_fragments("
//! # numbers
//! DIGITS [0-9]+
//! VERSION %{DIGITS:major}.%{DIGITS:minor}
//! ");
//! let registry = PatternRegistry::from_source(&source);
//! assert_eq!(registry.get("DIGITS"), Some("[0-9]+"));
//!
//! let segments = parse_template(registry.get("VERSION").unwrap()).unwrap();
//! assert_eq!(segments.len(), 3);
//! ```

pub mod error;
pub mod field;
pub mod fragment;
pub mod reference;
pub mod registry;

// Re-export the most commonly used types and functions at crate root
pub use error::{PatternError, Result};
pub use field::{FIELD_SEPARATOR, FieldPath, FieldType, flatten_field_path, unflatten_field_path};
pub use fragment::{
    BUNDLED_PATTERNS, FragmentSource, PatternFragment, bundled_fragments, load_fragment_directory,
    load_fragment_file, parse_fragments,
};
pub use reference::{MacroRef, Segment, contains_reference, parse_template, references};
pub use registry::{PatternRegistry, cached_registry, default_registry};
