//! # rgrok-eval
//!
//! Compile grok patterns into regular expressions and extract typed fields.
//!
//! This crate consumes the fragment registry and template grammar from
//! [`rgrok_patterns`] and follows a compile-then-match model:
//!
//! - **Compile** (once): macro references are resolved against the registry,
//!   cycles and unknown fragments are rejected up front, and the expanded text
//!   is compiled into a single regex.
//! - **Match** (many times, from any thread): one regex execution per input,
//!   followed by type coercion and unflattening of dotted field names into
//!   nested JSON objects.
//!
//! ## Quick Start
//!
//! ```rust
//! use rgrok_eval::{Grok, GrokOptions};
//! use serde_json::{Value, json};
//!
//! let grok = Grok::new("%{IP:client.ip} %{WORD:method} %{NUMBER:bytes:int}").unwrap();
//! let record = grok.parse("10.0.0.1 GET 512").unwrap();
//! assert_eq!(
//!     Value::Object(record),
//!     json!({"client": {"ip": "10.0.0.1"}, "method": "GET", "bytes": 512})
//! );
//!
//! // Custom fragments and substring search.
//! let options = GrokOptions::new()
//!     .with_pattern("TICKET", "[A-Z]+-[0-9]+")
//!     .full_match(false);
//! let grok = Grok::with_options("fixes %{TICKET:ticket}", options).unwrap();
//! let record = grok.parse("this commit fixes OPS-42 finally").unwrap();
//! assert_eq!(record["ticket"], "OPS-42");
//! ```

pub mod compiler;
pub mod engine;
pub mod error;
pub mod options;
pub mod projector;

// Re-export the most commonly used types and functions at crate root
pub use compiler::{CompiledGrok, Expansion, OutputField, ReferenceGraph, compile, expand};
pub use engine::{Grok, RawCaptures};
pub use error::{CompileError, Result};
pub use options::{DEFAULT_MAX_DEPTH, DEFAULT_SIZE_LIMIT, GrokOptions};
pub use projector::{Record, coerce, insert_path, project};

pub use rgrok_patterns::{FieldPath, FieldType, PatternRegistry};
