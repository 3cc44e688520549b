//! Turn raw captures into a nested JSON object.
//!
//! Each captured value is coerced according to its field type and inserted
//! under its field path, creating intermediate objects as needed:
//!
//! ```text
//! user_Dname = "alice"   (string)  ─┐
//! user_Did   = "42"      (int)     ─┴─▶  {"user": {"id": 42, "name": "alice"}}
//! ```

use serde_json::{Map, Number, Value};

use rgrok_patterns::{FieldPath, FieldType};

use crate::compiler::OutputField;

/// A parsed record: field name → value, possibly nested.
pub type Record = Map<String, Value>;

// =============================================================================
// Public API
// =============================================================================

/// Build a record from `(field, captured text)` pairs.
///
/// Fields that did not participate in the match are dropped, or written as
/// `null` when `keep_empty_captures` is set.
pub fn project<'f, 't, I>(captures: I, keep_empty_captures: bool) -> Record
where
    I: IntoIterator<Item = (&'f OutputField, Option<&'t str>)>,
{
    let mut record = Record::new();
    for (field, text) in captures {
        let value = match text {
            Some(text) => coerce(text, field.field_type),
            None if keep_empty_captures => Value::Null,
            None => continue,
        };
        insert_path(&mut record, &field.path, value);
    }
    record
}

/// Convert captured text to the requested type.
///
/// Numeric conversion ignores surrounding whitespace. Text that does not
/// parse is kept as a string, as are floats that are not finite.
pub fn coerce(text: &str, field_type: FieldType) -> Value {
    let converted = match field_type {
        FieldType::String => None,
        FieldType::Int => parse_int(text.trim()),
        FieldType::Float => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
    };
    converted.unwrap_or_else(|| {
        if field_type.is_numeric() {
            tracing::trace!(value = text, to = %field_type, "conversion failed, keeping text");
        }
        Value::String(text.to_string())
    })
}

/// Insert `value` at `path`, creating intermediate objects.
///
/// If an intermediate segment already holds a non-object value, the insert is
/// skipped and the existing value kept.
pub fn insert_path(record: &mut Record, path: &FieldPath, value: Value) {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return;
    };

    let mut current = record;
    for segment in parents {
        let slot = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        match slot {
            Value::Object(map) => current = map,
            _ => {
                tracing::warn!(
                    field = %path,
                    at = %segment,
                    "field collides with an existing value, dropping"
                );
                return;
            }
        }
    }
    current.insert(leaf.clone(), value);
}

fn parse_int(text: &str) -> Option<Value> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::from(i));
    }
    text.parse::<u64>().ok().map(Value::from)
}

// =============================================================================
// Tests
// =============================================================================
