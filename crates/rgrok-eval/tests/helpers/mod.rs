#![allow(dead_code)]

use rgrok_eval::{CompileError, Grok, GrokOptions};
use serde_json::Value;

pub fn grok(pattern: &str) -> Grok {
    Grok::new(pattern).unwrap()
}

pub fn grok_with(pattern: &str, options: GrokOptions) -> Grok {
    Grok::with_options(pattern, options).unwrap()
}

pub fn parse(pattern: &str, text: &str) -> Option<Value> {
    grok(pattern).parse(text).map(Value::Object)
}

pub fn parse_with(pattern: &str, options: GrokOptions, text: &str) -> Option<Value> {
    grok_with(pattern, options).parse(text).map(Value::Object)
}

pub fn compile_err(pattern: &str, options: GrokOptions) -> CompileError {
    Grok::with_options(pattern, options).unwrap_err()
}
