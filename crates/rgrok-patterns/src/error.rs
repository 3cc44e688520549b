use thiserror::Error;

/// Errors that can occur while loading fragments or parsing grok templates.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template parse error: {0}")]
    Template(String),

    #[error("Invalid field name '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PatternError>;
