use thiserror::Error;

/// Configuration and editing errors. None of them is fatal: a rejected edit
/// leaves the previous configuration in effect.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("field '{0}' does not exist")]
    UnknownField(String),
    #[error("section '{0}' does not exist")]
    UnknownSection(String),
    #[error("field '{0}' already exists")]
    DuplicateField(String),
    #[error("section '{0}' already exists")]
    DuplicateSection(String),
    #[error("field '{field}' has duplicate option id '{option}'")]
    DuplicateOption { field: String, option: String },
    #[error("field '{0}' cannot depend on itself")]
    SelfDependency(String),
    #[error("field '{field}' cannot depend on '{target}': '{target}' already depends on it")]
    DependencyCycle { field: String, target: String },
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("params must be valid JSON: {0}")]
    InvalidParams(String),
    #[error("position {index} is out of range for '{container}' ({len} items)")]
    OutOfRange {
        container: String,
        index: usize,
        len: usize,
    },
    #[error("form is published; unpublish it before editing")]
    Locked,
    #[error("nothing has been saved yet")]
    NoSavedDraft,
    #[error("json error: {0}")]
    Json(#[source] serde_json::Error),
}
