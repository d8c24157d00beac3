use form_spec::FormError;
use thiserror::Error;

/// Failure of a remote request. The resolvers log these and degrade to an
/// empty option list or an empty autofill patch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("response is not valid JSON: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse engine config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("field '{0}' does not exist")]
    UnknownField(String),
    #[error("table '{field}' has no column '{column}'")]
    UnknownColumn { field: String, column: String },
    #[error("field '{0}' is not a table")]
    NotATable(String),
    #[error(transparent)]
    Form(#[from] FormError),
}
