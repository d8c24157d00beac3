use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::values::ValueEnv;

/// A single per-field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field_id: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(field_id: &str, message: impl Into<String>, code: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            message: message.into(),
            code: code.to_string(),
        }
    }
}

/// Outcome of validating the visible fields of a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Field id to message, the shape shown next to inputs.
    pub fn error_map(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|error| (error.field_id.clone(), error.message.clone()))
            .collect()
    }

    pub fn error_for(&self, field_id: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|error| error.field_id == field_id)
    }
}

/// Accepted submission: the frozen values plus the fields that were visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub values: ValueEnv,
    pub visible_fields: Vec<String>,
}

impl Submission {
    /// Values restricted to the fields visible at submit time.
    pub fn visible_values(&self) -> ValueEnv {
        self.visible_fields
            .iter()
            .filter_map(|id| self.values.get(id).map(|value| (id.clone(), value.clone())))
            .collect()
    }

    pub fn to_pretty_json(&self) -> Result<String, FormError> {
        serde_json::to_string_pretty(self).map_err(FormError::Json)
    }
}
