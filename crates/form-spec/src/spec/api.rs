use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FormError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Keys used to turn response records into options. Blank keys count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_key: Option<String>,
}

impl MapOptions {
    pub fn id_key(&self) -> Option<&str> {
        self.id_key.as_deref().filter(|key| !key.is_empty())
    }

    pub fn label_key(&self) -> Option<&str> {
        self.label_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Remote data source for a field: options for choice fields, autofill for
/// text and date fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Literal values or `${fieldId}` / `${fieldId.prop}` placeholders.
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub map_options: MapOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_path: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Response key to target field id, used by autofill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_map: Option<BTreeMap<String, String>>,
}

impl ApiConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn response_path(&self) -> Option<&str> {
        self.response_path.as_deref().filter(|path| !path.is_empty())
    }

    /// Non-empty autofill mapping, if any.
    pub fn response_map(&self) -> Option<&BTreeMap<String, String>> {
        self.response_map.as_ref().filter(|map| !map.is_empty())
    }

    /// Parses the text of a params editor. Anything but a JSON object is rejected.
    pub fn parse_params(text: &str) -> Result<Map<String, Value>, FormError> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(FormError::InvalidParams(
                "params must be a JSON object".into(),
            )),
            Err(err) => Err(FormError::InvalidParams(err.to_string())),
        }
    }

    /// Parses a comma separated list of field ids, dropping blanks.
    pub fn parse_depends_on(text: &str) -> Vec<String> {
        text.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}
