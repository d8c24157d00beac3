use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::values::scalar_text;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{(\w[\w-]*)(?:\.(\w+))?\}$").expect("placeholder regex is valid")
});

static URL_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("url placeholder regex is valid"));

/// A whole-string `${fieldId}` or `${fieldId.prop}` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub field_id: String,
    pub prop: Option<String>,
}

impl Placeholder {
    /// Parses `text` when the entire string is a placeholder.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = PLACEHOLDER.captures(text)?;
        Some(Self {
            field_id: captures[1].to_string(),
            prop: captures.get(2).map(|prop| prop.as_str().to_string()),
        })
    }

    /// Resolves the reference against a value map.
    pub fn resolve(&self, values: &Map<String, Value>) -> Value {
        let empty = || Value::String(String::new());
        match values.get(&self.field_id) {
            None | Some(Value::Null) => empty(),
            Some(Value::Array(items)) => match &self.prop {
                Some(prop) => items
                    .first()
                    .and_then(|first| first.get(prop))
                    .filter(|value| !value.is_null())
                    .cloned()
                    .unwrap_or_else(empty),
                None => Value::Array(items.iter().map(display_value).collect()),
            },
            Some(Value::Object(object)) => match &self.prop {
                Some(prop) => object
                    .get(prop)
                    .filter(|value| !value.is_null())
                    .cloned()
                    .unwrap_or_else(empty),
                None => ["label", "id", "value"]
                    .iter()
                    .find_map(|key| object.get(*key).filter(|value| !value.is_null()))
                    .cloned()
                    .unwrap_or_else(empty),
            },
            Some(primitive) => primitive.clone(),
        }
    }
}

/// `label ?? id ?? value ?? element` for one selected element.
fn display_value(element: &Value) -> Value {
    if let Value::Object(object) = element
        && let Some(found) = ["label", "id", "value"]
            .iter()
            .find_map(|key| object.get(*key).filter(|value| !value.is_null()))
    {
        return found.clone();
    }
    element.clone()
}

/// Substitutes placeholder params with values. Strings that are not a whole
/// placeholder and non-string params pass through unchanged.
pub fn interpolate(params: &Map<String, Value>, values: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, param)| {
            let resolved = match param {
                Value::String(text) => match Placeholder::parse(text) {
                    Some(placeholder) => placeholder.resolve(values),
                    None => param.clone(),
                },
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}

/// Replaces every `${fieldId}` in a URL template with the field's text value,
/// or nothing when the field is missing or not a scalar.
pub fn interpolate_url(url: &str, values: &Map<String, Value>) -> String {
    URL_PLACEHOLDER
        .replace_all(url, |captures: &Captures<'_>| {
            values
                .get(&captures[1])
                .and_then(scalar_text)
                .unwrap_or_default()
        })
        .into_owned()
}
