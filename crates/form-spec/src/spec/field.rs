use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::{api::ApiConfig, option::FieldOption};

/// Dependency value meaning "any non-empty value".
pub const WILDCARD: &str = "*";

/// Kind of a form field. Decides which optional attributes apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Date,
    Radio,
    Dropdown,
    Checkbox,
    Switch,
    Table,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Date => "date",
            FieldKind::Radio => "radio",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Switch => "switch",
            FieldKind::Table => "table",
        }
    }

    /// Label given to freshly created fields, e.g. "Dropdown Field".
    pub fn default_label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{}{} Field", first.to_ascii_uppercase(), chars.as_str()),
            None => "Field".to_string(),
        }
    }

    /// Whether an `apiConfig` on this kind populates its option list.
    pub fn uses_remote_options(&self) -> bool {
        match self {
            FieldKind::Radio | FieldKind::Dropdown | FieldKind::Checkbox => true,
            FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Switch
            | FieldKind::Table => false,
        }
    }

    /// Whether an `apiConfig` with a `responseMap` on this kind drives autofill.
    pub fn supports_autofill(&self) -> bool {
        match self {
            FieldKind::Text | FieldKind::Date => true,
            FieldKind::Textarea
            | FieldKind::Radio
            | FieldKind::Dropdown
            | FieldKind::Checkbox
            | FieldKind::Switch
            | FieldKind::Table => false,
        }
    }
}

/// Visibility rule: show the owner only when `field_id` is visible and its
/// value matches `value` (or is non-empty for [`WILDCARD`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub field_id: String,
    #[serde(default)]
    pub value: String,
}

impl Dependency {
    pub fn new(field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            value: value.into(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Dropdown,
}

/// Column of a table field. A column dependency refers to another column of
/// the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

impl Column {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            required: false,
            options: Vec::new(),
            api_config: None,
            dependency: None,
        }
    }

    /// Api config that resolves this column's options per row.
    pub fn remote_source(&self) -> Option<&ApiConfig> {
        match self.kind {
            ColumnKind::Dropdown => self.api_config.as_ref(),
            ColumnKind::Text => None,
        }
    }
}

/// The atomic form element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
}

impl Field {
    /// Creates a field with the defaults the builder gives a dropped widget.
    pub fn new(id: impl Into<String>, kind: FieldKind) -> Self {
        let options = match kind {
            FieldKind::Radio | FieldKind::Dropdown | FieldKind::Checkbox => vec![
                FieldOption::labelled("Option 1"),
                FieldOption::labelled("Option 2"),
            ],
            FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Switch
            | FieldKind::Table => Vec::new(),
        };
        Self {
            id: id.into(),
            kind,
            label: kind.default_label(),
            description: None,
            placeholder: None,
            required: false,
            disabled: false,
            read_only: false,
            min_length: None,
            max_length: None,
            pattern: None,
            allow_multiple: false,
            options,
            api_config: None,
            dependency: None,
            columns: Vec::new(),
        }
    }

    /// Same as [`Field::new`] with a generated id.
    pub fn generated(kind: FieldKind) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), kind)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn with_api_config(mut self, config: ApiConfig) -> Self {
        self.api_config = Some(config);
        self
    }

    /// Configured pattern, ignoring blank text.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref().filter(|pattern| !pattern.is_empty())
    }

    /// Api config that feeds this field's option list.
    pub fn remote_source(&self) -> Option<&ApiConfig> {
        self.api_config
            .as_ref()
            .filter(|_| self.kind.uses_remote_options())
    }

    /// Api config that autofills other fields when this one is committed.
    pub fn autofill_source(&self) -> Option<&ApiConfig> {
        self.api_config.as_ref().filter(|config| {
            self.kind.supports_autofill() && !config.url.is_empty() && config.response_map().is_some()
        })
    }

    /// Field ids this field points at through its dependency and `dependsOn`.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.dependency
            .iter()
            .map(|dependency| dependency.field_id.as_str())
            .chain(
                self.api_config
                    .iter()
                    .flat_map(|config| config.depends_on.iter().map(String::as_str)),
            )
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == column_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_choice_fields_get_two_options() {
        let field = Field::new("colour", FieldKind::Radio);
        assert_eq!(field.label, "Radio Field");
        assert_eq!(field.options.len(), 2);
        assert_ne!(field.options[0].id, field.options[1].id);
        assert!(Field::new("name", FieldKind::Text).options.is_empty());
    }

    #[test]
    fn field_uses_camel_case_keys() {
        let mut field = Field::new("name", FieldKind::Text);
        field.min_length = Some(2);
        field.read_only = true;
        let value = serde_json::to_value(&field).expect("serialize");
        assert_eq!(value["type"], json!("text"));
        assert_eq!(value["minLength"], json!(2));
        assert_eq!(value["readOnly"], json!(true));
    }

    #[test]
    fn autofill_requires_response_map_and_url() {
        let mut config = ApiConfig::new("https://example.test/lookup");
        let field = Field::new("zip", FieldKind::Text).with_api_config(config.clone());
        assert!(field.autofill_source().is_none());

        config.response_map = Some([("city".to_string(), "city".to_string())].into());
        let field = Field::new("zip", FieldKind::Text).with_api_config(config.clone());
        assert!(field.autofill_source().is_some());

        let dropdown = Field::new("zip", FieldKind::Dropdown).with_api_config(config);
        assert!(dropdown.autofill_source().is_none());
        assert!(dropdown.remote_source().is_some());
    }
}
