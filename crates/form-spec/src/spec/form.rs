use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormError;
use crate::spec::field::Field;

fn default_columns() -> u8 {
    1
}

/// Named container of fields. Sections do not nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display grid arity, unrelated to table columns.
    #[serde(default = "default_columns")]
    pub columns: u8,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Section {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            columns: default_columns(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == field_id)
    }
}

/// Published form definition: an ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Form {
    pub sections: Vec<Section>,
}

impl Form {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Every field of every section, in display order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields().find(|field| field.id == field_id)
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == section_id)
    }

    /// Section holding `field_id`.
    pub fn section_of(&self, field_id: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.field(field_id).is_some())
    }

    pub fn from_json(text: &str) -> Result<Self, FormError> {
        serde_json::from_str(text).map_err(FormError::Json)
    }

    /// Pretty-printed JSON used for export and copy.
    pub fn to_pretty_json(&self) -> Result<String, FormError> {
        serde_json::to_string_pretty(self).map_err(FormError::Json)
    }
}

/// JSON Schema describing a form document.
pub fn form_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(Form)).unwrap_or(Value::Null)
}
