use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One selectable choice of a radio, dropdown, checkbox or table column.
///
/// Remote options keep every key of the source record in `extra`, so a held
/// selection still carries the data the endpoint returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            extra: Map::new(),
        }
    }

    /// Static option with a freshly generated id.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), label)
    }

    /// The option as it is held in a value environment.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
