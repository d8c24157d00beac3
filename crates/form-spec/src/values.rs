use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FormError;

/// Field values held during a preview session, keyed by field id.
///
/// Table fields hold an array of row objects (column id to cell value). Rows
/// are appended, replaced whole or removed by index; a cell update rewrites
/// its row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueEnv(Map<String, Value>);

impl ValueEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.0.get(field_id)
    }

    pub fn set(&mut self, field_id: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field_id.into(), value)
    }

    pub fn remove(&mut self, field_id: &str) -> Option<Value> {
        self.0.remove(field_id)
    }

    /// Copies every entry of `patch` over the current values.
    pub fn merge(&mut self, patch: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rows of a table field; empty when nothing is held.
    pub fn rows(&self, field_id: &str) -> &[Value] {
        self.0
            .get(field_id)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Appends an empty row and returns its index.
    pub fn append_row(&mut self, field_id: &str) -> usize {
        let mut rows = self.rows(field_id).to_vec();
        rows.push(Value::Object(Map::new()));
        let index = rows.len() - 1;
        self.0.insert(field_id.to_string(), Value::Array(rows));
        index
    }

    pub fn update_cell(
        &mut self,
        field_id: &str,
        row: usize,
        column_id: &str,
        value: Value,
    ) -> Result<(), FormError> {
        let mut rows = self.rows(field_id).to_vec();
        let len = rows.len();
        let Some(current) = rows.get(row) else {
            return Err(FormError::OutOfRange {
                container: field_id.to_string(),
                index: row,
                len,
            });
        };
        let mut replaced = current.as_object().cloned().unwrap_or_default();
        replaced.insert(column_id.to_string(), value);
        rows[row] = Value::Object(replaced);
        self.0.insert(field_id.to_string(), Value::Array(rows));
        Ok(())
    }

    /// Removes a row; later rows shift down by one.
    pub fn delete_row(&mut self, field_id: &str, row: usize) -> Result<Value, FormError> {
        let rows = self.rows(field_id);
        if row >= rows.len() {
            return Err(FormError::OutOfRange {
                container: field_id.to_string(),
                index: row,
                len: rows.len(),
            });
        }
        let mut removed = Value::Null;
        let kept = rows
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                if index == row {
                    removed = value.clone();
                    None
                } else {
                    Some(value.clone())
                }
            })
            .collect();
        self.0.insert(field_id.to_string(), Value::Array(kept));
        Ok(removed)
    }

    pub fn to_pretty_json(&self) -> Result<String, FormError> {
        serde_json::to_string_pretty(&self.0).map_err(FormError::Json)
    }
}

impl From<Map<String, Value>> for ValueEnv {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ValueEnv {
    type Error = FormError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(FormError::Json(serde::de::Error::custom(format!(
                "values must be a JSON object, got {other}"
            )))),
        }
    }
}

impl FromIterator<(String, Value)> for ValueEnv {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Absent, null, empty string, empty object or empty array.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

/// Text form of a scalar value; `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_covers_empty_containers() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!(""))));
        assert!(is_blank(Some(&json!({}))));
        assert!(is_blank(Some(&json!([]))));
        assert!(!is_blank(Some(&json!(false))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!({"id": "x"}))));
    }

    #[test]
    fn table_rows_append_update_delete() {
        let mut env = ValueEnv::new();
        assert_eq!(env.append_row("items"), 0);
        assert_eq!(env.append_row("items"), 1);
        env.update_cell("items", 1, "name", json!("bolt"))
            .expect("row exists");
        assert_eq!(env.rows("items"), &[json!({}), json!({"name": "bolt"})]);

        let removed = env.delete_row("items", 0).expect("row exists");
        assert_eq!(removed, json!({}));
        assert_eq!(env.rows("items"), &[json!({"name": "bolt"})]);
    }

    #[test]
    fn cell_update_out_of_range_is_rejected() {
        let mut env = ValueEnv::new();
        let err = env
            .update_cell("items", 0, "name", json!("x"))
            .expect_err("no rows");
        assert!(matches!(err, FormError::OutOfRange { len: 0, .. }));
        assert!(env.delete_row("items", 3).is_err());
    }
}
