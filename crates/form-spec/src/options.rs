use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::api::MapOptions;
use crate::spec::field::{Column, Field};
use crate::spec::option::FieldOption;
use crate::values::{is_blank, scalar_text};

/// Options of one field or table cell as a renderer sees them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionState {
    pub options: Vec<FieldOption>,
    pub loading: bool,
}

impl OptionState {
    pub fn ready(options: Vec<FieldOption>) -> Self {
        Self {
            options,
            loading: false,
        }
    }
}

/// Source of the option lists shown for choice fields and table cells.
pub trait OptionLookup {
    fn field_options(&self, field: &Field) -> OptionState;

    fn cell_options(&self, field: &Field, column: &Column, row: usize) -> OptionState;
}

/// Lookup that only knows the static options stored in the form.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticOptions;

impl OptionLookup for StaticOptions {
    fn field_options(&self, field: &Field) -> OptionState {
        match field.remote_source() {
            Some(_) => OptionState::default(),
            None => OptionState::ready(field.options.clone()),
        }
    }

    fn cell_options(&self, _field: &Field, column: &Column, _row: usize) -> OptionState {
        match column.remote_source() {
            Some(_) => OptionState::default(),
            None => OptionState::ready(column.options.clone()),
        }
    }
}

/// Key summarising the interpolated params and `dependsOn` values of a
/// request. Equal signatures mean the previous fetch is still current.
pub fn request_signature(params: &Map<String, Value>, dependencies: &[Value]) -> String {
    let params = serde_json::to_string(params).unwrap_or_default();
    let dependencies = serde_json::to_string(dependencies).unwrap_or_default();
    format!("{params}|{dependencies}")
}

/// Current values of `depends_on`, null where unset.
pub fn dependency_values(depends_on: &[String], values: &Map<String, Value>) -> Vec<Value> {
    depends_on
        .iter()
        .map(|id| values.get(id).cloned().unwrap_or(Value::Null))
        .collect()
}

/// True when every listed dependency holds a non-blank value.
pub fn dependencies_ready(depends_on: &[String], values: &Map<String, Value>) -> bool {
    depends_on.iter().all(|id| !is_blank(values.get(id)))
}

/// True when any interpolated param came out blank.
pub fn has_blank_param(params: &Map<String, Value>) -> bool {
    params.values().any(|value| is_blank(Some(value)))
}

/// Walks a dot separated path into a response body; the whole body when no
/// path is configured.
pub fn extract_items<'a>(body: &'a Value, path: Option<&str>) -> Option<&'a Value> {
    let Some(path) = path else {
        return Some(body);
    };
    path.split('.').try_fold(body, |current, segment| match current {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Normalises response records into options.
///
/// With keys configured every record keeps its own fields alongside the
/// mapped `id`/`label`; a record's own `id` or `label` key wins over the
/// mapped one. Without keys only arrays of strings produce options.
/// Records repeating an earlier id are dropped; the first one is kept.
pub fn map_options(items: Option<&Value>, mapping: &MapOptions) -> Vec<FieldOption> {
    let mut options = mapped_options(items, mapping);
    let mut seen = HashSet::new();
    options.retain(|option| seen.insert(option.id.clone()));
    options
}

fn mapped_options(items: Option<&Value>, mapping: &MapOptions) -> Vec<FieldOption> {
    let Some(Value::Array(items)) = items else {
        return Vec::new();
    };

    let keys = match (mapping.id_key(), mapping.label_key()) {
        (Some(id), Some(label)) => Some((id, label)),
        (None, Some(label)) => Some((label, label)),
        (Some(id), None) => Some((id, id)),
        (None, None) => None,
    };

    match keys {
        Some((id_key, label_key)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|record| map_record(record, id_key, label_key))
            .collect(),
        None if items.first().is_some_and(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|text| FieldOption::new(text, text))
            .collect(),
        None => Vec::new(),
    }
}

fn map_record(record: &Map<String, Value>, id_key: &str, label_key: &str) -> FieldOption {
    let text = |key: &str| record.get(key).and_then(scalar_text);
    let id = text("id").or_else(|| text(id_key)).unwrap_or_default();
    let label = text("label").or_else(|| text(label_key)).unwrap_or_default();
    let extra = record
        .iter()
        .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "label")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    FieldOption { id, label, extra }
}
