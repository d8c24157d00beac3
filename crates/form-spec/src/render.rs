use serde_json::{Map, Value, json};

use crate::answers::ValidationResult;
use crate::options::{OptionLookup, OptionState};
use crate::spec::field::{Field, FieldKind};
use crate::spec::form::Form;
use crate::values::ValueEnv;
use crate::visibility::{is_cell_visible, visible_fields};

/// Describes a single visible field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub current_value: Option<Value>,
    /// Options for choice fields; `None` for other kinds.
    pub options: Option<OptionState>,
    /// Per row, per column options for table fields.
    pub rows: Vec<RenderRow>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderCell {
    pub column_id: String,
    pub visible: bool,
    pub value: Option<Value>,
    pub options: Option<OptionState>,
}

#[derive(Debug, Clone)]
pub struct RenderRow {
    pub index: usize,
    pub cells: Vec<RenderCell>,
}

#[derive(Debug, Clone)]
pub struct RenderSection {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub columns: u8,
    pub fields: Vec<RenderField>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub sections: Vec<RenderSection>,
    pub visible: usize,
    pub total: usize,
    pub errors: usize,
}

/// Builds the preview payload: visible fields only, with their options and
/// any validation messages.
pub fn build_preview(
    form: &Form,
    values: &ValueEnv,
    lookup: &dyn OptionLookup,
    validation: Option<&ValidationResult>,
) -> RenderPayload {
    let sections = form
        .sections
        .iter()
        .map(|section| RenderSection {
            id: section.id.clone(),
            label: section.label.clone(),
            description: section.description.clone(),
            columns: section.columns,
            fields: visible_fields(section, values)
                .into_iter()
                .map(|field| render_field(field, values, lookup, validation))
                .collect(),
        })
        .collect::<Vec<_>>();

    let visible = sections.iter().map(|section| section.fields.len()).sum();
    RenderPayload {
        visible,
        total: form.fields().count(),
        errors: validation.map(|result| result.errors.len()).unwrap_or(0),
        sections,
    }
}

fn render_field(
    field: &Field,
    values: &ValueEnv,
    lookup: &dyn OptionLookup,
    validation: Option<&ValidationResult>,
) -> RenderField {
    let options = match field.kind {
        FieldKind::Radio | FieldKind::Dropdown | FieldKind::Checkbox => {
            Some(lookup.field_options(field))
        }
        FieldKind::Text
        | FieldKind::Textarea
        | FieldKind::Date
        | FieldKind::Switch
        | FieldKind::Table => None,
    };

    let rows = match field.kind {
        FieldKind::Table => values
            .rows(&field.id)
            .iter()
            .enumerate()
            .map(|(index, row)| render_row(field, index, row, lookup))
            .collect(),
        _ => Vec::new(),
    };

    RenderField {
        id: field.id.clone(),
        label: field.label.clone(),
        description: field.description.clone(),
        kind: field.kind,
        required: field.required,
        disabled: field.disabled,
        read_only: field.read_only,
        current_value: values.get(&field.id).cloned(),
        options,
        rows,
        error: validation
            .and_then(|result| result.error_for(&field.id))
            .map(|error| error.message.clone()),
    }
}

fn render_row(field: &Field, index: usize, row: &Value, lookup: &dyn OptionLookup) -> RenderRow {
    let empty = Map::new();
    let cells = row.as_object().unwrap_or(&empty);
    RenderRow {
        index,
        cells: field
            .columns
            .iter()
            .map(|column| RenderCell {
                column_id: column.id.clone(),
                visible: is_cell_visible(column, cells),
                value: cells.get(&column.id).cloned(),
                options: column
                    .remote_source()
                    .map(|_| lookup.cell_options(field, column, index))
                    .or_else(|| {
                        (!column.options.is_empty())
                            .then(|| OptionState::ready(column.options.clone()))
                    }),
            })
            .collect(),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let sections = payload
        .sections
        .iter()
        .map(|section| {
            let fields = section
                .fields
                .iter()
                .map(|field| {
                    let mut map = Map::new();
                    map.insert("id".into(), Value::String(field.id.clone()));
                    map.insert("label".into(), Value::String(field.label.clone()));
                    map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
                    map.insert("required".into(), Value::Bool(field.required));
                    map.insert("disabled".into(), Value::Bool(field.disabled));
                    map.insert("readOnly".into(), Value::Bool(field.read_only));
                    if let Some(description) = &field.description {
                        map.insert("description".into(), Value::String(description.clone()));
                    }
                    if let Some(value) = &field.current_value {
                        map.insert("value".into(), value.clone());
                    }
                    if let Some(state) = &field.options {
                        map.insert("options".into(), json!(state.options));
                        map.insert("loading".into(), Value::Bool(state.loading));
                    }
                    if !field.rows.is_empty() {
                        map.insert("rows".into(), Value::Array(field.rows.iter().map(row_json).collect()));
                    }
                    if let Some(error) = &field.error {
                        map.insert("error".into(), Value::String(error.clone()));
                    }
                    Value::Object(map)
                })
                .collect::<Vec<_>>();
            json!({
                "id": section.id,
                "label": section.label,
                "description": section.description,
                "columns": section.columns,
                "fields": fields,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "progress": {
            "visible": payload.visible,
            "total": payload.total,
            "errors": payload.errors,
        },
        "sections": sections,
    })
}

fn row_json(row: &RenderRow) -> Value {
    let cells = row
        .cells
        .iter()
        .map(|cell| {
            let mut map = Map::new();
            map.insert("column".into(), Value::String(cell.column_id.clone()));
            map.insert("visible".into(), Value::Bool(cell.visible));
            if let Some(value) = &cell.value {
                map.insert("value".into(), value.clone());
            }
            if let Some(state) = &cell.options {
                map.insert("options".into(), json!(state.options));
                map.insert("loading".into(), Value::Bool(state.loading));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();
    json!({ "index": row.index, "cells": cells })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Visible fields: {}/{}",
        payload.visible, payload.total
    ));
    if payload.errors > 0 {
        lines.push(format!("Errors: {}", payload.errors));
    }

    for section in &payload.sections {
        let title = if section.label.is_empty() {
            "Untitled Section"
        } else {
            section.label.as_str()
        };
        lines.push(format!("[{}] {}", section.id, title));
        if let Some(description) = &section.description {
            lines.push(format!("  {}", description));
        }
        for field in &section.fields {
            let mut entry = format!("  - {} ({}, {})", field.id, field.label, field.kind.as_str());
            if field.required {
                entry.push_str(" [required]");
            }
            if field.disabled {
                entry.push_str(" [disabled]");
            }
            if let Some(value) = &field.current_value {
                entry.push_str(&format!(" = {}", value_to_display(value)));
            }
            lines.push(entry);
            if let Some(state) = &field.options {
                if state.loading {
                    lines.push("      options: Loading...".to_string());
                } else {
                    let labels = state
                        .options
                        .iter()
                        .map(|option| option.label.as_str())
                        .collect::<Vec<_>>();
                    lines.push(format!("      options: {}", labels.join(", ")));
                }
            }
            for row in &field.rows {
                let cells = row
                    .cells
                    .iter()
                    .filter(|cell| cell.visible)
                    .map(|cell| {
                        let value = cell.value.as_ref().map(value_to_display).unwrap_or_default();
                        format!("{}={}", cell.column_id, value)
                    })
                    .collect::<Vec<_>>();
                lines.push(format!("      row {}: {}", row.index, cells.join(", ")));
            }
            if let Some(error) = &field.error {
                lines.push(format!("      error: {}", error));
            }
        }
    }

    lines.join("\n")
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Object(object) => object
            .get("label")
            .or_else(|| object.get("id"))
            .map(value_to_display)
            .unwrap_or_else(|| value.to_string()),
        Value::Array(items) => items.iter().map(value_to_display).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
    }
}
