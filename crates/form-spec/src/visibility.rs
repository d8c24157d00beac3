use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::spec::field::{Column, Dependency, Field, FieldKind};
use crate::spec::form::{Form, Section};
use crate::values::{ValueEnv, is_blank, scalar_text};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Whether `field` is shown given the values of its section siblings.
///
/// Dependencies are looked up among `siblings` only. A missing target leaves
/// the field visible; a hidden target hides it. Evaluation is pure.
pub fn is_visible(field: &Field, siblings: &[Field], values: &ValueEnv) -> bool {
    let mut visited = HashSet::new();
    visible_within(field, siblings, values.as_map(), &mut visited)
}

fn visible_within<'a>(
    field: &'a Field,
    siblings: &'a [Field],
    values: &Map<String, Value>,
    visited: &mut HashSet<&'a str>,
) -> bool {
    let Some(dependency) = &field.dependency else {
        return true;
    };
    // Drafts reject cycles when dependencies are assigned; a cycle in a
    // hand-written document hides every field on it.
    if !visited.insert(field.id.as_str()) {
        return false;
    }
    let Some(target) = siblings
        .iter()
        .find(|candidate| candidate.id == dependency.field_id)
    else {
        return true;
    };
    if !visible_within(target, siblings, values, visited) {
        return false;
    }
    dependency_matches(target.kind, dependency, values.get(&target.id))
}

fn dependency_matches(target: FieldKind, dependency: &Dependency, value: Option<&Value>) -> bool {
    if dependency.is_wildcard() {
        return !is_blank(value);
    }
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(selected)) => match target {
            FieldKind::Checkbox => selected
                .iter()
                .any(|option| text_of(option.get("id")) == Some(dependency.value.as_str())),
            FieldKind::Dropdown
            | FieldKind::Radio
            | FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Switch
            | FieldKind::Table => selected
                .iter()
                .any(|option| option_matches(option, &dependency.value)),
        },
        Some(other) => option_matches(other, &dependency.value),
    }
}

/// An option object matches on `id` or `label`; a scalar on its text.
fn option_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::Object(option) => {
            text_of(option.get("id")) == Some(expected)
                || text_of(option.get("label")) == Some(expected)
        }
        other => scalar_text(other).as_deref() == Some(expected),
    }
}

fn text_of(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

/// Visible fields of one section, in order.
pub fn visible_fields<'a>(section: &'a Section, values: &ValueEnv) -> Vec<&'a Field> {
    section
        .fields
        .iter()
        .filter(|field| is_visible(field, &section.fields, values))
        .collect()
}

/// Visibility of every field in the form, resolved section by section.
pub fn resolve_visibility(form: &Form, values: &ValueEnv) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for section in &form.sections {
        for field in &section.fields {
            map.insert(
                field.id.clone(),
                is_visible(field, &section.fields, values),
            );
        }
    }
    map
}

/// Row-scoped check for a table column dependency.
///
/// Kept separate from [`is_visible`]: the referenced column is read straight
/// from the row, a missing cell hides the column, and there is no chaining
/// or checkbox handling.
pub fn is_cell_visible(column: &Column, row: &Map<String, Value>) -> bool {
    let Some(dependency) = &column.dependency else {
        return true;
    };
    let cell = row.get(&dependency.field_id);
    if dependency.is_wildcard() {
        return !is_blank(cell);
    }
    match cell {
        None | Some(Value::Null) => false,
        Some(value) => option_matches(value, &dependency.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::ColumnKind;
    use serde_json::json;

    fn env(value: Value) -> ValueEnv {
        ValueEnv::try_from(value).expect("object")
    }

    #[test]
    fn wildcard_needs_non_empty_value() {
        let a = Field::new("a", FieldKind::Text);
        let b = Field::new("b", FieldKind::Text).with_dependency(Dependency::new("a", "*"));
        let fields = vec![a, b.clone()];
        assert!(!is_visible(&b, &fields, &env(json!({}))));
        assert!(!is_visible(&b, &fields, &env(json!({ "a": "" }))));
        assert!(!is_visible(&b, &fields, &env(json!({ "a": {} }))));
        assert!(is_visible(&b, &fields, &env(json!({ "a": "anything" }))));
        assert!(is_visible(&b, &fields, &env(json!({ "a": false }))));
    }

    #[test]
    fn missing_target_fails_open() {
        let b = Field::new("b", FieldKind::Text).with_dependency(Dependency::new("gone", "x"));
        assert!(is_visible(&b, std::slice::from_ref(&b), &env(json!({}))));
    }

    #[test]
    fn object_values_match_id_or_label() {
        let a = Field::new("a", FieldKind::Dropdown);
        let by_id = Field::new("b", FieldKind::Text).with_dependency(Dependency::new("a", "us"));
        let by_label =
            Field::new("c", FieldKind::Text).with_dependency(Dependency::new("a", "United States"));
        let fields = vec![a, by_id.clone(), by_label.clone()];
        let values = env(json!({ "a": { "id": "us", "label": "United States" } }));
        assert!(is_visible(&by_id, &fields, &values));
        assert!(is_visible(&by_label, &fields, &values));
        assert!(!is_visible(&by_id, &fields, &env(json!({ "a": { "id": "ca" } }))));
    }

    #[test]
    fn checkbox_matches_any_selected_id() {
        let a = Field::new("a", FieldKind::Checkbox);
        let b = Field::new("b", FieldKind::Text).with_dependency(Dependency::new("a", "o2"));
        let any = Field::new("c", FieldKind::Text).with_dependency(Dependency::new("a", "*"));
        let fields = vec![a, b.clone(), any.clone()];
        let selected = env(json!({ "a": [ { "id": "o1" }, { "id": "o2" } ] }));
        assert!(is_visible(&b, &fields, &selected));
        assert!(is_visible(&any, &fields, &selected));
        let cleared = env(json!({ "a": [] }));
        assert!(!is_visible(&b, &fields, &cleared));
        assert!(!is_visible(&any, &fields, &cleared));
    }

    #[test]
    fn switch_matches_textual_boolean() {
        // Compared as text: strict equality would never match `true` against "true".
        let a = Field::new("a", FieldKind::Switch);
        let b = Field::new("b", FieldKind::Text).with_dependency(Dependency::new("a", "true"));
        let fields = vec![a, b.clone()];
        assert!(is_visible(&b, &fields, &env(json!({ "a": true }))));
        assert!(!is_visible(&b, &fields, &env(json!({ "a": false }))));
    }

    #[test]
    fn cyclic_documents_hide_the_cycle() {
        let a = Field::new("a", FieldKind::Text).with_dependency(Dependency::new("b", "*"));
        let b = Field::new("b", FieldKind::Text).with_dependency(Dependency::new("a", "*"));
        let fields = vec![a.clone(), b];
        assert!(!is_visible(&a, &fields, &env(json!({ "a": "x", "b": "y" }))));
    }

    #[test]
    fn cell_visibility_reads_the_row() {
        let mut column = Column::new("size", "Size", ColumnKind::Text);
        column.dependency = Some(Dependency::new("kind", "shirt"));
        let row = |value: Value| value.as_object().cloned().unwrap_or_default();
        assert!(is_cell_visible(&column, &row(json!({ "kind": "shirt" }))));
        assert!(is_cell_visible(&column, &row(json!({ "kind": { "id": "shirt", "label": "Shirt" } }))));
        assert!(!is_cell_visible(&column, &row(json!({}))));

        column.dependency = Some(Dependency::new("kind", "*"));
        assert!(!is_cell_visible(&column, &row(json!({ "kind": "" }))));
        assert!(is_cell_visible(&column, &row(json!({ "kind": "hat" }))));
    }
}
