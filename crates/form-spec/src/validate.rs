use regex::Regex;
use serde_json::Value;

use crate::answers::{ValidationError, ValidationResult};
use crate::spec::field::{Field, FieldKind};
use crate::spec::form::Form;
use crate::values::ValueEnv;
use crate::visibility::visible_fields;

/// Validates every visible field of the form, section by section.
pub fn validate(form: &Form, values: &ValueEnv) -> ValidationResult {
    let mut errors = Vec::new();
    for section in &form.sections {
        for field in visible_fields(section, values) {
            if let Some(error) = validate_field(field, values.get(&field.id)) {
                errors.push(error);
            }
        }
    }
    ValidationResult::from_errors(errors)
}

/// Applies one field's rules to its value. Disabled fields are never checked.
pub fn validate_field(field: &Field, value: Option<&Value>) -> Option<ValidationError> {
    if field.disabled {
        return None;
    }

    if field.required && is_unanswered(field, value) {
        return Some(ValidationError::new(
            &field.id,
            required_message(field),
            "required",
        ));
    }

    match field.kind {
        FieldKind::Text => value
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .and_then(|text| enforce_text_rules(field, text)),
        FieldKind::Textarea
        | FieldKind::Date
        | FieldKind::Radio
        | FieldKind::Dropdown
        | FieldKind::Checkbox
        | FieldKind::Switch
        | FieldKind::Table => None,
    }
}

fn is_unanswered(field: &Field, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(object)) => match field.kind {
            FieldKind::Radio | FieldKind::Dropdown => object.is_empty(),
            FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Checkbox
            | FieldKind::Switch
            | FieldKind::Table => false,
        },
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

fn required_message(field: &Field) -> &'static str {
    match field.kind {
        FieldKind::Radio => "Please select an option",
        FieldKind::Dropdown if field.allow_multiple => "Please select at least one option",
        FieldKind::Dropdown => "Please select an option",
        FieldKind::Checkbox => "Please select at least one option",
        FieldKind::Text
        | FieldKind::Textarea
        | FieldKind::Date
        | FieldKind::Switch
        | FieldKind::Table => "This field is required",
    }
}

fn enforce_text_rules(field: &Field, text: &str) -> Option<ValidationError> {
    let length = text.chars().count();

    if let Some(min) = field.min_length
        && length < min
    {
        return Some(ValidationError::new(
            &field.id,
            format!("Minimum {min} characters required"),
            "min_length",
        ));
    }

    if let Some(max) = field.max_length
        && length > max
    {
        return Some(ValidationError::new(
            &field.id,
            format!("Maximum {max} characters allowed"),
            "max_length",
        ));
    }

    // A malformed pattern is a configuration error reported by the editor,
    // not a validation failure.
    if let Some(pattern) = field.pattern()
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return Some(ValidationError::new(
            &field.id,
            "Value does not match the required pattern",
            "pattern_mismatch",
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_field() -> Field {
        let mut field = Field::new("name", FieldKind::Text);
        field.min_length = Some(3);
        field
    }

    #[test]
    fn min_length_boundary() {
        let field = text_field();
        let error = validate_field(&field, Some(&json!("ab"))).expect("too short");
        assert_eq!(error.code, "min_length");
        assert!(validate_field(&field, Some(&json!("abc"))).is_none());
    }

    #[test]
    fn disabled_fields_are_exempt() {
        let mut field = text_field();
        field.disabled = true;
        field.required = true;
        assert!(validate_field(&field, Some(&json!("ab"))).is_none());
        assert!(validate_field(&field, None).is_none());
    }

    #[test]
    fn length_rules_skip_empty_values() {
        let field = text_field();
        assert!(validate_field(&field, Some(&json!(""))).is_none());
        assert!(validate_field(&field, None).is_none());
    }

    #[test]
    fn max_length_counts_characters() {
        let mut field = Field::new("code", FieldKind::Text);
        field.max_length = Some(3);
        assert!(validate_field(&field, Some(&json!("héé"))).is_none());
        assert_eq!(
            validate_field(&field, Some(&json!("abcd"))).map(|e| e.code),
            Some("max_length".to_string())
        );
    }

    #[test]
    fn pattern_is_searched_and_bad_patterns_ignored() {
        let mut field = Field::new("zip", FieldKind::Text);
        field.pattern = Some(r"^\d{5}$".into());
        assert!(validate_field(&field, Some(&json!("12345"))).is_none());
        assert_eq!(
            validate_field(&field, Some(&json!("12a45"))).map(|e| e.code),
            Some("pattern_mismatch".to_string())
        );

        field.pattern = Some("([".into());
        assert!(validate_field(&field, Some(&json!("anything"))).is_none());
    }

    #[test]
    fn required_selections() {
        let mut dropdown = Field::new("pick", FieldKind::Dropdown);
        dropdown.required = true;
        assert_eq!(
            validate_field(&dropdown, None).map(|e| e.message),
            Some("Please select an option".to_string())
        );
        assert!(validate_field(&dropdown, Some(&json!({}))).is_some());
        assert!(validate_field(&dropdown, Some(&json!({ "id": "a", "label": "A" }))).is_none());

        dropdown.allow_multiple = true;
        assert_eq!(
            validate_field(&dropdown, Some(&json!([]))).map(|e| e.message),
            Some("Please select at least one option".to_string())
        );

        let mut checkbox = Field::new("tags", FieldKind::Checkbox);
        checkbox.required = true;
        assert!(validate_field(&checkbox, Some(&json!([]))).is_some());
        assert!(validate_field(&checkbox, Some(&json!([{ "id": "a" }]))).is_none());
    }

    #[test]
    fn unconstrained_kinds_are_valid() {
        let switch = Field::new("on", FieldKind::Switch);
        assert!(validate_field(&switch, Some(&json!(false))).is_none());
        let table = Field::new("rows", FieldKind::Table);
        assert!(validate_field(&table, Some(&json!([{}]))).is_none());
    }
}
