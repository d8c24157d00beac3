use crate::answers::{Submission, ValidationResult};
use crate::spec::form::Form;
use crate::validate::validate;
use crate::values::ValueEnv;
use crate::visibility::visible_fields;

/// Validates the visible fields and, when nothing fails, freezes the values
/// as the submission. Table rows travel inside their field's value.
pub fn submit(form: &Form, values: &ValueEnv) -> Result<Submission, ValidationResult> {
    let validation = validate(form, values);
    if !validation.valid {
        return Err(validation);
    }

    let visible = form
        .sections
        .iter()
        .flat_map(|section| visible_fields(section, values))
        .map(|field| field.id.clone())
        .collect();

    Ok(Submission {
        values: values.clone(),
        visible_fields: visible,
    })
}
