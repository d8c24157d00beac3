use std::collections::BTreeMap;

use form_spec::{Field, FieldKind, Form, ValueEnv, interpolate};
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{ApiRequest, HttpClient};

/// Values to merge into the environment after an autofill lookup.
pub type ValuePatch = BTreeMap<String, Value>;

/// Looks up the committed value of `field` and maps the response onto other
/// fields through its `responseMap`.
///
/// `committed` is merged into the environment before params are
/// interpolated. Failures produce an empty patch.
pub async fn autofill(
    client: &dyn HttpClient,
    form: &Form,
    field: &Field,
    committed: Value,
    values: &ValueEnv,
) -> ValuePatch {
    let Some(config) = field.autofill_source() else {
        return ValuePatch::new();
    };
    let Some(response_map) = config.response_map() else {
        return ValuePatch::new();
    };

    let mut merged = values.clone();
    merged.set(field.id.clone(), committed);
    let params = interpolate(&config.params, merged.as_map());
    let request = ApiRequest::build(config, merged.as_map(), &params);
    debug!(field = %field.id, url = %request.url, "autofill lookup");

    match client.send(request).await {
        Ok(body) => apply_response_map(form, response_map, &body),
        Err(err) => {
            warn!(field = %field.id, error = %err, "autofill request failed");
            ValuePatch::new()
        }
    }
}

/// Copies each mapped response key that is present into its target field.
pub fn apply_response_map(
    form: &Form,
    response_map: &BTreeMap<String, String>,
    body: &Value,
) -> ValuePatch {
    response_map
        .iter()
        .filter_map(|(response_key, target)| {
            let value = body.get(response_key)?.clone();
            Some((target.clone(), coerce_for(form.field(target), value)))
        })
        .collect()
}

// Date inputs take YYYY-MM-DD only.
fn coerce_for(target: Option<&Field>, value: Value) -> Value {
    match (target.map(|field| field.kind), value) {
        (Some(FieldKind::Date), Value::String(text)) if text.chars().count() > 10 => {
            Value::String(text.chars().take(10).collect())
        }
        (_, value) => value,
    }
}
