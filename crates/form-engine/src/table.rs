use form_spec::{Column, Field, FieldKind, ValueEnv, has_blank_param, interpolate, request_signature};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::CacheKey;
use crate::http::ApiRequest;
use crate::resolver::{OptionResolver, Refresh};

impl OptionResolver {
    /// Re-evaluates the remote options of one table cell.
    ///
    /// Params are interpolated against the row alone. A blank param clears
    /// the cell list instead of fetching.
    pub fn refresh_cell(
        &self,
        field: &Field,
        column: &Column,
        row_index: usize,
        row: &Map<String, Value>,
    ) -> Refresh {
        let Some(config) = column.remote_source() else {
            return Refresh::Static;
        };
        let key = CacheKey::cell(&field.id, &column.id, row_index);
        let params = interpolate(&config.params, row);
        let signature = request_signature(&params, &[]);
        if self.cache().signature(&key).as_deref() == Some(signature.as_str()) {
            return Refresh::Unchanged;
        }
        if has_blank_param(&params) {
            debug!(%key, "row params incomplete; clearing options");
            self.cache().clear(&key);
            return Refresh::Cleared;
        }
        let Some(generation) = self.cache().begin(&key, &signature) else {
            return Refresh::Unchanged;
        };
        let request = ApiRequest::build(config, row, &params);
        Refresh::Fetching(self.spawn_fetch(key, generation, request, config.clone()))
    }

    /// Refreshes every remote column of every row of a table field.
    pub fn refresh_table(&self, field: &Field, values: &ValueEnv) -> Vec<JoinHandle<()>> {
        if field.kind != FieldKind::Table {
            return Vec::new();
        }
        let empty = Map::new();
        let mut handles = Vec::new();
        for (index, row) in values.rows(&field.id).iter().enumerate() {
            let cells = row.as_object().unwrap_or(&empty);
            for column in &field.columns {
                handles.extend(self.refresh_cell(field, column, index, cells).into_handle());
            }
        }
        handles
    }
}
