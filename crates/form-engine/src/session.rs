use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use form_spec::{
    Column, Field, FieldKind, Form, OptionLookup, OptionState, RenderPayload, Submission,
    ValidationResult, ValueEnv, VisibilityMap, build_preview, resolve_visibility, submit, validate,
};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::autofill::autofill;
use crate::cache::{CacheKey, OptionCache};
use crate::error::EngineError;
use crate::http::HttpClient;
use crate::resolver::OptionResolver;

struct SessionState {
    form: Arc<Form>,
    values: RwLock<ValueEnv>,
    resolver: OptionResolver,
    client: Arc<dyn HttpClient>,
    autofill_generations: DashMap<String, u64>,
    next_autofill: AtomicU64,
}

impl SessionState {
    fn refresh(&self) -> Vec<JoinHandle<()>> {
        let snapshot = self.values.read().clone();
        self.resolver.refresh_form(&self.form, &snapshot)
    }

    fn autofill_is_current(&self, field_id: &str, generation: u64) -> bool {
        self.autofill_generations
            .get(field_id)
            .is_some_and(|current| *current == generation)
    }
}

/// A published form being filled in.
///
/// Mutations return the handles of the background fetches they started;
/// callers may await them with [`settle`] or let them finish on their own.
#[derive(Clone)]
pub struct PreviewSession {
    state: Arc<SessionState>,
}

impl PreviewSession {
    pub fn new(form: Arc<Form>, client: Arc<dyn HttpClient>) -> Self {
        Self::with_values(form, client, ValueEnv::new())
    }

    pub fn with_values(form: Arc<Form>, client: Arc<dyn HttpClient>, values: ValueEnv) -> Self {
        Self {
            state: Arc::new(SessionState {
                form,
                values: RwLock::new(values),
                resolver: OptionResolver::new(Arc::clone(&client)),
                client,
                autofill_generations: DashMap::new(),
                next_autofill: AtomicU64::new(0),
            }),
        }
    }

    pub fn form(&self) -> &Form {
        &self.state.form
    }

    pub fn values(&self) -> ValueEnv {
        self.state.values.read().clone()
    }

    pub fn value(&self, field_id: &str) -> Option<Value> {
        self.state.values.read().get(field_id).cloned()
    }

    pub fn cache(&self) -> &OptionCache {
        self.state.resolver.cache()
    }

    fn field(&self, field_id: &str) -> Result<&Field, EngineError> {
        self.state
            .form
            .field(field_id)
            .ok_or_else(|| EngineError::UnknownField(field_id.to_string()))
    }

    fn table(&self, field_id: &str) -> Result<&Field, EngineError> {
        let field = self.field(field_id)?;
        match field.kind {
            FieldKind::Table => Ok(field),
            _ => Err(EngineError::NotATable(field_id.to_string())),
        }
    }

    /// Starts fetches for every option list whose inputs changed.
    pub fn refresh_options(&self) -> Vec<JoinHandle<()>> {
        self.state.refresh()
    }

    pub fn set_value(&self, field_id: &str, value: Value) -> Result<Vec<JoinHandle<()>>, EngineError> {
        self.field(field_id)?;
        self.state.values.write().set(field_id, value);
        Ok(self.refresh_options())
    }

    pub fn clear_value(&self, field_id: &str) -> Result<Vec<JoinHandle<()>>, EngineError> {
        self.field(field_id)?;
        self.state.values.write().remove(field_id);
        Ok(self.refresh_options())
    }

    /// Sets the value and, for fields with an autofill source, starts the
    /// lookup that fills the mapped fields.
    pub fn commit(&self, field_id: &str, value: Value) -> Result<Vec<JoinHandle<()>>, EngineError> {
        let field = self.field(field_id)?.clone();
        let mut handles = self.set_value(field_id, value.clone())?;
        if field.autofill_source().is_some() {
            handles.push(self.spawn_autofill(field, value));
        }
        Ok(handles)
    }

    fn spawn_autofill(&self, field: Field, committed: Value) -> JoinHandle<()> {
        let generation = self.state.next_autofill.fetch_add(1, Ordering::Relaxed) + 1;
        self.state
            .autofill_generations
            .insert(field.id.clone(), generation);
        let state = Arc::clone(&self.state);
        let values = self.values();
        tokio::spawn(async move {
            let patch = autofill(state.client.as_ref(), &state.form, &field, committed, &values).await;
            if patch.is_empty() {
                return;
            }
            if !state.autofill_is_current(&field.id, generation) {
                debug!(field = %field.id, generation, "dropping stale autofill response");
                return;
            }
            info!(field = %field.id, targets = patch.len(), "applying autofill");
            state.values.write().merge(patch);
            settle(state.refresh()).await;
        })
    }

    /// Appends an empty row and returns its index.
    pub fn append_row(&self, field_id: &str) -> Result<(usize, Vec<JoinHandle<()>>), EngineError> {
        self.table(field_id)?;
        let index = self.state.values.write().append_row(field_id);
        Ok((index, self.refresh_options()))
    }

    pub fn update_cell(
        &self,
        field_id: &str,
        row: usize,
        column_id: &str,
        value: Value,
    ) -> Result<Vec<JoinHandle<()>>, EngineError> {
        let table = self.table(field_id)?;
        if table.column(column_id).is_none() {
            return Err(EngineError::UnknownColumn {
                field: field_id.to_string(),
                column: column_id.to_string(),
            });
        }
        self.state
            .values
            .write()
            .update_cell(field_id, row, column_id, value)?;
        Ok(self.refresh_options())
    }

    /// Removes a row. Cell option lists of the shifted rows are refetched.
    pub fn delete_row(&self, field_id: &str, row: usize) -> Result<Vec<JoinHandle<()>>, EngineError> {
        self.table(field_id)?;
        self.state.values.write().delete_row(field_id, row)?;
        self.cache().forget_rows(field_id, row);
        Ok(self.refresh_options())
    }

    pub fn options(&self, field_id: &str) -> Result<OptionState, EngineError> {
        let field = self.field(field_id)?;
        Ok(self.field_options(field))
    }

    pub fn visibility(&self) -> VisibilityMap {
        resolve_visibility(&self.state.form, &self.values())
    }

    pub fn validate(&self) -> ValidationResult {
        validate(&self.state.form, &self.values())
    }

    pub fn submit(&self) -> Result<Submission, ValidationResult> {
        let result = submit(&self.state.form, &self.values());
        match &result {
            Ok(submission) => info!(fields = submission.visible_fields.len(), "form submitted"),
            Err(validation) => debug!(errors = validation.errors.len(), "submission rejected"),
        }
        result
    }

    pub fn preview(&self, validation: Option<&ValidationResult>) -> RenderPayload {
        build_preview(&self.state.form, &self.values(), self, validation)
    }
}

impl OptionLookup for PreviewSession {
    fn field_options(&self, field: &Field) -> OptionState {
        match field.remote_source() {
            Some(_) => self.cache().state(&CacheKey::field(&field.id)),
            None => OptionState::ready(field.options.clone()),
        }
    }

    fn cell_options(&self, field: &Field, column: &Column, row: usize) -> OptionState {
        match column.remote_source() {
            Some(_) => self.cache().state(&CacheKey::cell(&field.id, &column.id, row)),
            None => OptionState::ready(column.options.clone()),
        }
    }
}

/// Waits for background fetches, logging tasks that panicked.
pub async fn settle(handles: Vec<JoinHandle<()>>) {
    for result in join_all(handles).await {
        if let Err(err) = result {
            warn!(error = %err, "background fetch task failed");
        }
    }
}
