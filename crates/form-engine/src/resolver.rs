use std::sync::Arc;

use form_spec::{
    ApiConfig, Field, FieldKind, FieldOption, Form, ValueEnv, dependencies_ready,
    dependency_values, extract_items, interpolate, map_options, request_signature,
};
use serde_json::Map;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{CacheKey, OptionCache};
use crate::error::FetchError;
use crate::http::{ApiRequest, HttpClient};

/// Outcome of a refresh request for one option list.
#[derive(Debug)]
pub enum Refresh {
    /// The list is static; nothing to fetch.
    Static,
    /// Inputs match the last fetch.
    Unchanged,
    /// Inputs are incomplete; the list was emptied.
    Cleared,
    /// A fetch was started.
    Fetching(JoinHandle<()>),
}

impl Refresh {
    pub fn into_handle(self) -> Option<JoinHandle<()>> {
        match self {
            Self::Fetching(handle) => Some(handle),
            Self::Static | Self::Unchanged | Self::Cleared => None,
        }
    }
}

/// Keeps remote option lists in step with the value environment.
#[derive(Clone)]
pub struct OptionResolver {
    client: Arc<dyn HttpClient>,
    cache: OptionCache,
}

impl OptionResolver {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            cache: OptionCache::new(),
        }
    }

    pub fn cache(&self) -> &OptionCache {
        &self.cache
    }

    /// Re-evaluates the remote options of a top level field.
    ///
    /// Params are interpolated against the whole environment. A fetch starts
    /// only when the signature changed and every `dependsOn` field holds a
    /// value; otherwise the list is left alone or cleared.
    pub fn refresh_field(&self, field: &Field, values: &ValueEnv) -> Refresh {
        let Some(config) = field.remote_source() else {
            return Refresh::Static;
        };
        let key = CacheKey::field(&field.id);
        let env = values.as_map();
        let params = interpolate(&config.params, env);
        let signature = request_signature(&params, &dependency_values(&config.depends_on, env));
        if self.cache.signature(&key).as_deref() == Some(signature.as_str()) {
            return Refresh::Unchanged;
        }
        if !dependencies_ready(&config.depends_on, env) {
            debug!(field = %field.id, "dependencies incomplete; clearing options");
            self.cache.clear(&key);
            return Refresh::Cleared;
        }
        let Some(generation) = self.cache.begin(&key, &signature) else {
            return Refresh::Unchanged;
        };
        let request = ApiRequest::build(config, env, &params);
        Refresh::Fetching(self.spawn_fetch(key, generation, request, config.clone()))
    }

    /// Refreshes every remote field and table cell of the form.
    pub fn refresh_form(&self, form: &Form, values: &ValueEnv) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for field in form.fields() {
            match field.kind {
                FieldKind::Table => handles.extend(self.refresh_table(field, values)),
                _ => handles.extend(self.refresh_field(field, values).into_handle()),
            }
        }
        handles
    }

    pub(crate) fn spawn_fetch(
        &self,
        key: CacheKey,
        generation: u64,
        request: ApiRequest,
        config: ApiConfig,
    ) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let cache = self.cache.clone();
        debug!(%key, generation, url = %request.url, "fetching options");
        tokio::spawn(async move {
            let options = fetch_options(client.as_ref(), request, &config)
                .await
                .unwrap_or_else(|err| {
                    warn!(%key, error = %err, "option request failed");
                    Vec::new()
                });
            if !cache.complete(&key, generation, options) {
                debug!(%key, generation, "dropping stale option response");
            }
        })
    }
}

/// Sends `request` and maps the response through the field's config.
pub async fn fetch_options(
    client: &dyn HttpClient,
    request: ApiRequest,
    config: &ApiConfig,
) -> Result<Vec<FieldOption>, FetchError> {
    let body = client.send(request).await?;
    Ok(map_options(
        extract_items(&body, config.response_path()),
        &config.map_options,
    ))
}

/// One-off fetch used while designing a form. Placeholders resolve to empty
/// strings and failures are returned to the caller.
pub async fn preview_options(
    client: &dyn HttpClient,
    config: &ApiConfig,
) -> Result<Vec<FieldOption>, FetchError> {
    let empty = Map::new();
    let params = interpolate(&config.params, &empty);
    let request = ApiRequest::build(config, &empty, &params);
    fetch_options(client, request, config).await
}
