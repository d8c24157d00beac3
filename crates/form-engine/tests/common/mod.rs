#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use form_engine::{ApiRequest, FetchError, HttpClient};
use form_spec::Form;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

pub fn address_form() -> Arc<Form> {
    let text = include_str!("../../../form-spec/tests/fixtures/address_form.json");
    Arc::new(Form::from_json(text).expect("fixture parses"))
}

/// Canned responses matched by substring against `"<url> <body>"`.
#[derive(Default)]
pub struct MockClient {
    routes: Vec<(String, Value)>,
    holds: Mutex<Vec<(String, Arc<Notify>)>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, body: Value) -> Self {
        self.routes.push((pattern.to_string(), body));
        self
    }

    /// Matching requests wait until the returned notify fires.
    pub fn hold(&self, pattern: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds
            .lock()
            .push((pattern.to_string(), Arc::clone(&notify)));
        notify
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| describe(request).contains(pattern))
            .count()
    }
}

fn describe(request: &ApiRequest) -> String {
    match &request.body {
        Some(body) => format!("{} {}", request.url, body),
        None => request.url.clone(),
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn send(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let target = describe(&request);
        self.requests.lock().push(request);
        let hold = self
            .holds
            .lock()
            .iter()
            .find(|(pattern, _)| target.contains(pattern.as_str()))
            .map(|(_, notify)| Arc::clone(notify));
        if let Some(notify) = hold {
            notify.notified().await;
        }
        self.routes
            .iter()
            .find(|(pattern, _)| target.contains(pattern.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| FetchError::Network(format!("no route for {target}")))
    }
}
