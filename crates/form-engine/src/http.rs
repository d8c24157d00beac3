use async_trait::async_trait;
use form_spec::{ApiConfig, HttpMethod, interpolate_url, scalar_text};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::config::EngineConfig;
use crate::error::{EngineError, FetchError};

/// A fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// GET appends `params` as a query string to the interpolated URL; POST
    /// sends them as a JSON body.
    pub fn build(config: &ApiConfig, values: &Map<String, Value>, params: &Map<String, Value>) -> Self {
        let url = interpolate_url(&config.url, values);
        match config.method {
            HttpMethod::Get => Self {
                method: HttpMethod::Get,
                url: with_query(&url, params),
                body: None,
            },
            HttpMethod::Post => Self {
                method: HttpMethod::Post,
                url,
                body: Some(Value::Object(params.clone())),
            },
        }
    }
}

fn with_query(url: &str, params: &Map<String, Value>) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, &query_text(value));
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}", query.finish())
}

fn query_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(query_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
        other => scalar_text(other).unwrap_or_default(),
    }
}

/// Outbound HTTP used for option lists and autofill.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns the decoded JSON body.
    async fn send(&self, request: ApiRequest) -> Result<Value, FetchError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(EngineError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self
                .client
                .post(&request.url)
                .json(&request.body.unwrap_or_else(|| Value::Object(Map::new()))),
        };
        let response = builder
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;
        response
            .json::<Value>()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}
