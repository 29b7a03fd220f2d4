//! Client for the upstream player profile API.
//!
//! One GET per lookup, no retries. Every failure is turned into a short
//! message that can be shown to the user as-is.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::ApiConfig;
use crate::error::{BotError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Outcome of one profile lookup
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Success {
        /// Profile payload the field mapper reads from
        data: Value,
    },
    Error {
        message: String,
    },
}

impl LookupResult {
    pub fn error(message: impl Into<String>) -> Self {
        LookupResult::Error {
            message: message.into(),
        }
    }
}

/// Anything that can fetch a profile by identifier
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn fetch(&self, identifier: &str) -> LookupResult;
}

pub struct UpstreamClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl UpstreamClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| BotError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Static params plus the identifier; the identifier wins on a name clash
    fn query<'a>(&'a self, identifier: &'a str) -> Vec<(&'a str, &'a str)> {
        let param = self.config.identifier_param.as_str();
        let mut query: Vec<(&str, &str)> = self
            .config
            .params
            .iter()
            .filter(|(key, _)| key.as_str() != param)
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        query.push((param, identifier));
        query
    }
}

#[async_trait]
impl ProfileLookup for UpstreamClient {
    async fn fetch(&self, identifier: &str) -> LookupResult {
        info!("Fetching data from API for UID: {}", identifier);

        let response = match self
            .client
            .get(self.config.url())
            .query(&self.query(identifier))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return request_failed(identifier, &e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!("API returned {} for UID: {}", status, identifier);
            return LookupResult::error(format!("API Error: {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return request_failed(identifier, &e),
            Err(e) => {
                error!("Undecodable API response for UID {}: {}", identifier, e);
                return LookupResult::error("Invalid API response format");
            }
        };

        info!("API Response received for UID: {}", identifier);
        classify_response(&self.config, body)
    }
}

fn request_failed(identifier: &str, e: &reqwest::Error) -> LookupResult {
    if e.is_timeout() {
        error!("Timeout for UID: {}", identifier);
        LookupResult::error("Timeout - Server is slow")
    } else if e.is_connect() {
        error!("Connection error for UID: {}", identifier);
        LookupResult::error("Connection error - API might be down")
    } else {
        error!("Request error for UID {}: {}", identifier, e);
        let reason: String = e.to_string().chars().take(50).collect();
        LookupResult::error(format!("Request failed: {}", reason))
    }
}

/// Map a decoded 200 response onto a lookup result using the configured keys.
///
/// An absent or empty data value falls back to the whole response. That
/// widens the scope the field mapper resolves against, so a renamed data
/// key upstream shows up as a profile full of N/A rather than an error.
pub fn classify_response(config: &ApiConfig, body: Value) -> LookupResult {
    let Some(object) = body.as_object() else {
        return LookupResult::error("Invalid API response format");
    };

    let succeeded = object.get(&config.success_key).is_some_and(is_truthy);
    if !succeeded {
        let message = match object.get(&config.error_key) {
            Some(Value::String(message)) => message.clone(),
            Some(value) if !value.is_null() => value.to_string(),
            _ => "Unknown error from API".to_string(),
        };
        return LookupResult::error(message);
    }

    let data = match object.get(&config.data_key) {
        Some(data) if is_truthy(data) => data.clone(),
        _ => body.clone(),
    };

    LookupResult::Success { data }
}

/// JSON truthiness: null, false, 0, "", [] and {} are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
