//! HTTP client for the listings backend.
//!
//! Every endpoint answers with the same envelope
//! (`{success, message, data, meta, error}`); `ApiClient::execute` maps it
//! and the HTTP status onto `ClientError` in one place.

pub mod activity;
pub mod queue;
pub mod submission;
pub mod verification;

pub use activity::{project_activity, ActivityItem, ActivityKind, ActivitySource};
pub use queue::{QueueBrowser, QueueFilter, QueuePage, QueueScope};
pub use submission::validate_draft;
pub use verification::StatusLookup;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{Envelope, PaginationMeta};
use queue::QueryCache;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

/// Shared client for submission, review and queue calls.
///
/// Cheap to clone; clones share the HTTP connection pool, the queue cache
/// and the set of in-flight mutations.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<ClientConfig>,
    queue_cache: Arc<QueryCache>,
    mutations: Arc<Mutex<HashSet<String>>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::InvalidRequest("API token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("estate-verify/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Network {
                endpoint: "client_init".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            queue_cache: Arc::new(QueryCache::new(config.dedupe_window)),
            config: Arc::new(config),
            mutations: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.config
            .endpoint(path)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }

    /// Drop every cached queue page so the next query hits the backend
    pub fn invalidate_queue(&self) {
        self.queue_cache.invalidate();
    }

    pub(crate) fn queue_cache(&self) -> &QueryCache {
        &self.queue_cache
    }

    /// Send a request and unwrap the response envelope
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<(T, Option<PaginationMeta>), ClientError> {
        debug!("→ {}", endpoint);

        let response = request.send().await.map_err(|e| ClientError::Network {
            endpoint: endpoint.to_string(),
            reason: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ClientError::Network {
            endpoint: endpoint.to_string(),
            reason: format!("failed to read response body: {}", e),
        })?;
        debug!("← {} {} ({} bytes)", endpoint, status, body.len());

        if !status.is_success() {
            return Err(classify_failure(endpoint, status, &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !envelope.success {
            warn!("{} reported failure: {}", endpoint, envelope.message);
            return Err(ClientError::Server {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                message: failure_message(&envelope.message, envelope.error.as_deref(), status),
            });
        }

        let data = envelope.data.ok_or_else(|| ClientError::Decode {
            endpoint: endpoint.to_string(),
            reason: "response envelope has no data".to_string(),
        })?;

        Ok((data, envelope.meta))
    }
}

fn classify_failure(endpoint: &str, status: StatusCode, body: &str) -> ClientError {
    let (message, error) = match serde_json::from_str::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) => (envelope.message, envelope.error),
        Err(_) => (String::new(), None),
    };
    let message = failure_message(&message, error.as_deref(), status);
    warn!("{} failed with {}: {}", endpoint, status, message);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND => ClientError::NotFound {
            endpoint: endpoint.to_string(),
            message,
        },
        _ => ClientError::Server {
            endpoint: endpoint.to_string(),
            status: Some(status.as_u16()),
            message,
        },
    }
}

fn failure_message(message: &str, error: Option<&str>, status: StatusCode) -> String {
    if !message.trim().is_empty() {
        return message.to_string();
    }
    match error {
        Some(e) if !e.trim().is_empty() => e.to_string(),
        _ => format!(
            "Request failed with status {}",
            status.canonical_reason().unwrap_or(status.as_str())
        ),
    }
}
