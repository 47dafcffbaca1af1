//! HTTP routing oracle client.
//!
//! Talks to a JSON routing endpoint that answers "how long does it take to
//! get from A to B, arriving around this time?". Handles authentication,
//! bounded concurrency and status-code classification.

use std::sync::Arc;

use chrono::NaiveDateTime;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::domain::Stop;

use super::TransitOracle;
use super::error::OracleError;

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration for the HTTP oracle.
#[derive(Debug, Clone)]
pub struct HttpOracleConfig {
    /// Base URL of the routing service
    pub base_url: String,
    /// Optional API key, sent as `x-apikey`
    pub api_key: Option<String>,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl HttpOracleConfig {
    /// Create a new config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Response body of the transit endpoint.
#[derive(Debug, Deserialize)]
struct TransitResponse {
    /// Door-to-door duration in minutes; absent when there is no connection.
    minutes: Option<f64>,
}

/// Routing oracle backed by an HTTP service.
///
/// Uses a semaphore to limit in-flight requests and avoid rate limiting.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl HttpOracle {
    /// Create a new client with the given configuration.
    pub fn new(config: HttpOracleConfig) -> Result<Self, OracleError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| OracleError::Api {
                status: 0,
                message: "Invalid API key format".to_string(),
            })?;
            headers.insert("x-apikey", value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, from: &Stop, to: &Stop, at: NaiveDateTime) -> Result<f64, OracleError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| OracleError::Unavailable("semaphore closed".to_string()))?;

        let url = format!("{}/transit", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("from", from.id().as_str().to_string()),
                ("to", to.id().as_str().to_string()),
                ("arrive_by", at.format("%Y-%m-%dT%H:%M").to_string()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(OracleError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;
        let parsed: TransitResponse =
            serde_json::from_str(&body).map_err(|e| OracleError::Json {
                message: e.to_string(),
            })?;

        match parsed.minutes {
            Some(m) if m.is_finite() && m >= 0.0 => Ok(m),
            Some(m) => Err(OracleError::InvalidDuration(m)),
            None => Err(OracleError::NoConnection {
                from: from.id().clone(),
                to: to.id().clone(),
            }),
        }
    }
}

impl TransitOracle for HttpOracle {
    async fn query_transit(
        &self,
        from: &Stop,
        to: &Stop,
        at: NaiveDateTime,
    ) -> Result<f64, OracleError> {
        self.fetch(from, to, at).await
    }
}
