//! Explicit HTTP client for the dashboard API
//!
//! Every request carries the same default headers and sends cookies, so no
//! global request hooks are needed.

use crate::error::HttpError;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/api/health";

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"ok"` when the server answers
    pub status: String,
    /// Server version
    pub version: String,
    /// Server time
    pub time: DateTime<Utc>,
}

impl HealthStatus {
    /// Healthy status stamped with the current time
    #[must_use]
    pub fn ok(version: impl Into<String>) -> Self {
        Self {
            status: "ok".into(),
            version: version.into(),
            time: Utc::now(),
        }
    }

    /// Whether the server reported itself healthy
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Client bound to one API base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create client for `base` with [`DEFAULT_REQUEST_TIMEOUT`]
    ///
    /// # Errors
    /// Returns [`HttpError::InvalidUrl`] if `base` does not parse.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::with_timeout(base, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create client with a request timeout
    ///
    /// # Errors
    /// Returns [`HttpError`] if `base` does not parse or the client cannot
    /// be built.
    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self, HttpError> {
        let base = Url::parse(base)?;

        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    /// Base URL
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for `path`
    ///
    /// # Errors
    /// Returns [`HttpError::InvalidUrl`] if the join fails.
    pub fn url(&self, path: &str) -> Result<Url, HttpError> {
        Ok(self.base.join(path)?)
    }

    /// `GET path` and decode a JSON body
    ///
    /// # Errors
    /// Returns [`HttpError`] on transport errors, non-success status or a
    /// body that does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = self.url(path)?;
        tracing::debug!(url = %url, "GET");
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    /// Query the health endpoint
    ///
    /// # Errors
    /// See [`ApiClient::get_json`].
    pub async fn health(&self) -> Result<HealthStatus, HttpError> {
        self.get_json(HEALTH_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_against_base() {
        let client = ApiClient::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(client.url(HEALTH_PATH).unwrap().as_str(), "http://127.0.0.1:8080/api/health");
    }

    #[test]
    fn rejects_relative_base() {
        assert!(matches!(ApiClient::new("/api"), Err(HttpError::InvalidUrl(_))));
    }

    #[test]
    fn health_body_shape() {
        let health = HealthStatus::ok("1.2.3");
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "1.2.3");
        assert!(json["time"].is_string());
        let back: HealthStatus = serde_json::from_value(json).unwrap();
        assert!(back.is_ok());
    }
}
