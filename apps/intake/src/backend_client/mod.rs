/// Backend client for the CV order database.
///
/// The backend exposes two JSON endpoints: a health check and the CV
/// submission. Neither call is retried; the transport timeout is the only
/// deadline.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::cv::SubmissionPayload;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned an invalid response (status {status})")]
    InvalidResponse { status: u16 },

    #[error("Backend did not respond within {secs}s")]
    Timeout { secs: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The two calls the wizard makes against the order backend.
#[async_trait]
pub trait CvBackend: Send + Sync {
    /// Returns the backend's self-reported success flag.
    async fn health(&self) -> Result<bool, BackendError>;

    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, BackendError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    health_url: String,
    submit_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, health_path: &str, submit_path: &str, timeout: Duration) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            health_url: format!("{base}{health_path}"),
            submit_url: format!("{base}{submit_path}"),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.backend_url,
            &config.backend_health_path,
            &config.backend_submit_path,
            Duration::from_secs(config.backend_timeout_secs),
        )
    }
}

#[async_trait]
impl CvBackend for HttpBackend {
    async fn health(&self) -> Result<bool, BackendError> {
        let response = self.client.get(&self.health_url).send().await?;
        let health: HealthResponse = read_json(response).await?;
        debug!("Backend health check: success={}", health.success);
        Ok(health.success)
    }

    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, BackendError> {
        let response = self
            .client
            .post(&self.submit_url)
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await?;
        read_json(response).await
    }
}

/// Decodes a JSON body regardless of status code; the backend reports
/// failures in the body's `success` flag.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        warn!("Backend returned non-JSON body (status {status}): {e}");
        BackendError::InvalidResponse {
            status: status.as_u16(),
        }
    })
}
