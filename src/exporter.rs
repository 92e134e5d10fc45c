//! Outbound OTLP/HTTP exporter for logs and metrics.

use std::io::Write;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::otlp::{LogsData, MetricsData};

const LOGS_PATH: &str = "/v1/logs";
const METRICS_PATH: &str = "/v1/metrics";

/// Request timeout and idle-connection TTL for the shared pooled client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// A failed export attempt.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode request: {0}")]
    Encode(#[from] std::io::Error),

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Stateless exporter over a shared pooled HTTP client. Payloads go out
/// as gzip-compressed OTLP JSON with bearer authentication.
#[derive(Debug, Clone)]
pub struct OtlpExporter {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl OtlpExporter {
    pub fn new(endpoint: &str, api_token: &str) -> Result<Self, ExportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Ships one logs payload.
    pub async fn export_logs(&self, payload: &LogsData) -> Result<(), ExportError> {
        self.post(LOGS_PATH, payload).await
    }

    /// Ships one metrics payload.
    pub async fn export_metrics(&self, payload: &MetricsData) -> Result<(), ExportError> {
        self.post(METRICS_PATH, payload).await
    }

    async fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<(), ExportError> {
        let body = encode_gzip_json(payload)?;
        let url = format!("{}{}", self.endpoint, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .header("Content-Encoding", "gzip")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %url, status = status.as_u16(), "export succeeded");
        Ok(())
    }
}

/// Serializes a payload to JSON and gzip-compresses it.
pub fn encode_gzip_json<T: Serialize>(payload: &T) -> Result<Vec<u8>, ExportError> {
    let json = serde_json::to_vec(payload)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}
