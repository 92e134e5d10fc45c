//! Trigger-event shapes and the compressed log-payload decoding.

use std::io::Read;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

/// The logs-stream trigger: a base64-encoded, gzip-compressed JSON
/// document under `awslogs.data`.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudwatchLogsEvent {
    pub awslogs: AwsLogs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsLogs {
    pub data: String,
}

impl AwsLogs {
    /// Decodes the carried payload into the owner/group/stream batch.
    pub fn decode(&self) -> Result<LogsBatch> {
        let compressed = STANDARD
            .decode(&self.data)
            .context("decoding awslogs data as base64")?;

        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut json = String::new();
        decoder
            .read_to_string(&mut json)
            .context("decompressing awslogs data")?;

        serde_json::from_str(&json).context("parsing cloudwatch logs payload")
    }
}

/// The decoded unit of delivery: all events share one account, log group,
/// and log stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsBatch {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub log_group: String,
    #[serde(default)]
    pub log_stream: String,
    #[serde(default)]
    pub log_events: Vec<LogEvent>,
}

/// One raw log record. The timestamp is milliseconds since the epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub timestamp: i64,
    pub message: String,
}

/// The staged-batch trigger: names an object of newline-delimited JSON
/// records in a storage bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct StagedObjectEvent {
    pub bucket: String,
    pub name: String,
}
