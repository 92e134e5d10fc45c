//! Staged-batch mode: forwards an object of newline-delimited JSON
//! records, attributing each record to a service and shipping
//! size-bounded sub-batches in parallel.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::exporter::OtlpExporter;
use crate::otlp::{
    any_value_from_json, KeyValue, LogRecord, LogsData, Resource, ResourceLogs, ScopeLogs,
};

/// Sub-batch cap per outbound request.
pub const MAX_BATCH_ENTRIES: usize = 1000;
/// Service attributed to records with neither a usable log name nor a
/// resource type.
pub const FALLBACK_SERVICE_NAME: &str = "gcp-service-unknown";
/// Per-record attribute naming the staged source object.
pub const FILE_SOURCE_ATTRIBUTE: &str = "gcs.file_source";
pub const TELEMETRY_SDK_NAME: &str = "otelship";

const STAGED_CLOUD_PROVIDER: &str = "gcp";

/// Outcome of one staged delivery.
#[derive(Debug, Default)]
pub struct StagedSummary {
    pub records: usize,
    pub exported_batches: usize,
    pub errors: Vec<String>,
}

impl StagedSummary {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reads newline-delimited JSON records and ships them grouped by
/// service name. Sub-batches flush at [`MAX_BATCH_ENTRIES`]; residuals
/// flush at end of input. The delivery succeeds only when every launched
/// export succeeds.
pub async fn forward_staged_object<R>(
    reader: R,
    object_name: &str,
    exporter: &OtlpExporter,
    cancel: &CancellationToken,
) -> Result<StagedSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut batches: HashMap<String, Vec<LogRecord>> = HashMap::new();
    let mut exports: FuturesUnordered<JoinHandle<Result<()>>> = FuturesUnordered::new();
    let mut summary = StagedSummary::default();

    while let Some(line) = lines.next_line().await? {
        if cancel.is_cancelled() {
            info!("cancellation observed, stopping staged batch processing");
            break;
        }

        let Ok(raw) = serde_json::from_str::<Value>(&line) else {
            debug!("skipping undecodable staged record");
            continue;
        };
        if !raw.is_object() {
            continue;
        }

        summary.records += 1;
        let service = service_name(&raw);
        let record = transform_record(&raw, object_name);

        let bucket = batches.entry(service.clone()).or_default();
        bucket.push(record);
        if bucket.len() >= MAX_BATCH_ENTRIES {
            let records = std::mem::take(bucket);
            spawn_export(&mut exports, exporter.clone(), service, records, cancel.clone());
        }
    }

    for (service, records) in batches {
        if !records.is_empty() {
            spawn_export(&mut exports, exporter.clone(), service, records, cancel.clone());
        }
    }

    while let Some(joined) = exports.next().await {
        match joined {
            Ok(Ok(())) => summary.exported_batches += 1,
            Ok(Err(err)) => summary.errors.push(err.to_string()),
            Err(err) => summary.errors.push(format!("export task failed: {err}")),
        }
    }

    Ok(summary)
}

fn spawn_export(
    exports: &mut FuturesUnordered<JoinHandle<Result<()>>>,
    exporter: OtlpExporter,
    service: String,
    records: Vec<LogRecord>,
    cancel: CancellationToken,
) {
    exports.push(tokio::spawn(async move {
        let payload = build_logs_payload(&service, records);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(anyhow::anyhow!("cancelled before staged export")),
            result = exporter.export_logs(&payload) => result.map_err(Into::into),
        }
    }));
}

/// Wraps a service's records in the staged-batch resource envelope.
pub fn build_logs_payload(service_name: &str, records: Vec<LogRecord>) -> LogsData {
    LogsData {
        resource_logs: vec![ResourceLogs {
            resource: Resource {
                attributes: vec![
                    KeyValue::string("service.name", service_name),
                    KeyValue::string("cloud.provider", STAGED_CLOUD_PROVIDER),
                    KeyValue::string("telemetry.sdk.name", TELEMETRY_SDK_NAME),
                ],
            },
            scope_logs: vec![ScopeLogs {
                log_records: records,
                ..ScopeLogs::default()
            }],
            schema_url: None,
        }],
    }
}

/// Shapes one raw record into an OTLP log record: RFC3339 timestamp chain
/// with a wall-clock fallback, severity mapping, the full JSON tree as a
/// structured body, and the source-object attribute.
pub fn transform_record(raw: &Value, object_name: &str) -> LogRecord {
    let nanos = extract_timestamp_nanos(raw)
        .unwrap_or_else(|| Utc::now().timestamp_nanos_opt().unwrap_or(0));

    let severity = raw
        .get("severity")
        .and_then(Value::as_str)
        .unwrap_or("INFO")
        .to_string();

    LogRecord {
        name: None,
        time_unix_nano: nanos.to_string(),
        severity_number: Some(map_severity(&severity)),
        severity_text: Some(severity),
        body: any_value_from_json(raw),
        attributes: vec![KeyValue::string(FILE_SOURCE_ATTRIBUTE, object_name)],
    }
}

/// Tries `timestamp`, `time`, then `receiveTimestamp` as RFC3339.
pub fn extract_timestamp_nanos(raw: &Value) -> Option<i64> {
    for key in ["timestamp", "time", "receiveTimestamp"] {
        let Some(value) = raw.get(key).and_then(Value::as_str) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            if let Some(nanos) = parsed.timestamp_nanos_opt() {
                return Some(nanos);
            }
        }
    }
    None
}

/// Service attribution: last `logName` segment unless it is `syslog` or
/// `activity`, then `resource.type`, then the unknown-service fallback.
pub fn service_name(raw: &Value) -> String {
    if let Some(log_name) = raw.get("logName").and_then(Value::as_str) {
        let last = log_name.rsplit('/').next().unwrap_or(log_name);
        if last != "syslog" && last != "activity" {
            return last.to_string();
        }
    }

    if let Some(resource_type) = raw
        .get("resource")
        .and_then(|resource| resource.get("type"))
        .and_then(Value::as_str)
    {
        return resource_type.to_string();
    }

    FALLBACK_SERVICE_NAME.to_string()
}

/// Severity text → OTLP severity number.
pub fn map_severity(severity: &str) -> i32 {
    match severity.to_uppercase().as_str() {
        "DEBUG" => 5,
        "INFO" | "NOTICE" => 9,
        "WARNING" => 13,
        "ERROR" => 17,
        "CRITICAL" | "ALERT" | "EMERGENCY" => 21,
        _ => 9,
    }
}
