//! Tests for the OTLP exporter encoding and error surface.

use std::io::Read;

use flate2::read::GzDecoder;
use otelship::exporter::{encode_gzip_json, ExportError, OtlpExporter};
use otelship::otlp::{KeyValue, LogsData, Resource, ResourceLogs};
use otelship::staged::build_logs_payload;

#[test]
fn test_encode_gzip_json_round_trips() {
    let payload = LogsData {
        resource_logs: vec![ResourceLogs {
            resource: Resource {
                attributes: vec![KeyValue::string("service.name", "svc")],
            },
            ..ResourceLogs::default()
        }],
    };

    let compressed = encode_gzip_json(&payload).unwrap();

    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut json = String::new();
    decoder.read_to_string(&mut json).unwrap();

    let decoded: LogsData = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, payload);
}

#[test]
fn test_encode_produces_gzip_magic() {
    let compressed = encode_gzip_json(&LogsData::default()).unwrap();
    assert!(compressed.len() > 2);
    assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
}

#[test]
fn test_status_error_display() {
    let err = ExportError::Status {
        status: 503,
        body: "overloaded".to_string(),
    };
    let rendered = err.to_string();
    assert!(rendered.contains("503"));
    assert!(rendered.contains("overloaded"));
}

#[tokio::test]
async fn test_export_to_unreachable_endpoint_fails() {
    let exporter = OtlpExporter::new("http://127.0.0.1:9", "token").unwrap();
    let payload = build_logs_payload("svc", Vec::new());

    let err = exporter.export_logs(&payload).await.unwrap_err();
    assert!(matches!(err, ExportError::Http(_)));
}

#[tokio::test]
async fn test_metrics_export_to_unreachable_endpoint_fails() {
    let exporter = OtlpExporter::new("http://127.0.0.1:9/", "token").unwrap();
    let err = exporter
        .export_metrics(&otelship::otlp::MetricsData::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Http(_)));
}
