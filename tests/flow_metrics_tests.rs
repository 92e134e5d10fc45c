//! Tests for the flow-log metrics builder and attribute sanitization.

use otelship::flow_metrics::{build_metrics, sanitize_attribute_value};
use otelship::flow_parser::{parse_custom, parse_default};
use otelship::flow_record::{DEFAULT_FORMAT, MAX_ATTRIBUTE_LENGTH};
use otelship::otlp::{attribute_string, AnyValue};

const VALID_DEFAULT_LINE: &str =
    "2 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT OK";

#[test]
fn test_metrics_envelope_shape() {
    let record = parse_default(VALID_DEFAULT_LINE).unwrap();
    let metrics = build_metrics(&record);

    assert_eq!(metrics.resource_metrics.len(), 1);
    let resource_metrics = &metrics.resource_metrics[0];
    assert_eq!(
        attribute_string(&resource_metrics.resource.attributes, "Name"),
        Some("VPC Flow Logs")
    );

    assert_eq!(resource_metrics.scope_metrics.len(), 1);
    let scope_metrics = &resource_metrics.scope_metrics[0];
    assert_eq!(scope_metrics.scope.name, "vpc_flow_logs");
    assert_eq!(scope_metrics.scope.version, "1.0.0");
    assert_eq!(attribute_string(&scope_metrics.scope.attributes, "identifier"), Some("nio"));
    assert_eq!(attribute_string(&scope_metrics.scope.attributes, "swi-reporter"), Some(""));

    assert_eq!(scope_metrics.metrics.len(), 2);
}

#[test]
fn test_bytes_and_packets_gauges() {
    let record = parse_default(VALID_DEFAULT_LINE).unwrap();
    let metrics = build_metrics(&record);
    let metrics = &metrics.resource_metrics[0].scope_metrics[0].metrics;

    let bytes = &metrics[0];
    assert_eq!(bytes.name, "AWS.VPC.Flows.Bytes");
    assert_eq!(bytes.unit, "Bytes");
    assert_eq!(bytes.gauge.data_points.len(), 1);
    assert_eq!(bytes.gauge.data_points[0].as_int, 4000);
    assert_eq!(bytes.gauge.data_points[0].time_unix_nano, "1620000000000000000");

    let packets = &metrics[1];
    assert_eq!(packets.name, "AWS.VPC.Flows.Packets");
    assert_eq!(packets.unit, "Count");
    assert_eq!(packets.gauge.data_points.len(), 1);
    assert_eq!(packets.gauge.data_points[0].as_int, 25);
    assert_eq!(packets.gauge.data_points[0].time_unix_nano, "1620000000000000000");
}

#[test]
fn test_data_point_attributes() {
    let record = parse_default(VALID_DEFAULT_LINE).unwrap();
    let metrics = build_metrics(&record);
    let attrs = &metrics.resource_metrics[0].scope_metrics[0].metrics[0]
        .gauge
        .data_points[0]
        .attributes;

    assert_eq!(attribute_string(attrs, "version"), Some("2"));
    assert_eq!(attribute_string(attrs, "account_id"), Some("123456789012"));
    assert_eq!(attribute_string(attrs, "interface_id"), Some("eni-0a"));
    assert_eq!(attribute_string(attrs, "src_addr"), Some("10.0.0.1"));
    assert_eq!(attribute_string(attrs, "dst_addr"), Some("10.0.0.2"));
    assert_eq!(attribute_string(attrs, "src_port"), Some("443"));
    assert_eq!(attribute_string(attrs, "dst_port"), Some("49152"));
    assert_eq!(attribute_string(attrs, "protocol"), Some("6"));
    assert_eq!(attribute_string(attrs, "protocolName"), Some("TCP"));
    assert_eq!(attribute_string(attrs, "action"), Some("ACCEPT"));
    assert_eq!(attribute_string(attrs, "log_status"), Some("OK"));

    // Optional fields absent from the default format add no attributes.
    assert_eq!(attribute_string(attrs, "vpc_id"), None);
    assert_eq!(attribute_string(attrs, "instance_id"), None);

    // Start and end ride along as integer attributes.
    let start = attrs.iter().find(|kv| kv.key == "start").unwrap();
    assert_eq!(start.value, AnyValue::Int(1_620_000_000));
    let end = attrs.iter().find(|kv| kv.key == "end").unwrap();
    assert_eq!(end.value, AnyValue::Int(1_620_000_060));
}

#[test]
fn test_both_data_points_carry_identical_attributes() {
    let record = parse_default(VALID_DEFAULT_LINE).unwrap();
    let metrics = build_metrics(&record);
    let metrics = &metrics.resource_metrics[0].scope_metrics[0].metrics;

    assert_eq!(
        metrics[0].gauge.data_points[0].attributes,
        metrics[1].gauge.data_points[0].attributes
    );
}

#[test]
fn test_extended_fields_become_attributes() {
    let format = format!("{DEFAULT_FORMAT} ${{vpc-id}} ${{flow-direction}}");
    let line = format!("{VALID_DEFAULT_LINE} vpc-1234 egress");
    let record = parse_custom(&line, &format).unwrap();

    let metrics = build_metrics(&record);
    let attrs = &metrics.resource_metrics[0].scope_metrics[0].metrics[0]
        .gauge
        .data_points[0]
        .attributes;
    assert_eq!(attribute_string(attrs, "vpc_id"), Some("vpc-1234"));
    assert_eq!(attribute_string(attrs, "flow_direction"), Some("egress"));
}

#[test]
fn test_sanitize_drops_control_characters() {
    assert_eq!(sanitize_attribute_value("with\ncontrol\tchars", 255), "withcontrolchars");
    assert_eq!(sanitize_attribute_value("clean-value", 255), "clean-value");
    assert_eq!(sanitize_attribute_value("", 255), "");
}

#[test]
fn test_sanitize_drops_non_printable_code_points() {
    // Zero-width space and bidi marks are format characters, not control
    // characters, and must still drop.
    assert_eq!(sanitize_attribute_value("a\u{200B}b\u{200E}c", 255), "abc");
    // Non-space separators drop; the ASCII space stays.
    assert_eq!(sanitize_attribute_value("a\u{00A0}b c", 255), "ab c");
    assert_eq!(sanitize_attribute_value("a\u{2028}b\u{FEFF}c", 255), "abc");
}

#[test]
fn test_sanitize_truncates_to_max_length() {
    let long = "a".repeat(300);
    let sanitized = sanitize_attribute_value(&long, MAX_ATTRIBUTE_LENGTH);
    assert_eq!(sanitized.chars().count(), MAX_ATTRIBUTE_LENGTH);
}

#[test]
fn test_sanitize_is_idempotent() {
    let noisy = format!("{}\u{7}{}", "x".repeat(260), "tail\r\n");
    let once = sanitize_attribute_value(&noisy, MAX_ATTRIBUTE_LENGTH);
    let twice = sanitize_attribute_value(&once, MAX_ATTRIBUTE_LENGTH);
    assert_eq!(once, twice);
    assert!(once.chars().count() <= MAX_ATTRIBUTE_LENGTH);
    assert!(once.chars().all(|c| !c.is_control()));
}
