//! Tests for the default and custom flow-log parsers.

use otelship::errors::FlowLogError;
use otelship::flow_parser::{parse_custom, parse_default, parse_i64};
use otelship::flow_record::DEFAULT_FORMAT;

const VALID_DEFAULT_LINE: &str =
    "2 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT OK";

#[test]
fn test_parse_default_line() {
    let record = parse_default(VALID_DEFAULT_LINE).unwrap();
    assert_eq!(record.version, "2");
    assert_eq!(record.account_id, "123456789012");
    assert_eq!(record.interface_id, "eni-0a");
    assert_eq!(record.src_addr, "10.0.0.1");
    assert_eq!(record.dst_addr, "10.0.0.2");
    assert_eq!(record.src_port, "443");
    assert_eq!(record.dst_port, "49152");
    assert_eq!(record.protocol, "6");
    assert_eq!(record.packets, 25);
    assert_eq!(record.bytes, 4000);
    assert_eq!(record.start, 1_620_000_000);
    assert_eq!(record.end, 1_620_000_060);
    assert_eq!(record.action, "ACCEPT");
    assert_eq!(record.log_status, "OK");
}

#[test]
fn test_parse_default_round_trip() {
    let record = parse_default(VALID_DEFAULT_LINE).unwrap();
    let rendered = format!(
        "{} {} {} {} {} {} {} {} {} {} {} {} {} {}",
        record.version,
        record.account_id,
        record.interface_id,
        record.src_addr,
        record.dst_addr,
        record.src_port,
        record.dst_port,
        record.protocol,
        record.packets,
        record.bytes,
        record.start,
        record.end,
        record.action,
        record.log_status,
    );
    assert_eq!(rendered, VALID_DEFAULT_LINE);
    assert_eq!(parse_default(&rendered).unwrap(), record);
}

#[test]
fn test_parse_default_rejects_wrong_field_count() {
    let line = "2 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT";
    let err = parse_default(line).unwrap_err();
    let FlowLogError::Parse(parse_err) = err else {
        panic!("expected ParseError, got {err:?}");
    };
    assert_eq!(parse_err.expected, 14);
    assert_eq!(parse_err.actual, 13);
    assert!(parse_err.message.contains("Invalid field count"));
}

#[test]
fn test_parse_default_rejects_empty_line() {
    assert!(matches!(parse_default(""), Err(FlowLogError::Parse(_))));
}

#[test]
fn test_parse_default_rejects_old_version() {
    let line =
        "1 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT OK";
    let err = parse_default(line).unwrap_err();
    let FlowLogError::Validation(validation) = err else {
        panic!("expected ValidationError, got {err:?}");
    };
    assert_eq!(validation.field, "version");
    assert!(validation.message.contains("version too old"));
}

#[test]
fn test_parse_default_accepts_newer_versions() {
    let line =
        "11 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT OK";
    assert!(parse_default(line).is_ok());
}

#[test]
fn test_parse_default_skipdata_line() {
    let line = "2 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 0 0 1620000000 1620000060 ACCEPT SKIPDATA";
    let record = parse_default(line).unwrap();
    assert_eq!(record.log_status, "SKIPDATA");
}

#[test]
fn test_custom_format_matching_default_order() {
    let record = parse_custom(VALID_DEFAULT_LINE, DEFAULT_FORMAT).unwrap();
    assert_eq!(record, parse_default(VALID_DEFAULT_LINE).unwrap());
}

#[test]
fn test_custom_format_reordered_fields() {
    let format = "${account-id} ${version} ${interface-id} ${srcaddr} ${dstaddr} ${srcport} ${dstport} ${protocol} ${packets} ${bytes} ${start} ${end} ${action} ${log-status}";
    let line =
        "123456789012 2 eni-0a 10.0.0.1 10.0.0.2 443 49152 17 5 320 1620000000 1620000060 REJECT NODATA";

    let record = parse_custom(line, format).unwrap();
    assert_eq!(record.version, "2");
    assert_eq!(record.account_id, "123456789012");
    assert_eq!(record.protocol, "17");
    assert_eq!(record.action, "REJECT");
    assert_eq!(record.log_status, "NODATA");
}

#[test]
fn test_custom_format_with_extended_fields() {
    let format = format!("{DEFAULT_FORMAT} ${{vpc-id}} ${{subnet-id}} ${{instance-id}} ${{flow-direction}}");
    let line = format!("{VALID_DEFAULT_LINE} vpc-1234 subnet-5678 i-abc ingress");

    let record = parse_custom(&line, &format).unwrap();
    assert_eq!(record.vpc_id, "vpc-1234");
    assert_eq!(record.subnet_id, "subnet-5678");
    assert_eq!(record.instance_id, "i-abc");
    assert_eq!(record.flow_direction, "ingress");
}

#[test]
fn test_custom_format_skips_unknown_fields() {
    let format = format!("{DEFAULT_FORMAT} ${{future-field}}");
    let line = format!("{VALID_DEFAULT_LINE} whatever");

    let record = parse_custom(&line, &format).unwrap();
    assert_eq!(record, parse_default(VALID_DEFAULT_LINE).unwrap());
}

#[test]
fn test_custom_format_field_count_mismatch() {
    let err = parse_custom("2 123456789012", DEFAULT_FORMAT).unwrap_err();
    let FlowLogError::Parse(parse_err) = err else {
        panic!("expected ParseError, got {err:?}");
    };
    assert_eq!(parse_err.expected, 14);
    assert_eq!(parse_err.actual, 2);
    assert!(parse_err.message.contains("field count mismatch"));
}

#[test]
fn test_custom_format_missing_account_id_fails_validation() {
    let format = "${version} ${interface-id} ${srcaddr} ${dstaddr} ${srcport} ${dstport} ${protocol} ${packets} ${bytes} ${start} ${end} ${action} ${log-status}";
    let line = "2 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT OK";

    let err = parse_custom(line, format).unwrap_err();
    let FlowLogError::Validation(validation) = err else {
        panic!("expected ValidationError, got {err:?}");
    };
    assert_eq!(validation.field, "account-id");
    assert!(validation.message.contains("Missing required field"));
}

#[test]
fn test_custom_format_rejects_old_version() {
    let line =
        "1 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 25 4000 1620000000 1620000060 ACCEPT OK";
    let err = parse_custom(line, DEFAULT_FORMAT).unwrap_err();
    assert!(matches!(err, FlowLogError::Validation(v) if v.field == "version"));
}

#[test]
fn test_integer_fields_default_to_zero() {
    let line =
        "2 123456789012 eni-0a 10.0.0.1 10.0.0.2 443 49152 6 garbage 4000 1620000000 1620000060 ACCEPT OK";
    let record = parse_default(line).unwrap();
    assert_eq!(record.packets, 0);
    assert_eq!(record.bytes, 4000);
}

#[test]
fn test_parse_i64() {
    assert_eq!(parse_i64("42"), 42);
    assert_eq!(parse_i64("-7"), -7);
    assert_eq!(parse_i64(""), 0);
    assert_eq!(parse_i64("not-a-number"), 0);
    assert_eq!(parse_i64("3.5"), 0);
}
