//! Flow-log line parsers: fixed default layout and format-driven custom.

use tracing::{debug, info, warn};

use crate::errors::{FlowLogError, ParseError, ValidationError};
use crate::flow_record::{
    aws_field_name, FieldPresenceMap, FlowLogRecord, DEFAULT_FIELD_COUNT, DEFAULT_VERSION,
    SUPPORTED_VERSION, VERSION_KEY,
};
use crate::flow_validate::validate_record;

/// Parses a line in the provider's default 14-field layout and validates
/// the result against the default-format field contract.
pub fn parse_default(message: &str) -> Result<FlowLogRecord, FlowLogError> {
    let fields: Vec<&str> = message.split_whitespace().collect();

    if fields.len() != DEFAULT_FIELD_COUNT {
        debug!(
            expected = DEFAULT_FIELD_COUNT,
            actual = fields.len(),
            message,
            "malformed flow log line"
        );
        return Err(ParseError {
            message: "Invalid field count in VPC flow log".to_string(),
            expected: DEFAULT_FIELD_COUNT,
            actual: fields.len(),
        }
        .into());
    }

    let record = FlowLogRecord {
        version: fields[0].to_string(),
        account_id: fields[1].to_string(),
        interface_id: fields[2].to_string(),
        src_addr: fields[3].to_string(),
        dst_addr: fields[4].to_string(),
        src_port: fields[5].to_string(),
        dst_port: fields[6].to_string(),
        protocol: fields[7].to_string(),
        packets: parse_i64(fields[8]),
        bytes: parse_i64(fields[9]),
        start: parse_i64(fields[10]),
        end: parse_i64(fields[11]),
        action: fields[12].to_string(),
        log_status: fields[13].to_string(),
        ..FlowLogRecord::default()
    };

    check_version(&record)?;
    validate_record(&record, &FieldPresenceMap::default())?;

    Ok(record)
}

/// Parses a line according to a custom `${field} ${field} …` format
/// string, then validates against the fields that format declares.
pub fn parse_custom(message: &str, format: &str) -> Result<FlowLogRecord, FlowLogError> {
    let format_fields: Vec<&str> = format.split_whitespace().collect();
    let log_fields: Vec<&str> = message.split_whitespace().collect();

    if format_fields.len() != log_fields.len() {
        return Err(ParseError {
            message: format!(
                "field count mismatch: format has {} fields, line has {}",
                format_fields.len(),
                log_fields.len()
            ),
            expected: format_fields.len(),
            actual: log_fields.len(),
        }
        .into());
    }

    let mut record = FlowLogRecord::default();
    for (raw_field, value) in format_fields.iter().zip(log_fields.iter().copied()) {
        let name = raw_field.trim_start_matches("${").trim_end_matches('}');
        assign_field(&mut record, name, value);
    }

    let presence = FieldPresenceMap::from_format(format);

    check_version(&record)?;
    validate_record(&record, &presence)?;

    Ok(record)
}

/// Minimum-version gate shared by both parsers. Versions newer than the
/// highest tested one pass with an informational log.
fn check_version(record: &FlowLogRecord) -> Result<(), ValidationError> {
    let version = parse_i64(&record.version);
    let min_version = parse_i64(DEFAULT_VERSION);
    if version < min_version {
        return Err(ValidationError {
            field: aws_field_name(VERSION_KEY),
            expected: None,
            actual: record.version.clone(),
            message: format!(
                "VPC Flow Log version too old (minimum: {}, got {})",
                DEFAULT_VERSION, record.version
            ),
        });
    }

    if version > parse_i64(SUPPORTED_VERSION) {
        info!(
            version = %record.version,
            tested = SUPPORTED_VERSION,
            "processing flow log version newer than tested; new fields may not be captured"
        );
    }

    Ok(())
}

/// Positional assignment by the provider's field name. Unknown names are
/// skipped so newer formats keep parsing.
fn assign_field(record: &mut FlowLogRecord, name: &str, value: &str) {
    match name {
        "version" => record.version = value.to_string(),
        "account-id" => record.account_id = value.to_string(),
        "interface-id" => record.interface_id = value.to_string(),
        "srcaddr" => record.src_addr = value.to_string(),
        "dstaddr" => record.dst_addr = value.to_string(),
        "srcport" => record.src_port = value.to_string(),
        "dstport" => record.dst_port = value.to_string(),
        "protocol" => record.protocol = value.to_string(),
        "packets" => record.packets = parse_i64(value),
        "bytes" => record.bytes = parse_i64(value),
        "start" => record.start = parse_i64(value),
        "end" => record.end = parse_i64(value),
        "action" => record.action = value.to_string(),
        "log-status" => record.log_status = value.to_string(),
        "vpc-id" => record.vpc_id = value.to_string(),
        "subnet-id" => record.subnet_id = value.to_string(),
        "instance-id" => record.instance_id = value.to_string(),
        "tcp-flags" => record.tcp_flags = value.to_string(),
        "type" => record.traffic_type = value.to_string(),
        "pkt-srcaddr" => record.pkt_src_addr = value.to_string(),
        "pkt-dstaddr" => record.pkt_dst_addr = value.to_string(),
        "region" => record.region = value.to_string(),
        "az-id" => record.az_id = value.to_string(),
        "sublocation-type" => record.sublocation_type = value.to_string(),
        "sublocation-id" => record.sublocation_id = value.to_string(),
        "pkt-src-aws-service" => record.pkt_src_aws_service = value.to_string(),
        "pkt-dst-aws-service" => record.pkt_dst_aws_service = value.to_string(),
        "flow-direction" => record.flow_direction = value.to_string(),
        "traffic-path" => record.traffic_path = value.to_string(),
        "ecs-cluster-name" => record.ecs_cluster_name = value.to_string(),
        "ecs-cluster-arn" => record.ecs_cluster_arn = value.to_string(),
        "ecs-container-instance-id" => record.ecs_container_instance_id = value.to_string(),
        "ecs-container-instance-arn" => record.ecs_container_instance_arn = value.to_string(),
        "ecs-service-name" => record.ecs_service_name = value.to_string(),
        "ecs-task-definition-arn" => record.ecs_task_definition_arn = value.to_string(),
        "ecs-task-id" => record.ecs_task_id = value.to_string(),
        "ecs-task-arn" => record.ecs_task_arn = value.to_string(),
        "ecs-container-id" => record.ecs_container_id = value.to_string(),
        "ecs-second-container-id" => record.ecs_second_container_id = value.to_string(),
        "reject-reason" => record.reject_reason = value.to_string(),
        "resource-id" => record.resource_id = value.to_string(),
        "encryption-status" => record.encryption_status = value.to_string(),
        other => debug!(field = other, "skipping unknown flow log field"),
    }
}

/// Integer fields default to 0 when unparseable.
pub fn parse_i64(value: &str) -> i64 {
    match value.parse::<i64>() {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(value, %err, "error parsing integer field");
            0
        }
    }
}
