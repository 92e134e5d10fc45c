//! Shapes one metrics envelope per validated flow-log record.

use crate::flow_record::{
    FlowLogRecord, ACCOUNT_ID_KEY, ACTION_KEY, AZ_ID_KEY, BYTES_METRIC_NAME, BYTES_UNIT,
    COUNT_UNIT, DST_ADDR_KEY, DST_PORT_KEY, ECS_CLUSTER_ARN_KEY, ECS_CLUSTER_NAME_KEY,
    ECS_CONTAINER_ID_KEY, ECS_CONTAINER_INSTANCE_ARN_KEY, ECS_CONTAINER_INSTANCE_ID_KEY,
    ECS_SECOND_CONTAINER_ID_KEY, ECS_SERVICE_NAME_KEY, ECS_TASK_ARN_KEY,
    ECS_TASK_DEFINITION_ARN_KEY, ECS_TASK_ID_KEY, ENCRYPTION_STATUS_KEY, END_KEY,
    FLOW_DIRECTION_KEY, INSTANCE_ID_KEY, INTERFACE_ID_KEY, LOG_STATUS_KEY, MAX_ATTRIBUTE_LENGTH,
    PACKETS_METRIC_NAME, PKT_DST_ADDR_KEY, PKT_DST_AWS_SERVICE_KEY, PKT_SRC_ADDR_KEY,
    PKT_SRC_AWS_SERVICE_KEY, PROTOCOL_KEY, PROTOCOL_NAME_KEY, REGION_KEY, REJECT_REASON_KEY,
    RESOURCE_ID_KEY, RESOURCE_NAME, SRC_ADDR_KEY, SRC_PORT_KEY, START_KEY, SUBLOCATION_ID_KEY,
    SUBLOCATION_TYPE_KEY, SUBNET_ID_KEY, TCP_FLAGS_KEY, TRAFFIC_PATH_KEY, TYPE_KEY, VERSION_KEY,
    VPC_ID_KEY,
};
use crate::otlp::{
    Gauge, KeyValue, Metric, MetricsData, NumberDataPoint, Resource, ResourceMetrics,
    ScopeMetrics, SCHEMA_URL,
};
use crate::protocol::convert_protocol;
use crate::scope::instrumentation_scope;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Builds the two-gauge metrics envelope (bytes and packets) for one
/// record. Both data points are stamped with the flow window start and
/// carry the same sanitized attribute set.
pub fn build_metrics(record: &FlowLogRecord) -> MetricsData {
    let timestamp = record.start.saturating_mul(NANOS_PER_SECOND).to_string();
    let attributes = data_point_attributes(record);

    let byte_metric = Metric {
        name: BYTES_METRIC_NAME.to_string(),
        description: "Bytes transferred in VPC flow logs".to_string(),
        unit: BYTES_UNIT.to_string(),
        gauge: Gauge {
            data_points: vec![NumberDataPoint {
                time_unix_nano: timestamp.clone(),
                as_int: record.bytes,
                attributes: attributes.clone(),
            }],
        },
    };

    let packet_metric = Metric {
        name: PACKETS_METRIC_NAME.to_string(),
        description: "Packets transferred in VPC flow logs".to_string(),
        unit: COUNT_UNIT.to_string(),
        gauge: Gauge {
            data_points: vec![NumberDataPoint {
                time_unix_nano: timestamp,
                as_int: record.packets,
                attributes,
            }],
        },
    };

    MetricsData {
        resource_metrics: vec![ResourceMetrics {
            resource: Resource {
                attributes: vec![KeyValue::string("Name", RESOURCE_NAME)],
            },
            scope_metrics: vec![ScopeMetrics {
                scope: instrumentation_scope(),
                metrics: vec![byte_metric, packet_metric],
                schema_url: Some(SCHEMA_URL.to_string()),
            }],
            schema_url: Some(SCHEMA_URL.to_string()),
        }],
    }
}

/// String attributes are added only when non-empty so custom formats that
/// omit optional fields don't produce blank attributes. The start and end
/// integers are always present.
fn data_point_attributes(record: &FlowLogRecord) -> Vec<KeyValue> {
    let mut attributes = Vec::new();

    let mut add = |key: &str, value: &str| {
        let sanitized = sanitize_attribute_value(value, MAX_ATTRIBUTE_LENGTH);
        if !sanitized.is_empty() {
            attributes.push(KeyValue::string(key, sanitized));
        }
    };

    add(VERSION_KEY, &record.version);
    add(ACCOUNT_ID_KEY, &record.account_id);
    add(INTERFACE_ID_KEY, &record.interface_id);
    add(SRC_ADDR_KEY, &record.src_addr);
    add(DST_ADDR_KEY, &record.dst_addr);
    add(SRC_PORT_KEY, &record.src_port);
    add(DST_PORT_KEY, &record.dst_port);
    add(PROTOCOL_KEY, &record.protocol);
    add(PROTOCOL_NAME_KEY, convert_protocol(&record.protocol));
    add(ACTION_KEY, &record.action);
    add(LOG_STATUS_KEY, &record.log_status);
    add(VPC_ID_KEY, &record.vpc_id);
    add(SUBNET_ID_KEY, &record.subnet_id);
    add(INSTANCE_ID_KEY, &record.instance_id);
    add(TCP_FLAGS_KEY, &record.tcp_flags);
    add(TYPE_KEY, &record.traffic_type);
    add(PKT_SRC_ADDR_KEY, &record.pkt_src_addr);
    add(PKT_DST_ADDR_KEY, &record.pkt_dst_addr);
    add(REGION_KEY, &record.region);
    add(AZ_ID_KEY, &record.az_id);
    add(SUBLOCATION_TYPE_KEY, &record.sublocation_type);
    add(SUBLOCATION_ID_KEY, &record.sublocation_id);
    add(PKT_SRC_AWS_SERVICE_KEY, &record.pkt_src_aws_service);
    add(PKT_DST_AWS_SERVICE_KEY, &record.pkt_dst_aws_service);
    add(FLOW_DIRECTION_KEY, &record.flow_direction);
    add(TRAFFIC_PATH_KEY, &record.traffic_path);
    add(ECS_CLUSTER_NAME_KEY, &record.ecs_cluster_name);
    add(ECS_CLUSTER_ARN_KEY, &record.ecs_cluster_arn);
    add(ECS_CONTAINER_INSTANCE_ID_KEY, &record.ecs_container_instance_id);
    add(ECS_CONTAINER_INSTANCE_ARN_KEY, &record.ecs_container_instance_arn);
    add(ECS_SERVICE_NAME_KEY, &record.ecs_service_name);
    add(ECS_TASK_DEFINITION_ARN_KEY, &record.ecs_task_definition_arn);
    add(ECS_TASK_ID_KEY, &record.ecs_task_id);
    add(ECS_TASK_ARN_KEY, &record.ecs_task_arn);
    add(ECS_CONTAINER_ID_KEY, &record.ecs_container_id);
    add(ECS_SECOND_CONTAINER_ID_KEY, &record.ecs_second_container_id);
    add(REJECT_REASON_KEY, &record.reject_reason);
    add(RESOURCE_ID_KEY, &record.resource_id);
    add(ENCRYPTION_STATUS_KEY, &record.encryption_status);

    attributes.push(KeyValue::int(START_KEY, record.start));
    attributes.push(KeyValue::int(END_KEY, record.end));

    attributes
}

/// Drops non-printable characters and truncates to `max_length` code
/// points. Idempotent.
pub fn sanitize_attribute_value(value: &str, max_length: usize) -> String {
    value.chars().filter(|c| is_printable(*c)).take(max_length).collect()
}

/// Printable means graphic characters plus the ASCII space: control
/// characters, non-space separators (no-break space included), and
/// format characters (zero-width space, bidi marks, joiners) all drop.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}
