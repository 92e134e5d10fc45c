//! VPC flow-log record shape, field keys, and format presence tracking.

use std::collections::HashSet;

// Flow-log configuration.
pub const DEFAULT_FIELD_COUNT: usize = 14;
pub const SUPPORTED_VERSION: &str = "10";
pub const DEFAULT_VERSION: &str = "2";
/// The provider's default format string as returned by the DescribeFlowLogs API.
pub const DEFAULT_FORMAT: &str = "${version} ${account-id} ${interface-id} ${srcaddr} ${dstaddr} ${srcport} ${dstport} ${protocol} ${packets} ${bytes} ${start} ${end} ${action} ${log-status}";

// Telemetry names and units.
pub const BYTES_METRIC_NAME: &str = "AWS.VPC.Flows.Bytes";
pub const PACKETS_METRIC_NAME: &str = "AWS.VPC.Flows.Packets";
pub const BYTES_UNIT: &str = "Bytes";
pub const COUNT_UNIT: &str = "Count";
pub const RESOURCE_NAME: &str = "VPC Flow Logs";

// Internal field keys. These double as attribute keys on outbound data
// points; `aws_field_name` maps them back to the provider's spelling.
pub const VERSION_KEY: &str = "version";
pub const ACCOUNT_ID_KEY: &str = "account_id";
pub const INTERFACE_ID_KEY: &str = "interface_id";
pub const SRC_ADDR_KEY: &str = "src_addr";
pub const DST_ADDR_KEY: &str = "dst_addr";
pub const SRC_PORT_KEY: &str = "src_port";
pub const DST_PORT_KEY: &str = "dst_port";
pub const PROTOCOL_KEY: &str = "protocol";
pub const PROTOCOL_NAME_KEY: &str = "protocolName";
pub const PACKETS_KEY: &str = "packets";
pub const BYTES_KEY: &str = "bytes";
pub const START_KEY: &str = "start";
pub const END_KEY: &str = "end";
pub const ACTION_KEY: &str = "action";
pub const LOG_STATUS_KEY: &str = "log_status";
pub const VPC_ID_KEY: &str = "vpc_id";
pub const SUBNET_ID_KEY: &str = "subnet_id";
pub const INSTANCE_ID_KEY: &str = "instance_id";
pub const TCP_FLAGS_KEY: &str = "tcp_flags";
pub const TYPE_KEY: &str = "type";
pub const PKT_SRC_ADDR_KEY: &str = "pkt_srcaddr";
pub const PKT_DST_ADDR_KEY: &str = "pkt_dstaddr";
pub const REGION_KEY: &str = "region";
pub const AZ_ID_KEY: &str = "az_id";
pub const SUBLOCATION_TYPE_KEY: &str = "sublocation_type";
pub const SUBLOCATION_ID_KEY: &str = "sublocation_id";
pub const PKT_SRC_AWS_SERVICE_KEY: &str = "pkt_src_aws_service";
pub const PKT_DST_AWS_SERVICE_KEY: &str = "pkt_dst_aws_service";
pub const FLOW_DIRECTION_KEY: &str = "flow_direction";
pub const TRAFFIC_PATH_KEY: &str = "traffic_path";
pub const ECS_CLUSTER_NAME_KEY: &str = "ecs_cluster_name";
pub const ECS_CLUSTER_ARN_KEY: &str = "ecs_cluster_arn";
pub const ECS_CONTAINER_INSTANCE_ID_KEY: &str = "ecs_container_instance_id";
pub const ECS_CONTAINER_INSTANCE_ARN_KEY: &str = "ecs_container_instance_arn";
pub const ECS_SERVICE_NAME_KEY: &str = "ecs_service_name";
pub const ECS_TASK_DEFINITION_ARN_KEY: &str = "ecs_task_definition_arn";
pub const ECS_TASK_ID_KEY: &str = "ecs_task_id";
pub const ECS_TASK_ARN_KEY: &str = "ecs_task_arn";
pub const ECS_CONTAINER_ID_KEY: &str = "ecs_container_id";
pub const ECS_SECOND_CONTAINER_ID_KEY: &str = "ecs_second_container_id";
pub const REJECT_REASON_KEY: &str = "reject_reason";
pub const RESOURCE_ID_KEY: &str = "resource_id";
pub const ENCRYPTION_STATUS_KEY: &str = "encryption_status";

/// Maximum length of a sanitized attribute value.
pub const MAX_ATTRIBUTE_LENGTH: usize = 255;

/// Fields of the version-2 default format. Custom formats must include
/// every one of these for the record to be forwarded.
pub const V2_DEFAULT_FIELD_NAMES: [&str; 14] = [
    "version",
    "account-id",
    "interface-id",
    "srcaddr",
    "dstaddr",
    "srcport",
    "dstport",
    "protocol",
    "packets",
    "bytes",
    "start",
    "end",
    "action",
    "log-status",
];

/// Converts an internal field key to the provider's field name. A small
/// whitelist covers the names that don't follow the underscore-to-dash
/// convention; `protocolName` is a computed field, not a provider field.
pub fn aws_field_name(key: &str) -> String {
    match key {
        ACCOUNT_ID_KEY => "account-id".to_string(),
        INTERFACE_ID_KEY => "interface-id".to_string(),
        SRC_ADDR_KEY => "srcaddr".to_string(),
        DST_ADDR_KEY => "dstaddr".to_string(),
        SRC_PORT_KEY => "srcport".to_string(),
        DST_PORT_KEY => "dstport".to_string(),
        LOG_STATUS_KEY => "log-status".to_string(),
        PROTOCOL_NAME_KEY => "protocolName".to_string(),
        _ => key.replace('_', "-"),
    }
}

/// One parsed flow-log record. String fields keep the provider's textual
/// form; integer fields default to 0 when missing or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowLogRecord {
    pub version: String,
    pub account_id: String,
    pub interface_id: String,
    pub src_addr: String,
    pub dst_addr: String,
    pub src_port: String,
    pub dst_port: String,
    pub protocol: String,
    pub packets: i64,
    pub bytes: i64,
    pub start: i64,
    pub end: i64,
    pub action: String,
    pub log_status: String,
    // Optional fields introduced by versions 3 and later.
    pub vpc_id: String,
    pub subnet_id: String,
    pub instance_id: String,
    pub tcp_flags: String,
    pub traffic_type: String,
    pub pkt_src_addr: String,
    pub pkt_dst_addr: String,
    pub region: String,
    pub az_id: String,
    pub sublocation_type: String,
    pub sublocation_id: String,
    pub pkt_src_aws_service: String,
    pub pkt_dst_aws_service: String,
    pub flow_direction: String,
    pub traffic_path: String,
    pub ecs_cluster_name: String,
    pub ecs_cluster_arn: String,
    pub ecs_container_instance_id: String,
    pub ecs_container_instance_arn: String,
    pub ecs_service_name: String,
    pub ecs_task_definition_arn: String,
    pub ecs_task_id: String,
    pub ecs_task_arn: String,
    pub ecs_container_id: String,
    pub ecs_second_container_id: String,
    pub reject_reason: String,
    pub resource_id: String,
    pub encryption_status: String,
}

/// Which provider field names appear in a format string. `None` inside
/// means the default format, where every V2 default field is present.
#[derive(Debug, Clone, Default)]
pub struct FieldPresenceMap(Option<HashSet<String>>);

impl FieldPresenceMap {
    /// Builds the presence set for a custom format string. The default
    /// format (or an empty one, when no API query was made) yields the
    /// default-map form.
    pub fn from_format(format: &str) -> Self {
        if format.is_empty() || format == DEFAULT_FORMAT {
            return Self(None);
        }

        let fields = format
            .split_whitespace()
            .map(|raw| {
                raw.trim_start_matches("${")
                    .trim_end_matches('}')
                    .to_string()
            })
            .collect();
        Self(Some(fields))
    }

    /// True when this map describes the default format.
    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }

    /// Whether the given provider field name appears in the format.
    pub fn has_field(&self, aws_field_name: &str) -> bool {
        match &self.0 {
            Some(fields) => fields.contains(aws_field_name),
            None => V2_DEFAULT_FIELD_NAMES.contains(&aws_field_name),
        }
    }
}

/// True when the format string is the provider default (or empty, meaning
/// no format query was made).
pub fn is_default_format(format: &str) -> bool {
    format.is_empty() || format == DEFAULT_FORMAT
}
