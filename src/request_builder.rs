//! Accumulates log entries under a single resource identity.
//!
//! One builder holds exactly one resource and one scope; the pipeline
//! driver decides when a host or container identity transition closes the
//! builder and starts a fresh one.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::otlp::{
    attribute_string, insert_string, remove_attribute, upsert_string, AnyValue, KeyValue,
    LogRecord, LogsData, Resource, ResourceLogs, ScopeLogs, SCHEMA_URL,
};

// Resource attribute keys (OpenTelemetry semantic conventions plus the
// vendor-specific `sw.k8s.*` family).
pub const HOST_ID: &str = "host.id";
pub const HOST_NAME: &str = "host.name";
pub const SERVICE_NAME: &str = "service.name";
pub const CLOUD_PLATFORM: &str = "cloud.platform";
pub const CLOUD_PLATFORM_AWS_EC2: &str = "aws_ec2";
pub const CLOUD_PROVIDER: &str = "cloud.provider";
pub const CLOUD_PROVIDER_AWS: &str = "aws";
pub const CLOUD_ACCOUNT_ID: &str = "cloud.account.id";
pub const CLOUD_REGION: &str = "cloud.region";
pub const AWS_LOG_GROUP_NAMES: &str = "aws.log.group.names";
pub const AWS_LOG_STREAM_NAMES: &str = "aws.log.stream.names";
pub const K8S_POD_NAME: &str = "k8s.pod.name";
pub const K8S_POD_UID: &str = "k8s.pod.uid";
pub const K8S_NAMESPACE_NAME: &str = "k8s.namespace.name";
pub const K8S_CONTAINER_NAME: &str = "k8s.container.name";
pub const K8S_CONTAINER_IMAGE_NAME: &str = "k8s.container.image.name";
pub const K8S_NODE_NAME: &str = "k8s.node.name";
pub const K8S_POD_LABELS_PREFIX: &str = "k8s.pod.labels.";
pub const K8S_POD_ANNOTATIONS_PREFIX: &str = "k8s.pod.annotations.";
pub const CONTAINER_ID: &str = "container.id";
pub const SW_K8S_CLUSTER_UID: &str = "sw.k8s.cluster.uid";
pub const SW_K8S_MANIFEST_VERSION: &str = "sw.k8s.agent.manifest.version";
pub const SW_K8S_LOG_TYPE: &str = "sw.k8s.log.type";

static STREAM_HOST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<host>(i-|ip-)[\w-]+)").expect("stream host pattern is valid"));
static STREAM_REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<region>\w{2}-\w+-\d+)").expect("stream region pattern is valid"));

/// Builder for one resource-scoped OTLP logs payload.
#[derive(Debug, Clone)]
pub struct OtlpRequestBuilder {
    logs: LogsData,
    host_id: String,
    parsed_host_id: String,
    parsed_region: String,
}

impl Default for OtlpRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OtlpRequestBuilder {
    /// A fresh builder with one empty resource and one empty scope.
    pub fn new() -> Self {
        Self {
            logs: LogsData {
                resource_logs: vec![ResourceLogs {
                    resource: Resource::default(),
                    scope_logs: vec![ScopeLogs::default()],
                    schema_url: Some(SCHEMA_URL.to_string()),
                }],
            },
            host_id: String::new(),
            parsed_host_id: String::new(),
            parsed_region: String::new(),
        }
    }

    fn resource_attributes(&mut self) -> &mut Vec<KeyValue> {
        &mut self.logs.resource_logs[0].resource.attributes
    }

    fn resource_attributes_ref(&self) -> &[KeyValue] {
        &self.logs.resource_logs[0].resource.attributes
    }

    fn log_records(&mut self) -> &mut Vec<LogRecord> {
        &mut self.logs.resource_logs[0].scope_logs[0].log_records
    }

    pub fn set_cloud_account(&mut self, account: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), CLOUD_ACCOUNT_ID, account);
        self
    }

    pub fn set_log_group(&mut self, log_group: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), AWS_LOG_GROUP_NAMES, log_group);
        self
    }

    /// Records the stream name and sniffs a host id and region out of it.
    /// When the stream starts with an instance-like prefix and no host id
    /// is set yet, the stream name becomes the host id.
    pub fn set_log_stream(&mut self, log_stream: &str) -> &mut Self {
        insert_string(self.resource_attributes(), AWS_LOG_STREAM_NAMES, log_stream);

        if let Some(captures) = STREAM_HOST_PATTERN.captures(log_stream) {
            if let Some(host) = captures.name("host") {
                self.parsed_host_id = host.as_str().to_string();
            }
        }
        if let Some(captures) = STREAM_REGION_PATTERN.captures(log_stream) {
            if let Some(region) = captures.name("region") {
                self.parsed_region = region.as_str().to_string();
            }
        }

        if !self.parsed_host_id.is_empty() && !self.has_host_id() {
            self.set_host_id(log_stream);
        }
        self
    }

    /// Sets or clears the host identity. A non-empty id also marks the
    /// resource as an EC2 workload; an empty one removes both attributes.
    pub fn set_host_id(&mut self, host_id: &str) -> &mut Self {
        self.host_id = host_id.to_string();
        if host_id.is_empty() {
            remove_attribute(self.resource_attributes(), HOST_ID);
            remove_attribute(self.resource_attributes(), CLOUD_PLATFORM);
        } else {
            upsert_string(self.resource_attributes(), HOST_ID, host_id);
            upsert_string(
                self.resource_attributes(),
                CLOUD_PLATFORM,
                CLOUD_PLATFORM_AWS_EC2,
            );
        }
        self
    }

    pub fn has_host_id(&self) -> bool {
        !self.host_id.is_empty()
    }

    pub fn match_host_id(&self, host_id: &str) -> bool {
        self.host_id == host_id
    }

    pub fn set_kubernetes_pod_name(&mut self, pod_name: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), K8S_POD_NAME, pod_name);
        self
    }

    pub fn set_kubernetes_namespace_name(&mut self, namespace_name: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), K8S_NAMESPACE_NAME, namespace_name);
        self
    }

    pub fn set_kubernetes_cluster_uid(&mut self, cluster_uid: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), SW_K8S_CLUSTER_UID, cluster_uid);
        self
    }

    pub fn set_kubernetes_container_name(&mut self, container_name: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), K8S_CONTAINER_NAME, container_name);
        self
    }

    pub fn set_kubernetes_container_image(&mut self, container_image: &str) -> &mut Self {
        upsert_string(
            self.resource_attributes(),
            K8S_CONTAINER_IMAGE_NAME,
            container_image,
        );
        self
    }

    pub fn set_kubernetes_pod_uid(&mut self, pod_uid: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), K8S_POD_UID, pod_uid);
        self
    }

    pub fn set_kubernetes_container_id(&mut self, container_id: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), CONTAINER_ID, container_id);
        self
    }

    pub fn set_kubernetes_node_name(&mut self, node_name: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), K8S_NODE_NAME, node_name);
        self
    }

    pub fn set_kubernetes_pod_labels(&mut self, labels: &HashMap<String, String>) -> &mut Self {
        for (key, value) in labels {
            let attr_key = format!("{K8S_POD_LABELS_PREFIX}{key}");
            upsert_string(self.resource_attributes(), &attr_key, value);
        }
        self
    }

    pub fn set_kubernetes_pod_annotations(
        &mut self,
        annotations: &HashMap<String, String>,
    ) -> &mut Self {
        for (key, value) in annotations {
            let attr_key = format!("{K8S_POD_ANNOTATIONS_PREFIX}{key}");
            upsert_string(self.resource_attributes(), &attr_key, value);
        }
        self
    }

    /// The agent manifest version, falling back to a supplied default
    /// when the record didn't carry one.
    pub fn set_kubernetes_manifest_version(
        &mut self,
        manifest_version: &str,
        default_version: &str,
    ) -> &mut Self {
        let version = if manifest_version.is_empty() {
            default_version
        } else {
            manifest_version
        };
        upsert_string(self.resource_attributes(), SW_K8S_MANIFEST_VERSION, version);
        self
    }

    pub fn set_otel_attributes(&mut self, pod_name: &str, container_name: &str) -> &mut Self {
        upsert_string(self.resource_attributes(), HOST_NAME, pod_name);
        upsert_string(self.resource_attributes(), SERVICE_NAME, container_name);
        self
    }

    /// True once the full container identity tuple has been recorded.
    pub fn has_container_name(&self) -> bool {
        let attributes = self.resource_attributes_ref();
        attribute_string(attributes, K8S_CONTAINER_NAME).is_some()
            && attribute_string(attributes, K8S_POD_NAME).is_some()
            && attribute_string(attributes, K8S_NAMESPACE_NAME).is_some()
            && attribute_string(attributes, SW_K8S_CLUSTER_UID).is_some()
    }

    /// Compares the accumulated container identity to the given tuple.
    /// False when any part of the tuple has not been recorded.
    pub fn match_container_name(
        &self,
        cluster_uid: &str,
        namespace_name: &str,
        pod_name: &str,
        container_name: &str,
    ) -> bool {
        let attributes = self.resource_attributes_ref();
        let (Some(container), Some(pod), Some(namespace), Some(cluster)) = (
            attribute_string(attributes, K8S_CONTAINER_NAME),
            attribute_string(attributes, K8S_POD_NAME),
            attribute_string(attributes, K8S_NAMESPACE_NAME),
            attribute_string(attributes, SW_K8S_CLUSTER_UID),
        ) else {
            return false;
        };

        container == container_name
            && pod == pod_name
            && namespace == namespace_name
            && cluster == cluster_uid
    }

    /// Appends one log record under the builder's scope. The region
    /// attribute prefers the supplied value and falls back to the region
    /// parsed from the stream name.
    pub fn add_log_entry(
        &mut self,
        entry_id: &str,
        timestamp_nanos: i64,
        message: &str,
        region: &str,
        extra_attributes: &[(&str, &str)],
    ) -> &mut Self {
        let mut attributes = Vec::new();
        if !region.is_empty() {
            upsert_string(&mut attributes, CLOUD_REGION, region);
        } else if !self.parsed_region.is_empty() {
            upsert_string(&mut attributes, CLOUD_REGION, &self.parsed_region);
        }
        for (key, value) in extra_attributes {
            upsert_string(&mut attributes, key, value);
        }

        self.log_records().push(LogRecord {
            name: Some(entry_id.to_string()),
            time_unix_nano: timestamp_nanos.to_string(),
            severity_number: None,
            severity_text: None,
            body: AnyValue::String(message.to_string()),
            attributes,
        });
        self
    }

    /// Records appended since this builder was created.
    pub fn entry_count(&self) -> usize {
        self.logs.resource_logs[0].scope_logs[0].log_records.len()
    }

    /// Closes the resource group. Always stamps the cloud provider.
    pub fn build(mut self) -> LogsData {
        insert_string(self.resource_attributes(), CLOUD_PROVIDER, CLOUD_PROVIDER_AWS);
        self.logs
    }
}
