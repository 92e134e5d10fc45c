//! Classifies raw log messages into the known structured shapes.
//!
//! Classification is total: every input maps to exactly one variant, with
//! `Unknown` as the absorbing default. Shapes are recognized by JSON-path
//! presence checks in a fixed order, never by substring heuristics.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Recognizes `(i-…|ip-…).region.` host names, with an optional fargate
/// prefix marking records that carry no instance identity.
pub static HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<fargate>fargate-)?(?P<instance>(i-|ip-)[\w-]+)\.(?P<region>[\w-]+)\.")
        .expect("host pattern is valid")
});

/// A cloud-audit event without EC2 instance details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditEvent {
    #[serde(default, rename = "eventSource")]
    pub event_source: String,
    #[serde(default, rename = "eventName")]
    pub event_name: String,
    #[serde(default, rename = "awsRegion")]
    pub region: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ec2InstanceItem {
    #[serde(default, rename = "instanceId")]
    pub instance_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ec2InstanceItems {
    #[serde(default)]
    pub items: Vec<Ec2InstanceItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ec2InstancesSet {
    #[serde(default, rename = "instancesSet")]
    pub instances_set: Ec2InstanceItems,
}

/// A cloud-audit event issued by the EC2 service with instance sets in
/// its request or response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ec2AuditEvent {
    #[serde(flatten)]
    pub base: AuditEvent,
    #[serde(default, rename = "requestParameters")]
    pub request_parameters: Ec2InstancesSet,
    #[serde(default, rename = "responseElements")]
    pub response_elements: Ec2InstancesSet,
}

impl Ec2AuditEvent {
    /// First non-empty instance id, scanning request items then response
    /// items.
    pub fn instance_id(&self) -> Option<String> {
        self.request_parameters
            .instances_set
            .items
            .iter()
            .chain(self.response_elements.instances_set.items.iter())
            .map(|item| item.instance_id.as_str())
            .find(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// A container-insights cluster log line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterInsightsLog {
    #[serde(default)]
    pub ec2_instance_id: String,
    #[serde(default, rename = "az")]
    pub region: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppLogKubernetes {
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub namespace_name: String,
    #[serde(default)]
    pub pod_id: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub container_name: String,
    #[serde(default)]
    pub docker_id: String,
    #[serde(default)]
    pub container_image: String,
    #[serde(default)]
    pub host: String,
}

/// An application log emitted by a pod, on EC2 or Fargate. Instance and
/// region identity is parsed out of `kubernetes.host` after
/// deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerAppLog {
    #[serde(default)]
    pub kubernetes: AppLogKubernetes,
    #[serde(default, rename = "sw.k8s.cluster.uid")]
    pub cluster_uid: String,
    #[serde(default, rename = "sw.k8s.log.type")]
    pub log_type: String,
    #[serde(default, rename = "sw.k8s.agent.manifest.version")]
    pub manifest_version: String,
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub logtag: String,
    #[serde(default)]
    pub log: String,
    #[serde(skip)]
    parsed_instance_id: String,
    #[serde(skip)]
    parsed_region: String,
    #[serde(skip)]
    fargate: bool,
}

impl ContainerAppLog {
    fn parse_host(&mut self) {
        let Some(captures) = HOST_PATTERN.captures(&self.kubernetes.host) else {
            return;
        };

        if captures.name("fargate").is_some() {
            // Fargate containers carry no instance identity.
            self.fargate = true;
        } else if let Some(instance) = captures.name("instance") {
            self.parsed_instance_id = instance.as_str().to_string();
        }

        if let Some(region) = captures.name("region") {
            self.parsed_region = region.as_str().to_string();
        }
    }

    pub fn is_fargate(&self) -> bool {
        self.fargate
    }

    pub fn region(&self) -> &str {
        &self.parsed_region
    }
}

/// A container-insights node performance record. The region is parsed
/// from the node name; the instance id is carried directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterPerformanceLog {
    #[serde(default, rename = "InstanceId")]
    pub instance_id: String,
    #[serde(default, rename = "NodeName")]
    pub node_name: String,
    #[serde(skip)]
    parsed_region: String,
}

impl ClusterPerformanceLog {
    fn parse_node_name(&mut self) {
        if let Some(captures) = HOST_PATTERN.captures(&self.node_name) {
            if let Some(region) = captures.name("region") {
                self.parsed_region = region.as_str().to_string();
            }
        }
    }
}

/// The classification result.
#[derive(Debug, Clone)]
pub enum ClassifiedEvent {
    Ec2Audit(Ec2AuditEvent),
    GenericAudit(AuditEvent),
    ClusterInsights(ClusterInsightsLog),
    AppLog(Box<ContainerAppLog>),
    ClusterPerformance(ClusterPerformanceLog),
    Unknown,
}

impl ClassifiedEvent {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ClassifiedEvent::Unknown)
    }

    /// The extractable host identity, when the record carries one.
    pub fn instance_id(&self) -> Option<String> {
        match self {
            ClassifiedEvent::Ec2Audit(event) => event.instance_id(),
            ClassifiedEvent::GenericAudit(_) => None,
            ClassifiedEvent::ClusterInsights(log) => non_empty(&log.ec2_instance_id),
            ClassifiedEvent::AppLog(log) => non_empty(&log.parsed_instance_id),
            ClassifiedEvent::ClusterPerformance(log) => non_empty(&log.instance_id),
            ClassifiedEvent::Unknown => None,
        }
    }

    /// The record-level region, empty when none could be determined.
    pub fn region(&self) -> &str {
        match self {
            ClassifiedEvent::Ec2Audit(event) => &event.base.region,
            ClassifiedEvent::GenericAudit(event) => &event.region,
            ClassifiedEvent::ClusterInsights(log) => &log.region,
            ClassifiedEvent::AppLog(log) => &log.parsed_region,
            ClassifiedEvent::ClusterPerformance(log) => &log.parsed_region,
            ClassifiedEvent::Unknown => "",
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Classifies one raw message. Never fails; unparseable or unrecognized
/// inputs come back as `Unknown`.
pub fn classify(message: &str) -> ClassifiedEvent {
    let Ok(root) = serde_json::from_str::<Value>(message) else {
        return ClassifiedEvent::Unknown;
    };
    if !root.is_object() {
        return ClassifiedEvent::Unknown;
    }

    if json_path_equals(&root, "eventSource", "ec2.amazonaws.com")
        && (json_path_present(&root, "requestParameters.instancesSet")
            || json_path_present(&root, "responseElements.instancesSet"))
    {
        if let Ok(event) = serde_json::from_value::<Ec2AuditEvent>(root.clone()) {
            return ClassifiedEvent::Ec2Audit(event);
        }
    }

    if json_path_present(&root, "eventVersion") {
        if let Ok(event) = serde_json::from_value::<AuditEvent>(root.clone()) {
            return ClassifiedEvent::GenericAudit(event);
        }
    }

    if json_path_present(&root, "ec2_instance_id") {
        if let Ok(log) = serde_json::from_value::<ClusterInsightsLog>(root.clone()) {
            return ClassifiedEvent::ClusterInsights(log);
        }
    }

    if json_path_present(&root, "kubernetes.host") && json_path_present(&root, "kubernetes.namespace_name") {
        if let Ok(mut log) = serde_json::from_value::<ContainerAppLog>(root.clone()) {
            log.parse_host();
            return ClassifiedEvent::AppLog(Box::new(log));
        }
    }

    if json_path_present(&root, "InstanceId") && json_path_present(&root, "AutoScalingGroupName") {
        if let Ok(mut log) = serde_json::from_value::<ClusterPerformanceLog>(root) {
            log.parse_node_name();
            return ClassifiedEvent::ClusterPerformance(log);
        }
    }

    ClassifiedEvent::Unknown
}

/// True when the dotted path exists in the object tree.
pub fn json_path_present(root: &Value, path: &str) -> bool {
    walk_path(root, path).is_some()
}

/// True when the dotted path exists and its string value equals `expected`.
pub fn json_path_equals(root: &Value, path: &str, expected: &str) -> bool {
    walk_path(root, path)
        .and_then(Value::as_str)
        .is_some_and(|value| value == expected)
}

fn walk_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}
