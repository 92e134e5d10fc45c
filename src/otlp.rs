//! OTLP/JSON data model for logs and metrics.
//!
//! These structs serialize to the OpenTelemetry protocol JSON encoding
//! (`resourceLogs`/`resourceMetrics` envelopes with camelCase keys and the
//! externally tagged `AnyValue` union). They deserialize too, which the
//! tests use to assert the exact wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema URL stamped on resource-level envelopes.
pub const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.27.0";

/// The OTLP attribute-value union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnyValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "intValue")]
    Int(i64),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "boolValue")]
    Bool(bool),
    #[serde(rename = "arrayValue")]
    Array(ArrayValue),
    #[serde(rename = "kvlistValue")]
    KvList(KeyValueList),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<AnyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyValueList {
    #[serde(default)]
    pub values: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: AnyValue::String(value.into()),
        }
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value: AnyValue::Int(value),
        }
    }
}

/// Re-shapes an arbitrary JSON tree into the `AnyValue` union: objects
/// become kvlists, arrays become arrays, integers stay integral, floats
/// become doubles, and anything else stringifies.
pub fn any_value_from_json(value: &Value) -> AnyValue {
    match value {
        Value::Object(map) => AnyValue::KvList(KeyValueList {
            values: map
                .iter()
                .map(|(key, child)| KeyValue {
                    key: key.clone(),
                    value: any_value_from_json(child),
                })
                .collect(),
        }),
        Value::Array(items) => AnyValue::Array(ArrayValue {
            values: items.iter().map(any_value_from_json).collect(),
        }),
        Value::Number(num) => {
            if let Some(i) = num.as_i64() {
                AnyValue::Int(i)
            } else {
                AnyValue::Double(num.as_f64().unwrap_or(0.0))
            }
        }
        Value::Bool(b) => AnyValue::Bool(*b),
        Value::String(s) => AnyValue::String(s.clone()),
        Value::Null => AnyValue::String("<nil>".to_string()),
    }
}

// Attribute-list helpers. Attributes live in plain vectors so that the
// serialized order is deterministic; these keep key uniqueness.

/// Sets `key` to `value`, replacing an existing entry.
pub fn upsert_string(attributes: &mut Vec<KeyValue>, key: &str, value: &str) {
    match attributes.iter_mut().find(|kv| kv.key == key) {
        Some(existing) => existing.value = AnyValue::String(value.to_string()),
        None => attributes.push(KeyValue::string(key, value)),
    }
}

/// Sets `key` to `value` only when the key is absent.
pub fn insert_string(attributes: &mut Vec<KeyValue>, key: &str, value: &str) {
    if !attributes.iter().any(|kv| kv.key == key) {
        attributes.push(KeyValue::string(key, value));
    }
}

/// Removes `key` when present.
pub fn remove_attribute(attributes: &mut Vec<KeyValue>, key: &str) {
    attributes.retain(|kv| kv.key != key);
}

/// Looks up the string value stored under `key`.
pub fn attribute_string<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a str> {
    attributes.iter().find(|kv| kv.key == key).and_then(|kv| {
        if let AnyValue::String(s) = &kv.value {
            Some(s.as_str())
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentationScope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub time_unix_nano: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_text: Option<String>,
    pub body: AnyValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeLogs {
    #[serde(default, skip_serializing_if = "is_empty_scope")]
    pub scope: InstrumentationScope,
    #[serde(default)]
    pub log_records: Vec<LogRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLogs {
    #[serde(default)]
    pub resource: Resource,
    #[serde(default)]
    pub scope_logs: Vec<ScopeLogs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

/// The `ExportLogsServiceRequest` payload body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsData {
    #[serde(default)]
    pub resource_logs: Vec<ResourceLogs>,
}

fn is_empty_scope(scope: &InstrumentationScope) -> bool {
    scope.name.is_empty() && scope.version.is_empty() && scope.attributes.is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberDataPoint {
    pub time_unix_nano: String,
    pub as_int: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    #[serde(default)]
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    pub gauge: Gauge,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMetrics {
    #[serde(default)]
    pub scope: InstrumentationScope,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    #[serde(default)]
    pub resource: Resource,
    #[serde(default)]
    pub scope_metrics: Vec<ScopeMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

/// The `ExportMetricsServiceRequest` payload body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsData {
    #[serde(default)]
    pub resource_metrics: Vec<ResourceMetrics>,
}
