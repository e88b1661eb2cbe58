use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies a single manifest delivered to a spoke cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    #[serde(default)]
    pub group: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentifier {
    pub fn new(group: &str, resource: &str, namespace: &str, name: &str) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Typed value of a status feedback field
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum FieldValue {
    String {
        #[serde(rename = "string")]
        string: String,
    },
    Integer {
        #[serde(rename = "integer")]
        integer: i64,
    },
    Boolean {
        #[serde(rename = "boolean")]
        boolean: bool,
    },
    #[serde(rename = "JsonRaw")]
    JsonRaw {
        #[serde(rename = "jsonRaw")]
        json_raw: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackValue {
    pub name: String,
    pub field_value: FieldValue,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FeedbackResult {
    #[serde(default)]
    pub values: Vec<FeedbackValue>,
}

/// Feedback values collected from a spoke for one resource
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub resource_identifier: ResourceIdentifier,
    pub feedback_result: FeedbackResult,
}

/// A JSON path the spoke agent evaluates against a resource's status
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JsonPath {
    pub name: String,
    pub path: String,
}

/// Registration of the feedback fields to collect for a resource
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeField {
    pub resource_identifier: ResourceIdentifier,
    pub probe_rules: Vec<FeedbackRule>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRule {
    #[serde(rename = "type")]
    pub type_: String,
    pub json_paths: Vec<JsonPath>,
}

/// ManifestWork delivers a set of manifests to a managed cluster and reports their status.
/// API: work.open-cluster-management.io/v1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "work.open-cluster-management.io",
    version = "v1",
    kind = "ManifestWork",
    namespaced,
    schema = "disabled"
)]
#[kube(status = "ManifestWorkStatus")]
pub struct ManifestWorkSpec {
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManifestWorkStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_status: Option<ManifestResourceStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ManifestResourceStatus {
    #[serde(default)]
    pub manifests: Vec<ManifestCondition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManifestCondition {
    pub resource_meta: ManifestResourceMeta,
    #[serde(default)]
    pub status_feedback: FeedbackResult,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ManifestResourceMeta {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

impl From<&ManifestResourceMeta> for ResourceIdentifier {
    fn from(meta: &ManifestResourceMeta) -> Self {
        ResourceIdentifier::new(&meta.group, &meta.resource, &meta.namespace, &meta.name)
    }
}
