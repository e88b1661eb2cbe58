use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ClusterLogForwarder collects and forwards logs of a cluster.
/// API: observability.openshift.io/v1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "observability.openshift.io",
    version = "v1",
    kind = "ClusterLogForwarder",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
#[kube(status = "ClusterLogForwarderStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterLogForwarderSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccountRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ServiceAccountRef {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClusterLogForwarderStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

/// LokiStack is the log store deployed as part of the managed default log stack.
/// API: loki.grafana.com/v1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "loki.grafana.com",
    version = "v1",
    kind = "LokiStack",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct LokiStackSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
