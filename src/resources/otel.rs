use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenTelemetryCollector deploys a collector pipeline.
/// API: opentelemetry.io/v1beta1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "opentelemetry.io",
    version = "v1beta1",
    kind = "OpenTelemetryCollector",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
pub struct OpenTelemetryCollectorSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Instrumentation configures auto-instrumentation of workloads.
/// API: opentelemetry.io/v1alpha1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "opentelemetry.io",
    version = "v1alpha1",
    kind = "Instrumentation",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
pub struct InstrumentationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exporter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
