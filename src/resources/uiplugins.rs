use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UIPlugin enables a console plugin of the cluster observability operator.
/// API: observability.openshift.io/v1alpha1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "observability.openshift.io",
    version = "v1alpha1",
    kind = "UIPlugin",
    plural = "uiplugins",
    schema = "disabled",
    derive = "PartialEq"
)]
pub struct UIPluginSpec {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<MonitoringConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MonitoringConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incidents: Option<IncidentsConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IncidentsConfig {
    pub enabled: bool,
}
