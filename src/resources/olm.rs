use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Subscription installs and upgrades an operator through OLM.
/// API: operators.coreos.com/v1alpha1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "Subscription",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_plan_approval: Option<String>,
}
