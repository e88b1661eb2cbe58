use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HostedCluster is a control plane hosted as workloads on a management cluster.
/// API: hypershift.openshift.io/v1beta1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "HostedCluster",
    namespaced,
    schema = "disabled"
)]
pub struct HostedClusterSpec {
    #[serde(rename = "clusterID", default, skip_serializing_if = "String::is_empty")]
    pub cluster_id: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
