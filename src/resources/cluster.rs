use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::addon::{
    CLUSTER_ID_LABEL, HYPERSHIFT_ADDON_STATE_LABEL, LOCAL_CLUSTER_LABEL,
    OPENSHIFT_VERSION_LABEL, VENDOR_LABEL, VENDOR_OPENSHIFT,
};

/// ManagedCluster represents a cluster registered with the hub.
/// API: cluster.open-cluster-management.io/v1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "cluster.open-cluster-management.io",
    version = "v1",
    kind = "ManagedCluster",
    schema = "disabled"
)]
#[kube(status = "ManagedClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_accepts_client: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
}

impl ManagedCluster {
    fn label(&self, key: &str) -> Option<&str> {
        self.labels().get(key).map(String::as_str)
    }

    pub fn vendor(&self) -> Option<&str> {
        self.label(VENDOR_LABEL)
    }

    pub fn is_openshift(&self) -> bool {
        self.vendor() == Some(VENDOR_OPENSHIFT)
    }

    pub fn openshift_version(&self) -> Option<&str> {
        self.label(OPENSHIFT_VERSION_LABEL)
    }

    pub fn cluster_id(&self) -> Option<&str> {
        self.label(CLUSTER_ID_LABEL)
    }

    pub fn is_local_cluster(&self) -> bool {
        self.label(LOCAL_CLUSTER_LABEL) == Some("true")
    }

    /// A hypershift host is the hub's own cluster with the hypershift add-on not disabled
    pub fn is_hypershift_host(&self) -> bool {
        self.is_local_cluster() && self.label(HYPERSHIFT_ADDON_STATE_LABEL) != Some("disabled")
    }
}
