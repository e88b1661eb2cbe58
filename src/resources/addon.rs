use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ResourceRequirements, Toleration};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// ClusterManagementAddOn is the cluster-scoped parent object of an add-on. It carries the
/// placements the add-on is rolled out to and, per placement, the configuration references
/// that every managed cluster selected by the placement inherits.
/// API: addon.open-cluster-management.io/v1alpha1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "addon.open-cluster-management.io",
    version = "v1alpha1",
    kind = "ClusterManagementAddOn",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagementAddOnSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_on_meta: Option<AddOnMeta>,

    /// Configuration types the add-on supports, with optional defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_configs: Option<Vec<ConfigMeta>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_strategy: Option<InstallStrategy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddOnMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMeta {
    #[serde(default)]
    pub group: String,
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_config: Option<ConfigReferent>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallStrategy {
    /// Manual or Placements
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub placements: Option<Vec<PlacementStrategy>>,
}

/// A placement binding and the configurations every cluster it selects should receive
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementStrategy {
    #[serde(flatten)]
    pub placement_ref: PlacementRef,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub configs: Option<Vec<AddOnConfig>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollout_strategy: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementRef {
    pub namespace: String,
    pub name: String,
}

impl PlacementRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// A reference to a configuration resource, identified by group, resource, namespace and name
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AddOnConfig {
    #[serde(default)]
    pub group: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConfigReferent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
}

impl ClusterManagementAddOn {
    /// The placements of the install strategy; empty when the strategy is manual
    pub fn placements(&self) -> &[PlacementStrategy] {
        self.spec
            .install_strategy
            .as_ref()
            .and_then(|s| s.placements.as_deref())
            .unwrap_or_default()
    }

    pub fn placement_refs(&self) -> Vec<PlacementRef> {
        self.placements()
            .iter()
            .map(|p| p.placement_ref.clone())
            .collect()
    }
}

/// ManagedClusterAddOn is the per-cluster instance of an add-on, living in the managed
/// cluster's namespace on the hub.
/// API: addon.open-cluster-management.io/v1alpha1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "addon.open-cluster-management.io",
    version = "v1alpha1",
    kind = "ManagedClusterAddOn",
    namespaced,
    schema = "disabled"
)]
#[kube(status = "ManagedClusterAddOnStatus")]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub configs: Option<Vec<AddOnConfig>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,

    /// The configurations effectively applied to this add-on instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_references: Option<Vec<ConfigReference>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigReference {
    #[serde(default)]
    pub group: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_config: Option<ConfigSpecHash>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpecHash {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spec_hash: String,
}

impl ConfigReference {
    /// Namespace and name of the referenced object, preferring the desired config
    pub fn referent(&self) -> (&str, &str) {
        match &self.desired_config {
            Some(desired) if !desired.name.is_empty() => {
                (desired.namespace.as_str(), desired.name.as_str())
            }
            _ => (self.namespace.as_str(), self.name.as_str()),
        }
    }
}

impl ManagedClusterAddOn {
    pub fn config_references(&self) -> &[ConfigReference] {
        self.status
            .as_ref()
            .and_then(|s| s.config_references.as_deref())
            .unwrap_or_default()
    }
}

/// AddOnDeploymentConfig carries the free-form customized variables and the deployment knobs
/// (node placement, resources, proxy) of the add-on.
/// API: addon.open-cluster-management.io/v1alpha1
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default)]
#[kube(
    group = "addon.open-cluster-management.io",
    version = "v1alpha1",
    kind = "AddOnDeploymentConfig",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct AddOnDeploymentConfigSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customized_variables: Option<Vec<CustomizedVariable>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_placement: Option<NodePlacement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_requirements: Option<Vec<ContainerResourceRequirements>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_config: Option<ProxyConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_install_namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CustomizedVariable {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResourceRequirements {
    /// `<resource-type>:<resource-name>:<container-name>`, `*` acting as a wildcard
    #[serde(rename = "containerID")]
    pub container_id: String,
    pub resources: ResourceRequirements,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(rename = "httpProxy", skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(rename = "httpsProxy", skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
    #[serde(rename = "caBundle", skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
}
