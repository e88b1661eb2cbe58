use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod coo;
pub mod health;
pub mod images;
pub mod options;

pub const DEFAULT_ADDON_NAME: &str = "multicluster-observability-addon";
pub const DEFAULT_INSTALL_NAMESPACE: &str = "open-cluster-management-observability";
pub const DEFAULT_IMAGES_CONFIG_MAP: &str = "images-list";
pub const DEFAULT_RBAC_PROXY_PORT: i32 = 8443;

/// Namespace the add-on agent manifests are installed to on spokes
pub const SPOKE_INSTALL_NAMESPACE: &str = "open-cluster-management-agent-addon";

pub const PROMETHEUS_CONTROLLER_ID: &str = "acm-observability";
pub const REMOTE_WRITE_NAME: &str = "acm-observability";
pub const SCRAPE_CLASS_NAME: &str = "ocp-monitoring";
pub const REMOTE_WRITE_PATH: &str = "/api/metrics/v1/default/api/v1/receive";

pub const PLATFORM_METRICS_COLLECTOR: &str = "platform-metrics-collector";
pub const USER_WORKLOAD_METRICS_COLLECTOR: &str = "user-workload-metrics-collector";

pub const HUB_CA_SECRET: &str = "observability-managed-cluster-certs";
pub const CLIENT_CERT_SECRET: &str =
    "observability-controller-open-cluster-management.io-observability-signer-client-cert";
pub const PROMETHEUS_CA_CONFIG_MAP: &str = "prometheus-server-ca";

// Labels
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";
pub const PLACEMENT_REF_NAME_LABEL: &str = "placement-ref-name";
pub const PLACEMENT_REF_NAMESPACE_LABEL: &str = "placement-ref-namespace";
pub const SIGNAL_LABEL: &str = "observability.openshift.io/signal";
pub const HCP_COMPONENT_LABEL: &str = "observability.openshift.io/hcp-component";
pub const RELEASE_LABEL: &str = "release";

// Managed cluster labels
pub const VENDOR_LABEL: &str = "vendor";
pub const OPENSHIFT_VERSION_LABEL: &str = "openshiftVersion";
pub const CLUSTER_ID_LABEL: &str = "clusterID";
pub const LOCAL_CLUSTER_LABEL: &str = "local-cluster";
pub const HYPERSHIFT_ADDON_STATE_LABEL: &str = "feature.open-cluster-management.io/addon-hypershift-addon";
pub const VENDOR_OPENSHIFT: &str = "OpenShift";

/// Kind of the hub controller that owns configuration it generates for the add-on
pub const MCO_KIND: &str = "MultiClusterObservability";

/// The two Prometheus agents deployed on every spoke
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    Platform,
    UserWorkload,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 2] = [CollectorKind::Platform, CollectorKind::UserWorkload];

    pub fn app_name(&self) -> &'static str {
        match self {
            CollectorKind::Platform => PLATFORM_METRICS_COLLECTOR,
            CollectorKind::UserWorkload => USER_WORKLOAD_METRICS_COLLECTOR,
        }
    }

    pub fn from_app_name(app_name: &str) -> Option<Self> {
        CollectorKind::ALL
            .into_iter()
            .find(|kind| kind.app_name() == app_name)
    }

    /// Labels a ScrapeConfig must carry to be selected by the agent of this kind
    pub fn match_labels(&self, addon_name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (K8S_COMPONENT.into(), self.app_name().into()),
            (K8S_PART_OF.into(), addon_name.into()),
        ])
    }

    pub fn rbac_proxy_tls_secret(&self) -> String {
        format!("{}-kube-rbac-proxy-tls", self.app_name())
    }
}

/// Observability signals, as found in the signal label of config maps and secrets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Metrics,
    Logging,
    Tracing,
    Analytics,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Metrics => "metrics",
            Signal::Logging => "logging",
            Signal::Tracing => "tracing",
            Signal::Analytics => "analytics",
        }
    }
}

/// Runtime settings of the add-on manager
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Name of the ClusterManagementAddOn and of the AddOnDeploymentConfig
    pub addon_name: String,
    /// Hub namespace holding the default stack and the add-on deployment config
    pub install_namespace: String,
    /// Fallback namespace for per-cluster secrets and config maps
    pub config_namespace: String,
    pub images_config_map: String,
    pub rbac_proxy_port: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addon_name: DEFAULT_ADDON_NAME.into(),
            install_namespace: DEFAULT_INSTALL_NAMESPACE.into(),
            config_namespace: DEFAULT_INSTALL_NAMESPACE.into(),
            images_config_map: DEFAULT_IMAGES_CONFIG_MAP.into(),
            rbac_proxy_port: DEFAULT_RBAC_PROXY_PORT,
        }
    }
}
