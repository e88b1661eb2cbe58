use std::collections::BTreeMap;

use kube::{Client, ResourceExt};
use tracing::debug;

use crate::addon::health::{is_version_older, MONITORING_UI_PLUGIN_NAME};
use crate::addon::options::Options as AddonOptions;
use crate::common::references::get_referenced;
use crate::resources::addon::ManagedClusterAddOn;
use crate::resources::cluster::ManagedCluster;
use crate::resources::uiplugins::{IncidentsConfig, MonitoringConfig, UIPlugin, UIPluginSpec};
use crate::Result;

/// First OpenShift release shipping the incidents view of the monitoring plugin
pub const INCIDENT_DETECTION_MIN_VERSION: &str = "4.19.0";

/// Only OpenShift clusters recent enough to run the incidents view get the plugin
pub fn supports_incident_detection(cluster: &ManagedCluster) -> Result<bool> {
    if !cluster.is_openshift() {
        return Ok(false);
    }
    match cluster.openshift_version() {
        Some(version) => Ok(!is_version_older(version, INCIDENT_DETECTION_MIN_VERSION)?),
        None => Ok(false),
    }
}

pub fn default_monitoring_plugin() -> UIPlugin {
    UIPlugin::new(
        MONITORING_UI_PLUGIN_NAME,
        UIPluginSpec {
            type_: "Monitoring".into(),
            monitoring: Some(MonitoringConfig {
                incidents: Some(IncidentsConfig { enabled: true }),
                extra: BTreeMap::new(),
            }),
            extra: BTreeMap::new(),
        },
    )
}

/// The monitoring plugin to render for a managed cluster
///
/// A referenced plugin named `monitoring` takes precedence over the default one. Returns `None`
/// when incident detection is disabled or the cluster cannot run it.
pub async fn build_options(
    client: &Client,
    mcao: &ManagedClusterAddOn,
    cluster: &ManagedCluster,
    opts: &AddonOptions,
) -> Result<Option<UIPlugin>> {
    if !opts.incident_detection_enabled() {
        return Ok(None);
    }
    if !supports_incident_detection(cluster)? {
        debug!(
            "Skipping incident detection on {}: not an OpenShift {} cluster",
            cluster.name_any(),
            INCIDENT_DETECTION_MIN_VERSION
        );
        return Ok(None);
    }

    let referenced = get_referenced::<UIPlugin>(client, mcao)
        .await?
        .into_iter()
        .find(|plugin| plugin.name_any() == MONITORING_UI_PLUGIN_NAME);
    Ok(Some(referenced.unwrap_or_else(default_monitoring_plugin)))
}
