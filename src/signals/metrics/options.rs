use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Client, Resource, ResourceExt};
use tracing::debug;

use crate::addon::images::ImageOverrides;
use crate::addon::options::Options as AddonOptions;
use crate::addon::{
    CollectorKind, Settings, Signal, CLIENT_CERT_SECRET, HCP_COMPONENT_LABEL, HUB_CA_SECRET,
    K8S_COMPONENT,
};
use crate::common::references::{get_referenced, get_resources_with_owner_ref, get_secrets};
use crate::resources::addon::ManagedClusterAddOn;
use crate::resources::cluster::ManagedCluster;
use crate::resources::monitoring::{PrometheusAgent, PrometheusRule, ScrapeConfig, ServiceMonitor};
use crate::signals::for_signal;
use crate::{Error, Result};

use super::hypershift::{ClusterIdentity, CollectionConfig, HcpComponent, HypershiftBuilder};

/// Everything one of the spoke agents is rendered from
#[derive(Clone, Debug, PartialEq)]
pub struct Collector {
    pub kind: CollectorKind,
    pub agent: PrometheusAgent,
    pub scrape_configs: Vec<ScrapeConfig>,
    pub rules: Vec<PrometheusRule>,
    pub service_monitors: Vec<ServiceMonitor>,
    pub config_maps: Vec<ConfigMap>,
}

/// Metrics configuration of a managed cluster
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub platform: Option<Collector>,
    pub user_workloads: Option<Collector>,
    pub secrets: Vec<Secret>,
    pub images: ImageOverrides,
}

fn for_component<K: Resource>(objs: &[K], kind: CollectorKind) -> Vec<K>
where
    K: Clone,
{
    objs.iter()
        .filter(|obj| obj.labels().get(K8S_COMPONENT).map(String::as_str) == Some(kind.app_name()))
        .cloned()
        .collect()
}

fn hcp_component<K: Resource>(obj: &K) -> Option<HcpComponent> {
    obj.labels()
        .get(HCP_COMPONENT_LABEL)
        .and_then(|value| HcpComponent::from_label_value(value))
}

// route the hosted control-plane scrape configs and rules away from the plain collector
fn split_hcp<K: Resource>(objs: Vec<K>) -> (Vec<K>, Vec<K>, Vec<K>) {
    let (mut plain, mut etcd, mut apiserver) = (Vec::new(), Vec::new(), Vec::new());
    for obj in objs {
        match hcp_component(&obj) {
            None => plain.push(obj),
            Some(HcpComponent::Etcd) => etcd.push(obj),
            Some(HcpComponent::KubeApiServer) => apiserver.push(obj),
        }
    }
    (plain, etcd, apiserver)
}

/// Fetch the metrics configuration referenced by the add-on of a managed cluster
///
/// Returns `None` when no metrics are collected at all.
pub async fn build_options(
    client: &Client,
    settings: &Settings,
    mcao: &ManagedClusterAddOn,
    cluster: &ManagedCluster,
    opts: &AddonOptions,
) -> Result<Option<Options>> {
    if !opts.metrics_enabled() {
        return Ok(None);
    }

    let cluster_namespace = mcao.namespace().unwrap_or_default();
    let images =
        ImageOverrides::load(client, &settings.install_namespace, &settings.images_config_map)
            .await?;
    let secrets = get_secrets(
        client,
        &cluster_namespace,
        &settings.config_namespace,
        &[HUB_CA_SECRET.to_string(), CLIENT_CERT_SECRET.to_string()],
    )
    .await?;

    let agents: Vec<PrometheusAgent> =
        get_resources_with_owner_ref(client, mcao, &settings.addon_name).await?;
    let scrape_configs: Vec<ScrapeConfig> = get_referenced(client, mcao).await?;
    let rules: Vec<PrometheusRule> = get_referenced(client, mcao).await?;
    let config_maps = for_signal(get_referenced::<ConfigMap>(client, mcao).await?, Signal::Metrics);

    let mut options = Options {
        platform: None,
        user_workloads: None,
        secrets,
        images,
    };

    for (kind, enabled) in [
        (CollectorKind::Platform, opts.platform.metrics.collection_enabled),
        (
            CollectorKind::UserWorkload,
            opts.user_workloads.metrics.collection_enabled,
        ),
    ] {
        if !enabled {
            continue;
        }
        let agent = for_component(&agents, kind)
            .into_iter()
            .next()
            .ok_or_else(|| Error::ResourceNotFound(format!("PrometheusAgent {}", kind.app_name())))?;

        let mut collector = Collector {
            kind,
            agent,
            scrape_configs: for_component(&scrape_configs, kind),
            rules: for_component(&rules, kind),
            service_monitors: Vec::new(),
            config_maps: for_component(&config_maps, kind),
        };
        if kind == CollectorKind::Platform {
            route_hosted_control_planes(client, cluster, &mut collector).await?;
        }

        match kind {
            CollectorKind::Platform => options.platform = Some(collector),
            CollectorKind::UserWorkload => options.user_workloads = Some(collector),
        }
    }

    Ok(Some(options))
}

async fn route_hosted_control_planes(
    client: &Client,
    cluster: &ManagedCluster,
    collector: &mut Collector,
) -> Result<()> {
    let (scrape_configs, etcd_scrape_configs, apiserver_scrape_configs) =
        split_hcp(std::mem::take(&mut collector.scrape_configs));
    let (rules, etcd_rules, apiserver_rules) = split_hcp(std::mem::take(&mut collector.rules));
    collector.scrape_configs = scrape_configs;
    collector.rules = rules;

    let etcd = CollectionConfig {
        scrape_configs: etcd_scrape_configs,
        rules: etcd_rules,
    };
    let apiserver = CollectionConfig {
        scrape_configs: apiserver_scrape_configs,
        rules: apiserver_rules,
    };
    if etcd.is_empty() && apiserver.is_empty() {
        return Ok(());
    }
    if !cluster.is_hypershift_host() {
        debug!(
            "Ignoring hosted control-plane configuration for {}, not a hypershift host",
            cluster.name_any()
        );
        return Ok(());
    }

    let host = ClusterIdentity {
        name: cluster.name_any(),
        id: cluster
            .cluster_id()
            .ok_or(Error::MissingObjectKey(".metadata.labels.clusterID"))?
            .to_string(),
    };
    let output = HypershiftBuilder { client, host }
        .build(&etcd, &apiserver)
        .await?;
    collector.scrape_configs.extend(output.scrape_configs);
    collector.rules.extend(output.rules);
    collector.service_monitors.extend(output.service_monitors);
    Ok(())
}
