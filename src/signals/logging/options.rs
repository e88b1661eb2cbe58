use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::Client;

use crate::addon::options::Options as AddonOptions;
use crate::addon::{Settings, Signal};
use crate::common::references::{get_referenced, get_resource_with_owner_ref, ConfigResource};
use crate::resources::addon::ManagedClusterAddOn;
use crate::resources::logging::{ClusterLogForwarder, LokiStack};
use crate::signals::for_signal;
use crate::{Error, Result};

/// Logging configuration of a managed cluster
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub subscription_channel: String,
    pub platform_enabled: bool,
    pub user_workloads_enabled: bool,
    pub cluster_log_forwarder: ClusterLogForwarder,
    /// Only set when the add-on manages the default log store
    pub loki_stack: Option<LokiStack>,
    pub secrets: Vec<Secret>,
    pub config_maps: Vec<ConfigMap>,
}

/// Fetch the logging configuration referenced by the add-on of a managed cluster
///
/// Returns `None` when no logs are collected.
pub async fn build_options(
    client: &Client,
    settings: &Settings,
    mcao: &ManagedClusterAddOn,
    opts: &AddonOptions,
) -> Result<Option<Options>> {
    if !opts.logs_enabled() {
        return Ok(None);
    }

    let cluster_log_forwarder = get_referenced::<ClusterLogForwarder>(client, mcao)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::MissingResourceReference(ClusterLogForwarder::config_resource()))?;

    let loki_stack = if opts.platform.logs.default_stack {
        Some(get_resource_with_owner_ref::<LokiStack>(client, mcao, &settings.addon_name).await?)
    } else {
        None
    };

    let secrets = for_signal(get_referenced::<Secret>(client, mcao).await?, Signal::Logging);
    let config_maps = for_signal(get_referenced::<ConfigMap>(client, mcao).await?, Signal::Logging);

    // both scopes share the operator subscription
    let subscription_channel = if opts.platform.logs.collection_enabled {
        opts.platform.logs.subscription_channel.clone()
    } else {
        opts.user_workloads.logs.subscription_channel.clone()
    };

    Ok(Some(Options {
        subscription_channel,
        platform_enabled: opts.platform.logs.collection_enabled,
        user_workloads_enabled: opts.user_workloads.logs.collection_enabled,
        cluster_log_forwarder,
        loki_stack,
        secrets,
        config_maps,
    }))
}
