use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::Client;

use crate::addon::options::Options as AddonOptions;
use crate::addon::Signal;
use crate::common::references::{get_referenced, ConfigResource};
use crate::resources::addon::ManagedClusterAddOn;
use crate::resources::otel::{Instrumentation, OpenTelemetryCollector};
use crate::signals::for_signal;
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub subscription_channel: String,
    pub collector: OpenTelemetryCollector,
    pub instrumentation: Option<Instrumentation>,
    pub secrets: Vec<Secret>,
    pub config_maps: Vec<ConfigMap>,
}

/// The first referenced resource of type `K`
async fn first_referenced<K: ConfigResource>(
    client: &Client,
    mcao: &ManagedClusterAddOn,
) -> Result<K> {
    get_referenced::<K>(client, mcao)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::MissingResourceReference(K::config_resource()))
}

/// Fetch the tracing configuration referenced by the add-on of a managed cluster
///
/// Returns `None` when user-workload traces are not collected.
pub async fn build_options(
    client: &Client,
    mcao: &ManagedClusterAddOn,
    opts: &AddonOptions,
) -> Result<Option<Options>> {
    if !opts.traces_enabled() {
        return Ok(None);
    }
    let traces = &opts.user_workloads.traces;

    let collector = first_referenced::<OpenTelemetryCollector>(client, mcao).await?;
    let instrumentation = if traces.instrumentation_enabled {
        Some(first_referenced::<Instrumentation>(client, mcao).await?)
    } else {
        None
    };

    Ok(Some(Options {
        subscription_channel: traces.subscription_channel.clone(),
        collector,
        instrumentation,
        secrets: for_signal(get_referenced(client, mcao).await?, Signal::Tracing),
        config_maps: for_signal(get_referenced(client, mcao).await?, Signal::Tracing),
    }))
}
