use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DynamicObject, PostParams};
use kube::{Client, ResourceExt};
use tracing::*;

use crate::resources::addon::ClusterManagementAddOn;
use crate::resources::logging::{ClusterLogForwarder, LokiStack};
use crate::resources::monitoring::{PrometheusAgent, PrometheusRule, ScrapeConfig};
use crate::resources::otel::OpenTelemetryCollector;
use crate::resources::uiplugins::UIPlugin;
use crate::{Error, Result};

use super::references::ConfigResource;
use super::{addon_owner_ref, set_controller_ref};

/// The objects the add-on knows how to create and keep up to date on the hub
#[derive(Clone, Debug)]
pub enum ManagedObject {
    PrometheusAgent(PrometheusAgent),
    PrometheusRule(PrometheusRule),
    ScrapeConfig(ScrapeConfig),
    ConfigMap(ConfigMap),
    Secret(Secret),
    ClusterLogForwarder(ClusterLogForwarder),
    LokiStack(LokiStack),
    OpenTelemetryCollector(OpenTelemetryCollector),
    UIPlugin(UIPlugin),
    Unsupported(DynamicObject),
}

fn convert<K: ConfigResource>(obj: &DynamicObject) -> Result<K> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

impl ManagedObject {
    /// Type a dynamic object by its kind; kinds the add-on does not manage stay `Unsupported`
    pub fn from_dynamic(obj: DynamicObject) -> Result<Self> {
        let kind = obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default();
        Ok(match kind {
            "PrometheusAgent" => ManagedObject::PrometheusAgent(convert(&obj)?),
            "PrometheusRule" => ManagedObject::PrometheusRule(convert(&obj)?),
            "ScrapeConfig" => ManagedObject::ScrapeConfig(convert(&obj)?),
            "ConfigMap" => ManagedObject::ConfigMap(convert(&obj)?),
            "Secret" => ManagedObject::Secret(convert(&obj)?),
            "ClusterLogForwarder" => ManagedObject::ClusterLogForwarder(convert(&obj)?),
            "LokiStack" => ManagedObject::LokiStack(convert(&obj)?),
            "OpenTelemetryCollector" => ManagedObject::OpenTelemetryCollector(convert(&obj)?),
            "UIPlugin" => ManagedObject::UIPlugin(convert(&obj)?),
            _ => ManagedObject::Unsupported(obj),
        })
    }

    pub fn kind(&self) -> String {
        match self {
            ManagedObject::PrometheusAgent(_) => "PrometheusAgent".into(),
            ManagedObject::PrometheusRule(_) => "PrometheusRule".into(),
            ManagedObject::ScrapeConfig(_) => "ScrapeConfig".into(),
            ManagedObject::ConfigMap(_) => "ConfigMap".into(),
            ManagedObject::Secret(_) => "Secret".into(),
            ManagedObject::ClusterLogForwarder(_) => "ClusterLogForwarder".into(),
            ManagedObject::LokiStack(_) => "LokiStack".into(),
            ManagedObject::OpenTelemetryCollector(_) => "OpenTelemetryCollector".into(),
            ManagedObject::UIPlugin(_) => "UIPlugin".into(),
            ManagedObject::Unsupported(obj) => obj
                .types
                .as_ref()
                .map(|t| t.kind.clone())
                .unwrap_or_else(|| "<unknown>".into()),
        }
    }
}

/// Create or update every object with the ClusterManagementAddOn as controller owner,
/// returning the objects as persisted
pub async fn create_or_update_with_addon_owner(
    client: &Client,
    cmao: &ClusterManagementAddOn,
    objects: Vec<ManagedObject>,
) -> Result<Vec<ManagedObject>> {
    if let Some(unsupported) = objects
        .iter()
        .find(|o| matches!(o, ManagedObject::Unsupported(_)))
    {
        return Err(Error::UnsupportedType(unsupported.kind()));
    }

    let owner = addon_owner_ref(cmao)?;
    let mut applied = Vec::with_capacity(objects.len());
    for obj in objects {
        let obj = match obj {
            ManagedObject::PrometheusAgent(o) => ManagedObject::PrometheusAgent(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::PrometheusRule(o) => ManagedObject::PrometheusRule(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::ScrapeConfig(o) => ManagedObject::ScrapeConfig(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::ConfigMap(o) => ManagedObject::ConfigMap(
                create_or_update(client, o, &owner, |e, d| {
                    e.data = d.data.clone();
                    e.binary_data = d.binary_data.clone();
                })
                .await?,
            ),
            ManagedObject::Secret(o) => ManagedObject::Secret(
                create_or_update(client, o, &owner, |e, d| {
                    e.data = d.data.clone();
                    e.string_data = d.string_data.clone();
                    e.type_ = d.type_.clone();
                })
                .await?,
            ),
            ManagedObject::ClusterLogForwarder(o) => ManagedObject::ClusterLogForwarder(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::LokiStack(o) => ManagedObject::LokiStack(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::OpenTelemetryCollector(o) => ManagedObject::OpenTelemetryCollector(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::UIPlugin(o) => ManagedObject::UIPlugin(
                create_or_update(client, o, &owner, |e, d| e.spec = d.spec.clone()).await?,
            ),
            ManagedObject::Unsupported(o) => ManagedObject::Unsupported(o),
        };
        applied.push(obj);
    }
    Ok(applied)
}

async fn create_or_update<K: ConfigResource>(
    client: &Client,
    mut desired: K,
    owner: &OwnerReference,
    mutate: impl Fn(&mut K, &K),
) -> Result<K> {
    set_controller_ref(&mut desired, owner.clone());
    let name = desired.name_any();
    let namespace = desired.namespace().unwrap_or_default();
    let api = K::api(client.clone(), &namespace);

    let Some(existing) = api.get_opt(&name).await? else {
        debug!("Creating {} {} in namespace {}", K::kind(&()), name, namespace);
        return Ok(api.create(&PostParams::default(), &desired).await?);
    };

    let mut updated = existing.clone();
    updated.meta_mut().labels = desired.meta().labels.clone();
    updated.meta_mut().annotations = desired.meta().annotations.clone();
    set_controller_ref(&mut updated, owner.clone());
    mutate(&mut updated, &desired);

    if serde_json::to_value(&updated)? == serde_json::to_value(&existing)? {
        return Ok(existing);
    }

    debug!("Updating {} {} in namespace {}", K::kind(&()), name, namespace);
    Ok(api.replace(&name, &PostParams::default(), &updated).await?)
}
