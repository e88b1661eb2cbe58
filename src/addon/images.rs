use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

const PROMETHEUS_OPERATOR_KEY: &str = "prometheus_operator";
const PROMETHEUS_CONFIG_RELOADER_KEY: &str = "prometheus_config_reloader";
const KUBE_RBAC_PROXY_KEY: &str = "kube_rbac_proxy";
const PROMETHEUS_KEY: &str = "prometheus";

/// Images deployed on spokes, overriding the ones shipped with the operators
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageOverrides {
    pub prometheus_operator: String,
    pub prometheus_config_reloader: String,
    pub kube_rbac_proxy: String,
    pub prometheus: String,
}

impl ImageOverrides {
    pub fn from_config_map(cm: &ConfigMap) -> Result<Self> {
        let data = cm.data.as_ref();
        let get = |key: &str| -> Result<String> {
            data.and_then(|d| d.get(key))
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| Error::MissingImageOverride(key.into()))
        };

        Ok(Self {
            prometheus_operator: get(PROMETHEUS_OPERATOR_KEY)?,
            prometheus_config_reloader: get(PROMETHEUS_CONFIG_RELOADER_KEY)?,
            kube_rbac_proxy: get(KUBE_RBAC_PROXY_KEY)?,
            prometheus: get(PROMETHEUS_KEY)?,
        })
    }

    pub async fn load(client: &Client, namespace: &str, name: &str) -> Result<Self> {
        let cms: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
        let cm = cms
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::ResourceNotFound(format!("ConfigMap {namespace}/{name}")))?;
        debug!("Loaded image overrides from ConfigMap {}", cm.name_any());
        Self::from_config_map(&cm)
    }
}
