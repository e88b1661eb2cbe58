use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Toleration;
use kube::{Client, ResourceExt};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::common::references::get_referenced;
use crate::resources::addon::{AddOnDeploymentConfig, ManagedClusterAddOn};
use crate::resources::cluster::ManagedCluster;
use crate::signals::logging::values::LoggingValues;
use crate::signals::metrics::values::MetricsValues;
use crate::signals::traces::values::TracingValues;
use crate::signals::{analytics, logging, metrics, traces};
use crate::Result;

use super::coo::{load_coo_subscription, should_install_coo, COO_SUBSCRIPTION_CHANNEL};
use super::options::build_options;
use super::Settings;

/// Everything the agent chart renders for one managed cluster
#[derive(Clone, Debug, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddonValues {
    #[serde(rename = "installCOO")]
    pub install_coo: bool,
    pub hub_hostname: String,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
    pub metrics: MetricsValues,
    pub logging: LoggingValues,
    pub tracing: TracingValues,
}

/// Computes the values of the agent chart from the add-on configuration of a cluster
pub struct AddonAgent {
    client: Client,
    settings: Settings,
}

impl AddonAgent {
    pub fn new(client: Client, settings: Settings) -> Self {
        Self { client, settings }
    }

    #[instrument(skip_all, fields(cluster = %cluster.name_any()))]
    pub async fn get_values(
        &self,
        cluster: &ManagedCluster,
        mcao: &ManagedClusterAddOn,
    ) -> Result<AddonValues> {
        let client = &self.client;
        let adc = get_referenced::<AddOnDeploymentConfig>(client, mcao)
            .await?
            .into_iter()
            .next();
        if adc.is_none() {
            debug!("No AddOnDeploymentConfig referenced, every signal is disabled");
        }
        let opts = build_options(adc.as_ref())?;

        let metrics_opts =
            metrics::options::build_options(client, &self.settings, mcao, cluster, &opts).await?;
        let logging_opts =
            logging::options::build_options(client, &self.settings, mcao, &opts).await?;
        let tracing_opts = traces::options::build_options(client, mcao, &opts).await?;
        let ui_plugin = analytics::options::build_options(client, mcao, cluster, &opts).await?;

        // both metrics collection and the console plugin run on the operator
        let install_coo = if metrics_opts.is_some() || ui_plugin.is_some() {
            let subscription = load_coo_subscription(client, cluster).await?;
            should_install_coo(
                subscription.as_ref(),
                COO_SUBSCRIPTION_CHANNEL,
                &self.settings.addon_name,
            )?
        } else {
            false
        };

        Ok(AddonValues {
            install_coo,
            hub_hostname: opts.hub_hostname.clone(),
            node_selector: opts.node_selector.clone(),
            tolerations: opts.tolerations.clone(),
            proxy_url: opts.proxy.proxy_url.as_ref().map(|url| url.to_string()),
            no_proxy: opts.proxy.no_proxy.clone(),
            metrics: metrics::values::build_values(
                metrics_opts.as_ref(),
                analytics::values::ui_values(ui_plugin.as_ref())?,
            )?,
            logging: logging::values::build_values(logging_opts.as_ref())?,
            tracing: traces::values::build_values(tracing_opts.as_ref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use kube::api::ObjectMeta;
    use serde_json::json;

    use super::*;
    use crate::resources::addon::{
        ConfigReference, ConfigSpecHash, ManagedClusterAddOnSpec, ManagedClusterAddOnStatus,
    };
    use crate::resources::cluster::ManagedClusterSpec;
    use crate::testing::{mock_client, not_found};

    const ADDON: &str = "multicluster-observability-addon";

    fn cluster(labels: &[(&str, &str)]) -> ManagedCluster {
        let mut mc = ManagedCluster::new("spoke-1", ManagedClusterSpec::default());
        mc.metadata = ObjectMeta {
            name: Some("spoke-1".into()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        };
        mc
    }

    fn mcao(references: Vec<ConfigReference>) -> ManagedClusterAddOn {
        let mut mcao = ManagedClusterAddOn::new(ADDON, ManagedClusterAddOnSpec::default());
        mcao.metadata.namespace = Some("spoke-1".into());
        mcao.status = Some(ManagedClusterAddOnStatus {
            conditions: None,
            config_references: Some(references),
        });
        mcao
    }

    fn adc_reference() -> ConfigReference {
        ConfigReference {
            group: "addon.open-cluster-management.io".into(),
            resource: "addondeploymentconfigs".into(),
            desired_config: Some(ConfigSpecHash {
                namespace: "open-cluster-management-observability".into(),
                name: ADDON.into(),
                spec_hash: "abc".into(),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let (client, _verifier) = mock_client();
        let agent = AddonAgent::new(client, Settings::default());
        let values = agent
            .get_values(&cluster(&[("vendor", "OpenShift")]), &mcao(vec![]))
            .await
            .unwrap();
        assert!(!values.install_coo);
        assert!(!values.metrics.platform_enabled);
        assert!(!values.logging.enabled);
        assert!(!values.tracing.enabled);
        assert_eq!(values.metrics.ui, None);
    }

    #[tokio::test]
    async fn test_local_cluster_with_foreign_subscription() {
        let (client, mut verifier) = mock_client();
        let agent = AddonAgent::new(client, Settings::default());
        let cluster = cluster(&[
            ("vendor", "OpenShift"),
            ("openshiftVersion", "4.19.1"),
            ("local-cluster", "true"),
        ]);
        let task = tokio::spawn(async move {
            agent.get_values(&cluster, &mcao(vec![adc_reference()])).await
        });

        verifier
            .respond(
                "GET",
                "/apis/addon.open-cluster-management.io/v1alpha1/namespaces/open-cluster-management-observability/addondeploymentconfigs/multicluster-observability-addon",
                StatusCode::OK,
                json!({
                    "apiVersion": "addon.open-cluster-management.io/v1alpha1",
                    "kind": "AddOnDeploymentConfig",
                    "metadata": {"name": ADDON, "namespace": "open-cluster-management-observability"},
                    "spec": {
                        "customizedVariables": [
                            {"name": "platformIncidentDetection", "value": "uiplugins.v1alpha1.observability.openshift.io"},
                            {"name": "hubHostname", "value": "hub.example.com"}
                        ],
                        "nodePlacement": {"nodeSelector": {"kubernetes.io/os": "linux"}}
                    }
                }),
            )
            .await;
        verifier
            .respond(
                "GET",
                "/apis/operators.coreos.com/v1alpha1/namespaces/openshift-cluster-observability-operator/subscriptions/cluster-observability-operator",
                StatusCode::OK,
                json!({
                    "apiVersion": "operators.coreos.com/v1alpha1",
                    "kind": "Subscription",
                    "metadata": {
                        "name": "cluster-observability-operator",
                        "namespace": "openshift-cluster-observability-operator"
                    },
                    "spec": {"channel": "stable", "name": "cluster-observability-operator"}
                }),
            )
            .await;

        let values = task.await.unwrap().unwrap();
        assert!(!values.install_coo);
        assert!(values.metrics.ui_enabled);
        assert_eq!(values.hub_hostname, "hub.example.com");
        assert_eq!(
            values.node_selector.get("kubernetes.io/os").map(String::as_str),
            Some("linux")
        );
    }

    #[tokio::test]
    async fn test_managed_cluster_installs_operator() {
        let (client, mut verifier) = mock_client();
        let agent = AddonAgent::new(client, Settings::default());
        let cluster = cluster(&[("vendor", "OpenShift"), ("openshiftVersion", "4.20.0")]);
        let task = tokio::spawn(async move {
            agent.get_values(&cluster, &mcao(vec![adc_reference()])).await
        });

        verifier
            .respond(
                "GET",
                "/apis/addon.open-cluster-management.io/v1alpha1/namespaces/open-cluster-management-observability/addondeploymentconfigs/multicluster-observability-addon",
                StatusCode::OK,
                json!({
                    "apiVersion": "addon.open-cluster-management.io/v1alpha1",
                    "kind": "AddOnDeploymentConfig",
                    "metadata": {"name": ADDON, "namespace": "open-cluster-management-observability"},
                    "spec": {
                        "customizedVariables": [
                            {"name": "platformIncidentDetection", "value": "uiplugins.v1alpha1.observability.openshift.io"}
                        ]
                    }
                }),
            )
            .await;

        let values = task.await.unwrap().unwrap();
        assert!(values.install_coo);
        assert_eq!(
            values.metrics.ui.map(|ui| ui.name),
            Some("monitoring".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_deployment_config() {
        let (client, mut verifier) = mock_client();
        let agent = AddonAgent::new(client, Settings::default());
        let task = tokio::spawn(async move {
            agent
                .get_values(&cluster(&[]), &mcao(vec![adc_reference()]))
                .await
        });

        verifier
            .respond(
                "GET",
                "/apis/addon.open-cluster-management.io/v1alpha1/namespaces/open-cluster-management-observability/addondeploymentconfigs/multicluster-observability-addon",
                StatusCode::NOT_FOUND,
                not_found(ADDON),
            )
            .await;

        assert!(matches!(
            task.await.unwrap(),
            Err(crate::Error::ResourceNotFound(_))
        ));
    }
}
