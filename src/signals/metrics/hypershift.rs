use std::collections::BTreeMap;

use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, warn};

use crate::addon::HCP_COMPONENT_LABEL;
use crate::resources::hypershift::HostedCluster;
use crate::resources::monitoring::{
    Endpoint, PrometheusRule, RelabelConfig, ScrapeConfig, ServiceMonitor, ServiceMonitorSpec,
};
use crate::{Error, Result};

use super::promql::collection_dependent_metrics;

const SCRAPE_INTERVAL: &str = "30s";

/// Hosted control-plane components whose metrics are federated to the hub
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HcpComponent {
    Etcd,
    KubeApiServer,
}

impl HcpComponent {
    pub const ALL: [HcpComponent; 2] = [HcpComponent::Etcd, HcpComponent::KubeApiServer];

    /// Value of the hcp-component label routing scrape configs and rules to the component
    pub fn label_value(&self) -> &'static str {
        match self {
            HcpComponent::Etcd => "etcd",
            HcpComponent::KubeApiServer => "kube-apiserver",
        }
    }

    pub fn from_label_value(value: &str) -> Option<Self> {
        HcpComponent::ALL
            .into_iter()
            .find(|c| c.label_value() == value)
    }

    /// Name of the service monitor hypershift creates in the control-plane namespace
    fn source_monitor_name(&self) -> &'static str {
        self.label_value()
    }

    pub fn monitor_name(&self) -> String {
        format!("acm-{}", self.label_value())
    }

    fn job(&self) -> &'static str {
        match self {
            HcpComponent::Etcd => "etcd",
            HcpComponent::KubeApiServer => "apiserver",
        }
    }
}

/// The scrape configs and recording rules a user authored for one control-plane component
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionConfig {
    pub scrape_configs: Vec<ScrapeConfig>,
    pub rules: Vec<PrometheusRule>,
}

impl CollectionConfig {
    pub fn is_empty(&self) -> bool {
        self.scrape_configs.is_empty() && self.rules.is_empty()
    }
}

/// Name and id of a cluster, as written into the relabelled series
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterIdentity {
    pub name: String,
    pub id: String,
}

/// What the fan-out produces for a hypershift host
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HypershiftOutput {
    pub service_monitors: Vec<ServiceMonitor>,
    pub scrape_configs: Vec<ScrapeConfig>,
    pub rules: Vec<PrometheusRule>,
}

pub struct HypershiftBuilder<'a> {
    pub client: &'a Client,
    pub host: ClusterIdentity,
}

impl HypershiftBuilder<'_> {
    /// Emit, for every hosted cluster, a service monitor per component restricted to the metrics
    /// the component's scrape configs and rules depend on
    pub async fn build(
        &self,
        etcd: &CollectionConfig,
        apiserver: &CollectionConfig,
    ) -> Result<HypershiftOutput> {
        let datasets = [
            (
                HcpComponent::Etcd,
                collection_dependent_metrics(&etcd.scrape_configs, &etcd.rules)?,
            ),
            (
                HcpComponent::KubeApiServer,
                collection_dependent_metrics(&apiserver.scrape_configs, &apiserver.rules)?,
            ),
        ];

        let mut output = HypershiftOutput::default();
        for collection in [etcd, apiserver] {
            output.scrape_configs.extend(
                collection
                    .scrape_configs
                    .iter()
                    .map(|sc| propagate_scrape_config(sc, &self.host.id)),
            );
            output.rules.extend(collection.rules.iter().cloned());
        }

        let hosted_clusters = Api::<HostedCluster>::all(self.client.clone())
            .list(&ListParams::default())
            .await?;

        for hc in hosted_clusters {
            if hc.spec.cluster_id.is_empty() {
                warn!(
                    "Skipping HostedCluster {}/{} without a cluster ID",
                    hc.namespace().unwrap_or_default(),
                    hc.name_any()
                );
                continue;
            }
            let namespace = control_plane_namespace(&hc);
            let hosted = ClusterIdentity {
                name: hc.name_any(),
                id: hc.spec.cluster_id.clone(),
            };

            for (component, metrics) in &datasets {
                if metrics.is_empty() {
                    debug!(
                        "No metrics to federate for {} of HostedCluster {}",
                        component.label_value(),
                        hosted.name
                    );
                    continue;
                }
                let Some(source) = self.source_monitor(*component, &namespace).await? else {
                    warn!(
                        "ServiceMonitor {}/{} not found, skipping {} of HostedCluster {}",
                        namespace,
                        component.source_monitor_name(),
                        component.label_value(),
                        hosted.name
                    );
                    continue;
                };
                output.service_monitors.push(build_service_monitor(
                    *component,
                    &source,
                    &namespace,
                    metrics,
                    &hosted,
                    &self.host,
                ));
            }
        }

        Ok(output)
    }

    // the monitors hypershift authors are prometheus-operator ones, not the observability operator's
    async fn source_monitor(
        &self,
        component: HcpComponent,
        namespace: &str,
    ) -> Result<Option<ServiceMonitorSpec>> {
        let gvk = GroupVersionKind::gvk("monitoring.coreos.com", "v1", "ServiceMonitor");
        let ar = ApiResource::from_gvk_with_plural(&gvk, "servicemonitors");
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let Some(obj) = api.get_opt(component.source_monitor_name()).await? else {
            return Ok(None);
        };
        let spec = obj
            .data
            .get("spec")
            .cloned()
            .ok_or(Error::MissingObjectKey(".spec"))?;
        Ok(Some(serde_json::from_value(spec)?))
    }
}

/// Namespace hypershift runs the control plane of a hosted cluster in
pub fn control_plane_namespace(hc: &HostedCluster) -> String {
    format!("{}-{}", hc.namespace().unwrap_or_default(), hc.name_any())
}

fn keep(source_label: &str, regex: impl Into<String>) -> RelabelConfig {
    RelabelConfig {
        source_labels: Some(vec![source_label.into()]),
        regex: Some(regex.into()),
        action: Some("keep".into()),
        ..Default::default()
    }
}

fn replace(target_label: &str, replacement: &str) -> RelabelConfig {
    RelabelConfig {
        target_label: Some(target_label.into()),
        replacement: Some(replacement.into()),
        action: Some("replace".into()),
        ..Default::default()
    }
}

/// Derive the service monitor scraping `component` of a hosted cluster from the one hypershift
/// authored, keeping only `metrics` and attributing the series to the hosted cluster
pub fn build_service_monitor(
    component: HcpComponent,
    source: &ServiceMonitorSpec,
    namespace: &str,
    metrics: &[String],
    hosted: &ClusterIdentity,
    host: &ClusterIdentity,
) -> ServiceMonitor {
    let metric_relabelings = vec![
        keep("__name__", format!("({})", metrics.join("|"))),
        replace("clusterID", &hosted.id),
        replace("cluster", &hosted.name),
        replace("managementclusterID", &host.id),
        replace("managementcluster", &host.name),
    ];

    let endpoints = source
        .endpoints
        .iter()
        .map(|ep| Endpoint {
            port: ep.port.clone(),
            target_port: ep.target_port.clone(),
            scheme: ep.scheme.clone(),
            tls_config: ep.tls_config.clone(),
            interval: Some(SCRAPE_INTERVAL.into()),
            bearer_token_secret: None,
            metric_relabelings: Some(metric_relabelings.clone()),
            relabelings: Some(vec![replace("job", component.job())]),
            ..Default::default()
        })
        .collect();

    let mut sm = ServiceMonitor::new(
        &component.monitor_name(),
        ServiceMonitorSpec {
            job_label: None,
            selector: source.selector.clone(),
            namespace_selector: source.namespace_selector.clone(),
            endpoints,
        },
    );
    sm.metadata.namespace = Some(namespace.into());
    sm.metadata.labels = Some(BTreeMap::from([(
        HCP_COMPONENT_LABEL.to_string(),
        component.label_value().to_string(),
    )]));
    sm
}

/// Restrict a user scrape config to series attributed to a hosted cluster of this host
pub fn propagate_scrape_config(sc: &ScrapeConfig, host_id: &str) -> ScrapeConfig {
    let mut sc = sc.clone();
    sc.spec
        .relabelings
        .get_or_insert_with(Vec::new)
        .extend([keep("clusterID", ".+"), keep("managementclusterID", host_id)]);
    sc
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::resources::monitoring::ScrapeConfigSpec;
    use crate::testing::{mock_client, not_found};

    fn host() -> ClusterIdentity {
        ClusterIdentity {
            name: "local-cluster".into(),
            id: "host-id".into(),
        }
    }

    fn federate(name: &str, query: &str) -> ScrapeConfig {
        let mut sc = ScrapeConfig::new(
            name,
            ScrapeConfigSpec {
                params: Some(BTreeMap::from([(
                    "match[]".to_string(),
                    vec![query.to_string()],
                )])),
                ..Default::default()
            },
        );
        sc.metadata.namespace = Some("open-cluster-management-observability".into());
        sc
    }

    fn source_monitor() -> serde_json::Value {
        json!({
            "apiVersion": "monitoring.coreos.com/v1",
            "kind": "ServiceMonitor",
            "metadata": {"name": "etcd", "namespace": "hc-h"},
            "spec": {
                "selector": {"matchLabels": {"app": "etcd"}},
                "namespaceSelector": {"matchNames": ["hc-h"]},
                "endpoints": [{
                    "port": "metrics",
                    "scheme": "https",
                    "interval": "15s",
                    "bearerTokenSecret": {"name": "token", "key": "token"},
                    "tlsConfig": {
                        "serverName": "etcd-client",
                        "ca": {"configMap": {"name": "etcd-ca", "key": "ca.crt"}}
                    }
                }]
            }
        })
    }

    #[test]
    fn test_build_service_monitor() {
        let source: ServiceMonitorSpec =
            serde_json::from_value(source_monitor()["spec"].clone()).unwrap();
        let hosted = ClusterIdentity {
            name: "h".into(),
            id: "xyz".into(),
        };
        let sm = build_service_monitor(
            HcpComponent::KubeApiServer,
            &source,
            "hc-h",
            &["apiserver_request_total".to_string(), "up".to_string()],
            &hosted,
            &host(),
        );

        assert_eq!(sm.name_any(), "acm-kube-apiserver");
        assert_eq!(sm.namespace().as_deref(), Some("hc-h"));
        assert_eq!(sm.spec.selector, source.selector);
        let ep = &sm.spec.endpoints[0];
        assert_eq!(ep.interval.as_deref(), Some("30s"));
        assert_eq!(ep.bearer_token_secret, None);
        assert_eq!(ep.tls_config, source.endpoints[0].tls_config);

        let relabelings = ep.metric_relabelings.as_ref().unwrap();
        assert_eq!(
            relabelings[0].regex.as_deref(),
            Some("(apiserver_request_total|up)")
        );
        let replaced: Vec<(&str, &str)> = relabelings[1..]
            .iter()
            .map(|r| {
                (
                    r.target_label.as_deref().unwrap(),
                    r.replacement.as_deref().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            replaced,
            vec![
                ("clusterID", "xyz"),
                ("cluster", "h"),
                ("managementclusterID", "host-id"),
                ("managementcluster", "local-cluster"),
            ]
        );
        let job = &ep.relabelings.as_ref().unwrap()[0];
        assert_eq!(job.target_label.as_deref(), Some("job"));
        assert_eq!(job.replacement.as_deref(), Some("apiserver"));
    }

    #[test]
    fn test_propagate_scrape_config() {
        let sc = federate("etcd-federate", r#"{__name__="up"}"#);
        let propagated = propagate_scrape_config(&sc, "host-id");
        assert_eq!(propagated.spec.metric_relabelings, sc.spec.metric_relabelings);
        let filters = propagated.spec.relabelings.unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], keep("clusterID", ".+"));
        assert_eq!(filters[1].source_labels, Some(vec!["managementclusterID".to_string()]));
        assert_eq!(filters[1].regex.as_deref(), Some("host-id"));
        assert_eq!(propagated.spec.params, sc.spec.params);

        let mut sc = sc;
        sc.spec.relabelings = Some(vec![keep("job", "etcd")]);
        let filters = propagate_scrape_config(&sc, "host-id").spec.relabelings.unwrap();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[0], keep("job", "etcd"));
        assert_eq!(filters[1], keep("clusterID", ".+"));
    }

    #[tokio::test]
    async fn test_hosted_cluster_fan_out() {
        let (client, mut verifier) = mock_client();
        let etcd = CollectionConfig {
            scrape_configs: vec![federate(
                "etcd-federate",
                r#"{__name__="acm_managed_cluster_labels"}"#,
            )],
            rules: vec![],
        };
        let task = tokio::spawn(async move {
            let builder = HypershiftBuilder {
                client: &client,
                host: host(),
            };
            builder.build(&etcd, &CollectionConfig::default()).await
        });

        verifier
            .respond_list(
                "/apis/hypershift.openshift.io/v1beta1/hostedclusters",
                "HostedCluster",
                vec![
                    json!({
                        "apiVersion": "hypershift.openshift.io/v1beta1",
                        "kind": "HostedCluster",
                        "metadata": {"name": "h", "namespace": "hc"},
                        "spec": {"clusterID": "xyz"}
                    }),
                    json!({
                        "apiVersion": "hypershift.openshift.io/v1beta1",
                        "kind": "HostedCluster",
                        "metadata": {"name": "pending", "namespace": "hc"},
                        "spec": {}
                    }),
                ],
            )
            .await;
        verifier
            .respond(
                "GET",
                "/apis/monitoring.coreos.com/v1/namespaces/hc-h/servicemonitors/etcd",
                StatusCode::OK,
                source_monitor(),
            )
            .await;

        let output = task.await.unwrap().unwrap();
        assert_eq!(output.service_monitors.len(), 1);
        let sm = &output.service_monitors[0];
        assert_eq!(sm.name_any(), "acm-etcd");
        assert_eq!(sm.namespace().as_deref(), Some("hc-h"));
        let relabelings = sm.spec.endpoints[0].metric_relabelings.as_ref().unwrap();
        assert_eq!(
            relabelings[0].regex.as_deref(),
            Some("(acm_managed_cluster_labels)")
        );
        assert_eq!(relabelings[1].replacement.as_deref(), Some("xyz"));
        assert_eq!(relabelings[2].replacement.as_deref(), Some("h"));
        assert_eq!(relabelings[3].replacement.as_deref(), Some("host-id"));
        assert_eq!(relabelings[4].replacement.as_deref(), Some("local-cluster"));

        assert_eq!(output.scrape_configs.len(), 1);
        assert_eq!(
            output.scrape_configs[0]
                .spec
                .relabelings
                .as_ref()
                .map(Vec::len),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_missing_source_monitor_is_skipped() {
        let (client, mut verifier) = mock_client();
        let apiserver = CollectionConfig {
            scrape_configs: vec![federate(
                "apiserver-federate",
                r#"{__name__="apiserver_request_total"}"#,
            )],
            rules: vec![],
        };
        let task = tokio::spawn(async move {
            let builder = HypershiftBuilder {
                client: &client,
                host: host(),
            };
            builder.build(&CollectionConfig::default(), &apiserver).await
        });

        verifier
            .respond_list(
                "/apis/hypershift.openshift.io/v1beta1/hostedclusters",
                "HostedCluster",
                vec![json!({
                    "apiVersion": "hypershift.openshift.io/v1beta1",
                    "kind": "HostedCluster",
                    "metadata": {"name": "h", "namespace": "hc"},
                    "spec": {"clusterID": "xyz"}
                })],
            )
            .await;
        verifier
            .respond(
                "GET",
                "/apis/monitoring.coreos.com/v1/namespaces/hc-h/servicemonitors/kube-apiserver",
                StatusCode::NOT_FOUND,
                not_found("kube-apiserver"),
            )
            .await;

        let output = task.await.unwrap().unwrap();
        assert!(output.service_monitors.is_empty());
        assert_eq!(output.scrape_configs.len(), 1);
    }

    #[tokio::test]
    async fn test_parse_error_propagates() {
        let (client, _verifier) = mock_client();
        let etcd = CollectionConfig {
            scrape_configs: vec![federate("broken", "{__name__=")],
            rules: vec![],
        };
        let builder = HypershiftBuilder {
            client: &client,
            host: host(),
        };
        assert!(matches!(
            builder.build(&etcd, &CollectionConfig::default()).await,
            Err(Error::PromQLParse { .. })
        ));
    }

    #[test]
    fn test_component_labels() {
        assert_eq!(
            HcpComponent::from_label_value("kube-apiserver"),
            Some(HcpComponent::KubeApiServer)
        );
        assert_eq!(HcpComponent::from_label_value("etcd"), Some(HcpComponent::Etcd));
        assert_eq!(HcpComponent::from_label_value("oauth"), None);
    }
}
