use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use tracing::*;
use url::Url;

use crate::addon::images::ImageOverrides;
use crate::addon::options::Options;
use crate::addon::{CollectorKind, Settings};
use crate::common::addon_config::ensure_addon_config;
use crate::common::apply::{create_or_update_with_addon_owner, ManagedObject};
use crate::common::is_deep_derivative;
use crate::common::orphans::clean_orphan_resources;
use crate::resources::addon::{AddOnConfig, ClusterManagementAddOn, PlacementRef};
use crate::resources::monitoring::PrometheusAgent;
use crate::{Error, Result};

use super::agent::{agent_ref, default_prometheus_agent, PrometheusAgentSsa};
use super::{agent_labels, agent_selector};

/// Collector kinds whose metrics collection is turned on
pub fn enabled_kinds(options: &Options) -> Vec<CollectorKind> {
    let mut kinds = Vec::with_capacity(2);
    if options.platform.metrics.collection_enabled {
        kinds.push(CollectorKind::Platform);
    }
    if options.user_workloads.metrics.collection_enabled {
        kinds.push(CollectorKind::UserWorkload);
    }
    kinds
}

/// One reconciliation pass of the default stack
///
/// Every placement gets a default agent per enabled collector kind, the add-on is made to
/// reference them and the agents of placements that went away are deleted, in that order.
pub async fn reconcile_default_stack(
    client: &Client,
    settings: &Settings,
    cmao: &ClusterManagementAddOn,
    options: &Options,
) -> Result<()> {
    let kinds = enabled_kinds(options);
    let placements = cmao.placement_refs();

    if !kinds.is_empty() && !placements.is_empty() {
        let hub_endpoint = options
            .platform
            .metrics
            .hub_endpoint
            .as_ref()
            .or(options.user_workloads.metrics.hub_endpoint.as_ref())
            .ok_or(Error::MissingHubEndpoint)?;
        let images = ImageOverrides::load(
            client,
            &settings.install_namespace,
            &settings.images_config_map,
        )
        .await?;

        let mut configs = Vec::with_capacity(placements.len() * kinds.len());
        for placement in &placements {
            for kind in &kinds {
                let config =
                    reconcile_agent(client, settings, cmao, placement, *kind, hub_endpoint, &images)
                        .await?;
                configs.push((placement.clone(), config));
            }
        }

        ensure_addon_config(client, &settings.addon_name, &configs).await?;
    }

    let deleted = clean_orphan_resources::<PrometheusAgent>(
        client,
        &settings.install_namespace,
        &settings.addon_name,
        &placements,
    )
    .await?;
    if !deleted.is_empty() {
        info!("Deleted orphaned PrometheusAgents: {}", deleted.join(", "));
    }

    Ok(())
}

/// The default agent found by label, if any; more than one is a misconfiguration we do not repair
pub fn select_existing_agent(mut agents: Vec<PrometheusAgent>) -> Result<Option<PrometheusAgent>> {
    match agents.len() {
        0 => Ok(None),
        1 => Ok(agents.pop()),
        _ => Err(Error::TooManyConfigurationResources(
            agents.iter().map(ResourceExt::name_any).collect(),
        )),
    }
}

/// Make sure the default agent of `kind` exists for `placement` and holds the enforced fields.
/// Returns the config reference to the agent.
pub async fn reconcile_agent(
    client: &Client,
    settings: &Settings,
    cmao: &ClusterManagementAddOn,
    placement: &PlacementRef,
    kind: CollectorKind,
    hub_endpoint: &Url,
    images: &ImageOverrides,
) -> Result<AddOnConfig> {
    let api: Api<PrometheusAgent> = Api::namespaced(client.clone(), &settings.install_namespace);
    let lp = ListParams::default().labels(&agent_selector(&settings.addon_name, kind, placement));

    let existing = match select_existing_agent(api.list(&lp).await?.items)? {
        Some(agent) => agent,
        None => {
            let agent = default_prometheus_agent(settings, placement, kind);
            info!("Creating default PrometheusAgent {}", agent_ref(&agent));
            let mut created = create_or_update_with_addon_owner(
                client,
                cmao,
                vec![ManagedObject::PrometheusAgent(agent)],
            )
            .await?;
            match created.pop() {
                Some(ManagedObject::PrometheusAgent(agent)) => agent,
                other => {
                    return Err(Error::UnsupportedType(
                        other.map(|o| o.kind()).unwrap_or_default(),
                    ))
                }
            }
        }
    };

    let labels = agent_labels(&settings.addon_name, kind, placement);
    let view = PrometheusAgentSsa {
        kind,
        addon_name: &settings.addon_name,
        hub_endpoint,
        labels: &labels,
        prometheus_image: &images.prometheus,
        kube_rbac_proxy_image: &images.kube_rbac_proxy,
        rbac_proxy_port: settings.rbac_proxy_port,
    }
    .build(&existing);

    if is_deep_derivative(
        &serde_json::to_value(&view)?,
        &serde_json::to_value(&existing)?,
    ) {
        debug!("PrometheusAgent {} is up to date", agent_ref(&existing));
    } else {
        apply_prometheus_agent(&api, &settings.addon_name, &view).await?;
    }

    Ok(AddOnConfig {
        group: PrometheusAgent::group(&()).into(),
        resource: PrometheusAgent::plural(&()).into(),
        namespace: settings.install_namespace.clone(),
        name: existing.name_any(),
    })
}

async fn apply_prometheus_agent(
    api: &Api<PrometheusAgent>,
    field_manager: &str,
    agent: &PrometheusAgent,
) -> Result<PrometheusAgent> {
    let name = agent.name_any();
    let params = PatchParams::apply(field_manager).force();
    debug!(
        "Applying PrometheusAgent {} in namespace {}",
        name,
        agent.namespace().unwrap_or_default()
    );
    Ok(api.patch(&name, &params, &Patch::Apply(agent)).await?)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::{json, Value};

    use super::*;
    use crate::addon::options::build_options;
    use crate::resources::addon::{AddOnDeploymentConfig, AddOnDeploymentConfigSpec, CustomizedVariable};
    use crate::testing::{mock_client, not_found, ApiServerVerifier};

    const NS: &str = "open-cluster-management-observability";
    const ADDON: &str = "multicluster-observability-addon";
    const AGENTS: &str =
        "/apis/monitoring.rhobs/v1alpha1/namespaces/open-cluster-management-observability/prometheusagents";
    const CMAO: &str = "/apis/addon.open-cluster-management.io/v1alpha1/clustermanagementaddons/multicluster-observability-addon";

    fn options(vars: &[(&str, &str)]) -> Options {
        let adc = AddOnDeploymentConfig::new(
            ADDON,
            AddOnDeploymentConfigSpec {
                customized_variables: Some(
                    vars.iter()
                        .map(|(name, value)| CustomizedVariable {
                            name: (*name).into(),
                            value: (*value).into(),
                        })
                        .collect(),
                ),
                ..Default::default()
            },
        );
        build_options(Some(&adc)).unwrap()
    }

    fn platform_options() -> Options {
        options(&[
            ("platformMetricsCollection", "prometheusagents.v1alpha1.monitoring.rhobs"),
            ("metricsHubHostname", "metrics.example.com"),
        ])
    }

    fn cmao_json(placements: Value) -> Value {
        json!({
            "apiVersion": "addon.open-cluster-management.io/v1alpha1",
            "kind": "ClusterManagementAddOn",
            "metadata": {"name": ADDON, "uid": "1234", "resourceVersion": "1"},
            "spec": {"installStrategy": {"type": "Placements", "placements": placements}}
        })
    }

    fn cmao(placements: Value) -> ClusterManagementAddOn {
        serde_json::from_value(cmao_json(placements)).unwrap()
    }

    fn owned_agent(kind: CollectorKind, placement: &str) -> Value {
        let placement = PlacementRef::new("ns", placement);
        let mut agent = default_prometheus_agent(&Settings::default(), &placement, kind);
        agent.metadata.owner_references = cmao(json!([])).controller_owner_ref(&()).map(|o| vec![o]);
        serde_json::to_value(agent).unwrap()
    }

    async fn respond_images(verifier: &mut ApiServerVerifier) {
        verifier
            .respond(
                "GET",
                &format!("/api/v1/namespaces/{NS}/configmaps/images-list"),
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "metadata": {"name": "images-list", "namespace": NS},
                    "data": {
                        "prometheus_operator": "quay.io/rhobs/obo-prometheus-operator:v0.80.1",
                        "prometheus_config_reloader": "quay.io/rhobs/obo-prometheus-config-reloader:v0.80.1",
                        "kube_rbac_proxy": "quay.io/brancz/kube-rbac-proxy:v0.18.0",
                        "prometheus": "quay.io/prometheus/prometheus:v2.55.0"
                    }
                }),
            )
            .await;
    }

    // list, get, create, apply; returns the created and the applied agent
    async fn respond_new_agent(verifier: &mut ApiServerVerifier, name: &str) -> (Value, Value) {
        let query = verifier.respond_list(AGENTS, "PrometheusAgent", vec![]).await;
        assert!(query.contains("labelSelector"));
        verifier
            .respond("GET", &format!("{AGENTS}/{name}"), StatusCode::NOT_FOUND, not_found(name))
            .await;
        let created = verifier.echo("POST", AGENTS).await;
        let applied = verifier.echo("PATCH", &format!("{AGENTS}/{name}")).await;
        (created, applied)
    }

    #[test]
    fn test_select_existing_agent() {
        let agent = |name: &str| PrometheusAgent::new(name, Default::default());
        assert!(select_existing_agent(vec![]).unwrap().is_none());
        assert_eq!(
            select_existing_agent(vec![agent("a")]).unwrap().unwrap().name_any(),
            "a"
        );
        match select_existing_agent(vec![agent("a"), agent("b")]) {
            Err(Error::TooManyConfigurationResources(names)) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_enabled_kinds() {
        assert!(enabled_kinds(&Options::default()).is_empty());
        assert_eq!(enabled_kinds(&platform_options()), vec![CollectorKind::Platform]);
    }

    #[tokio::test]
    async fn test_platform_only() {
        let (client, mut verifier) = mock_client();
        let cmao = cmao(json!([{"namespace": "ns", "name": "p1"}]));
        let task = tokio::spawn(async move {
            reconcile_default_stack(&client, &Settings::default(), &cmao, &platform_options()).await
        });

        respond_images(&mut verifier).await;
        let name = "mcoa-default-platform-metrics-collector-p1";
        let (created, applied) = respond_new_agent(&mut verifier, name).await;
        assert_eq!(created["metadata"]["ownerReferences"][0]["name"], ADDON);
        assert_eq!(created["metadata"]["labels"]["placement-ref-name"], "p1");
        assert_eq!(
            applied["spec"]["remoteWrite"][0]["url"],
            "https://metrics.example.com/api/metrics/v1/default/api/v1/receive"
        );
        assert_eq!(applied["spec"]["image"], "quay.io/prometheus/prometheus:v2.55.0");

        verifier
            .respond("GET", CMAO, StatusCode::OK, cmao_json(json!([{"namespace": "ns", "name": "p1"}])))
            .await;
        let updated = verifier.echo("PUT", CMAO).await;
        assert_eq!(
            updated["spec"]["installStrategy"]["placements"][0]["configs"],
            json!([{
                "group": "monitoring.rhobs",
                "resource": "prometheusagents",
                "namespace": NS,
                "name": name
            }])
        );

        verifier
            .respond_list(AGENTS, "PrometheusAgent", vec![applied])
            .await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_platform_and_user_workloads() {
        let (client, mut verifier) = mock_client();
        let cmao = cmao(json!([{"namespace": "ns", "name": "p1"}]));
        let options = options(&[
            ("platformMetricsCollection", "prometheusagents.v1alpha1.monitoring.rhobs"),
            ("userWorkloadMetricsCollection", "prometheusagents.v1alpha1.monitoring.rhobs"),
            ("metricsHubHostname", "metrics.example.com"),
        ]);
        let task = tokio::spawn(async move {
            reconcile_default_stack(&client, &Settings::default(), &cmao, &options).await
        });

        respond_images(&mut verifier).await;
        let (platform, _) =
            respond_new_agent(&mut verifier, "mcoa-default-platform-metrics-collector-p1").await;
        assert!(platform["spec"].get("scrapeConfigNamespaceSelector").is_none());
        let (uwl, applied) =
            respond_new_agent(&mut verifier, "mcoa-default-user-workload-metrics-collector-p1").await;
        assert_eq!(uwl["spec"]["scrapeConfigNamespaceSelector"], json!({}));
        assert_eq!(applied["spec"]["serviceAccountName"], "user-workload-metrics-collector");

        verifier
            .respond("GET", CMAO, StatusCode::OK, cmao_json(json!([{"namespace": "ns", "name": "p1"}])))
            .await;
        let updated = verifier.echo("PUT", CMAO).await;
        assert_eq!(
            updated["spec"]["installStrategy"]["placements"][0]["configs"]
                .as_array()
                .map(Vec::len),
            Some(2)
        );

        verifier.respond_list(AGENTS, "PrometheusAgent", vec![]).await;
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_orphaned_agent_is_deleted() {
        let (client, mut verifier) = mock_client();
        let p1_config = json!({
            "group": "monitoring.rhobs",
            "resource": "prometheusagents",
            "namespace": NS,
            "name": "mcoa-default-platform-metrics-collector-p1"
        });
        let placements = json!([{"namespace": "ns", "name": "p1", "configs": [p1_config]}]);
        let cmao = cmao(placements.clone());
        let task = tokio::spawn(async move {
            reconcile_default_stack(&client, &Settings::default(), &cmao, &platform_options()).await
        });

        respond_images(&mut verifier).await;
        let p1 = owned_agent(CollectorKind::Platform, "p1");
        let p2 = owned_agent(CollectorKind::Platform, "p2");
        verifier
            .respond_list(AGENTS, "PrometheusAgent", vec![p1.clone()])
            .await;
        verifier
            .echo("PATCH", &format!("{AGENTS}/mcoa-default-platform-metrics-collector-p1"))
            .await;
        // already referenced, so no update
        verifier
            .respond("GET", CMAO, StatusCode::OK, cmao_json(placements))
            .await;
        verifier
            .respond_list(AGENTS, "PrometheusAgent", vec![p1, p2.clone()])
            .await;
        verifier
            .respond(
                "DELETE",
                &format!("{AGENTS}/mcoa-default-platform-metrics-collector-p2"),
                StatusCode::OK,
                p2,
            )
            .await;

        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_agents() {
        let (client, mut verifier) = mock_client();
        let cmao = cmao(json!([{"namespace": "ns", "name": "p1"}]));
        let task = tokio::spawn(async move {
            reconcile_default_stack(&client, &Settings::default(), &cmao, &platform_options()).await
        });

        respond_images(&mut verifier).await;
        let mut copy = owned_agent(CollectorKind::Platform, "p1");
        copy["metadata"]["name"] = json!("copy");
        verifier
            .respond_list(
                AGENTS,
                "PrometheusAgent",
                vec![owned_agent(CollectorKind::Platform, "p1"), copy],
            )
            .await;
        drop(verifier);

        match task.await.unwrap() {
            Err(Error::TooManyConfigurationResources(names)) => assert_eq!(
                names,
                vec!["mcoa-default-platform-metrics-collector-p1", "copy"]
            ),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_hub_endpoint() {
        let (client, _verifier) = mock_client();
        let cmao = cmao(json!([{"namespace": "ns", "name": "p1"}]));
        let options = options(&[(
            "platformMetricsCollection",
            "prometheusagents.v1alpha1.monitoring.rhobs",
        )]);
        let result = reconcile_default_stack(&client, &Settings::default(), &cmao, &options).await;
        assert!(matches!(result, Err(Error::MissingHubEndpoint)));
    }
}
