use std::fmt::Debug;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::resources::addon::{AddOnDeploymentConfig, ManagedClusterAddOn};
use crate::resources::logging::{ClusterLogForwarder, LokiStack};
use crate::resources::monitoring::{PrometheusAgent, PrometheusRule, ScrapeConfig};
use crate::resources::otel::{Instrumentation, OpenTelemetryCollector};
use crate::resources::uiplugins::UIPlugin;
use crate::{Error, Result};

use super::has_addon_owner_ref;

/// A resource type that can be referenced from a ManagedClusterAddOn's config references
pub trait ConfigResource:
    Resource<DynamicType = ()> + Clone + DeserializeOwned + serde::Serialize + Debug
{
    /// Api for the resource; cluster-scoped types ignore the namespace
    fn api(client: Client, namespace: &str) -> Api<Self>;

    /// API group, as written in config references
    fn config_group() -> String {
        <Self as Resource>::group(&()).into_owned()
    }

    /// Plural resource name, as written in config references
    fn config_resource() -> String {
        <Self as Resource>::plural(&()).into_owned()
    }
}

macro_rules! namespaced_config_resource {
    ($($t:ty),* $(,)?) => {
        $(
            impl ConfigResource for $t {
                fn api(client: Client, namespace: &str) -> Api<Self> {
                    Api::namespaced(client, namespace)
                }
            }
        )*
    };
}

namespaced_config_resource!(
    AddOnDeploymentConfig,
    PrometheusAgent,
    ScrapeConfig,
    PrometheusRule,
    ClusterLogForwarder,
    LokiStack,
    OpenTelemetryCollector,
    Instrumentation,
    ConfigMap,
    Secret,
);

impl ConfigResource for UIPlugin {
    fn api(client: Client, _namespace: &str) -> Api<Self> {
        Api::all(client)
    }
}

/// Fetch every resource of type `K` referenced by the add-on, failing if one does not exist
pub async fn get_referenced<K: ConfigResource>(
    client: &Client,
    mcao: &ManagedClusterAddOn,
) -> Result<Vec<K>> {
    let (group, resource) = (K::config_group(), K::config_resource());
    let mut found = Vec::new();
    for reference in mcao
        .config_references()
        .iter()
        .filter(|r| r.group == group && r.resource == resource)
    {
        let (namespace, name) = reference.referent();
        let obj = K::api(client.clone(), namespace)
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::ResourceNotFound(format!("{resource} {namespace}/{name}")))?;
        found.push(obj);
    }
    Ok(found)
}

/// Fetch every referenced resource of type `K` owned by the ClusterManagementAddOn
pub async fn get_resources_with_owner_ref<K: ConfigResource>(
    client: &Client,
    mcao: &ManagedClusterAddOn,
    addon_name: &str,
) -> Result<Vec<K>> {
    let referenced: Vec<K> = get_referenced(client, mcao).await?;
    if referenced.is_empty() {
        return Err(Error::MissingResourceReference(K::config_resource()));
    }
    let owned: Vec<K> = referenced
        .into_iter()
        .filter(|obj| has_addon_owner_ref(obj, addon_name))
        .collect();
    if owned.is_empty() {
        return Err(Error::NoResourceOwnedByAddon);
    }
    Ok(owned)
}

/// The first referenced resource of type `K` owned by the ClusterManagementAddOn
pub async fn get_resource_with_owner_ref<K: ConfigResource>(
    client: &Client,
    mcao: &ManagedClusterAddOn,
    addon_name: &str,
) -> Result<K> {
    let mut owned = get_resources_with_owner_ref::<K>(client, mcao, addon_name).await?;
    Ok(owned.remove(0))
}

async fn get_with_fallback<K: ConfigResource>(
    client: &Client,
    namespace: &str,
    fallback_namespace: &str,
    names: &[String],
) -> Result<Vec<K>> {
    let mut found = Vec::with_capacity(names.len());
    for name in names {
        if let Some(obj) = K::api(client.clone(), namespace).get_opt(name).await? {
            found.push(obj);
            continue;
        }
        debug!(
            "{} {} not found in namespace {}, trying {}",
            K::kind(&()),
            name,
            namespace,
            fallback_namespace
        );
        let obj = K::api(client.clone(), fallback_namespace)
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::ResourceNotFound(format!("{} {name}", K::kind(&()))))?;
        found.push(obj);
    }
    Ok(found)
}

/// Look up config maps in the cluster namespace first, then in the configuration namespace
pub async fn get_config_maps(
    client: &Client,
    namespace: &str,
    fallback_namespace: &str,
    names: &[String],
) -> Result<Vec<ConfigMap>> {
    get_with_fallback(client, namespace, fallback_namespace, names).await
}

/// Look up secrets in the cluster namespace first, then in the configuration namespace
pub async fn get_secrets(
    client: &Client,
    namespace: &str,
    fallback_namespace: &str,
    names: &[String],
) -> Result<Vec<Secret>> {
    get_with_fallback(client, namespace, fallback_namespace, names).await
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::resources::addon::{
        ConfigReference, ConfigSpecHash, ManagedClusterAddOnSpec, ManagedClusterAddOnStatus,
    };
    use crate::testing::{mock_client, not_found};

    const ADDON: &str = "multicluster-observability-addon";

    fn mcao(references: Vec<ConfigReference>) -> ManagedClusterAddOn {
        let mut mcao = ManagedClusterAddOn::new(ADDON, ManagedClusterAddOnSpec::default());
        mcao.metadata.namespace = Some("spoke-1".into());
        mcao.status = Some(ManagedClusterAddOnStatus {
            conditions: None,
            config_references: Some(references),
        });
        mcao
    }

    fn agent_reference(name: &str) -> ConfigReference {
        ConfigReference {
            group: "monitoring.rhobs".into(),
            resource: "prometheusagents".into(),
            desired_config: Some(ConfigSpecHash {
                namespace: "open-cluster-management-observability".into(),
                name: name.into(),
                spec_hash: "abc".into(),
            }),
            ..Default::default()
        }
    }

    fn agent(name: &str, owned: bool) -> serde_json::Value {
        let owners = if owned {
            json!([{
                "apiVersion": "addon.open-cluster-management.io/v1alpha1",
                "kind": "ClusterManagementAddOn",
                "name": ADDON,
                "uid": "1234",
                "controller": true
            }])
        } else {
            json!([])
        };
        json!({
            "apiVersion": "monitoring.rhobs/v1alpha1",
            "kind": "PrometheusAgent",
            "metadata": {
                "name": name,
                "namespace": "open-cluster-management-observability",
                "ownerReferences": owners
            },
            "spec": {}
        })
    }

    #[tokio::test]
    async fn test_missing_reference() {
        let (client, _verifier) = mock_client();
        let result =
            get_resource_with_owner_ref::<PrometheusAgent>(&client, &mcao(vec![]), ADDON).await;
        assert!(matches!(result, Err(Error::MissingResourceReference(_))));
    }

    #[tokio::test]
    async fn test_first_owned_reference_wins() {
        let (client, mut verifier) = mock_client();
        let mcao = mcao(vec![agent_reference("user-agent"), agent_reference("default-agent")]);
        let task = tokio::spawn(async move {
            get_resource_with_owner_ref::<PrometheusAgent>(&client, &mcao, ADDON).await
        });

        let path = "/apis/monitoring.rhobs/v1alpha1/namespaces/open-cluster-management-observability/prometheusagents";
        verifier
            .respond("GET", &format!("{path}/user-agent"), StatusCode::OK, agent("user-agent", false))
            .await;
        verifier
            .respond("GET", &format!("{path}/default-agent"), StatusCode::OK, agent("default-agent", true))
            .await;

        let found = task.await.unwrap().unwrap();
        assert_eq!(found.metadata.name.as_deref(), Some("default-agent"));
    }

    #[tokio::test]
    async fn test_no_owned_reference() {
        let (client, mut verifier) = mock_client();
        let mcao = mcao(vec![agent_reference("user-agent")]);
        let task = tokio::spawn(async move {
            get_resource_with_owner_ref::<PrometheusAgent>(&client, &mcao, ADDON).await
        });
        verifier
            .respond(
                "GET",
                "/apis/monitoring.rhobs/v1alpha1/namespaces/open-cluster-management-observability/prometheusagents/user-agent",
                StatusCode::OK,
                agent("user-agent", false),
            )
            .await;
        assert!(matches!(
            task.await.unwrap(),
            Err(Error::NoResourceOwnedByAddon)
        ));
    }

    #[tokio::test]
    async fn test_referenced_resource_not_found() {
        let (client, mut verifier) = mock_client();
        let mcao = mcao(vec![agent_reference("gone")]);
        let task = tokio::spawn(async move {
            get_resource_with_owner_ref::<PrometheusAgent>(&client, &mcao, ADDON).await
        });
        verifier
            .respond(
                "GET",
                "/apis/monitoring.rhobs/v1alpha1/namespaces/open-cluster-management-observability/prometheusagents/gone",
                StatusCode::NOT_FOUND,
                not_found("gone"),
            )
            .await;
        assert!(matches!(task.await.unwrap(), Err(Error::ResourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_secret_namespace_fallback() {
        let (client, mut verifier) = mock_client();
        let task = tokio::spawn(async move {
            get_secrets(
                &client,
                "spoke-1",
                "open-cluster-management-observability",
                &["hub-ca".to_string(), "missing".to_string()],
            )
            .await
        });

        verifier
            .respond(
                "GET",
                "/api/v1/namespaces/spoke-1/secrets/hub-ca",
                StatusCode::NOT_FOUND,
                not_found("hub-ca"),
            )
            .await;
        verifier
            .respond(
                "GET",
                "/api/v1/namespaces/open-cluster-management-observability/secrets/hub-ca",
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {"name": "hub-ca", "namespace": "open-cluster-management-observability"},
                    "data": {"ca.crt": "Zm9v"}
                }),
            )
            .await;
        verifier
            .respond("GET", "/api/v1/namespaces/spoke-1/secrets/missing", StatusCode::NOT_FOUND, not_found("missing"))
            .await;
        verifier
            .respond(
                "GET",
                "/api/v1/namespaces/open-cluster-management-observability/secrets/missing",
                StatusCode::NOT_FOUND,
                not_found("missing"),
            )
            .await;

        match task.await.unwrap() {
            Err(Error::ResourceNotFound(what)) => assert!(what.contains("missing")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
