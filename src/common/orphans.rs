use kube::api::{DeleteParams, ListParams};
use kube::{Client, Resource, ResourceExt};
use tracing::*;

use crate::addon::{PLACEMENT_REF_NAMESPACE_LABEL, PLACEMENT_REF_NAME_LABEL};
use crate::resources::addon::PlacementRef;
use crate::Result;

use super::has_addon_owner_ref;
use super::references::ConfigResource;

/// An object is orphaned when the add-on owns it but its placement labels match none of the
/// add-on's current placements
pub fn is_orphan<K: Resource>(obj: &K, addon_name: &str, placements: &[PlacementRef]) -> bool {
    if !has_addon_owner_ref(obj, addon_name) {
        return false;
    }

    let labels = obj.labels();
    let name = labels.get(PLACEMENT_REF_NAME_LABEL).map(String::as_str);
    let namespace = labels
        .get(PLACEMENT_REF_NAMESPACE_LABEL)
        .map(String::as_str);

    !placements
        .iter()
        .any(|p| name == Some(p.name.as_str()) && namespace == Some(p.namespace.as_str()))
}

/// Delete the add-on owned objects of type `K` in `namespace` whose placement no longer exists.
/// Returns the names of the deleted objects.
pub async fn clean_orphan_resources<K: ConfigResource>(
    client: &Client,
    namespace: &str,
    addon_name: &str,
    placements: &[PlacementRef],
) -> Result<Vec<String>> {
    let api = K::api(client.clone(), namespace);
    let mut deleted = Vec::new();

    for obj in api.list(&ListParams::default()).await? {
        if !is_orphan(&obj, addon_name, placements) {
            continue;
        }

        let name = obj.name_any();
        info!(
            "Deleting orphaned {} {} in namespace {}",
            K::kind(&()),
            name,
            namespace
        );
        match api.delete(&name, &DeleteParams::default()).await {
            Err(kube::Error::Api(kube::error::ErrorResponse { code: 404, .. })) => {}
            Err(err) => return Err(err.into()),
            Ok(_) => {}
        }
        deleted.push(name);
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::resources::monitoring::{PrometheusAgent, PrometheusAgentSpec};
    use crate::testing::{mock_client, not_found};

    const ADDON: &str = "multicluster-observability-addon";
    const NS: &str = "open-cluster-management-observability";

    fn owner() -> serde_json::Value {
        json!([{
            "apiVersion": "addon.open-cluster-management.io/v1alpha1",
            "kind": "ClusterManagementAddOn",
            "name": ADDON,
            "uid": "1234",
            "controller": true
        }])
    }

    fn agent(name: &str, placement: &str, owned: bool) -> serde_json::Value {
        let owners = if owned { owner() } else { json!([]) };
        json!({
            "apiVersion": "monitoring.rhobs/v1alpha1",
            "kind": "PrometheusAgent",
            "metadata": {
                "name": name,
                "namespace": NS,
                "labels": {
                    "placement-ref-name": placement,
                    "placement-ref-namespace": "open-cluster-management-global-set"
                },
                "ownerReferences": owners
            },
            "spec": {}
        })
    }

    #[test]
    fn test_is_orphan() {
        let placements = vec![PlacementRef::new("open-cluster-management-global-set", "p1")];

        let kept: PrometheusAgent = serde_json::from_value(agent("a", "p1", true)).unwrap();
        assert!(!is_orphan(&kept, ADDON, &placements));

        let orphan: PrometheusAgent = serde_json::from_value(agent("b", "p2", true)).unwrap();
        assert!(is_orphan(&orphan, ADDON, &placements));
        assert!(is_orphan(&orphan, ADDON, &[]));

        let foreign: PrometheusAgent = serde_json::from_value(agent("c", "p2", false)).unwrap();
        assert!(!is_orphan(&foreign, ADDON, &placements));

        // same name, other namespace
        let mut moved = kept.clone();
        moved.labels_mut().insert(
            PLACEMENT_REF_NAMESPACE_LABEL.into(),
            "elsewhere".into(),
        );
        assert!(is_orphan(&moved, ADDON, &placements));

        let mut unlabelled = PrometheusAgent::new("d", PrometheusAgentSpec::default());
        unlabelled.metadata.owner_references = serde_json::from_value(owner()).unwrap();
        unlabelled.metadata.labels = Some(BTreeMap::new());
        assert!(is_orphan(&unlabelled, ADDON, &placements));
    }

    #[tokio::test]
    async fn test_clean_orphan_resources() {
        let (client, mut verifier) = mock_client();
        let placements = vec![PlacementRef::new("open-cluster-management-global-set", "p1")];
        let task = tokio::spawn(async move {
            clean_orphan_resources::<PrometheusAgent>(&client, NS, ADDON, &placements).await
        });

        let path = format!("/apis/monitoring.rhobs/v1alpha1/namespaces/{NS}/prometheusagents");
        verifier
            .respond_list(
                &path,
                "PrometheusAgent",
                vec![
                    agent("kept", "p1", true),
                    agent("orphan", "p2", true),
                    agent("gone", "p3", true),
                    agent("user", "p2", false),
                ],
            )
            .await;
        verifier
            .respond("DELETE", &format!("{path}/orphan"), StatusCode::OK, agent("orphan", "p2", true))
            .await;
        verifier
            .respond("DELETE", &format!("{path}/gone"), StatusCode::NOT_FOUND, not_found("gone"))
            .await;

        let deleted = task.await.unwrap().unwrap();
        assert_eq!(deleted, vec!["orphan".to_string(), "gone".to_string()]);
    }
}
