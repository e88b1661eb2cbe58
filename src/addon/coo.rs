use kube::{Api, Client, ResourceExt};
use tracing::debug;

use crate::resources::cluster::ManagedCluster;
use crate::resources::olm::Subscription;
use crate::{Error, Result};

use super::RELEASE_LABEL;

pub const COO_SUBSCRIPTION_NAME: &str = "cluster-observability-operator";
pub const COO_SUBSCRIPTION_NAMESPACE: &str = "openshift-cluster-observability-operator";
pub const COO_SUBSCRIPTION_CHANNEL: &str = "stable";

/// Decide whether the add-on should install the cluster-observability-operator
///
/// No subscription means nobody installed it, so the add-on does. A subscription on another
/// channel is an error. A subscription on the expected channel is only ours to manage when its
/// `release` label names the add-on.
pub fn should_install_coo(
    subscription: Option<&Subscription>,
    expected_channel: &str,
    addon_name: &str,
) -> Result<bool> {
    let Some(subscription) = subscription else {
        return Ok(true);
    };

    if subscription.spec.channel != expected_channel {
        return Err(Error::SubscriptionChannelMismatch {
            expected: expected_channel.into(),
            found: subscription.spec.channel.clone(),
        });
    }

    Ok(subscription
        .labels()
        .get(RELEASE_LABEL)
        .is_some_and(|release| release == addon_name))
}

/// The operator subscription is only observable for the hub's own cluster
pub async fn load_coo_subscription(
    client: &Client,
    cluster: &ManagedCluster,
) -> Result<Option<Subscription>> {
    if !cluster.is_local_cluster() {
        return Ok(None);
    }
    let subs: Api<Subscription> = Api::namespaced(client.clone(), COO_SUBSCRIPTION_NAMESPACE);
    let sub = subs.get_opt(COO_SUBSCRIPTION_NAME).await?;
    debug!(
        "cluster-observability-operator subscription found on {}: {}",
        cluster.name_any(),
        sub.is_some()
    );
    Ok(sub)
}
