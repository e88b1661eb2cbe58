use backoff::{future::retry, ExponentialBackoff};
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::*;

use crate::resources::addon::{AddOnConfig, ClusterManagementAddOn, PlacementRef};
use crate::{Error, Result};

/// Add every `(placement, config)` pair missing from the matching placement of the
/// ClusterManagementAddOn. Returns whether anything was added.
///
/// Configs for placements the add-on does not have are ignored.
pub fn add_placement_configs(
    cmao: &mut ClusterManagementAddOn,
    configs: &[(PlacementRef, AddOnConfig)],
) -> bool {
    let Some(placements) = cmao
        .spec
        .install_strategy
        .as_mut()
        .and_then(|s| s.placements.as_mut())
    else {
        return false;
    };

    let mut changed = false;
    for (placement_ref, config) in configs {
        let Some(placement) = placements
            .iter_mut()
            .find(|p| &p.placement_ref == placement_ref)
        else {
            debug!(
                "Placement {}/{} is not part of the add-on, skipping config {}",
                placement_ref.namespace, placement_ref.name, config.name
            );
            continue;
        };

        let existing = placement.configs.get_or_insert_with(Vec::new);
        if !existing.contains(config) {
            existing.push(config.clone());
            changed = true;
        }
    }
    changed
}

fn into_backoff(err: kube::Error) -> backoff::Error<Error> {
    let err = Error::from(err);
    if err.is_conflict() {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

/// Make sure the ClusterManagementAddOn lists every config for its placement, retrying on conflict
pub async fn ensure_addon_config(
    client: &Client,
    addon_name: &str,
    configs: &[(PlacementRef, AddOnConfig)],
) -> Result<()> {
    let api: Api<ClusterManagementAddOn> = Api::all(client.clone());
    let api = &api;

    retry(ExponentialBackoff::default(), || async move {
        let mut cmao = api.get(addon_name).await.map_err(into_backoff)?;
        if !add_placement_configs(&mut cmao, configs) {
            return Ok(());
        }

        debug!("Updating placement configs of ClusterManagementAddOn {}", addon_name);
        api.replace(addon_name, &PostParams::default(), &cmao)
            .await
            .map_err(into_backoff)?;
        Ok(())
    })
    .await
}
