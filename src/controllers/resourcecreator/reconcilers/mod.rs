use std::collections::BTreeMap;

use crate::addon::{
    CollectorKind, K8S_COMPONENT, K8S_MANAGED_BY, K8S_PART_OF, PLACEMENT_REF_NAMESPACE_LABEL,
    PLACEMENT_REF_NAME_LABEL,
};
use crate::resources::addon::PlacementRef;

pub mod agent;
pub mod default_stack;

// the labels identifying the default agent of a placement; they are how an existing agent is found
// again, so changing them orphans every default agent
fn selector_labels(
    addon_name: &str,
    kind: CollectorKind,
    placement: &PlacementRef,
) -> BTreeMap<String, String> {
    BTreeMap::from_iter([
        (K8S_MANAGED_BY.into(), addon_name.into()),
        (K8S_COMPONENT.into(), kind.app_name().into()),
        (PLACEMENT_REF_NAME_LABEL.into(), placement.name.clone()),
        (
            PLACEMENT_REF_NAMESPACE_LABEL.into(),
            placement.namespace.clone(),
        ),
    ])
}

/// Labels carried by the default agent of `kind` for `placement`
pub fn agent_labels(
    addon_name: &str,
    kind: CollectorKind,
    placement: &PlacementRef,
) -> BTreeMap<String, String> {
    let mut labels = selector_labels(addon_name, kind, placement);
    labels.insert(K8S_PART_OF.into(), addon_name.into());
    labels
}

/// Label selector matching the default agent of `kind` for `placement`
pub fn agent_selector(addon_name: &str, kind: CollectorKind, placement: &PlacementRef) -> String {
    selector_labels(addon_name, kind, placement)
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn default_agent_name(kind: CollectorKind, placement: &PlacementRef) -> String {
    format!("mcoa-default-{}-{}", kind.app_name(), placement.name)
}
