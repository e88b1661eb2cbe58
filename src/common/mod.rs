use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use serde_json::Value;

use crate::resources::addon::ClusterManagementAddOn;
use crate::{Error, Result};

pub mod addon_config;
pub mod apply;
pub mod orphans;
pub mod references;

/// Whether the object is owned by the ClusterManagementAddOn named `addon_name`
pub fn has_addon_owner_ref<K: Resource>(obj: &K, addon_name: &str) -> bool {
    let kind = ClusterManagementAddOn::kind(&());
    let group = ClusterManagementAddOn::group(&());
    obj.owner_references().iter().any(|oref| {
        oref.kind == kind
            && oref.name == addon_name
            && oref.api_version.split('/').next() == Some(group.as_ref())
    })
}

/// Whether any owner of the object is of the given kind
pub fn has_owner_kind<K: Resource>(obj: &K, kind: &str) -> bool {
    obj.owner_references().iter().any(|oref| oref.kind == kind)
}

/// Controller owner reference pointing at the ClusterManagementAddOn
pub fn addon_owner_ref(cmao: &ClusterManagementAddOn) -> Result<OwnerReference> {
    cmao.controller_owner_ref(&())
        .ok_or(Error::MissingObjectKey(".metadata.uid"))
}

/// Set `owner` as the controller of the object, replacing any previous controller reference
///
/// Non-controller owners are kept. A controller reference with the owner's uid is left untouched.
pub fn set_controller_ref<K: Resource>(obj: &mut K, owner: OwnerReference) {
    let orefs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);
    if orefs
        .iter()
        .any(|o| o.uid == owner.uid && o.controller == Some(true))
    {
        return;
    }
    orefs.retain(|o| o.uid != owner.uid && o.controller != Some(true));
    orefs.push(owner);
}

/// Whether `derived` only sets fields that `existing` already holds with the same value
///
/// Unset values in `derived` (null, empty strings, empty objects and empty arrays) are ignored,
/// non-empty arrays must match element-wise with the same length. This is how an applied view is
/// compared with the live object to skip no-op patches.
pub fn is_deep_derivative(derived: &Value, existing: &Value) -> bool {
    match (derived, existing) {
        (Value::Null, _) => true,
        (Value::String(s), _) if s.is_empty() => true,
        (Value::Object(d), _) if d.is_empty() => true,
        (Value::Array(d), _) if d.is_empty() => true,
        (Value::Object(d), Value::Object(e)) => d
            .iter()
            .all(|(k, v)| is_deep_derivative(v, e.get(k).unwrap_or(&Value::Null))),
        (Value::Array(d), Value::Array(e)) => {
            d.len() == e.len() && d.iter().zip(e).all(|(d, e)| is_deep_derivative(d, e))
        }
        (d, e) => d == e,
    }
}
