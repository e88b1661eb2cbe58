use std::collections::BTreeMap;

use kube::{Resource, ResourceExt};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::debug;

use crate::addon::{Signal, SIGNAL_LABEL};
use crate::Result;

pub mod analytics;
pub mod logging;
pub mod metrics;
pub mod traces;

/// A configuration object flattened for templating: identity, labels and the JSON encoded spec
/// or data
#[derive(Clone, Debug, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValue {
    pub name: String,
    pub namespace: String,
    pub data: String,
    pub labels: BTreeMap<String, String>,
}

impl ConfigValue {
    /// `data` is the JSON encoding of `content`, usually the spec of `obj`
    pub fn new<K: Resource>(obj: &K, content: &impl Serialize) -> Result<Self> {
        Ok(Self {
            name: obj.name_any(),
            namespace: obj.namespace().unwrap_or_default(),
            data: serde_json::to_string(content)?,
            labels: obj.labels().clone(),
        })
    }
}

/// Whether the object is labelled for use by `signal`
pub fn has_signal<K: Resource>(obj: &K, signal: Signal) -> bool {
    obj.labels()
        .get(SIGNAL_LABEL)
        .is_some_and(|value| value == signal.as_str())
}

/// Keep the config maps or secrets labelled for `signal`; the others are ignored
pub fn for_signal<K: Resource<DynamicType = ()>>(objs: Vec<K>, signal: Signal) -> Vec<K> {
    objs.into_iter()
        .filter(|obj| {
            let keep = has_signal(obj, signal);
            if !keep {
                debug!(
                    "Ignoring {} {} without the {}={} label",
                    K::kind(&()),
                    obj.name_any(),
                    SIGNAL_LABEL,
                    signal.as_str()
                );
            }
            keep
        })
        .collect()
}
