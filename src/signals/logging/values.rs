use schemars::JsonSchema;
use serde::Serialize;

use crate::signals::ConfigValue;
use crate::Result;

use super::options::Options;

#[derive(Clone, Debug, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggingValues {
    pub enabled: bool,
    pub platform_enabled: bool,
    pub user_workloads_enabled: bool,
    pub subscription_channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_log_forwarder: Option<ConfigValue>,
    pub default_stack_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loki_stack: Option<ConfigValue>,
    pub secrets: Vec<ConfigValue>,
    pub config_maps: Vec<ConfigValue>,
}

pub fn build_values(opts: Option<&Options>) -> Result<LoggingValues> {
    let Some(opts) = opts else {
        return Ok(LoggingValues::default());
    };

    let clf = &opts.cluster_log_forwarder;
    Ok(LoggingValues {
        enabled: true,
        platform_enabled: opts.platform_enabled,
        user_workloads_enabled: opts.user_workloads_enabled,
        subscription_channel: opts.subscription_channel.clone(),
        cluster_log_forwarder: Some(ConfigValue::new(clf, &clf.spec)?),
        default_stack_enabled: opts.loki_stack.is_some(),
        loki_stack: opts
            .loki_stack
            .as_ref()
            .map(|ls| ConfigValue::new(ls, &ls.spec))
            .transpose()?,
        secrets: opts
            .secrets
            .iter()
            .map(|secret| ConfigValue::new(secret, &secret.data))
            .collect::<Result<_>>()?,
        config_maps: opts
            .config_maps
            .iter()
            .map(|cm| ConfigValue::new(cm, &cm.data))
            .collect::<Result<_>>()?,
    })
}
