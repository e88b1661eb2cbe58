use schemars::JsonSchema;
use serde::Serialize;

use crate::signals::ConfigValue;
use crate::Result;

use super::options::Options;

#[derive(Clone, Debug, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TracingValues {
    pub enabled: bool,
    pub instrumentation_enabled: bool,
    pub subscription_channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otel_collector: Option<ConfigValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrumentation: Option<ConfigValue>,
    pub secrets: Vec<ConfigValue>,
    pub config_maps: Vec<ConfigValue>,
}

pub fn build_values(opts: Option<&Options>) -> Result<TracingValues> {
    let Some(opts) = opts else {
        return Ok(TracingValues::default());
    };

    Ok(TracingValues {
        enabled: true,
        instrumentation_enabled: opts.instrumentation.is_some(),
        subscription_channel: opts.subscription_channel.clone(),
        otel_collector: Some(ConfigValue::new(&opts.collector, &opts.collector.spec)?),
        instrumentation: opts
            .instrumentation
            .as_ref()
            .map(|inst| ConfigValue::new(inst, &inst.spec))
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
