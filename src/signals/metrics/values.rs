use schemars::JsonSchema;
use serde::Serialize;

use crate::addon::images::ImageOverrides;
use crate::addon::{CollectorKind, PROMETHEUS_CA_CONFIG_MAP, PROMETHEUS_CONTROLLER_ID};
use crate::signals::ConfigValue;
use crate::Result;

use super::options::{Collector, Options};

/// What the chart renders one spoke agent from
#[derive(Clone, Debug, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectorValues {
    pub app_name: String,
    pub config_maps: Vec<ConfigValue>,
    pub prometheus_agent: ConfigValue,
    pub scrape_configs: Vec<ConfigValue>,
    pub rules: Vec<ConfigValue>,
    pub service_monitors: Vec<ConfigValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsValues {
    pub platform_enabled: bool,
    pub user_workloads_enabled: bool,
    #[serde(rename = "prometheusControllerID")]
    pub prometheus_controller_id: String,
    #[serde(rename = "prometheusCAConfigMapName")]
    pub prometheus_ca_config_map_name: String,
    pub platform: CollectorValues,
    pub user_workload: CollectorValues,
    pub secrets: Vec<ConfigValue>,
    pub images: ImageOverrides,
    pub ui_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<ConfigValue>,
}

fn collector_values(collector: &Collector) -> Result<CollectorValues> {
    Ok(CollectorValues {
        app_name: collector.kind.app_name().into(),
        config_maps: collector
            .config_maps
            .iter()
            .map(|cm| ConfigValue::new(cm, &cm.data))
            .collect::<Result<_>>()?,
        prometheus_agent: ConfigValue::new(&collector.agent, &collector.agent.spec)?,
        scrape_configs: collector
            .scrape_configs
            .iter()
            .map(|sc| ConfigValue::new(sc, &sc.spec))
            .collect::<Result<_>>()?,
        rules: collector
            .rules
            .iter()
            .map(|rule| ConfigValue::new(rule, &rule.spec))
            .collect::<Result<_>>()?,
        service_monitors: collector
            .service_monitors
            .iter()
            .map(|sm| ConfigValue::new(sm, &sm.spec))
            .collect::<Result<_>>()?,
    })
}

fn disabled(kind: CollectorKind) -> CollectorValues {
    CollectorValues {
        app_name: kind.app_name().into(),
        ..Default::default()
    }
}

/// Project the metrics options onto the values the chart consumes; `ui` is the monitoring UI
/// plugin when incident detection is rendered for the cluster
pub fn build_values(opts: Option<&Options>, ui: Option<ConfigValue>) -> Result<MetricsValues> {
    let mut values = MetricsValues {
        prometheus_controller_id: PROMETHEUS_CONTROLLER_ID.into(),
        prometheus_ca_config_map_name: PROMETHEUS_CA_CONFIG_MAP.into(),
        platform: disabled(CollectorKind::Platform),
        user_workload: disabled(CollectorKind::UserWorkload),
        ui_enabled: ui.is_some(),
        ui,
        ..Default::default()
    };
    let Some(opts) = opts else {
        return Ok(values);
    };

    if let Some(platform) = &opts.platform {
        values.platform_enabled = true;
        values.platform = collector_values(platform)?;
    }
    if let Some(user_workloads) = &opts.user_workloads {
        values.user_workloads_enabled = true;
        values.user_workload = collector_values(user_workloads)?;
    }
    values.secrets = opts
        .secrets
        .iter()
        .map(|secret| ConfigValue::new(secret, &secret.data))
        .collect::<Result<_>>()?;
    values.images = opts.images.clone();
    Ok(values)
}
