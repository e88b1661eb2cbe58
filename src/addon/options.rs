use std::collections::BTreeMap;
use std::sync::OnceLock;

use k8s_openapi::api::core::v1::{ResourceRequirements, Toleration};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::resources::addon::AddOnDeploymentConfig;

use super::REMOTE_WRITE_PATH;

// Customized variable keys
const KEY_HUB_HOSTNAME: &str = "hubHostname";
const KEY_OPENSHIFT_LOGGING_CHANNEL: &str = "openshiftLoggingChannel";
const KEY_PLATFORM_METRICS_COLLECTION: &str = "platformMetricsCollection";
const KEY_USER_WORKLOAD_METRICS_COLLECTION: &str = "userWorkloadMetricsCollection";
const KEY_METRICS_HUB_HOSTNAME: &str = "metricsHubHostname";
const KEY_METRICS_ALERT_MANAGER_HOSTNAME: &str = "metricsAlertManagerHostname";
const KEY_PLATFORM_LOGS_COLLECTION: &str = "platformLogsCollection";
const KEY_PLATFORM_LOGS_DEFAULT: &str = "platformLogsDefault";
const KEY_USER_WORKLOAD_LOGS_COLLECTION: &str = "userWorkloadLogsCollection";
const KEY_USER_WORKLOAD_TRACES_COLLECTION: &str = "userWorkloadTracesCollection";
const KEY_USER_WORKLOAD_INSTRUMENTATION: &str = "userWorkloadInstrumentation";
const KEY_PLATFORM_INCIDENT_DETECTION: &str = "platformIncidentDetection";

// Values enabling a signal: the resource type that configures it
pub const PROMETHEUS_AGENTS_V1ALPHA1: &str = "prometheusagents.v1alpha1.monitoring.rhobs";
pub const CLUSTER_LOG_FORWARDERS_V1: &str = "clusterlogforwarders.v1.observability.openshift.io";
pub const OPENTELEMETRY_COLLECTORS_V1BETA1: &str =
    "opentelemetrycollectors.v1beta1.opentelemetry.io";
pub const INSTRUMENTATIONS_V1ALPHA1: &str = "instrumentations.v1alpha1.opentelemetry.io";
pub const UI_PLUGINS_V1ALPHA1: &str = "uiplugins.v1alpha1.observability.openshift.io";

pub const DEFAULT_LOGGING_CHANNEL: &str = "stable-6.2";
pub const DEFAULT_TRACING_CHANNEL: &str = "stable";

/// ContainerID of resource requirements that apply to every add-on container
const ALL_CONTAINERS_ID: &str = "*:*:*";
const DEFAULT_MEMORY_LIMIT: &str = "128Mi";

#[derive(Error, Debug, PartialEq)]
pub enum UrlError {
    #[error("empty host")]
    EmptyHost,

    #[error(transparent)]
    Parse(#[from] url::ParseError),
}

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
    #[error("invalid metrics hub hostname {input:?}: {source}")]
    InvalidMetricsHubHostname { input: String, source: UrlError },

    #[error("invalid metrics alert manager hostname {input:?}: {source}")]
    InvalidAlertManagerHostname { input: String, source: UrlError },

    #[error("invalid proxy URL {input:?}: {source}")]
    InvalidProxyUrl { input: String, source: UrlError },

    #[error("invalid subscription channel {0:?}")]
    InvalidSubscriptionChannel(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    pub hub_hostname: String,
    pub platform: SignalOptions,
    pub user_workloads: SignalOptions,
    pub proxy: ProxyOptions,
    pub resource_reqs: Option<ResourceRequirements>,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
}

/// What is collected for one of the platform or user-workload scopes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignalOptions {
    pub enabled: bool,
    pub metrics: MetricsOptions,
    pub logs: LogsOptions,
    pub traces: TracesOptions,
    pub analytics: AnalyticsOptions,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsOptions {
    pub collection_enabled: bool,
    pub hub_endpoint: Option<Url>,
    pub alert_manager_endpoint: Option<Url>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogsOptions {
    pub collection_enabled: bool,
    pub subscription_channel: String,
    /// Whether the add-on manages a default log store for the scope
    pub default_stack: bool,
}

impl Default for LogsOptions {
    fn default() -> Self {
        Self {
            collection_enabled: false,
            subscription_channel: DEFAULT_LOGGING_CHANNEL.into(),
            default_stack: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TracesOptions {
    pub collection_enabled: bool,
    pub instrumentation_enabled: bool,
    pub subscription_channel: String,
}

impl Default for TracesOptions {
    fn default() -> Self {
        Self {
            collection_enabled: false,
            instrumentation_enabled: false,
            subscription_channel: DEFAULT_TRACING_CHANNEL.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalyticsOptions {
    pub incident_detection: IncidentDetectionOptions,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IncidentDetectionOptions {
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProxyOptions {
    pub proxy_url: Option<Url>,
    pub no_proxy: Option<String>,
}

impl Options {
    pub fn metrics_enabled(&self) -> bool {
        self.platform.metrics.collection_enabled || self.user_workloads.metrics.collection_enabled
    }

    pub fn logs_enabled(&self) -> bool {
        self.platform.logs.collection_enabled || self.user_workloads.logs.collection_enabled
    }

    pub fn traces_enabled(&self) -> bool {
        self.user_workloads.traces.collection_enabled
    }

    pub fn incident_detection_enabled(&self) -> bool {
        self.platform.analytics.incident_detection.enabled
    }
}

/// Build the typed view of an AddOnDeploymentConfig
///
/// A missing config yields options with every signal disabled. Unknown customized variables are
/// ignored.
pub fn build_options(adc: Option<&AddOnDeploymentConfig>) -> Result<Options, OptionsError> {
    let mut opts = Options::default();
    let Some(adc) = adc else {
        return Ok(opts);
    };

    for variable in adc.spec.customized_variables.iter().flatten() {
        let value = variable.value.as_str();
        match variable.name.as_str() {
            KEY_HUB_HOSTNAME => opts.hub_hostname = value.into(),
            KEY_OPENSHIFT_LOGGING_CHANNEL => {
                validate_subscription_channel(value)?;
                opts.platform.logs.subscription_channel = value.into();
                opts.user_workloads.logs.subscription_channel = value.into();
            }
            KEY_PLATFORM_METRICS_COLLECTION if value == PROMETHEUS_AGENTS_V1ALPHA1 => {
                opts.platform.enabled = true;
                opts.platform.metrics.collection_enabled = true;
            }
            KEY_USER_WORKLOAD_METRICS_COLLECTION if value == PROMETHEUS_AGENTS_V1ALPHA1 => {
                opts.user_workloads.enabled = true;
                opts.user_workloads.metrics.collection_enabled = true;
            }
            KEY_METRICS_HUB_HOSTNAME => {
                let endpoint = parse_endpoint(value, Some(REMOTE_WRITE_PATH)).map_err(|source| {
                    OptionsError::InvalidMetricsHubHostname {
                        input: value.into(),
                        source,
                    }
                })?;
                opts.platform.metrics.hub_endpoint = Some(endpoint.clone());
                opts.user_workloads.metrics.hub_endpoint = Some(endpoint);
            }
            KEY_METRICS_ALERT_MANAGER_HOSTNAME => {
                let endpoint = parse_endpoint(value, None).map_err(|source| {
                    OptionsError::InvalidAlertManagerHostname {
                        input: value.into(),
                        source,
                    }
                })?;
                opts.platform.metrics.alert_manager_endpoint = Some(endpoint.clone());
                opts.user_workloads.metrics.alert_manager_endpoint = Some(endpoint);
            }
            KEY_PLATFORM_LOGS_COLLECTION if value == CLUSTER_LOG_FORWARDERS_V1 => {
                opts.platform.enabled = true;
                opts.platform.logs.collection_enabled = true;
            }
            KEY_PLATFORM_LOGS_DEFAULT if value == "true" => {
                opts.platform.enabled = true;
                opts.platform.logs.default_stack = true;
            }
            KEY_USER_WORKLOAD_LOGS_COLLECTION if value == CLUSTER_LOG_FORWARDERS_V1 => {
                opts.user_workloads.enabled = true;
                opts.user_workloads.logs.collection_enabled = true;
            }
            KEY_USER_WORKLOAD_TRACES_COLLECTION if value == OPENTELEMETRY_COLLECTORS_V1BETA1 => {
                opts.user_workloads.enabled = true;
                opts.user_workloads.traces.collection_enabled = true;
            }
            KEY_USER_WORKLOAD_INSTRUMENTATION if value == INSTRUMENTATIONS_V1ALPHA1 => {
                opts.user_workloads.enabled = true;
                opts.user_workloads.traces.instrumentation_enabled = true;
            }
            KEY_PLATFORM_INCIDENT_DETECTION if value == UI_PLUGINS_V1ALPHA1 => {
                opts.platform.enabled = true;
                opts.platform.analytics.incident_detection.enabled = true;
            }
            name => debug!("Ignoring customized variable {}", name),
        }
    }

    if let Some(placement) = &adc.spec.node_placement {
        opts.node_selector = placement.node_selector.clone().unwrap_or_default();
        opts.tolerations = placement.tolerations.clone().unwrap_or_default();
    }

    opts.resource_reqs = adc
        .spec
        .resource_requirements
        .iter()
        .flatten()
        .find(|r| r.container_id == ALL_CONTAINERS_ID)
        .map(|r| default_resource_requirements(&r.resources));

    if let Some(proxy) = &adc.spec.proxy_config {
        let proxy_url = proxy
            .https_proxy
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(proxy.http_proxy.as_deref().filter(|p| !p.is_empty()));
        if let Some(input) = proxy_url {
            let url = parse_endpoint(input, None).map_err(|source| OptionsError::InvalidProxyUrl {
                input: input.into(),
                source,
            })?;
            opts.proxy.proxy_url = Some(url);
        }
        opts.proxy.no_proxy = proxy.no_proxy.clone().filter(|n| !n.is_empty());
    }

    Ok(opts)
}

/// Parse a URL or a bare hostname, defaulting the scheme to https and optionally overriding the path
pub fn parse_endpoint(input: &str, path: Option<&str>) -> Result<Url, UrlError> {
    let input = input.trim();
    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    let mut url = match Url::parse(&candidate) {
        Ok(url) => url,
        Err(url::ParseError::EmptyHost) => return Err(UrlError::EmptyHost),
        Err(err) => return Err(err.into()),
    };
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::EmptyHost);
    }

    if let Some(path) = path {
        url.set_path(path);
    }
    Ok(url)
}

pub fn validate_subscription_channel(channel: &str) -> Result<(), OptionsError> {
    static CHANNEL: OnceLock<Regex> = OnceLock::new();
    let re = CHANNEL.get_or_init(|| Regex::new(r"^stable-\d+\.\d+$").unwrap());
    if re.is_match(channel) {
        Ok(())
    } else {
        Err(OptionsError::InvalidSubscriptionChannel(channel.into()))
    }
}

/// Add a memory limit when only a CPU limit is given, so that the limits stay admissible
pub fn default_resource_requirements(reqs: &ResourceRequirements) -> ResourceRequirements {
    let mut reqs = reqs.clone();
    if let Some(limits) = reqs.limits.as_mut() {
        if limits.contains_key("cpu") && !limits.contains_key("memory") {
            limits.insert("memory".into(), Quantity(DEFAULT_MEMORY_LIMIT.into()));
        }
    }
    reqs
}
