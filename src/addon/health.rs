use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::resources::cluster::ManagedCluster;
use crate::resources::work::{
    FeedbackResult, FeedbackRule, FeedbackValue, FieldResult, FieldValue, JsonPath, ManifestWork, ProbeField,
    ResourceIdentifier,
};

use super::{PLATFORM_METRICS_COLLECTOR, SPOKE_INSTALL_NAMESPACE, USER_WORKLOAD_METRICS_COLLECTOR};

pub const PROBE_IS_AVAILABLE: &str = "isAvailable";
pub const PROBE_IS_READY: &str = "isReady";
pub const PROBE_REPLICAS: &str = "replicas";

pub const CLF_NAME: &str = "mcoa-instance";
pub const CLF_NAMESPACE: &str = "openshift-logging";
pub const OTEL_COLLECTOR_NAME: &str = "mcoa-instance";
pub const OTEL_COLLECTOR_NAMESPACE: &str = "mcoa-opentelemetry";
pub const MONITORING_UI_PLUGIN_NAME: &str = "monitoring";

const MONITORING_RHOBS: &str = "monitoring.rhobs";
const OBSERVABILITY_OPENSHIFT: &str = "observability.openshift.io";
const OPENTELEMETRY: &str = "opentelemetry.io";

#[derive(Error, Debug, PartialEq)]
pub enum ProbeError {
    #[error("probe condition is not satisfied")]
    ConditionNotSatisfied,
}

#[derive(Error, Debug, PartialEq)]
pub enum VersionError {
    #[error("invalid version string {0:?}")]
    InvalidVersion(String),
}

/// The spoke resources whose health is judged, and the probe each one is judged by
#[derive(Clone, Copy, Debug, PartialEq)]
enum ProbeTarget {
    PlatformPrometheusAgent,
    UserWorkloadPrometheusAgent,
    ClusterLogForwarder,
    OpenTelemetryCollector,
    MonitoringUIPlugin,
}

impl ProbeTarget {
    fn from_identifier(id: &ResourceIdentifier) -> Option<Self> {
        match (id.group.as_str(), id.resource.as_str()) {
            (MONITORING_RHOBS, "prometheusagents") => match id.name.as_str() {
                PLATFORM_METRICS_COLLECTOR => Some(ProbeTarget::PlatformPrometheusAgent),
                USER_WORKLOAD_METRICS_COLLECTOR => Some(ProbeTarget::UserWorkloadPrometheusAgent),
                _ => None,
            },
            (OBSERVABILITY_OPENSHIFT, "clusterlogforwarders")
                if id.name == CLF_NAME && id.namespace == CLF_NAMESPACE =>
            {
                Some(ProbeTarget::ClusterLogForwarder)
            }
            (OPENTELEMETRY, "opentelemetrycollectors")
                if id.name == OTEL_COLLECTOR_NAME && id.namespace == OTEL_COLLECTOR_NAMESPACE =>
            {
                Some(ProbeTarget::OpenTelemetryCollector)
            }
            (OBSERVABILITY_OPENSHIFT, "uiplugins") if id.name == MONITORING_UI_PLUGIN_NAME => {
                Some(ProbeTarget::MonitoringUIPlugin)
            }
            _ => None,
        }
    }

    fn identifier(&self) -> ResourceIdentifier {
        match self {
            ProbeTarget::PlatformPrometheusAgent => ResourceIdentifier::new(
                MONITORING_RHOBS,
                "prometheusagents",
                SPOKE_INSTALL_NAMESPACE,
                PLATFORM_METRICS_COLLECTOR,
            ),
            ProbeTarget::UserWorkloadPrometheusAgent => ResourceIdentifier::new(
                MONITORING_RHOBS,
                "prometheusagents",
                SPOKE_INSTALL_NAMESPACE,
                USER_WORKLOAD_METRICS_COLLECTOR,
            ),
            ProbeTarget::ClusterLogForwarder => ResourceIdentifier::new(
                OBSERVABILITY_OPENSHIFT,
                "clusterlogforwarders",
                CLF_NAMESPACE,
                CLF_NAME,
            ),
            ProbeTarget::OpenTelemetryCollector => ResourceIdentifier::new(
                OPENTELEMETRY,
                "opentelemetrycollectors",
                OTEL_COLLECTOR_NAMESPACE,
                OTEL_COLLECTOR_NAME,
            ),
            ProbeTarget::MonitoringUIPlugin => ResourceIdentifier::new(
                OBSERVABILITY_OPENSHIFT,
                "uiplugins",
                "",
                MONITORING_UI_PLUGIN_NAME,
            ),
        }
    }

    fn json_path(&self) -> JsonPath {
        let (name, path) = match self {
            ProbeTarget::PlatformPrometheusAgent
            | ProbeTarget::UserWorkloadPrometheusAgent
            | ProbeTarget::MonitoringUIPlugin => (
                PROBE_IS_AVAILABLE,
                r#".status.conditions[?(@.type=="Available")].status"#,
            ),
            ProbeTarget::ClusterLogForwarder => (
                PROBE_IS_READY,
                r#".status.conditions[?(@.type=="Ready")].status"#,
            ),
            ProbeTarget::OpenTelemetryCollector => (PROBE_REPLICAS, ".status.scale.replicas"),
        };
        JsonPath {
            name: name.into(),
            path: path.into(),
        }
    }

    fn check(&self, values: &[FeedbackValue], cluster: &ManagedCluster) -> Result<(), ProbeError> {
        match self {
            ProbeTarget::PlatformPrometheusAgent => expect_true(values, PROBE_IS_AVAILABLE),
            // user workload monitoring only exists on OpenShift
            ProbeTarget::UserWorkloadPrometheusAgent if !cluster.is_openshift() => Ok(()),
            ProbeTarget::UserWorkloadPrometheusAgent => expect_true(values, PROBE_IS_AVAILABLE),
            ProbeTarget::ClusterLogForwarder => expect_true(values, PROBE_IS_READY),
            ProbeTarget::OpenTelemetryCollector => match find(values, PROBE_REPLICAS) {
                Some(FieldValue::Integer { integer }) if *integer >= 1 => Ok(()),
                _ => Err(ProbeError::ConditionNotSatisfied),
            },
            ProbeTarget::MonitoringUIPlugin => expect_true(values, PROBE_IS_AVAILABLE),
        }
    }
}

const PROBE_TARGETS: [ProbeTarget; 5] = [
    ProbeTarget::PlatformPrometheusAgent,
    ProbeTarget::UserWorkloadPrometheusAgent,
    ProbeTarget::ClusterLogForwarder,
    ProbeTarget::OpenTelemetryCollector,
    ProbeTarget::MonitoringUIPlugin,
];

fn find<'a>(values: &'a [FeedbackValue], name: &str) -> Option<&'a FieldValue> {
    values
        .iter()
        .find(|v| v.name == name)
        .map(|v| &v.field_value)
}

fn expect_true(values: &[FeedbackValue], name: &str) -> Result<(), ProbeError> {
    match find(values, name) {
        Some(FieldValue::String { string }) if string == "True" => Ok(()),
        _ => Err(ProbeError::ConditionNotSatisfied),
    }
}

/// The status feedback fields the spoke agent must report
pub fn probe_fields() -> Vec<ProbeField> {
    PROBE_TARGETS
        .iter()
        .map(|target| ProbeField {
            resource_identifier: target.identifier(),
            probe_rules: vec![FeedbackRule {
                type_: "JSONPaths".into(),
                json_paths: vec![target.json_path()],
            }],
        })
        .collect()
}

/// Judge the health of the add-on on a cluster from the feedback reported by its spoke
///
/// Resources that are not known probe targets are not judged.
pub fn probe_health(fields: &[FieldResult], cluster: &ManagedCluster) -> Result<(), ProbeError> {
    for field in fields {
        let Some(target) = ProbeTarget::from_identifier(&field.resource_identifier) else {
            debug!(
                "Ignoring feedback for {}/{}",
                field.resource_identifier.resource, field.resource_identifier.name
            );
            continue;
        };
        target.check(&field.feedback_result.values, cluster)?;
    }
    Ok(())
}

/// Gather the status feedback of every manifest delivered to a cluster, keyed by resource
pub fn collect_field_results(works: &[ManifestWork]) -> Vec<FieldResult> {
    let mut results: BTreeMap<ResourceIdentifier, Vec<FeedbackValue>> = BTreeMap::new();
    for manifest in works
        .iter()
        .filter_map(|w| w.status.as_ref())
        .filter_map(|s| s.resource_status.as_ref())
        .flat_map(|rs| rs.manifests.iter())
    {
        results
            .entry(ResourceIdentifier::from(&manifest.resource_meta))
            .or_default()
            .extend(manifest.status_feedback.values.iter().cloned());
    }

    results
        .into_iter()
        .map(|(resource_identifier, values)| FieldResult {
            resource_identifier,
            feedback_result: FeedbackResult { values },
        })
        .collect()
}

fn parse_version(version: &str) -> Result<Vec<u64>, VersionError> {
    let core = version
        .split_once('-')
        .map_or(version, |(core, _suffix)| core);
    core.split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| VersionError::InvalidVersion(version.into()))
        })
        .collect()
}

/// Whether version `a` is strictly older than version `b`
///
/// Pre-release suffixes are ignored and missing parts count as zero, so `4.19` equals `4.19.0`.
pub fn is_version_older(a: &str, b: &str) -> Result<bool, VersionError> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    for i in 0..a.len().max(b.len()) {
        let (x, y) = (
            a.get(i).copied().unwrap_or(0),
            b.get(i).copied().unwrap_or(0),
        );
        if x != y {
            return Ok(x < y);
        }
    }
    Ok(false)
}
