use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Capabilities, Container, ContainerPort, PodSecurityContext, ResourceRequirements,
    SecretVolumeSource, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use url::Url;

use crate::addon::{
    CollectorKind, Settings, CLIENT_CERT_SECRET, HUB_CA_SECRET, K8S_PART_OF,
    PROMETHEUS_CA_CONFIG_MAP, REMOTE_WRITE_NAME, SCRAPE_CLASS_NAME,
};
use crate::resources::addon::PlacementRef;
use crate::resources::monitoring::{
    ArbitraryFSAccessThroughSMsConfig, Authorization, EmbeddedObjectMetadata, PrometheusAgent,
    PrometheusAgentSpec, RemoteWriteSpec, ScrapeClass, TLSConfig,
};

use super::{agent_labels, default_agent_name};

const RBAC_PROXY_CONTAINER: &str = "kube-rbac-proxy";
const RBAC_PROXY_TLS_VOLUME: &str = "kube-rbac-proxy-tls";
const RBAC_PROXY_TLS_DIR: &str = "/etc/tls/private";
const PROMETHEUS_UPSTREAM: &str = "http://127.0.0.1:9090/";

const DEFAULT_REMOTE_TIMEOUT: &str = "30s";
const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

// where the agent operator mounts spec.secrets and spec.configMaps
fn secret_path(secret: &str, key: &str) -> String {
    format!("/etc/prometheus/secrets/{secret}/{key}")
}

fn config_map_path(config_map: &str, key: &str) -> String {
    format!("/etc/prometheus/configmaps/{config_map}/{key}")
}

/// The agent created the first time a placement is reconciled. Users may change any of these
/// fields afterwards; only the fields of [`PrometheusAgentSsa`] are enforced.
pub fn default_prometheus_agent(
    settings: &Settings,
    placement: &PlacementRef,
    kind: CollectorKind,
) -> PrometheusAgent {
    PrometheusAgent {
        metadata: ObjectMeta {
            name: Some(default_agent_name(kind, placement)),
            namespace: Some(settings.install_namespace.clone()),
            labels: Some(agent_labels(&settings.addon_name, kind, placement)),
            ..Default::default()
        },
        spec: PrometheusAgentSpec {
            replicas: Some(1),
            log_level: Some("info".into()),
            node_selector: Some(BTreeMap::from([(
                "kubernetes.io/os".into(),
                "linux".into(),
            )])),
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([
                    ("cpu".into(), Quantity("3m".into())),
                    ("memory".into(), Quantity("150Mi".into())),
                ])),
                ..Default::default()
            }),
            scrape_interval: Some("120s".into()),
            scrape_timeout: Some("30s".into()),
            security_context: Some(PodSecurityContext {
                run_as_non_root: Some(true),
                ..Default::default()
            }),
            port_name: Some("web".into()),
            // matches every namespace
            scrape_config_namespace_selector: match kind {
                CollectorKind::Platform => None,
                CollectorKind::UserWorkload => Some(LabelSelector::default()),
            },
            ..Default::default()
        },
        status: None,
    }
}

/// Builds the fields of a Prometheus agent the add-on owns through server-side apply
///
/// The result only holds enforced fields, merged with the user's entries where a list is shared
/// (secrets, config maps, remote-writes, scrape classes, containers and volumes). Building from the
/// same inputs always yields the same agent.
pub struct PrometheusAgentSsa<'a> {
    pub kind: CollectorKind,
    pub addon_name: &'a str,
    pub hub_endpoint: &'a Url,
    /// Labels of the agent object
    pub labels: &'a BTreeMap<String, String>,
    pub prometheus_image: &'a str,
    pub kube_rbac_proxy_image: &'a str,
    pub rbac_proxy_port: i32,
}

impl PrometheusAgentSsa<'_> {
    pub fn build(&self, existing: &PrometheusAgent) -> PrometheusAgent {
        let app_name = self.kind.app_name();
        let spec = &existing.spec;

        PrometheusAgent {
            metadata: ObjectMeta {
                name: existing.metadata.name.clone(),
                namespace: existing.metadata.namespace.clone(),
                labels: Some(self.labels.clone()),
                ..Default::default()
            },
            spec: PrometheusAgentSpec {
                arbitrary_fs_access_through_sms: Some(ArbitraryFSAccessThroughSMsConfig {
                    deny: Some(true),
                }),
                version: Some(String::new()),
                image: Some(self.prometheus_image.into()),
                service_account_name: Some(app_name.into()),
                service_name: Some(app_name.into()),
                wal_compression: Some(true),
                pod_metadata: Some(EmbeddedObjectMetadata {
                    labels: Some(BTreeMap::from([(
                        K8S_PART_OF.into(),
                        self.addon_name.into(),
                    )])),
                    ..Default::default()
                }),
                secrets: Some(append_missing(
                    spec.secrets.as_deref(),
                    &[HUB_CA_SECRET, CLIENT_CERT_SECRET],
                )),
                config_maps: Some(append_missing(
                    spec.config_maps.as_deref(),
                    &[PROMETHEUS_CA_CONFIG_MAP],
                )),
                remote_write: Some(self.remote_writes(spec.remote_write.as_deref())),
                scrape_classes: Some(self.scrape_classes(spec.scrape_classes.as_deref())),
                containers: Some(self.containers(spec.containers.as_deref())),
                volumes: Some(self.volumes(spec.volumes.as_deref())),
                scrape_config_selector: Some(LabelSelector {
                    match_labels: Some(self.kind.match_labels(self.addon_name)),
                    match_expressions: None,
                }),
                ..Default::default()
            },
            status: None,
        }
    }

    // the managed entry comes first, any further entry with its name is dropped
    fn remote_writes(&self, existing: Option<&[RemoteWriteSpec]>) -> Vec<RemoteWriteSpec> {
        let existing = existing.unwrap_or_default();
        let current = existing
            .iter()
            .find(|rw| rw.name.as_deref() == Some(REMOTE_WRITE_NAME));

        let managed = RemoteWriteSpec {
            name: Some(REMOTE_WRITE_NAME.into()),
            url: self.hub_endpoint.to_string(),
            remote_timeout: Some(
                current
                    .and_then(|rw| rw.remote_timeout.clone())
                    .unwrap_or_else(|| DEFAULT_REMOTE_TIMEOUT.into()),
            ),
            queue_config: current.and_then(|rw| rw.queue_config.clone()),
            tls_config: Some(TLSConfig {
                ca_file: Some(secret_path(HUB_CA_SECRET, "ca.crt")),
                cert_file: Some(secret_path(CLIENT_CERT_SECRET, "tls.crt")),
                key_file: Some(secret_path(CLIENT_CERT_SECRET, "tls.key")),
                ..Default::default()
            }),
            ..Default::default()
        };

        std::iter::once(managed)
            .chain(
                existing
                    .iter()
                    .filter(|rw| rw.name.as_deref() != Some(REMOTE_WRITE_NAME))
                    .cloned(),
            )
            .collect()
    }

    fn scrape_classes(&self, existing: Option<&[ScrapeClass]>) -> Vec<ScrapeClass> {
        let existing = existing.unwrap_or_default();
        let current = existing.iter().find(|sc| sc.name == SCRAPE_CLASS_NAME);

        let managed = ScrapeClass {
            name: SCRAPE_CLASS_NAME.into(),
            default: Some(true),
            authorization: Some(Authorization {
                type_: Some("Bearer".into()),
                credentials_file: Some(SERVICE_ACCOUNT_TOKEN.into()),
                credentials: None,
            }),
            tls_config: Some(TLSConfig {
                ca_file: Some(config_map_path(PROMETHEUS_CA_CONFIG_MAP, "service-ca.crt")),
                ..Default::default()
            }),
            metric_relabelings: current.and_then(|sc| sc.metric_relabelings.clone()),
            ..Default::default()
        };

        std::iter::once(managed)
            .chain(
                existing
                    .iter()
                    .filter(|sc| sc.name != SCRAPE_CLASS_NAME)
                    .cloned(),
            )
            .collect()
    }

    fn containers(&self, existing: Option<&[Container]>) -> Vec<Container> {
        let rbac_proxy = Container {
            name: RBAC_PROXY_CONTAINER.into(),
            image: Some(self.kube_rbac_proxy_image.into()),
            args: Some(vec![
                format!("--secure-listen-address=0.0.0.0:{}", self.rbac_proxy_port),
                format!("--upstream={PROMETHEUS_UPSTREAM}"),
                format!("--tls-cert-file={RBAC_PROXY_TLS_DIR}/tls.crt"),
                format!("--tls-private-key-file={RBAC_PROXY_TLS_DIR}/tls.key"),
            ]),
            ports: Some(vec![ContainerPort {
                name: Some("https".into()),
                container_port: self.rbac_proxy_port,
                ..Default::default()
            }]),
            volume_mounts: Some(vec![VolumeMount {
                name: RBAC_PROXY_TLS_VOLUME.into(),
                mount_path: RBAC_PROXY_TLS_DIR.into(),
                read_only: Some(true),
                ..Default::default()
            }]),
            security_context: Some(SecurityContext {
                read_only_root_filesystem: Some(true),
                allow_privilege_escalation: Some(false),
                capabilities: Some(Capabilities {
                    drop: Some(vec!["ALL".into()]),
                    add: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        existing
            .unwrap_or_default()
            .iter()
            .filter(|c| c.name != RBAC_PROXY_CONTAINER)
            .cloned()
            .chain(std::iter::once(rbac_proxy))
            .collect()
    }

    fn volumes(&self, existing: Option<&[Volume]>) -> Vec<Volume> {
        let tls = Volume {
            name: RBAC_PROXY_TLS_VOLUME.into(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(self.kind.rbac_proxy_tls_secret()),
                ..Default::default()
            }),
            ..Default::default()
        };

        existing
            .unwrap_or_default()
            .iter()
            .filter(|v| v.name != RBAC_PROXY_TLS_VOLUME)
            .cloned()
            .chain(std::iter::once(tls))
            .collect()
    }
}

fn append_missing(existing: Option<&[String]>, required: &[&str]) -> Vec<String> {
    let mut out = existing.unwrap_or_default().to_vec();
    for name in required {
        if !out.iter().any(|n| n == name) {
            out.push((*name).into());
        }
    }
    out
}

/// Name of the agent, for log lines
pub(crate) fn agent_ref(agent: &PrometheusAgent) -> String {
    format!(
        "{}/{}",
        agent.namespace().unwrap_or_default(),
        agent.name_any()
    )
}
