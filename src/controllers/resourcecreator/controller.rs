use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use kube::runtime::events::Recorder;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{metadata_watcher, reflector, watcher, WatchStreamExt};
use kube::{
    api::{Api, ListParams, ResourceExt},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        events::{Event, EventType},
        watcher::Config,
    },
    Resource,
};
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

use crate::addon::options::build_options;
use crate::addon::{Settings, K8S_PART_OF, MCO_KIND};
use crate::common::{has_addon_owner_ref, has_owner_kind};
use crate::controllers::{Diagnostics, State};
use crate::resources::addon::{AddOnDeploymentConfig, ClusterManagementAddOn};
use crate::resources::cluster::ManagedCluster;
use crate::resources::monitoring::{PrometheusAgent, PrometheusRule, ScrapeConfig};
use crate::{telemetry, Metrics, Result};

use super::reconcilers::default_stack::reconcile_default_stack;

// Context for our reconciler
#[derive(Clone)]
pub(super) struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Kubernetes event recorder
    pub recorder: Recorder,
    /// Add-on name and namespaces
    pub settings: Settings,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: Metrics,
}

impl Context {
    pub fn new(client: Client, metrics: Metrics, state: &State) -> Arc<Context> {
        Arc::new(Context {
            client: client.clone(),
            recorder: Recorder::new(client, state.settings.addon_name.clone().into()),
            settings: state.settings.clone(),
            diagnostics: state.diagnostics.clone(),
            metrics,
        })
    }
}

#[instrument(skip(ctx, cmao), fields(trace_id))]
async fn reconcile(cmao: Arc<ClusterManagementAddOn>, ctx: Arc<Context>) -> Result<Action> {
    if let Some(trace_id) = telemetry::get_trace_id() {
        Span::current().record("trace_id", field::display(&trace_id));
    }
    let _timer = ctx.metrics.count_and_measure::<ClusterManagementAddOn>();
    ctx.diagnostics.write().await.last_event = Utc::now();

    info!(
        "Reconciling default stack of ClusterManagementAddOn \"{}\"",
        cmao.name_any()
    );
    match reconcile_cmao(&cmao, &ctx).await {
        Ok(()) => Ok(Action::requeue(Duration::from_secs(5 * 60))),
        Err(err) => {
            warn!("reconcile failed: {:?}", err);

            ctx.recorder
                .publish(
                    &Event {
                        type_: EventType::Warning,
                        reason: "FailedReconcile".into(),
                        note: Some(err.to_string()),
                        action: "Reconcile".into(),
                        secondary: None,
                    },
                    &cmao.object_ref(&()),
                )
                .await?;

            ctx.metrics.reconcile_failure(cmao.as_ref(), &err);
            Err(err)
        }
    }
}

async fn reconcile_cmao(cmao: &ClusterManagementAddOn, ctx: &Context) -> Result<()> {
    let settings = &ctx.settings;
    let adcs: Api<AddOnDeploymentConfig> =
        Api::namespaced(ctx.client.clone(), &settings.install_namespace);
    let adc = adcs.get_opt(&settings.addon_name).await?;
    if adc.is_none() {
        debug!(
            "AddOnDeploymentConfig {}/{} not found, using defaults",
            settings.install_namespace, settings.addon_name
        );
    }

    let options = build_options(adc.as_ref())?;
    reconcile_default_stack(&ctx.client, settings, cmao, &options).await
}

fn error_policy<K, C>(_cmao: Arc<K>, _error: &crate::Error, _ctx: C) -> Action {
    Action::requeue(Duration::from_secs(30))
}

// Initialize the controller and shared state (given the crds are installed)
pub async fn run(client: Client, metrics: Metrics, state: State) {
    let settings = state.settings.clone();
    let addon_name = settings.addon_name.clone();

    let cmao_api = Api::<ClusterManagementAddOn>::all(client.clone());
    let adc_api = Api::<AddOnDeploymentConfig>::namespaced(client.clone(), &settings.install_namespace);
    let mc_api = Api::<ManagedCluster>::all(client.clone());
    let pa_api = Api::<PrometheusAgent>::all(client.clone());
    let sc_api = Api::<ScrapeConfig>::all(client.clone());
    let pr_api = Api::<PrometheusRule>::all(client.clone());

    if let Err(e) = cmao_api.list(&ListParams::default().limit(1)).await {
        error!("ClusterManagementAddOn is not queryable; {e:?}. Is the CRD installed?");
        std::process::exit(1);
    }

    // the add-on and its deployment config are singletons
    let by_name = Config::default().fields(&format!("metadata.name={addon_name}"));
    // every configuration object the add-on reacts to carries this label
    let part_of = Config::default().labels(&format!("{K8S_PART_OF}={addon_name}"));

    let (cmao_store, cmao_writer) = reflector::store();
    let cmao_reflector = reflector(cmao_writer, watcher(cmao_api, by_name.clone()))
        .applied_objects()
        .default_backoff()
        .predicate_filter(placements_predicate);

    let adc_watcher = watcher(adc_api, by_name)
        .map(|event| ensure_deletion_change(event))
        .touched_objects()
        .default_backoff()
        .predicate_filter(changed_predicate);

    let mc_watcher = metadata_watcher(mc_api, Config::default())
        .map(|event| ensure_deletion_change(event))
        .touched_objects()
        .default_backoff()
        .predicate_filter(changed_predicate);

    let pa_watcher = metadata_watcher(pa_api, part_of.clone())
        .map(|event| ensure_deletion_change(event))
        .touched_objects()
        .default_backoff()
        .predicate_filter(changed_predicate);

    let sc_watcher = metadata_watcher(sc_api, part_of.clone())
        .map(|event| ensure_deletion_change(event))
        .touched_objects()
        .default_backoff()
        .predicate_filter(changed_predicate);

    let pr_watcher = metadata_watcher(pr_api, part_of)
        .map(|event| ensure_deletion_change(event))
        .touched_objects()
        .default_backoff()
        .predicate_filter(changed_predicate);

    Controller::for_stream(cmao_reflector, cmao_store)
        .shutdown_on_signal()
        .watches_stream(adc_watcher, always(&addon_name))
        .watches_stream(mc_watcher, always(&addon_name))
        .watches_stream(pa_watcher, when_owned(&addon_name))
        .watches_stream(sc_watcher, when_owned(&addon_name))
        .watches_stream(pr_watcher, when_owned(&addon_name))
        .run(reconcile, error_policy, Context::new(client, metrics, &state))
        .filter_map(|x| async move { Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}

// every trigger maps to the single add-on
fn always<K>(addon_name: &str) -> impl Fn(K) -> Option<ObjectRef<ClusterManagementAddOn>> {
    let addon_name = addon_name.to_string();
    move |_| Some(ObjectRef::new(&addon_name))
}

// configuration is only of interest when the add-on or the observability controller generated it
fn when_owned<K: Resource>(
    addon_name: &str,
) -> impl Fn(K) -> Option<ObjectRef<ClusterManagementAddOn>> {
    let addon_name = addon_name.to_string();
    move |obj| {
        if has_addon_owner_ref(&obj, &addon_name) || has_owner_kind(&obj, MCO_KIND) {
            Some(ObjectRef::new(&addon_name))
        } else {
            None
        }
    }
}

// deletion apparently doesn't lead to any change in metadata otherwise, which means the changed_predicate
// would drop them.
fn ensure_deletion_change<K: Resource, E>(
    mut event: Result<kube::runtime::watcher::Event<K>, E>,
) -> Result<kube::runtime::watcher::Event<K>, E> {
    if let Ok(kube::runtime::watcher::Event::Delete(ref mut object)) = event {
        let meta = object.meta_mut();
        meta.generation = match meta.generation {
            Some(val) => Some(val + 1),
            None => Some(0),
        }
    }
    event
}

fn changed_predicate<K: Resource>(obj: &K) -> Option<u64> {
    let mut hasher = DefaultHasher::new();
    if let Some(g) = obj.meta().generation {
        // covers spec but not metadata or status
        g.hash(&mut hasher)
    }
    obj.labels().hash(&mut hasher);
    obj.annotations().hash(&mut hasher);
    Some(hasher.finish())
}

// only creation and placement changes are of interest on the add-on itself
fn placements_predicate(cmao: &ClusterManagementAddOn) -> Option<u64> {
    let mut hasher = DefaultHasher::new();
    serde_hashkey::to_key(&cmao.placements())
        .ok()?
        .hash(&mut hasher);
    Some(hasher.finish())
}
