use std::sync::Arc;

use chrono::{DateTime, Utc};
use kube::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::error;

use crate::addon::Settings;
use crate::Metrics;

pub mod resourcecreator;

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
        }
    }
}

/// State shared between the controller and the web server
#[derive(Clone)]
pub struct State {
    /// Diagnostics populated by the reconciler
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    pub registry: prometheus::Registry,
    /// Name of the add-on and the namespaces it works in
    pub settings: Settings,
}

/// State wrapper around the controller outputs for the web server
impl State {
    pub fn new(settings: Settings) -> Self {
        Self {
            diagnostics: Arc::new(RwLock::new(Diagnostics::default())),
            registry: prometheus::Registry::default(),
            settings,
        }
    }

    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }
}

/// Run every hub-side controller until shutdown is signalled
pub async fn run(state: State) {
    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create kube client: {err}");
            std::process::exit(1);
        }
    };

    let metrics = match Metrics::new().and_then(|m| m.register(&state.registry)) {
        Ok(metrics) => metrics,
        Err(err) => {
            error!("Failed to register metrics: {err}");
            std::process::exit(1);
        }
    };

    resourcecreator::controller::run(client, metrics, state).await;
}
