use crate::Error;
use kube::ResourceExt;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, Registry};
use tokio::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    pub reconciliations: IntCounter,
    pub failures: IntCounterVec,
    pub reconcile_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let reconcile_duration = HistogramVec::new(
            histogram_opts!(
                "mcoa_reconcile_duration_seconds",
                "The duration of reconcile to complete in seconds"
            )
            .buckets(vec![0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.]),
            &["kind"],
        )?;
        let failures = IntCounterVec::new(
            opts!("mcoa_reconciliation_errors_total", "reconciliation errors",),
            &["kind", "instance", "error"],
        )?;
        let reconciliations = IntCounter::new("mcoa_reconciliations_total", "reconciliations")?;
        Ok(Metrics {
            reconciliations,
            failures,
            reconcile_duration,
        })
    }

    /// Register API metrics to start tracking them.
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.reconcile_duration.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.reconciliations.clone()))?;
        Ok(self)
    }

    pub fn reconcile_failure<T: kube::Resource<DynamicType = ()>>(&self, obj: &T, e: &Error) {
        self.failures
            .with_label_values(&[
                T::kind(&()).as_ref(),
                obj.name_any().as_ref(),
                e.metric_label(),
            ])
            .inc()
    }

    pub fn count_and_measure<T: kube::Resource<DynamicType = ()>>(&self) -> ReconcileMeasurer<T> {
        self.reconciliations.inc();
        ReconcileMeasurer {
            start: Instant::now(),
            metric: self.reconcile_duration.clone(),
            _resource_type: std::marker::PhantomData,
        }
    }
}

/// Smart function duration measurer
///
/// Relies on Drop to calculate duration and register the observation in the histogram
pub struct ReconcileMeasurer<T: kube::Resource<DynamicType = ()>> {
    start: Instant,
    metric: HistogramVec,
    _resource_type: std::marker::PhantomData<T>,
}

impl<T: kube::Resource<DynamicType = ()>> Drop for ReconcileMeasurer<T> {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric
            .with_label_values(&[T::kind(&()).as_ref()])
            .observe(duration);
    }
}

#[cfg(test)]
mod tests {
    use crate::resources::addon::ClusterManagementAddOn;

    use super::*;

    #[test]
    fn test_failures_are_labelled() {
        let registry = Registry::default();
        let metrics = Metrics::new().unwrap().register(&registry).unwrap();

        let mut cmao = ClusterManagementAddOn::new("multicluster-observability-addon", Default::default());
        cmao.metadata.uid = Some("1234".into());
        metrics.reconcile_failure(&cmao, &Error::MissingHubEndpoint);
        {
            let _timer = metrics.count_and_measure::<ClusterManagementAddOn>();
        }

        let failures = metrics
            .failures
            .with_label_values(&[
                "ClusterManagementAddOn",
                "multicluster-observability-addon",
                "MissingHubEndpoint",
            ])
            .get();
        assert_eq!(failures, 1);
        assert_eq!(metrics.reconciliations.get(), 1);
        assert!(registry
            .gather()
            .iter()
            .any(|family| family.get_name() == "mcoa_reconcile_duration_seconds"));
    }
}
