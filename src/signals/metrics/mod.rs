//! Prometheus agents, scrape configs and rules for the platform and user-workload collectors,
//! including the fan-out to hosted control planes.

pub mod hypershift;
pub mod options;
pub mod promql;
pub mod values;
