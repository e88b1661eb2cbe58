//! OpenTelemetry collectors and auto-instrumentation for user workloads.

pub mod options;
pub mod values;
