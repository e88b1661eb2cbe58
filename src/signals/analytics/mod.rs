//! Incident detection, rendered as the monitoring console plugin.

pub mod options;
pub mod values;
