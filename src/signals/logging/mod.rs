//! Cluster log forwarding and the managed default log store.

pub mod options;
pub mod values;
