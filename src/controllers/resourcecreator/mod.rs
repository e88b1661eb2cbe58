//! Hub-side default stack: one default Prometheus agent per placement and collector kind,
//! referenced from the ClusterManagementAddOn.

pub mod controller;
pub mod reconcilers;
