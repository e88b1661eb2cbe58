pub mod addon;
pub mod cluster;
pub mod hypershift;
pub mod logging;
pub mod monitoring;
pub mod olm;
pub mod otel;
pub mod uiplugins;
pub mod work;
