use thiserror::Error;

use addon::health::VersionError;
use addon::options::OptionsError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("no references to the resource found: {0}")]
    MissingResourceReference(String),

    #[error("resource referenced {0} not found")]
    ResourceNotFound(String),

    #[error("no resource owned by MCOA found in references")]
    NoResourceOwnedByAddon,

    #[error("too many configuration resources: {}", .0.join(", "))]
    TooManyConfigurationResources(Vec<String>),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("missing image override {0}")]
    MissingImageOverride(String),

    #[error("cluster-observability-operator subscription channel is {found}, expected {expected}")]
    SubscriptionChannelMismatch { expected: String, found: String },

    #[error("failed to parse PromQL expression {query:?}: {message}")]
    PromQLParse { query: String, message: String },

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error("object has no {0}")]
    MissingObjectKey(&'static str),

    #[error("metrics collection is enabled but no hub endpoint is configured")]
    MissingHubEndpoint,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::SerializationError(_) => "SerializationError",
            Error::KubeError(_) => "KubeError",
            Error::InvalidOptions(_) => "InvalidOptions",
            Error::InvalidVersion(_) => "InvalidVersion",
            Error::MissingResourceReference(_) => "MissingResourceReference",
            Error::ResourceNotFound(_) => "ResourceNotFound",
            Error::NoResourceOwnedByAddon => "NoResourceOwnedByAddon",
            Error::TooManyConfigurationResources(_) => "TooManyConfigurationResources",
            Error::UnsupportedType(_) => "UnsupportedType",
            Error::MissingImageOverride(_) => "MissingImageOverride",
            Error::SubscriptionChannelMismatch { .. } => "SubscriptionChannelMismatch",
            Error::PromQLParse { .. } => "PromQLParse",
            Error::InvalidUrl(_) => "InvalidUrl",
            Error::MissingObjectKey(_) => "MissingObjectKey",
            Error::MissingHubEndpoint => "MissingHubEndpoint",
        }
    }

    /// Whether the error is a 409 returned by the API server
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::KubeError(kube::Error::Api(kube::error::ErrorResponse { code: 409, .. }))
        )
    }
}

/// Well-known identifiers, options, image overrides, health probing and agent values
pub mod addon;

/// Helpers shared by the controllers and the signal packages
pub mod common;

pub mod controllers;
pub use controllers::{run, State};

/// Per-signal options and values
pub mod signals;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;

pub use metrics::Metrics;

/// External CRDs
pub mod resources;

#[cfg(test)]
pub mod testing;
