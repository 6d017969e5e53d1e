//! Feature kernel errors.

use thiserror::Error;

/// Boxed error type for feature-specific failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised during feature registration and lifecycle phases.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The feature type was already registered.
    #[error("feature already registered: {0}")]
    Duplicate(&'static str),

    /// A declared dependency is not satisfied by any registered type.
    #[error("feature '{feature}' depends on unregistered feature '{dependency}'")]
    DependencyMissing {
        feature: &'static str,
        dependency: &'static str,
    },

    /// A feature failed during the initialize phase.
    #[error("feature '{feature}' failed to initialize: {source}")]
    Initialize {
        feature: &'static str,
        #[source]
        source: Box<FeatureError>,
    },

    /// A feature failed during the dispose phase.
    #[error("feature '{feature}' failed to shut down: {source}")]
    Shutdown {
        feature: &'static str,
        #[source]
        source: Box<FeatureError>,
    },

    /// One error bundling every failure collected during a phase.
    #[error("{} feature failure(s): {}", .0.len(), summarize(.0))]
    Aggregate(Vec<FeatureError>),

    /// A feature-specific failure.
    #[error(transparent)]
    Other(#[from] BoxError),

    /// Generic error.
    #[error("{0}")]
    Custom(String),
}

impl FeatureError {
    /// Bundle the collected failures of one phase into a single error.
    pub fn aggregate(errors: Vec<FeatureError>) -> Self {
        Self::Aggregate(errors)
    }
}

fn summarize(errors: &[FeatureError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
