//! # xnode Kernel
//!
//! Composition kernel for the xnode server. Features declare
//! dependencies and configuration steps against a [`FeatureRegistry`];
//! the [`FeatureExecutor`] brings them up in a well-defined order
//! (validate, then initialize, fail-fast) and down in reverse order
//! (best-effort, with one aggregate error per phase).
//!
//! ## Components
//!
//! - [`Feature`] - the lifecycle trait a pluggable unit implements
//! - [`FeatureRegistry`] / [`FeatureRegistration`] - declarative
//!   registration with `depend_on` and `feature_services`
//! - [`FeatureExecutor`] - ordered two-phase startup and shutdown
//! - [`ServiceCollection`] / [`ServiceProvider`] - typed singleton
//!   container shared by all features
//! - [`FeatureKernel`] - facade bundling the above with one shutdown
//!   token

pub mod error;
pub mod executor;
pub mod feature;
pub mod kernel;
pub mod registry;
pub mod services;

pub use error::FeatureError;
pub use executor::FeatureExecutor;
pub use feature::Feature;
pub use kernel::FeatureKernel;
pub use registry::{FeatureRegistration, FeatureRegistry};
pub use services::{ServiceCollection, ServiceProvider};

pub use tokio_util::sync::CancellationToken;
