//! MultiNest-style nested sampling: Bayesian evidence and posterior
//! estimation via multi-ellipsoidal constrained prior sampling.
//!
//! The hard engineering lives in four collaborating pieces: the
//! [`clusterer`] (k-means with model selection over the live set), the
//! [`ellipsoid`] builder (per-cluster enlarged covariance ellipsoids plus
//! their overlap graph), the [`sampler`] (rejection sampling from the
//! ellipsoid union under a likelihood constraint), and the [`driver`]'s
//! [`NestedSampler`] outer loop that ties them together and accumulates
//! the evidence. Everything else — priors, likelihoods, the live-points
//! reducer, result serialization, configuration, and the CLI binary — is
//! the boundary code those four pieces need to run as a complete program.

pub mod clusterer;
pub mod config;
pub mod driver;
pub mod ellipsoid;
pub mod error;
pub mod evidence;
pub mod likelihood;
pub mod live_point;
pub mod metric;
pub mod model;
pub mod prior;
pub mod reducer;
pub mod results;
pub mod sampler;

pub use driver::{NestedSampler, PosteriorSample, SamplerResult};
pub use error::{Error, Result};
