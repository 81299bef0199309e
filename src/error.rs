use thiserror::Error;

/// The three ways the sampler can fail, per the error taxonomy of the
/// nested-sampling driver: invalid setup, a non-finite likelihood, and
/// exhaustion of the constrained sampler's draw budget. I/O failures during
/// result serialization are wrapped separately.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration caught at construction time: bad prior bounds,
    /// `kmin > kmax`, `N < D + 2`, non-finite hyperparameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A likelihood evaluation returned NaN, or a covariance matrix produced
    /// a non-positive eigenvalue that could not be clamped away.
    #[error("numeric error: {0}")]
    Numeric(String),

    /// The constrained sampler exhausted its per-iteration draw budget
    /// without finding a point satisfying `log L > L*`.
    #[error("draw exhaustion after {attempts} attempts at iteration {iteration}")]
    DrawExhaustion { attempts: usize, iteration: u64 },

    /// Failure writing result files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
