use ndarray::Array1;
use rand::Rng;
use statrs::distribution::{ContinuousCDF, Normal as StatrsNormal};

use crate::error::{Error, Result};

/// A prior distribution over the full `Ndimensions`-dimensional parameter
/// space. DIAMONDS keeps one `Prior` object per coordinate and takes the
/// product over the vector; this crate instead lets one `Prior` own all
/// `Ndimensions` coordinates directly (`Uniform`/`Normal` are naturally
/// per-axis-independent, so there is no expressiveness lost, and the driver
/// no longer has to thread a `Vec<Box<dyn Prior>>` plus a dimension index
/// through every call).
pub trait Prior {
    /// Number of free parameters this prior covers.
    fn dimensions(&self) -> usize;

    /// Draw `n` independent samples from this prior.
    fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Array1<f64>>;

    /// `log π(θ)`, or `-inf` outside the support.
    fn log_density(&self, theta: &Array1<f64>) -> f64;

    /// Inverse-CDF map from the unit cube to parameter space. Used by the
    /// optional ellipsoid-rejection-to-prior mapping (spec §4.1).
    fn from_unit_interval(&self, u: &Array1<f64>) -> Array1<f64>;
}

/// Uniform prior over an axis-aligned box `[min_i, max_i]` per coordinate.
#[derive(Debug, Clone)]
pub struct UniformPrior {
    min: Array1<f64>,
    max: Array1<f64>,
    /// `prod_i 1 / (max_i - min_i)`, the normalization constant of the
    /// density (named `uniformFactor` in `UniformPrior.cpp`).
    uniform_factor: f64,
}

impl UniformPrior {
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        if min.len() != max.len() {
            return Err(Error::Configuration(
                "UniformPrior: min and max must have the same length".into(),
            ));
        }
        if min.is_empty() {
            return Err(Error::Configuration(
                "UniformPrior: must have at least one dimension".into(),
            ));
        }
        for (lo, hi) in min.iter().zip(max.iter()) {
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(Error::Configuration(
                    "UniformPrior: bounds must be finite".into(),
                ));
            }
            if lo >= hi {
                return Err(Error::Configuration(format!(
                    "UniformPrior: invalid boundaries, min ({lo}) >= max ({hi})"
                )));
            }
        }
        let uniform_factor = min
            .iter()
            .zip(max.iter())
            .map(|(lo, hi)| 1.0 / (hi - lo))
            .product();
        Ok(UniformPrior {
            min: Array1::from(min),
            max: Array1::from(max),
            uniform_factor,
        })
    }

    pub fn min(&self) -> &Array1<f64> {
        &self.min
    }

    pub fn max(&self) -> &Array1<f64> {
        &self.max
    }

    fn contains(&self, theta: &Array1<f64>) -> bool {
        theta
            .iter()
            .zip(self.min.iter())
            .zip(self.max.iter())
            .all(|((x, lo), hi)| *x >= *lo && *x <= *hi)
    }
}

impl Prior for UniformPrior {
    fn dimensions(&self) -> usize {
        self.min.len()
    }

    fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Array1<f64>> {
        (0..n)
            .map(|_| {
                Array1::from_iter(self.min.iter().zip(self.max.iter()).map(|(lo, hi)| {
                    let u: f64 = rng.gen();
                    lo + u * (hi - lo)
                }))
            })
            .collect()
    }

    fn log_density(&self, theta: &Array1<f64>) -> f64 {
        if self.contains(theta) {
            self.uniform_factor.ln()
        } else {
            f64::NEG_INFINITY
        }
    }

    fn from_unit_interval(&self, u: &Array1<f64>) -> Array1<f64> {
        u.iter()
            .zip(self.min.iter())
            .zip(self.max.iter())
            .map(|((ui, lo), hi)| lo + ui * (hi - lo))
            .collect()
    }
}

/// Independent normal prior per coordinate, `N(mu_i, sigma_i)`.
#[derive(Debug, Clone)]
pub struct NormalPrior {
    mu: Array1<f64>,
    sigma: Array1<f64>,
}

impl NormalPrior {
    pub fn new(mu: Vec<f64>, sigma: Vec<f64>) -> Result<Self> {
        if mu.len() != sigma.len() {
            return Err(Error::Configuration(
                "NormalPrior: mu and sigma must have the same length".into(),
            ));
        }
        if mu.is_empty() {
            return Err(Error::Configuration(
                "NormalPrior: must have at least one dimension".into(),
            ));
        }
        for s in &sigma {
            if !s.is_finite() || *s <= 0.0 {
                return Err(Error::Configuration(format!(
                    "NormalPrior: sigma must be finite and positive, got {s}"
                )));
            }
        }
        Ok(NormalPrior {
            mu: Array1::from(mu),
            sigma: Array1::from(sigma),
        })
    }
}

impl Prior for NormalPrior {
    fn dimensions(&self) -> usize {
        self.mu.len()
    }

    fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Array1<f64>> {
        (0..n)
            .map(|_| {
                Array1::from_iter(self.mu.iter().zip(self.sigma.iter()).map(|(m, s)| {
                    let dist = StatrsNormal::new(*m, *s).expect("validated at construction");
                    dist.inverse_cdf(rng.gen::<f64>())
                }))
            })
            .collect()
    }

    fn log_density(&self, theta: &Array1<f64>) -> f64 {
        theta
            .iter()
            .zip(self.mu.iter())
            .zip(self.sigma.iter())
            .map(|((x, m), s)| {
                let z = (x - m) / s;
                -0.5 * z * z - s.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
            })
            .sum()
    }

    fn from_unit_interval(&self, u: &Array1<f64>) -> Array1<f64> {
        u.iter()
            .zip(self.mu.iter())
            .zip(self.sigma.iter())
            .map(|((ui, m), s)| {
                let dist = StatrsNormal::new(*m, *s).expect("validated at construction");
                dist.inverse_cdf(*ui)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_rejects_degenerate_bounds() {
        let err = UniformPrior::new(vec![1.0, 0.0], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn uniform_draws_land_in_support() {
        let prior = UniformPrior::new(vec![-1.0, 2.0], vec![1.0, 3.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for theta in prior.draw(200, &mut rng) {
            assert!(prior.log_density(&theta).is_finite());
        }
    }

    #[test]
    fn uniform_log_density_is_neg_infinity_outside_support() {
        let prior = UniformPrior::new(vec![0.0], vec![1.0]).unwrap();
        let outside = Array1::from(vec![2.0]);
        assert_eq!(prior.log_density(&outside), f64::NEG_INFINITY);
    }

    #[test]
    fn normal_rejects_nonpositive_sigma() {
        let err = NormalPrior::new(vec![0.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn normal_from_unit_interval_is_monotone_in_each_coordinate() {
        let prior = NormalPrior::new(vec![0.0], vec![1.0]).unwrap();
        let lo = prior.from_unit_interval(&Array1::from(vec![0.1]));
        let hi = prior.from_unit_interval(&Array1::from(vec![0.9]));
        assert!(lo[0] < hi[0]);
    }
}
