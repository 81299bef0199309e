use ndarray::Array1;

use crate::model::Model;

/// An opaque callable producing `log L(theta)`. May return `-inf`; must
/// never return NaN (the driver treats a NaN return as a fatal numeric
/// error, see spec §4.2/§7).
pub trait Likelihood {
    fn log_value(&self, theta: &Array1<f64>) -> f64;
}

/// `log N(x; mu, sigma^2)` summed over a set of observations, given a
/// model's predictions and per-point uncertainties. Ported from
/// `MathExtra::logGaussLikelihood`.
pub fn log_gauss_likelihood(
    observations: &Array1<f64>,
    predictions: &Array1<f64>,
    uncertainties: &Array1<f64>,
) -> f64 {
    debug_assert_eq!(observations.len(), predictions.len());
    debug_assert_eq!(observations.len(), uncertainties.len());

    observations
        .iter()
        .zip(predictions.iter())
        .zip(uncertainties.iter())
        .map(|((obs, pred), sigma)| {
            let delta = (obs - pred) * (obs - pred) / (sigma * sigma);
            -((2.0 * std::f64::consts::PI).sqrt() * sigma).ln() - 0.5 * delta
        })
        .sum()
}

/// A Gaussian-noise likelihood around a user `Model`, the general-purpose
/// likelihood DIAMONDS ships alongside `PolynomialModel`.
pub struct GaussianLikelihood<M: Model> {
    observations: Array1<f64>,
    uncertainties: Array1<f64>,
    model: M,
}

impl<M: Model> GaussianLikelihood<M> {
    pub fn new(observations: Array1<f64>, uncertainties: Array1<f64>, model: M) -> Self {
        GaussianLikelihood {
            observations,
            uncertainties,
            model,
        }
    }
}

impl<M: Model> Likelihood for GaussianLikelihood<M> {
    fn log_value(&self, theta: &Array1<f64>) -> f64 {
        let mut predictions = Array1::zeros(self.model.covariates().len());
        self.model.predict(&mut predictions, theta);
        log_gauss_likelihood(&self.observations, &predictions, &self.uncertainties)
    }
}

/// Two-dimensional Gaussian-shell test likelihood: `log L = log N(|theta -
/// center|; radius, width)`, used for the Gaussian-shell end-to-end scenario
/// of spec §8 (analytic evidence known in closed form for a thin shell).
#[derive(Debug, Clone)]
pub struct GaussianShellLikelihood {
    center: Array1<f64>,
    radius: f64,
    width: f64,
}

impl GaussianShellLikelihood {
    pub fn new(center: Array1<f64>, radius: f64, width: f64) -> Self {
        GaussianShellLikelihood {
            center,
            radius,
            width,
        }
    }
}

impl Likelihood for GaussianShellLikelihood {
    fn log_value(&self, theta: &Array1<f64>) -> f64 {
        let r = theta
            .iter()
            .zip(self.center.iter())
            .map(|(x, c)| (x - c) * (x - c))
            .sum::<f64>()
            .sqrt();
        let z = (r - self.radius) / self.width;
        -0.5 * z * z - self.width.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
    }
}

/// The classic Rosenbrock banana function used as `-log L`, per spec §8's
/// Rosenbrock scenario: `log L = -((1-x)^2 + 100(y-x^2)^2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RosenbrockLikelihood;

impl Likelihood for RosenbrockLikelihood {
    fn log_value(&self, theta: &Array1<f64>) -> f64 {
        let x = theta[0];
        let y = theta[1];
        -((1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2))
    }
}

/// The egg-box test likelihood of spec §8:
/// `log L = (2 + cos(x/2) cos(y/2))^5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EggboxLikelihood;

impl Likelihood for EggboxLikelihood {
    fn log_value(&self, theta: &Array1<f64>) -> f64 {
        let x = theta[0];
        let y = theta[1];
        (2.0 + (x / 2.0).cos() * (y / 2.0).cos()).powi(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosenbrock_peaks_at_one_one() {
        let likelihood = RosenbrockLikelihood;
        let at_optimum = likelihood.log_value(&Array1::from(vec![1.0, 1.0]));
        let elsewhere = likelihood.log_value(&Array1::from(vec![0.0, 0.0]));
        assert_eq!(at_optimum, 0.0);
        assert!(elsewhere < at_optimum);
    }

    #[test]
    fn gaussian_shell_peaks_on_the_ring() {
        let likelihood =
            GaussianShellLikelihood::new(Array1::from(vec![0.0, 0.0]), 2.0, 0.1);
        let on_ring = likelihood.log_value(&Array1::from(vec![2.0, 0.0]));
        let center = likelihood.log_value(&Array1::from(vec![0.0, 0.0]));
        assert!(on_ring > center);
    }

    #[test]
    fn log_gauss_likelihood_peaks_at_zero_residual() {
        let obs = Array1::from(vec![1.0, 2.0]);
        let sigma = Array1::from(vec![1.0, 1.0]);
        let exact = log_gauss_likelihood(&obs, &obs, &sigma);
        let off = log_gauss_likelihood(&obs, &Array1::from(vec![0.0, 0.0]), &sigma);
        assert!(exact > off);
    }
}
