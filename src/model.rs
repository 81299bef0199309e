use ndarray::Array1;

/// A user-supplied forward model: covariates plus a `predict` mapping from
/// free parameters to predicted observations. Mirrors DIAMONDS's `Model`
/// base class (`PolynomialModel` being one concrete subclass).
pub trait Model {
    /// Independent-variable values the model predicts over.
    fn covariates(&self) -> &Array1<f64>;

    /// Compute model predictions for the given free parameters, writing
    /// into `predictions` (same length as `covariates`).
    fn predict(&self, predictions: &mut Array1<f64>, parameters: &Array1<f64>);
}

/// A model with no covariates, for likelihoods that compute `log L`
/// directly from the parameters without going through a predict step
/// (e.g. test functions like Rosenbrock or the Gaussian shell). Ported
/// directly from DIAMONDS's `ZeroModel`, used in `demoRosenbrockFunction.cpp`
/// purely to satisfy `Likelihood`'s constructor.
#[derive(Debug, Clone, Default)]
pub struct ZeroModel {
    covariates: Array1<f64>,
}

impl ZeroModel {
    pub fn new() -> Self {
        ZeroModel {
            covariates: Array1::from(Vec::new()),
        }
    }
}

impl Model for ZeroModel {
    fn covariates(&self) -> &Array1<f64> {
        &self.covariates
    }

    fn predict(&self, _predictions: &mut Array1<f64>, _parameters: &Array1<f64>) {}
}

/// A simple polynomial model: `f(x) = offset + a*x + b*x^2 + ...`, with
/// free parameters sorted by increasing degree and the offset last,
/// matching `PolynomialModel::predict`'s parameter ordering.
#[derive(Debug, Clone)]
pub struct PolynomialModel {
    covariates: Array1<f64>,
    degrees: usize,
}

impl PolynomialModel {
    pub fn new(covariates: Array1<f64>, degrees: usize) -> Self {
        PolynomialModel { covariates, degrees }
    }

    pub fn degrees(&self) -> usize {
        self.degrees
    }
}

impl Model for PolynomialModel {
    fn covariates(&self) -> &Array1<f64> {
        &self.covariates
    }

    fn predict(&self, predictions: &mut Array1<f64>, parameters: &Array1<f64>) {
        predictions.fill(0.0);
        for degree in 0..self.degrees {
            let coeff = parameters[degree];
            predictions.zip_mut_with(&self.covariates, |p, x| *p += x.powi((degree + 1) as i32) * coeff);
        }
        let offset = parameters[self.degrees];
        *predictions += offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polynomial_model_evaluates_linear_fit() {
        let covariates = Array1::from(vec![0.0, 1.0, 2.0]);
        let model = PolynomialModel::new(covariates, 1);
        let mut predictions = Array1::zeros(3);
        // f(x) = 2x + 3
        let params = Array1::from(vec![2.0, 3.0]);
        model.predict(&mut predictions, &params);
        assert_eq!(predictions, Array1::from(vec![3.0, 5.0, 7.0]));
    }

    #[test]
    fn zero_model_has_no_covariates() {
        let model = ZeroModel::new();
        assert_eq!(model.covariates().len(), 0);
    }
}
