use ndarray::Array1;

/// Distance between two coordinate vectors in parameter space. DIAMONDS
/// passes an `EuclideanMetric` around by reference wherever a distance is
/// needed (hyper-sphere sampling, clustering); this trait plays the same
/// role here.
pub trait Metric {
    fn distance(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64;
}

/// Ordinary Euclidean distance. The only metric DIAMONDS ships, and the
/// only one this crate needs: the clusterer and the hyper-sphere direction
/// sampler both just need a vector norm.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMetric;

impl Metric for EuclideanMetric {
    fn distance(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_distance_matches_pythagoras() {
        let metric = EuclideanMetric;
        let a = Array1::from(vec![0.0, 0.0]);
        let b = Array1::from(vec![3.0, 4.0]);
        assert!((metric.distance(&a, &b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn distance_is_symmetric_and_zero_for_identical_points() {
        let metric = EuclideanMetric;
        let a = Array1::from(vec![1.0, -2.0, 3.5]);
        let b = Array1::from(vec![-1.0, 2.0, 0.5]);
        assert_eq!(metric.distance(&a, &a), 0.0);
        assert!((metric.distance(&a, &b) - metric.distance(&b, &a)).abs() < 1e-12);
    }
}
