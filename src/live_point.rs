use std::collections::VecDeque;

use ndarray::{Array1, Array2, Axis};
use ordered_float::OrderedFloat;

/// A single point in parameter space plus its cached log-likelihood.
/// Corresponds to DIAMONDS's `nestedSample` column / `logLikelihood` entry;
/// named after the teacher's `Particle`.
#[derive(Debug, Clone)]
pub struct LivePoint {
    pub theta: Array1<f64>,
    pub log_l: f64,
}

impl LivePoint {
    pub fn new(theta: Array1<f64>, log_l: f64) -> Self {
        LivePoint { theta, log_l }
    }
}

/// The live set: `N` points kept sorted ascending by `log_l`, so the worst
/// point is always at the front. Ported from the teacher's `Particles`,
/// which kept a `VecDeque<Particle>` sorted by `OrderedFloat(eps)` and used
/// `binary_search_by_key`/pop-front for the same role.
#[derive(Debug, Clone)]
pub struct LiveSet {
    points: VecDeque<LivePoint>,
}

impl LiveSet {
    pub fn new(mut points: Vec<LivePoint>) -> Self {
        points.sort_unstable_by_key(|p| OrderedFloat(p.log_l));
        LiveSet {
            points: points.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The current likelihood threshold `L*`: the log-likelihood of the
    /// worst live point.
    pub fn worst_log_l(&self) -> f64 {
        self.points[0].log_l
    }

    pub fn worst(&self) -> &LivePoint {
        &self.points[0]
    }

    pub fn max_log_l(&self) -> f64 {
        self.points
            .back()
            .map(|p| p.log_l)
            .unwrap_or(f64::NEG_INFINITY)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LivePoint> {
        self.points.iter()
    }

    /// Remove and return the worst (lowest log-likelihood) live point.
    pub fn pop_worst(&mut self) -> LivePoint {
        self.points.pop_front().expect("live set must be non-empty")
    }

    /// Insert a freshly drawn point, keeping the set sorted by `log_l`.
    pub fn insert(&mut self, point: LivePoint) {
        let pos = self
            .points
            .binary_search_by_key(&OrderedFloat(point.log_l), |p| OrderedFloat(p.log_l))
            .unwrap_or_else(|e| e);
        self.points.insert(pos, point);
    }

    /// Remove the `count` points with lowest log-likelihood above the
    /// current threshold (used by the live-points reducer to shrink `N`).
    /// Returns the removed points in ascending `log_l` order.
    pub fn remove_lowest(&mut self, count: usize) -> Vec<LivePoint> {
        let count = count.min(self.points.len());
        (0..count).map(|_| self.pop_worst()).collect()
    }

    /// Removes and returns every remaining live point, in ascending
    /// `log_l` order. Used by the driver's end-of-run flush (spec §4.8
    /// termination / §4.7 final fold-in).
    pub fn drain_all(&mut self) -> Vec<LivePoint> {
        self.points.drain(..).collect()
    }

    /// Column-major `(Ndimensions, Npoints)` matrix of all live-point
    /// coordinates, matching the layout §2 requires for clustering and
    /// ellipsoid construction.
    pub fn coordinate_matrix(&self) -> Array2<f64> {
        let ndim = self.points[0].theta.len();
        let npoints = self.points.len();
        let mut matrix = Array2::zeros((ndim, npoints));
        for (j, point) in self.points.iter().enumerate() {
            matrix.index_axis_mut(Axis(1), j).assign(&point.theta);
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(log_l: f64) -> LivePoint {
        LivePoint::new(Array1::from(vec![log_l, log_l]), log_l)
    }

    #[test]
    fn stays_sorted_by_log_likelihood() {
        let set = LiveSet::new(vec![point(2.0), point(0.0), point(1.0)]);
        let values: Vec<f64> = set.iter().map(|p| p.log_l).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0]);
        assert_eq!(set.worst_log_l(), 0.0);
    }

    #[test]
    fn pop_worst_then_insert_preserves_order() {
        let mut set = LiveSet::new(vec![point(0.0), point(1.0), point(2.0)]);
        let worst = set.pop_worst();
        assert_eq!(worst.log_l, 0.0);
        set.insert(point(1.5));
        let values: Vec<f64> = set.iter().map(|p| p.log_l).collect();
        assert_eq!(values, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn remove_lowest_shrinks_from_the_bottom() {
        let mut set = LiveSet::new(vec![point(0.0), point(1.0), point(2.0), point(3.0)]);
        let removed = set.remove_lowest(2);
        assert_eq!(removed.iter().map(|p| p.log_l).collect::<Vec<_>>(), vec![0.0, 1.0]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn coordinate_matrix_is_ndimensions_by_npoints() {
        let set = LiveSet::new(vec![point(0.0), point(1.0)]);
        let matrix = set.coordinate_matrix();
        assert_eq!(matrix.shape(), &[2, 2]);
    }
}
