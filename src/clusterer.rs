use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::metric::Metric;

/// Output of the clusterer: the chosen `k`, the per-point cluster index,
/// the final centroids, and the per-cluster point counts. Mirrors what
/// `KmeansClusterer::cluster` hands back to `HyperEllipsoidSampler` in
/// DIAMONDS.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    pub k: usize,
    pub assignments: Vec<usize>,
    pub centroids: Array2<f64>,
    pub counts: Vec<usize>,
}

/// Partitions a live set into `k` clusters, choosing `k` by model
/// selection. Implemented as a trait (per spec §9's "capability-set
/// polymorphism" note) so the driver can be generic over the clustering
/// strategy even though `KmeansClusterer` is the only implementation this
/// crate ships.
pub trait Clusterer {
    fn cluster(&self, points: &Array2<f64>, seed: u64) -> Result<ClusterAssignment>;
}

/// k-means with model selection over `k in [kmin, kmax]`, `Ntrials`
/// random restarts per `k`, Lloyd updates to a relative-movement tolerance.
/// Grounded in `demoRosenbrockFunction.cpp`'s `KmeansClusterer(myMetric,
/// minNclusters, maxNclusters, Ntrials, relTolerance)` constructor.
pub struct KmeansClusterer<M: Metric + Sync> {
    metric: M,
    kmin: usize,
    kmax: usize,
    ntrials: usize,
    rel_tolerance: f64,
    max_lloyd_iterations: usize,
}

impl<M: Metric + Sync> KmeansClusterer<M> {
    pub fn new(
        metric: M,
        kmin: usize,
        kmax: usize,
        ntrials: usize,
        rel_tolerance: f64,
    ) -> Result<Self> {
        if kmin == 0 || kmax < kmin {
            return Err(Error::Configuration(format!(
                "KmeansClusterer: invalid cluster range [{kmin}, {kmax}]"
            )));
        }
        if ntrials == 0 {
            return Err(Error::Configuration(
                "KmeansClusterer: Ntrials must be at least 1".into(),
            ));
        }
        Ok(KmeansClusterer {
            metric,
            kmin,
            kmax,
            ntrials,
            rel_tolerance,
            max_lloyd_iterations: 300,
        })
    }
}

impl<M: Metric + Sync> Clusterer for KmeansClusterer<M> {
    fn cluster(&self, points: &Array2<f64>, seed: u64) -> Result<ClusterAssignment> {
        let npoints = points.ncols();
        let ndim = points.nrows();
        let kmax = self.kmax.min(npoints);
        if kmax < self.kmin {
            return Err(Error::Configuration(format!(
                "KmeansClusterer: fewer points ({npoints}) than kmin ({})",
                self.kmin
            )));
        }

        let mut best: Option<(f64, ClusterAssignment)> = None;

        for k in self.kmin..=kmax {
            let trial_results: Vec<(f64, ClusterAssignment)> = (0..self.ntrials)
                .into_par_iter()
                .map(|trial| {
                    let trial_seed = seed ^ ((k as u64) << 32) ^ (trial as u64);
                    let mut rng = StdRng::seed_from_u64(trial_seed);
                    self.run_once(points, k, &mut rng)
                })
                .collect();

            let best_trial = trial_results
                .into_iter()
                .min_by(|a, b| a.0.partial_cmp(&b.0).expect("inertia is never NaN"))
                .expect("Ntrials >= 1");

            let inertia = best_trial.0;
            // Open Question #2, pinned: BIC-style score, inertia plus a
            // k-dependent penalty, lowest score wins, ties favor lower k.
            let score = inertia + (k * ndim) as f64 * (npoints as f64).ln();

            let replace = match &best {
                None => true,
                Some((best_score, best_assignment)) => {
                    score < *best_score
                        || (score == *best_score && k < best_assignment.k)
                }
            };
            if replace {
                best = Some((score, best_trial.1));
            }
        }

        Ok(best.expect("kmin..=kmax is non-empty").1)
    }
}

impl<M: Metric + Sync> KmeansClusterer<M> {
    /// One random-restart Lloyd run for a fixed `k`. Returns (inertia,
    /// assignment).
    fn run_once(
        &self,
        points: &Array2<f64>,
        k: usize,
        rng: &mut StdRng,
    ) -> (f64, ClusterAssignment) {
        let npoints = points.ncols();
        let ndim = points.nrows();

        let initial_indices = sample(rng, npoints, k).into_vec();
        let mut centroids = Array2::zeros((ndim, k));
        for (c, &idx) in initial_indices.iter().enumerate() {
            centroids.index_axis_mut(Axis(1), c).assign(&points.column(idx));
        }

        let mut assignments = vec![0usize; npoints];
        for _ in 0..self.max_lloyd_iterations {
            // Assignment step: nearest centroid by the configured metric.
            for j in 0..npoints {
                let point = points.column(j).to_owned();
                let mut best_c = 0usize;
                let mut best_d = f64::INFINITY;
                for c in 0..k {
                    let centroid = centroids.column(c).to_owned();
                    let d = self.metric.distance(&point, &centroid);
                    if d < best_d {
                        best_d = d;
                        best_c = c;
                    }
                }
                assignments[j] = best_c;
            }

            // Update step: recompute centroids as per-cluster means.
            let mut new_centroids = Array2::zeros((ndim, k));
            let mut counts = vec![0usize; k];
            for j in 0..npoints {
                let c = assignments[j];
                counts[c] += 1;
                let mut column = new_centroids.index_axis_mut(Axis(1), c);
                column += &points.column(j);
            }

            for c in 0..k {
                if counts[c] == 0 {
                    // Empty-cluster handling: re-seed at the point farthest
                    // from its current (assigned) centroid, per spec §4.3.
                    let mut farthest_j = 0usize;
                    let mut farthest_d = f64::NEG_INFINITY;
                    for j in 0..npoints {
                        let point = points.column(j).to_owned();
                        let owner = assignments[j];
                        let owner_centroid = centroids.column(owner).to_owned();
                        let d = self.metric.distance(&point, &owner_centroid);
                        if d > farthest_d {
                            farthest_d = d;
                            farthest_j = j;
                        }
                    }
                    new_centroids
                        .index_axis_mut(Axis(1), c)
                        .assign(&points.column(farthest_j));
                    assignments[farthest_j] = c;
                    counts[c] = 1;
                } else {
                    let mut column = new_centroids.index_axis_mut(Axis(1), c);
                    column /= counts[c] as f64;
                }
            }

            let movement: f64 = (0..k)
                .map(|c| {
                    let old = centroids.column(c).to_owned();
                    let new = new_centroids.column(c).to_owned();
                    self.metric.distance(&old, &new)
                })
                .sum();
            let norm: f64 = (0..k)
                .map(|c| {
                    let new = new_centroids.column(c).to_owned();
                    let zero = Array1::zeros(ndim);
                    self.metric.distance(&new, &zero)
                })
                .sum::<f64>()
                .max(f64::EPSILON);

            centroids = new_centroids;

            if movement / norm < self.rel_tolerance {
                break;
            }
        }

        // Final assignment pass with the converged centroids, plus inertia.
        let mut inertia = 0.0;
        let mut counts = vec![0usize; k];
        for j in 0..npoints {
            let point = points.column(j).to_owned();
            let mut best_c = 0usize;
            let mut best_d = f64::INFINITY;
            for c in 0..k {
                let centroid = centroids.column(c).to_owned();
                let d = self.metric.distance(&point, &centroid);
                if d < best_d {
                    best_d = d;
                    best_c = c;
                }
            }
            assignments[j] = best_c;
            counts[best_c] += 1;
            inertia += best_d * best_d;
        }

        (
            inertia,
            ClusterAssignment {
                k,
                assignments,
                centroids,
                counts,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::EuclideanMetric;

    fn two_blob_points() -> Array2<f64> {
        // Two well-separated 2D blobs of 10 points each.
        let mut data = Array2::zeros((2, 20));
        for j in 0..10 {
            data[[0, j]] = -5.0 + 0.1 * j as f64;
            data[[1, j]] = -5.0 + 0.1 * j as f64;
        }
        for j in 10..20 {
            data[[0, j]] = 5.0 + 0.1 * (j - 10) as f64;
            data[[1, j]] = 5.0 + 0.1 * (j - 10) as f64;
        }
        data
    }

    #[test]
    fn recovers_two_well_separated_clusters() {
        let clusterer = KmeansClusterer::new(EuclideanMetric, 1, 4, 5, 1e-4).unwrap();
        let data = two_blob_points();
        let assignment = clusterer.cluster(&data, 7).unwrap();
        assert_eq!(assignment.k, 2);
        let first_half_cluster = assignment.assignments[0];
        let second_half_cluster = assignment.assignments[10];
        assert_ne!(first_half_cluster, second_half_cluster);
        assert!(assignment.assignments[0..10]
            .iter()
            .all(|&c| c == first_half_cluster));
        assert!(assignment.assignments[10..20]
            .iter()
            .all(|&c| c == second_half_cluster));
    }

    #[test]
    fn rejects_kmax_less_than_kmin() {
        let err = KmeansClusterer::new(EuclideanMetric, 4, 2, 5, 1e-4).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn counts_sum_to_total_points() {
        let clusterer = KmeansClusterer::new(EuclideanMetric, 2, 3, 3, 1e-4).unwrap();
        let data = two_blob_points();
        let assignment = clusterer.cluster(&data, 3).unwrap();
        assert_eq!(assignment.counts.iter().sum::<usize>(), 20);
    }
}
