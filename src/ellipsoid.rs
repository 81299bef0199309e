use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use statrs::function::gamma::gamma;

use crate::clusterer::ClusterAssignment;
use crate::error::{Error, Result};

/// Eigenvalues below this floor are clamped upward before inversion, so a
/// numerically singular cluster covariance never yields an infinite or
/// negative semi-axis (spec §7: "Singular: clamp eigenvalues and continue
/// with a diagnostic").
const EIGENVALUE_FLOOR: f64 = 1e-12;

/// One enlarged ellipsoid: center, orthonormal eigenbasis, original and
/// enlarged eigenvalues, and the resulting hyper-volume. Ported from the
/// per-cluster block DIAMONDS' `HyperEllipsoidSampler::computeEllipsoids`
/// stores in its flattened `allCentersCoordinates` / `allEigenvectorsMatrix`
/// / `allEnlargedEigenvalues` arrays — kept here as one struct per
/// ellipsoid instead, per spec §9's note that this is the clearer layout.
#[derive(Debug, Clone)]
pub struct Ellipsoid {
    pub center: Array1<f64>,
    pub eigvecs: Array2<f64>,
    pub eigvals: Array1<f64>,
    pub enlarged_eigvals: Array1<f64>,
    pub volume: f64,
}

/// Volume of the unit ball in `d` dimensions, `V_d = pi^(d/2) / Gamma(d/2 + 1)`.
fn unit_ball_volume(d: usize) -> f64 {
    std::f64::consts::PI.powf(d as f64 / 2.0) / gamma(d as f64 / 2.0 + 1.0)
}

/// Column-wise sample mean and unbiased sample covariance of a `(D, n)`
/// block of points. Ported from `Functions::clusterCovariance`.
fn cluster_covariance(sample: ArrayView2<f64>) -> (Array1<f64>, Array2<f64>) {
    let ndim = sample.nrows();
    let n = sample.ncols();
    let mean = sample.mean_axis(Axis(1)).expect("cluster is non-empty");

    let mut cov = Array2::zeros((ndim, ndim));
    for j in 0..n {
        let centered = &sample.column(j) - &mean;
        for a in 0..ndim {
            for b in 0..ndim {
                cov[[a, b]] += centered[a] * centered[b];
            }
        }
    }
    cov /= (n - 1) as f64;
    (mean, cov)
}

/// Symmetric eigendecomposition of a covariance matrix via nalgebra's
/// `SymmetricEigen`, with eigenvalues clamped to `EIGENVALUE_FLOOR` to keep
/// the ellipsoid positive definite even for a near-degenerate cluster.
fn eigendecompose(cov: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let ndim = cov.nrows();
    let flat: Vec<f64> = cov.iter().copied().collect();
    // ndarray is row-major by default; nalgebra's `from_row_slice` expects
    // the same layout.
    let matrix = DMatrix::from_row_slice(ndim, ndim, &flat);
    let eigen = SymmetricEigen::new(matrix);

    let eigvals: Array1<f64> = Array1::from_iter(
        eigen
            .eigenvalues
            .iter()
            .map(|&lambda| lambda.max(EIGENVALUE_FLOOR)),
    );

    let mut eigvecs = Array2::zeros((ndim, ndim));
    for i in 0..ndim {
        for j in 0..ndim {
            eigvecs[[i, j]] = eigen.eigenvectors[(i, j)];
        }
    }
    (eigvals, eigvecs)
}

impl Ellipsoid {
    /// Builds one ellipsoid from a `(D, n_c)` block of cluster points.
    /// Returns `None` when `n_c <= D + 1` (spec §4.4: too few points to fit
    /// a covariance, so the cluster contributes no ellipsoid).
    pub fn build(
        sample: ArrayView2<f64>,
        log_x: f64,
        n_initial: usize,
        f0: f64,
        shrinking_rate: f64,
    ) -> Option<Ellipsoid> {
        let ndim = sample.nrows();
        let n_c = sample.ncols();
        if n_c <= ndim + 1 {
            return None;
        }

        let (center, cov) = cluster_covariance(sample);
        let (eigvals, eigvecs) = eigendecompose(&cov);

        // Enlargement per Feroz & Hobson (2008): f = f0 * X^alpha *
        // sqrt(N_initial / n_c); semi-axes scale by (1+f), eigenvalues by
        // (1+f)^2.
        let enlargement_factor =
            f0 * (log_x * shrinking_rate).exp() * (n_initial as f64 / n_c as f64).sqrt();
        let enlarged_eigvals: Array1<f64> = eigvals
            .mapv(|lambda| {
                let semi_axis = lambda.sqrt() * (1.0 + enlargement_factor);
                semi_axis * semi_axis
            });

        let volume = unit_ball_volume(ndim) * enlarged_eigvals.iter().map(|v| v.sqrt()).product::<f64>();

        Some(Ellipsoid {
            center,
            eigvecs,
            eigvals,
            enlarged_eigvals,
            volume,
        })
    }

    /// `(x - c)^T V diag(1/lambda') V^T (x - c)`, the Mahalanobis distance
    /// of `x` under the enlarged ellipsoid's metric.
    fn mahalanobis_sq(&self, x: &Array1<f64>, eigvals: &Array1<f64>) -> f64 {
        let centered = x - &self.center;
        let projected = self.eigvecs.t().dot(&centered);
        projected
            .iter()
            .zip(eigvals.iter())
            .map(|(p, lambda)| p * p / lambda)
            .sum()
    }

    /// Point-in-ellipsoid test against the enlarged axes.
    pub fn contains(&self, x: &Array1<f64>) -> bool {
        self.mahalanobis_sq(x, &self.enlarged_eigvals) <= 1.0
    }

    /// Point-in-ellipsoid test against the un-enlarged (raw covariance)
    /// axes; used only by the containment-invariant property test of
    /// spec §8 item 6.
    pub fn contains_unenlarged(&self, x: &Array1<f64>) -> bool {
        self.mahalanobis_sq(x, &self.eigvals) <= 1.0
    }

    /// The "shape matrix" `A = V diag(1/lambda') V^T` such that
    /// `E = {x : (x-c)^T A (x-c) <= 1}`, needed by the overlap test.
    fn shape_matrix(&self) -> DMatrix<f64> {
        let ndim = self.center.len();
        let mut a = DMatrix::zeros(ndim, ndim);
        for i in 0..ndim {
            for j in 0..ndim {
                let mut sum = 0.0;
                for k in 0..ndim {
                    sum += self.eigvecs[[i, k]] * self.eigvecs[[j, k]] / self.enlarged_eigvals[k];
                }
                a[(i, j)] = sum;
            }
        }
        a
    }
}

/// Exact (no-false-negative) pairwise overlap test between two ellipsoids,
/// via the S-procedure / Alfano-Greer criterion named in spec §4.5.
///
/// For `E_i = {x : (x-c_i)^T A_i (x-c_i) <= 1}`, define for `s in [0,1]`:
///   `M(s) = (1-s) A1 + s A2`
///   `b(s) = (1-s) A1 c1 + s A2 c2`
///   `r(s) = (1-s)(c1^T A1 c1 - 1) + s(c2^T A2 c2 - 1)`
///   `K(s) = r(s) - b(s)^T M(s)^{-1} b(s)`
/// `K` is concave on `[0,1]` (both `A1`, `A2` are positive definite), and
/// `E1, E2` are disjoint iff `max_s K(s) >= 0`. We find the maximum by
/// golden-section search, which is exact for a unimodal/concave function.
fn ellipsoids_overlap(e1: &Ellipsoid, e2: &Ellipsoid) -> bool {
    let a1 = e1.shape_matrix();
    let a2 = e2.shape_matrix();
    let ndim = e1.center.len();
    let c1 = DVector::from_iterator(ndim, e1.center.iter().copied());
    let c2 = DVector::from_iterator(ndim, e2.center.iter().copied());

    let k_of = |s: f64| -> f64 {
        let m = &a1 * (1.0 - s) + &a2 * s;
        let b = &a1 * &c1 * (1.0 - s) + &a2 * &c2 * s;
        let r = (1.0 - s) * (c1.dot(&(&a1 * &c1)) - 1.0) + s * (c2.dot(&(&a2 * &c2)) - 1.0);

        match m.clone().cholesky() {
            Some(chol) => {
                let m_inv_b = chol.solve(&b);
                r - b.dot(&m_inv_b)
            }
            None => f64::NEG_INFINITY,
        }
    };

    // Golden-section search for the maximum of the concave K over [0, 1].
    let golden_ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
    let (mut lo, mut hi) = (0.0, 1.0);
    let mut x1 = hi - golden_ratio * (hi - lo);
    let mut x2 = lo + golden_ratio * (hi - lo);
    let mut f1 = k_of(x1);
    let mut f2 = k_of(x2);
    for _ in 0..100 {
        if (hi - lo) < 1e-14 {
            break;
        }
        if f1 < f2 {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + golden_ratio * (hi - lo);
            f2 = k_of(x2);
        } else {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - golden_ratio * (hi - lo);
            f1 = k_of(x1);
        }
    }

    let max_k = k_of(0.0).max(k_of(1.0)).max(f1).max(f2);
    max_k < 0.0
}

/// The set of ellipsoids built from one clustering, indexed by cluster id,
/// plus the pairwise overlap graph DIAMONDS computes via
/// `HyperEllipsoidIntersector::findOverlappingEllipsoids`.
#[derive(Debug, Clone)]
pub struct EllipsoidSet {
    pub ellipsoids: Vec<Ellipsoid>,
    /// `ellipsoids[i]` was built from original cluster id `cluster_of[i]`.
    pub cluster_of: Vec<usize>,
    pub overlaps: Vec<(usize, usize)>,
}

impl EllipsoidSet {
    pub fn build(
        assignment: &ClusterAssignment,
        coords: &Array2<f64>,
        log_x: f64,
        n_initial: usize,
        f0: f64,
        shrinking_rate: f64,
    ) -> Result<EllipsoidSet> {
        let ndim = coords.nrows();
        let mut ellipsoids = Vec::new();
        let mut cluster_of = Vec::new();

        for c in 0..assignment.k {
            let member_columns: Vec<usize> = assignment
                .assignments
                .iter()
                .enumerate()
                .filter(|(_, &cluster)| cluster == c)
                .map(|(j, _)| j)
                .collect();
            if member_columns.len() <= ndim + 1 {
                continue;
            }

            let mut cluster_sample = Array2::zeros((ndim, member_columns.len()));
            for (new_j, &old_j) in member_columns.iter().enumerate() {
                cluster_sample
                    .index_axis_mut(Axis(1), new_j)
                    .assign(&coords.column(old_j));
            }

            if let Some(ellipsoid) =
                Ellipsoid::build(cluster_sample.view(), log_x, n_initial, f0, shrinking_rate)
            {
                ellipsoids.push(ellipsoid);
                cluster_of.push(c);
            }
        }

        if ellipsoids.is_empty() {
            return Err(Error::Numeric(
                "no cluster had enough points to build an ellipsoid".into(),
            ));
        }

        let mut overlaps = Vec::new();
        for i in 0..ellipsoids.len() {
            for j in (i + 1)..ellipsoids.len() {
                if ellipsoids_overlap(&ellipsoids[i], &ellipsoids[j]) {
                    overlaps.push((i, j));
                }
            }
        }

        Ok(EllipsoidSet {
            ellipsoids,
            cluster_of,
            overlaps,
        })
    }

    /// Indices of ellipsoids with no overlap partner.
    pub fn isolated_indices(&self) -> Vec<usize> {
        (0..self.ellipsoids.len())
            .filter(|&i| !self.overlaps.iter().any(|&(a, b)| a == i || b == i))
            .collect()
    }

    /// Indices of ellipsoids that overlap at least one other ellipsoid.
    pub fn overlapping_indices(&self) -> Vec<usize> {
        (0..self.ellipsoids.len())
            .filter(|&i| self.overlaps.iter().any(|&(a, b)| a == i || b == i))
            .collect()
    }

    /// Number of ellipsoids (among `candidates`) that contain `x`. Used by
    /// the constrained sampler's overlap-rejection step (spec §4.6 step 6).
    pub fn containing_count(&self, x: &Array1<f64>, candidates: &[usize]) -> usize {
        candidates
            .iter()
            .filter(|&&i| self.ellipsoids[i].contains(x))
            .count()
    }

    pub fn total_volume(&self, indices: &[usize]) -> f64 {
        indices.iter().map(|&i| self.ellipsoids[i].volume).sum()
    }
}
