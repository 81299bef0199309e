use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::clusterer::{ClusterAssignment, Clusterer, KmeansClusterer};
use crate::config::NestedSamplerConfig;
use crate::ellipsoid::EllipsoidSet;
use crate::error::{Error, Result};
use crate::evidence::Evidence;
use crate::likelihood::Likelihood;
use crate::live_point::{LivePoint, LiveSet};
use crate::metric::EuclideanMetric;
use crate::prior::Prior;
use crate::reducer::{LivePointsReducer, ReducerState};
use crate::sampler;

/// Append-only posterior sample: one `(theta, log L, log w)` triple per
/// discarded or finally-flushed live point (spec §3's `PosteriorSample`).
#[derive(Debug, Clone, Default)]
pub struct PosteriorSample {
    pub theta: Vec<Array1<f64>>,
    pub log_l: Vec<f64>,
    pub log_w: Vec<f64>,
}

impl PosteriorSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, theta: Array1<f64>, log_l: f64, log_w: f64) {
        self.theta.push(theta);
        self.log_l.push(log_l);
        self.log_w.push(log_w);
    }

    pub fn len(&self) -> usize {
        self.log_l.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_l.is_empty()
    }

    /// Normalized posterior weights `exp(log_w - log Z)`, summing to 1 up
    /// to truncation error (spec §4.8 invariant).
    pub fn normalized_weights(&self, log_z: f64) -> Vec<f64> {
        self.log_w.iter().map(|&lw| (lw - log_z).exp()).collect()
    }
}

/// Outcome of a completed (or aborted) run: the evidence summary plus the
/// full posterior sample, per spec §1's output contract.
#[derive(Debug, Clone)]
pub struct SamplerResult {
    pub log_z: f64,
    pub log_z_error: f64,
    pub h: f64,
    pub iterations: u64,
    pub elapsed_secs: f64,
    pub posterior: PosteriorSample,
    pub terminated_by_draw_exhaustion: bool,
    pub terminated_by_abort: bool,
}

/// The nested-sampling outer loop (spec §4.8). Owns the live set, the
/// evidence accumulator, the current ellipsoid set, and the RNG; borrows
/// the prior, likelihood, and reducer. The clusterer and metric are fixed
/// to `KmeansClusterer<EuclideanMetric>`, the only pair this crate ships
/// (spec §9 allows either dynamic dispatch or "one implementation per
/// variant" — with a single clusterer and a single metric, a concrete
/// field needs neither).
pub struct NestedSampler<P, L, Rd>
where
    P: Prior,
    L: Likelihood + Sync,
    Rd: LivePointsReducer,
{
    prior: P,
    likelihood: L,
    clusterer: KmeansClusterer<EuclideanMetric>,
    reducer: Rd,
    config: NestedSamplerConfig,
    rng: StdRng,

    live_set: LiveSet,
    evidence: Evidence,
    ellipsoid_set: Option<EllipsoidSet>,
    cluster_assignment: Option<ClusterAssignment>,
    posterior: PosteriorSample,

    n_current: usize,
    log_max_likelihood: f64,
    sum_n: f64,
    n_samples: u64,

    abort_flag: Option<Arc<AtomicBool>>,
}

impl<P, L, Rd> NestedSampler<P, L, Rd>
where
    P: Prior,
    L: Likelihood + Sync,
    Rd: LivePointsReducer,
{
    pub fn new(prior: P, likelihood: L, reducer: Rd, config: NestedSamplerConfig) -> Result<Self> {
        config.validate()?;
        if config.initial_nobjects < prior.dimensions() + 2 {
            return Err(Error::Configuration(format!(
                "initial_nobjects ({}) must be at least Ndimensions + 2 ({})",
                config.initial_nobjects,
                prior.dimensions() + 2
            )));
        }

        let clusterer = KmeansClusterer::new(
            EuclideanMetric,
            config.kmin,
            config.kmax,
            config.ntrials,
            config.rel_tolerance,
        )?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let thetas = prior.draw(config.initial_nobjects, &mut rng);
        let log_ls: Vec<f64> = thetas.par_iter().map(|theta| likelihood.log_value(theta)).collect();
        for log_l in &log_ls {
            if log_l.is_nan() {
                return Err(Error::Numeric(
                    "likelihood returned NaN while drawing the initial live set".into(),
                ));
            }
        }

        let points: Vec<LivePoint> = thetas
            .into_iter()
            .zip(log_ls)
            .map(|(theta, log_l)| LivePoint::new(theta, log_l))
            .collect();
        let live_set = LiveSet::new(points);
        let log_max_likelihood = live_set.max_log_l();
        let n_current = config.initial_nobjects;

        Ok(NestedSampler {
            prior,
            likelihood,
            clusterer,
            reducer,
            config,
            rng,
            live_set,
            evidence: Evidence::new(),
            ellipsoid_set: None,
            cluster_assignment: None,
            posterior: PosteriorSample::new(),
            n_current,
            log_max_likelihood,
            sum_n: 0.0,
            n_samples: 0,
            abort_flag: None,
        })
    }

    /// Installs a cooperative abort flag (spec §5's cancellation path): the
    /// driver checks it between iterations and, if set, flushes the live
    /// set into the posterior and returns early, exactly as on normal
    /// termination.
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort_flag = Some(flag);
        self
    }

    pub fn live_points_len(&self) -> usize {
        self.live_set.len()
    }

    pub fn run(mut self) -> Result<SamplerResult> {
        let start = Instant::now();

        loop {
            if self
                .abort_flag
                .as_ref()
                .map_or(false, |flag| flag.load(Ordering::Relaxed))
            {
                self.flush_remaining();
                return Ok(self.finalize(start, false, true));
            }

            let iteration = self.evidence.iteration;
            let l_star = self.live_set.worst_log_l();

            self.evidence.shrink(self.n_current);
            let log_w = self.evidence.log_weight(l_star);
            self.evidence.accumulate(l_star, log_w);

            let worst = self.live_set.pop_worst();
            self.posterior.push(worst.theta, worst.log_l, log_w);

            self.sum_n += self.n_current as f64;
            self.n_samples += 1;

            // Reclustering must happen before the draw that follows it can
            // consume an ellipsoid set; spec §4.8 lists this as step 8
            // (after the replacement draw of step 7), but an ellipsoid set
            // has to exist before a point can be drawn from it, so this
            // crate triggers the rebuild immediately ahead of the draw
            // instead of immediately after (a resolved ordering ambiguity,
            // see DESIGN.md).
            if self.should_recluster(iteration) {
                self.recluster()?;
            }

            let ellipsoid_set = self
                .ellipsoid_set
                .as_ref()
                .expect("reclustering always builds an ellipsoid set before the first draw");
            let draw = sampler::draw_constrained(
                ellipsoid_set,
                &self.prior,
                &self.likelihood,
                l_star,
                self.config.max_ndraw_attempts,
                iteration,
                &mut self.rng,
            );

            match draw {
                Ok(point) => {
                    self.log_max_likelihood = self.log_max_likelihood.max(point.log_l);
                    self.live_set.insert(point);
                }
                Err(Error::DrawExhaustion { .. }) => {
                    self.flush_remaining();
                    return Ok(self.finalize(start, true, false));
                }
                Err(other) => return Err(other),
            }

            let state = ReducerState {
                iteration,
                n_t: self.n_current,
                log_x: self.evidence.log_x,
                log_z: self.evidence.log_z,
                l_star,
                l_max: self.log_max_likelihood,
            };
            let target_n = self
                .reducer
                .target_nobjects(&state, self.config.min_nobjects)
                .max(self.config.min_nobjects);
            if target_n < self.n_current {
                let shrink_count = self.n_current - target_n;
                let removed = self.live_set.remove_lowest(shrink_count);
                let ln_n = (self.n_current as f64).ln();
                for p in removed {
                    let log_w_removed = p.log_l + self.evidence.log_x - ln_n;
                    self.evidence.fold_final_weight(log_w_removed);
                    self.posterior.push(p.theta, p.log_l, log_w_removed);
                }
                self.n_current = target_n;
            }

            let ratio =
                (self.log_max_likelihood + self.evidence.log_x - self.evidence.log_z).exp();
            if ratio <= self.config.termination_factor {
                self.flush_remaining();
                return Ok(self.finalize(start, false, false));
            }
        }
    }

    fn should_recluster(&self, iteration: u64) -> bool {
        let n_initial = self.config.n_initial_iterations_without_clustering as u64;
        let n_period = self.config.n_iterations_with_same_clustering as u64;
        self.ellipsoid_set.is_none()
            || iteration == n_initial
            || (iteration > n_initial && (iteration - n_initial) % n_period.max(1) == 0)
    }

    fn recluster(&mut self) -> Result<()> {
        let iteration = self.evidence.iteration;
        let coords = self.live_set.coordinate_matrix();
        let assignment = if iteration < self.config.n_initial_iterations_without_clustering as u64
        {
            let centroid = coords.mean_axis(Axis(1)).expect("live set is never empty");
            let mut centroids = ndarray::Array2::zeros((coords.nrows(), 1));
            centroids.index_axis_mut(Axis(1), 0).assign(&centroid);
            ClusterAssignment {
                k: 1,
                assignments: vec![0; coords.ncols()],
                centroids,
                counts: vec![coords.ncols()],
            }
        } else {
            let seed: u64 = self.rng.gen();
            self.clusterer.cluster(&coords, seed)?
        };

        let ellipsoid_set = EllipsoidSet::build(
            &assignment,
            &coords,
            self.evidence.log_x,
            self.config.initial_nobjects,
            self.config.initial_enlargement_fraction,
            self.config.shrinking_rate,
        )?;
        self.cluster_assignment = Some(assignment);
        self.ellipsoid_set = Some(ellipsoid_set);
        Ok(())
    }

    /// Distributes all remaining live points into the posterior with
    /// weight `L_i * X_t / N_t` each (spec §4.7/§4.8's termination clause),
    /// folding each weight into `log Z` so the weight-conservation
    /// invariant (spec §8 item 4) holds over discarded + final points.
    fn flush_remaining(&mut self) {
        let n = self.live_set.len();
        if n == 0 {
            return;
        }
        let ln_n = (n as f64).ln();
        let log_x = self.evidence.log_x;
        for p in self.live_set.drain_all() {
            let log_w = p.log_l + log_x - ln_n;
            self.evidence.fold_final_weight(log_w);
            self.posterior.push(p.theta, p.log_l, log_w);
        }
    }

    fn finalize(
        self,
        start: Instant,
        terminated_by_draw_exhaustion: bool,
        terminated_by_abort: bool,
    ) -> SamplerResult {
        let n_avg = if self.n_samples > 0 {
            self.sum_n / self.n_samples as f64
        } else {
            self.n_current as f64
        };
        SamplerResult {
            log_z: self.evidence.log_z,
            log_z_error: self.evidence.log_z_error(n_avg.max(1.0)),
            h: self.evidence.h,
            iterations: self.evidence.iteration,
            elapsed_secs: start.elapsed().as_secs_f64(),
            posterior: self.posterior,
            terminated_by_draw_exhaustion,
            terminated_by_abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likelihood::RosenbrockLikelihood;
    use crate::prior::UniformPrior;
    use crate::reducer::FerozReducer;

    fn small_config() -> NestedSamplerConfig {
        NestedSamplerConfig {
            initial_nobjects: 60,
            min_nobjects: 60,
            max_ndraw_attempts: 5_000,
            n_initial_iterations_without_clustering: 20,
            n_iterations_with_same_clustering: 10,
            initial_enlargement_fraction: 2.0,
            shrinking_rate: 0.4,
            termination_factor: 0.2,
            kmin: 1,
            kmax: 2,
            ntrials: 2,
            rel_tolerance: 0.05,
            print_on_the_screen: false,
            output_path_prefix: "test_".into(),
            seed: 123,
        }
    }

    #[test]
    fn run_terminates_and_conserves_weight() {
        let prior = UniformPrior::new(vec![-3.0, -2.0], vec![4.0, 10.0]).unwrap();
        let likelihood = RosenbrockLikelihood;
        let sampler = NestedSampler::new(prior, likelihood, FerozReducer, small_config()).unwrap();
        let result = sampler.run().unwrap();

        assert!(result.iterations > 0);
        assert!(!result.posterior.is_empty());

        let total: f64 = result.posterior.log_w.iter().map(|&lw| lw.exp()).sum();
        assert!((result.log_z.exp() - total).abs() < 1e-6 * result.iterations as f64);
    }

    #[test]
    fn rejects_too_few_initial_points_for_dimensionality() {
        let prior = UniformPrior::new(vec![-3.0, -2.0], vec![4.0, 10.0]).unwrap();
        let likelihood = RosenbrockLikelihood;
        let mut config = small_config();
        config.initial_nobjects = 2;
        config.min_nobjects = 2;
        let err = NestedSampler::new(prior, likelihood, FerozReducer, config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn abort_flag_flushes_and_returns_early() {
        let prior = UniformPrior::new(vec![-3.0, -2.0], vec![4.0, 10.0]).unwrap();
        let likelihood = RosenbrockLikelihood;
        let flag = Arc::new(AtomicBool::new(true));
        let sampler = NestedSampler::new(prior, likelihood, FerozReducer, small_config())
            .unwrap()
            .with_abort_flag(flag);
        let result = sampler.run().unwrap();
        assert!(result.terminated_by_abort);
        assert!(!result.posterior.is_empty());
    }
}
