/// `log(exp(a) + exp(b))`, computed without overflow. Ported from
/// `Functions::logExpSum`, used throughout the driver to accumulate `log Z`
/// in log-space.
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// `log(exp(a) - exp(b))` for `a > b`, used to turn the monotonically
/// decreasing `log X` sequence into the per-iteration weight
/// `log(X_{t-1} - X_t)` without ever exponentiating the (very negative)
/// prior-mass values directly.
fn log_sub_exp(a: f64, b: f64) -> f64 {
    debug_assert!(a >= b, "log_sub_exp requires a >= b, got {a} < {b}");
    a + (-(b - a).exp()).ln_1p()
}

/// Evidence accumulator: running `log Z` (log-sum-exp of all discarded
/// weights), Skilling's information gain `H`, and the shrinking prior mass
/// `log X`. Ported from the bookkeeping fields of DIAMONDS's `NestedSampler`
/// (`logEvidence`, `informationGain`, `logRemainingPriorMass`).
#[derive(Debug, Clone)]
pub struct Evidence {
    pub log_z: f64,
    pub h: f64,
    pub log_x: f64,
    pub log_x_prev: f64,
    pub iteration: u64,
}

impl Evidence {
    pub fn new() -> Self {
        Evidence {
            log_z: f64::NEG_INFINITY,
            h: 0.0,
            log_x: 0.0,
            log_x_prev: 0.0,
            iteration: 0,
        }
    }

    /// Per-iteration prior-mass contraction `log X_t = log X_{t-1} +
    /// log((N_t - 1) / N_t)`, the variable-N form of spec §4.8 step 2 (used
    /// whenever the reducer can shrink `N`, which subsumes the classical
    /// `log X_t = -t/N` form when `N` is held constant).
    pub fn shrink(&mut self, n: usize) {
        debug_assert!(n > 0, "live set must be non-empty");
        self.log_x_prev = self.log_x;
        self.log_x += ((n - 1) as f64 / n as f64).ln();
    }

    /// `log w_t = L*_t + log(X_{t-1} - X_t)`.
    pub fn log_weight(&self, l_star: f64) -> f64 {
        l_star + log_sub_exp(self.log_x_prev, self.log_x)
    }

    /// Folds one discarded point's weight into `log Z` and `H`, via the
    /// standard nested-sampling recurrence (Skilling 2006):
    ///
    /// ```text
    /// logZ' = logAddExp(logZ, logw)
    /// H'    = exp(logw - logZ') * L* + exp(logZ - logZ') * (H + logZ) - logZ'
    /// ```
    ///
    /// The second term is defined to be zero when `logZ = -inf` (the first
    /// accumulation), since `exp(-inf) * (H + -inf)` would otherwise be an
    /// indeterminate `0 * -inf`.
    pub fn accumulate(&mut self, l_star: f64, log_w: f64) {
        let log_z_new = log_add_exp(self.log_z, log_w);
        let carry_term = if self.log_z == f64::NEG_INFINITY {
            0.0
        } else {
            (self.log_z - log_z_new).exp() * (self.h + self.log_z)
        };
        self.h = (log_w - log_z_new).exp() * l_star + carry_term - log_z_new;
        self.log_z = log_z_new;
        self.iteration += 1;
    }

    /// Folds a final (non-discarded) live point's weight into `log Z` only,
    /// for the end-of-run flush of remaining live points (spec §4.8's
    /// termination step and §4.7's "fold into posterior" clause). `H` is
    /// not revised further: Skilling's recurrence describes the sequential
    /// discard process, not the one-shot flush of the surviving set.
    pub fn fold_final_weight(&mut self, log_w: f64) {
        self.log_z = log_add_exp(self.log_z, log_w);
    }

    /// `sigma(log Z) = sqrt(H / N_avg)`, the error bar on the evidence
    /// estimate (spec §4.8).
    pub fn log_z_error(&self, n_avg: f64) -> f64 {
        (self.h / n_avg).sqrt()
    }
}

impl Default for Evidence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_add_exp_matches_naive_computation() {
        let a = -3.0;
        let b = -5.0;
        let expected = (a.exp() + b.exp()).ln();
        assert!((log_add_exp(a, b) - expected).abs() < 1e-12);
    }

    #[test]
    fn log_add_exp_is_symmetric_and_identity_at_neg_infinity() {
        assert_eq!(log_add_exp(f64::NEG_INFINITY, -2.0), -2.0);
        assert_eq!(log_add_exp(-2.0, f64::NEG_INFINITY), -2.0);
        assert!((log_add_exp(-1.0, -4.0) - log_add_exp(-4.0, -1.0)).abs() < 1e-15);
    }

    #[test]
    fn shrink_is_strictly_decreasing() {
        let mut evidence = Evidence::new();
        let mut previous = evidence.log_x;
        for _ in 0..20 {
            evidence.shrink(100);
            assert!(evidence.log_x < previous);
            previous = evidence.log_x;
        }
    }

    #[test]
    fn accumulate_matches_weight_conservation() {
        let mut evidence = Evidence::new();
        let mut total_w = 0.0_f64;
        for _ in 0..10 {
            evidence.shrink(50);
            let log_w = evidence.log_weight(-1.0);
            evidence.accumulate(-1.0, log_w);
            total_w += log_w.exp();
        }
        assert!((evidence.log_z.exp() - total_w).abs() < 1e-9);
    }

    #[test]
    fn first_accumulate_does_not_produce_nan_information_gain() {
        let mut evidence = Evidence::new();
        evidence.shrink(10);
        let log_w = evidence.log_weight(-2.0);
        evidence.accumulate(-2.0, log_w);
        assert!(evidence.h.is_finite());
    }
}
