use crate::evidence::log_add_exp;

/// The driver state the reducer needs to decide the next live-set size,
/// per spec §4.7: `(t, N_t, log X_t, log Z_t, L*_t, L_max)`.
#[derive(Debug, Clone, Copy)]
pub struct ReducerState {
    pub iteration: u64,
    pub n_t: usize,
    pub log_x: f64,
    pub log_z: f64,
    pub l_star: f64,
    pub l_max: f64,
}

/// Policy object consulted once per iteration to decide the live-set size
/// for the next iteration. Takes `&mut self` because a reducer is allowed
/// to accumulate internal state (spec §3, "Ownership"), even though neither
/// shipped variant currently needs to.
pub trait LivePointsReducer {
    /// Returns the target `N_{t+1} in [min_n, state.n_t]`.
    fn target_nobjects(&mut self, state: &ReducerState, min_n: usize) -> usize;
}

/// Feroz & Hobson (2009): the live-set size never shrinks. Named after
/// DIAMONDS's `FerozReducer`, referenced (commented out) in
/// `demoRosenbrockFunction.cpp` alongside `PowerlawReducer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FerozReducer;

impl LivePointsReducer for FerozReducer {
    fn target_nobjects(&mut self, state: &ReducerState, _min_n: usize) -> usize {
        state.n_t
    }
}

/// `N_{t+1} = max(minN, floor(N_initial * remainderRatio^beta))`, where
/// `remainderRatio = L_max * X_t / (Z_t + L_max * X_t)` (spec §4.7).
///
/// `tolerance` and `termination_factor` are accepted to match the ctor
/// signature of DIAMONDS's `PowerlawReducer(nestedSampler, tolerance,
/// exponent, terminationFactor)` seen in `demoRosenbrockFunction.cpp`, but
/// spec §4.7 only names `beta` in the `N_{t+1}` formula itself, so they are
/// stored without feeding into the arithmetic below (see DESIGN.md).
#[derive(Debug, Clone, Copy)]
pub struct PowerlawReducer {
    n_initial: usize,
    #[allow(dead_code)]
    tolerance: f64,
    beta: f64,
    #[allow(dead_code)]
    termination_factor: f64,
}

impl PowerlawReducer {
    pub fn new(n_initial: usize, tolerance: f64, beta: f64, termination_factor: f64) -> Self {
        PowerlawReducer {
            n_initial,
            tolerance,
            beta,
            termination_factor,
        }
    }
}

impl LivePointsReducer for PowerlawReducer {
    fn target_nobjects(&mut self, state: &ReducerState, min_n: usize) -> usize {
        let log_l_max_x = state.l_max + state.log_x;
        let log_denominator = log_add_exp(state.log_z, log_l_max_x);
        let remainder_ratio = (log_l_max_x - log_denominator).exp();
        let target = (self.n_initial as f64 * remainder_ratio.powf(self.beta)).floor();
        let target = if target.is_finite() { target as i64 } else { min_n as i64 };
        (target.max(min_n as i64) as usize).min(state.n_t)
    }
}
