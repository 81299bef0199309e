//! Gaussian-shell end-to-end scenario of spec §8: a thin spherical shell
//! likelihood over a uniform box prior whose evidence has a known (to
//! leading order in `width / radius`) closed form, used to sanity-check the
//! whole driver loop rather than any one collaborator in isolation.

use ndarray::Array1;

use nested_sampling::config::NestedSamplerConfig;
use nested_sampling::driver::NestedSampler;
use nested_sampling::likelihood::GaussianShellLikelihood;
use nested_sampling::prior::UniformPrior;
use nested_sampling::reducer::FerozReducer;

fn scenario_config(seed: u64) -> NestedSamplerConfig {
    NestedSamplerConfig {
        initial_nobjects: 300,
        min_nobjects: 300,
        max_ndraw_attempts: 20_000,
        n_initial_iterations_without_clustering: 50,
        n_iterations_with_same_clustering: 20,
        initial_enlargement_fraction: 1.5,
        shrinking_rate: 0.3,
        termination_factor: 0.1,
        kmin: 1,
        kmax: 2,
        ntrials: 3,
        rel_tolerance: 0.02,
        print_on_the_screen: false,
        output_path_prefix: "gaussian_shell_test_".into(),
        seed,
    }
}

#[test]
fn gaussian_shell_evidence_is_near_analytic_value() {
    // Box [-6,6]^2, area 144; shell radius 2, width 0.1 (thin relative to
    // radius, so the leading-order closed form applies): the radial
    // integral of N(rho; r, w) over rho collapses to ~1 (the shell is
    // entirely interior to the box and w << r), leaving a ring of
    // circumference 2*pi*r under the likelihood, divided by the prior's
    // normalization (box area).
    let radius = 2.0;
    let width = 0.1;
    let box_area = 12.0 * 12.0;
    let analytic_log_z = ((2.0 * std::f64::consts::PI * radius) / box_area).ln();

    let prior = UniformPrior::new(vec![-6.0, -6.0], vec![6.0, 6.0]).unwrap();
    let likelihood = GaussianShellLikelihood::new(Array1::from(vec![0.0, 0.0]), radius, width);
    let sampler =
        NestedSampler::new(prior, likelihood, FerozReducer, scenario_config(1)).unwrap();
    let result = sampler.run().unwrap();

    assert!(result.iterations > 0);
    assert!(!result.terminated_by_draw_exhaustion);

    // Generous band: a handful of sigma on the reported error bar, plus
    // slack for the leading-order analytic approximation itself.
    let tolerance = 6.0 * result.log_z_error + 1.0;
    assert!(
        (result.log_z - analytic_log_z).abs() < tolerance,
        "log_z = {}, analytic = {}, tolerance = {}",
        result.log_z,
        analytic_log_z,
        tolerance
    );
}

#[test]
fn gaussian_shell_weights_conserve_evidence() {
    let prior = UniformPrior::new(vec![-6.0, -6.0], vec![6.0, 6.0]).unwrap();
    let likelihood = GaussianShellLikelihood::new(Array1::from(vec![0.0, 0.0]), 2.0, 0.1);
    let sampler =
        NestedSampler::new(prior, likelihood, FerozReducer, scenario_config(2)).unwrap();
    let result = sampler.run().unwrap();

    let total: f64 = result.posterior.log_w.iter().map(|&lw| lw.exp()).sum();
    let relative_error = (result.log_z.exp() - total).abs() / result.log_z.exp();
    assert!(relative_error < 1e-6, "relative_error = {relative_error}");
}
