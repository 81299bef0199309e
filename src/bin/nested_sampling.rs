//! CLI entry point: wires one of the built-in demo problems (or a
//! JSON-configured run) to [`nested_sampling::driver::NestedSampler`] and
//! writes the result files spec §6 names. Mirrors the role of DIAMONDS's
//! `demoRosenbrockFunction.cpp` / `demoGaussianShellFunction.cpp`.

use std::process::ExitCode;

use clap::Parser;
use ndarray::Array1;
use tracing_subscriber::EnvFilter;

use nested_sampling::config::{Cli, NestedSamplerConfig, Problem};
use nested_sampling::driver::NestedSampler;
use nested_sampling::error::Error;
use nested_sampling::likelihood::{EggboxLikelihood, GaussianShellLikelihood, RosenbrockLikelihood};
use nested_sampling::prior::UniformPrior;
use nested_sampling::reducer::FerozReducer;
use nested_sampling::results;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match NestedSamplerConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => return fatal(&err),
        },
        None => NestedSamplerConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(prefix) = cli.output_path_prefix.clone() {
        config.output_path_prefix = prefix;
    }

    let filter = if config.print_on_the_screen {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.problem {
        Problem::GaussianShell => {
            let prior = match UniformPrior::new(vec![-6.0, -6.0], vec![6.0, 6.0]) {
                Ok(prior) => prior,
                Err(err) => return fatal(&err),
            };
            let likelihood =
                GaussianShellLikelihood::new(Array1::from(vec![0.0, 0.0]), 2.0, 0.1);
            run(prior, likelihood, config)
        }
        Problem::Rosenbrock => {
            let prior = match UniformPrior::new(vec![-3.0, -2.0], vec![4.0, 10.0]) {
                Ok(prior) => prior,
                Err(err) => return fatal(&err),
            };
            run(prior, RosenbrockLikelihood, config)
        }
        Problem::Eggbox => {
            let prior = match UniformPrior::new(vec![0.0, 0.0], vec![10.0 * std::f64::consts::PI; 2])
            {
                Ok(prior) => prior,
                Err(err) => return fatal(&err),
            };
            run(prior, EggboxLikelihood, config)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fatal(&err),
    }
}

fn run<P, L>(prior: P, likelihood: L, config: NestedSamplerConfig) -> Result<(), Error>
where
    P: nested_sampling::prior::Prior,
    L: nested_sampling::likelihood::Likelihood + Sync,
{
    let output_path_prefix = config.output_path_prefix.clone();
    let sampler = NestedSampler::new(prior, likelihood, FerozReducer, config)?;
    tracing::info!(n_live = sampler.live_points_len(), "starting nested sampling run");
    let sampler_result = sampler.run()?;
    tracing::info!(
        log_z = sampler_result.log_z,
        log_z_error = sampler_result.log_z_error,
        h = sampler_result.h,
        iterations = sampler_result.iterations,
        "run complete"
    );
    results::write_all(&sampler_result, &output_path_prefix, 68.3)?;
    Ok(())
}

/// Prints the error as a diagnostic and maps it to the non-zero exit status
/// spec §6 requires for fatal Configuration/Numeric/draw-exhaustion/I-O
/// errors.
fn fatal(err: &Error) -> ExitCode {
    eprintln!("nested_sampling: {err}");
    ExitCode::FAILURE
}
