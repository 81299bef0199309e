use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Driver configuration: every named option of spec §6, plus a `seed` that
/// replaces DIAMONDS's wall-clock RNG seeding (spec §9, "Global RNG").
/// `Serialize`/`Deserialize` so it can round-trip through a JSON file with
/// `serde_json`, the same way DIAMONDS demo programs hard-code these as
/// local variables but a library caller would load them from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedSamplerConfig {
    pub initial_nobjects: usize,
    pub min_nobjects: usize,
    pub max_ndraw_attempts: usize,
    pub n_initial_iterations_without_clustering: usize,
    pub n_iterations_with_same_clustering: usize,
    pub initial_enlargement_fraction: f64,
    pub shrinking_rate: f64,
    pub termination_factor: f64,
    pub kmin: usize,
    pub kmax: usize,
    pub ntrials: usize,
    pub rel_tolerance: f64,
    pub print_on_the_screen: bool,
    pub output_path_prefix: String,
    pub seed: u64,
}

impl Default for NestedSamplerConfig {
    /// Mirrors the values hard-coded in `demoRosenbrockFunction.cpp`.
    fn default() -> Self {
        NestedSamplerConfig {
            initial_nobjects: 1000,
            min_nobjects: 400,
            max_ndraw_attempts: 50_000,
            n_initial_iterations_without_clustering: 200,
            n_iterations_with_same_clustering: 20,
            initial_enlargement_fraction: 2.0,
            shrinking_rate: 0.4,
            termination_factor: 0.05,
            kmin: 1,
            kmax: 6,
            ntrials: 10,
            rel_tolerance: 0.01,
            print_on_the_screen: true,
            output_path_prefix: "nested_sampling_".to_string(),
            seed: 42,
        }
    }
}

impl NestedSamplerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Configuration(format!("invalid config file {path:?}: {e}")))
    }

    /// Fatal-at-construction checks (spec §7 "Configuration" errors) that
    /// don't belong to any single collaborator: cluster-count range,
    /// live-set floor/ceiling ordering, and the hyperparameters that must
    /// stay within the ranges spec §6 documents.
    pub fn validate(&self) -> Result<()> {
        if self.kmin == 0 {
            return Err(Error::Configuration("kmin must be at least 1".into()));
        }
        if self.kmax < self.kmin {
            return Err(Error::Configuration(format!(
                "kmax ({}) must be >= kmin ({})",
                self.kmax, self.kmin
            )));
        }
        if self.min_nobjects > self.initial_nobjects {
            return Err(Error::Configuration(format!(
                "min_nobjects ({}) must be <= initial_nobjects ({})",
                self.min_nobjects, self.initial_nobjects
            )));
        }
        if self.min_nobjects == 0 {
            return Err(Error::Configuration("min_nobjects must be at least 1".into()));
        }
        if self.max_ndraw_attempts == 0 {
            return Err(Error::Configuration(
                "max_ndraw_attempts must be at least 1".into(),
            ));
        }
        if !(self.termination_factor > 0.0 && self.termination_factor < 1.0) {
            return Err(Error::Configuration(format!(
                "termination_factor ({}) must lie in (0, 1)",
                self.termination_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.shrinking_rate) {
            return Err(Error::Configuration(format!(
                "shrinking_rate ({}) must lie in [0, 1]",
                self.shrinking_rate
            )));
        }
        if !(self.initial_enlargement_fraction.is_finite() && self.initial_enlargement_fraction >= 0.0)
        {
            return Err(Error::Configuration(
                "initial_enlargement_fraction must be finite and non-negative".into(),
            ));
        }
        if self.ntrials == 0 {
            return Err(Error::Configuration("ntrials must be at least 1".into()));
        }
        Ok(())
    }
}

/// Built-in demo likelihood/prior pairs the CLI can wire up, matching the
/// role of DIAMONDS's separate `demo*.cpp` programs (spec §8's end-to-end
/// scenarios).
#[derive(Debug, Clone, Copy, clap::ArgEnum)]
pub enum Problem {
    GaussianShell,
    Rosenbrock,
    Eggbox,
}

/// CLI entry point flags. `demoRosenbrockFunction.cpp`'s hard-coded
/// hyperparameters become a `--config` JSON file; everything else is a
/// small set of overrides plus the choice of built-in problem.
#[derive(Debug, Parser)]
#[clap(
    name = "nested_sampling",
    about = "MultiNest-style nested sampling demo driver"
)]
pub struct Cli {
    /// Path to a JSON file deserializing to `NestedSamplerConfig`. Falls
    /// back to `NestedSamplerConfig::default()` when omitted.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Which built-in test problem to run.
    #[clap(long, arg_enum, default_value = "rosenbrock")]
    pub problem: Problem,

    /// Overrides the config's RNG seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Overrides the config's output path prefix.
    #[clap(long)]
    pub output_path_prefix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(NestedSamplerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_kmax_less_than_kmin() {
        let mut config = NestedSamplerConfig::default();
        config.kmax = 0;
        config.kmin = 3;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_termination_factor_out_of_range() {
        let mut config = NestedSamplerConfig::default();
        config.termination_factor = 1.5;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn rejects_min_nobjects_above_initial() {
        let mut config = NestedSamplerConfig::default();
        config.min_nobjects = config.initial_nobjects + 1;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
