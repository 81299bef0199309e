use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::driver::SamplerResult;
use crate::error::Result;

/// Writes every output file spec §6 names, rooted at `output_path_prefix`
/// (which may itself include a directory component, e.g.
/// `"out/demoRosenbrockFunction_"`). Mirrors DIAMONDS's `Results` class,
/// called from `demoRosenbrockFunction.cpp` as a sequence of
/// `results.write*ToFile(...)` calls.
pub fn write_all(result: &SamplerResult, output_path_prefix: &str, credible_level: f64) -> Result<()> {
    if let Some(parent) = Path::new(output_path_prefix).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_parameters(result, output_path_prefix)?;
    write_log_likelihood(result, output_path_prefix)?;
    write_evidence_information(result, output_path_prefix)?;
    write_posterior_distribution(result, output_path_prefix)?;
    write_parameter_summary(result, output_path_prefix, credible_level)?;
    Ok(())
}

/// `<prefix>Parameter<dim>.txt`: posterior sample for one coordinate per
/// file, one value per row.
fn write_parameters(result: &SamplerResult, prefix: &str) -> Result<()> {
    let ndim = result.posterior.theta.first().map(|t| t.len()).unwrap_or(0);
    for dim in 0..ndim {
        let path = format!("{prefix}Parameter{dim}.txt");
        let mut writer = BufWriter::new(File::create(path)?);
        for theta in &result.posterior.theta {
            writeln!(writer, "{:.12e}", theta[dim])?;
        }
    }
    Ok(())
}

/// `<prefix>LikelihoodDistribution.txt`: `log L` per posterior row.
fn write_log_likelihood(result: &SamplerResult, prefix: &str) -> Result<()> {
    let path = format!("{prefix}LikelihoodDistribution.txt");
    let mut writer = BufWriter::new(File::create(path)?);
    for log_l in &result.posterior.log_l {
        writeln!(writer, "{log_l:.12e}")?;
    }
    Ok(())
}

/// `<prefix>EvidenceInformation.txt`: the scalar summary of the run.
fn write_evidence_information(result: &SamplerResult, prefix: &str) -> Result<()> {
    let path = format!("{prefix}EvidenceInformation.txt");
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(
        writer,
        "{:.12e} {:.12e} {:.12e} {} {:.6}",
        result.log_z, result.log_z_error, result.h, result.iterations, result.elapsed_secs
    )?;
    Ok(())
}

/// `<prefix>PosteriorDistribution.txt`: normalized posterior weights.
fn write_posterior_distribution(result: &SamplerResult, prefix: &str) -> Result<()> {
    let path = format!("{prefix}PosteriorDistribution.txt");
    let mut writer = BufWriter::new(File::create(path)?);
    for w in result.posterior.normalized_weights(result.log_z) {
        writeln!(writer, "{w:.12e}")?;
    }
    Ok(())
}

/// `<prefix>ParameterSummary.txt`: one row per parameter — mean, median,
/// mode, and the `credible_level`% credible-interval endpoints.
fn write_parameter_summary(result: &SamplerResult, prefix: &str, credible_level: f64) -> Result<()> {
    let path = format!("{prefix}ParameterSummary.txt");
    let mut writer = BufWriter::new(File::create(path)?);
    let ndim = result.posterior.theta.first().map(|t| t.len()).unwrap_or(0);
    let weights = result.posterior.normalized_weights(result.log_z);

    let tail = (1.0 - credible_level / 100.0) / 2.0;
    for dim in 0..ndim {
        let values: Vec<(f64, f64)> = result
            .posterior
            .theta
            .iter()
            .zip(weights.iter())
            .map(|(theta, &w)| (theta[dim], w))
            .collect();
        let mean = weighted_mean(&values);
        let median = weighted_quantile(&values, 0.5);
        let mode = weighted_mode(&values);
        let lower = weighted_quantile(&values, tail);
        let upper = weighted_quantile(&values, 1.0 - tail);
        writeln!(
            writer,
            "{mean:.12e} {median:.12e} {mode:.12e} {lower:.12e} {upper:.12e}"
        )?;
    }
    Ok(())
}

fn weighted_mean(values: &[(f64, f64)]) -> f64 {
    let total: f64 = values.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    values.iter().map(|(v, w)| v * w).sum::<f64>() / total
}

/// Weighted quantile via a cumulative-weight binary search: sorts by
/// coordinate value, builds the running normalized cumulative weight, and
/// uses `bisection::bisect_left` (the crate's port of Python's `bisect`
/// module) to locate the insertion point for `quantile`.
fn weighted_quantile(values: &[(f64, f64)], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("parameter values are finite"));
    let total: f64 = sorted.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return sorted[sorted.len() / 2].0;
    }

    let mut cumulative = Vec::with_capacity(sorted.len());
    let mut running = 0.0;
    for (_, w) in &sorted {
        running += w / total;
        cumulative.push(running);
    }

    let idx = bisection::bisect_left(&cumulative, &quantile).min(sorted.len() - 1);
    sorted[idx].0
}

/// Weighted mode via a simple weighted histogram: bins the coordinate
/// range into fixed-width bins, accumulates weight per bin, and returns
/// the center of the heaviest bin.
fn weighted_mode(values: &[(f64, f64)]) -> f64 {
    const NBINS: usize = 50;
    if values.is_empty() {
        return f64::NAN;
    }
    let min = values.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min);
    let max = values
        .iter()
        .map(|(v, _)| *v)
        .fold(f64::NEG_INFINITY, f64::max);
    if !(max > min) {
        return min;
    }

    let width = (max - min) / NBINS as f64;
    let mut bins = vec![0.0_f64; NBINS];
    for (v, w) in values {
        let idx = (((v - min) / width) as usize).min(NBINS - 1);
        bins[idx] += w;
    }
    let (best_idx, _) = bins
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).expect("weights are finite"))
        .expect("NBINS > 0");
    min + width * (best_idx as f64 + 0.5)
}
