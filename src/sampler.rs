use ndarray::Array1;
use rand::Rng;
use statrs::distribution::{ContinuousCDF, Normal as StatrsNormal};

use crate::ellipsoid::EllipsoidSet;
use crate::error::{Error, Result};
use crate::likelihood::Likelihood;
use crate::live_point::LivePoint;
use crate::prior::Prior;

/// Draws one fresh live point with `log L > l_star` from the union of
/// ellipsoids in `ellipsoid_set`, per spec §4.6. Isolated and overlapping
/// ellipsoids are handled identically (Open Question #1 in spec §9 is
/// resolved against the recursive sub-nested pass; an isolated ellipsoid's
/// overlap count is always 1, so the overlap-rejection step already
/// accepts it unconditionally without a separate code path).
pub fn draw_constrained<P, L, R>(
    ellipsoid_set: &EllipsoidSet,
    prior: &P,
    likelihood: &L,
    l_star: f64,
    max_attempts: usize,
    iteration: u64,
    rng: &mut R,
) -> Result<LivePoint>
where
    P: Prior,
    L: Likelihood,
    R: Rng + ?Sized,
{
    let all_indices: Vec<usize> = (0..ellipsoid_set.ellipsoids.len()).collect();
    let total_volume = ellipsoid_set.total_volume(&all_indices);

    for attempt in 1..=max_attempts {
        let e_idx = choose_ellipsoid_by_volume(ellipsoid_set, &all_indices, total_volume, rng);
        let theta = draw_uniform_in_ellipsoid(ellipsoid_set, e_idx, rng);

        // Support check (spec §4.6): a point outside the prior support is
        // simply a rejection, same as a sub-threshold likelihood.
        if !prior.log_density(&theta).is_finite() {
            continue;
        }

        let log_l = likelihood.log_value(&theta);
        if log_l.is_nan() {
            return Err(Error::Numeric(format!(
                "likelihood returned NaN at iteration {iteration}, attempt {attempt}"
            )));
        }
        if log_l <= l_star {
            continue;
        }

        // Overlap rejection (spec §4.6 step 6): accept with probability
        // 1/n where n is the number of ellipsoids containing theta, so the
        // draw is uniform over the *union* rather than over-weighting
        // overlap regions.
        let n = ellipsoid_set.containing_count(&theta, &all_indices).max(1);
        if n == 1 || rng.gen::<f64>() <= 1.0 / n as f64 {
            return Ok(LivePoint::new(theta, log_l));
        }
    }

    Err(Error::DrawExhaustion {
        attempts: max_attempts,
        iteration,
    })
}

/// Picks one ellipsoid with probability proportional to its (enlarged)
/// volume, per spec §4.6 step 3.
fn choose_ellipsoid_by_volume<R: Rng + ?Sized>(
    ellipsoid_set: &EllipsoidSet,
    indices: &[usize],
    total_volume: f64,
    rng: &mut R,
) -> usize {
    let target = rng.gen::<f64>() * total_volume;
    let mut cumulative = 0.0;
    for &i in indices {
        cumulative += ellipsoid_set.ellipsoids[i].volume;
        if cumulative >= target {
            return i;
        }
    }
    *indices.last().expect("ellipsoid set is never empty")
}

/// Draws a point uniformly distributed inside ellipsoid `e_idx`: a random
/// direction on `S^{D-1}` (via inverse-CDF standard-normal coordinates,
/// the same idiom used elsewhere in this crate in place of a dedicated
/// sampling distribution, rather than `rand_distr`'s `StandardNormal`)
/// scaled by `u^{1/D}` and the ellipsoid's enlarged semi-axes. Ported from
/// `Functions::hyperSphericalDistribution` / `BoxMullerDistribution`.
fn draw_uniform_in_ellipsoid<R: Rng + ?Sized>(
    ellipsoid_set: &EllipsoidSet,
    e_idx: usize,
    rng: &mut R,
) -> Array1<f64> {
    let ellipsoid = &ellipsoid_set.ellipsoids[e_idx];
    let ndim = ellipsoid.center.len();
    let standard_normal = StatrsNormal::new(0.0, 1.0).expect("N(0,1) is always valid");

    let direction: Array1<f64> =
        Array1::from_iter((0..ndim).map(|_| standard_normal.inverse_cdf(rng.gen::<f64>())));
    let norm = direction.dot(&direction).sqrt();
    let direction = if norm > 0.0 {
        &direction / norm
    } else {
        direction
    };

    let u: f64 = rng.gen();
    let radius = u.powf(1.0 / ndim as f64);

    let scaled: Array1<f64> = direction
        .iter()
        .zip(ellipsoid.enlarged_eigvals.iter())
        .map(|(d, lambda)| d * lambda.sqrt() * radius)
        .collect();

    &ellipsoid.center + &ellipsoid.eigvecs.dot(&scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusterer::ClusterAssignment;
    use crate::likelihood::RosenbrockLikelihood;
    use crate::prior::UniformPrior;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn single_ellipsoid_set() -> EllipsoidSet {
        let coords: Array2<f64> = array![
            [0.0, 0.1, -0.1, 0.05, -0.05, 0.2, -0.2, 0.0],
            [0.0, 0.05, -0.05, 0.1, -0.1, -0.15, 0.15, 0.2]
        ];
        let assignment = ClusterAssignment {
            k: 1,
            assignments: vec![0; 8],
            centroids: Array2::zeros((2, 1)),
            counts: vec![8],
        };
        EllipsoidSet::build(&assignment, &coords, 0.0, 8, 2.0, 0.4).unwrap()
    }

    #[test]
    fn drawn_point_satisfies_threshold_and_support() {
        let ellipsoid_set = single_ellipsoid_set();
        let prior = UniformPrior::new(vec![-3.0, -2.0], vec![4.0, 10.0]).unwrap();
        let likelihood = RosenbrockLikelihood;
        let mut rng = StdRng::seed_from_u64(11);

        let point =
            draw_constrained(&ellipsoid_set, &prior, &likelihood, -1000.0, 10_000, 0, &mut rng)
                .unwrap();
        assert!(point.log_l > -1000.0);
        assert!(prior.log_density(&point.theta).is_finite());
    }

    #[test]
    fn exhausts_when_threshold_is_unreachable() {
        let ellipsoid_set = single_ellipsoid_set();
        let prior = UniformPrior::new(vec![-3.0, -2.0], vec![4.0, 10.0]).unwrap();
        let likelihood = RosenbrockLikelihood;
        let mut rng = StdRng::seed_from_u64(5);

        let err = draw_constrained(&ellipsoid_set, &prior, &likelihood, 1e9, 50, 3, &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::DrawExhaustion { attempts: 50, iteration: 3 }));
    }
}
