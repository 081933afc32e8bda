use common::types::{ExtremesValidation, Interval, Variable};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::expr::Bindings;
use super::traits::ScalarFunction;

/// Up to this many variables every corner of the error box is evaluated.
pub const EXHAUSTIVE_LIMIT: usize = 6;

/// Hard ceiling on the exhaustive limit, keeping enumeration at 2^16 evaluations.
pub const MAX_EXHAUSTIVE_LIMIT: usize = 16;

/// Random corner samples drawn above the exhaustive limit.
pub const DEFAULT_MAX_SAMPLES: usize = 128;

/// Overshoot of the predicted interval tolerated before the linear estimate is
/// declared incoherent, as a fraction of the predicted absolute error.
pub const DEFAULT_COHERENCE_SLACK: f64 = 0.05;

/// Sampling parameters of the extremal validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtremesOptions {
    pub max_samples: usize,
    pub exhaustive_limit: usize,
    /// `None` draws a fresh OS seed per call.
    pub seed: Option<u64>,
    pub coherence_slack: f64,
}

impl Default for ExtremesOptions {
    fn default() -> Self {
        ExtremesOptions {
            max_samples: DEFAULT_MAX_SAMPLES,
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            seed: None,
            coherence_slack: DEFAULT_COHERENCE_SLACK,
        }
    }
}

/// Builds the corner points of the error box to evaluate.
///
/// With `n ≤ exhaustive_limit` all `2^n` sign combinations are produced; bit
/// `i` of the combination index selects `+Δ*` (1) or `−Δ*` (0) for variable
/// `i`. Otherwise `max_samples` (at least one) corners are drawn with an
/// independent fair sign per variable.
pub fn corner_samples(variables: &[Variable], options: &ExtremesOptions) -> Vec<Bindings> {
    let n = variables.len();
    let exhaustive_limit = options.exhaustive_limit.min(MAX_EXHAUSTIVE_LIMIT);

    if n <= exhaustive_limit {
        let combinations = 1usize << n;
        return (0..combinations)
            .map(|mask| {
                variables
                    .iter()
                    .enumerate()
                    .map(|(index, v)| {
                        let (low, high) = v.extremes();
                        let value = if (mask >> index) & 1 == 0 { low } else { high };
                        (v.name.clone(), value)
                    })
                    .collect()
            })
            .collect();
    }

    let mut rng = match options.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    (0..options.max_samples.max(1))
        .map(|_| {
            variables
                .iter()
                .map(|v| {
                    let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                    (v.name.clone(), v.value + sign * v.absolute_error)
                })
                .collect()
        })
        .collect()
}

/// Checks the first-order prediction against the function's values at the
/// corners of the error box.
///
/// The verdict is coherent iff the sampled `[min, max]` lies inside
/// `predicted` widened on both sides by `coherence_slack` times its radius.
/// Any `NaN` sample makes `min` and `max` `NaN` and the verdict incoherent.
pub fn validate_extremes<F>(
    f: &F,
    variables: &[Variable],
    predicted: Interval,
    options: &ExtremesOptions,
) -> ExtremesValidation
where
    F: ScalarFunction + ?Sized,
{
    let samples = corner_samples(variables, options);

    let (min, max) = samples.iter().map(|sample| f.eval(sample)).fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), value| {
            if value.is_nan() || lo.is_nan() {
                (f64::NAN, f64::NAN)
            } else {
                (lo.min(value), hi.max(value))
            }
        },
    );

    let slack = options.coherence_slack * predicted.radius();
    let is_coherent = predicted.contains_range(min, max, slack);

    debug!(
        variables = variables.len(),
        samples = samples.len(),
        min,
        max,
        is_coherent,
        "extremes validation"
    );

    ExtremesValidation {
        min,
        max,
        is_coherent,
        samples_used: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivative::StepPolicy;
    use crate::direct::propagate_direct;
    use crate::evaluator::Expression;

    fn strict() -> ExtremesOptions {
        ExtremesOptions {
            coherence_slack: 0.0,
            ..ExtremesOptions::default()
        }
    }

    fn many_variables(n: usize) -> Vec<Variable> {
        (0..n)
            .map(|i| Variable::new(format!("x{}", i), 1.0 + i as f64, 0.1))
            .collect()
    }

    #[test]
    fn enumerates_all_corners_for_small_n() {
        let vars = vec![Variable::new("V", 12.0, 0.1), Variable::new("I", 2.0, 0.02)];
        let samples = corner_samples(&vars, &ExtremesOptions::default());

        assert_eq!(samples.len(), 4);
        // Combination 0 is all-minus, combination 3 all-plus.
        assert_eq!(samples[0]["V"], 12.0 - 0.1);
        assert_eq!(samples[0]["I"], 2.0 - 0.02);
        assert_eq!(samples[1]["V"], 12.0 + 0.1);
        assert_eq!(samples[1]["I"], 2.0 - 0.02);
        assert_eq!(samples[3]["V"], 12.0 + 0.1);
        assert_eq!(samples[3]["I"], 2.0 + 0.02);
    }

    #[test]
    fn six_variables_are_still_exhaustive() {
        let samples = corner_samples(&many_variables(6), &ExtremesOptions::default());
        assert_eq!(samples.len(), 64);
    }

    #[test]
    fn seven_variables_switch_to_random_corners() {
        let vars = many_variables(7);
        let samples = corner_samples(&vars, &ExtremesOptions::default());

        assert_eq!(samples.len(), DEFAULT_MAX_SAMPLES);
        for sample in &samples {
            for v in &vars {
                let (low, high) = v.extremes();
                let x = sample[&v.name];
                assert!(x == low || x == high, "{} is not a corner of {}", x, v.name);
            }
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let vars = many_variables(9);
        let options = ExtremesOptions {
            seed: Some(7),
            max_samples: 32,
            ..ExtremesOptions::default()
        };

        assert_eq!(corner_samples(&vars, &options), corner_samples(&vars, &options));
    }

    #[test]
    fn zero_max_samples_still_draws_one_corner() {
        let options = ExtremesOptions {
            max_samples: 0,
            ..ExtremesOptions::default()
        };
        assert_eq!(corner_samples(&many_variables(8), &options).len(), 1);
    }

    #[test]
    fn no_variables_samples_the_nominal_point() {
        let f = Expression::parse("2 + 3");
        let result = validate_extremes(&f, &[], Interval::new(5.0, 5.0), &strict());

        assert_eq!(result.samples_used, 1);
        assert_eq!((result.min, result.max), (5.0, 5.0));
        assert!(result.is_coherent);
    }

    #[test]
    fn ohms_law_overshoots_strict_bound_but_passes_with_slack() {
        let vars = vec![Variable::new("V", 12.0, 0.1), Variable::new("I", 2.0, 0.02)];
        let f = Expression::parse("V/I");
        let predicted = Interval::new(5.89, 6.11);

        let strict_result = validate_extremes(&f, &vars, predicted, &strict());
        assert!((strict_result.max - 12.1 / 1.98).abs() < 1e-12);
        assert!((strict_result.min - 11.9 / 2.02).abs() < 1e-12);
        assert!(!strict_result.is_coherent);

        let lenient = validate_extremes(&f, &vars, predicted, &ExtremesOptions::default());
        assert!(lenient.is_coherent);
        assert_eq!(lenient.samples_used, 4);
    }

    #[test]
    fn strongly_nonlinear_function_is_incoherent() {
        // exp(x) around 0 with a bound of 2: linear radius 2, true upper e² − 1 ≈ 6.39.
        let vars = vec![Variable::new("x", 0.0, 2.0)];
        let f = Expression::parse("exp(x)");
        let result = validate_extremes(&f, &vars, Interval::centered(1.0, 2.0), &ExtremesOptions::default());

        assert!(!result.is_coherent);
    }

    #[test]
    fn shrinking_bounds_converge_to_coherent() {
        // Overshoot of exp above 1 + Δ is about Δ²/2, against a slack of 0.05·Δ.
        let f = Expression::parse("exp(x)");
        let options = ExtremesOptions::default();
        let verdicts: Vec<bool> = [2.0, 1.0, 1e-1, 1e-2, 1e-3, 1e-4, 1e-5, 1e-6]
            .into_iter()
            .map(|bound| {
                let vars = vec![Variable::new("x", 0.0, bound)];
                let direct = propagate_direct(&f, &vars, StepPolicy::default());
                validate_extremes(&f, &vars, direct.interval, &options).is_coherent
            })
            .collect();

        assert_eq!(
            verdicts,
            vec![false, false, false, true, true, true, true, true]
        );
    }

    #[test]
    fn nan_sample_poisons_the_range() {
        let vars = vec![Variable::new("x", 0.0, 1.0)];
        let f = Expression::parse("sqrt(x)");
        let result = validate_extremes(&f, &vars, Interval::new(-10.0, 10.0), &strict());

        assert!(result.min.is_nan());
        assert!(result.max.is_nan());
        assert!(!result.is_coherent);
    }
}
