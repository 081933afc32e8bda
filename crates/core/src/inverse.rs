use common::numeric_kernel::{percentage, relative_error, safe_ratio};
use common::types::{AllocatedEffect, Hypothesis, InverseResult, RequiredBound, Variable};
use tracing::trace;

use super::derivative::{StepPolicy, partial_derivative_with};
use super::evaluator::nominal_bindings;
use super::traits::ScalarFunction;

/// Backward allocation of an output error budget to the input variables.
///
/// `target_error` is absolute, or a fraction of `|f(nominal)|` when
/// `is_relative` is set. The returned `target_error` is always the resolved
/// absolute target.
///
/// Zero denominators resolve to zero bounds: with H1/H2 an insensitive
/// function gives every variable a bound of `0`, and with H3 a variable whose
/// derivative vanishes receives `0` (it cannot be bounded through its effect).
pub fn allocate_inverse<F>(
    f: &F,
    variables: &[Variable],
    target_error: f64,
    is_relative: bool,
    hypothesis: Hypothesis,
    step: StepPolicy,
) -> InverseResult
where
    F: ScalarFunction + ?Sized,
{
    let nominal = nominal_bindings(variables);
    let function_value = f.eval(&nominal);
    let absolute_target = if is_relative {
        target_error * function_value.abs()
    } else {
        target_error
    };

    let derivatives: Vec<f64> = variables
        .iter()
        .map(|v| partial_derivative_with(f, &nominal, &v.name, step))
        .collect();

    let required: Vec<RequiredBound> = match hypothesis {
        Hypothesis::H1 => {
            let sum_abs: f64 = derivatives.iter().map(|d| d.abs()).sum();
            let common_absolute = safe_ratio(absolute_target, sum_abs);

            variables
                .iter()
                .map(|v| RequiredBound {
                    name: v.name.clone(),
                    required_error: common_absolute,
                    required_relative_error: relative_error(common_absolute, v.value),
                })
                .collect()
        }
        Hypothesis::H2 => {
            let sum_weighted: f64 = derivatives
                .iter()
                .zip(variables)
                .map(|(d, v)| (d * v.value).abs())
                .sum();
            let common_relative = safe_ratio(absolute_target, sum_weighted);

            variables
                .iter()
                .map(|v| RequiredBound {
                    name: v.name.clone(),
                    required_error: common_relative * v.value.abs(),
                    required_relative_error: common_relative,
                })
                .collect()
        }
        Hypothesis::H3 => {
            let common_effect = safe_ratio(absolute_target, variables.len() as f64);

            derivatives
                .iter()
                .zip(variables)
                .map(|(d, v)| {
                    let required_error = safe_ratio(common_effect, d.abs());
                    RequiredBound {
                        name: v.name.clone(),
                        required_error,
                        required_relative_error: relative_error(required_error, v.value),
                    }
                })
                .collect()
        }
    };

    // Effects are re-derived from the allocated bounds for every hypothesis,
    // so they always sum to the target the bounds actually reproduce.
    let effects = required
        .iter()
        .zip(&derivatives)
        .map(|(bound, d)| {
            let effect = d.abs() * bound.required_error;
            AllocatedEffect {
                variable: bound.name.clone(),
                effect,
                percentage: percentage(effect, absolute_target),
            }
        })
        .collect();

    trace!(%hypothesis, absolute_target, variables = variables.len(), "inverse allocation");

    InverseResult {
        hypothesis,
        target_error: absolute_target,
        is_relative,
        variables: required,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::propagate_direct;
    use crate::evaluator::Expression;

    fn ohms_law_vars() -> Vec<Variable> {
        vec![Variable::new("V", 12.2, 0.0), Variable::new("I", 2.18, 0.0)]
    }

    fn inverse(expression: &str, vars: &[Variable], target: f64, rel: bool, h: Hypothesis) -> InverseResult {
        allocate_inverse(&Expression::parse(expression), vars, target, rel, h, StepPolicy::default())
    }

    #[test]
    fn h1_common_absolute_bound() {
        let result = inverse("V/I", &ohms_law_vars(), 0.20, false, Hypothesis::H1);

        // 0.20 / (1/2.18 + 12.2/2.18²)
        let expected: f64 = 0.20 / (1.0 / 2.18 + 12.2 / (2.18 * 2.18));
        assert!((expected - 0.0661).abs() < 1e-4);
        for bound in &result.variables {
            assert!((bound.required_error - expected).abs() < 1e-7);
        }
        assert!((result.variables[0].required_relative_error - expected / 12.2).abs() < 1e-8);
        assert!((result.variables[1].required_relative_error - expected / 2.18).abs() < 1e-8);
        assert_eq!(result.hypothesis, Hypothesis::H1);
        assert!(!result.is_relative);
    }

    #[test]
    fn h2_common_relative_bound() {
        let result = inverse("V/I", &ohms_law_vars(), 0.20, false, Hypothesis::H2);

        // |dR/dV·V| + |dR/dI·I| = 2·R
        let r = 12.2 / 2.18;
        let expected = 0.20 / (2.0 * r);
        for (bound, nominal) in result.variables.iter().zip([12.2, 2.18]) {
            assert!((bound.required_relative_error - expected).abs() < 1e-7);
            assert!((bound.required_error - expected * nominal).abs() < 1e-6);
        }
    }

    #[test]
    fn h3_equal_effects() {
        let result = inverse("V/I", &ohms_law_vars(), 0.20, false, Hypothesis::H3);

        for effect in &result.effects {
            assert!((effect.effect - 0.10).abs() < 1e-7);
            assert!((effect.percentage - 50.0).abs() < 1e-5);
        }
    }

    #[test]
    fn relative_target_resolves_against_function_value() {
        let result = inverse("V/I", &ohms_law_vars(), 0.01, true, Hypothesis::H1);

        assert!((result.target_error - 0.01 * 12.2 / 2.18).abs() < 1e-12);
        assert!(result.is_relative);
    }

    #[test]
    fn every_hypothesis_reproduces_the_target() {
        let vars = ohms_law_vars();
        let f = Expression::parse("V/I");

        for hypothesis in Hypothesis::ALL {
            let result = allocate_inverse(&f, &vars, 0.20, false, hypothesis, StepPolicy::default());
            let replayed = propagate_direct(&f, &result.apply_to(&vars), StepPolicy::default());

            assert!(
                (replayed.absolute_error - 0.20).abs() < 1e-6,
                "{} replayed to {}",
                hypothesis,
                replayed.absolute_error
            );
            let total: f64 = result.effects.iter().map(|e| e.percentage).sum();
            assert!((total - 100.0).abs() < 1e-4);
        }
    }

    #[test]
    fn h3_zero_derivative_variable_gets_zero_bound() {
        let vars = vec![Variable::new("x", 3.0, 0.0), Variable::new("unused", 1.0, 0.0)];
        let result = inverse("2 * x", &vars, 1.0, false, Hypothesis::H3);

        assert!((result.variables[0].required_error - 0.25).abs() < 1e-7);
        assert_eq!(result.variables[1].required_error, 0.0);
        assert_eq!(result.variables[1].required_relative_error, 0.0);
    }

    #[test]
    fn insensitive_function_allocates_zero() {
        let vars = vec![Variable::new("x", 3.0, 0.0)];
        for hypothesis in Hypothesis::ALL {
            let result = inverse("42", &vars, 1.0, false, hypothesis);
            assert_eq!(result.variables[0].required_error, 0.0);
            assert_eq!(result.effects[0].percentage, 0.0);
        }
    }

    #[test]
    fn nan_derivative_sum_allocates_zero() {
        // sqrt has no two-sided difference at 0.
        let vars = vec![Variable::new("x", 0.0, 0.0), Variable::new("y", 2.0, 0.0)];
        for hypothesis in [Hypothesis::H1, Hypothesis::H2] {
            let result = inverse("sqrt(x) + y", &vars, 0.2, false, hypothesis);
            for bound in &result.variables {
                assert_eq!(bound.required_error, 0.0, "{} {}", hypothesis, bound.name);
                assert_eq!(bound.required_relative_error, 0.0);
            }
        }
    }

    #[test]
    fn zero_nominal_gives_zero_relative_bound_under_h1() {
        let vars = vec![Variable::new("x", 0.0, 0.0), Variable::new("y", 2.0, 0.0)];
        let result = inverse("x + y", &vars, 0.2, false, Hypothesis::H1);

        assert!((result.variables[0].required_error - 0.1).abs() < 1e-7);
        assert_eq!(result.variables[0].required_relative_error, 0.0);
    }

    #[test]
    fn zero_target_gives_zero_percentages() {
        let result = inverse("V/I", &ohms_law_vars(), 0.0, false, Hypothesis::H2);

        assert_eq!(result.target_error, 0.0);
        assert!(result.variables.iter().all(|b| b.required_error == 0.0));
        assert!(result.effects.iter().all(|e| e.percentage == 0.0));
    }

    #[test]
    fn empty_variable_list_is_well_defined() {
        for hypothesis in Hypothesis::ALL {
            let result = inverse("1 + 1", &[], 0.5, false, hypothesis);
            assert!(result.variables.is_empty());
            assert!(result.effects.is_empty());
            assert_eq!(result.target_error, 0.5);
        }
    }
}
