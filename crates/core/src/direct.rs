use common::numeric_kernel::{percentage, relative_error};
use common::types::{DirectResult, Effect, Interval, Variable};
use tracing::trace;

use super::derivative::{StepPolicy, partial_derivative_with};
use super::evaluator::nominal_bindings;
use super::traits::ScalarFunction;

/// Forward propagation of absolute error bounds through `f`.
///
/// The total bound is the worst-case linear sum `Σ |∂f/∂xᵢ| · Δ*(xᵢ)`, not a
/// root-sum-square. `effects` keeps the order of `variables`. Degenerate
/// inputs (zero value, zero bounds, zero derivatives, no variables) give
/// zero-valued fields rather than errors.
pub fn propagate_direct<F>(f: &F, variables: &[Variable], step: StepPolicy) -> DirectResult
where
    F: ScalarFunction + ?Sized,
{
    let nominal = nominal_bindings(variables);
    let value = f.eval(&nominal);

    let mut effects: Vec<Effect> = variables
        .iter()
        .map(|variable| {
            let partial_derivative = partial_derivative_with(f, &nominal, &variable.name, step);
            Effect {
                variable: variable.name.clone(),
                partial_derivative,
                effect: partial_derivative.abs() * variable.absolute_error,
                percentage: 0.0,
            }
        })
        .collect();

    let absolute_error: f64 = effects.iter().map(|e| e.effect).sum();

    for effect in &mut effects {
        effect.percentage = percentage(effect.effect, absolute_error);
    }

    trace!(
        variables = variables.len(),
        value,
        absolute_error,
        "direct propagation"
    );

    DirectResult {
        value,
        absolute_error,
        relative_error: relative_error(absolute_error, value),
        interval: Interval::centered(value, absolute_error),
        effects,
    }
}
