//! First-order error propagation engine.
//!
//! Evaluates scalar expressions of named variables, differentiates them
//! numerically, propagates absolute error bounds forward (direct method),
//! allocates an output budget backward under hypotheses H1/H2/H3 (inverse
//! method) and checks the linear estimate against the corners of the input
//! error box.
//!
//! The string-taking functions below use default options and parse the
//! expression once per call; [`Propagator`] with a parsed [`Expression`]
//! avoids re-parsing and exposes the tunables.

pub mod derivative;
pub mod direct;
pub mod evaluator;
pub mod expr;
pub mod extremes;
pub mod inverse;
pub mod lexer;
pub mod parser;
pub mod propagator;
pub mod traits;

pub use derivative::{DEFAULT_STEP, StepPolicy};
pub use evaluator::{Expression, nominal_bindings, try_evaluate};
pub use expr::Bindings;
pub use extremes::{DEFAULT_MAX_SAMPLES, ExtremesOptions};
pub use propagator::{Propagator, PropagatorOptions};
pub use traits::ScalarFunction;

use common::types::{DirectResult, ExtremesValidation, Hypothesis, InverseResult, Interval, Variable};

/// Fail-soft evaluation: `0.0` for malformed expressions or unbound identifiers.
pub fn evaluate(expression: &str, bindings: &Bindings) -> f64 {
    evaluator::evaluate(expression, bindings)
}

/// Central-difference partial derivative of `expression` with respect to `target`.
pub fn partial_derivative(expression: &str, bindings: &Bindings, target: &str, step: f64) -> f64 {
    derivative::central_difference(&Expression::parse(expression), bindings, target, step)
}

pub fn calculate_direct(expression: &str, variables: &[Variable]) -> DirectResult {
    Propagator::default().direct(&Expression::parse(expression), variables)
}

pub fn calculate_inverse(
    expression: &str,
    variables: &[Variable],
    target_error: f64,
    is_relative: bool,
    hypothesis: Hypothesis,
) -> InverseResult {
    Propagator::default().inverse(
        &Expression::parse(expression),
        variables,
        target_error,
        is_relative,
        hypothesis,
    )
}

/// Extremal validation with an unseeded sampler above six variables.
pub fn validate_by_extremes(
    expression: &str,
    variables: &[Variable],
    predicted_interval: impl Into<Interval>,
    max_samples: usize,
) -> ExtremesValidation {
    let options = ExtremesOptions {
        max_samples,
        ..ExtremesOptions::default()
    };
    extremes::validate_extremes(
        &Expression::parse(expression),
        variables,
        predicted_interval.into(),
        &options,
    )
}
