use common::types::{DirectResult, ExtremesValidation, Hypothesis, InverseResult, Interval, Variable};

use super::derivative::StepPolicy;
use super::direct::propagate_direct;
use super::extremes::{ExtremesOptions, validate_extremes};
use super::inverse::allocate_inverse;
use super::traits::ScalarFunction;

/// Tunables shared by the three propagation operations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PropagatorOptions {
    pub step: StepPolicy,
    pub extremes: ExtremesOptions,
}

/// Entry point bundling direct, inverse and extremal analysis under one set of options.
///
/// Holds no state between calls; every operation is a pure function of its
/// arguments apart from unseeded extremal sampling.
#[derive(Debug, Clone, Default)]
pub struct Propagator {
    options: PropagatorOptions,
}

impl Propagator {
    pub fn new(options: PropagatorOptions) -> Self {
        Propagator { options }
    }

    pub fn options(&self) -> &PropagatorOptions {
        &self.options
    }

    pub fn direct<F>(&self, f: &F, variables: &[Variable]) -> DirectResult
    where
        F: ScalarFunction + ?Sized,
    {
        propagate_direct(f, variables, self.options.step)
    }

    pub fn inverse<F>(
        &self,
        f: &F,
        variables: &[Variable],
        target_error: f64,
        is_relative: bool,
        hypothesis: Hypothesis,
    ) -> InverseResult
    where
        F: ScalarFunction + ?Sized,
    {
        allocate_inverse(
            f,
            variables,
            target_error,
            is_relative,
            hypothesis,
            self.options.step,
        )
    }

    pub fn validate<F>(
        &self,
        f: &F,
        variables: &[Variable],
        predicted: Interval,
    ) -> ExtremesValidation
    where
        F: ScalarFunction + ?Sized,
    {
        validate_extremes(f, variables, predicted, &self.options.extremes)
    }

    /// Direct propagation followed by extremal validation of its interval.
    pub fn direct_and_validate<F>(
        &self,
        f: &F,
        variables: &[Variable],
    ) -> (DirectResult, ExtremesValidation)
    where
        F: ScalarFunction + ?Sized,
    {
        let direct = self.direct(f, variables);
        let validation = self.validate(f, variables, direct.interval);
        (direct, validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Expression;
    use crate::extremes::DEFAULT_MAX_SAMPLES;

    #[test]
    fn direct_and_validate_shares_the_interval() {
        let vars = vec![Variable::new("b", 48.5, 0.1), Variable::new("h", 12.8, 0.1)];
        let f = Expression::parse("0.5 * b * h");

        let (direct, validation) = Propagator::default().direct_and_validate(&f, &vars);

        assert_eq!(validation.samples_used, 4);
        assert!(validation.is_coherent);
        assert!(validation.min >= direct.interval.lower);
    }

    #[test]
    fn options_reach_the_validator() {
        let options = PropagatorOptions {
            extremes: ExtremesOptions {
                max_samples: 10,
                seed: Some(1),
                ..ExtremesOptions::default()
            },
            ..PropagatorOptions::default()
        };
        let propagator = Propagator::new(options);
        let vars: Vec<Variable> = (0..8)
            .map(|i| Variable::new(format!("x{}", i), 1.0, 0.01))
            .collect();
        let f = |b: &crate::expr::Bindings| b.values().sum::<f64>();

        let validation = propagator.validate(&f, &vars, Interval::centered(8.0, 0.08));

        assert_eq!(validation.samples_used, 10);
        assert_ne!(validation.samples_used, DEFAULT_MAX_SAMPLES);
        assert!(validation.is_coherent);
    }
}
