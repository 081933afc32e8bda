use common::numeric_kernel::approx_eq;
use common::types::{Hypothesis, Variable};
use errprop_core::{Bindings, Expression, Propagator, try_evaluate};
use proptest::prelude::*;
use proptest::strategy::Strategy;

/// Smooth formulas with non-vanishing partial derivatives on positive inputs.
const FORMULAS: &[(&str, &[&str])] = &[
    ("V/I", &["V", "I"]),
    ("0.5 * b * h", &["b", "h"]),
    ("PI * r^2 * h", &["r", "h"]),
    ("x * y + z", &["x", "y", "z"]),
    ("sqrt(x) * y", &["x", "y"]),
    ("exp(x / 10) + y^2", &["x", "y"]),
    ("a * b / (c + d) - e", &["a", "b", "c", "d", "e"]),
];

fn problem_strategy() -> impl Strategy<Value = (&'static str, Vec<Variable>)> {
    (0..FORMULAS.len()).prop_flat_map(|index| {
        let (formula, names) = FORMULAS[index];
        let values = prop::collection::vec((1.0f64..100.0, 0.001f64..0.5), names.len());

        (Just(formula), values).prop_map(move |(formula, values)| {
            let variables = names
                .iter()
                .zip(values)
                .map(|(name, (value, bound))| Variable::new(*name, value, bound))
                .collect();
            (formula, variables)
        })
    })
}

fn hypothesis_strategy() -> impl Strategy<Value = Hypothesis> {
    prop_oneof![
        Just(Hypothesis::H1),
        Just(Hypothesis::H2),
        Just(Hypothesis::H3)
    ]
}

proptest! {
    /// Property: the total absolute error is the sum of the per-variable effects.
    #[test]
    fn effects_decompose_absolute_error((formula, variables) in problem_strategy()) {
        let result = Propagator::default().direct(&Expression::parse(formula), &variables);
        let sum: f64 = result.effects.iter().map(|e| e.effect).sum();

        prop_assert!(approx_eq(result.absolute_error, sum, 1e-9));
        prop_assert_eq!(result.effects.len(), variables.len());
    }

    /// Property: percentages add up to 100 whenever the total is positive.
    #[test]
    fn percentages_are_normalised((formula, variables) in problem_strategy()) {
        let result = Propagator::default().direct(&Expression::parse(formula), &variables);
        let total: f64 = result.effects.iter().map(|e| e.percentage).sum();

        prop_assert!(result.absolute_error > 0.0);
        prop_assert!((total - 100.0).abs() < 1e-6);
        for effect in &result.effects {
            prop_assert!((0.0..=100.0 + 1e-9).contains(&effect.percentage));
        }
    }

    /// Property: bounds allocated by any hypothesis replay to the requested target.
    #[test]
    fn inverse_round_trips_through_direct(
        (formula, variables) in problem_strategy(),
        target in 0.001f64..10.0,
        hypothesis in hypothesis_strategy(),
    ) {
        let f = Expression::parse(formula);
        let propagator = Propagator::default();

        let allocation = propagator.inverse(&f, &variables, target, false, hypothesis);
        let replayed = propagator.direct(&f, &allocation.apply_to(&variables));

        prop_assert!(
            approx_eq(replayed.absolute_error, target, 1e-6),
            "{} under {}: {} vs {}", formula, hypothesis, replayed.absolute_error, target
        );
    }

    /// Property: a relative target replays to that fraction of |f|.
    #[test]
    fn relative_inverse_round_trips(
        (formula, variables) in problem_strategy(),
        fraction in 0.0001f64..0.1,
        hypothesis in hypothesis_strategy(),
    ) {
        let f = Expression::parse(formula);
        let propagator = Propagator::default();

        let allocation = propagator.inverse(&f, &variables, fraction, true, hypothesis);
        let replayed = propagator.direct(&f, &allocation.apply_to(&variables));

        prop_assert!(approx_eq(replayed.relative_error, fraction, 1e-6));
    }

    /// Property: the predicted interval is centred on the value with radius Δ*.
    #[test]
    fn interval_is_symmetric((formula, variables) in problem_strategy()) {
        let result = Propagator::default().direct(&Expression::parse(formula), &variables);
        let upper_gap = result.interval.upper - result.value;
        let lower_gap = result.value - result.interval.lower;

        prop_assert!(approx_eq(upper_gap, result.absolute_error, 1e-12));
        prop_assert!(approx_eq(lower_gap, result.absolute_error, 1e-12));
    }

    /// Property: with vanishing bounds the sampled corners fall inside the linear prediction.
    #[test]
    fn coherence_with_vanishing_bounds((formula, variables) in problem_strategy()) {
        let shrunk: Vec<Variable> = variables
            .iter()
            .map(|v| Variable::new(v.name.clone(), v.value, v.absolute_error * 1e-3))
            .collect();
        let f = Expression::parse(formula);

        let (_, validation) = Propagator::default().direct_and_validate(&f, &shrunk);

        prop_assert!(validation.is_coherent, "{}: [{}, {}]", formula, validation.min, validation.max);
        prop_assert_eq!(validation.samples_used, 1usize << shrunk.len());
    }

    /// Property: the parser agrees with native arithmetic and precedence.
    #[test]
    fn parser_matches_native_arithmetic(a in -1e3f64..1e3, b in -1e3f64..1e3, c in 0.5f64..1e3) {
        let expression = format!("{} + {} * {} - {} / {}", a, b, c, a, c);
        let expected = a + b * c - a / c;
        let value = try_evaluate(&expression, &Bindings::new()).unwrap();

        prop_assert!(approx_eq(value, expected, 1e-12));
    }
}
