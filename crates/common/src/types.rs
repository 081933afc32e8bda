use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::numeric_kernel::relative_error;

/// A measured input of the function under study.
///
/// Fields:
/// - `name`: identifier as it appears in the expression.
/// - `value`: nominal value used in place of the unknown true value.
/// - `absolute_error`: bound Δ*(x) on |true − nominal|; expected to be non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: f64,
    pub absolute_error: f64,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: f64, absolute_error: f64) -> Self {
        Variable {
            name: name.into(),
            value,
            absolute_error,
        }
    }

    /// ε*(x) = Δ*(x) / |x|, or `0.0` for a zero nominal value.
    pub fn relative_error(&self) -> f64 {
        relative_error(self.absolute_error, self.value)
    }

    /// The two extremes `(nominal − Δ*, nominal + Δ*)` of this variable.
    pub fn extremes(&self) -> (f64, f64) {
        (
            self.value - self.absolute_error,
            self.value + self.absolute_error,
        )
    }
}

/// Closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Interval { lower, upper }
    }

    /// `[center − radius, center + radius]`.
    pub fn centered(center: f64, radius: f64) -> Self {
        Interval {
            lower: center - radius,
            upper: center + radius,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Half of the width, i.e. the radius of a centered interval.
    pub fn radius(&self) -> f64 {
        self.width() / 2.0
    }

    /// True iff `[min, max]` lies inside this interval widened by `slack` on both sides.
    pub fn contains_range(&self, min: f64, max: f64, slack: f64) -> bool {
        min >= self.lower - slack && max <= self.upper + slack
    }
}

impl From<[f64; 2]> for Interval {
    fn from(bounds: [f64; 2]) -> Self {
        Interval::new(bounds[0], bounds[1])
    }
}

impl From<(f64, f64)> for Interval {
    fn from((lower, upper): (f64, f64)) -> Self {
        Interval::new(lower, upper)
    }
}

/// One variable's contribution to a direct-method result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub variable: String,
    pub partial_derivative: f64,
    /// |∂f/∂x| · Δ*(x)
    pub effect: f64,
    /// Share of the total absolute error, 0–100.
    pub percentage: f64,
}

/// Outcome of forward (direct) propagation.
///
/// `effects` follows the order of the input variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectResult {
    pub value: f64,
    pub absolute_error: f64,
    pub relative_error: f64,
    pub interval: Interval,
    pub effects: Vec<Effect>,
}

/// Rule used to split an error budget when the inverse problem is under-determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hypothesis {
    /// Every variable receives the same absolute bound.
    H1,
    /// Every variable receives the same relative bound.
    H2,
    /// Every variable contributes the same effect.
    H3,
}

impl Hypothesis {
    pub const ALL: [Hypothesis; 3] = [Hypothesis::H1, Hypothesis::H2, Hypothesis::H3];

    pub fn description(&self) -> &'static str {
        match self {
            Hypothesis::H1 => "equal absolute errors",
            Hypothesis::H2 => "equal relative errors",
            Hypothesis::H3 => "equal effects",
        }
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Hypothesis::H1 => write!(f, "H1"),
            Hypothesis::H2 => write!(f, "H2"),
            Hypothesis::H3 => write!(f, "H3"),
        }
    }
}

/// Error returned when a string names no hypothesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHypothesisError(pub String);

impl fmt::Display for ParseHypothesisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown hypothesis '{}', expected H1, H2 or H3.", self.0)
    }
}

impl std::error::Error for ParseHypothesisError {}

impl FromStr for Hypothesis {
    type Err = ParseHypothesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H1" => Ok(Hypothesis::H1),
            "H2" => Ok(Hypothesis::H2),
            "H3" => Ok(Hypothesis::H3),
            _ => Err(ParseHypothesisError(s.to_string())),
        }
    }
}

/// Per-variable bound required by the inverse method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredBound {
    pub name: String,
    pub required_error: f64,
    /// `0.0` when the nominal value is zero.
    pub required_relative_error: f64,
}

/// Effect of one allocated bound, recomputed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedEffect {
    pub variable: String,
    pub effect: f64,
    pub percentage: f64,
}

/// Outcome of backward (inverse) allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InverseResult {
    pub hypothesis: Hypothesis,
    /// Target resolved to an absolute bound.
    pub target_error: f64,
    /// Whether the caller expressed the target as a fraction of |f|.
    pub is_relative: bool,
    pub variables: Vec<RequiredBound>,
    pub effects: Vec<AllocatedEffect>,
}

impl InverseResult {
    /// Returns `variables` with each absolute error replaced by the allocated bound.
    ///
    /// Variables without an allocation keep their original bound.
    pub fn apply_to(&self, variables: &[Variable]) -> Vec<Variable> {
        variables
            .iter()
            .map(|v| {
                let required = self
                    .variables
                    .iter()
                    .find(|r| r.name == v.name)
                    .map_or(v.absolute_error, |r| r.required_error);
                Variable::new(v.name.clone(), v.value, required)
            })
            .collect()
    }
}

/// Empirical range of the function over the corners of the error box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtremesValidation {
    pub min: f64,
    pub max: f64,
    pub is_coherent: bool,
    pub samples_used: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_relative_error_and_extremes() {
        let v = Variable::new("V", 12.0, 0.1);
        assert!((v.relative_error() - 0.1 / 12.0).abs() < 1e-15);
        assert_eq!(v.extremes(), (12.0 - 0.1, 12.0 + 0.1));

        let zero = Variable::new("z", 0.0, 0.1);
        assert_eq!(zero.relative_error(), 0.0);
    }

    #[test]
    fn interval_centered_is_symmetric() {
        let interval = Interval::centered(6.0, 0.11);
        assert_eq!(interval.lower, 6.0 - 0.11);
        assert_eq!(interval.upper, 6.0 + 0.11);
        assert!(((interval.upper - 6.0) - (6.0 - interval.lower)).abs() < 1e-12);
        assert!((interval.radius() - 0.11).abs() < 1e-12);
    }

    #[test]
    fn interval_contains_range_with_slack() {
        let interval = Interval::new(5.89, 6.11);
        assert!(interval.contains_range(5.9, 6.1, 0.0));
        assert!(!interval.contains_range(5.9, 6.1111, 0.0));
        assert!(interval.contains_range(5.9, 6.1111, 0.0055));
    }

    #[test]
    fn hypothesis_round_trips_through_strings() {
        for h in Hypothesis::ALL {
            assert_eq!(h.to_string().parse::<Hypothesis>(), Ok(h));
        }
        assert_eq!("h2".parse::<Hypothesis>(), Ok(Hypothesis::H2));
        assert!("H4".parse::<Hypothesis>().is_err());
    }

    #[test]
    fn apply_to_replaces_bounds_by_name() {
        let result = InverseResult {
            hypothesis: Hypothesis::H1,
            target_error: 0.2,
            is_relative: false,
            variables: vec![RequiredBound {
                name: "I".into(),
                required_error: 0.05,
                required_relative_error: 0.025,
            }],
            effects: vec![],
        };
        let vars = vec![Variable::new("V", 12.0, 0.1), Variable::new("I", 2.0, 0.02)];

        let applied = result.apply_to(&vars);

        assert_eq!(applied[0].absolute_error, 0.1);
        assert_eq!(applied[1].absolute_error, 0.05);
    }
}
