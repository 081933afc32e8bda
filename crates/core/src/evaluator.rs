use common::error::Error;
use common::types::Variable;
use tracing::debug;

use super::expr::{Bindings, Expr};
use super::parser::parse;

/// An expression parsed once and evaluated many times.
///
/// Construction never fails: malformed text keeps its parse error, and the
/// fail-soft [`Expression::eval_or_zero`] then yields `0.0` for every input.
/// Callers that need to tell "zero" from "failed" use [`Expression::try_eval`].
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    parsed: Result<Expr, Error>,
}

impl Expression {
    pub fn parse(source: &str) -> Self {
        Expression {
            source: source.to_string(),
            parsed: parse(source),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> Option<&Expr> {
        self.parsed.as_ref().ok()
    }

    /// The parse failure, if the source was malformed.
    pub fn error(&self) -> Option<&Error> {
        self.parsed.as_ref().err()
    }

    pub fn is_valid(&self) -> bool {
        self.parsed.is_ok()
    }

    /// Free identifiers of the expression (empty when malformed).
    pub fn identifiers(&self) -> Vec<String> {
        self.ast().map(Expr::identifiers).unwrap_or_default()
    }

    /// Strict evaluation.
    ///
    /// # Errors
    /// The stored parse error, or `Error::UnboundIdentifier` during evaluation.
    pub fn try_eval(&self, bindings: &Bindings) -> Result<f64, Error> {
        match &self.parsed {
            Ok(expr) => expr.eval(bindings),
            Err(e) => Err(e.clone()),
        }
    }

    /// Strict evaluation that also rejects `inf` and `NaN` results.
    ///
    /// # Errors
    /// Everything [`Expression::try_eval`] returns, plus `Error::NonFinite`.
    pub fn check_finite(&self, bindings: &Bindings) -> Result<f64, Error> {
        let value = self.try_eval(bindings)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::NonFinite(value))
        }
    }

    /// Fail-soft evaluation: any error becomes `0.0`. Non-finite results pass through.
    pub fn eval_or_zero(&self, bindings: &Bindings) -> f64 {
        self.try_eval(bindings).unwrap_or_else(|e| {
            debug!(expression = %self.source, error = %e, "evaluation failed, using 0");
            0.0
        })
    }
}

/// Binds each variable's nominal value. A repeated name keeps the last value.
pub fn nominal_bindings(variables: &[Variable]) -> Bindings {
    variables
        .iter()
        .map(|v| (v.name.clone(), v.value))
        .collect()
}

/// Parses and evaluates `expression` in one step.
///
/// # Errors
/// Parse errors and unbound identifiers; arithmetic singularities are returned as values.
pub fn try_evaluate(expression: &str, bindings: &Bindings) -> Result<f64, Error> {
    parse(expression)?.eval(bindings)
}

/// Fail-soft evaluation of `expression`: `0.0` on any parse or binding failure.
pub fn evaluate(expression: &str, bindings: &Bindings) -> f64 {
    Expression::parse(expression).eval_or_zero(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(pairs: &[(&str, f64)]) -> Bindings {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn evaluates_preset_formulas() {
        assert_eq!(evaluate("V/I", &bind(&[("V", 12.0), ("I", 2.0)])), 6.0);
        assert!((evaluate("0.5 * b * h", &bind(&[("b", 48.5), ("h", 12.8)])) - 310.4).abs() < 1e-9);
        let cylinder = evaluate("PI * r^2 * h", &bind(&[("r", 5.0), ("h", 10.0)]));
        assert!((cylinder - std::f64::consts::PI * 250.0).abs() < 1e-9);
    }

    #[test]
    fn whole_identifier_matching() {
        // `I` must not be substituted inside `sin`.
        let value = evaluate("sin(I) * I", &bind(&[("I", 2.0)]));
        assert!((value - 2.0f64.sin() * 2.0).abs() < 1e-12);
    }

    #[test]
    fn malformed_expression_fails_soft() {
        assert_eq!(evaluate("V / ", &bind(&[("V", 12.0)])), 0.0);
        assert_eq!(evaluate("V # I", &bind(&[("V", 12.0), ("I", 2.0)])), 0.0);
        assert_eq!(evaluate("x + 1", &Bindings::new()), 0.0);
    }

    #[test]
    fn strict_evaluation_distinguishes_failures() {
        assert_eq!(
            try_evaluate("x + 1", &Bindings::new()),
            Err(Error::UnboundIdentifier("x".into()))
        );
        assert_eq!(try_evaluate("2 - 2", &Bindings::new()), Ok(0.0));
        assert!(matches!(
            try_evaluate("2 +* 2", &Bindings::new()),
            Err(Error::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn deep_nesting_fails_soft() {
        let parens = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(evaluate(&parens, &Bindings::new()), 0.0);
        assert!(matches!(
            try_evaluate(&parens, &Bindings::new()),
            Err(Error::TooDeep { .. })
        ));

        let signs = format!("{}x", "-".repeat(200_000));
        let expr = Expression::parse(&signs);
        assert!(matches!(expr.error(), Some(Error::TooDeep { .. })));
        assert_eq!(expr.eval_or_zero(&bind(&[("x", 3.0)])), 0.0);
    }

    #[test]
    fn singularities_pass_through_fail_soft_evaluation() {
        assert_eq!(evaluate("V / I", &bind(&[("V", 1.0), ("I", 0.0)])), f64::INFINITY);
        assert!(evaluate("ln(x)", &bind(&[("x", -1.0)])).is_nan());
    }

    #[test]
    fn check_finite_flags_singularities() {
        let expr = Expression::parse("1 / x");
        assert_eq!(expr.check_finite(&bind(&[("x", 4.0)])), Ok(0.25));
        assert_eq!(
            expr.check_finite(&bind(&[("x", 0.0)])),
            Err(Error::NonFinite(f64::INFINITY))
        );
    }

    #[test]
    fn malformed_expression_keeps_its_error() {
        let expr = Expression::parse("sqrt(");
        assert!(!expr.is_valid());
        assert_eq!(expr.error(), Some(&Error::UnexpectedEnd));
        assert!(expr.identifiers().is_empty());
        assert_eq!(expr.eval_or_zero(&Bindings::new()), 0.0);
    }

    #[test]
    fn nominal_bindings_last_duplicate_wins() {
        let vars = vec![
            Variable::new("x", 1.0, 0.1),
            Variable::new("x", 2.0, 0.1),
        ];
        assert_eq!(nominal_bindings(&vars).get("x"), Some(&2.0));
    }
}
