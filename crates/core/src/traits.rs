use super::evaluator::Expression;
use super::expr::Bindings;

/// Trait for scalar functions of named variables that the propagation
/// operations can differentiate and sample.
///
/// Implementations must not fail: a point where the function cannot be
/// evaluated yields `0.0` (or `inf`/`NaN` for singularities), never a panic.
pub trait ScalarFunction {
    fn eval(&self, bindings: &Bindings) -> f64;
}

impl ScalarFunction for Expression {
    fn eval(&self, bindings: &Bindings) -> f64 {
        self.eval_or_zero(bindings)
    }
}

impl<F> ScalarFunction for F
where
    F: Fn(&Bindings) -> f64,
{
    fn eval(&self, bindings: &Bindings) -> f64 {
        self(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_at<F: ScalarFunction + ?Sized>(f: &F, x: f64) -> f64 {
        let bindings: Bindings = [("x".to_string(), x)].into_iter().collect();
        f.eval(&bindings)
    }

    #[test]
    fn expressions_and_closures_share_the_seam() {
        let parsed = Expression::parse("x^2 + 1");
        let closure = |b: &Bindings| b["x"] * b["x"] + 1.0;

        assert_eq!(eval_at(&parsed, 3.0), 10.0);
        assert_eq!(eval_at(&closure, 3.0), 10.0);
    }

    #[test]
    fn malformed_expression_evaluates_to_zero() {
        assert_eq!(eval_at(&Expression::parse("x +"), 3.0), 0.0);
    }
}
