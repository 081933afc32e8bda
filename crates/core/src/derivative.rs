use super::expr::Bindings;
use super::traits::ScalarFunction;

/// Default central-difference step.
///
/// Balances O(h²) truncation against cancellation for inputs of magnitude 1–10³.
pub const DEFAULT_STEP: f64 = 1e-8;

/// Relative factor of the scaled step policy.
pub const DEFAULT_SCALE_FACTOR: f64 = 1e-6;

/// How the differentiation step is chosen for a given base value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepPolicy {
    /// The same `h` for every variable.
    Fixed(f64),
    /// `h = max(floor, |x| * factor)`, for inputs spanning many magnitudes.
    Scaled { floor: f64, factor: f64 },
}

impl Default for StepPolicy {
    fn default() -> Self {
        StepPolicy::Fixed(DEFAULT_STEP)
    }
}

impl StepPolicy {
    pub fn scaled() -> Self {
        StepPolicy::Scaled {
            floor: DEFAULT_STEP,
            factor: DEFAULT_SCALE_FACTOR,
        }
    }

    pub fn step_for(&self, x: f64) -> f64 {
        match *self {
            StepPolicy::Fixed(h) => h,
            StepPolicy::Scaled { floor, factor } => floor.max(x.abs() * factor),
        }
    }
}

/// Central difference `(f(x + h) − f(x − h)) / 2h` with respect to `target`.
///
/// Only `target` is perturbed; every other binding is held fixed. A target
/// missing from `bindings` is perturbed around `0.0`. Whatever the function
/// returns (including `0.0` for a failed evaluation, `inf` or `NaN`) flows
/// into the quotient unchanged.
pub fn central_difference<F>(f: &F, bindings: &Bindings, target: &str, step: f64) -> f64
where
    F: ScalarFunction + ?Sized,
{
    let x = bindings.get(target).copied().unwrap_or(0.0);
    let mut perturbed = bindings.clone();

    perturbed.insert(target.to_string(), x + step);
    let f_plus = f.eval(&perturbed);

    perturbed.insert(target.to_string(), x - step);
    let f_minus = f.eval(&perturbed);

    (f_plus - f_minus) / (2.0 * step)
}

/// Partial derivative of `f` with the step chosen by `policy` at the target's base value.
pub fn partial_derivative_with<F>(
    f: &F,
    bindings: &Bindings,
    target: &str,
    policy: StepPolicy,
) -> f64
where
    F: ScalarFunction + ?Sized,
{
    let x = bindings.get(target).copied().unwrap_or(0.0);
    central_difference(f, bindings, target, policy.step_for(x))
}
