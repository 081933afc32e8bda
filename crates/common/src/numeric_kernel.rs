use std::f64;

/// Divides `num` by a non-negative `den`, or returns `0.0` unless `den > 0`.
///
/// This is the degenerate-denominator policy shared by every propagation
/// step: relative errors of zero-valued quantities, percentages of a zero
/// total and the H1/H2 common bounds of insensitive functions all resolve to
/// zero instead of `inf`/`NaN`. A `NaN` denominator also gives `0.0`.
/// Non-finite numerators still propagate.
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// Relative error bound ε* = Δ* / |nominal|, or `0.0` for a zero nominal value.
pub fn relative_error(absolute_error: f64, nominal: f64) -> f64 {
    safe_ratio(absolute_error, nominal.abs())
}

/// Share of `part` in `total` as a percentage, or `0.0` when `total` is not positive.
pub fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        100.0 * part / total
    } else {
        0.0
    }
}

/// Rounds `value` to `figures` significant figures.
///
/// Zero (and non-finite input) is returned unchanged.
pub fn round_to_significant_figures(value: f64, figures: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(figures as i32 - 1 - magnitude);

    (value * factor).round() / factor
}

/// Relative comparison with an absolute floor of `rel_tol` near zero.
pub fn approx_eq(a: f64, b: f64, rel_tol: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= rel_tol * scale
}
