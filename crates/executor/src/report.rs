use common::types::{DirectResult, ExtremesValidation, InverseResult};

use super::config::FormatConfig;
use super::format::{format_auto, format_number};

/// Characters of a full (100 %) sensitivity bar.
const BAR_WIDTH: usize = 40;

/// Smallest drawn bar, in percent, so tiny contributions stay visible.
const MIN_BAR_PERCENT: f64 = 2.0;

fn bar(percent: f64) -> String {
    let clamped = percent.clamp(MIN_BAR_PERCENT, 100.0);
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// One line per item, largest share first.
pub fn sensitivity_bars(items: &[(&str, f64)], format: &FormatConfig) -> Vec<String> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let name_width = sorted.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    sorted
        .iter()
        .map(|(name, percent)| {
            format!(
                "  {:<width$}  {} {:>6}%",
                name,
                bar(*percent),
                format_number(*percent, format.locale, Some(1)),
                width = name_width
            )
        })
        .collect()
}

pub fn render_direct(
    result: &DirectResult,
    validation: Option<&ExtremesValidation>,
    format: &FormatConfig,
) -> String {
    let num = |v: f64| format_auto(v, format.locale, format.decimals);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("f(x̄)      = {}", num(result.value)));
    lines.push(format!("Δ*(f)      = {}", num(result.absolute_error)));
    lines.push(format!("ε*(f)      = {}%", num(result.relative_error * 100.0)));
    lines.push(format!(
        "interval   = [{}; {}]",
        num(result.interval.lower),
        num(result.interval.upper)
    ));

    lines.push("\nEffects:".to_string());
    for effect in &result.effects {
        lines.push(format!(
            "  {}: ∂f/∂{} = {}, effect = {} ({}%)",
            effect.variable,
            effect.variable,
            num(effect.partial_derivative),
            num(effect.effect),
            format_number(effect.percentage, format.locale, Some(1))
        ));
    }

    let items: Vec<(&str, f64)> = result
        .effects
        .iter()
        .map(|e| (e.variable.as_str(), e.percentage))
        .collect();
    if !items.is_empty() {
        lines.push("\nSensitivity:".to_string());
        lines.extend(sensitivity_bars(&items, format));
    }

    if let Some(validation) = validation {
        lines.push(format!("\nExtremes ({} samples):", validation.samples_used));
        lines.push(format!("  min = {}", num(validation.min)));
        lines.push(format!("  max = {}", num(validation.max)));
        let verdict = if validation.is_coherent {
            "coherent with the linear estimate"
        } else {
            "NOT coherent: the linear estimate underestimates the error"
        };
        lines.push(format!("  {}", verdict));
    }

    lines.join("\n") + "\n"
}

pub fn render_inverse(result: &InverseResult, format: &FormatConfig) -> String {
    let num = |v: f64| format_auto(v, format.locale, format.decimals);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "{} ({}), target Δ*(f) = {}",
        result.hypothesis,
        result.hypothesis.description(),
        num(result.target_error)
    ));

    lines.push("\nRequired bounds:".to_string());
    for bound in &result.variables {
        lines.push(format!(
            "  Δ*({}) = {}   ε*({}) = {}%",
            bound.name,
            num(bound.required_error),
            bound.name,
            num(bound.required_relative_error * 100.0)
        ));
    }

    let items: Vec<(&str, f64)> = result
        .effects
        .iter()
        .map(|e| (e.variable.as_str(), e.percentage))
        .collect();
    if !items.is_empty() {
        lines.push("\nResulting effects:".to_string());
        lines.extend(sensitivity_bars(&items, format));
    }

    lines.join("\n") + "\n"
}
