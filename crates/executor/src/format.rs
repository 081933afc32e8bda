use clap::ValueEnum;
use common::types::Variable;
use serde::{Deserialize, Serialize};

use super::error::Error;

/// Fraction digits printed when no fixed count is requested.
const MAX_FRACTION_DIGITS: usize = 6;

/// Decimal separator convention for reading and printing numbers.
///
/// `Es` writes `3,14`, `En` writes `3.14`. Thousands separators are never
/// emitted, so every printed number parses back under the same locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecimalLocale {
    #[default]
    Es,
    En,
}

impl DecimalLocale {
    fn separator(&self) -> char {
        match self {
            DecimalLocale::Es => ',',
            DecimalLocale::En => '.',
        }
    }
}

/// Length of the longest prefix of `s` that reads as a decimal float
/// (`[+-]digits[.digits][(e|E)[+-]digits]`), or 0 if there is none.
fn float_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }

    if digits == 0 {
        return 0;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    i
}

/// Reads a number typed by a user.
///
/// Whitespace is dropped, `Es` turns the first `,` into `.`, and the longest
/// numeric prefix is parsed, so `"12,5 V"` reads as `12.5`. Returns `None`
/// when no prefix is numeric.
pub fn try_parse_number(text: &str, locale: DecimalLocale) -> Option<f64> {
    let mut clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if locale == DecimalLocale::Es {
        clean = clean.replacen(',', ".", 1);
    }

    let len = float_prefix_len(&clean);
    if len == 0 {
        return None;
    }

    clean[..len].parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Lenient form of [`try_parse_number`]: `0.0` when nothing parses.
pub fn parse_number(text: &str, locale: DecimalLocale) -> f64 {
    try_parse_number(text, locale).unwrap_or(0.0)
}

fn non_finite(value: f64) -> Option<String> {
    if value.is_nan() {
        Some("NaN".to_string())
    } else if value.is_infinite() {
        Some(if value > 0.0 { "∞" } else { "-∞" }.to_string())
    } else {
        None
    }
}

/// Prints `value` with `decimals` fraction digits, or with up to six and
/// trailing zeros removed when `decimals` is `None`.
pub fn format_number(value: f64, locale: DecimalLocale, decimals: Option<usize>) -> String {
    if let Some(text) = non_finite(value) {
        return text;
    }

    let mut text = match decimals {
        Some(d) => format!("{:.*}", d, value),
        None => {
            let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, value);
            let trimmed = if fixed.contains('.') {
                fixed.trim_end_matches('0').trim_end_matches('.')
            } else {
                fixed.as_str()
            };
            trimmed.to_string()
        }
    };

    if text == "-0" {
        text = "0".to_string();
    }

    text.replace('.', &locale.separator().to_string())
}

/// Scientific notation with three fraction digits and a signed exponent, e.g. `1,235e+3`.
pub fn format_scientific(value: f64, locale: DecimalLocale) -> String {
    if let Some(text) = non_finite(value) {
        return text;
    }

    let raw = format!("{:.3e}", value);
    let text = match raw.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => raw,
    };

    text.replace('.', &locale.separator().to_string())
}

/// Fixed notation for magnitudes in `[1e-4, 1e6)` and zero, scientific otherwise.
pub fn format_auto(value: f64, locale: DecimalLocale, decimals: Option<usize>) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e6).contains(&magnitude) {
        format_scientific(value, locale)
    } else {
        format_number(value, locale, decimals)
    }
}

/// Parses one `name=value±bound` (or `name=value+-bound`) item.
///
/// The bound may be omitted and then defaults to zero.
///
/// # Errors
/// `Error::InvalidInput` for a missing name, an unreadable number or a
/// negative bound.
pub fn parse_variable_item(text: &str, locale: DecimalLocale) -> Result<Variable, Error> {
    let (name, rest) = text
        .split_once('=')
        .ok_or_else(|| Error::InvalidInput(format!("expected name=value±bound, got '{}'", text)))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("missing variable name in '{}'", text)));
    }

    let (value_text, bound_text) = match rest.split_once('±') {
        Some(parts) => (parts.0, Some(parts.1)),
        None => match rest.split_once("+-") {
            Some(parts) => (parts.0, Some(parts.1)),
            None => (rest, None),
        },
    };

    let value = try_parse_number(value_text, locale)
        .ok_or_else(|| Error::InvalidInput(format!("invalid value for '{}': '{}'", name, value_text)))?;

    let bound = match bound_text {
        Some(b) => try_parse_number(b, locale)
            .ok_or_else(|| Error::InvalidInput(format!("invalid bound for '{}': '{}'", name, b)))?,
        None => 0.0,
    };

    if bound < 0.0 {
        return Err(Error::InvalidInput(format!(
            "bound of '{}' must be non-negative, got {}",
            name, bound
        )));
    }

    Ok(Variable::new(name, value, bound))
}

/// Parses a `;`-separated list of variable items; empty items are skipped.
pub fn parse_variable_list(text: &str, locale: DecimalLocale) -> Result<Vec<Variable>, Error> {
    text.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_variable_item(item, locale))
        .collect()
}
