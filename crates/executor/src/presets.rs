use common::types::Variable;
use errprop_core::Expression;

/// Bound given to every preset or inferred variable before the user edits it.
pub const DEFAULT_BOUND: f64 = 0.1;

/// Nominal value given to inferred variables.
pub const DEFAULT_NOMINAL: f64 = 1.0;

/// A textbook formula with its variable list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    /// Short display key, e.g. `R=V/I`.
    pub key: &'static str,
    /// Name used on the command line.
    pub slug: &'static str,
    pub formula: &'static str,
    pub variables: &'static [&'static str],
    pub latex: &'static str,
    pub description: &'static str,
}

pub const PRESETS: [Preset; 4] = [
    Preset {
        key: "R=V/I",
        slug: "resistance",
        formula: "V/I",
        variables: &["V", "I"],
        latex: r"R = \frac{V}{I}",
        description: "Electrical resistance",
    },
    Preset {
        key: "V=πr²h",
        slug: "cylinder",
        formula: "PI * r^2 * h",
        variables: &["r", "h"],
        latex: r"V = \pi r^2 h",
        description: "Volume of a cylinder",
    },
    Preset {
        key: "ρ=m/V",
        slug: "density",
        formula: "m/V",
        variables: &["m", "V"],
        latex: r"\rho = \frac{m}{V}",
        description: "Density",
    },
    Preset {
        key: "A=½bh",
        slug: "triangle",
        formula: "0.5 * b * h",
        variables: &["b", "h"],
        latex: r"A = \frac{1}{2}bh",
        description: "Area of a triangle",
    },
];

/// Looks a preset up by slug (case-insensitive) or by its exact display key.
pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.slug.eq_ignore_ascii_case(name) || p.key == name)
}

/// Starting nominal value for a preset variable.
fn default_value(name: &str) -> f64 {
    match name {
        "V" => 12.0,
        "I" => 2.0,
        "r" => 5.0,
        "h" => 10.0,
        _ => DEFAULT_NOMINAL,
    }
}

impl Preset {
    pub fn expression(&self) -> Expression {
        Expression::parse(self.formula)
    }

    /// The preset's variables at their starting values, each with a bound of 0.1.
    pub fn default_variables(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .map(|name| Variable::new(*name, default_value(name), DEFAULT_BOUND))
            .collect()
    }
}

/// Variables of a custom formula, in order of first appearance, at nominal 1 and bound 0.1.
pub fn infer_variables(expression: &Expression) -> Vec<Variable> {
    expression
        .identifiers()
        .into_iter()
        .map(|name| Variable::new(name, DEFAULT_NOMINAL, DEFAULT_BOUND))
        .collect()
}
