use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;

use common::error::Error;

/// Variable name → value lookup used by every evaluation.
pub type Bindings = HashMap<String, f64>;

/// Reserved identifier resolving to π when the caller does not bind it.
pub const PI_IDENT: &str = "PI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            // x / 0 stays inf/NaN; callers tolerate non-finite values.
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Named one-argument functions of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Ln,
    Exp,
    Sqrt,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "ln" => Some(Function::Ln),
            "exp" => Some(Function::Exp),
            "sqrt" => Some(Function::Sqrt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Ln => "ln",
            Function::Exp => "exp",
            Function::Sqrt => "sqrt",
        }
    }

    /// `ln` of a non-positive number and `sqrt` of a negative one yield `NaN`/`-inf`.
    fn apply(self, x: f64) -> f64 {
        match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Ln => x.ln(),
            Function::Exp => x.exp(),
            Function::Sqrt => x.sqrt(),
        }
    }
}

/// Abstract syntax tree of a scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ident(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        arg: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluates the tree against `bindings`.
    ///
    /// Bound names shadow the reserved `PI`.
    ///
    /// # Errors
    /// Returns `Error::UnboundIdentifier` for a name that is neither bound nor `PI`.
    /// Arithmetic singularities are not errors.
    pub fn eval(&self, bindings: &Bindings) -> Result<f64, Error> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Ident(name) => match bindings.get(name) {
                Some(value) => Ok(*value),
                None if name == PI_IDENT => Ok(PI),
                None => Err(Error::UnboundIdentifier(name.clone())),
            },
            Expr::Neg(inner) => Ok(-inner.eval(bindings)?),
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(bindings)?;
                let r = rhs.eval(bindings)?;
                Ok(op.apply(l, r))
            }
            Expr::Call { func, arg } => Ok(func.apply(arg.eval(bindings)?)),
        }
    }

    /// Free identifiers in first-appearance order, without duplicates and without `PI`.
    pub fn identifiers(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers(&self, names: &mut Vec<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ident(name) => {
                if name != PI_IDENT && !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Expr::Neg(inner) => inner.collect_identifiers(names),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_identifiers(names);
                rhs.collect_identifiers(names);
            }
            Expr::Call { arg, .. } => arg.collect_identifiers(names),
        }
    }
}

impl fmt::Display for Expr {
    /// Fully parenthesised rendering, unambiguous regardless of precedence.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Neg(inner) => write!(f, "(-{})", inner),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call { func, arg } => write!(f, "{}({})", func.name(), arg),
        }
    }
}
