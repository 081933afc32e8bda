use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A character that cannot start any token was found at the given byte offset.
    InvalidCharacter { position: usize, found: char },

    /// The parser met a token it cannot place at the given byte offset.
    UnexpectedToken { position: usize, found: String },

    /// The expression ended while the parser still expected an operand or `)`.
    UnexpectedEnd,

    /// A call to a function outside `sin cos tan ln exp sqrt`.
    UnknownFunction(String),

    /// An identifier with no binding and no reserved meaning.
    UnboundIdentifier(String),

    /// Evaluation succeeded but produced `inf` or `NaN`.
    NonFinite(f64),

    /// Nesting passed the parser's depth limit at the given byte offset.
    TooDeep { position: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidCharacter { position, found } => {
                write!(f, "Invalid character '{}' at position {}.", found, position)
            }

            Error::UnexpectedToken { position, found } => {
                write!(f, "Unexpected token '{}' at position {}.", found, position)
            }

            Error::UnexpectedEnd => write!(f, "Expression ended unexpectedly."),

            Error::UnknownFunction(name) => write!(f, "Unknown function '{}'.", name),

            Error::UnboundIdentifier(name) => {
                write!(f, "Identifier '{}' has no bound value.", name)
            }

            Error::NonFinite(value) => write!(f, "Evaluation produced a non-finite value ({}).", value),

            Error::TooDeep { position } => {
                write!(f, "Expression nested too deeply at position {}.", position)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_character() {
        let err = Error::InvalidCharacter {
            position: 3,
            found: '$',
        };
        assert_eq!(err.to_string(), "Invalid character '$' at position 3.");
    }

    #[test]
    fn display_unbound_identifier() {
        let err = Error::UnboundIdentifier("x".into());
        assert_eq!(err.to_string(), "Identifier 'x' has no bound value.");
    }

    #[test]
    fn display_non_finite() {
        let err = Error::NonFinite(f64::INFINITY);
        assert_eq!(
            err.to_string(),
            "Evaluation produced a non-finite value (inf)."
        );
    }

    #[test]
    fn display_too_deep() {
        let err = Error::TooDeep { position: 256 };
        assert_eq!(err.to_string(), "Expression nested too deeply at position 256.");
    }
}
