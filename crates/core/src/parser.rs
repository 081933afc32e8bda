use common::error::Error;

use super::expr::{BinaryOp, Expr, Function};
use super::lexer::{Spanned, Token, tokenize};

/// Deepest nesting of parentheses, signs, powers and chained binary
/// operators the parser accepts. It also bounds the depth of the tree.
pub const MAX_DEPTH: usize = 256;

/// Recursive-descent parser over a token vector.
///
/// Precedence, loosest first: binary `+ -`, binary `* /`, unary `- +`,
/// `^` (right-associative). So `-x^2` is `-(x^2)` and `2^-1` is `0.5`.
struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn position(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some((_, position)) => *position,
            None => self.tokens.last().map_or(0, |(_, position)| *position),
        }
    }

    fn descend(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::TooDeep {
                position: self.position(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `rule` one level deeper.
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.descend()?;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn unexpected(&self) -> Error {
        match self.tokens.get(self.pos) {
            Some((token, position)) => Error::UnexpectedToken {
                position: *position,
                found: token.describe(),
            },
            None => Error::UnexpectedEnd,
        }
    }

    fn expect_rparen(&mut self) -> Result<(), Error> {
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_additive()
    }

    // Each chained operator deepens the left-leaning tree by one level, so
    // the loop keeps its levels until the chain ends.
    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let base = self.depth;
        let result = self.additive_chain();
        self.depth = base;
        result
    }

    fn additive_chain(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.descend()?;
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let base = self.depth;
        let result = self.multiplicative_chain();
        self.depth = base;
        result
    }

    fn multiplicative_chain(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.descend()?;
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        match self.peek() {
            Some(Token::Minus) => self.nested(|p| {
                p.pos += 1;
                Ok(Expr::Neg(Box::new(p.parse_unary()?)))
            }),
            Some(Token::Plus) => self.nested(|p| {
                p.pos += 1;
                p.parse_unary()
            }),
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, Error> {
        let base = self.parse_primary()?;

        if self.peek() == Some(&Token::Caret) {
            self.nested(|p| {
                p.pos += 1;
                // The exponent may carry its own sign and chains to the right.
                let exponent = p.parse_unary()?;
                Ok(Expr::binary(BinaryOp::Pow, base, exponent))
            })
        } else {
            Ok(base)
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let Some((token, position)) = self.next() else {
            return Err(Error::UnexpectedEnd);
        };

        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Ident(name) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Ident(name));
                }

                let func = Function::from_name(&name).ok_or(Error::UnknownFunction(name))?;
                self.pos += 1;
                let arg = self.nested(Self::parse_expr)?;
                self.expect_rparen()?;
                Ok(Expr::Call {
                    func,
                    arg: Box::new(arg),
                })
            }
            Token::LParen => {
                let inner = self.nested(Self::parse_expr)?;
                self.expect_rparen()?;
                Ok(inner)
            }
            other => Err(Error::UnexpectedToken {
                position,
                found: other.describe(),
            }),
        }
    }
}

/// Parses `input` into an expression tree.
///
/// # Errors
/// Any lexing error, `Error::UnexpectedToken` for tokens out of place (including
/// trailing input), `Error::UnexpectedEnd` for truncated input, and
/// `Error::UnknownFunction` for calls outside the supported set, and
/// `Error::TooDeep` past [`MAX_DEPTH`] levels of nesting.
pub fn parse(input: &str) -> Result<Expr, Error> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);

    let expr = parser.parse_expr()?;
    if parser.peek().is_some() {
        return Err(parser.unexpected());
    }

    Ok(expr)
}
