use common::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    /// Source-like rendering used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Caret => "^".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

/// A token and the byte offset where it starts.
pub type Spanned = (Token, usize);

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn eat_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Reads `digits [. digits] [(e|E) [+|-] digits]`, or a number starting with `.`.
    fn read_number(&mut self, start: usize) -> Result<f64, Error> {
        self.eat_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.eat_digits();
        }

        // Only consume an exponent marker when digits follow it, so `2e` stays
        // a number followed by the identifier `e`.
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let exponent_follows = match self.peek_char_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_char_at(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent_follows {
                self.advance();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.advance();
                }
                self.eat_digits();
            }
        }

        let literal = &self.input[start..self.pos];
        literal.parse().map_err(|_| Error::UnexpectedToken {
            position: start,
            found: literal.to_string(),
        })
    }

    fn read_ident(&mut self, start: usize) -> String {
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, Error> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ if c.is_ascii_digit() || c == '.' => {
                return Ok(Some((Token::Number(self.read_number(start)?), start)));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                return Ok(Some((Token::Ident(self.read_ident(start)), start)));
            }
            _ => {
                return Err(Error::InvalidCharacter {
                    position: start,
                    found: c,
                });
            }
        };

        self.advance();
        Ok(Some((token, start)))
    }
}

/// Splits `input` into tokens with their byte offsets.
///
/// # Errors
/// Returns `Error::InvalidCharacter` for any character outside the grammar, or
/// `Error::UnexpectedToken` for a malformed numeric literal such as `.`.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, Error> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn tokenizes_operators_and_identifiers() {
        assert_eq!(
            kinds("V / I"),
            vec![
                Token::Ident("V".into()),
                Token::Slash,
                Token::Ident("I".into())
            ]
        );
    }

    #[test]
    fn tokenizes_numbers_in_all_forms() {
        assert_eq!(
            kinds("12 0.5 .25 1e-3 2.5E+2"),
            vec![
                Token::Number(12.0),
                Token::Number(0.5),
                Token::Number(0.25),
                Token::Number(1e-3),
                Token::Number(250.0),
            ]
        );
    }

    #[test]
    fn exponent_marker_without_digits_is_an_identifier() {
        assert_eq!(
            kinds("2e"),
            vec![Token::Number(2.0), Token::Ident("e".into())]
        );
    }

    #[test]
    fn records_byte_offsets() {
        let tokens = tokenize("PI * r^2").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|(_, pos)| *pos).collect();
        assert_eq!(offsets, vec![0, 3, 5, 6, 7]);
    }

    #[test]
    fn rejects_unknown_characters() {
        assert_eq!(
            tokenize("a $ b"),
            Err(Error::InvalidCharacter {
                position: 2,
                found: '$'
            })
        );
    }

    #[test]
    fn rejects_lone_dot() {
        assert!(matches!(
            tokenize("1 + ."),
            Err(Error::UnexpectedToken { position: 4, .. })
        ));
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
