use crate::ast::{Token, TokenKind};
use crate::context::Context;

/// Errors raised while scanning source text into tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// No literal, identifier, or operator pattern matches at this position
    UnrecognisedToken { text: String, position: usize },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnrecognisedToken { text, position } => {
                write!(f, "Unrecognised token '{}' at position {}", text, position)
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Scans an expression string left to right into a flat ordered token
/// sequence.
///
/// The tokenizer skips insignificant whitespace and performs no lookahead
/// beyond what is needed to close a literal. Operator tags are matched
/// longest-first against the context's operator registry, so `>=` wins over
/// `>` and a host-registered multi-character tag is honored.
pub struct Tokenizer<'a> {
    context: &'a Context,
    input: Vec<char>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(context: &'a Context) -> Self {
        Tokenizer {
            context,
            input: Vec::new(),
            position: 0,
        }
    }

    /// Tokenize the whole source, producing the parser's input queue
    pub fn tokenize(&mut self, source: &str) -> Result<Vec<Token>, LexError> {
        self.input = source.chars().collect();
        self.position = 0;

        let mut tokens = Vec::new();
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch.is_alphabetic() || ch == '_' {
                tokens.push(self.read_identifier());
            } else if ch.is_ascii_digit() {
                tokens.push(self.read_number());
            } else if ch == '\'' || ch == '"' {
                tokens.push(self.read_string(ch)?);
            } else if ch == '#' {
                tokens.push(self.read_date()?);
            } else if ch == ',' {
                let start = self.position;
                self.advance();
                tokens.push(Token::new(",", TokenKind::Separator, start));
            } else if let Some(len) = self.match_operator() {
                tokens.push(self.read_operator(len));
            } else {
                return Err(self.unrecognised());
            }
        }

        Ok(tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn unrecognised(&self) -> LexError {
        let text: String = self.input[self.position..].iter().collect();
        LexError::UnrecognisedToken {
            text,
            position: self.position,
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.input[start..self.position].iter().collect();

        // Word operators (and, or, not) resolve through the registry under
        // the context case rule; everything else stays an identifier.
        if self.context.operators().is_word_operator(&text) {
            Token::new(text, TokenKind::Operator, start)
        } else {
            Token::new(text, TokenKind::Identifier, start)
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.position;
        let separator = self.context.culture().decimal_separator;

        // 0x / 0b integer forms
        if self.current_char() == Some('0')
            && matches!(self.peek_char(1), Some('x') | Some('X') | Some('b') | Some('B'))
            && self.peek_char(2).is_some_and(|c| c.is_ascii_alphanumeric())
        {
            self.advance();
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_alphanumeric()) {
                self.advance();
            }
            let text: String = self.input[start..self.position].iter().collect();
            return Token::new(text, TokenKind::Number, start);
        }

        let mut seen_separator = false;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == separator
                && !seen_separator
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_separator = true;
                self.advance();
            } else if (ch == 'e' || ch == 'E') && self.exponent_follows() {
                self.advance();
                if matches!(self.current_char(), Some('+') | Some('-')) {
                    self.advance();
                }
                while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
                break;
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        Token::new(text, TokenKind::Number, start)
    }

    fn exponent_follows(&self) -> bool {
        match self.peek_char(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => self.peek_char(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        let mut content = String::new();
        self.advance(); // consume the opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(Token::new(content, TokenKind::String, start));
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => content.push('\n'),
                        Some('r') => content.push('\r'),
                        Some('t') => content.push('\t'),
                        Some('\'') => content.push('\''),
                        Some('"') => content.push('"'),
                        Some('\\') => content.push('\\'),
                        Some(other) => {
                            // Unknown escapes pass through untouched
                            content.push('\\');
                            content.push(other);
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    content.push(ch);
                    self.advance();
                }
            }
        }

        // Unterminated literal: nothing at this position classifies
        self.position = start;
        Err(self.unrecognised())
    }

    fn read_date(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        self.advance(); // consume the opening '#'

        let mut content = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '#' {
                self.advance();
                return Ok(Token::new(content, TokenKind::Date, start));
            }
            content.push(ch);
            self.advance();
        }

        self.position = start;
        Err(self.unrecognised())
    }

    fn match_operator(&self) -> Option<usize> {
        self.context
            .operators()
            .match_symbol(&self.input[self.position..])
    }

    fn read_operator(&mut self, len: usize) -> Token {
        let start = self.position;
        self.position += len;
        let text: String = self.input[start..self.position].iter().collect();
        Token::new(text, TokenKind::Operator, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TokenKind;

    fn tokenize(source: &str) -> Vec<Token> {
        let context = Context::default();
        Tokenizer::new(&context).tokenize(source).unwrap()
    }

    #[test]
    fn test_longest_operator_wins() {
        let tokens = tokenize("a >= b");
        assert_eq!(tokens[1].text, ">=");
        assert_eq!(tokens[1].kind, TokenKind::Operator);
    }

    #[test]
    fn test_word_operators() {
        let tokens = tokenize("a and b or not c");
        assert_eq!(tokens[1].kind, TokenKind::Operator);
        assert_eq!(tokens[3].kind, TokenKind::Operator);
        assert_eq!(tokens[4].kind, TokenKind::Operator);
    }

    #[test]
    fn test_unterminated_string_is_unrecognised() {
        let context = Context::default();
        let err = Tokenizer::new(&context).tokenize("'abc").unwrap_err();
        assert!(matches!(err, LexError::UnrecognisedToken { position: 0, .. }));
    }
}
