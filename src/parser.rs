use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::ast::{Expression, Token, TokenKind};
use crate::context::Context;
use crate::operators::{OperatorKind, Precedence};
use crate::tokenizer::{LexError, Tokenizer};
use crate::value::Value;

/// Errors raised while compiling source text into an expression tree.
///
/// Compilation is all-or-nothing: the parser produces exactly one tree per
/// call or fails without partial output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Tokenization failed
    Lex(LexError),

    /// A grouping, call, or index span never reached its matching close
    /// before the token queue was exhausted
    MissingToken { expected: char },

    /// A token appeared where the grammar does not allow it
    UnexpectedToken { text: String, position: usize },

    /// A token survived tokenization but resolves to nothing during
    /// parsing (malformed literal, unregistered operator)
    UnrecognisedToken { text: String },

    /// The source, or a span that must hold an operand, is empty
    EmptyExpression,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(err) => write!(f, "{}", err),
            ParseError::MissingToken { expected } => {
                write!(f, "Missing token, expecting '{}'", expected)
            }
            ParseError::UnexpectedToken { text, position } => {
                write!(f, "Unexpected token '{}' at position {}", text, position)
            }
            ParseError::UnrecognisedToken { text } => {
                write!(f, "Unrecognised token '{}'", text)
            }
            ParseError::EmptyExpression => write!(f, "An expression cannot be empty"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lex(err)
    }
}

/// Parses a single expression tree from source text.
///
/// The core algorithm is iterative precedence resolution: each operator
/// token's precedence (from the operator registry, parameterized by
/// whether a left operand is present) decides when it reduces relative to
/// its neighbors. Grouping operators pull their captive token span out of
/// the queue and recurse on it as an independent sub-expression.
pub struct Parser<'a> {
    context: &'a Context,
}

impl<'a> Parser<'a> {
    pub fn new(context: &'a Context) -> Self {
        Parser { context }
    }

    /// Compile source text, returning the root node and the list of
    /// variable names the expression references
    pub fn compile(&self, source: &str) -> Result<(Expression, Vec<String>), ParseError> {
        if source.trim().is_empty() {
            return Err(ParseError::EmptyExpression);
        }

        let tokens = Tokenizer::new(self.context).tokenize(source)?;

        // Bail out early on an unbalanced set of parentheses
        let mut depth: i64 = 0;
        for token in &tokens {
            if token.kind == TokenKind::Operator {
                if token.is("(") {
                    depth += 1;
                } else if token.is(")") {
                    depth -= 1;
                    if depth < 0 {
                        return Err(ParseError::UnexpectedToken {
                            text: ")".to_string(),
                            position: token.start,
                        });
                    }
                }
            }
        }
        if depth > 0 {
            return Err(ParseError::MissingToken { expected: ')' });
        }

        let mut queue: VecDeque<Token> = tokens.into();
        let mut variables = Vec::new();
        let root = self.compile_queue(&mut queue, Precedence::Minimum, &mut variables, false)?;

        if let Some(stray) = queue.front() {
            return Err(ParseError::UnexpectedToken {
                text: stray.text.clone(),
                position: stray.start,
            });
        }

        match root {
            Some(root) => Ok((root, variables)),
            None => Err(ParseError::EmptyExpression),
        }
    }

    fn compile_queue(
        &self,
        tokens: &mut VecDeque<Token>,
        minimum: Precedence,
        variables: &mut Vec<String>,
        within_function: bool,
    ) -> Result<Option<Expression>, ParseError> {
        let mut left: Option<Expression> = None;

        while let Some(current) = tokens.front().cloned() {
            if current.kind == TokenKind::Operator {
                let Some(op) = self.context.operators().get(&current.text).cloned() else {
                    tokens.pop_front();
                    return Err(ParseError::UnrecognisedToken { text: current.text });
                };

                let precedence = op.precedence(left.is_some());
                if precedence <= minimum {
                    break;
                }
                tokens.pop_front();

                match op.kind() {
                    OperatorKind::ParenOpen => {
                        if left.is_some() {
                            return Err(self.unexpected(&current));
                        }
                        let mut captive = extract_captive(tokens, "(", ")")?;
                        let inner = self
                            .compile_queue(&mut captive, Precedence::Minimum, variables, within_function)?
                            .ok_or(ParseError::EmptyExpression)?;
                        if let Some(stray) = captive.front() {
                            return Err(self.unexpected(stray));
                        }
                        left = Some(inner);
                    }
                    OperatorKind::IndexOpen => {
                        let mut captive = extract_captive(tokens, "[", "]")?;
                        if let Some(object) = left.take() {
                            // Index access binds the captive span as the key
                            let index = self
                                .compile_queue(&mut captive, Precedence::Minimum, variables, within_function)?
                                .ok_or(ParseError::EmptyExpression)?;
                            if let Some(stray) = captive.front() {
                                return Err(self.unexpected(stray));
                            }
                            left = Some(Expression::Index {
                                object: Box::new(object),
                                index: Box::new(index),
                            });
                        } else {
                            // No operand to index: a collection literal
                            let mut elements = Vec::new();
                            for mut segment in split_arguments(captive) {
                                let element = self
                                    .compile_queue(&mut segment, Precedence::Minimum, variables, within_function)?
                                    .ok_or(ParseError::EmptyExpression)?;
                                elements.push(element);
                            }
                            left = Some(Expression::Collection(elements));
                        }
                    }
                    OperatorKind::ParenClose | OperatorKind::IndexClose => {
                        // Close tags have minimum precedence and never reduce
                        return Err(self.unexpected(&current));
                    }
                    OperatorKind::Property => {
                        let object = left
                            .take()
                            .map(Box::new)
                            .unwrap_or_else(|| Box::new(Expression::CurrentData));
                        let name = match tokens.pop_front() {
                            Some(token) if token.kind == TokenKind::Identifier => token.text,
                            Some(token) => return Err(self.unexpected(&token)),
                            None => return Err(ParseError::EmptyExpression),
                        };
                        left = Some(Expression::Property { object, name });
                    }
                    OperatorKind::Additive(binop) => {
                        // With no left operand this is a prefix sign: 0 <op> x
                        let lhs = left
                            .take()
                            .unwrap_or(Expression::Literal(Value::Integer(0)));
                        let rhs = self
                            .compile_queue(tokens, precedence, variables, within_function)?;
                        left = Some(Expression::Binary {
                            op: *binop,
                            left: Some(Box::new(lhs)),
                            right: rhs.map(Box::new),
                        });
                    }
                    OperatorKind::Binary(binop) => {
                        let lhs = left.take();
                        let rhs = self
                            .compile_queue(tokens, precedence, variables, within_function)?;
                        left = Some(Expression::Binary {
                            op: *binop,
                            left: lhs.map(Box::new),
                            right: rhs.map(Box::new),
                        });
                    }
                    OperatorKind::Not => {
                        if left.is_some() {
                            return Err(self.unexpected(&current));
                        }
                        let operand = self
                            .compile_queue(tokens, precedence, variables, within_function)?;
                        left = Some(Expression::Unary {
                            op: crate::ast::UnaryOp::Not,
                            operand: operand.map(Box::new),
                        });
                    }
                    OperatorKind::Custom { build, .. } => {
                        let lhs = left.take();
                        let rhs = self
                            .compile_queue(tokens, precedence, variables, within_function)?;
                        left = Some(build.as_ref()(lhs, rhs));
                    }
                }
            } else if current.kind == TokenKind::Identifier {
                self.check_existing_participant(&left, &current, within_function)?;
                tokens.pop_front();

                if tokens
                    .front()
                    .is_some_and(|t| t.kind == TokenKind::Operator && t.is("("))
                {
                    // An identifier immediately followed by '(' is a call
                    tokens.pop_front();
                    let captive = extract_captive(tokens, "(", ")")?;
                    let mut args = Vec::new();
                    for mut segment in split_arguments(captive) {
                        let arg = self
                            .compile_queue(&mut segment, Precedence::Minimum, variables, true)?
                            .ok_or(ParseError::EmptyExpression)?;
                        args.push(arg);
                    }
                    left = Some(Expression::Call {
                        name: current.text.clone(),
                        args,
                    });
                } else if let Some(constant) = self.constant_of(&current.text) {
                    left = Some(constant);
                } else if self.is_self_reference(&current.text) {
                    left = Some(Expression::CurrentData);
                } else {
                    self.record_variable(&current.text, variables);
                    left = Some(Expression::Variable(current.text.clone()));
                }
            } else if current.kind == TokenKind::Number {
                self.check_existing_participant(&left, &current, within_function)?;
                tokens.pop_front();
                left = Some(Expression::Literal(self.parse_number(&current)?));
            } else if current.kind == TokenKind::String {
                self.check_existing_participant(&left, &current, within_function)?;
                tokens.pop_front();
                left = Some(Expression::Literal(Value::String(current.text.clone())));
            } else if current.kind == TokenKind::Date {
                self.check_existing_participant(&left, &current, within_function)?;
                tokens.pop_front();
                left = Some(Expression::Literal(parse_date_literal(&current)?));
            } else if current.kind == TokenKind::Separator {
                // Argument separators only occur inside a call span, and
                // those are split off before parsing
                return Err(self.unexpected(&current));
            } else {
                tokens.pop_front();
                return Err(ParseError::UnrecognisedToken { text: current.text });
            }
        }

        Ok(left)
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            text: token.text.clone(),
            position: token.start,
        }
    }

    /// Two operands with no joining operator: inside a call this means a
    /// missing argument separator, elsewhere it is a malformed expression
    fn check_existing_participant(
        &self,
        left: &Option<Expression>,
        token: &Token,
        within_function: bool,
    ) -> Result<(), ParseError> {
        if left.is_none() {
            return Ok(());
        }
        if within_function {
            Err(ParseError::MissingToken { expected: ',' })
        } else {
            Err(self.unexpected(token))
        }
    }

    fn matches_keyword(&self, text: &str, keyword: &str) -> bool {
        if self.context.parsing_ignore_case() {
            text.eq_ignore_ascii_case(keyword)
        } else {
            text == keyword || text == keyword.to_uppercase()
        }
    }

    fn constant_of(&self, text: &str) -> Option<Expression> {
        if self.matches_keyword(text, "true") {
            Some(Expression::Literal(Value::Boolean(true)))
        } else if self.matches_keyword(text, "false") {
            Some(Expression::Literal(Value::Boolean(false)))
        } else if self.matches_keyword(text, "null") {
            Some(Expression::Literal(Value::Null))
        } else if self.matches_keyword(text, "pi") {
            Some(Expression::Literal(Value::Double(std::f64::consts::PI)))
        } else if self.matches_keyword(text, "e") {
            Some(Expression::Literal(Value::Double(std::f64::consts::E)))
        } else {
            None
        }
    }

    fn is_self_reference(&self, text: &str) -> bool {
        self.matches_keyword(text, "this")
    }

    fn record_variable(&self, name: &str, variables: &mut Vec<String>) {
        let present = if self.context.parsing_ignore_case() {
            variables.iter().any(|v| v.eq_ignore_ascii_case(name))
        } else {
            variables.iter().any(|v| v == name)
        };
        if !present {
            variables.push(name.to_string());
        }
    }

    /// Numeric literal forms: integer, decimal, exponent, `0x`, `0b`.
    /// Plain integers prefer the 32-bit type, widening to 64-bit; decimal
    /// forms become high-precision decimals; exponent forms are doubles.
    fn parse_number(&self, token: &Token) -> Result<Value, ParseError> {
        let text = &token.text;
        let unrecognised = || ParseError::UnrecognisedToken { text: text.clone() };

        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            let value = i64::from_str_radix(hex, 16).map_err(|_| unrecognised())?;
            return Ok(shrink(value));
        }
        if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
            let value = i64::from_str_radix(bin, 2).map_err(|_| unrecognised())?;
            return Ok(shrink(value));
        }

        let separator = self.context.culture().decimal_separator;
        let normalized = if separator == '.' {
            text.clone()
        } else {
            text.replace(separator, ".")
        };

        if normalized.contains(['e', 'E']) {
            return normalized
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| unrecognised());
        }
        if normalized.contains('.') {
            if let Ok(decimal) = normalized.parse::<Decimal>() {
                return Ok(Value::Decimal(decimal));
            }
            return normalized
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| unrecognised());
        }
        if let Ok(small) = normalized.parse::<i32>() {
            return Ok(Value::Integer(small));
        }
        if let Ok(wide) = normalized.parse::<i64>() {
            return Ok(Value::Long(wide));
        }
        normalized
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| unrecognised())
    }
}

fn shrink(value: i64) -> Value {
    match i32::try_from(value) {
        Ok(small) => Value::Integer(small),
        Err(_) => Value::Long(value),
    }
}

/// Date literals accept the ISO-ish formats plus the `today`/`now` tags
fn parse_date_literal(token: &Token) -> Result<Value, ParseError> {
    let text = token.text.trim();
    if text.eq_ignore_ascii_case("today") {
        let today = chrono::Local::now().date_naive();
        return Ok(Value::Date(today.and_time(chrono::NaiveTime::MIN)));
    }
    if text.eq_ignore_ascii_case("now") {
        return Ok(Value::Date(chrono::Local::now().naive_local()));
    }
    crate::coerce::parse_date_string(text)
        .map(Value::Date)
        .ok_or_else(|| ParseError::UnrecognisedToken {
            text: token.text.clone(),
        })
}

/// Consume tokens up to the close of the current grouping pair, tracking
/// nesting depth of the same pair. The delimiters themselves are not part
/// of the returned span.
fn extract_captive(
    tokens: &mut VecDeque<Token>,
    open: &str,
    close: &str,
) -> Result<VecDeque<Token>, ParseError> {
    let mut captive = VecDeque::new();
    let mut depth = 1usize;

    while let Some(token) = tokens.pop_front() {
        if token.kind == TokenKind::Operator {
            if token.is(open) {
                depth += 1;
            } else if token.is(close) {
                depth -= 1;
                if depth == 0 {
                    return Ok(captive);
                }
            }
        }
        captive.push_back(token);
    }

    Err(ParseError::MissingToken {
        expected: close.chars().next().unwrap_or(')'),
    })
}

/// Split a captive span on top-level commas; commas nested inside inner
/// brackets or parentheses are not split points
fn split_arguments(tokens: VecDeque<Token>) -> Vec<VecDeque<Token>> {
    let mut segments = Vec::new();
    let mut current = VecDeque::new();
    let mut depth = 0usize;

    for token in tokens {
        if token.kind == TokenKind::Operator {
            if token.is("(") || token.is("[") {
                depth += 1;
            } else if token.is(")") || token.is("]") {
                depth = depth.saturating_sub(1);
            }
        }
        if token.kind == TokenKind::Separator && depth == 0 {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push_back(token);
        }
    }

    if !current.is_empty() || !segments.is_empty() {
        segments.push(current);
    }
    segments
}
