// tests/tokenizer_tests.rs

use vellum_expr::{Context, LexError, Token, TokenKind, Tokenizer};

fn tokenize(source: &str) -> Vec<Token> {
    let context = Context::default();
    let mut tokenizer = Tokenizer::new(&context);
    tokenizer.tokenize(source).unwrap()
}

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).into_iter().map(|t| t.kind).collect()
}

fn texts(source: &str) -> Vec<String> {
    tokenize(source).into_iter().map(|t| t.text).collect()
}

// ============================================================================
// Single Character Operators
// ============================================================================

#[test]
fn test_single_char_operators() {
    let test_cases = vec![
        "+", "-", "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "(", ")", "[", "]", ".",
    ];

    for input in test_cases {
        let tokens = tokenize(input);
        assert_eq!(tokens.len(), 1, "Failed for input: {}", input);
        assert_eq!(tokens[0].text, input);
        assert_eq!(tokens[0].kind, TokenKind::Operator);
    }
}

// ============================================================================
// Multi Character Operators
// ============================================================================

#[test]
fn test_two_char_operators() {
    let test_cases = vec!["==", "!=", "<>", "<=", ">=", "&&", "||", "??", "<<", ">>"];

    for input in test_cases {
        let tokens = tokenize(input);
        assert_eq!(tokens.len(), 1, "Failed for input: {}", input);
        assert_eq!(tokens[0].text, input);
        assert_eq!(tokens[0].kind, TokenKind::Operator);
    }
}

#[test]
fn test_longest_tag_wins() {
    // '>=' must not split into '>' and '='
    assert_eq!(texts("a>=b"), vec!["a", ">=", "b"]);
    assert_eq!(texts("a> =b"), vec!["a", ">", "=", "b"]);
}

// ============================================================================
// Word Operators
// ============================================================================

#[test]
fn test_word_operators_are_operators() {
    assert_eq!(
        kinds("a and b"),
        vec![TokenKind::Identifier, TokenKind::Operator, TokenKind::Identifier]
    );
    assert_eq!(
        kinds("a or not b"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Operator,
            TokenKind::Identifier
        ]
    );
}

#[test]
fn test_word_operators_ignore_case_by_default() {
    assert_eq!(kinds("a AND b")[1], TokenKind::Operator);
    assert_eq!(kinds("a Or b")[1], TokenKind::Operator);
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_integer_literal() {
    let tokens = tokenize("42");
    assert_eq!(tokens[0].text, "42");
    assert_eq!(tokens[0].kind, TokenKind::Number);
}

#[test]
fn test_decimal_literal() {
    assert_eq!(texts("3.14"), vec!["3.14"]);
    assert_eq!(kinds("3.14"), vec![TokenKind::Number]);
}

#[test]
fn test_exponent_literal() {
    assert_eq!(texts("1.5e3 2e-4"), vec!["1.5e3", "2e-4"]);
}

#[test]
fn test_hex_and_binary_literals() {
    assert_eq!(texts("0xFF 0b1010"), vec!["0xFF", "0b1010"]);
    assert_eq!(kinds("0xFF"), vec![TokenKind::Number]);
}

#[test]
fn test_trailing_dot_is_not_consumed() {
    // '1.' with no digit after the separator leaves the dot for the parser
    assert_eq!(texts("1."), vec!["1", "."]);
}

#[test]
fn test_property_access_is_not_a_decimal() {
    assert_eq!(
        kinds("a.b"),
        vec![TokenKind::Identifier, TokenKind::Operator, TokenKind::Identifier]
    );
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_single_and_double_quotes() {
    let tokens = tokenize("'hello' \"world\"");
    assert_eq!(tokens[0].text, "hello");
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[1].text, "world");
}

#[test]
fn test_string_escapes() {
    let tokens = tokenize(r"'line\nbreak \'quoted\' tab\t'");
    assert_eq!(tokens[0].text, "line\nbreak 'quoted' tab\t");
}

#[test]
fn test_unterminated_string_fails() {
    let context = Context::default();
    let err = Tokenizer::new(&context).tokenize("1 + 'abc").unwrap_err();
    assert!(matches!(err, LexError::UnrecognisedToken { .. }));
}

// ============================================================================
// Dates
// ============================================================================

#[test]
fn test_date_literal() {
    let tokens = tokenize("#2024-01-15#");
    assert_eq!(tokens[0].text, "2024-01-15");
    assert_eq!(tokens[0].kind, TokenKind::Date);
}

#[test]
fn test_unterminated_date_fails() {
    let context = Context::default();
    let err = Tokenizer::new(&context).tokenize("#2024-01-15").unwrap_err();
    assert!(matches!(err, LexError::UnrecognisedToken { .. }));
}

// ============================================================================
// Whole Expressions
// ============================================================================

#[test]
fn test_expression_token_stream() {
    assert_eq!(
        texts("a.b[0] + Sum(items) * 2"),
        vec!["a", ".", "b", "[", "0", "]", "+", "Sum", "(", "items", ")", "*", "2"]
    );
}

#[test]
fn test_separator_kind() {
    assert_eq!(
        kinds("f(a, b)"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Identifier,
            TokenKind::Separator,
            TokenKind::Identifier,
            TokenKind::Operator,
        ]
    );
}

#[test]
fn test_positions_are_byte_offsets_of_start() {
    let tokens = tokenize("ab + cd");
    assert_eq!(tokens[0].start, 0);
    assert_eq!(tokens[1].start, 3);
    assert_eq!(tokens[2].start, 5);
}

#[test]
fn test_whitespace_is_insignificant() {
    assert_eq!(texts("1+2"), texts("  1 \t +\n 2  "));
}

#[test]
fn test_unknown_character_fails() {
    let context = Context::default();
    let err = Tokenizer::new(&context).tokenize("1 ~ 2").unwrap_err();
    match err {
        LexError::UnrecognisedToken { text, position } => {
            assert!(text.starts_with('~'));
            assert_eq!(position, 2);
        }
    }
}
