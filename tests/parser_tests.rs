// tests/parser_tests.rs

use vellum_expr::{
    BinaryOp, Context, Expression, ParseError, Parser, UnaryOp, Value,
};

fn parse(source: &str) -> Expression {
    let context = Context::default();
    let parser = Parser::new(&context);
    let (root, _) = parser.compile(source).unwrap();
    root
}

fn parse_err(source: &str) -> ParseError {
    let context = Context::default();
    let parser = Parser::new(&context);
    parser.compile(source).unwrap_err()
}

fn referenced(source: &str) -> Vec<String> {
    let context = Context::default();
    let parser = Parser::new(&context);
    let (_, variables) = parser.compile(source).unwrap();
    variables
}

fn lit(n: i32) -> Expression {
    Expression::Literal(Value::Integer(n))
}

fn var(name: &str) -> Expression {
    Expression::Variable(name.to_string())
}

// ============================================================================
// Literals and Primaries
// ============================================================================

#[test]
fn test_integer_literal() {
    assert_eq!(parse("42"), lit(42));
}

#[test]
fn test_large_integer_widens_to_long() {
    assert_eq!(
        parse("4000000000"),
        Expression::Literal(Value::Long(4_000_000_000))
    );
}

#[test]
fn test_decimal_literal() {
    assert_eq!(
        parse("3.14"),
        Expression::Literal(Value::Decimal("3.14".parse().unwrap()))
    );
}

#[test]
fn test_exponent_literal_is_double() {
    assert_eq!(parse("1.5e2"), Expression::Literal(Value::Double(150.0)));
}

#[test]
fn test_hex_literal() {
    assert_eq!(parse("0xFF"), lit(255));
}

#[test]
fn test_binary_literal() {
    assert_eq!(parse("0b1010"), lit(10));
}

#[test]
fn test_string_literal() {
    assert_eq!(
        parse("'hello'"),
        Expression::Literal(Value::String("hello".to_string()))
    );
}

#[test]
fn test_keyword_constants() {
    assert_eq!(parse("true"), Expression::Literal(Value::Boolean(true)));
    assert_eq!(parse("FALSE"), Expression::Literal(Value::Boolean(false)));
    assert_eq!(parse("null"), Expression::Literal(Value::Null));
}

#[test]
fn test_math_constants() {
    assert_eq!(
        parse("pi"),
        Expression::Literal(Value::Double(std::f64::consts::PI))
    );
    assert_eq!(
        parse("e"),
        Expression::Literal(Value::Double(std::f64::consts::E))
    );
}

#[test]
fn test_variable() {
    assert_eq!(parse("total"), var("total"));
}

#[test]
fn test_date_literal() {
    match parse("#2024-01-15#") {
        Expression::Literal(Value::Date(d)) => {
            assert_eq!(d.format("%Y-%m-%d").to_string(), "2024-01-15");
        }
        other => panic!("expected a date literal, got {:?}", other),
    }
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    assert_eq!(
        parse("1 + 2 * 3"),
        Expression::binary(
            BinaryOp::Add,
            lit(1),
            Expression::binary(BinaryOp::Multiply, lit(2), lit(3)),
        )
    );
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(
        parse("(1 + 2) * 3"),
        Expression::binary(
            BinaryOp::Multiply,
            Expression::binary(BinaryOp::Add, lit(1), lit(2)),
            lit(3),
        )
    );
}

#[test]
fn test_left_associativity() {
    assert_eq!(
        parse("10 - 3 - 2"),
        Expression::binary(
            BinaryOp::Subtract,
            Expression::binary(BinaryOp::Subtract, lit(10), lit(3)),
            lit(2),
        )
    );
}

#[test]
fn test_comparison_below_arithmetic() {
    assert_eq!(
        parse("1 + 2 > 2"),
        Expression::binary(
            BinaryOp::GreaterThan,
            Expression::binary(BinaryOp::Add, lit(1), lit(2)),
            lit(2),
        )
    );
}

#[test]
fn test_logical_below_comparison() {
    assert_eq!(
        parse("a > 1 and b < 2"),
        Expression::binary(
            BinaryOp::And,
            Expression::binary(BinaryOp::GreaterThan, var("a"), lit(1)),
            Expression::binary(BinaryOp::LessThan, var("b"), lit(2)),
        )
    );
}

#[test]
fn test_coalesce_is_loosest() {
    assert_eq!(
        parse("a ?? b or c"),
        Expression::binary(
            BinaryOp::NullCoalesce,
            var("a"),
            Expression::binary(BinaryOp::Or, var("b"), var("c")),
        )
    );
}

// ============================================================================
// Unary Operators
// ============================================================================

#[test]
fn test_unary_minus_desugars_to_zero_minus() {
    assert_eq!(
        parse("-3"),
        Expression::binary(BinaryOp::Subtract, lit(0), lit(3))
    );
}

#[test]
fn test_unary_minus_in_binary_context() {
    assert_eq!(
        parse("2 * -3"),
        Expression::binary(
            BinaryOp::Multiply,
            lit(2),
            Expression::binary(BinaryOp::Subtract, lit(0), lit(3)),
        )
    );
}

#[test]
fn test_not_operator() {
    assert_eq!(
        parse("not a"),
        Expression::Unary {
            op: UnaryOp::Not,
            operand: Some(Box::new(var("a"))),
        }
    );
}

// ============================================================================
// Property and Index Access
// ============================================================================

#[test]
fn test_property_chain_with_index() {
    assert_eq!(
        parse("a.b[0]"),
        Expression::Index {
            object: Box::new(Expression::Property {
                object: Box::new(var("a")),
                name: "b".to_string(),
            }),
            index: Box::new(lit(0)),
        }
    );
}

#[test]
fn test_leading_dot_is_current_data() {
    assert_eq!(
        parse(".price"),
        Expression::Property {
            object: Box::new(Expression::CurrentData),
            name: "price".to_string(),
        }
    );
}

#[test]
fn test_nested_index() {
    assert_eq!(
        parse("a[b[0]]"),
        Expression::Index {
            object: Box::new(var("a")),
            index: Box::new(Expression::Index {
                object: Box::new(var("b")),
                index: Box::new(lit(0)),
            }),
        }
    );
}

#[test]
fn test_collection_literal() {
    assert_eq!(
        parse("[1, 2, 3]"),
        Expression::Collection(vec![lit(1), lit(2), lit(3)])
    );
}

#[test]
fn test_empty_collection_literal() {
    assert_eq!(parse("[]"), Expression::Collection(vec![]));
}

// ============================================================================
// Function Calls
// ============================================================================

#[test]
fn test_call_with_arguments() {
    assert_eq!(
        parse("If(a, 1, 2)"),
        Expression::Call {
            name: "If".to_string(),
            args: vec![var("a"), lit(1), lit(2)],
        }
    );
}

#[test]
fn test_call_with_no_arguments() {
    assert_eq!(
        parse("PI()"),
        Expression::Call {
            name: "PI".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn test_nested_call_commas_do_not_split_outer_arguments() {
    assert_eq!(
        parse("Max(Min(1, 2), 3)"),
        Expression::Call {
            name: "Max".to_string(),
            args: vec![
                Expression::Call {
                    name: "Min".to_string(),
                    args: vec![lit(1), lit(2)],
                },
                lit(3),
            ],
        }
    );
}

#[test]
fn test_collection_literal_inside_call() {
    assert_eq!(
        parse("Count([1, 2], 3)"),
        Expression::Call {
            name: "Count".to_string(),
            args: vec![Expression::Collection(vec![lit(1), lit(2)]), lit(3)],
        }
    );
}

#[test]
fn test_unknown_function_still_parses() {
    // Callees resolve at evaluation time, not parse time
    assert_eq!(
        parse("NotYetRegistered(1)"),
        Expression::Call {
            name: "NotYetRegistered".to_string(),
            args: vec![lit(1)],
        }
    );
}

// ============================================================================
// Referenced Variables
// ============================================================================

#[test]
fn test_referenced_variables_are_deduplicated() {
    assert_eq!(referenced("a + b * a"), vec!["a", "b"]);
}

#[test]
fn test_function_names_are_not_variables() {
    assert_eq!(referenced("Sum(items) + extra"), vec!["items", "extra"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unclosed_paren_is_missing_token() {
    assert_eq!(parse_err("(1 + 2"), ParseError::MissingToken { expected: ')' });
}

#[test]
fn test_unclosed_bracket_is_missing_token() {
    assert_eq!(parse_err("a[1 + 2"), ParseError::MissingToken { expected: ']' });
}

#[test]
fn test_excess_close_paren_is_unexpected() {
    assert!(matches!(
        parse_err("1 + 2)"),
        ParseError::UnexpectedToken { .. }
    ));
}

#[test]
fn test_missing_argument_separator() {
    assert_eq!(parse_err("Max(1 2)"), ParseError::MissingToken { expected: ',' });
}

#[test]
fn test_adjacent_operands_are_unexpected() {
    assert!(matches!(
        parse_err("1 2"),
        ParseError::UnexpectedToken { .. }
    ));
}

#[test]
fn test_top_level_comma_is_unexpected() {
    assert!(matches!(
        parse_err("1, 2"),
        ParseError::UnexpectedToken { .. }
    ));
}

#[test]
fn test_empty_source_fails() {
    assert_eq!(parse_err(""), ParseError::EmptyExpression);
    assert_eq!(parse_err("   "), ParseError::EmptyExpression);
}

#[test]
fn test_empty_group_fails() {
    assert_eq!(parse_err("()"), ParseError::EmptyExpression);
}

#[test]
fn test_bad_date_literal_fails() {
    assert!(matches!(
        parse_err("#not-a-date#"),
        ParseError::UnrecognisedToken { .. }
    ));
}

#[test]
fn test_case_sensitive_context_rejects_wrong_case_keyword() {
    let context = Context::new(vellum_expr::Options {
        ignore_case: false,
        ignore_case_for_equality: false,
    });
    let parser = Parser::new(&context);
    // 'True' is neither a constant nor an operator here, so it becomes a
    // plain variable reference
    let (root, variables) = parser.compile("True").unwrap();
    assert_eq!(root, var("True"));
    assert_eq!(variables, vec!["True"]);
}
