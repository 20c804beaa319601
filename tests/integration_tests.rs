// tests/integration_tests.rs
//
// End-to-end behavior through the public surface: compile once, evaluate
// many times, registry extension, and the documented compatibility
// contracts.

use std::collections::HashMap;
use std::sync::Arc;

use vellum_expr::{
    Arity, BinaryOp, CompiledExpression, Context, EvalError, Expression, FunctionDef,
    OperatorDef, OperatorKind, Options, ParseError, Precedence, RegistrationError, Value,
    Variables, compile, evaluator, from_json, register_default_function, to_json,
};

fn eval(source: &str) -> Value {
    compile(source).unwrap().evaluate(&HashMap::new()).unwrap()
}

fn vars(pairs: Vec<(&str, Value)>) -> Variables {
    let mut map = HashMap::new();
    for (name, value) in pairs {
        map.insert(name.to_string(), value);
    }
    map
}

fn ints(values: Vec<i32>) -> Value {
    Value::Collection(values.into_iter().map(Value::Integer).collect())
}

// ============================================================================
// Documented Contract Properties
// ============================================================================

#[test]
fn test_precedence_property() {
    let variables = vars(vec![
        ("a", Value::Integer(2)),
        ("b", Value::Integer(3)),
        ("c", Value::Integer(4)),
    ]);
    let plain = compile("a + b * c").unwrap().evaluate(&variables).unwrap();
    let grouped = compile("a + (b * c)").unwrap().evaluate(&variables).unwrap();
    assert_eq!(plain, grouped);
    assert_eq!(plain, Value::Integer(14));

    let forced = compile("(a + b) * c").unwrap().evaluate(&variables).unwrap();
    assert_eq!(forced, Value::Integer(20));
}

#[test]
fn test_balanced_grouping_property() {
    assert_eq!(
        compile("(1 + 2").unwrap_err(),
        ParseError::MissingToken { expected: ')' }
    );
    assert_eq!(eval("(1 + 2)"), Value::Integer(3));
}

#[test]
fn test_null_tolerant_equality_property() {
    assert_eq!(eval("missing == null"), Value::Boolean(true));
    assert_eq!(eval("missing != null"), Value::Boolean(false));
}

#[test]
fn test_broadcasting_properties() {
    assert_eq!(eval("[1, 2, 3] + [10, 20, 30]"), ints(vec![11, 22, 33]));
    assert_eq!(eval("[1, 2, 3] + 1"), ints(vec![2, 3, 4]));
    assert_eq!(eval("[1, 2] + [10, 20, 30]"), Value::Null);
}

#[test]
fn test_count_semantics_property() {
    assert_eq!(eval("Count(1, 2, null, 3)"), Value::Integer(3));
}

#[test]
fn test_max_min_asymmetry_property() {
    assert_eq!(eval("Max(1, null, 3)"), Value::Null);
    assert_eq!(eval("Min(1, null, 3)"), Value::Integer(1));
}

#[test]
fn test_registration_conflict_property() {
    let mut context = Context::default();

    let replacement = FunctionDef::new("Sum", Arity::AtLeast(1), |_, _, _| {
        Ok(Value::String("replaced".to_string()))
    });

    let err = context
        .register_function(replacement.clone(), false)
        .unwrap_err();
    assert_eq!(
        err,
        RegistrationError::FunctionAlreadyRegistered("Sum".to_string())
    );

    context.register_function(replacement, true).unwrap();
    let compiled = CompiledExpression::with_context("Sum(1, 2)", context).unwrap();
    assert_eq!(
        compiled.evaluate(&HashMap::new()).unwrap(),
        Value::String("replaced".to_string())
    );
}

#[test]
fn test_round_trip_stability_property() {
    let variables = vars(vec![
        ("a", Value::Integer(6)),
        ("items", ints(vec![1, 2, 3])),
    ]);
    let source = "a * Sum(items) + Max(items)";

    let first = compile(source).unwrap();
    let second = compile(source).unwrap();
    assert_eq!(
        first.evaluate(&variables).unwrap(),
        second.evaluate(&variables).unwrap()
    );
    // Re-evaluating the same tree is also stable
    assert_eq!(
        first.evaluate(&variables).unwrap(),
        first.evaluate(&variables).unwrap()
    );
}

// ============================================================================
// Compile Once, Evaluate Many
// ============================================================================

#[test]
fn test_reuse_against_different_variables() {
    let compiled = compile("price * quantity").unwrap();

    let order1 = vars(vec![
        ("price", Value::Integer(10)),
        ("quantity", Value::Integer(3)),
    ]);
    let order2 = vars(vec![
        ("price", Value::Integer(7)),
        ("quantity", Value::Integer(6)),
    ]);

    assert_eq!(compiled.evaluate(&order1).unwrap(), Value::Integer(30));
    assert_eq!(compiled.evaluate(&order2).unwrap(), Value::Integer(42));
}

#[test]
fn test_referenced_variables_surface() {
    let compiled = compile("a.b + Sum(items) * rate").unwrap();
    assert_eq!(compiled.referenced_variables(), ["a", "items", "rate"]);
    assert_eq!(compiled.source(), "a.b + Sum(items) * rate");
}

#[test]
fn test_template_style_expression() {
    let variables = vars(vec![(
        "order",
        from_json(serde_json::json!({
            "customer": {"name": "Ava"},
            "lines": [
                {"qty": 2, "price": 9.5},
                {"qty": 1, "price": 40},
            ],
        })),
    )]);

    let compiled =
        compile("If(SumOf(order.lines, .qty * .price) > 50, 'bulk', 'standard')").unwrap();
    assert_eq!(
        compiled.evaluate(&variables).unwrap(),
        Value::String("bulk".to_string())
    );

    let greeting = compile("'Dear ' + order.customer.name").unwrap();
    assert_eq!(
        greeting.evaluate(&variables).unwrap(),
        Value::String("Dear Ava".to_string())
    );
}

// ============================================================================
// Registry Extension
// ============================================================================

#[test]
fn test_function_registered_after_compilation_is_found() {
    // Callees resolve at evaluation time, so a registration made after
    // parsing still takes effect
    let mut compiled = compile("Twice(21)").unwrap();
    assert!(matches!(
        compiled.evaluate(&HashMap::new()).unwrap_err(),
        EvalError::UnknownFunction { .. }
    ));

    compiled
        .context_mut()
        .register_function(
            FunctionDef::new("Twice", Arity::Exact(1), |args, scope, context| {
                let value = evaluator::evaluate(&args[0], scope, context)?;
                match value.as_long() {
                    Some(n) => Ok(Value::Long(n * 2)),
                    None => Ok(Value::Null),
                }
            }),
            false,
        )
        .unwrap();

    assert_eq!(compiled.evaluate(&HashMap::new()).unwrap(), Value::Long(42));
}

#[test]
fn test_unregister_function() {
    let mut context = Context::default();
    context.unregister_function("Sum");
    let compiled = CompiledExpression::with_context("Sum(1, 2)", context).unwrap();
    assert!(matches!(
        compiled.evaluate(&HashMap::new()).unwrap_err(),
        EvalError::UnknownFunction { .. }
    ));
}

#[test]
fn test_custom_operator_desugars_to_call() {
    let mut context = Context::default();
    context
        .register_operator(
            OperatorDef::new(
                &["**"],
                OperatorKind::Custom {
                    precedence: Precedence::Multiplicative,
                    build: Arc::new(|left, right| Expression::Call {
                        name: "Pow".to_string(),
                        args: left.into_iter().chain(right).collect(),
                    }),
                },
            ),
            false,
        )
        .unwrap();

    let compiled = CompiledExpression::with_context("2 ** 10", context).unwrap();
    assert_eq!(
        compiled.evaluate(&HashMap::new()).unwrap(),
        Value::Double(1024.0)
    );
}

#[test]
fn test_duplicate_operator_registration_fails() {
    let mut context = Context::default();
    let err = context
        .register_operator(
            OperatorDef::new(&["+"], OperatorKind::Binary(BinaryOp::Add)),
            false,
        )
        .unwrap_err();
    assert_eq!(
        err,
        RegistrationError::OperatorAlreadyRegistered("+".to_string())
    );
}

#[test]
fn test_default_function_list_feeds_new_contexts() {
    register_default_function(FunctionDef::new(
        "AnswerOfEverything",
        Arity::Exact(0),
        |_, _, _| Ok(Value::Integer(42)),
    ));

    // Contexts created after the registration include the entry
    let compiled = compile("AnswerOfEverything()").unwrap();
    assert_eq!(compiled.evaluate(&HashMap::new()).unwrap(), Value::Integer(42));
}

// ============================================================================
// Case Rules
// ============================================================================

#[test]
fn test_function_names_ignore_case_by_default() {
    assert_eq!(eval("sum(1, 2)"), Value::Integer(3));
    assert_eq!(eval("SUM(1, 2)"), Value::Integer(3));
}

#[test]
fn test_ordinal_function_lookup() {
    let context = Context::new(Options {
        ignore_case: false,
        ignore_case_for_equality: false,
    });
    let compiled = CompiledExpression::with_context("sum(1, 2)", context).unwrap();
    assert!(matches!(
        compiled.evaluate(&HashMap::new()).unwrap_err(),
        EvalError::UnknownFunction { .. }
    ));
}

// ============================================================================
// Host Index and JSON Round Trips
// ============================================================================

#[test]
fn test_host_supplied_current_index() {
    let mut context = Context::default();
    context.set_current_index(3);
    let compiled = CompiledExpression::with_context("Index() + 1", context).unwrap();
    assert_eq!(compiled.evaluate(&HashMap::new()).unwrap(), Value::Integer(4));
}

#[test]
fn test_index_defaults_to_null() {
    assert_eq!(eval("Index()"), Value::Null);
}

#[test]
fn test_result_to_json() {
    assert_eq!(to_json(&eval("[1, 2] + 1")), serde_json::json!([2, 3]));
    assert_eq!(to_json(&eval("1 == 1")), serde_json::json!(true));
    assert_eq!(to_json(&Value::Null), serde_json::Value::Null);
}

#[test]
fn test_eval_memoizes_last_source() {
    let compiled = compile("Eval(source)").unwrap();
    let first = vars(vec![("source", Value::String("1 + 1".to_string()))]);
    let second = vars(vec![("source", Value::String("2 + 2".to_string()))]);

    // Same source twice reuses the memoized tree; a new source replaces it
    assert_eq!(compiled.evaluate(&first).unwrap(), Value::Integer(2));
    assert_eq!(compiled.evaluate(&first).unwrap(), Value::Integer(2));
    assert_eq!(compiled.evaluate(&second).unwrap(), Value::Integer(4));
    assert_eq!(compiled.evaluate(&first).unwrap(), Value::Integer(2));
}
