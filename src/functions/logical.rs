//! Logical functions: `If`, `IfError`, `In`, `Index`, and the recursive
//! `Eval`.

use std::sync::Mutex;

use crate::ast::Expression;
use crate::coerce;
use crate::evaluator::{self, EvalError};
use crate::functions::{Arity, FunctionDef, FunctionRegistry, eval_arg};
use crate::parser::Parser;
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    // Only the selected branch is evaluated
    registry.install(FunctionDef::new(
        "If",
        Arity::Exact(3),
        |args, scope, context| {
            let condition = eval_arg(args, 0, scope, context)?;
            if condition.is_truthy() {
                evaluator::evaluate(&args[1], scope, context)
            } else {
                evaluator::evaluate(&args[2], scope, context)
            }
        },
    ));

    // The default is evaluated only when the first argument fails
    registry.install(FunctionDef::new(
        "IfError",
        Arity::Exact(2),
        |args, scope, context| match evaluator::evaluate(&args[0], scope, context) {
            Ok(value) => Ok(value),
            Err(_) => evaluator::evaluate(&args[1], scope, context),
        },
    ));

    // Membership test; arguments are evaluated one at a time and the scan
    // stops at the first match
    registry.install(FunctionDef::new(
        "In",
        Arity::AtLeast(2),
        |args, scope, context| {
            let needle = eval_arg(args, 0, scope, context)?;
            for arg in &args[1..] {
                let candidate = evaluator::evaluate(arg, scope, context)?;
                let matched = match candidate {
                    Value::Collection(items) => items.iter().any(|item| {
                        coerce::compare(&needle, item, context) == std::cmp::Ordering::Equal
                    }),
                    Value::Node(serde_json::Value::Array(items)) => items.iter().any(|item| {
                        coerce::compare(&needle, &Value::Node(item.clone()), context)
                            == std::cmp::Ordering::Equal
                    }),
                    other => {
                        coerce::compare(&needle, &other, context) == std::cmp::Ordering::Equal
                    }
                };
                if matched {
                    return Ok(Value::Boolean(true));
                }
            }
            Ok(Value::Boolean(false))
        },
    ));

    // The position of the current data item: the element index inside a
    // per-element function, otherwise the host-supplied context index
    registry.install(FunctionDef::new(
        "Index",
        Arity::Exact(0),
        |_, scope, context| {
            if let Some(index) = scope.current_index() {
                return Ok(Value::Integer(index as i32));
            }
            let index = context.current_index();
            if index >= 0 {
                Ok(Value::Integer(index as i32))
            } else {
                Ok(Value::Null)
            }
        },
    ));

    registry.install(eval_function());
}

/// `Eval(text)` compiles and evaluates a string-valued sub-expression
/// against the same scope.
///
/// The last compiled source is memoized in a single slot on this function
/// instance. The slot is lock-protected, but distinct expression strings
/// evaluated concurrently through the same instance will thrash it;
/// callers needing that pattern should register separate instances.
fn eval_function() -> FunctionDef {
    let memo: Mutex<Option<(String, Expression)>> = Mutex::new(None);

    FunctionDef::new("Eval", Arity::Exact(1), move |args, scope, context| {
        let source = eval_arg(args, 0, scope, context)?;
        if source.is_null() {
            return Ok(Value::Null);
        }
        let source = source.display_string();

        let mut slot = memo.lock().expect("Eval memo slot poisoned");
        let compiled = match slot.as_ref() {
            Some((cached_source, tree)) if *cached_source == source => tree.clone(),
            _ => {
                let (tree, _) = Parser::new(context).compile(&source).map_err(|err| {
                    EvalError::InvalidArgument {
                        function: "Eval".to_string(),
                        detail: err.to_string(),
                    }
                })?;
                *slot = Some((source, tree.clone()));
                tree
            }
        };
        drop(slot);

        evaluator::evaluate(&compiled, scope, context)
    })
}
