//! Collection functions: gathering, filtering, ordering.

use crate::coerce;
use crate::evaluator;
use crate::functions::{
    Arity, FunctionDef, FunctionRegistry, eval_arg, flatten_args, items_of, string_arg,
    too_many_args,
};
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    // Gather all arguments into one flat collection
    registry.install(FunctionDef::new(
        "Collect",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            Ok(Value::Collection(values))
        },
    ));

    registry.install(FunctionDef::new(
        "SelectWhere",
        Arity::Exact(2),
        |args, scope, context| {
            let source = eval_arg(args, 0, scope, context)?;
            let items = items_of(source);
            let mut kept = Vec::new();
            for (index, item) in items.iter().enumerate() {
                let element_scope = scope.with_current(item, index);
                let verdict = evaluator::evaluate(&args[1], &element_scope, context)?;
                if verdict.is_truthy() {
                    kept.push(item.clone());
                }
            }
            Ok(Value::Collection(kept))
        },
    ));

    registry.install(FunctionDef::new(
        "FirstWhere",
        Arity::Exact(2),
        |args, scope, context| {
            let source = eval_arg(args, 0, scope, context)?;
            let items = items_of(source);
            for (index, item) in items.iter().enumerate() {
                let element_scope = scope.with_current(item, index);
                let verdict = evaluator::evaluate(&args[1], &element_scope, context)?;
                if verdict.is_truthy() {
                    return Ok(item.clone());
                }
            }
            Ok(Value::Null)
        },
    ));

    // Stable sort on a per-element key, ascending unless 'desc'
    registry.install(FunctionDef::new(
        "SortBy",
        Arity::AtLeast(2),
        |args, scope, context| {
            if args.len() > 3 {
                return Err(too_many_args("SortBy", 3, args.len()));
            }
            let source = eval_arg(args, 0, scope, context)?;
            let items = items_of(source);

            let descending = if args.len() == 3 {
                let direction = eval_arg(args, 2, scope, context)?;
                string_arg(&direction).is_some_and(|d| d.eq_ignore_ascii_case("desc"))
            } else {
                false
            };

            let mut keyed = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let element_scope = scope.with_current(item, index);
                let key = evaluator::evaluate(&args[1], &element_scope, context)?;
                keyed.push((item.clone(), key));
            }

            keyed.sort_by(|(_, a), (_, b)| {
                let order = coerce::compare(a, b, context);
                if descending { order.reverse() } else { order }
            });

            let sorted: Vec<Value> = keyed.into_iter().map(|(item, _)| item).collect();
            Ok(Value::Collection(sorted))
        },
    ));

    // Flatten the arguments and reverse the element order
    registry.install(FunctionDef::new(
        "Reverse",
        Arity::AtLeast(1),
        |args, scope, context| {
            let mut values = flatten_args(args, scope, context)?;
            values.reverse();
            Ok(Value::Collection(values))
        },
    ));
}
