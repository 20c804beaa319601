//! Statistical functions: `Average`/`Mean`, `Median`, `Mode`.

use crate::functions::{Arity, FunctionDef, FunctionRegistry, double_arg, flatten_args};
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    let average = FunctionDef::new("Average", Arity::AtLeast(1), |args, scope, context| {
        let values = flatten_args(args, scope, context)?;
        if values.is_empty() {
            return Ok(Value::Null);
        }
        let mut sum = 0.0;
        for value in &values {
            if value.is_null() {
                continue; // the additive identity, still counted
            }
            sum += double_arg("Average", value)?;
        }
        Ok(Value::Double(sum / values.len() as f64))
    });
    registry.install(average.alias("Mean"));
    registry.install(average);

    registry.install(FunctionDef::new(
        "Median",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            let mut numbers = Vec::with_capacity(values.len());
            for value in &values {
                if value.is_null() {
                    continue;
                }
                numbers.push(double_arg("Median", value)?);
            }
            if numbers.is_empty() {
                return Ok(Value::Null);
            }
            numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = numbers.len() / 2;
            let median = if numbers.len() % 2 == 1 {
                numbers[mid]
            } else {
                (numbers[mid - 1] + numbers[mid]) / 2.0
            };
            Ok(Value::Double(median))
        },
    ));

    // Most frequent value; ties go to the first one seen
    registry.install(FunctionDef::new(
        "Mode",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            let mut counted: Vec<(f64, usize)> = Vec::new();
            for value in &values {
                if value.is_null() {
                    continue;
                }
                let number = double_arg("Mode", value)?;
                match counted.iter_mut().find(|(seen, _)| *seen == number) {
                    Some((_, count)) => *count += 1,
                    None => counted.push((number, 1)),
                }
            }
            let mut best: Option<(f64, usize)> = None;
            for (number, count) in counted {
                if best.is_none_or(|(_, best_count)| count > best_count) {
                    best = Some((number, count));
                }
            }
            Ok(best.map(|(number, _)| Value::Double(number)).unwrap_or(Value::Null))
        },
    ));
}
