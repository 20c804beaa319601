//! Date arithmetic and extraction functions.

use chrono::{Datelike, Months, TimeDelta, Timelike};

use crate::evaluator::EvalError;
use crate::functions::{Arity, FunctionDef, FunctionRegistry, date_arg, double_arg, eval_arg, long_arg};
use crate::value::Value;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;
const MILLIS_PER_SECOND: f64 = 1_000.0;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    // Duration additions accept fractional amounts
    install_add(registry, "AddDays", MILLIS_PER_DAY);
    install_add(registry, "AddHours", MILLIS_PER_HOUR);
    install_add(registry, "AddMinutes", MILLIS_PER_MINUTE);
    install_add(registry, "AddSeconds", MILLIS_PER_SECOND);
    install_add(registry, "AddMilliseconds", 1.0);

    registry.install(FunctionDef::new(
        "AddMonths",
        Arity::Exact(2),
        |args, scope, context| {
            let date = eval_arg(args, 0, scope, context)?;
            let amount = eval_arg(args, 1, scope, context)?;
            add_months("AddMonths", &date, &amount, 1)
        },
    ));

    registry.install(FunctionDef::new(
        "AddYears",
        Arity::Exact(2),
        |args, scope, context| {
            let date = eval_arg(args, 0, scope, context)?;
            let amount = eval_arg(args, 1, scope, context)?;
            add_months("AddYears", &date, &amount, 12)
        },
    ));

    // Component extraction
    let day_of = install_component(registry, "DayOf", |d| d.day() as i32);
    registry.install(day_of.alias("DayOfMonth"));
    install_component(registry, "DayOfWeek", |d| {
        d.weekday().num_days_from_sunday() as i32
    });
    install_component(registry, "DayOfYear", |d| d.ordinal() as i32);
    install_component(registry, "HourOf", |d| d.hour() as i32);
    install_component(registry, "MinuteOf", |d| d.minute() as i32);
    install_component(registry, "SecondOf", |d| d.second() as i32);
    install_component(registry, "MillisecondOf", |d| {
        (d.and_utc().timestamp_subsec_millis()) as i32
    });
    install_component(registry, "MonthOf", |d| d.month() as i32);
    install_component(registry, "YearOf", |d| d.year());

    // Signed fractional differences
    install_between(registry, "DaysBetween", MILLIS_PER_DAY);
    install_between(registry, "HoursBetween", MILLIS_PER_HOUR);
    install_between(registry, "MinutesBetween", MILLIS_PER_MINUTE);
    install_between(registry, "SecondsBetween", MILLIS_PER_SECOND);
    install_between(registry, "MillisecondsBetween", 1.0);
}

fn install_add(registry: &mut FunctionRegistry, name: &'static str, unit_millis: f64) {
    registry.install(FunctionDef::new(name, Arity::Exact(2), move |args, scope, context| {
        let date = eval_arg(args, 0, scope, context)?;
        let amount = eval_arg(args, 1, scope, context)?;
        if date.is_null() || amount.is_null() {
            return Ok(Value::Null);
        }
        let Some(date) = date_arg(name, &date)? else {
            return Ok(Value::Null);
        };
        let amount = double_arg(name, &amount)?;
        let delta = TimeDelta::milliseconds((amount * unit_millis).round() as i64);
        Ok(Value::Date(date + delta))
    }));
}

fn add_months(
    name: &str,
    date: &Value,
    amount: &Value,
    per_unit: i64,
) -> Result<Value, EvalError> {
    if date.is_null() || amount.is_null() {
        return Ok(Value::Null);
    }
    let Some(date) = date_arg(name, date)? else {
        return Ok(Value::Null);
    };
    let months = long_arg(name, amount)? * per_unit;
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new((-months) as u32))
    };
    shifted
        .map(Value::Date)
        .ok_or_else(|| EvalError::InvalidArgument {
            function: name.to_string(),
            detail: format!("shifting by {} months is out of range", months),
        })
}

fn install_component(
    registry: &mut FunctionRegistry,
    name: &'static str,
    extract: fn(&chrono::NaiveDateTime) -> i32,
) -> FunctionDef {
    let def = FunctionDef::new(name, Arity::Exact(1), move |args, scope, context| {
        let value = eval_arg(args, 0, scope, context)?;
        match date_arg(name, &value)? {
            Some(date) => Ok(Value::Integer(extract(&date))),
            None => Ok(Value::Null),
        }
    });
    registry.install(def.clone());
    def
}

fn install_between(registry: &mut FunctionRegistry, name: &'static str, unit_millis: f64) {
    registry.install(FunctionDef::new(name, Arity::Exact(2), move |args, scope, context| {
        let start = eval_arg(args, 0, scope, context)?;
        let end = eval_arg(args, 1, scope, context)?;
        let (Some(start), Some(end)) = (date_arg(name, &start)?, date_arg(name, &end)?) else {
            return Ok(Value::Null);
        };
        let delta = end.signed_duration_since(start);
        Ok(Value::Double(delta.num_milliseconds() as f64 / unit_millis))
    }));
}
