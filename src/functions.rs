//! The function registry and the built-in function library.
//!
//! Functions receive their argument expressions *unevaluated*, together
//! with the active scope and context, so they can short-circuit (`If`,
//! `IfError`, `In`) or bind the current element while iterating a
//! collection (`SumOf`, `SelectWhere`). Callees are resolved by name at
//! evaluation time, so registrations made after parsing still take effect.

pub mod collection;
pub mod conversion;
pub mod date;
pub mod logical;
pub mod math;
pub mod relational;
pub mod statistical;
pub mod strings;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::ast::Expression;
use crate::coerce;
use crate::context::{Context, RegistrationError};
use crate::evaluator::{self, EvalError, Scope};
use crate::value::Value;

/// Declared argument count of a function: an exact count (including
/// exactly zero) or a minimum with an unbounded upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

/// The callable body of a registered function.
pub type FunctionBody =
    Arc<dyn Fn(&[Expression], &Scope, &Context) -> Result<Value, EvalError> + Send + Sync>;

/// A stateless-by-contract function descriptor: a name, a declared arity,
/// and the evaluation body.
#[derive(Clone)]
pub struct FunctionDef {
    name: String,
    arity: Arity,
    body: FunctionBody,
}

impl FunctionDef {
    pub fn new<F>(name: &str, arity: Arity, body: F) -> Self
    where
        F: Fn(&[Expression], &Scope, &Context) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        FunctionDef {
            name: name.to_string(),
            arity,
            body: Arc::new(body),
        }
    }

    /// A second name for the same body (`Bool`/`Boolean`, `Average`/`Mean`)
    pub fn alias(&self, name: &str) -> Self {
        FunctionDef {
            name: name.to_string(),
            arity: self.arity,
            body: Arc::clone(&self.body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub(crate) fn invoke(
        &self,
        args: &[Expression],
        scope: &Scope,
        context: &Context,
    ) -> Result<Value, EvalError> {
        self.body.as_ref()(args, scope, context)
    }
}

/// The name-indexed table of functions available during evaluation.
///
/// The case rule is fixed at construction: ordinal, or ordinal-ignore-case
/// (the default), matching the context's parsing options.
#[derive(Clone)]
pub struct FunctionRegistry {
    map: HashMap<String, FunctionDef>,
    ignore_case: bool,
}

impl FunctionRegistry {
    pub fn empty(ignore_case: bool) -> Self {
        FunctionRegistry {
            map: HashMap::new(),
            ignore_case,
        }
    }

    /// The standard library: conversion, date, math, logical, relational,
    /// statistical, string, and collection functions.
    pub fn standard(ignore_case: bool) -> Self {
        let mut registry = Self::empty(ignore_case);
        conversion::register(&mut registry);
        date::register(&mut registry);
        math::register(&mut registry);
        logical::register(&mut registry);
        relational::register(&mut registry);
        statistical::register(&mut registry);
        strings::register(&mut registry);
        collection::register(&mut registry);
        registry
    }

    fn key(&self, name: &str) -> String {
        if self.ignore_case {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Register a function. Re-registering an existing name without
    /// `force` fails; with `force` it silently replaces.
    pub fn register(&mut self, def: FunctionDef, force: bool) -> Result<(), RegistrationError> {
        let key = self.key(def.name());
        if !force && self.map.contains_key(&key) {
            return Err(RegistrationError::FunctionAlreadyRegistered(
                def.name().to_string(),
            ));
        }
        self.map.insert(key, def);
        Ok(())
    }

    /// Remove a function from the registry
    pub fn unregister(&mut self, name: &str) {
        let key = self.key(name);
        self.map.remove(&key);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.map.get(&self.key(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.values().map(|def| def.name())
    }

    /// Install a built-in; the standard set never collides with itself
    pub(crate) fn install(&mut self, def: FunctionDef) {
        self.register(def, false)
            .expect("built-in function set contains a duplicate name");
    }
}

// Shared argument helpers for the built-in groups.

/// Evaluate one argument and unwrap structured nodes to primitives
pub(crate) fn eval_arg(
    args: &[Expression],
    index: usize,
    scope: &Scope,
    context: &Context,
) -> Result<Value, EvalError> {
    Ok(coerce::extract_primitive(evaluator::evaluate(
        &args[index],
        scope,
        context,
    )?))
}

/// Evaluate every argument, flattening collection values one level so a
/// function can be called either with a collection or with loose values
pub(crate) fn flatten_args(
    args: &[Expression],
    scope: &Scope,
    context: &Context,
) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        let value = evaluator::evaluate(arg, scope, context)?;
        flatten_into(value, &mut out);
    }
    Ok(out)
}

pub(crate) fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match coerce::extract_primitive(value) {
        Value::Collection(items) => {
            for item in items {
                out.push(coerce::extract_primitive(item));
            }
        }
        other => out.push(other),
    }
}

/// Materialize a value as an element list: collections enumerate, null is
/// empty, anything else is a single element
pub(crate) fn items_of(value: Value) -> Vec<Value> {
    match coerce::extract_primitive(value) {
        Value::Null => Vec::new(),
        Value::Collection(items) => items,
        other => vec![other],
    }
}

/// Require a numeric argument as f64
pub(crate) fn double_arg(function: &str, value: &Value) -> Result<f64, EvalError> {
    coerce::to_double(value).ok_or_else(|| EvalError::InvalidArgument {
        function: function.to_string(),
        detail: format!("expected a number, got {}", value.type_label()),
    })
}

/// Require an integral argument
pub(crate) fn long_arg(function: &str, value: &Value) -> Result<i64, EvalError> {
    coerce::to_long(value).ok_or_else(|| EvalError::InvalidArgument {
        function: function.to_string(),
        detail: format!("expected an integer, got {}", value.type_label()),
    })
}

/// Convert an argument to text; null stays null
pub(crate) fn string_arg(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.display_string())
    }
}

/// Require a date argument, accepting parseable strings; null stays null
pub(crate) fn date_arg(function: &str, value: &Value) -> Result<Option<NaiveDateTime>, EvalError> {
    if value.is_null() {
        return Ok(None);
    }
    coerce::to_date(value)
        .map(Some)
        .ok_or_else(|| EvalError::InvalidArgument {
            function: function.to_string(),
            detail: format!("expected a date, got {}", value.type_label()),
        })
}

/// Arity failure for functions that take an upper bound the [`Arity`]
/// declaration cannot express (`Date`, `Round`, `PadLeft`, …)
pub(crate) fn too_many_args(function: &str, max: usize, supplied: usize) -> EvalError {
    EvalError::ArityMismatch {
        function: function.to_string(),
        expected: format!("at most {}", max),
        supplied,
    }
}
