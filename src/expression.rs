use crate::ast::Expression;
use crate::context::Context;
use crate::evaluator::{self, EvalError, Scope, Variables};
use crate::parser::{ParseError, Parser};
use crate::value::Value;

/// A compiled, reusable expression.
///
/// Compilation happens once; the resulting tree is immutable and may be
/// evaluated any number of times against different variable mappings,
/// including concurrently, provided the registries it was compiled against
/// are not mutated underneath it.
///
/// # Examples
///
/// ```
/// use vellum_expr::{CompiledExpression, Value, Variables};
///
/// let expr = CompiledExpression::compile("price * quantity").unwrap();
///
/// let mut vars = Variables::new();
/// vars.insert("price".to_string(), Value::Integer(25));
/// vars.insert("quantity".to_string(), Value::Integer(4));
///
/// assert_eq!(expr.evaluate(&vars).unwrap(), Value::Integer(100));
/// ```
pub struct CompiledExpression {
    source: String,
    root: Expression,
    referenced: Vec<String>,
    context: Context,
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .field("root", &self.root)
            .field("referenced", &self.referenced)
            .finish_non_exhaustive()
    }
}

impl CompiledExpression {
    /// Compile with the default context (standard registries,
    /// case-insensitive parsing)
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        Self::with_context(source, Context::default())
    }

    /// Compile against a host-configured context
    pub fn with_context(source: &str, context: Context) -> Result<Self, ParseError> {
        let parser = Parser::new(&context);
        let (root, referenced) = parser.compile(source)?;
        Ok(CompiledExpression {
            source: source.to_string(),
            root,
            referenced,
            context,
        })
    }

    /// Evaluate against a variable mapping
    pub fn evaluate(&self, variables: &Variables) -> Result<Value, EvalError> {
        let scope = Scope::new(variables);
        evaluator::evaluate(&self.root, &scope, &self.context)
    }

    /// The names of the variables this expression references
    pub fn referenced_variables(&self) -> &[String] {
        &self.referenced
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expression {
        &self.root
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable access to the context, for registrations made after
    /// compilation (call nodes resolve their callee at evaluation time)
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

/// Compile an expression with the default context.
///
/// Shorthand for [`CompiledExpression::compile`].
pub fn compile(source: &str) -> Result<CompiledExpression, ParseError> {
    CompiledExpression::compile(source)
}
