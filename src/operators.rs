use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{BinaryOp, Expression};
use crate::context::RegistrationError;

/// Operator precedence levels, loosest to tightest.
///
/// The parser reduces an operator only when its precedence is strictly
/// greater than the minimum in force, which yields left-associative
/// grouping at equal levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Minimum,
    NullCoalescing,
    Or,
    And,
    Equality,
    Relational,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Shift,
    Additive,
    Multiplicative,
    Unary,
    Grouping,
}

impl BinaryOp {
    /// The precedence level this operator reduces at when used with a left
    /// operand present
    pub fn precedence(&self) -> Precedence {
        match self {
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulus => Precedence::Multiplicative,
            BinaryOp::Add | BinaryOp::Subtract => Precedence::Additive,
            BinaryOp::LeftShift | BinaryOp::RightShift => Precedence::Shift,
            BinaryOp::BitwiseAnd => Precedence::BitwiseAnd,
            BinaryOp::BitwiseXor => Precedence::BitwiseXor,
            BinaryOp::BitwiseOr => Precedence::BitwiseOr,
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => Precedence::Relational,
            BinaryOp::Equal | BinaryOp::NotEqual => Precedence::Equality,
            BinaryOp::And => Precedence::And,
            BinaryOp::Or => Precedence::Or,
            BinaryOp::NullCoalesce => Precedence::NullCoalescing,
        }
    }
}

/// Builder for custom operator entries: combines the already-parsed left
/// and right operands into a tree node composed of existing node kinds.
pub type CustomBuilder =
    Arc<dyn Fn(Option<Expression>, Option<Expression>) -> Expression + Send + Sync>;

/// The behavior a registered operator tag maps to.
#[derive(Clone)]
pub enum OperatorKind {
    /// Plain binary operator
    Binary(BinaryOp),

    /// `+` / `-`: binary when a left operand is present, otherwise a prefix
    /// operator desugared to `0 <op> x`
    Additive(BinaryOp),

    /// Prefix logical negation (`!`, `not`)
    Not,

    /// Grouping open `(` - captive tokens to the matching `)`
    ParenOpen,
    /// Grouping close `)`
    ParenClose,
    /// Index / collection-literal open `[` - captive tokens to the matching `]`
    IndexOpen,
    /// Index close `]`
    IndexClose,
    /// Property access `.`
    Property,

    /// Host-registered operator with an explicit precedence and builder
    Custom {
        precedence: Precedence,
        build: CustomBuilder,
    },
}

/// A stateless operator descriptor: the tags it matches, its precedence
/// (parameterized by whether a left operand is present, to disambiguate
/// unary and binary use), and how it builds a tree node.
#[derive(Clone)]
pub struct OperatorDef {
    tags: Vec<String>,
    kind: OperatorKind,
}

impl OperatorDef {
    pub fn new(tags: &[&str], kind: OperatorKind) -> Self {
        OperatorDef {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            kind,
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Precedence of this operator given whether an operand has already
    /// been parsed to its left
    pub fn precedence(&self, has_left_operand: bool) -> Precedence {
        match &self.kind {
            OperatorKind::Binary(op) => op.precedence(),
            OperatorKind::Additive(op) => {
                if has_left_operand {
                    op.precedence()
                } else {
                    Precedence::Unary
                }
            }
            OperatorKind::Not => Precedence::Unary,
            OperatorKind::ParenOpen | OperatorKind::IndexOpen | OperatorKind::Property => {
                Precedence::Grouping
            }
            // Closing tags never reduce; they terminate the enclosing span
            OperatorKind::ParenClose | OperatorKind::IndexClose => Precedence::Minimum,
            OperatorKind::Custom { precedence, .. } => *precedence,
        }
    }

}

/// The name-indexed table of operators available to the parser.
///
/// Built once with the exhaustive default set; the host may extend it
/// before compiling expressions that need the new entries. Lookup is total
/// over parser input: every token the tokenizer classifies as an operator
/// must resolve here or the parse fails.
#[derive(Clone)]
pub struct OperatorRegistry {
    map: HashMap<String, OperatorDef>,
    ignore_case: bool,
    longest_symbol: usize,
}

impl OperatorRegistry {
    pub fn empty(ignore_case: bool) -> Self {
        OperatorRegistry {
            map: HashMap::new(),
            ignore_case,
            longest_symbol: 0,
        }
    }

    /// The default operator set: additive, multiplicative, bitwise, shift,
    /// relational, equality, logical, null-coalescing, and the three
    /// grouping/property operators.
    pub fn standard(ignore_case: bool) -> Self {
        let mut registry = Self::empty(ignore_case);

        let defaults = [
            // Additive (binary or prefix)
            OperatorDef::new(&["+"], OperatorKind::Additive(BinaryOp::Add)),
            OperatorDef::new(&["-"], OperatorKind::Additive(BinaryOp::Subtract)),
            // Multiplicative
            OperatorDef::new(&["*"], OperatorKind::Binary(BinaryOp::Multiply)),
            OperatorDef::new(&["/"], OperatorKind::Binary(BinaryOp::Divide)),
            OperatorDef::new(&["%"], OperatorKind::Binary(BinaryOp::Modulus)),
            // Bitwise
            OperatorDef::new(&["&"], OperatorKind::Binary(BinaryOp::BitwiseAnd)),
            OperatorDef::new(&["|"], OperatorKind::Binary(BinaryOp::BitwiseOr)),
            OperatorDef::new(&["^"], OperatorKind::Binary(BinaryOp::BitwiseXor)),
            OperatorDef::new(&["<<"], OperatorKind::Binary(BinaryOp::LeftShift)),
            OperatorDef::new(&[">>"], OperatorKind::Binary(BinaryOp::RightShift)),
            // Relational
            OperatorDef::new(&["<"], OperatorKind::Binary(BinaryOp::LessThan)),
            OperatorDef::new(&["<="], OperatorKind::Binary(BinaryOp::LessThanOrEqual)),
            OperatorDef::new(&[">"], OperatorKind::Binary(BinaryOp::GreaterThan)),
            OperatorDef::new(&[">="], OperatorKind::Binary(BinaryOp::GreaterThanOrEqual)),
            // Equality
            OperatorDef::new(&["==", "="], OperatorKind::Binary(BinaryOp::Equal)),
            OperatorDef::new(&["!=", "<>"], OperatorKind::Binary(BinaryOp::NotEqual)),
            // Logical
            OperatorDef::new(&["&&", "and"], OperatorKind::Binary(BinaryOp::And)),
            OperatorDef::new(&["||", "or"], OperatorKind::Binary(BinaryOp::Or)),
            OperatorDef::new(&["!", "not"], OperatorKind::Not),
            // Conditional
            OperatorDef::new(&["??"], OperatorKind::Binary(BinaryOp::NullCoalesce)),
            // Grouping and property access
            OperatorDef::new(&["("], OperatorKind::ParenOpen),
            OperatorDef::new(&[")"], OperatorKind::ParenClose),
            OperatorDef::new(&["["], OperatorKind::IndexOpen),
            OperatorDef::new(&["]"], OperatorKind::IndexClose),
            OperatorDef::new(&["."], OperatorKind::Property),
        ];

        for def in defaults {
            // A fresh registry cannot hold duplicates
            registry
                .register(def, false)
                .expect("default operator set contains a duplicate tag");
        }

        registry
    }

    fn key(&self, tag: &str) -> String {
        if self.ignore_case {
            tag.to_lowercase()
        } else {
            tag.to_string()
        }
    }

    /// Register an operator under every tag it declares.
    ///
    /// Re-registering an existing tag without `force` fails; with `force`
    /// it silently replaces the previous entry.
    pub fn register(&mut self, def: OperatorDef, force: bool) -> Result<(), RegistrationError> {
        for tag in def.tags() {
            let key = self.key(tag);
            if !force && self.map.contains_key(&key) {
                return Err(RegistrationError::OperatorAlreadyRegistered(tag.clone()));
            }
        }
        for tag in def.tags() {
            if !tag.chars().next().is_some_and(|c| c.is_alphabetic()) {
                self.longest_symbol = self.longest_symbol.max(tag.chars().count());
            }
            let key = self.key(tag);
            self.map.insert(key, def.clone());
        }
        Ok(())
    }

    /// Remove a single tag from the registry
    pub fn unregister(&mut self, tag: &str) {
        let key = self.key(tag);
        self.map.remove(&key);
    }

    pub fn get(&self, tag: &str) -> Option<&OperatorDef> {
        self.map.get(&self.key(tag))
    }

    /// Length of the longest registered symbolic tag matching the start of
    /// `chars`, so multi-character operators take priority over their
    /// one-character prefixes.
    pub fn match_symbol(&self, chars: &[char]) -> Option<usize> {
        let max = self.longest_symbol.min(chars.len());
        for len in (1..=max).rev() {
            let candidate: String = chars[..len].iter().collect();
            if candidate.chars().next().is_some_and(|c| c.is_alphabetic()) {
                continue;
            }
            if self.map.contains_key(&self.key(&candidate)) {
                return Some(len);
            }
        }
        None
    }

    /// Whether an identifier spells a word operator (`and`, `or`, `not`)
    pub fn is_word_operator(&self, ident: &str) -> bool {
        ident.chars().next().is_some_and(|c| c.is_alphabetic()) && self.get(ident).is_some()
    }
}
