/// A classified, positioned substring of the source expression.
///
/// Tokens are immutable and consumed in order by the parser; captive-token
/// extraction copies spans out of the queue rather than re-reading it.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The raw text of the token. String and date tokens carry their
    /// unescaped content without the surrounding delimiters.
    pub text: String,

    /// Coarse classification used by the parser to pick a handling branch
    pub kind: TokenKind,

    /// Byte offset of the token start in the source text
    pub start: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind, start: usize) -> Self {
        Token {
            text: text.into(),
            kind,
            start,
        }
    }

    /// Exact tag comparison against operator/separator text
    pub fn is(&self, tag: &str) -> bool {
        self.text == tag
    }
}

/// Coarse token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Numeric literal: integer, decimal, exponent, `0x…` or `0b…` form
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// 1e5
    /// 0xFF
    /// ```
    Number,

    /// Quoted string literal (content is already unescaped)
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// "item \"one\""
    /// ```
    String,

    /// Date literal between `#` delimiters (content excludes the delimiters)
    ///
    /// # Examples
    /// ```text
    /// #2024-01-15#
    /// #today#
    /// ```
    Date,

    /// Function or variable name, plus the `true`/`false`/`null` keywords
    ///
    /// Must start with a letter or underscore, followed by letters, digits,
    /// or underscores.
    Identifier,

    /// Operator tag resolved against the operator registry
    ///
    /// Covers symbolic tags (`+`, `>=`, `??`, …), word operators (`and`,
    /// `or`, `not`), and the grouping/property tags (`(`, `)`, `[`, `]`, `.`).
    Operator,

    /// The argument separator `,`
    Separator,
}
