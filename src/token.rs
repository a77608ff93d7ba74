use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Command name such as `mix` or `resample`.
    Word(String),
    /// `$N` slot reference.
    Slot(usize),
    Number(u64),
    Percent,

    // Structural
    Newline,
    Comment(String),
    EOF,
}

/// Source range of a token. `line` and `column` are 1-based and describe
/// `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}
