use thiserror::Error;

/// A failed strict parse, positioned at the first unrecoverable node.
///
/// `line` and `column` are 1-indexed. Parse failures are recoverable by
/// design: the repair pipeline routes them into line-level syntax recovery
/// rather than surfacing them to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    /// Create a parse error at an explicit position.
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error pinned to the start of the input, for failures
    /// that have no meaningful position (unsupported language family,
    /// grammar load failure, parser timeout).
    pub fn at_start(message: impl Into<String>) -> Self {
        Self::new(1, 1, message)
    }
}
