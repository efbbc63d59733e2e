//! Parse error types.

use thiserror::Error;

/// An error that occurred while parsing a template or expression.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A syntax error with location information.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input at {line}:{column}")]
    UnexpectedEof { line: usize, column: usize },
}

/// Calculate the 1-based line and column of a byte offset in `source`.
pub(crate) fn position(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let consumed = &source[..offset];
    let line = consumed.chars().filter(|&c| c == '\n').count() + 1;
    let column = match consumed.rfind('\n') {
        Some(pos) => offset - pos,
        None => offset + 1,
    };
    (line, column)
}
