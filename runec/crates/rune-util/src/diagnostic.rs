//! Positioned diagnostics.
//!
//! Rune has exactly one class of interpreter error: a fatal message pinned
//! to a source span. Nothing is recovered internally; the first error stops
//! the pipeline and propagates out as an `Err`. Host-function failures are
//! converted into the same shape at the call site by the evaluator.

use thiserror::Error;

use crate::Span;

/// A fatal error with a source position.
///
/// The `Display` impl shows only the message; the full banner with the
/// file, position, offending line, and caret underline is produced by
/// [`SourceMap::render`](crate::SourceMap::render), which has access to the
/// source text.
///
/// # Examples
///
/// ```
/// use rune_util::{Diagnostic, Span};
///
/// let diag = Diagnostic::new("Divide by zero", Span::new(2, 3, 1, 3));
/// assert_eq!(diag.to_string(), "Divide by zero");
/// ```
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct Diagnostic {
    /// Human-readable description of the failure.
    pub message: String,
    /// Where in the source it happened.
    pub span: Span,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Result type used by every phase of the interpreter.
pub type RuneResult<T> = std::result::Result<T, Diagnostic>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message_only() {
        let diag = Diagnostic::new("unexpected token ')'", Span::new(0, 1, 1, 1));
        assert_eq!(diag.to_string(), "unexpected token ')'");
    }

    #[test]
    fn test_carries_span() {
        let span = Span::new(3, 7, 2, 1);
        let diag = Diagnostic::new("x", span);
        assert_eq!(diag.span, span);
    }
}
