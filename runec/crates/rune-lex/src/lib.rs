//! rune-lex - Lexical analysis for Rune source text.
//!
//! The lexer is split in two layers, mirroring the rest of the pipeline:
//!
//! - [`Cursor`] wraps a source string and delivers bytes with accurate
//!   line/column tracking. Rune positions are byte-oriented: columns count
//!   bytes, not characters, and a tab is one column.
//! - [`TokenStream`] consumes the cursor and produces a lazy,
//!   non-restartable sequence of [`Token`]s with one-token lookahead.
//!
//! Tokenization is fail-fast: an invalid byte produces a positioned
//! diagnostic. Everything else, including unterminated string literals and
//! malformed numbers such as `1.2.3`, is deferred to later phases.

pub mod cursor;
pub mod stream;
pub mod token;

pub use cursor::Cursor;
pub use stream::TokenStream;
pub use token::{is_keyword, Token, TokenKind};
