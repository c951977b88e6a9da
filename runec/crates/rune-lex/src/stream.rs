//! The token stream.
//!
//! A lazy, non-restartable sequence of tokens over a [`Cursor`], with
//! one-token lookahead. Scanning dispatches on the first byte of each
//! token, in priority order: comments, strings, numbers, identifiers,
//! punctuation, operators. Any other byte is a positioned diagnostic.

use rune_util::{Diagnostic, FileId, RuneResult, Span};

use crate::cursor::Cursor;
use crate::token::{is_keyword, Token, TokenKind};

/// Bytes treated as whitespace between tokens.
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\r' | b'\t' | b'\n')
}

/// An identifier may start with a Unicode letter or `_`. The decision is
/// made per byte, so letters outside ASCII are recognised by their lead
/// byte's Latin-1 reading.
fn is_ident_start(b: u8) -> bool {
    (b as char).is_alphabetic() || b == b'_'
}

/// Identifier continuation bytes. Besides letters, digits, and `_`, Rune
/// allows `? ! - < > =` inside names, so `empty?` and `set-x` are single
/// identifiers. The flip side is that binary operators need surrounding
/// whitespace: `a-b` is one name, `a - b` is a subtraction.
fn is_ident(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || matches!(b, b'?' | b'!' | b'-' | b'<' | b'>' | b'=')
}

fn is_op_char(b: u8) -> bool {
    matches!(b, b'+' | b'-' | b'*' | b'/' | b'%' | b'=' | b'&' | b'|' | b'<' | b'>' | b'!')
}

fn is_punc(b: u8) -> bool {
    matches!(b, b'.' | b',' | b':' | b'(' | b')' | b'{' | b'}' | b'[' | b']')
}

/// Lazy tokenizer with one-token lookahead.
///
/// `peek` caches the next token; `next` returns and clears the cache. The
/// stream cannot be rewound.
///
/// # Example
///
/// ```
/// use rune_lex::{TokenKind, TokenStream};
/// use rune_util::FileId;
///
/// let mut tokens = TokenStream::new("x = 1", FileId(0));
/// let tok = tokens.next().unwrap().unwrap();
/// assert_eq!(tok.kind, TokenKind::Var);
/// assert_eq!(tok.text, "x");
/// ```
pub struct TokenStream<'a> {
    cursor: Cursor<'a>,
    file_id: FileId,
    peeked: Option<Token>,
}

impl<'a> TokenStream<'a> {
    /// Creates a token stream over the given source text.
    pub fn new(source: &'a str, file_id: FileId) -> Self {
        Self {
            cursor: Cursor::new(source),
            file_id,
            peeked: None,
        }
    }

    /// The file this stream reads from.
    #[inline]
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// An empty span at the current scan position, used for end-of-input
    /// diagnostics.
    pub fn here(&self) -> Span {
        Span::with_file(
            self.cursor.position(),
            self.cursor.position(),
            self.file_id,
            self.cursor.line(),
            self.cursor.column(),
        )
    }

    /// Returns the next token without consuming it, or `None` at the end
    /// of input.
    pub fn peek(&mut self) -> RuneResult<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.read_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Consumes and returns the next token, or `None` at the end of input.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> RuneResult<Option<Token>> {
        match self.peeked.take() {
            Some(tok) => Ok(Some(tok)),
            None => self.read_token(),
        }
    }

    /// True once every token has been consumed.
    pub fn eof(&mut self) -> RuneResult<bool> {
        Ok(self.peek()?.is_none())
    }

    fn read_token(&mut self) -> RuneResult<Option<Token>> {
        loop {
            while self.cursor.peek().is_some_and(is_whitespace) {
                self.cursor.bump();
            }
            let Some(b) = self.cursor.peek() else {
                return Ok(None);
            };
            if b == b'#' {
                self.skip_comment();
                continue;
            }

            let start = self.cursor.position();
            let line = self.cursor.line();
            let column = self.cursor.column();

            let (kind, text) = if b == b'"' {
                (TokenKind::Str, self.read_string())
            } else if b.is_ascii_digit() {
                (TokenKind::Num, self.read_while(|b| b.is_ascii_digit() || b == b'.'))
            } else if is_ident_start(b) {
                let ident = self.read_while(is_ident);
                let kind = if is_keyword(&ident) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Var
                };
                (kind, ident)
            } else if is_punc(b) {
                self.cursor.bump();
                (TokenKind::Punc, (b as char).to_string())
            } else if is_op_char(b) {
                (TokenKind::Op, self.read_while(is_op_char))
            } else {
                return Err(Diagnostic::new(
                    format!("invalid character: {}", b as char),
                    Span::with_file(start, start + 1, self.file_id, line, column),
                ));
            };

            let span = Span::with_file(start, self.cursor.position(), self.file_id, line, column);
            return Ok(Some(Token { kind, text, span }));
        }
    }

    /// Consumes bytes while `pred` holds and returns them as a string.
    /// Only called in positions where the consumed run is valid UTF-8.
    fn read_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.cursor.position();
        while self.cursor.peek().is_some_and(&pred) {
            self.cursor.bump();
        }
        self.cursor.slice_from(start).to_string()
    }

    /// Consumes a `#` comment up to and including the line feed.
    fn skip_comment(&mut self) {
        while self.cursor.peek().is_some_and(|b| b != b'\n') {
            self.cursor.bump();
        }
        self.cursor.bump();
    }

    /// Reads a string literal. A backslash drops itself and takes the
    /// following byte verbatim; there are no named escape sequences. An
    /// unterminated literal simply runs to the end of input.
    fn read_string(&mut self) -> String {
        let mut bytes = Vec::new();
        let mut escaped = false;
        self.cursor.bump(); // opening quote
        while let Some(b) = self.cursor.bump() {
            if escaped {
                bytes.push(b);
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                break;
            } else {
                bytes.push(b);
            }
        }
        // Escapes only ever drop ASCII bytes out of valid UTF-8 input, so
        // this conversion is lossless.
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
