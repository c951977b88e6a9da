//! Token definitions.

use rune_util::Span;

/// The reserved words of the language. Any identifier matching one of
/// these lexes as a [`TokenKind::Keyword`] token instead of a `Var`.
pub const KEYWORDS: &[&str] = &[
    "if", "then", "elif", "else", "while", "break", "continue", "fun", "return", "true", "false",
    "array", "table", "import", "not",
];

/// Returns true if `ident` is a reserved word.
pub fn is_keyword(ident: &str) -> bool {
    KEYWORDS.contains(&ident)
}

/// Lexical category of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Numeric literal text, integer or float decided at evaluation.
    Num,
    /// String literal; the token text is the decoded content.
    Str,
    /// Identifier.
    Var,
    /// Reserved word.
    Keyword,
    /// Single-byte punctuation, one of `. , : ( ) { } [ ]`.
    Punc,
    /// Operator, a maximal run of `+ - * / % = & | < > !`.
    Op,
}

/// A single token with its decoded text and source span.
///
/// For most tokens the text equals the lexeme. String literals are the
/// exception: the span covers the full lexeme including the quotes and any
/// backslashes, while the text holds the decoded content.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// Lexical category.
    pub kind: TokenKind,
    /// Decoded token text.
    pub text: String,
    /// Position of the lexeme in the source.
    pub span: Span,
}

impl Token {
    /// True if this token is the given keyword.
    #[inline]
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == kw
    }

    /// True if this token is the given punctuation.
    #[inline]
    pub fn is_punc(&self, punc: &str) -> bool {
        self.kind == TokenKind::Punc && self.text == punc
    }

    /// True if this token is the given operator.
    #[inline]
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert!(is_keyword("while"));
        assert!(is_keyword("not"));
        assert!(is_keyword("then"));
        assert!(!is_keyword("print"));
        assert!(!is_keyword("whileloop"));
    }

    #[test]
    fn test_token_predicates() {
        let tok = Token {
            kind: TokenKind::Keyword,
            text: "if".to_string(),
            span: Span::DUMMY,
        };
        assert!(tok.is_keyword("if"));
        assert!(!tok.is_keyword("else"));
        assert!(!tok.is_punc("if"));
    }
}
