//! rune-par - Parser for Rune source text.
//!
//! The parser consumes a [`TokenStream`] and produces a single root
//! [`Expr`] of kind `Block` holding the program's statements. Binary
//! operators are parsed by Pratt-style precedence climbing; everything
//! else is plain recursive descent.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `=` | Right |
//! | 2 | `\|\|` | Left |
//! | 3 | `&&` | Left |
//! | 4 | `<` `>` `<=` `>=` `==` `!=` | Left |
//! | 5 | `+` `-` | Left |
//! | 6 | `*` `/` `%` | Left |
//!
//! Unary `not` binds tighter than any binary operator; the postfix forms
//! `(args)`, `[index]`, and `.name` bind tighter still and may chain off
//! any primary.
//!
//! There is no statement separator. The tokenizer has no `;` and newlines
//! are whitespace, so a program is simply expressions juxtaposed until end
//! of input; each expression consumes exactly as much as precedence allows.

pub mod ast;

pub use ast::{BinOp, Expr, ExprKind, UnOp};

use std::rc::Rc;

use rune_lex::{Token, TokenKind, TokenStream};
use rune_util::{Diagnostic, RuneResult, Span};

/// Binding powers for the Pratt loop. Each infix operator has a
/// (left, right) pair; left < right is left-associative, left > right is
/// right-associative. Higher numbers bind tighter.
fn infix_binding_power(op: &str) -> Option<(u8, u8)> {
    Some(match op {
        "=" => (2, 1),
        "||" => (3, 4),
        "&&" => (5, 6),
        "<" | ">" | "<=" | ">=" | "==" | "!=" => (7, 8),
        "+" | "-" => (9, 10),
        "*" | "/" | "%" => (11, 12),
        _ => return None,
    })
}

/// Recursive descent parser over a lazy token stream.
///
/// # Example
///
/// ```
/// use rune_lex::TokenStream;
/// use rune_par::{ExprKind, Parser};
/// use rune_util::FileId;
///
/// let tokens = TokenStream::new("x = 1 + 2", FileId(0));
/// let program = Parser::new(tokens).parse_program().unwrap();
/// assert!(matches!(program.kind, ExprKind::Block(ref stmts) if stmts.len() == 1));
/// ```
pub struct Parser<'a> {
    tokens: TokenStream<'a>,
}

impl<'a> Parser<'a> {
    /// Create a parser over the given token stream.
    pub fn new(tokens: TokenStream<'a>) -> Self {
        Self { tokens }
    }

    /// Parse a whole program into a root block.
    pub fn parse_program(&mut self) -> RuneResult<Expr> {
        let span = self.lookahead_span()?;
        let mut stmts = Vec::new();
        while !self.tokens.eof()? {
            stmts.push(self.parse_expr()?);
        }
        Ok(Expr::new(ExprKind::Block(stmts), span))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> RuneResult<Expr> {
        self.parse_expr_bp(0)
    }

    /// Precedence climbing. Parses a prefix expression, then folds in
    /// infix operators whose left binding power is at least `min_bp`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> RuneResult<Expr> {
        let mut lhs = self.parse_unary()?;

        loop {
            let op = match self.tokens.peek()? {
                Some(tok) if tok.kind == TokenKind::Op => tok.text.clone(),
                _ => break,
            };
            let Some((lbp, rbp)) = infix_binding_power(&op) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            let op_tok = self.advance()?;

            if op == "=" {
                if !lhs.is_assign_target() {
                    return Err(Diagnostic::new("invalid assignment target", lhs.span));
                }
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs.span;
                lhs = Expr::new(
                    ExprKind::Assign {
                        target: Box::new(lhs),
                        value: Box::new(rhs),
                    },
                    span,
                );
            } else {
                let Some(bin_op) = BinOp::from_token(&op) else {
                    return Err(Diagnostic::new(
                        format!("unknown operator '{op}'"),
                        op_tok.span,
                    ));
                };
                let rhs = self.parse_expr_bp(rbp)?;
                let span = lhs.span;
                lhs = Expr::new(
                    ExprKind::Binary {
                        op: bin_op,
                        left: Box::new(lhs),
                        right: Box::new(rhs),
                    },
                    span,
                );
            }
        }

        Ok(lhs)
    }

    /// Prefix `not`, binding tighter than any binary operator but looser
    /// than the postfix forms.
    fn parse_unary(&mut self) -> RuneResult<Expr> {
        if self.peek_keyword("not")? {
            let kw = self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                },
                kw.span,
            ));
        }
        self.parse_postfix()
    }

    /// A primary followed by any mix of `(args)`, `[index]`, `.name`.
    fn parse_postfix(&mut self) -> RuneResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_punc("(")? {
                let args = self.parse_call_args()?;
                let span = expr.span;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.eat_punc("[")? {
                let index = self.parse_expr()?;
                self.expect_punc("]")?;
                let span = expr.span;
                expr = Expr::new(
                    ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else if self.eat_punc(".")? {
                let name = self.expect_kind(TokenKind::Var, "field name")?;
                let span = expr.span;
                expr = Expr::new(
                    ExprKind::Field {
                        target: Box::new(expr),
                        name: name.text,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> RuneResult<Expr> {
        let tok = self.advance()?;
        match tok.kind {
            TokenKind::Num => Ok(Expr::new(ExprKind::Num(tok.text), tok.span)),
            TokenKind::Str => Ok(Expr::new(ExprKind::Str(tok.text), tok.span)),
            TokenKind::Var => Ok(Expr::new(ExprKind::Var(tok.text), tok.span)),
            TokenKind::Keyword => self.parse_keyword_atom(tok),
            TokenKind::Punc if tok.text == "(" => {
                let expr = self.parse_expr()?;
                self.expect_punc(")")?;
                Ok(expr)
            }
            TokenKind::Punc | TokenKind::Op => Err(Diagnostic::new(
                format!("unexpected token '{}'", tok.text),
                tok.span,
            )),
        }
    }

    fn parse_keyword_atom(&mut self, kw: Token) -> RuneResult<Expr> {
        match kw.text.as_str() {
            "true" => Ok(Expr::new(ExprKind::Bool(true), kw.span)),
            "false" => Ok(Expr::new(ExprKind::Bool(false), kw.span)),
            "fun" => self.parse_fun(kw.span),
            "if" => self.parse_if(kw.span),
            "while" => self.parse_while(kw.span),
            "return" => {
                let value = if self.at_block_end()? {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                Ok(Expr::new(ExprKind::Return(value), kw.span))
            }
            "break" => Ok(Expr::new(ExprKind::Break, kw.span)),
            "continue" => Ok(Expr::new(ExprKind::Continue, kw.span)),
            "array" => self.parse_array_literal(kw.span),
            "table" => self.parse_table_literal(kw.span),
            "import" => {
                let path = self.parse_expr()?;
                Ok(Expr::new(ExprKind::Import(Box::new(path)), kw.span))
            }
            _ => Err(Diagnostic::new(
                format!("unexpected token '{}'", kw.text),
                kw.span,
            )),
        }
    }

    /// `fun name? (p1, p2, ...) { body }`. The named form is sugar for
    /// assigning the function literal to the name.
    fn parse_fun(&mut self, kw_span: Span) -> RuneResult<Expr> {
        let name = if self
            .tokens
            .peek()?
            .is_some_and(|t| t.kind == TokenKind::Var)
        {
            Some(self.advance()?)
        } else {
            None
        };

        self.expect_punc("(")?;
        let mut params = Vec::new();
        if !self.eat_punc(")")? {
            loop {
                let param = self.expect_kind(TokenKind::Var, "parameter name")?;
                params.push(param.text);
                if self.eat_punc(",")? {
                    if self.peek_punc(")")? {
                        // Trailing comma.
                        self.advance()?;
                        break;
                    }
                    continue;
                }
                self.expect_punc(")")?;
                break;
            }
        }
        let body = self.parse_block()?;

        let fun = Expr::new(
            ExprKind::Fun {
                params,
                body: Rc::new(body),
            },
            kw_span,
        );
        match name {
            Some(name) => Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(Expr::new(ExprKind::Var(name.text), name.span)),
                    value: Box::new(fun),
                },
                kw_span,
            )),
            None => Ok(fun),
        }
    }

    /// `if cond { ... } (elif cond { ... })* (else { ... })?`
    fn parse_if(&mut self, kw_span: Span) -> RuneResult<Expr> {
        let cond = self.parse_expr()?;
        let then_branch = self.parse_block()?;

        let mut alts = Vec::new();
        loop {
            if self.peek_keyword("elif")? {
                let elif = self.advance()?;
                let elif_cond = self.parse_expr()?;
                let elif_then = self.parse_block()?;
                alts.push(Expr::new(
                    ExprKind::If {
                        cond: Box::new(elif_cond),
                        then_branch: Box::new(elif_then),
                        alts: Vec::new(),
                    },
                    elif.span,
                ));
            } else if self.peek_keyword("else")? {
                self.advance()?;
                alts.push(self.parse_block()?);
                break;
            } else {
                break;
            }
        }

        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                alts,
            },
            kw_span,
        ))
    }

    fn parse_while(&mut self, kw_span: Span) -> RuneResult<Expr> {
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Expr::new(
            ExprKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            kw_span,
        ))
    }

    /// `array { e1, e2, ... }`
    fn parse_array_literal(&mut self, kw_span: Span) -> RuneResult<Expr> {
        self.expect_punc("{")?;
        let mut elements = Vec::new();
        while !self.eat_punc("}")? {
            elements.push(self.parse_expr()?);
            if !self.eat_punc(",")? {
                self.expect_punc("}")?;
                break;
            }
        }
        Ok(Expr::new(ExprKind::Array(elements), kw_span))
    }

    /// `table { k1: v1, k2: v2, ... }`. A bare identifier or keyword in
    /// key position is taken as a string literal; string and number
    /// literals are kept and stringified at evaluation.
    fn parse_table_literal(&mut self, kw_span: Span) -> RuneResult<Expr> {
        self.expect_punc("{")?;
        let mut pairs = Vec::new();
        while !self.eat_punc("}")? {
            let key_tok = self.advance()?;
            let key = match key_tok.kind {
                TokenKind::Var | TokenKind::Keyword | TokenKind::Str => {
                    Expr::new(ExprKind::Str(key_tok.text), key_tok.span)
                }
                TokenKind::Num => Expr::new(ExprKind::Num(key_tok.text), key_tok.span),
                TokenKind::Punc | TokenKind::Op => {
                    return Err(Diagnostic::new(
                        format!("expected table key but found '{}'", key_tok.text),
                        key_tok.span,
                    ));
                }
            };
            self.expect_punc(":")?;
            let value = self.parse_expr()?;
            pairs.push((key, value));
            if !self.eat_punc(",")? {
                self.expect_punc("}")?;
                break;
            }
        }
        Ok(Expr::new(ExprKind::Table(pairs), kw_span))
    }

    /// `{ stmt* }`
    fn parse_block(&mut self) -> RuneResult<Expr> {
        let open = self.expect_punc("{")?;
        let mut stmts = Vec::new();
        loop {
            if self.tokens.eof()? {
                return Err(Diagnostic::new(
                    "unexpected end of input, expected '}'",
                    self.tokens.here(),
                ));
            }
            if self.eat_punc("}")? {
                break;
            }
            stmts.push(self.parse_expr()?);
        }
        Ok(Expr::new(ExprKind::Block(stmts), open.span))
    }

    /// Arguments after an already consumed `(`.
    fn parse_call_args(&mut self) -> RuneResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.eat_punc(")")? {
            args.push(self.parse_expr()?);
            if !self.eat_punc(",")? {
                self.expect_punc(")")?;
                break;
            }
        }
        Ok(args)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    /// Span of the next token, or of the stream end.
    fn lookahead_span(&mut self) -> RuneResult<Span> {
        Ok(match self.tokens.peek()? {
            Some(tok) => tok.span,
            None => self.tokens.here(),
        })
    }

    /// Consume the next token, failing on end of input.
    fn advance(&mut self) -> RuneResult<Token> {
        self.tokens.next()?.ok_or_else(|| {
            Diagnostic::new("unexpected end of input", self.tokens.here())
        })
    }

    fn peek_punc(&mut self, punc: &str) -> RuneResult<bool> {
        Ok(self.tokens.peek()?.is_some_and(|t| t.is_punc(punc)))
    }

    fn peek_keyword(&mut self, kw: &str) -> RuneResult<bool> {
        Ok(self.tokens.peek()?.is_some_and(|t| t.is_keyword(kw)))
    }

    /// True at end of input or just before a closing `}`. Used to decide
    /// whether `return` has an operand.
    fn at_block_end(&mut self) -> RuneResult<bool> {
        Ok(match self.tokens.peek()? {
            Some(tok) => tok.is_punc("}"),
            None => true,
        })
    }

    /// Consume the next token if it is the given punctuation.
    fn eat_punc(&mut self, punc: &str) -> RuneResult<bool> {
        if self.peek_punc(punc)? {
            self.tokens.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Require the given punctuation.
    fn expect_punc(&mut self, punc: &str) -> RuneResult<Token> {
        match self.tokens.next()? {
            Some(tok) if tok.is_punc(punc) => Ok(tok),
            Some(tok) => Err(Diagnostic::new(
                format!("expected '{}' but found '{}'", punc, tok.text),
                tok.span,
            )),
            None => Err(Diagnostic::new(
                format!("unexpected end of input, expected '{punc}'"),
                self.tokens.here(),
            )),
        }
    }

    /// Require a token of the given kind.
    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> RuneResult<Token> {
        match self.tokens.next()? {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(Diagnostic::new(
                format!("expected {} but found '{}'", what, tok.text),
                tok.span,
            )),
            None => Err(Diagnostic::new(
                format!("unexpected end of input, expected {what}"),
                self.tokens.here(),
            )),
        }
    }
}
