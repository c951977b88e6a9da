//! rune-util - Shared infrastructure for the Rune interpreter.
//!
//! This crate provides the types every phase of the pipeline depends on:
//! source location tracking ([`Span`], [`FileId`]), the registry of loaded
//! source files ([`SourceMap`]), and the positioned fatal error type
//! ([`Diagnostic`]) together with the [`RuneResult`] alias.
//!
//! Diagnostics are plain values. The lexer, parser, and evaluator return
//! `Err(Diagnostic)` and let the caller decide what to do with it; only the
//! CLI driver renders and exits. Rendering needs the original source text to
//! show the offending line, which is why it lives on [`SourceMap`].

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Diagnostic, RuneResult};
pub use span::{FileId, SourceFile, SourceMap, Span};
