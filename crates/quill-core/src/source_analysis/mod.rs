// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Source analysis: turning bytes into an AST.
//!
//! The pipeline is pull-driven rather than phase-driven. A [`Stream`] is a
//! backtracking byte cursor over a [`Source`]; [`Token`]s are lexed from it
//! on demand; AST nodes pull the tokens they need and roll the stream back
//! when a speculative production fails. [`parse`] runs the whole chain for
//! one source file.

mod lexer;
mod source;
mod span;
mod stream;
mod token;

pub mod parser;

pub use lexer::TokenPattern;
pub use parser::{parse, MAX_NESTING_DEPTH};
pub use source::{Location, Source, SourceError};
pub use span::Span;
pub use stream::{Checkpoint, Stream, LIVENESS_LIMIT};
pub use token::{
    is_ident, is_ident_byte, is_op_byte, is_punct_byte, is_special_ident, Keyword, Lit, Op, OpDir,
    Token, TokenKind,
};
