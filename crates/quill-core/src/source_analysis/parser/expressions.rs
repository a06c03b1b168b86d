// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing.
//!
//! This module covers everything that is not a declaration: precedence
//! climbing for binary operators, unary prefixes, postfix chains (calls,
//! member access, indexing), identifier paths, literals, blocks, and
//! control flow. Declarations, imports, and attributes live in
//! `declarations`.

use crate::ast::{
    AttrExpr, BinOpExpr, BlockExpr, BreakExpr, CallExpr, ContinueExpr, DebugExpr, EnumDeclExpr,
    Expr, ExportExpr, ForExpr, FunDeclExpr, IdentExpr, IdentPath, IfExpr, ImportExpr, IndexExpr,
    ListExpr, LitExpr, MemberExpr, ReturnExpr, StructDeclExpr, UnOpExpr, UsingExpr, VarDeclExpr,
    WhileExpr,
};
use crate::diagnostics::ParseResult;
use crate::source_analysis::{Keyword, Op, OpDir, Span, Stream, Token, TokenKind};

use super::{committed, pull_ident_name, MAX_NESTING_DEPTH};

impl Expr {
    /// Parses any expression.
    ///
    /// `stacker::maybe_grow` extends the stack on the heap when space runs
    /// low, and the nesting guard in `pull_unary` turns pathological
    /// nesting into a clean parse error before that matters.
    pub fn pull(stream: &mut Stream) -> ParseResult<Expr> {
        stacker::maybe_grow(32 * 1024, 256 * 1024, || Self::pull_binary(stream, 1))
    }

    /// Precedence climbing over the operator table.
    ///
    /// Parses a unary operand, then folds in binary operators of at least
    /// `min_prec`. Left-associative operators parse their right side one
    /// level tighter; right-associative ones at their own level.
    fn pull_binary(stream: &mut Stream, min_prec: u8) -> ParseResult<Expr> {
        committed(stream, |stream| {
            let mut lhs = Self::pull_unary(stream)?;
            loop {
                stream.debug_tick();
                let Some(op) = Token::peek(stream).and_then(|t| match t.kind() {
                    TokenKind::Op(op) => Some(*op),
                    _ => None,
                }) else {
                    break;
                };
                if !op.is_binary() || op.precedence() < min_prec {
                    break;
                }
                Token::pull(stream)?;
                let next_min = match op.dir() {
                    OpDir::Ltr => op.precedence() + 1,
                    OpDir::Rtl => op.precedence(),
                };
                let rhs = Self::pull_binary(stream, next_min)?;
                let span = lhs.span().merge(rhs.span());
                lhs = Expr::BinOp(BinOpExpr {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    span,
                });
            }
            Ok(lhs)
        })
    }

    /// Parses a unary prefix chain followed by a postfix chain.
    fn pull_unary(stream: &mut Stream) -> ParseResult<Expr> {
        let depth = stream.enter_nesting();
        let result = if depth > MAX_NESTING_DEPTH {
            Err(stream.error("expression nesting too deep", stream.here()))
        } else {
            Self::pull_unary_inner(stream)
        };
        stream.leave_nesting();
        result
    }

    // Postfix chains bind tighter than unary prefixes: the operand below
    // ends in pull_postfix, so `-a.b` negates the member access and `!f()`
    // negates the call result.
    fn pull_unary_inner(stream: &mut Stream) -> ParseResult<Expr> {
        committed(stream, |stream| {
            let start = stream.offset();
            if let Some(token) = Token::peek(stream) {
                if let TokenKind::Op(op) = token.kind() {
                    if op.is_unary() {
                        let op = *op;
                        Token::pull(stream)?;
                        let operand = Self::pull_unary(stream)?;
                        let span = Span::new(start, operand.span().end());
                        return Ok(Expr::UnOp(UnOpExpr {
                            op,
                            operand: Box::new(operand),
                            span,
                        }));
                    }
                }
            }
            Self::pull_postfix(stream)
        })
    }

    /// Parses a primary expression and any number of postfix operations:
    /// `(args)`, `.member`, `[index]`.
    fn pull_postfix(stream: &mut Stream) -> ParseResult<Expr> {
        committed(stream, |stream| {
            let start = stream.offset();
            let mut expr = Self::pull_primary(stream)?;
            loop {
                stream.debug_tick();
                if Token::draw('(', stream).is_some() {
                    let mut args = Vec::new();
                    if !Token::peek_is(')', stream) {
                        loop {
                            stream.debug_tick();
                            args.push(Expr::pull(stream)?);
                            if Token::pull_separator(',', ')', stream)? {
                                break;
                            }
                        }
                    }
                    Token::expect(')', stream)?;
                    expr = Expr::Call(CallExpr {
                        callee: Box::new(expr),
                        args,
                        span: Span::new(start, stream.offset()),
                    });
                } else if Token::draw('.', stream).is_some() {
                    let member = pull_ident_name(stream)?;
                    expr = Expr::Member(MemberExpr {
                        object: Box::new(expr),
                        member,
                        span: Span::new(start, stream.offset()),
                    });
                } else if Token::draw('[', stream).is_some() {
                    let index = Expr::pull(stream)?;
                    Token::expect(']', stream)?;
                    expr = Expr::Index(IndexExpr {
                        object: Box::new(expr),
                        index: Box::new(index),
                        span: Span::new(start, stream.offset()),
                    });
                } else {
                    break;
                }
            }
            Ok(expr)
        })
    }

    /// Parses a primary expression, dispatching on the next token.
    fn pull_primary(stream: &mut Stream) -> ParseResult<Expr> {
        let Some(token) = Token::peek(stream) else {
            // Peek only fails when pull fails; re-pull to surface the
            // underlying lex or end-of-file error.
            return Err(Token::pull(stream).expect_err("peek failed but pull succeeded"));
        };

        match token.kind() {
            TokenKind::Literal(_) => committed(stream, |stream| {
                let token = Token::pull(stream)?;
                let span = token.span();
                match token.into_kind() {
                    TokenKind::Literal(value) => Ok(Expr::Literal(LitExpr { value, span })),
                    _ => unreachable!("peeked a literal"),
                }
            }),
            TokenKind::Ident(_) | TokenKind::Op(Op::Scope) => {
                IdentExpr::pull(stream).map(Expr::Ident)
            }
            TokenKind::Keyword(keyword) => match keyword {
                Keyword::If => IfExpr::pull(stream).map(Expr::If),
                Keyword::While => WhileExpr::pull(stream).map(Expr::While),
                Keyword::For => ForExpr::pull(stream).map(Expr::For),
                Keyword::Return => ReturnExpr::pull(stream).map(Expr::Return),
                Keyword::Break => committed(stream, |stream| {
                    let token = Token::expect(Keyword::Break, stream)?;
                    Ok(Expr::Break(BreakExpr { span: token.span() }))
                }),
                Keyword::Continue => committed(stream, |stream| {
                    let token = Token::expect(Keyword::Continue, stream)?;
                    Ok(Expr::Continue(ContinueExpr { span: token.span() }))
                }),
                Keyword::Let | Keyword::Const => {
                    VarDeclExpr::pull(stream).map(Expr::VarDecl)
                }
                Keyword::Fun => FunDeclExpr::pull(stream).map(Expr::FunDecl),
                Keyword::Struct => StructDeclExpr::pull(stream).map(Expr::StructDecl),
                Keyword::Enum => EnumDeclExpr::pull(stream).map(Expr::EnumDecl),
                Keyword::Import => ImportExpr::pull(stream).map(Expr::Import),
                Keyword::Export => ExportExpr::pull(stream).map(Expr::Export),
                Keyword::Using => UsingExpr::pull(stream).map(Expr::Using),
                other => Err(stream.error(
                    format!("unexpected keyword `{other}`"),
                    token.span(),
                )),
            },
            TokenKind::Punct('{') => BlockExpr::pull(stream).map(Expr::Block),
            TokenKind::Punct('(') => committed(stream, |stream| {
                Token::expect('(', stream)?;
                let inner = Expr::pull(stream)?;
                Token::expect(')', stream)?;
                Ok(inner)
            }),
            TokenKind::Punct('@') => {
                // `@!` introduces a debug directive, plain `@` an attribute
                if matches!(
                    Token::peek_n(stream, 1).map(Token::into_kind),
                    Some(TokenKind::Op(Op::Not))
                ) {
                    DebugExpr::pull(stream).map(Expr::Debug)
                } else {
                    AttrExpr::pull(stream).map(Expr::Attr)
                }
            }
            other => Err(stream.error(
                format!("expected an expression, found {}", other.describe()),
                token.span(),
            )),
        }
    }
}

impl IdentExpr {
    /// Parses an identifier path: `name`, `a::b::c`, `::rooted`.
    pub fn pull(stream: &mut Stream) -> ParseResult<IdentExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            let absolute = Token::draw(Op::Scope, stream).is_some();
            let mut segments = vec![pull_ident_name(stream)?];
            while Token::draw(Op::Scope, stream).is_some() {
                stream.debug_tick();
                segments.push(pull_ident_name(stream)?);
            }
            Ok(IdentExpr {
                path: IdentPath { absolute, segments },
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl ListExpr {
    /// Parses expressions separated by semicolons until `closer` (or end of
    /// input when `closer` is `None`).
    ///
    /// The semicolon after an expression is optional when the expression
    /// ended with `}` and before the closer; consecutive semicolons
    /// collapse.
    pub(crate) fn pull_until(stream: &mut Stream, closer: Option<char>) -> ParseResult<ListExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            let mut exprs = Vec::new();
            loop {
                stream.debug_tick();
                Token::skip_trivia(stream);
                if stream.is_eof() {
                    break;
                }
                if let Some(c) = closer {
                    if Token::peek_is(c, stream) {
                        break;
                    }
                }

                exprs.push(Expr::pull(stream)?);

                if let Err(err) = Token::pull_semicolons(stream) {
                    // Allow omitting the final semicolon
                    Token::skip_trivia(stream);
                    let at_end = stream.is_eof()
                        || closer.is_some_and(|c| Token::peek_is(c, stream));
                    if at_end {
                        break;
                    }
                    return Err(err);
                }
            }
            Ok(ListExpr {
                exprs,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl BlockExpr {
    /// Parses a braced block: `{ expr; expr }`.
    pub fn pull(stream: &mut Stream) -> ParseResult<BlockExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect('{', stream)?;
            let list = ListExpr::pull_until(stream, Some('}'))?;
            Token::expect('}', stream)?;
            Ok(BlockExpr {
                list,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl IfExpr {
    /// Parses `if cond { … }` with an optional `else` block or `else if`
    /// chain.
    pub fn pull(stream: &mut Stream) -> ParseResult<IfExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::If, stream)?;
            let cond = Expr::pull(stream)?;
            let then_branch = BlockExpr::pull(stream).map(Expr::Block)?;
            let else_branch = if Token::draw(Keyword::Else, stream).is_some() {
                if Token::peek_is(Keyword::If, stream) {
                    Some(Box::new(IfExpr::pull(stream).map(Expr::If)?))
                } else {
                    Some(Box::new(BlockExpr::pull(stream).map(Expr::Block)?))
                }
            } else {
                None
            };
            Ok(IfExpr {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl WhileExpr {
    /// Parses `while cond { … }`.
    pub fn pull(stream: &mut Stream) -> ParseResult<WhileExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::While, stream)?;
            let cond = Expr::pull(stream)?;
            let body = BlockExpr::pull(stream).map(Expr::Block)?;
            Ok(WhileExpr {
                cond: Box::new(cond),
                body: Box::new(body),
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl ForExpr {
    /// Parses `for var in iter { … }`.
    pub fn pull(stream: &mut Stream) -> ParseResult<ForExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::For, stream)?;
            let var = pull_ident_name(stream)?;
            Token::expect(Keyword::In, stream)?;
            let iter = Expr::pull(stream)?;
            let body = BlockExpr::pull(stream).map(Expr::Block)?;
            Ok(ForExpr {
                var,
                iter: Box::new(iter),
                body: Box::new(body),
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl ReturnExpr {
    /// Parses `return`, `return value`, or `return value from label`.
    pub fn pull(stream: &mut Stream) -> ParseResult<ReturnExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Return, stream)?;
            let value = match Token::peek(stream) {
                None => None,
                Some(t) if matches!(t.kind(), TokenKind::Punct(';' | '}')) => None,
                Some(t) if matches!(t.kind(), TokenKind::Keyword(Keyword::From)) => None,
                Some(_) => Some(Box::new(Expr::pull(stream)?)),
            };
            let label = if Token::draw(Keyword::From, stream).is_some() {
                Some(IdentExpr::pull(stream)?)
            } else {
                None
            };
            Ok(ReturnExpr {
                value,
                label,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}
