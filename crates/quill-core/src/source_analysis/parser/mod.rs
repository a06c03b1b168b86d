// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Recursive descent parser for Quill source code.
//!
//! Every AST node has a `pull` constructor that reads itself off the
//! [`Stream`]. Each `pull` opens a checkpoint, attempts its production, and
//! either commits (the node's span covers exactly the consumed bytes) or
//! rolls back, leaving the stream where it found it. That rollback
//! neutrality is what makes speculative parsing compose: a caller can try
//! one production, and on failure try another from the same position with
//! no stale diagnostics.
//!
//! # Expression precedence
//!
//! Binary expressions use precedence climbing driven by the operator
//! table on [`Op`](crate::source_analysis::Op):
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 7 | `!` (unary) | — |
//! | 6 | `*` `/` `%` | Left |
//! | 5 | `+` `-` | Left |
//! | 4 | `==` `!=` `<` `<=` `>` `>=` | Left |
//! | 3 | `&&` | Left |
//! | 2 | `\|\|` | Left |
//! | 1 | `=` `+=` `-=` `*=` `/=` `%=` | Right |
//!
//! For a left-associative operator of precedence `p` the right operand is
//! parsed at `p + 1`; for right-associative at `p`.
//!
//! # Usage
//!
//! ```
//! use quill_core::source_analysis::{parse, Source};
//!
//! let source = Source::new("demo.ql", "let x = 3 + 4;", ".");
//! let (ast, diagnostics) = parse(&source);
//! assert!(diagnostics.is_empty());
//! assert_eq!(ast.unwrap().list.exprs.len(), 1);
//! ```

use std::sync::Arc;

use ecow::EcoString;

use crate::ast::{Ast, ListExpr};
use crate::diagnostics::{Diagnostic, ParseResult};

use super::{Lit, Source, Span, Stream, Token, TokenKind};

mod declarations;
mod expressions;

/// Maximum expression nesting depth before parsing gives up with a clean
/// error instead of risking the stack.
pub const MAX_NESTING_DEPTH: u32 = 64;

/// Parses a complete source file.
///
/// Returns the AST on success, plus any diagnostics (warnings survive even
/// a successful parse). On failure the AST is `None` and the error is the
/// last diagnostic.
#[must_use]
pub fn parse(source: &Arc<Source>) -> (Option<Ast>, Vec<Diagnostic>) {
    let mut stream = Stream::new(source.clone());
    let result = Ast::pull(&mut stream);
    let mut diagnostics = stream.take_diagnostics();
    match result {
        Ok(ast) => (Some(ast), diagnostics),
        Err(err) => {
            diagnostics.push(err);
            (None, diagnostics)
        }
    }
}

impl Ast {
    /// Parses a whole source file: an unbraced expression list that must
    /// consume all input.
    ///
    /// On success the stream is positioned at end of file.
    pub fn pull(stream: &mut Stream) -> ParseResult<Ast> {
        committed(stream, |stream| {
            let start = stream.offset();
            let list = ListExpr::pull_until(stream, None)?;
            Ok(Ast {
                list,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

/// Runs a production inside a checkpoint: commit on success, rollback on
/// failure. Leading trivia is skipped first so node spans start at their
/// first token.
pub(crate) fn committed<T>(
    stream: &mut Stream,
    production: impl FnOnce(&mut Stream) -> ParseResult<T>,
) -> ParseResult<T> {
    Token::skip_trivia(stream);
    let cp = stream.checkpoint();
    match production(stream) {
        Ok(value) => {
            stream.commit(cp);
            Ok(value)
        }
        Err(err) => {
            stream.rollback(cp);
            Err(err)
        }
    }
}

/// Pulls a single identifier token and returns its name.
pub(crate) fn pull_ident_name(stream: &mut Stream) -> ParseResult<EcoString> {
    committed(stream, |stream| {
        let token = Token::pull(stream)?;
        match token.kind() {
            TokenKind::Ident(name) => Ok(name.clone()),
            other => Err(stream.error(
                format!("expected an identifier, found {}", other.describe()),
                token.span(),
            )),
        }
    })
}

/// Pulls a string literal token and returns its value.
pub(crate) fn pull_string_literal(stream: &mut Stream) -> ParseResult<EcoString> {
    committed(stream, |stream| {
        let token = Token::pull(stream)?;
        match token.kind() {
            TokenKind::Literal(Lit::Str(value)) => Ok(value.clone()),
            other => Err(stream.error(
                format!("expected a string literal, found {}", other.describe()),
                token.span(),
            )),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, IdentPath};
    use crate::source_analysis::Op;

    /// Parses a source string, asserting no diagnostics.
    fn parse_ok(text: &str) -> Ast {
        let source = Source::new("test.ql", text, ".");
        let (ast, diagnostics) = parse(&source);
        assert!(
            diagnostics.is_empty(),
            "expected no diagnostics, got: {diagnostics:?}"
        );
        ast.expect("expected a successful parse")
    }

    /// Parses a source string, expecting failure, and returns the error.
    fn parse_err(text: &str) -> Diagnostic {
        let source = Source::new("test.ql", text, ".");
        let (ast, mut diagnostics) = parse(&source);
        assert!(ast.is_none(), "expected a parse failure for {text:?}");
        diagnostics.pop().expect("expected an error diagnostic")
    }

    fn single_expr(text: &str) -> Expr {
        let mut ast = parse_ok(text);
        assert_eq!(ast.list.exprs.len(), 1, "expected one expression");
        ast.list.exprs.pop().unwrap()
    }

    // ------------------------------------------------------------------
    // Precedence and associativity
    // ------------------------------------------------------------------

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = single_expr("1 + 2 * 3 == 7;");
        assert_eq!(
            expr.dump(),
            "BinOp(==)\n  BinOp(+)\n    Literal(Int(1))\n    BinOp(*)\n      Literal(Int(2))\n      Literal(Int(3))\n  Literal(Int(7))\n"
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = single_expr("a = b = 1;");
        assert_eq!(
            expr.dump(),
            "BinOp(=)\n  Ident(a)\n  BinOp(=)\n    Ident(b)\n    Literal(Int(1))\n"
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        // (1 - 2) - 3, not 1 - (2 - 3)
        let expr = single_expr("1 - 2 - 3;");
        assert_eq!(
            expr.dump(),
            "BinOp(-)\n  BinOp(-)\n    Literal(Int(1))\n    Literal(Int(2))\n  Literal(Int(3))\n"
        );
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let expr = single_expr("-1 - -2;");
        assert_eq!(
            expr.dump(),
            "BinOp(-)\n  UnOp(-)\n    Literal(Int(1))\n  UnOp(-)\n    Literal(Int(2))\n"
        );
    }

    #[test]
    fn logic_precedence() {
        // a || b && c  →  a || (b && c)
        let expr = single_expr("a || b && c;");
        match expr {
            Expr::BinOp(e) => {
                assert_eq!(e.op, Op::Or);
                assert!(matches!(*e.rhs, Expr::BinOp(ref r) if r.op == Op::And));
            }
            other => panic!("expected BinOp, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = single_expr("(1 + 2) * 3;");
        match expr {
            Expr::BinOp(e) => {
                assert_eq!(e.op, Op::Mul);
                assert!(matches!(*e.lhs, Expr::BinOp(ref l) if l.op == Op::Add));
            }
            other => panic!("expected BinOp, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Postfix chains
    // ------------------------------------------------------------------

    #[test]
    fn call_member_index_chain() {
        let expr = single_expr("a.b(1, 2)[0];");
        assert_eq!(
            expr.dump(),
            "Index\n  Call\n    Member(b)\n      Ident(a)\n    Literal(Int(1))\n    Literal(Int(2))\n  Literal(Int(0))\n"
        );
    }

    #[test]
    fn unary_then_postfix_binds_postfix_first() {
        // `-a.b` negates the member access, not `a`
        let expr = single_expr("-a.b;");
        assert_eq!(expr.dump(), "UnOp(-)\n  Member(b)\n    Ident(a)\n");

        // Same for calls and indexing
        let expr = single_expr("!f();");
        assert_eq!(expr.dump(), "UnOp(!)\n  Call\n    Ident(f)\n");

        let expr = single_expr("-xs[0];");
        assert_eq!(
            expr.dump(),
            "UnOp(-)\n  Index\n    Ident(xs)\n    Literal(Int(0))\n"
        );
    }

    #[test]
    fn call_allows_trailing_comma() {
        let expr = single_expr("f(1, 2,);");
        match expr {
            Expr::Call(call) => assert_eq!(call.args.len(), 2),
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn scoped_ident_chain() {
        let expr = single_expr("geo::Vec2;");
        match expr {
            Expr::Ident(e) => {
                assert_eq!(e.path.to_string(), "geo::Vec2");
                assert!(!e.path.absolute);
            }
            other => panic!("expected Ident, got {other:?}"),
        }

        let expr = single_expr("::top;");
        match expr {
            Expr::Ident(e) => assert!(e.path.absolute),
            other => panic!("expected Ident, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Statement lists and the semicolon rule
    // ------------------------------------------------------------------

    #[test]
    fn semicolon_optional_after_block() {
        // Identical ASTs with and without a `;` after `}`
        let with = parse_ok("if x { } ;let y = 1;");
        let without = parse_ok("if x { } let y = 1;");
        assert_eq!(with.list.exprs.len(), 2);
        assert_eq!(without.list.exprs.len(), 2);
        // Spans shift by the semicolon, so compare structure
        assert_eq!(with.list.exprs[1].dump(), without.list.exprs[1].dump());
    }

    #[test]
    fn block_tolerates_missing_final_semicolon() {
        let ast = parse_ok("{ let y = 1; let z = 2 };");
        match &ast.list.exprs[0] {
            Expr::Block(block) => assert_eq!(block.list.exprs.len(), 2),
            other => panic!("expected Block, got {other:?}"),
        }
    }

    #[test]
    fn import_with_trailing_comma_then_block() {
        let ast = parse_ok("import { a, b, } from \"x\"; { let y = 1; let z = 2 }");
        assert_eq!(ast.list.exprs.len(), 2);
        match &ast.list.exprs[0] {
            Expr::Import(import) => {
                assert_eq!(import.from, "x");
                assert_eq!(import.names.len(), 2);
            }
            other => panic!("expected Import, got {other:?}"),
        }
    }

    #[test]
    fn missing_semicolon_between_statements_is_an_error() {
        let err = parse_err("let x = 1 let y = 2;");
        assert!(err.message.contains("expected `;`"), "got: {}", err.message);
    }

    #[test]
    fn empty_source_parses() {
        let ast = parse_ok("");
        assert!(ast.list.exprs.is_empty());

        let ast = parse_ok("  // just a comment\n");
        assert!(ast.list.exprs.is_empty());
    }

    #[test]
    fn stray_closing_brace_is_an_error() {
        let err = parse_err("}");
        assert!(
            err.message.contains("expected an expression"),
            "got: {}",
            err.message
        );
    }

    // ------------------------------------------------------------------
    // Rollback neutrality and ranges
    // ------------------------------------------------------------------

    #[test]
    fn failed_parse_is_rollback_neutral() {
        let source = Source::new("test.ql", "let = 5;", ".");
        let mut stream = Stream::new(source);
        let before = stream.offset();
        assert!(Ast::pull(&mut stream).is_err());
        assert_eq!(stream.offset(), before);
    }

    #[test]
    fn successful_parse_ends_at_eof() {
        let source = Source::new("test.ql", "let x = 1;  ", ".");
        let mut stream = Stream::new(source.clone());
        assert!(Ast::pull(&mut stream).is_ok());
        assert!(stream.is_eof());
    }

    #[test]
    fn node_ranges_nest() {
        fn check(expr: &Expr) {
            let span = expr.span();
            assert!(span.start() <= span.end());
            let children: Vec<&Expr> = match expr {
                Expr::BinOp(e) => vec![&e.lhs, &e.rhs],
                Expr::UnOp(e) => vec![&e.operand],
                Expr::Call(e) => std::iter::once(&*e.callee).chain(&e.args).collect(),
                Expr::Block(e) => e.list.exprs.iter().collect(),
                _ => vec![],
            };
            for child in children {
                assert!(
                    span.contains(child.span()),
                    "child {:?} escapes parent {:?}",
                    child.span(),
                    span
                );
                check(child);
            }
        }
        let ast = parse_ok("{ f(-1 + 2, x) * 3; };");
        for expr in &ast.list.exprs {
            check(expr);
        }
    }

    #[test]
    fn deep_nesting_fails_cleanly() {
        let depth = MAX_NESTING_DEPTH as usize + 8;
        let text = format!("{}1{};", "(".repeat(depth), ")".repeat(depth));
        let err = parse_err(&text);
        assert!(err.message.contains("nesting"), "got: {}", err.message);
    }

    // ------------------------------------------------------------------
    // Control flow and declarations (surface checks)
    // ------------------------------------------------------------------

    #[test]
    fn if_else_chain() {
        let expr = single_expr("if a { } else if b { } else { };");
        match expr {
            Expr::If(e) => {
                assert!(matches!(*e.else_branch.unwrap(), Expr::If(_)));
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn while_and_for_loops() {
        parse_ok("while x < 10 { x += 1; };");
        let expr = single_expr("for item in items { };");
        match expr {
            Expr::For(e) => {
                assert_eq!(e.var, "item");
                assert_eq!(
                    *e.iter,
                    Expr::Ident(crate::ast::IdentExpr {
                        path: IdentPath::name("items"),
                        span: e.iter.span(),
                    })
                );
            }
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn function_declarations() {
        let expr = single_expr("fun add(a: int, b: int) -> int { return a + b; };");
        match expr {
            Expr::FunDecl(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.params.len(), 2);
                assert!(f.ret.is_some());
                assert!(!f.expr_body);
            }
            other => panic!("expected FunDecl, got {other:?}"),
        }

        let expr = single_expr("fun double(x: int) -> int => x * 2;");
        match expr {
            Expr::FunDecl(f) => assert!(f.expr_body),
            other => panic!("expected FunDecl, got {other:?}"),
        }
    }

    #[test]
    fn struct_and_enum_declarations() {
        let expr = single_expr(
            "struct Vec2 { x: float; y: float; fun length() -> float => x; };",
        );
        match expr {
            Expr::StructDecl(s) => {
                assert_eq!(s.fields.len(), 2);
                assert_eq!(s.methods.len(), 1);
            }
            other => panic!("expected StructDecl, got {other:?}"),
        }

        let expr = single_expr("enum Color { Red, Green, Blue, };");
        match expr {
            Expr::EnumDecl(e) => assert_eq!(e.variants.len(), 3),
            other => panic!("expected EnumDecl, got {other:?}"),
        }
    }

    #[test]
    fn import_star_and_export() {
        let expr = single_expr("import * from \"lib.ql\";");
        match expr {
            Expr::Import(i) => assert!(i.names.is_empty()),
            other => panic!("expected Import, got {other:?}"),
        }

        let expr = single_expr("export let shared = 1;");
        match expr {
            Expr::Export(e) => assert!(matches!(*e.inner, Expr::VarDecl(_))),
            other => panic!("expected Export, got {other:?}"),
        }
    }

    #[test]
    fn attributes_and_debug_directive() {
        let expr = single_expr("@deprecated(\"use v2\") fun old() => 1;");
        match expr {
            Expr::Attr(attr) => {
                assert_eq!(attr.attribute.path.to_string(), "deprecated");
                assert!(attr.value.is_some());
                assert!(matches!(*attr.target, Expr::FunDecl(_)));
            }
            other => panic!("expected Attr, got {other:?}"),
        }

        let expr = single_expr("@!debug(\"entities\");");
        match expr {
            Expr::Debug(d) => assert_eq!(d.probe, "entities"),
            other => panic!("expected Debug, got {other:?}"),
        }
    }

    #[test]
    fn return_with_label() {
        let expr = single_expr("fun f() { return 1 from f; };");
        match expr {
            Expr::FunDecl(f) => match &*f.body {
                Expr::Block(block) => match &block.list.exprs[0] {
                    Expr::Return(r) => {
                        assert!(r.value.is_some());
                        assert_eq!(r.label.as_ref().unwrap().path.to_string(), "f");
                    }
                    other => panic!("expected Return, got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected FunDecl, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_keyword_is_an_error() {
        let err = parse_err("extends;");
        assert!(
            err.message.contains("keyword `extends`"),
            "got: {}",
            err.message
        );
    }

    #[test]
    fn using_directive() {
        let expr = single_expr("using geo;");
        match expr {
            Expr::Using(u) => assert_eq!(u.path.path.to_string(), "geo"),
            other => panic!("expected Using, got {other:?}"),
        }
    }
}
