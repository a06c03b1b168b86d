// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Declaration parsing: variables, functions, structs, enums, imports,
//! exports, `using` directives, attributes, and the `@!debug` directive.

use crate::ast::{
    AttrExpr, BlockExpr, DebugExpr, EnumDeclExpr, Expr, ExportExpr, FieldDecl, FunDeclExpr,
    IdentExpr, ImportExpr, Param, StructDeclExpr, TypeExpr, UsingExpr, VarDeclExpr, VariantDecl,
};
use crate::diagnostics::ParseResult;
use crate::source_analysis::{Keyword, Op, Span, Stream, Token};

use super::{committed, pull_ident_name, pull_string_literal};

impl TypeExpr {
    /// Parses a type reference: a possibly-qualified type name.
    pub fn pull(stream: &mut Stream) -> ParseResult<TypeExpr> {
        let ident = IdentExpr::pull(stream)?;
        Ok(TypeExpr {
            path: ident.path,
            span: ident.span,
        })
    }
}

impl VarDeclExpr {
    /// Parses `let name (: type)? (= value)?` or the `const` form.
    pub fn pull(stream: &mut Stream) -> ParseResult<VarDeclExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            let constant = Token::draw(Keyword::Const, stream).is_some();
            if !constant {
                Token::expect(Keyword::Let, stream)?;
            }
            let name = pull_ident_name(stream)?;
            let ty = if Token::draw(':', stream).is_some() {
                Some(TypeExpr::pull(stream)?)
            } else {
                None
            };
            let value = if Token::draw(Op::Assign, stream).is_some() {
                Some(Box::new(Expr::pull(stream)?))
            } else {
                None
            };
            Ok(VarDeclExpr {
                constant,
                name,
                ty,
                value,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl Param {
    fn pull(stream: &mut Stream) -> ParseResult<Param> {
        committed(stream, |stream| {
            let start = stream.offset();
            let name = pull_ident_name(stream)?;
            let ty = if Token::draw(':', stream).is_some() {
                Some(TypeExpr::pull(stream)?)
            } else {
                None
            };
            Ok(Param {
                name,
                ty,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl FunDeclExpr {
    /// Parses `fun name(params) (-> ret)? ({ … } | => expr)`.
    pub fn pull(stream: &mut Stream) -> ParseResult<FunDeclExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Fun, stream)?;
            let name = pull_ident_name(stream)?;

            Token::expect('(', stream)?;
            let mut params = Vec::new();
            if !Token::peek_is(')', stream) {
                loop {
                    stream.debug_tick();
                    params.push(Param::pull(stream)?);
                    if Token::pull_separator(',', ')', stream)? {
                        break;
                    }
                }
            }
            Token::expect(')', stream)?;

            let ret = if Token::draw(Op::Arrow, stream).is_some() {
                Some(TypeExpr::pull(stream)?)
            } else {
                None
            };

            let (body, expr_body) = if Token::draw(Op::FatArrow, stream).is_some() {
                (Expr::pull(stream)?, true)
            } else {
                (BlockExpr::pull(stream).map(Expr::Block)?, false)
            };

            Ok(FunDeclExpr {
                name,
                params,
                ret,
                body: Box::new(body),
                expr_body,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl FieldDecl {
    fn pull(stream: &mut Stream) -> ParseResult<FieldDecl> {
        committed(stream, |stream| {
            let start = stream.offset();
            let name = pull_ident_name(stream)?;
            Token::expect(':', stream)?;
            let ty = TypeExpr::pull(stream)?;
            Ok(FieldDecl {
                name,
                ty,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl StructDeclExpr {
    /// Parses `struct Name { field: Type; … fun method() { … } }`.
    pub fn pull(stream: &mut Stream) -> ParseResult<StructDeclExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Struct, stream)?;
            let name = pull_ident_name(stream)?;
            Token::expect('{', stream)?;

            let mut fields = Vec::new();
            let mut methods = Vec::new();
            loop {
                stream.debug_tick();
                if Token::peek_is('}', stream) {
                    break;
                }
                if Token::peek_is(Keyword::Fun, stream) {
                    methods.push(FunDeclExpr::pull(stream)?);
                } else {
                    fields.push(FieldDecl::pull(stream)?);
                }
                if let Err(err) = Token::pull_semicolons(stream) {
                    if Token::peek_is('}', stream) {
                        break;
                    }
                    return Err(err);
                }
            }
            Token::expect('}', stream)?;

            Ok(StructDeclExpr {
                name,
                fields,
                methods,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl EnumDeclExpr {
    /// Parses `enum Name { Variant, … }` with an optional trailing comma.
    pub fn pull(stream: &mut Stream) -> ParseResult<EnumDeclExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Enum, stream)?;
            let name = pull_ident_name(stream)?;
            Token::expect('{', stream)?;

            let mut variants = Vec::new();
            if !Token::peek_is('}', stream) {
                loop {
                    stream.debug_tick();
                    variants.push(VariantDecl::pull(stream)?);
                    if Token::pull_separator(',', '}', stream)? {
                        break;
                    }
                }
            }
            Token::expect('}', stream)?;

            Ok(EnumDeclExpr {
                name,
                variants,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl VariantDecl {
    fn pull(stream: &mut Stream) -> ParseResult<VariantDecl> {
        committed(stream, |stream| {
            let start = stream.offset();
            let name = pull_ident_name(stream)?;
            Ok(VariantDecl {
                name,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl ImportExpr {
    /// Parses `import (* | { Name, … }) from "path"`.
    pub fn pull(stream: &mut Stream) -> ParseResult<ImportExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Import, stream)?;

            let mut names = Vec::new();
            if Token::draw(Op::Mul, stream).is_none() {
                Token::expect('{', stream)?;
                loop {
                    stream.debug_tick();
                    names.push(IdentExpr::pull(stream)?);
                    if Token::pull_separator(',', '}', stream)? {
                        break;
                    }
                }
                Token::expect('}', stream)?;
            }

            Token::expect(Keyword::From, stream)?;
            let from = pull_string_literal(stream)?;

            Ok(ImportExpr {
                from,
                names,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl ExportExpr {
    /// Parses `export <declaration>`.
    pub fn pull(stream: &mut Stream) -> ParseResult<ExportExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Export, stream)?;
            let inner = Expr::pull(stream)?;
            Ok(ExportExpr {
                inner: Box::new(inner),
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl UsingExpr {
    /// Parses `using namespace::path`.
    pub fn pull(stream: &mut Stream) -> ParseResult<UsingExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect(Keyword::Using, stream)?;
            let path = IdentExpr::pull(stream)?;
            Ok(UsingExpr {
                path,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl AttrExpr {
    /// Parses `@name` or `@name(value)` followed by the declaration it
    /// attaches to.
    pub fn pull(stream: &mut Stream) -> ParseResult<AttrExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect('@', stream)?;
            let attribute = IdentExpr::pull(stream)?;
            let value = if Token::draw('(', stream).is_some() {
                let value = Expr::pull(stream)?;
                Token::expect(')', stream)?;
                Some(Box::new(value))
            } else {
                None
            };
            let target = Expr::pull(stream)?;
            Ok(AttrExpr {
                attribute,
                value,
                target: Box::new(target),
                span: Span::new(start, stream.offset()),
            })
        })
    }
}

impl DebugExpr {
    /// Parses the `@!debug("probe")` compiler directive.
    pub fn pull(stream: &mut Stream) -> ParseResult<DebugExpr> {
        committed(stream, |stream| {
            let start = stream.offset();
            Token::expect('@', stream)?;
            Token::expect(Op::Not, stream)?;
            let name = pull_ident_name(stream)?;
            if name != "debug" {
                return Err(stream.error(
                    format!("expected `debug`, found `{name}`"),
                    Span::new(start, stream.offset()),
                ));
            }
            Token::expect('(', stream)?;
            let probe = pull_string_literal(stream)?;
            Token::expect(')', stream)?;
            Ok(DebugExpr {
                probe,
                span: Span::new(start, stream.offset()),
            })
        })
    }
}
