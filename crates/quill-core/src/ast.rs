// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Abstract syntax tree for Quill.
//!
//! Every node is a struct carrying its [`Span`]; [`Expr`] is the tagged
//! union over all of them. Statements are expressions in Quill — blocks,
//! declarations, and control flow all appear wherever an expression can.
//!
//! Parsing lives in [`crate::source_analysis::parser`] (each node has a
//! `pull` constructor there) and type checking in
//! [`crate::semantic_analysis`]; this module is pure data plus the
//! indented debug dump used by the `@!debug` directive and tests.

use std::fmt;
use std::fmt::Write as _;

use ecow::EcoString;

use crate::source_analysis::{Lit, Op, Span};

/// A possibly-qualified identifier path: `a`, `a::b::c`, `::root_item`.
///
/// The `absolute` flag records whether the path began with the root-scope
/// marker `::`, which pins resolution to the root namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentPath {
    /// True if the path began with `::`.
    pub absolute: bool,
    /// The identifier segments, in source order. Never empty.
    pub segments: Vec<EcoString>,
}

impl IdentPath {
    /// A relative single-segment path.
    #[must_use]
    pub fn name(name: impl Into<EcoString>) -> Self {
        Self {
            absolute: false,
            segments: vec![name.into()],
        }
    }

    /// The final segment.
    #[must_use]
    pub fn last(&self) -> &EcoString {
        self.segments.last().expect("paths are never empty")
    }

    /// Returns true if this is a plain unqualified name.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        !self.absolute && self.segments.len() == 1
    }
}

impl fmt::Display for IdentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("::")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

/// An identifier reference.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentExpr {
    /// The referenced path.
    pub path: IdentPath,
    /// Source range.
    pub span: Span,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct LitExpr {
    /// The literal.
    pub value: Lit,
    /// Source range.
    pub span: Span,
}

/// A binary operation, including assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct BinOpExpr {
    /// The operator.
    pub op: Op,
    /// Left operand (the assignment target for assignment operators).
    pub lhs: Box<Expr>,
    /// Right operand.
    pub rhs: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// A unary prefix operation: `-x`, `!b`, `+n`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnOpExpr {
    /// The operator.
    pub op: Op,
    /// The operand.
    pub operand: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// A call: `callee(arg, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// The called expression.
    pub callee: Box<Expr>,
    /// Arguments in source order.
    pub args: Vec<Expr>,
    /// Source range.
    pub span: Span,
}

/// A member access: `object.member`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    /// The accessed object.
    pub object: Box<Expr>,
    /// The member name.
    pub member: EcoString,
    /// Source range.
    pub span: Span,
}

/// An index access: `object[index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    /// The indexed object.
    pub object: Box<Expr>,
    /// The index expression.
    pub index: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// A type reference in annotation position: `int`, `geo::Vec2`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    /// The named type.
    pub path: IdentPath,
    /// Source range.
    pub span: Span,
}

/// A variable declaration: `let x: int = 1;` / `const y = 2;`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclExpr {
    /// True for `const`, false for `let`.
    pub constant: bool,
    /// The declared name.
    pub name: EcoString,
    /// Optional type annotation.
    pub ty: Option<TypeExpr>,
    /// Optional initializer.
    pub value: Option<Box<Expr>>,
    /// Source range.
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name.
    pub name: EcoString,
    /// Optional type annotation.
    pub ty: Option<TypeExpr>,
    /// Source range.
    pub span: Span,
}

/// A function declaration.
///
/// The body is either a block or an `=>` expression body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDeclExpr {
    /// The function name.
    pub name: EcoString,
    /// Parameters in source order.
    pub params: Vec<Param>,
    /// Optional declared return type (after `->`).
    pub ret: Option<TypeExpr>,
    /// The body expression.
    pub body: Box<Expr>,
    /// True for `=> expr` bodies, false for block bodies.
    pub expr_body: bool,
    /// Source range.
    pub span: Span,
}

/// A field inside a `struct` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name.
    pub name: EcoString,
    /// Field type.
    pub ty: TypeExpr,
    /// Source range.
    pub span: Span,
}

/// A struct declaration with fields and member functions.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclExpr {
    /// The struct name.
    pub name: EcoString,
    /// Data fields.
    pub fields: Vec<FieldDecl>,
    /// Member functions.
    pub methods: Vec<FunDeclExpr>,
    /// Source range.
    pub span: Span,
}

/// A variant inside an `enum` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDecl {
    /// Variant name.
    pub name: EcoString,
    /// Source range.
    pub span: Span,
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDeclExpr {
    /// The enum name.
    pub name: EcoString,
    /// The variants in source order.
    pub variants: Vec<VariantDecl>,
    /// Source range.
    pub span: Span,
}

/// An `if` expression with optional `else` / `else if` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    /// The condition.
    pub cond: Box<Expr>,
    /// The then-branch block.
    pub then_branch: Box<Expr>,
    /// The else-branch: a block or another `if`.
    pub else_branch: Option<Box<Expr>>,
    /// Source range.
    pub span: Span,
}

/// A `while` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileExpr {
    /// The condition.
    pub cond: Box<Expr>,
    /// The body block.
    pub body: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// A `for x in iter` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    /// The loop variable name.
    pub var: EcoString,
    /// The iterated expression.
    pub iter: Box<Expr>,
    /// The body block.
    pub body: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// A `return`, optionally with a value and a `from label` target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnExpr {
    /// The returned value, if any.
    pub value: Option<Box<Expr>>,
    /// The `from` target naming an enclosing function.
    pub label: Option<IdentExpr>,
    /// Source range.
    pub span: Span,
}

/// A `break`.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakExpr {
    /// Source range.
    pub span: Span,
}

/// A `continue`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinueExpr {
    /// Source range.
    pub span: Span,
}

/// A semicolon-separated sequence of expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    /// The expressions in order.
    pub exprs: Vec<Expr>,
    /// Source range.
    pub span: Span,
}

/// A braced block. Introduces a scope around its list.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockExpr {
    /// The statements inside the braces.
    pub list: ListExpr,
    /// Source range.
    pub span: Span,
}

/// An `import (* | {a, b}) from "path"` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportExpr {
    /// The file path string.
    pub from: EcoString,
    /// Named imports; empty means `*` (import everything).
    pub names: Vec<IdentExpr>,
    /// Source range.
    pub span: Span,
}

/// An `export <decl>` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportExpr {
    /// The exported declaration.
    pub inner: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// A `using path;` directive adding a namespace to unqualified lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct UsingExpr {
    /// The namespace to bring into scope.
    pub path: IdentExpr,
    /// Source range.
    pub span: Span,
}

/// An `@name` or `@name(value)` attribute attached to the following
/// declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrExpr {
    /// The attribute name.
    pub attribute: IdentExpr,
    /// Optional attribute argument.
    pub value: Option<Box<Expr>>,
    /// The declaration the attribute applies to.
    pub target: Box<Expr>,
    /// Source range.
    pub span: Span,
}

/// An `@!debug("probe")` compiler directive.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugExpr {
    /// The probe name, e.g. `entities`.
    pub probe: EcoString,
    /// Source range.
    pub span: Span,
}

/// Any expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier reference.
    Ident(IdentExpr),
    /// Literal value.
    Literal(LitExpr),
    /// Binary operation.
    BinOp(BinOpExpr),
    /// Unary prefix operation.
    UnOp(UnOpExpr),
    /// Call.
    Call(CallExpr),
    /// Member access.
    Member(MemberExpr),
    /// Index access.
    Index(IndexExpr),
    /// Variable declaration.
    VarDecl(VarDeclExpr),
    /// Function declaration.
    FunDecl(FunDeclExpr),
    /// Struct declaration.
    StructDecl(StructDeclExpr),
    /// Enum declaration.
    EnumDecl(EnumDeclExpr),
    /// `if` expression.
    If(IfExpr),
    /// `while` loop.
    While(WhileExpr),
    /// `for` loop.
    For(ForExpr),
    /// `return`.
    Return(ReturnExpr),
    /// `break`.
    Break(BreakExpr),
    /// `continue`.
    Continue(ContinueExpr),
    /// Braced block.
    Block(BlockExpr),
    /// Expression list.
    List(ListExpr),
    /// Import statement.
    Import(ImportExpr),
    /// Export statement.
    Export(ExportExpr),
    /// Using directive.
    Using(UsingExpr),
    /// Attribute.
    Attr(AttrExpr),
    /// Debug directive.
    Debug(DebugExpr),
}

impl Expr {
    /// The source range of this expression.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Ident(e) => e.span,
            Self::Literal(e) => e.span,
            Self::BinOp(e) => e.span,
            Self::UnOp(e) => e.span,
            Self::Call(e) => e.span,
            Self::Member(e) => e.span,
            Self::Index(e) => e.span,
            Self::VarDecl(e) => e.span,
            Self::FunDecl(e) => e.span,
            Self::StructDecl(e) => e.span,
            Self::EnumDecl(e) => e.span,
            Self::If(e) => e.span,
            Self::While(e) => e.span,
            Self::For(e) => e.span,
            Self::Return(e) => e.span,
            Self::Break(e) => e.span,
            Self::Continue(e) => e.span,
            Self::Block(e) => e.span,
            Self::List(e) => e.span,
            Self::Import(e) => e.span,
            Self::Export(e) => e.span,
            Self::Using(e) => e.span,
            Self::Attr(e) => e.span,
            Self::Debug(e) => e.span,
        }
    }

    /// Renders the tree as an indented dump, one node per line.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match self {
            Self::Ident(e) => {
                let _ = writeln!(out, "{pad}Ident({})", e.path);
            }
            Self::Literal(e) => {
                let _ = writeln!(out, "{pad}Literal({:?})", e.value);
            }
            Self::BinOp(e) => {
                let _ = writeln!(out, "{pad}BinOp({})", e.op);
                e.lhs.dump_into(out, indent + 1);
                e.rhs.dump_into(out, indent + 1);
            }
            Self::UnOp(e) => {
                let _ = writeln!(out, "{pad}UnOp({})", e.op);
                e.operand.dump_into(out, indent + 1);
            }
            Self::Call(e) => {
                let _ = writeln!(out, "{pad}Call");
                e.callee.dump_into(out, indent + 1);
                for arg in &e.args {
                    arg.dump_into(out, indent + 1);
                }
            }
            Self::Member(e) => {
                let _ = writeln!(out, "{pad}Member({})", e.member);
                e.object.dump_into(out, indent + 1);
            }
            Self::Index(e) => {
                let _ = writeln!(out, "{pad}Index");
                e.object.dump_into(out, indent + 1);
                e.index.dump_into(out, indent + 1);
            }
            Self::VarDecl(e) => {
                let kind = if e.constant { "const" } else { "let" };
                let _ = writeln!(out, "{pad}VarDecl({kind} {})", e.name);
                if let Some(value) = &e.value {
                    value.dump_into(out, indent + 1);
                }
            }
            Self::FunDecl(e) => {
                let _ = writeln!(out, "{pad}FunDecl({})", e.name);
                e.body.dump_into(out, indent + 1);
            }
            Self::StructDecl(e) => {
                let _ = writeln!(out, "{pad}StructDecl({})", e.name);
                for field in &e.fields {
                    let _ = writeln!(out, "{pad}  Field({}: {})", field.name, field.ty.path);
                }
                for method in &e.methods {
                    let _ = writeln!(out, "{pad}  Method({})", method.name);
                    method.body.dump_into(out, indent + 2);
                }
            }
            Self::EnumDecl(e) => {
                let _ = writeln!(out, "{pad}EnumDecl({})", e.name);
                for variant in &e.variants {
                    let _ = writeln!(out, "{pad}  Variant({})", variant.name);
                }
            }
            Self::If(e) => {
                let _ = writeln!(out, "{pad}If");
                e.cond.dump_into(out, indent + 1);
                e.then_branch.dump_into(out, indent + 1);
                if let Some(else_branch) = &e.else_branch {
                    else_branch.dump_into(out, indent + 1);
                }
            }
            Self::While(e) => {
                let _ = writeln!(out, "{pad}While");
                e.cond.dump_into(out, indent + 1);
                e.body.dump_into(out, indent + 1);
            }
            Self::For(e) => {
                let _ = writeln!(out, "{pad}For({})", e.var);
                e.iter.dump_into(out, indent + 1);
                e.body.dump_into(out, indent + 1);
            }
            Self::Return(e) => {
                match &e.label {
                    Some(label) => {
                        let _ = writeln!(out, "{pad}Return(from {})", label.path);
                    }
                    None => {
                        let _ = writeln!(out, "{pad}Return");
                    }
                }
                if let Some(value) = &e.value {
                    value.dump_into(out, indent + 1);
                }
            }
            Self::Break(_) => {
                let _ = writeln!(out, "{pad}Break");
            }
            Self::Continue(_) => {
                let _ = writeln!(out, "{pad}Continue");
            }
            Self::Block(e) => {
                let _ = writeln!(out, "{pad}Block");
                for expr in &e.list.exprs {
                    expr.dump_into(out, indent + 1);
                }
            }
            Self::List(e) => {
                let _ = writeln!(out, "{pad}List");
                for expr in &e.exprs {
                    expr.dump_into(out, indent + 1);
                }
            }
            Self::Import(e) => {
                if e.names.is_empty() {
                    let _ = writeln!(out, "{pad}Import(* from {:?})", e.from.as_str());
                } else {
                    let names: Vec<String> =
                        e.names.iter().map(|n| n.path.to_string()).collect();
                    let _ = writeln!(
                        out,
                        "{pad}Import({{{}}} from {:?})",
                        names.join(", "),
                        e.from.as_str()
                    );
                }
            }
            Self::Export(e) => {
                let _ = writeln!(out, "{pad}Export");
                e.inner.dump_into(out, indent + 1);
            }
            Self::Using(e) => {
                let _ = writeln!(out, "{pad}Using({})", e.path.path);
            }
            Self::Attr(e) => {
                let _ = writeln!(out, "{pad}Attr(@{})", e.attribute.path);
                if let Some(value) = &e.value {
                    value.dump_into(out, indent + 1);
                }
                e.target.dump_into(out, indent + 1);
            }
            Self::Debug(e) => {
                let _ = writeln!(out, "{pad}Debug({:?})", e.probe.as_str());
            }
        }
    }
}

/// The root of a parsed source file: an unbraced expression list covering
/// the whole input.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// The top-level expressions.
    pub list: ListExpr,
    /// Source range of the whole file.
    pub span: Span,
}

impl Ast {
    /// An AST with no expressions (empty source).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            list: ListExpr {
                exprs: Vec::new(),
                span: Span::default(),
            },
            span: Span::default(),
        }
    }

    /// Renders the tree as an indented dump.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::from("Ast\n");
        for expr in &self.list.exprs {
            expr.dump_into(&mut out, 1);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_path_display() {
        let path = IdentPath {
            absolute: false,
            segments: vec!["geo".into(), "Vec2".into()],
        };
        assert_eq!(path.to_string(), "geo::Vec2");

        let abs = IdentPath {
            absolute: true,
            segments: vec!["x".into()],
        };
        assert_eq!(abs.to_string(), "::x");
        assert!(!abs.is_simple());
        assert!(IdentPath::name("y").is_simple());
    }

    #[test]
    fn dump_is_indented() {
        let expr = Expr::BinOp(BinOpExpr {
            op: Op::Add,
            lhs: Box::new(Expr::Literal(LitExpr {
                value: Lit::Int(1),
                span: Span::new(0, 1),
            })),
            rhs: Box::new(Expr::Literal(LitExpr {
                value: Lit::Int(2),
                span: Span::new(4, 5),
            })),
            span: Span::new(0, 5),
        });
        assert_eq!(
            expr.dump(),
            "BinOp(+)\n  Literal(Int(1))\n  Literal(Int(2))\n"
        );
    }
}
