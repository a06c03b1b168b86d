// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The typecheck pass.
//!
//! Every AST node computes a [`Ty`]. Declarations additionally register an
//! entity in the current scope, which `export` picks up through
//! [`Expr::typecheck_entity`]. Errors are reported immediately and the pass
//! continues with [`Ty::Unknown`], which converts to everything — one
//! mistake produces one diagnostic, not a cascade.

use ecow::EcoString;

use crate::ast::{
    AttrExpr, BinOpExpr, BlockExpr, CallExpr, DebugExpr, EnumDeclExpr, Expr, ExportExpr, ForExpr,
    FunDeclExpr, IdentExpr, IdentPath, IfExpr, ImportExpr, IndexExpr, LitExpr, ListExpr,
    MemberExpr, ReturnExpr, StructDeclExpr, TypeExpr, UnOpExpr, UsingExpr, VarDeclExpr, WhileExpr,
};
use crate::source_analysis::{Lit, Source};

use super::entity::{
    ClassData, EntityData, EntityId, EntityKind, FunctionData, NamespaceData, VariableData,
};
use super::ty::{EnumTy, FunTy, QualTy, Ty};
use super::UnitChecker;

impl UnitChecker<'_> {
    /// Resolves a type annotation to a [`Ty`], reporting unknown or
    /// non-type names.
    fn resolve_type(&mut self, annotation: &TypeExpr) -> Ty {
        let found = self
            .get_entity(&annotation.path, Some(EntityKind::Type), None, false)
            .or_else(|| self.get_entity(&annotation.path, Some(EntityKind::Class), None, false));
        match found {
            Some(id) => match self.entities().get(id).type_of() {
                Some(ty) => ty,
                None => {
                    self.error(
                        annotation.span,
                        format!("`{}` is not a type", annotation.path),
                    );
                    Ty::Unknown
                }
            },
            None => {
                self.error(
                    annotation.span,
                    format!("unknown type `{}`", annotation.path),
                );
                Ty::Unknown
            }
        }
    }

    /// Reports a duplicate-name error if `name` already exists in the
    /// innermost scope. Returns true on conflict.
    fn check_collision(&mut self, name: &EcoString, span: crate::source_analysis::Span) -> bool {
        if self
            .get_entity(&IdentPath::name(name.clone()), None, None, true)
            .is_some()
        {
            self.error(span, format!("`{name}` already exists in this scope"));
            true
        } else {
            false
        }
    }
}

impl Expr {
    /// Typechecks this expression, reporting diagnostics into the checker.
    pub fn typecheck(&self, state: &mut UnitChecker<'_>) -> Ty {
        self.typecheck_entity(state).0
    }

    /// Typechecks this expression and returns the entity it declares, if
    /// any. `export` uses the entity; everyone else drops it.
    pub fn typecheck_entity(&self, state: &mut UnitChecker<'_>) -> (Ty, Option<EntityId>) {
        match self {
            Self::VarDecl(e) => e.check(state),
            Self::FunDecl(e) => e.check(state),
            Self::StructDecl(e) => e.check(state),
            Self::EnumDecl(e) => e.check(state),
            Self::Attr(e) => e.check(state),
            Self::Ident(e) => (e.check(state), None),
            Self::Literal(e) => (e.check(), None),
            Self::BinOp(e) => (e.check(state), None),
            Self::UnOp(e) => (e.check(state), None),
            Self::Call(e) => (e.check(state), None),
            Self::Member(e) => (e.check(state), None),
            Self::Index(e) => (e.check(state), None),
            Self::If(e) => (e.check(state), None),
            Self::While(e) => (e.check(state), None),
            Self::For(e) => (e.check(state), None),
            Self::Return(e) => (e.check(state), None),
            Self::Break(_) | Self::Continue(_) => (Ty::Void, None),
            Self::Block(e) => (e.check(state), None),
            Self::List(e) => (e.check(state), None),
            Self::Import(e) => (e.check(state), None),
            Self::Export(e) => (e.check(state), None),
            Self::Using(e) => (e.check(state), None),
            Self::Debug(e) => (e.check(state), None),
        }
    }

    /// Resolves this expression as an assignment target, returning its
    /// qualified type. Reports resolve errors; returns `None` both on
    /// error and on silent [`Ty::Unknown`] propagation.
    fn place_ty(&self, state: &mut UnitChecker<'_>) -> Option<QualTy> {
        match self {
            Self::Ident(ident) => match state.get_entity(&ident.path, None, None, false) {
                Some(id) => {
                    if let EntityData::Variable(var) = state.entities().get(id).data() {
                        return Some(var.ty.clone());
                    }
                    let kind = state.entities().get(id).kind();
                    state.error(
                        ident.span,
                        format!("cannot assign to `{}`: it is a {kind}", ident.path),
                    );
                    None
                }
                None => {
                    state.error(ident.span, format!("unknown identifier `{}`", ident.path));
                    None
                }
            },
            Self::Member(member) => {
                let object_ty = member.object.typecheck(state);
                match object_ty {
                    Ty::Unknown => None,
                    Ty::Struct(s) => {
                        match state.entities().class_member(s.entity, &member.member) {
                            Some(id) => match state.entities().get(id).data() {
                                EntityData::Variable(var) => Some(var.ty.clone()),
                                _ => None,
                            },
                            None => {
                                state.error(
                                    member.span,
                                    format!(
                                        "no member `{}` on type `{}`",
                                        member.member, s.name
                                    ),
                                );
                                None
                            }
                        }
                    }
                    other => {
                        state.error(
                            member.span,
                            format!("type `{other}` has no members"),
                        );
                        None
                    }
                }
            }
            Self::Index(index) => {
                let object_ty = index.object.typecheck(state);
                let index_ty = index.index.typecheck(state);
                if object_ty.is_unknown() || index_ty.is_unknown() {
                    return None;
                }
                match state.project.index_ty(&object_ty, &index_ty) {
                    Some(elem) => Some(QualTy::new(elem)),
                    None => {
                        state.error(
                            index.span,
                            format!("type `{object_ty}` cannot be indexed with `{index_ty}`"),
                        );
                        None
                    }
                }
            }
            other => {
                state.error(other.span(), "invalid assignment target");
                None
            }
        }
    }
}

impl LitExpr {
    fn check(&self) -> Ty {
        match &self.value {
            Lit::Void => Ty::Void,
            Lit::Bool(_) => Ty::Bool,
            Lit::Int(_) => Ty::Int,
            Lit::Float(_) => Ty::Float,
            Lit::Str(_) => Ty::Str,
        }
    }
}

impl IdentExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        match state.get_entity(&self.path, None, None, false) {
            Some(id) => {
                let value_ty = state.entities().get(id).value_ty();
                match value_ty {
                    Some(qual) => qual.ty,
                    None => {
                        let kind = state.entities().get(id).kind();
                        state.error(
                            self.span,
                            format!("`{}` is a {kind}, not a value", self.path),
                        );
                        Ty::Unknown
                    }
                }
            }
            None => {
                state.error(self.span, format!("unknown identifier `{}`", self.path));
                Ty::Unknown
            }
        }
    }
}

impl BinOpExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        if self.op.is_assignment() {
            return self.check_assignment(state);
        }
        let lhs = self.lhs.typecheck(state);
        let rhs = self.rhs.typecheck(state);
        if lhs.is_unknown() || rhs.is_unknown() {
            return Ty::Unknown;
        }
        match state.project.binop_ty(&lhs, self.op, &rhs) {
            Some(ret) => ret,
            None => {
                state.error(
                    self.span,
                    format!("cannot apply `{}` to `{lhs}` and `{rhs}`", self.op),
                );
                Ty::Unknown
            }
        }
    }

    fn check_assignment(&self, state: &mut UnitChecker<'_>) -> Ty {
        let target = self.lhs.place_ty(state);
        let value = self.rhs.typecheck(state);
        let Some(target) = target else {
            return Ty::Unknown;
        };
        if target.constant {
            state.error(self.lhs.span(), "cannot assign to a constant");
        }
        if !value.is_unknown() && !target.ty.is_unknown() {
            match self.op.assignment_base() {
                None => {
                    if !value.convertible_to(&target.ty) {
                        state.error(
                            self.rhs.span(),
                            format!("expected type `{}`, got `{value}`", target.ty),
                        );
                    }
                }
                Some(base) => match state.project.binop_ty(&target.ty, base, &value) {
                    Some(ret) if ret.convertible_to(&target.ty) => {}
                    _ => {
                        state.error(
                            self.span,
                            format!(
                                "cannot apply `{base}` to `{}` and `{value}`",
                                target.ty
                            ),
                        );
                    }
                },
            }
        }
        target.ty
    }
}

impl UnOpExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let operand = self.operand.typecheck(state);
        if operand.is_unknown() {
            return Ty::Unknown;
        }
        match state.project.unop_ty(self.op, &operand) {
            Some(ret) => ret,
            None => {
                state.error(
                    self.span,
                    format!("cannot apply unary `{}` to `{operand}`", self.op),
                );
                Ty::Unknown
            }
        }
    }
}

impl CallExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let arg_tys: Vec<Ty> = self.args.iter().map(|arg| arg.typecheck(state)).collect();
        if arg_tys.iter().any(Ty::is_unknown) {
            return Ty::Unknown;
        }
        let params: Vec<QualTy> = arg_tys.iter().cloned().map(QualTy::new).collect();
        let arg_list = || {
            arg_tys
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        // Overload-aware lookup for direct calls by name
        if let Expr::Ident(ident) = &*self.callee {
            if let Some(id) =
                state.get_entity(&ident.path, Some(EntityKind::Function), Some(&params), false)
            {
                return self.function_ret(state, id);
            }
            if state
                .get_entity(&ident.path, Some(EntityKind::Function), None, false)
                .is_some()
            {
                state.error(
                    self.span,
                    format!("no overload of `{}` matches ({})", ident.path, arg_list()),
                );
                return Ty::Unknown;
            }
            // Fall through: the name may be a variable of function type
        }

        // Member-function calls dispatch on the object's class
        if let Expr::Member(member) = &*self.callee {
            let object_ty = member.object.typecheck(state);
            return match object_ty {
                Ty::Unknown => Ty::Unknown,
                Ty::Struct(s) => {
                    if let Some(id) = state.entities().class_member_function(
                        s.entity,
                        &member.member,
                        Some(&params),
                    ) {
                        self.function_ret(state, id)
                    } else if state
                        .entities()
                        .class_member_function(s.entity, &member.member, None)
                        .is_some()
                    {
                        state.error(
                            self.span,
                            format!(
                                "no overload of `{}` matches ({})",
                                member.member,
                                arg_list()
                            ),
                        );
                        Ty::Unknown
                    } else {
                        state.error(
                            member.span,
                            format!(
                                "no member function `{}` on type `{}`",
                                member.member, s.name
                            ),
                        );
                        Ty::Unknown
                    }
                }
                other => {
                    state.error(
                        member.span,
                        format!("type `{other}` has no member functions"),
                    );
                    Ty::Unknown
                }
            };
        }

        let callee_ty = self.callee.typecheck(state);
        match callee_ty {
            Ty::Unknown => Ty::Unknown,
            Ty::Function(fun) => {
                if fun.params.len() != self.args.len() {
                    state.error(
                        self.span,
                        format!(
                            "expected {} arguments, got {}",
                            fun.params.len(),
                            self.args.len()
                        ),
                    );
                    return Ty::Unknown;
                }
                for ((param, arg_ty), arg) in
                    fun.params.iter().zip(&arg_tys).zip(&self.args)
                {
                    if !arg_ty.convertible_to(&param.ty) {
                        state.error(
                            arg.span(),
                            format!("expected type `{}`, got `{arg_ty}`", param.ty),
                        );
                    }
                }
                (*fun.ret).clone()
            }
            other => {
                state.error(self.span, format!("type `{other}` is not callable"));
                Ty::Unknown
            }
        }
    }

    fn function_ret(&self, state: &mut UnitChecker<'_>, id: EntityId) -> Ty {
        match state.entities().get(id).data() {
            EntityData::Function(fun) => (*fun.ty.ret).clone(),
            _ => Ty::Unknown,
        }
    }
}

impl MemberExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let object_ty = self.object.typecheck(state);
        match object_ty {
            Ty::Unknown => Ty::Unknown,
            Ty::Struct(s) => {
                if let Some(id) = state.entities().class_member(s.entity, &self.member) {
                    let ty = state.entities().get(id).value_ty();
                    return ty.map_or(Ty::Unknown, |qual| qual.ty);
                }
                if let Some(id) =
                    state
                        .entities()
                        .class_member_function(s.entity, &self.member, None)
                {
                    let ty = state.entities().get(id).value_ty();
                    return ty.map_or(Ty::Unknown, |qual| qual.ty);
                }
                state.error(
                    self.span,
                    format!("no member `{}` on type `{}`", self.member, s.name),
                );
                Ty::Unknown
            }
            other => {
                state.error(self.span, format!("type `{other}` has no members"));
                Ty::Unknown
            }
        }
    }
}

impl IndexExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let object_ty = self.object.typecheck(state);
        let index_ty = self.index.typecheck(state);
        if object_ty.is_unknown() || index_ty.is_unknown() {
            return Ty::Unknown;
        }
        match state.project.index_ty(&object_ty, &index_ty) {
            Some(elem) => elem,
            None => {
                state.error(
                    self.span,
                    format!("type `{object_ty}` cannot be indexed with `{index_ty}`"),
                );
                Ty::Unknown
            }
        }
    }
}

impl IfExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let cond = self.cond.typecheck(state);
        if !cond.convertible_to(&Ty::Bool) {
            state.error(
                self.cond.span(),
                format!("expected a `bool` condition, got `{cond}`"),
            );
        }
        let then_ty = self.then_branch.typecheck(state);
        match &self.else_branch {
            Some(else_branch) => {
                let else_ty = else_branch.typecheck(state);
                if then_ty == else_ty {
                    then_ty
                } else {
                    Ty::Void
                }
            }
            None => Ty::Void,
        }
    }
}

impl WhileExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let cond = self.cond.typecheck(state);
        if !cond.convertible_to(&Ty::Bool) {
            state.error(
                self.cond.span(),
                format!("expected a `bool` condition, got `{cond}`"),
            );
        }
        self.body.typecheck(state);
        Ty::Void
    }
}

impl ForExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let iter_ty = self.iter.typecheck(state);
        let elem_ty = match iter_ty {
            Ty::Str => Ty::Str,
            Ty::Unknown => Ty::Unknown,
            other => {
                state.error(
                    self.iter.span(),
                    format!("type `{other}` is not iterable"),
                );
                Ty::Unknown
            }
        };
        state.push_scope(None, false);
        state.make_entity(
            self.var.clone(),
            EntityData::Variable(VariableData {
                ty: QualTy::new(elem_ty),
                value: None,
                decl: Some(self.span),
            }),
        );
        self.body.typecheck(state);
        state.pop_scope();
        Ty::Void
    }
}

impl ReturnExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let value_ty = self
            .value
            .as_ref()
            .map_or(Ty::Void, |value| value.typecheck(state));
        match &self.label {
            Some(label) => {
                if !label.path.is_simple()
                    || !state.has_function_scope(Some(label.path.last().as_str()))
                {
                    state.error(
                        label.span,
                        format!("no enclosing function named `{}`", label.path),
                    );
                }
            }
            None => {
                if !state.has_function_scope(None) {
                    state.error(self.span, "`return` outside of a function");
                }
            }
        }
        value_ty
    }
}

impl BlockExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        state.push_scope(None, false);
        let ty = self.list.check(state);
        state.pop_scope();
        ty
    }
}

impl ListExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        for expr in &self.exprs {
            expr.typecheck(state);
        }
        Ty::Void
    }
}

impl DebugExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        match self.probe.as_str() {
            "entities" => {
                let dump = state.scope_dump();
                state.note(self.span, format!("scope dump\n{dump}"));
            }
            other => {
                state.error(
                    self.span,
                    format!("unknown debug probe \"{other}\", valid probes: \"entities\""),
                );
            }
        }
        Ty::Unknown
    }
}

impl UsingExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let found = state
            .get_entity(&self.path.path, Some(EntityKind::Namespace), None, false)
            .or_else(|| state.get_entity(&self.path.path, Some(EntityKind::Class), None, false));
        match found {
            Some(id) => state.add_using(id),
            None => {
                if state
                    .get_entity(&self.path.path, None, None, false)
                    .is_some()
                {
                    state.error(
                        self.path.span,
                        format!("`{}` is not a namespace", self.path.path),
                    );
                } else {
                    state.error(
                        self.path.span,
                        format!("unknown namespace `{}`", self.path.path),
                    );
                }
            }
        }
        Ty::Void
    }
}

impl ImportExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        let path = state.source().search_dir().join(self.from.as_str());
        let source = match Source::from_file(&path) {
            Ok(source) => source,
            Err(err) => {
                state.error(self.span, err.to_string());
                return Ty::Void;
            }
        };
        let exports = state.project.check_unit(&source);

        let imported: Vec<EntityId> = if self.names.is_empty() {
            exports.iter().map(|(_, id)| *id).collect()
        } else {
            let mut imported = Vec::new();
            for name in &self.names {
                match exports.iter().find(|(full, _)| full.matches(&name.path)) {
                    Some((_, id)) => imported.push(*id),
                    None => state.error(
                        name.span,
                        format!("`{}` is not exported by \"{}\"", name.path, self.from),
                    ),
                }
            }
            imported
        };

        for id in imported {
            // Anonymous entities can never be exported
            let Some(name) = state.entities().get(id).name().cloned() else {
                continue;
            };
            if state
                .get_entity(&IdentPath::name(name.clone()), None, None, true)
                .is_some()
            {
                state.error(
                    self.span,
                    format!("`{name}` already exists in this scope"),
                );
            } else {
                let ns = state.current_namespace();
                state.entities_mut().insert_into(ns, name, id);
            }
        }
        Ty::Void
    }
}

impl ExportExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> Ty {
        if !state.is_root_scope() {
            state.error(self.span, "export statements may only appear at top level");
            return self.inner.typecheck(state);
        }
        let (ty, entity) = self.inner.typecheck_entity(state);
        match entity {
            Some(id) => {
                state.add_export(id);
                ty
            }
            None => {
                state.error(self.span, "only declarations are exportable");
                Ty::Unknown
            }
        }
    }
}

impl AttrExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> (Ty, Option<EntityId>) {
        if let Some(value) = &self.value {
            value.typecheck(state);
        }
        self.target.typecheck_entity(state)
    }
}

impl VarDeclExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> (Ty, Option<EntityId>) {
        let value_ty = self.value.as_ref().map(|value| value.typecheck(state));
        let declared = self.ty.as_ref().map(|ty| state.resolve_type(ty));

        if let (Some(declared), Some(value_ty)) = (&declared, &value_ty) {
            if !value_ty.convertible_to(declared) {
                let span = self.value.as_ref().map_or(self.span, |v| v.span());
                state.error(span, format!("expected type `{declared}`, got `{value_ty}`"));
            }
        }

        let ty = match declared.or(value_ty) {
            Some(ty) => ty,
            None => {
                state.error(
                    self.span,
                    format!("cannot infer the type of `{}`", self.name),
                );
                Ty::Unknown
            }
        };

        if state.check_collision(&self.name, self.span) {
            return (ty, None);
        }

        let const_value = if self.constant {
            match self.value.as_deref() {
                Some(Expr::Literal(lit)) => Some(lit.value.clone()),
                _ => None,
            }
        } else {
            None
        };
        let qual = if self.constant {
            QualTy::constant(ty.clone())
        } else {
            QualTy::new(ty.clone())
        };
        let id = state.make_entity(
            self.name.clone(),
            EntityData::Variable(VariableData {
                ty: qual,
                value: const_value,
                decl: Some(self.span),
            }),
        );
        (ty, Some(id))
    }
}

impl FunDeclExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> (Ty, Option<EntityId>) {
        let params: Vec<QualTy> = self
            .params
            .iter()
            .map(|param| match &param.ty {
                Some(annotation) => QualTy::new(state.resolve_type(annotation)),
                None => {
                    state.error(
                        param.span,
                        format!("parameter `{}` needs a type annotation", param.name),
                    );
                    QualTy::new(Ty::Unknown)
                }
            })
            .collect();
        let declared_ret = self.ret.as_ref().map(|ret| state.resolve_type(ret));
        let initial_ret = declared_ret.clone().unwrap_or(if self.expr_body {
            Ty::Unknown
        } else {
            Ty::Void
        });

        // Overloading is allowed; an identical signature or a non-function
        // with the same name is not.
        let path = IdentPath::name(self.name.clone());
        let conflict = match state.get_entity(&path, None, None, true) {
            Some(existing) if state.entities().get(existing).kind() != EntityKind::Function => {
                state.error(
                    self.span,
                    format!("`{}` already exists in this scope", self.name),
                );
                true
            }
            _ => {
                if state
                    .get_entity(&path, Some(EntityKind::Function), Some(&params), true)
                    .is_some()
                {
                    state.error(
                        self.span,
                        format!(
                            "function `{}` with this parameter list already exists in this scope",
                            self.name
                        ),
                    );
                    true
                } else {
                    false
                }
            }
        };

        let fun_ty = FunTy {
            params: params.clone(),
            ret: Box::new(initial_ret.clone()),
        };
        let id = if conflict {
            None
        } else {
            Some(state.make_entity(
                self.name.clone(),
                EntityData::Function(FunctionData {
                    ty: fun_ty,
                    decl: Some(self.span),
                }),
            ))
        };

        state.push_scope(Some(self.name.clone()), true);
        for (param, qual) in self.params.iter().zip(&params) {
            if state.check_collision(&param.name, param.span) {
                continue;
            }
            state.make_entity(
                param.name.clone(),
                EntityData::Variable(VariableData {
                    ty: qual.clone(),
                    value: None,
                    decl: Some(param.span),
                }),
            );
        }
        let body_ty = self.body.typecheck(state);
        state.pop_scope();

        let mut final_ret = initial_ret;
        if self.expr_body {
            match &declared_ret {
                Some(declared) => {
                    if !body_ty.convertible_to(declared) {
                        state.error(
                            self.body.span(),
                            format!("expected return type `{declared}`, got `{body_ty}`"),
                        );
                    }
                }
                None => {
                    // Infer the return type from the body
                    final_ret = body_ty;
                    if let Some(id) = id {
                        state.entities_mut().set_function_ret(id, final_ret.clone());
                    }
                }
            }
        }

        let ty = Ty::Function(FunTy {
            params,
            ret: Box::new(final_ret),
        });
        (ty, id)
    }
}

impl StructDeclExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> (Ty, Option<EntityId>) {
        if state.check_collision(&self.name, self.span) {
            return (Ty::Unknown, None);
        }
        let class = state.make_entity(
            self.name.clone(),
            EntityData::Class(ClassData {
                ns: NamespaceData::default(),
                ty: Ty::Unknown,
            }),
        );
        let class_ty = state
            .entities()
            .get(class)
            .type_of()
            .expect("the registration hook sets the class type");

        state.push_scope_in(class);
        for field in &self.fields {
            let ty = state.resolve_type(&field.ty);
            if state.check_collision(&field.name, field.span) {
                continue;
            }
            state.make_entity(
                field.name.clone(),
                EntityData::Variable(VariableData {
                    ty: QualTy::new(ty),
                    value: None,
                    decl: Some(field.span),
                }),
            );
        }
        for method in &self.methods {
            method.check(state);
        }
        state.pop_scope();

        (class_ty, Some(class))
    }
}

impl EnumDeclExpr {
    fn check(&self, state: &mut UnitChecker<'_>) -> (Ty, Option<EntityId>) {
        if state.check_collision(&self.name, self.span) {
            return (Ty::Unknown, None);
        }
        // Modeled as a class so variants live in the enum's namespace
        let entity = state.make_entity(
            self.name.clone(),
            EntityData::Class(ClassData {
                ns: NamespaceData::default(),
                ty: Ty::Unknown,
            }),
        );
        let ty = Ty::Enum(EnumTy {
            name: self.name.clone(),
            entity,
        });
        state.entities_mut().set_defined_type(entity, ty.clone());

        for variant in &self.variants {
            if state
                .entities()
                .get_local(entity, &variant.name, None, None)
                .is_some()
            {
                state.error(
                    variant.span,
                    format!("duplicate variant `{}`", variant.name),
                );
                continue;
            }
            state.entities_mut().make_entity(
                entity,
                Some(variant.name.clone()),
                EntityData::Variable(VariableData {
                    ty: QualTy::constant(ty.clone()),
                    value: None,
                    decl: Some(variant.span),
                }),
            );
        }
        (ty, Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::project::Project;
    use crate::source_analysis::{parse, Source};

    /// Parses and typechecks a source, returning error messages.
    fn check_source(text: &str) -> Vec<String> {
        let mut project = Project::new();
        let source = Source::new("test.ql", text, ".");
        project.check_unit(&source);
        project
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.message.to_string())
            .collect()
    }

    fn check_ok(text: &str) {
        let errors = check_source(text);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    /// Typechecks a single standalone expression and returns its type.
    fn expr_ty(text: &str) -> Ty {
        let source = Source::new("test.ql", text, ".");
        let (ast, diagnostics) = parse(&source);
        assert!(diagnostics.is_empty(), "parse errors: {diagnostics:?}");
        let ast = ast.unwrap();
        let mut project = Project::new();
        let mut checker = UnitChecker::new(&mut project, source, "test.ql".into());
        ast.list.exprs[0].typecheck(&mut checker)
    }

    #[test]
    fn literal_types() {
        assert_eq!(expr_ty("1;"), Ty::Int);
        assert_eq!(expr_ty("1.5;"), Ty::Float);
        assert_eq!(expr_ty("true;"), Ty::Bool);
        assert_eq!(expr_ty("\"s\";"), Ty::Str);
        assert_eq!(expr_ty("void;"), Ty::Void);
    }

    #[test]
    fn arithmetic_and_comparison() {
        assert_eq!(expr_ty("1 + 2 * 3 == 7;"), Ty::Bool);
        assert_eq!(expr_ty("1 + 2;"), Ty::Int);
        assert_eq!(expr_ty("-1 - -2;"), Ty::Int);
        assert_eq!(expr_ty("!true || false;"), Ty::Bool);
        assert_eq!(expr_ty("\"ab\" * 3;"), Ty::Str);
        assert_eq!(expr_ty("\"ab\"[0];"), Ty::Str);
    }

    #[test]
    fn type_mismatch_reports_once() {
        let errors = check_source("let x = 1 + true;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("cannot apply `+`"), "{errors:?}");
    }

    #[test]
    fn unknown_propagates_silently() {
        // One resolve error; the outer additions stay quiet
        let errors = check_source("let y = missing + 1 + 2;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("unknown identifier"), "{errors:?}");
    }

    #[test]
    fn variables_resolve_in_scope() {
        check_ok("let x = 1; let y = x + 2;");
    }

    #[test]
    fn block_scope_does_not_leak() {
        let errors = check_source("{ let inner = 1; }; let x = inner;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("unknown identifier `inner`"), "{errors:?}");
    }

    #[test]
    fn duplicate_declaration_is_an_error() {
        let errors = check_source("let x = 1; let x = 2;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("already exists"), "{errors:?}");
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        check_ok("let x = 1; { let x = \"s\"; let y = x + \"t\"; };");
    }

    #[test]
    fn assignment_rules() {
        check_ok("let x = 1; x = 2; x += 3;");
        let errors = check_source("const c = 1; c = 2;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("constant"), "{errors:?}");

        let errors = check_source("let x = 1; x = \"s\";");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("expected type `int`"), "{errors:?}");

        let errors = check_source("1 = 2;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("invalid assignment target"), "{errors:?}");
    }

    #[test]
    fn compound_assignment_uses_operator_table() {
        check_ok("let s = \"a\"; s += \"b\"; s *= 2;");
        let errors = check_source("let b = true; b += false;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("cannot apply `+`"), "{errors:?}");
    }

    #[test]
    fn declared_type_is_checked() {
        check_ok("let x: int = 1;");
        let errors = check_source("let x: int = \"s\";");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("expected type `int`"), "{errors:?}");

        let errors = check_source("let x: nosuch = 1;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("unknown type"), "{errors:?}");
    }

    #[test]
    fn functions_and_overloads() {
        check_ok(
            "fun f(x: int) -> int => x; fun f(s: str) -> str => s; \
             let a = f(1) + 1; let b = f(\"hi\") + \"!\";",
        );
    }

    #[test]
    fn duplicate_signature_is_an_error() {
        let errors = check_source("fun f(x: int) -> int => x; fun f(y: int) -> int => y;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("parameter list already exists"), "{errors:?}");
    }

    #[test]
    fn no_matching_overload_is_an_error() {
        let errors = check_source("fun f(x: int) -> int => x; let a = f(true);");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("no overload"), "{errors:?}");
    }

    #[test]
    fn expression_body_return_type_is_inferred() {
        check_ok("fun one() => 1; let x = one() + 1;");
        let errors = check_source("fun f() -> str => 1;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("expected return type `str`"), "{errors:?}");
    }

    #[test]
    fn recursion_sees_the_function_entity() {
        check_ok("fun fact(n: int) -> int { return fact(n - 1) * n; };");
    }

    #[test]
    fn conditions_must_be_bool() {
        check_ok("if 1 == 1 { }; while false { };");
        let errors = check_source("if 1 { };");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("bool"), "{errors:?}");
    }

    #[test]
    fn for_loops_iterate_strings() {
        check_ok("for ch in \"abc\" { let s = ch + \"!\"; };");
        let errors = check_source("for x in 5 { };");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("not iterable"), "{errors:?}");
    }

    #[test]
    fn return_requires_function() {
        let errors = check_source("return 1;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("outside of a function"), "{errors:?}");
    }

    #[test]
    fn labelled_return_matches_enclosing_function() {
        check_ok("fun outer() { fun inner() { return 1 from outer; }; };");
        let errors = check_source("fun f() { return 1 from zzz; };");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("no enclosing function named `zzz`"), "{errors:?}");
    }

    #[test]
    fn struct_members_and_methods() {
        check_ok(
            "struct Vec2 { x: float; y: float; fun sum() -> float => x + y; }\n\
             let v: Vec2;\n\
             let total = v.sum() + v.x;\n\
             v.x = 1.5;",
        );
        let errors = check_source("struct P { x: int; } let p: P; let q = p.nope;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("no member `nope`"), "{errors:?}");
    }

    #[test]
    fn member_lookup_does_not_walk_out() {
        // `outside` is in scope at the declaration site but is not a member
        let errors = check_source("let outside = 1; struct S { x: int; } let s: S; let y = s.outside;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("no member `outside`"), "{errors:?}");
    }

    #[test]
    fn enum_variants_resolve_through_the_scope_operator() {
        check_ok("enum Color { Red, Green, Blue } let c: Color = Color::Red;");
        let errors = check_source("enum E { A } let x: E = E::Nope;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("unknown identifier"), "{errors:?}");
    }

    #[test]
    fn using_brings_members_into_scope() {
        check_ok("struct Math { fun twice(x: int) -> int => x * 2; } using Math; let n = twice(4);");
        let errors = check_source("using nowhere;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("unknown namespace"), "{errors:?}");
    }

    #[test]
    fn export_requires_root_scope() {
        let errors = check_source("fun f() { export let x = 1; };");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("top level"), "{errors:?}");
    }

    #[test]
    fn export_requires_a_declaration() {
        let errors = check_source("export 1 + 2;");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("only declarations are exportable"), "{errors:?}");
    }

    #[test]
    fn debug_probe_dumps_entities() {
        let mut project = Project::new();
        let source = Source::new("test.ql", "let alpha = 1; @!debug(\"entities\");", ".");
        project.check_unit(&source);
        let notes: Vec<_> = project
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Note)
            .collect();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("alpha"), "{}", notes[0].message);
    }

    #[test]
    fn unknown_debug_probe_is_an_error() {
        let errors = check_source("@!debug(\"nope\");");
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("valid probes"), "{errors:?}");
    }

    #[test]
    fn attributes_pass_through_to_their_target() {
        check_ok("@inline fun f(x: int) -> int => x; let y = f(1);");
    }
}
