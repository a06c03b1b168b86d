// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Semantic analysis for Quill.
//!
//! The checker walks the AST of one source file at a time, resolving
//! identifiers through a stack of scopes backed by the project-wide entity
//! arena, computing a [`Ty`] for every expression, and recording root-scope
//! exports for other files to import.
//!
//! Scopes and namespaces are the same machinery: each scope frame owns an
//! (anonymous) namespace entity, so walking the entity parent chain *is*
//! walking the scope stack, and class bodies can push the class itself as
//! a scope. A frame additionally carries its `using` namespaces and a
//! function-boundary flag used by `return … from`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ecow::EcoString;

use crate::ast::{Ast, IdentPath};
use crate::diagnostics::Diagnostic;
use crate::project::Project;
use crate::source_analysis::{Source, Span};

pub mod entity;
pub mod ty;

mod typecheck;

pub use entity::{
    ClassData, Entities, Entity, EntityData, EntityId, EntityKind, FullPath, FunctionData,
    NamespaceData, TypeData, VariableData,
};
pub use ty::{EnumTy, FunTy, QualTy, StructTy, Ty};

/// One scope on the checker's stack.
#[derive(Debug)]
pub struct ScopeFrame {
    /// The namespace owning entities declared in this scope.
    pub namespace: EntityId,
    /// Namespaces added by `using` directives in this scope.
    pub usings: Vec<EntityId>,
    /// True for function-body scopes; `return` targets the innermost one.
    pub function_boundary: bool,
    /// The function name for labelled `return … from name`.
    pub label: Option<EcoString>,
}

/// Per-source-file semantic checker.
///
/// Holds the shared [`Project`] (entity arena, diagnostics, unit cache),
/// the current source, and the scope stack. Imports re-enter
/// [`Project::check_unit`] through this same type, recursively and on one
/// thread.
#[derive(Debug)]
pub struct UnitChecker<'p> {
    pub(crate) project: &'p mut Project,
    pub(crate) source: Arc<Source>,
    pub(crate) unit_key: Utf8PathBuf,
    scopes: Vec<ScopeFrame>,
}

impl<'p> UnitChecker<'p> {
    /// Creates a checker for one source file. The unit's root scope is a
    /// fresh anonymous namespace under the global root, so separate files
    /// do not collide while still sharing builtins.
    pub(crate) fn new(
        project: &'p mut Project,
        source: Arc<Source>,
        unit_key: Utf8PathBuf,
    ) -> Self {
        let root = project.entities().root();
        let unit_ns = project
            .entities_mut()
            .make_entity(root, None, EntityData::Namespace(NamespaceData::default()));
        Self {
            project,
            source,
            unit_key,
            scopes: vec![ScopeFrame {
                namespace: unit_ns,
                usings: Vec::new(),
                function_boundary: false,
                label: None,
            }],
        }
    }

    /// Typechecks a whole parsed file.
    pub(crate) fn check(&mut self, ast: &Ast) {
        for expr in &ast.list.exprs {
            expr.typecheck(self);
        }
    }

    /// The source being checked.
    #[must_use]
    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// The shared entity arena.
    #[must_use]
    pub fn entities(&self) -> &Entities {
        self.project.entities()
    }

    pub(crate) fn entities_mut(&mut self) -> &mut Entities {
        self.project.entities_mut()
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Pushes a fresh scope backed by a new anonymous namespace.
    pub fn push_scope(&mut self, label: Option<EcoString>, function_boundary: bool) {
        let parent = self.current_namespace();
        let ns = self
            .entities_mut()
            .make_entity(parent, None, EntityData::Namespace(NamespaceData::default()));
        self.scopes.push(ScopeFrame {
            namespace: ns,
            usings: Vec::new(),
            function_boundary,
            label,
        });
    }

    /// Pushes a scope whose namespace is an existing entity (a class body).
    pub fn push_scope_in(&mut self, namespace: EntityId) {
        self.scopes.push(ScopeFrame {
            namespace,
            usings: Vec::new(),
            function_boundary: false,
            label: None,
        });
    }

    /// Pops the innermost scope.
    ///
    /// # Panics
    ///
    /// Panics if only the unit root scope remains (internal error: pushes
    /// and pops are always paired by the checker).
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the unit root scope");
        self.scopes.pop();
    }

    /// True while checking at the top level of the unit.
    #[must_use]
    pub fn is_root_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// The namespace of the innermost scope.
    #[must_use]
    pub fn current_namespace(&self) -> EntityId {
        self.scopes
            .last()
            .expect("scope stack is never empty")
            .namespace
    }

    /// Adds a namespace to unqualified lookup in the current scope.
    pub fn add_using(&mut self, ns: EntityId) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .usings
            .push(ns);
    }

    /// All `using` namespaces visible here, innermost scope first.
    #[must_use]
    pub fn active_usings(&self) -> Vec<EntityId> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.usings.iter().copied())
            .collect()
    }

    /// The scope frames, outermost first. Used by the `@!debug` probe.
    #[must_use]
    pub fn scopes(&self) -> &[ScopeFrame] {
        &self.scopes
    }

    // ========================================================================
    // Entity access
    // ========================================================================

    /// Registers a new entity in the current scope.
    pub fn make_entity(&mut self, name: EcoString, data: EntityData) -> EntityId {
        let ns = self.current_namespace();
        self.entities_mut().make_entity(ns, Some(name), data)
    }

    /// Resolves a path from the current scope.
    ///
    /// With `local_only` the search is restricted to the innermost scope's
    /// namespace (used for duplicate and import-collision checks).
    #[must_use]
    pub fn get_entity(
        &self,
        path: &IdentPath,
        kind: Option<EntityKind>,
        params: Option<&[QualTy]>,
        local_only: bool,
    ) -> Option<EntityId> {
        if local_only {
            if !path.is_simple() {
                return None;
            }
            return self
                .entities()
                .get_local(self.current_namespace(), path.last(), kind, params);
        }
        let usings = self.active_usings();
        self.entities()
            .resolve(self.current_namespace(), path, &usings, kind, params)
    }

    /// Finds the innermost function-boundary scope, optionally requiring a
    /// matching label. Returns true if one exists.
    #[must_use]
    pub fn has_function_scope(&self, label: Option<&str>) -> bool {
        self.scopes.iter().rev().any(|frame| {
            frame.function_boundary
                && match label {
                    Some(name) => frame.label.as_deref() == Some(name),
                    None => true,
                }
        })
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Reports an error at `span`.
    pub fn error(&mut self, span: Span, message: impl Into<EcoString>) {
        let diag = Diagnostic::error(self.source.clone(), message, span);
        self.project.report(diag);
    }

    /// Reports a warning at `span`.
    pub fn warn(&mut self, span: Span, message: impl Into<EcoString>) {
        let diag = Diagnostic::warning(self.source.clone(), message, span);
        self.project.report(diag);
    }

    /// Reports a note at `span`.
    pub fn note(&mut self, span: Span, message: impl Into<EcoString>) {
        let diag = Diagnostic::note(self.source.clone(), message, span);
        self.project.report(diag);
    }

    // ========================================================================
    // Exports
    // ========================================================================

    /// Records a root-scope entity in this unit's export table,
    /// deduplicated by full path.
    pub(crate) fn add_export(&mut self, id: EntityId) {
        let path = self.entities().full_path(id);
        self.project.add_export(&self.unit_key, path, id);
    }

    /// Renders the scope stack for the `entities` debug probe.
    #[must_use]
    pub fn scope_dump(&self) -> String {
        let mut out = String::new();
        for (i, frame) in self.scopes.iter().enumerate() {
            out.push_str(&format!("scope {i}\n"));
            let Some(ns) = self.entities().get(frame.namespace).as_namespace() else {
                continue;
            };
            let mut names: Vec<String> = ns
                .entries
                .values()
                .flatten()
                .map(|&id| self.entities().full_path(id).to_string())
                .collect();
            names.sort_unstable();
            for name in names {
                out.push_str(&format!("  {name}\n"));
            }
        }
        out
    }
}
