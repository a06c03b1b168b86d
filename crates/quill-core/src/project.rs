// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Shared project context.
//!
//! A [`Project`] owns everything that outlives a single source file: the
//! entity arena rooted at the global namespace (pre-seeded with the builtin
//! types and operator signatures), the diagnostic sink, and the unit cache
//! that makes imports memoized and cycle-safe.
//!
//! # Import cycles
//!
//! [`Project::check_unit`] marks a unit in-progress before checking it.
//! When an import chain re-enters a unit that is still being checked, the
//! cache serves that unit's *partial* export table instead of recursing —
//! so mutually-importing files settle in one pass with no deadlock and no
//! reparse.

use std::collections::HashMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::ast::Ast;
use crate::diagnostics::Diagnostic;
use crate::semantic_analysis::{
    Entities, EntityData, EntityId, FullPath, FunTy, FunctionData, QualTy, Ty, TypeData,
    UnitChecker,
};
use crate::source_analysis::{parse, Op, Source, SourceError};

/// The finalized result of checking one source file.
#[derive(Debug)]
pub struct ParsedSource {
    /// The source file.
    pub source: Arc<Source>,
    /// Its AST (empty when parsing failed).
    pub ast: Ast,
    /// Entities exported from the unit's root scope.
    pub exports: Vec<(FullPath, EntityId)>,
}

#[derive(Debug)]
enum UnitState {
    /// Currently being checked; exports accumulate as the pass runs.
    InProgress { exports: Vec<(FullPath, EntityId)> },
    /// Finished.
    Done(ParsedSource),
}

/// Project-wide compilation context.
#[derive(Debug)]
pub struct Project {
    entities: Entities,
    diagnostics: Vec<Diagnostic>,
    units: HashMap<Utf8PathBuf, UnitState>,
}

impl Project {
    /// Creates a project with builtin types and operator signatures seeded
    /// into the root namespace.
    #[must_use]
    pub fn new() -> Self {
        let mut project = Self {
            entities: Entities::new(),
            diagnostics: Vec::new(),
            units: HashMap::new(),
        };
        project.seed_builtins();
        project
    }

    /// The root namespace.
    #[must_use]
    pub fn root(&self) -> EntityId {
        self.entities.root()
    }

    /// The entity arena.
    #[must_use]
    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut Entities {
        &mut self.entities
    }

    /// All diagnostics reported so far, in order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drains the diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // ========================================================================
    // Units
    // ========================================================================

    /// Loads, parses, and checks a file, returning its exports.
    pub fn check_file(&mut self, path: &Utf8Path) -> Result<Vec<(FullPath, EntityId)>, SourceError> {
        let source = Source::from_file(path)?;
        Ok(self.check_unit(&source))
    }

    /// Parses and typechecks one source, memoized by path.
    ///
    /// Returns the unit's exports. A unit that is already being checked
    /// (an import cycle) returns its current, possibly partial, export
    /// table.
    pub fn check_unit(&mut self, source: &Arc<Source>) -> Vec<(FullPath, EntityId)> {
        let key = unit_key(source);
        match self.units.get(&key) {
            Some(UnitState::Done(parsed)) => return parsed.exports.clone(),
            Some(UnitState::InProgress { exports }) => return exports.clone(),
            None => {}
        }
        self.units.insert(
            key.clone(),
            UnitState::InProgress {
                exports: Vec::new(),
            },
        );

        let (ast, diagnostics) = parse(source);
        self.diagnostics.extend(diagnostics);
        let ast = ast.unwrap_or_else(Ast::empty);

        let mut checker = UnitChecker::new(self, source.clone(), key.clone());
        checker.check(&ast);

        let exports = match self.units.get(&key) {
            Some(UnitState::InProgress { exports }) => exports.clone(),
            _ => Vec::new(),
        };
        self.units.insert(
            key,
            UnitState::Done(ParsedSource {
                source: source.clone(),
                ast,
                exports: exports.clone(),
            }),
        );
        exports
    }

    /// The finished result for a source, if it has been checked.
    #[must_use]
    pub fn unit_for(&self, source: &Arc<Source>) -> Option<&ParsedSource> {
        match self.units.get(&unit_key(source)) {
            Some(UnitState::Done(parsed)) => Some(parsed),
            _ => None,
        }
    }

    pub(crate) fn add_export(&mut self, unit_key: &Utf8Path, path: FullPath, id: EntityId) {
        let Some(state) = self.units.get_mut(unit_key) else {
            debug_assert!(false, "export recorded for an unknown unit");
            return;
        };
        let exports = match state {
            UnitState::InProgress { exports } => exports,
            UnitState::Done(parsed) => &mut parsed.exports,
        };
        // Re-exporting the same path is idempotent
        if !exports.iter().any(|(existing, _)| *existing == path) {
            exports.push((path, id));
        }
    }

    // ========================================================================
    // Builtin operator signatures
    // ========================================================================

    /// The result type of a builtin binary operation, if one exists.
    #[must_use]
    pub fn binop_ty(&self, lhs: &Ty, op: Op, rhs: &Ty) -> Option<Ty> {
        self.builtin_ret(&binop_name(lhs, op, rhs))
    }

    /// The result type of a builtin unary operation, if one exists.
    #[must_use]
    pub fn unop_ty(&self, op: Op, operand: &Ty) -> Option<Ty> {
        self.builtin_ret(&unop_name(op, operand))
    }

    /// The element type of a builtin index operation, if one exists.
    #[must_use]
    pub fn index_ty(&self, object: &Ty, index: &Ty) -> Option<Ty> {
        self.builtin_ret(&index_name(object, index))
    }

    fn builtin_ret(&self, name: &str) -> Option<Ty> {
        let id = self
            .entities
            .get_local(self.entities.root(), name, None, None)?;
        match self.entities.get(id).data() {
            EntityData::Function(fun) => Some((*fun.ty.ret).clone()),
            _ => None,
        }
    }

    fn seed_builtins(&mut self) {
        let root = self.entities.root();
        for (name, ty) in [
            ("void", Ty::Void),
            ("bool", Ty::Bool),
            ("int", Ty::Int),
            ("float", Ty::Float),
            ("str", Ty::Str),
        ] {
            self.entities
                .make_entity(root, Some(name.into()), EntityData::Type(TypeData { ty }));
        }

        use Op::{Add, And, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Not, Or, Sub};
        use Ty::{Bool, Float, Int, Str, Void};

        let arithmetic = [Add, Sub, Mul, Div, Mod];
        let comparison = [Eq, Ne, Lt, Le, Gt, Ge];

        for op in arithmetic {
            self.seed_binop(Int, op, Int, Int);
            self.seed_binop(Float, op, Float, Float);
        }
        for op in comparison {
            self.seed_binop(Int, op, Int, Bool);
            self.seed_binop(Float, op, Float, Bool);
        }
        for op in [Eq, Ne] {
            self.seed_binop(Bool, op, Bool, Bool);
            self.seed_binop(Str, op, Str, Bool);
            self.seed_binop(Void, op, Void, Bool);
        }
        self.seed_binop(Str, Add, Str, Str);
        self.seed_binop(Str, Mul, Int, Str);
        self.seed_binop(Bool, And, Bool, Bool);
        self.seed_binop(Bool, Or, Bool, Bool);

        self.seed_unop(Sub, Int, Int);
        self.seed_unop(Add, Int, Int);
        self.seed_unop(Sub, Float, Float);
        self.seed_unop(Add, Float, Float);
        self.seed_unop(Not, Bool, Bool);

        self.seed_builtin_fun(index_name(&Str, &Int), vec![Str, Int], Str);
    }

    fn seed_binop(&mut self, lhs: Ty, op: Op, rhs: Ty, ret: Ty) {
        let name = binop_name(&lhs, op, &rhs);
        self.seed_builtin_fun(name, vec![lhs, rhs], ret);
    }

    fn seed_unop(&mut self, op: Op, operand: Ty, ret: Ty) {
        let name = unop_name(op, &operand);
        self.seed_builtin_fun(name, vec![operand], ret);
    }

    fn seed_builtin_fun(&mut self, name: String, params: Vec<Ty>, ret: Ty) {
        let root = self.entities.root();
        self.entities.make_entity(
            root,
            Some(name.into()),
            EntityData::Function(FunctionData {
                ty: FunTy {
                    params: params.into_iter().map(QualTy::new).collect(),
                    ret: Box::new(ret),
                },
                decl: None,
            }),
        );
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

/// The cache key for a source: its search directory joined with its name.
fn unit_key(source: &Arc<Source>) -> Utf8PathBuf {
    source.search_dir().join(source.name())
}

// Builtin operations are stored as root-namespace functions under mangled
// names that no user identifier can spell (identifiers cannot contain
// backticks or operator characters).
fn binop_name(lhs: &Ty, op: Op, rhs: &Ty) -> String {
    format!("@binop`{lhs}{op}{rhs}`")
}

fn unop_name(op: Op, operand: &Ty) -> String {
    format!("@unop`{op}{operand}`")
}

fn index_name(object: &Ty, index: &Ty) -> String {
    format!("@index`{object}[{index}]`")
}
