// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The entity model: the hierarchical symbol table.
//!
//! Entities live in one arena owned by the project; an [`EntityId`] is a
//! handle into it. Parent links are ids too, never ownership, so a child
//! namespace can refer back to its container without cycles. A
//! [`NamespaceData`] maps each name to a *list* of entities — that multi-map
//! is what makes function overloading work: lookup resolves the list with
//! kind and parameter-signature filters instead of rejecting duplicates at
//! insert time.
//!
//! Classes are namespace specializations: a class owns its members the way
//! a namespace owns entities, and additionally carries its own nominal
//! type. That type can only be created once the class's id exists, so
//! [`Entities::make_entity`] runs a registration hook after allocation and
//! before the entity is inserted into its parent.

use std::collections::HashMap;
use std::fmt;

use ecow::EcoString;

use crate::ast::IdentPath;
use crate::source_analysis::{Lit, Span};

use super::ty::{FunTy, QualTy, StructTy, Ty};

/// Handle to an entity in the project arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u32);

impl EntityId {
    /// Builds an id from a raw index. Mostly useful in tests.
    #[must_use]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind tag of an entity, used as a lookup filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A variable binding.
    Variable,
    /// A function.
    Function,
    /// A type alias or builtin type.
    Type,
    /// A plain namespace.
    Namespace,
    /// A class: a namespace that is also a type.
    Class,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Variable => "variable",
            Self::Function => "function",
            Self::Type => "type",
            Self::Namespace => "namespace",
            Self::Class => "class",
        })
    }
}

/// Payload of a variable entity.
#[derive(Debug, Clone)]
pub struct VariableData {
    /// The declared type with qualifiers.
    pub ty: QualTy,
    /// The compile-time value, when the variable is a const with a literal
    /// initializer.
    pub value: Option<Lit>,
    /// Where the variable was declared.
    pub decl: Option<Span>,
}

/// Payload of a function entity.
#[derive(Debug, Clone)]
pub struct FunctionData {
    /// The function type.
    pub ty: FunTy,
    /// Where the function was declared; `None` for builtins.
    pub decl: Option<Span>,
}

/// Payload of a type entity.
#[derive(Debug, Clone)]
pub struct TypeData {
    /// The aliased type.
    pub ty: Ty,
}

/// Payload of a namespace entity: the name → entities multi-map.
#[derive(Debug, Clone, Default)]
pub struct NamespaceData {
    /// Entities by name; overloaded functions share one key.
    pub entries: HashMap<EcoString, Vec<EntityId>>,
    /// True only for the root namespace.
    pub is_global: bool,
}

/// Payload of a class entity: namespace data plus the class's own type.
#[derive(Debug, Clone)]
pub struct ClassData {
    /// Member entities.
    pub ns: NamespaceData,
    /// The nominal type this class defines. Set by the registration hook
    /// in [`Entities::make_entity`], since it needs the class's own id.
    pub ty: Ty,
}

/// Kind-specific entity payload.
#[derive(Debug, Clone)]
pub enum EntityData {
    /// A variable binding.
    Variable(VariableData),
    /// A function.
    Function(FunctionData),
    /// A type alias or builtin type.
    Type(TypeData),
    /// A namespace.
    Namespace(NamespaceData),
    /// A class.
    Class(ClassData),
}

/// A named semantic object residing in a namespace.
#[derive(Debug, Clone)]
pub struct Entity {
    name: Option<EcoString>,
    parent: Option<EntityId>,
    data: EntityData,
}

impl Entity {
    /// The entity's name; anonymous scope namespaces have none.
    #[must_use]
    pub fn name(&self) -> Option<&EcoString> {
        self.name.as_ref()
    }

    /// The owning namespace; `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// The kind tag.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match &self.data {
            EntityData::Variable(_) => EntityKind::Variable,
            EntityData::Function(_) => EntityKind::Function,
            EntityData::Type(_) => EntityKind::Type,
            EntityData::Namespace(_) => EntityKind::Namespace,
            EntityData::Class(_) => EntityKind::Class,
        }
    }

    /// The kind-specific payload.
    #[must_use]
    pub fn data(&self) -> &EntityData {
        &self.data
    }

    /// Namespace view of this entity, for namespaces and classes.
    #[must_use]
    pub fn as_namespace(&self) -> Option<&NamespaceData> {
        match &self.data {
            EntityData::Namespace(ns) => Some(ns),
            EntityData::Class(class) => Some(&class.ns),
            _ => None,
        }
    }

    fn as_namespace_mut(&mut self) -> Option<&mut NamespaceData> {
        match &mut self.data {
            EntityData::Namespace(ns) => Some(ns),
            EntityData::Class(class) => Some(&mut class.ns),
            _ => None,
        }
    }

    /// The type a reference to this entity evaluates to, if it is a value.
    #[must_use]
    pub fn value_ty(&self) -> Option<QualTy> {
        match &self.data {
            EntityData::Variable(var) => Some(var.ty.clone()),
            EntityData::Function(fun) => {
                Some(QualTy::constant(Ty::Function(fun.ty.clone())))
            }
            _ => None,
        }
    }

    /// The type this entity names, if it is a type.
    #[must_use]
    pub fn type_of(&self) -> Option<Ty> {
        match &self.data {
            EntityData::Type(data) => Some(data.ty.clone()),
            EntityData::Class(class) => Some(class.ty.clone()),
            _ => None,
        }
    }
}

/// A fully-resolved absolute entity path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullPath {
    /// The named segments from the root down, excluding anonymous scopes.
    pub segments: Vec<EcoString>,
}

impl FullPath {
    /// The final segment.
    #[must_use]
    pub fn last(&self) -> Option<&EcoString> {
        self.segments.last()
    }

    /// Whether this path ends with the segments of `path`; used to match a
    /// requested import name against an export table entry.
    #[must_use]
    pub fn matches(&self, path: &IdentPath) -> bool {
        self.segments.len() >= path.segments.len()
            && self
                .segments
                .iter()
                .rev()
                .zip(path.segments.iter().rev())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for FullPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "::{segment}")?;
        }
        Ok(())
    }
}

/// The project-wide entity arena.
#[derive(Debug)]
pub struct Entities {
    arena: Vec<Entity>,
    root: EntityId,
}

impl Entities {
    /// Creates an arena containing only the root namespace.
    #[must_use]
    pub fn new() -> Self {
        let root = Entity {
            name: None,
            parent: None,
            data: EntityData::Namespace(NamespaceData {
                entries: HashMap::new(),
                is_global: true,
            }),
        };
        Self {
            arena: vec![root],
            root: EntityId(0),
        }
    }

    /// The root namespace.
    #[must_use]
    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Looks up an entity by id.
    ///
    /// # Panics
    ///
    /// Panics on a dangling id, which would be an internal error — ids are
    /// only produced by this arena and never removed.
    #[must_use]
    pub fn get(&self, id: EntityId) -> &Entity {
        &self.arena[id.index()]
    }

    fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.arena[id.index()]
    }

    /// Allocates an entity, runs its type-registration hook, and inserts it
    /// into `parent` (anonymous entities are allocated but not mapped).
    ///
    /// The hook runs between allocation and insertion because a class's
    /// nominal type refers to the class's own id, which does not exist
    /// until after allocation.
    pub fn make_entity(
        &mut self,
        parent: EntityId,
        name: Option<EcoString>,
        data: EntityData,
    ) -> EntityId {
        let id = EntityId(u32::try_from(self.arena.len()).expect("entity arena overflow"));
        self.arena.push(Entity {
            name: name.clone(),
            parent: Some(parent),
            data,
        });
        self.apply_type_definition(id);
        if let Some(name) = name {
            self.insert_into(parent, name, id);
        }
        id
    }

    /// The post-allocation registration hook.
    fn apply_type_definition(&mut self, id: EntityId) {
        let entity = self.get(id);
        if let EntityData::Class(_) = &entity.data {
            let name = entity.name.clone().unwrap_or_else(|| "<anonymous>".into());
            let ty = Ty::Struct(StructTy { name, entity: id });
            if let EntityData::Class(class) = &mut self.get_mut(id).data {
                class.ty = ty;
            }
        }
    }

    /// Replaces a function entity's return type. Used when an `=>` body
    /// without an annotation has its return type inferred after the entity
    /// was registered.
    pub(crate) fn set_function_ret(&mut self, id: EntityId, ret: Ty) {
        if let EntityData::Function(fun) = &mut self.get_mut(id).data {
            fun.ty.ret = Box::new(ret);
        } else {
            debug_assert!(false, "set_function_ret on a non-function entity");
        }
    }

    /// Overrides the type a class or type entity defines. Used by enum
    /// declarations, whose nominal type also needs the entity's own id.
    pub fn set_defined_type(&mut self, id: EntityId, ty: Ty) {
        match &mut self.get_mut(id).data {
            EntityData::Class(class) => class.ty = ty,
            EntityData::Type(data) => data.ty = ty,
            _ => debug_assert!(false, "set_defined_type on a non-type entity"),
        }
    }

    /// Maps `name` to an existing entity inside `ns`, without changing the
    /// entity's owner. This is how imports bring foreign entities into
    /// scope.
    ///
    /// # Panics
    ///
    /// Panics if `ns` is not a namespace or class (internal error).
    pub fn insert_into(&mut self, ns: EntityId, name: EcoString, id: EntityId) {
        self.get_mut(ns)
            .as_namespace_mut()
            .expect("insert target must be a namespace")
            .entries
            .entry(name)
            .or_default()
            .push(id);
    }

    /// Looks a name up in one namespace only, applying the kind and
    /// parameter-signature filters. No outward walk.
    #[must_use]
    pub fn get_local(
        &self,
        ns: EntityId,
        name: &str,
        kind: Option<EntityKind>,
        params: Option<&[QualTy]>,
    ) -> Option<EntityId> {
        let data = self.get(ns).as_namespace()?;
        let candidates = data.entries.get(name)?;
        candidates
            .iter()
            .copied()
            .find(|&id| self.matches_filters(id, kind, params))
    }

    fn matches_filters(
        &self,
        id: EntityId,
        kind: Option<EntityKind>,
        params: Option<&[QualTy]>,
    ) -> bool {
        let entity = self.get(id);
        if let Some(kind) = kind {
            if entity.kind() != kind {
                return false;
            }
        }
        if let Some(params) = params {
            let EntityData::Function(fun) = &entity.data else {
                return false;
            };
            if fun.ty.params.len() != params.len()
                || !fun
                    .ty
                    .params
                    .iter()
                    .zip(params)
                    .all(|(a, b)| a.ty == b.ty)
            {
                return false;
            }
        }
        true
    }

    /// Resolves a path from a starting namespace.
    ///
    /// Absolute paths (leading `::`, or a leading `root` segment) start at
    /// the root namespace. Relative paths walk outward from `start`
    /// through the parent chain to the root, then try each `using`
    /// namespace. First match wins.
    #[must_use]
    pub fn resolve(
        &self,
        start: EntityId,
        path: &IdentPath,
        usings: &[EntityId],
        kind: Option<EntityKind>,
        params: Option<&[QualTy]>,
    ) -> Option<EntityId> {
        // `root::x` is an absolute path spelled with the special ident
        let rooted_segments = (!path.absolute
            && path.segments.len() > 1
            && path.segments[0] == "root")
            .then(|| &path.segments[1..]);

        if path.absolute || rooted_segments.is_some() {
            let segments = rooted_segments.unwrap_or(&path.segments);
            return self.resolve_segments(self.root, segments, kind, params);
        }

        let mut current = Some(start);
        while let Some(ns) = current {
            if let Some(found) = self.resolve_segments(ns, &path.segments, kind, params) {
                return Some(found);
            }
            current = self.get(ns).parent();
        }
        usings
            .iter()
            .find_map(|&ns| self.resolve_segments(ns, &path.segments, kind, params))
    }

    fn resolve_segments(
        &self,
        ns: EntityId,
        segments: &[EcoString],
        kind: Option<EntityKind>,
        params: Option<&[QualTy]>,
    ) -> Option<EntityId> {
        let (last, prefix) = segments.split_last()?;
        let mut current = ns;
        for segment in prefix {
            current = self.get_local(current, segment, None, None)?;
            self.get(current).as_namespace()?;
        }
        self.get_local(current, last, kind, params)
    }

    /// A class member variable. Member lookup never walks outward.
    #[must_use]
    pub fn class_member(&self, class: EntityId, name: &str) -> Option<EntityId> {
        self.get_local(class, name, Some(EntityKind::Variable), None)
    }

    /// A class member function, optionally filtered by parameter types.
    #[must_use]
    pub fn class_member_function(
        &self,
        class: EntityId,
        name: &str,
        params: Option<&[QualTy]>,
    ) -> Option<EntityId> {
        self.get_local(class, name, Some(EntityKind::Function), params)
    }

    /// The absolute path of an entity: named ancestors from the root down.
    #[must_use]
    pub fn full_path(&self, id: EntityId) -> FullPath {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let entity = self.get(c);
            if let Some(name) = entity.name() {
                segments.push(name.clone());
            }
            current = entity.parent();
        }
        segments.reverse();
        FullPath { segments }
    }
}

impl Default for Entities {
    fn default() -> Self {
        Self::new()
    }
}
