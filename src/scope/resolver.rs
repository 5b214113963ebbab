//! Name Resolver - Resolves names to declarations
//!
//! Resolution algorithm:
//! 1. Qualified name → resolve aliases in the qualifier, then search only
//!    the named scope it denotes (plus its wildcard imports)
//! 2. Unqualified name → walk outward through scopes; the first scope with
//!    any match wins (inner declarations shadow outer ones, never pooled)
//! 3. At each scope, imports are consulted when the scope itself has no
//!    declaration of that name
//! 4. A function definition hides its own forward declarations
//!
//! Alias resolution for partially qualified names is best-effort: import
//! aliases, single-name imports, typedefs to records, short class and
//! namespace names and wildcard imports are tried in that order.

use super::graph::ScopeId;
use super::manager::ScopeManager;
use crate::name::{DEFAULT_DELIMITER, Name};
use crate::node::{DeclarationClass, Node, NodeId, NodeKind};
use crate::types::{ObjectType, Type, TypeHierarchy};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Guard against typedef cycles (`typedef A B; typedef B A;`)
const MAX_TYPEDEF_DEPTH: usize = 16;

/// Cache of single-candidate reference resolutions, keyed by name, scope
/// and the referring language (its function visibility differs).
///
/// Written only through `&mut ScopeManager` while references are resolved,
/// and cleared whenever a declaration is added or managers are merged.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<(Name, ScopeId, String), NodeId>,
}

impl ResolutionCache {
    pub fn get(&self, name: &Name, scope: ScopeId, language: &str) -> Option<NodeId> {
        self.entries.get(&(name.clone(), scope, language.to_string())).copied()
    }

    pub fn insert(&mut self, name: Name, scope: ScopeId, language: &str, decl: NodeId) {
        self.entries.insert((name, scope, language.to_string()), decl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScopeManager {
    /// Declarations visible as `name` from `scope` (global if `None`)
    pub fn find_symbols(&self, name: &Name, scope: Option<ScopeId>) -> Vec<NodeId> {
        self.find_symbols_where(name, scope, |_| true)
    }

    /// Like `find_symbols`, keeping only declarations accepted by `predicate`
    pub fn find_symbols_where(
        &self,
        name: &Name,
        scope: Option<ScopeId>,
        predicate: impl Fn(&Node) -> bool,
    ) -> Vec<NodeId> {
        let start = scope.unwrap_or(self.global.id);
        let local = name.local_name();

        let matches = match name.parent() {
            Some(qualifier) => {
                let qualifier = self.resolve_name_alias(&qualifier, start);
                match self.lookup_qualified(&qualifier, start) {
                    Some(target) => self.symbols_at(target, local, &predicate),
                    None => {
                        warn!("No scope named {} (resolving {})", qualifier, name);
                        Vec::new()
                    }
                }
            }
            None => self
                .scope_chain(start)
                .map(|s| self.symbols_at(s.id, local, &predicate))
                .find(|found| !found.is_empty())
                .unwrap_or_default(),
        };

        self.prefer_definitions(matches)
    }

    /// Resolve a reference node to a single declaration.
    ///
    /// Functions are only candidates when the reference expects a function
    /// pointer or its language has first-class functions.
    pub fn resolve_reference(&mut self, reference: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(reference)?;
        let NodeKind::Reference(expr) = &node.kind else {
            return None;
        };
        let name = node.name.clone();
        let scope = node.scope.unwrap_or(self.global.id);
        let helper = expr.helper.clone();
        let language = node.language.name.clone();
        let allow_functions =
            node.language.first_class_functions || matches!(helper, Some(Type::FunctionPointer { .. }));

        if helper.is_none() {
            if let Some(hit) = self.cache.get(&name, scope, &language) {
                return Some(hit);
            }
        }

        let candidates = self.find_symbols_where(&name, Some(scope), |decl| {
            matches!(
                decl.kind.declaration_class(),
                Some(DeclarationClass::Value | DeclarationClass::Structure)
            ) && (allow_functions || !decl.is_function())
        });

        let resolved = match &helper {
            Some(Type::FunctionPointer { parameters, .. }) => {
                let wanted: Vec<Type> = parameters.iter().map(|p| self.resolve_type(p, scope)).collect();
                candidates
                    .iter()
                    .copied()
                    .find(|c| self.resolved_parameter_types(*c) == wanted)
                    .or_else(|| candidates.first().copied())
            }
            _ => candidates.first().copied(),
        };

        if helper.is_none() && candidates.len() == 1 {
            if let Some(decl) = resolved {
                self.cache.insert(name.clone(), scope, &language, decl);
            }
        }
        debug!("Reference {} {} → {:?}", reference, name, resolved);
        resolved
    }

    /// Type aliased as `alias`, searching outward from `scope`
    pub fn typedef_for(&self, alias: &str, scope: Option<ScopeId>) -> Option<Type> {
        let start = scope.unwrap_or(self.global.id);
        self.scope_chain(start).find_map(|s| s.typedef(alias).cloned())
    }

    /// Expand typedefs and bind object types to their record declarations
    pub fn resolve_type(&self, ty: &Type, scope: ScopeId) -> Type {
        self.resolve_type_bounded(ty, scope, 0)
    }

    /// Declared parameter types of a function, resolved in its own scope
    pub fn resolved_parameter_types(&self, function: NodeId) -> Vec<Type> {
        let scope = self
            .lookup_scope(function)
            .or_else(|| self.nodes.get(function).and_then(|n| n.scope))
            .unwrap_or(self.global.id);
        self.nodes
            .parameter_types(function)
            .iter()
            .map(|t| self.resolve_type(t, scope))
            .collect()
    }

    /// Inheritance hierarchy of every record, with base types bound to FQNs
    pub fn type_hierarchy(&self) -> TypeHierarchy {
        let mut records = HashMap::new();
        let mut edges = Vec::new();
        for node in self.nodes.iter() {
            let NodeKind::Record { supertypes, .. } = &node.kind else {
                continue;
            };
            let scope = node.scope.unwrap_or(self.global.id);
            let supers: Vec<Name> = supertypes
                .iter()
                .filter_map(|t| self.resolve_type(t, scope).root_object().map(|o| o.name.clone()))
                .collect();
            records.entry(node.name.clone()).or_insert(node.id);
            edges.push((node.name.clone(), supers));
        }
        TypeHierarchy::with_records(edges, records)
    }

    /// Replace aliases in `name` by the FQN they stand for (best-effort)
    pub fn resolve_name_alias(&self, name: &Name, scope: ScopeId) -> Name {
        match name.parent() {
            None => self
                .alias_target(name.local_name(), scope)
                .unwrap_or_else(|| name.clone()),
            Some(parent) => {
                let parent = self.resolve_name_alias(&parent, scope);
                // `Outer::Alias` where `Alias` is a typedef inside `Outer`
                let class_typedef = self
                    .lookup_qualified(&parent, scope)
                    .and_then(|s| self.scope(s)?.typedef(name.local_name()))
                    .and_then(|t| t.root_object().map(|o| o.name.clone()));
                class_typedef.unwrap_or_else(|| parent.child(name.local_name()).with_delimiter(name.delimiter()))
            }
        }
    }

    /// Named scope denoted by `qualifier`, tried relative to every enclosing
    /// named scope, innermost first, then as an absolute name
    pub fn lookup_qualified(&self, qualifier: &Name, start: ScopeId) -> Option<ScopeId> {
        self.scope_chain(start)
            .filter(|s| s.kind.is_named())
            .filter_map(|s| s.name.as_ref())
            .find_map(|base| self.lookup_scope_by_fqn(&base.join(qualifier)))
            .or_else(|| self.lookup_scope_by_fqn(qualifier))
    }

    /// What an unqualified `local` stands for when used as a qualifier
    fn alias_target(&self, local: &str, start: ScopeId) -> Option<Name> {
        for scope in self.scope_chain(start) {
            for import in scope.imports().iter().filter_map(|i| self.import_of(*i)) {
                if import.alias.as_deref() == Some(local) {
                    return Some(import.target.clone());
                }
                if !import.wildcard && import.alias.is_none() && import.target.local_name() == local {
                    return Some(import.target.clone());
                }
            }

            if let Some(object) = scope.typedef(local).and_then(|t| t.root_object()) {
                return Some(object.name.clone());
            }

            let named = scope
                .symbols(local)
                .iter()
                .filter_map(|d| self.nodes.get(*d))
                .find(|d| matches!(d.kind, NodeKind::Namespace | NodeKind::Record { .. }));
            if let Some(decl) = named {
                // Declared but never entered: qualify by hand
                return Some(match self.lookup_scope(decl.id).and_then(|s| self.scope(s)?.name.clone()) {
                    Some(fqn) => fqn,
                    None => scope
                        .name
                        .clone()
                        .unwrap_or_else(|| Name::root(DEFAULT_DELIMITER))
                        .child(local),
                });
            }

            for import in scope.imports().iter().filter_map(|i| self.import_of(*i)) {
                if import.wildcard {
                    let candidate = import.target.child(local);
                    if self.lookup_scope_by_fqn(&candidate).is_some() {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Matches for `local` declared in `scope`, falling back to its imports
    fn symbols_at(&self, scope: ScopeId, local: &str, predicate: &impl Fn(&Node) -> bool) -> Vec<NodeId> {
        let Some(s) = self.scope(scope) else {
            return Vec::new();
        };
        let direct = self.accepted(s.symbols(local), predicate);
        if !direct.is_empty() {
            return direct;
        }

        let mut imported = Vec::new();
        for import in s.imports().iter().filter_map(|i| self.import_of(*i)) {
            let found = if import.wildcard {
                self.lookup_scope_by_fqn(&import.target)
                    .and_then(|t| self.scope(t))
                    .map(|t| self.accepted(t.symbols(local), predicate))
            } else if import.alias.as_deref() == Some(local)
                || (import.alias.is_none() && import.target.local_name() == local)
            {
                let parent = import.target.parent().unwrap_or_else(|| Name::root(DEFAULT_DELIMITER));
                self.lookup_scope_by_fqn(&parent)
                    .and_then(|t| self.scope(t))
                    .map(|t| self.accepted(t.symbols(import.target.local_name()), predicate))
            } else {
                None
            };
            for decl in found.unwrap_or_default() {
                if !imported.contains(&decl) {
                    imported.push(decl);
                }
            }
        }
        imported
    }

    fn accepted(&self, decls: &[NodeId], predicate: &impl Fn(&Node) -> bool) -> Vec<NodeId> {
        decls
            .iter()
            .copied()
            .filter(|d| self.nodes.get(*d).is_some_and(predicate))
            .collect()
    }

    fn import_of(&self, id: NodeId) -> Option<&crate::node::ImportDecl> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Import(import) => Some(import),
            _ => None,
        }
    }

    /// Drop forward declarations shadowed by a definition of the same
    /// signature, and repeated forward declarations of one signature
    pub(crate) fn prefer_definitions(&self, matches: Vec<NodeId>) -> Vec<NodeId> {
        let definitions: Vec<(Option<NodeId>, Vec<Type>)> = matches
            .iter()
            .filter_map(|m| self.nodes.get(*m).and_then(Node::as_function).map(|f| (*m, f)))
            .filter(|(_, f)| f.is_definition)
            .map(|(m, f)| (f.record, self.nodes.parameter_types(m)))
            .collect();

        let mut seen: Vec<(Option<NodeId>, Vec<Type>)> = Vec::new();
        matches
            .into_iter()
            .filter(|m| {
                let Some(function) = self.nodes.get(*m).and_then(Node::as_function) else {
                    return true;
                };
                if function.is_definition {
                    return true;
                }
                let signature = (function.record, self.nodes.parameter_types(*m));
                if definitions.iter().any(|(_, p)| *p == signature.1) || seen.contains(&signature) {
                    return false;
                }
                seen.push(signature);
                true
            })
            .collect()
    }

    fn resolve_type_bounded(&self, ty: &Type, scope: ScopeId, depth: usize) -> Type {
        if depth > MAX_TYPEDEF_DEPTH {
            return ty.clone();
        }
        match ty {
            Type::Object(object) => {
                if object.generics.is_empty() && !object.name.is_qualified() {
                    if let Some(target) = self.typedef_for(object.name.local_name(), Some(scope)) {
                        return self.resolve_type_bounded(&target, scope, depth + 1);
                    }
                }
                let generics: Vec<Type> = object
                    .generics
                    .iter()
                    .map(|g| self.resolve_type_bounded(g, scope, depth + 1))
                    .collect();
                let record = self
                    .find_symbols_where(&object.name, Some(scope), Node::is_record)
                    .first()
                    .and_then(|r| self.nodes.get(*r));
                match record {
                    Some(record) => Type::Object(
                        ObjectType::new(record.name.clone())
                            .with_generics(generics)
                            .with_record(record.id),
                    ),
                    None => Type::Object(ObjectType {
                        name: object.name.clone(),
                        generics,
                        record: object.record,
                    }),
                }
            }
            Type::Pointer { element, origin } => Type::Pointer {
                element: Box::new(self.resolve_type_bounded(element, scope, depth + 1)),
                origin: *origin,
            },
            Type::Reference { element } => Type::Reference {
                element: Box::new(self.resolve_type_bounded(element, scope, depth + 1)),
            },
            Type::FunctionPointer { parameters, return_type } => Type::FunctionPointer {
                parameters: parameters
                    .iter()
                    .map(|p| self.resolve_type_bounded(p, scope, depth + 1))
                    .collect(),
                return_type: Box::new(self.resolve_type_bounded(return_type, scope, depth + 1)),
            },
            Type::Tuple { elements } => Type::Tuple {
                elements: elements
                    .iter()
                    .map(|e| self.resolve_type_bounded(e, scope, depth + 1))
                    .collect(),
            },
            _ => ty.clone(),
        }
    }
}
