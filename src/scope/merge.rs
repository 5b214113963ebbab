//! Merging per-unit scope managers
//!
//! Translation units are processed in parallel, each into a private
//! `ScopeManager`. The managers are then folded into one, single-threaded:
//! - node stores are moved (ids are process-unique, nothing is renumbered)
//! - global symbols and typedefs are appended
//! - named scopes sharing an FQN are coalesced into the existing one, the
//!   last seen AST node wins the back-link
//! - every other scope is moved under its (possibly redirected) parent
//! - node → scope associations pointing at a superseded scope are redirected

use super::graph::{Scope, ScopeId, ScopeKind};
use super::manager::ScopeManager;
use crate::node::{Node, NodeId, NodeKind};
use crate::types::Type;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::mem;
use tracing::debug;

/// Counters reported after a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Units merged into this manager
    pub units: usize,
    /// Scopes moved over as-is
    pub moved: usize,
    /// Named scopes folded into an existing scope with the same FQN
    pub coalesced: usize,
}

impl ScopeManager {
    /// Fold `others` into this manager, consuming them
    pub fn merge_from(&mut self, others: Vec<ScopeManager>) -> MergeStats {
        let mut stats = MergeStats::default();
        for other in others {
            self.merge_one(other, &mut stats);
            stats.units += 1;
        }
        self.cache.clear();
        debug!(
            "Merged {} units: {} scopes moved, {} coalesced",
            stats.units, stats.moved, stats.coalesced
        );
        stats
    }

    fn merge_one(&mut self, other: ScopeManager, stats: &mut MergeStats) {
        let ScopeManager {
            nodes,
            global,
            mut scopes,
            node_scopes,
            diagnostics,
            ..
        } = other;

        let moved_nodes: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        self.nodes.absorb(nodes);

        let mut redirect: HashMap<ScopeId, ScopeId> = HashMap::new();
        redirect.insert(global.id, self.global.id);
        let global_id = self.global.id;
        self.absorb_into(global_id, global);

        // Parents are always created before their children
        let mut ids: Vec<ScopeId> = scopes.keys().copied().collect();
        ids.sort();
        for id in ids {
            let Some(mut scope) = scopes.remove(&id) else {
                continue;
            };
            let mut parent = scope
                .parent
                .map(|p| redirect.get(&p).copied().unwrap_or(p))
                .unwrap_or(self.global.id);
            // Files hold no structures: shared named scopes hang off the global scope
            if scope.kind.is_named() && self.scope(parent).is_some_and(|p| p.kind == ScopeKind::File) {
                parent = self.global.id;
            }

            let existing = scope
                .name
                .as_ref()
                .filter(|_| scope.kind.is_named())
                .and_then(|name| self.fqn_scopes.get(name))
                .copied();
            if let Some(existing) = existing {
                debug!("Coalescing {} into {}", id, existing);
                self.absorb_into(existing, scope);
                redirect.insert(id, existing);
                stats.coalesced += 1;
                continue;
            }

            scope.parent = Some(parent);
            scope.children.clear();
            if scope.kind.is_named() {
                if let Some(name) = scope.name.clone() {
                    self.fqn_scopes.insert(name, id);
                }
            }
            if let Some(parent_scope) = self.scope_mut(parent) {
                if !parent_scope.children.contains(&id) {
                    parent_scope.children.push(id);
                }
            }
            self.scopes.insert(id, scope);
            stats.moved += 1;
        }

        for (node, scope) in node_scopes {
            self.node_scopes.insert(node, redirect.get(&scope).copied().unwrap_or(scope));
        }
        for id in moved_nodes {
            if let Some(node) = self.nodes.get_mut(id) {
                if let Some(target) = node.scope.and_then(|s| redirect.get(&s)) {
                    node.scope = Some(*target);
                }
            }
        }
        self.diagnostics.extend(diagnostics);
    }

    /// Union `other` into the scope `target`.
    ///
    /// A namespace or record declared again under the same FQN is kept once.
    fn absorb_into(&mut self, target: ScopeId, mut other: Scope) {
        let Some(existing) = self.scope(target) else {
            return;
        };

        let mut duplicates: HashSet<NodeId> = HashSet::new();
        for (name, decls) in other.all_symbols() {
            let known: Vec<&NodeKind> = existing
                .symbols(name)
                .iter()
                .filter_map(|d| self.nodes.get(*d))
                .map(|n| &n.kind)
                .collect();
            // Signatures already declared here, prototypes repeated by every
            // unit including the same header collapse onto them
            let signatures: Vec<Vec<Type>> = existing
                .symbols(name)
                .iter()
                .filter(|d| self.nodes.get(**d).is_some_and(Node::is_function))
                .map(|d| self.nodes.parameter_types(*d))
                .collect();
            for decl in decls {
                let Some(node) = self.nodes.get(*decl) else {
                    continue;
                };
                let structural = matches!(node.kind, NodeKind::Namespace | NodeKind::Record { .. });
                if structural && known.iter().any(|k| mem::discriminant(*k) == mem::discriminant(&node.kind)) {
                    duplicates.insert(*decl);
                }
                let prototype = node.as_function().is_some_and(|f| !f.is_definition);
                if prototype && signatures.contains(&self.nodes.parameter_types(*decl)) {
                    duplicates.insert(*decl);
                }
            }
        }
        other.retain_symbols(|_, decl| !duplicates.contains(&decl));

        if let Some(existing) = self.scope_mut(target) {
            existing.absorb(other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::name::Name;
    use crate::node::{Node, RecordKind, ReferenceExpr};
    use std::sync::Arc;

    fn add(manager: &mut ScopeManager, name: &str, kind: NodeKind) -> NodeId {
        manager.add_node(Node::new(Name::from(name), kind, Arc::new(Language::cpp())))
    }

    /// `namespace N { class C {}; }` plus a variable inside `C`
    fn unit_with_class(field: &str) -> (ScopeManager, NodeId, NodeId) {
        let mut manager = ScopeManager::new();
        let unit = add(&mut manager, "u.cpp", NodeKind::TranslationUnit { path: "u.cpp".into() });
        manager.enter_scope(unit);
        let n = add(&mut manager, "N", NodeKind::Namespace);
        manager.add_declaration(n, true);
        manager.enter_scope(n);
        let c = add(&mut manager, "C", NodeKind::Record { kind: RecordKind::Class, supertypes: Vec::new() });
        manager.add_declaration(c, true);
        manager.enter_scope(c);
        let f = add(&mut manager, field, NodeKind::Field);
        manager.add_declaration(f, true);
        manager.leave_scope(c);
        manager.leave_scope(n);
        manager.leave_scope(unit);
        (manager, n, c)
    }

    #[test]
    fn test_merge_coalesces_named_scopes() {
        let (first, _n1, c1) = unit_with_class("a");
        let (second, n2, c2) = unit_with_class("b");

        let mut merged = ScopeManager::new();
        let stats = merged.merge_from(vec![first, second]);
        assert_eq!(stats.units, 2);
        assert_eq!(stats.coalesced, 2);

        assert_eq!(merged.filter_scopes(|s| s.kind == ScopeKind::Name).len(), 1);
        assert_eq!(merged.filter_scopes(|s| s.kind == ScopeKind::Record).len(), 1);
        assert_eq!(merged.filter_scopes(|s| s.kind == ScopeKind::File).len(), 2);

        let n_scope = merged.lookup_scope_by_fqn(&Name::from("N")).unwrap();
        let c_scope = merged.lookup_scope_by_fqn(&Name::from("N::C")).unwrap();
        assert_eq!(merged.scope(n_scope).unwrap().symbols("C"), &[c1]);
        assert_eq!(merged.scope(merged.global_scope()).unwrap().symbols("N").len(), 1);

        // Last seen AST node wins, both nodes map to the surviving scope
        assert_eq!(merged.scope(n_scope).unwrap().ast_node, Some(n2));
        assert_eq!(merged.lookup_scope(c1), Some(c_scope));
        assert_eq!(merged.lookup_scope(c2), Some(c_scope));

        let c = merged.scope(c_scope).unwrap();
        assert_eq!(c.symbols("a").len(), 1);
        assert_eq!(c.symbols("b").len(), 1);
        assert_eq!(c.parent, Some(n_scope));
        assert_eq!(merged.scope(n_scope).unwrap().parent, Some(merged.global_scope()));
    }

    #[test]
    fn test_merge_redirects_node_scopes() {
        let (first, _, _) = unit_with_class("a");
        let (mut second, _, c2) = unit_with_class("b");

        // A reference created inside the second unit's `C`
        let c2_scope = second.lookup_scope(c2).unwrap();
        let mut reference = Node::new(
            Name::from("a"),
            NodeKind::Reference(ReferenceExpr::default()),
            Arc::new(Language::cpp()),
        );
        reference.scope = Some(c2_scope);
        let r = second.add_node(reference);

        let mut merged = ScopeManager::new();
        merged.merge_from(vec![first, second]);

        let c_scope = merged.lookup_scope_by_fqn(&Name::from("N::C")).unwrap();
        assert_eq!(merged.node(r).unwrap().scope, Some(c_scope));
        // Field `a` from the first unit is now visible from the second
        assert_eq!(merged.resolve_reference(r).map(|d| merged.node(d).unwrap().name.clone()), Some(Name::from("a")));
    }

    #[test]
    fn test_merge_appends_globals_and_diagnostics() {
        let mut first = ScopeManager::new();
        let x = add(&mut first, "x", NodeKind::Variable);
        first.add_declaration(x, true);
        first.leave_scope(x);

        let mut second = ScopeManager::new();
        let y = add(&mut second, "y", NodeKind::Variable);
        second.add_declaration(y, true);
        second.add_typedef("Int", crate::types::Type::primitive("int").unwrap());

        let mut merged = ScopeManager::new();
        merged.merge_from(vec![first, second]);
        let global = merged.scope(merged.global_scope()).unwrap();
        assert_eq!(global.symbols("x"), &[x]);
        assert_eq!(global.symbols("y"), &[y]);
        assert!(global.typedef("Int").is_some());
        assert_eq!(merged.diagnostics().len(), 1);
        assert_eq!(merged.nodes().len(), 2);
    }
}
