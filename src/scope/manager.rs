//! Scope Manager - builds the scope tree from frontend events
//!
//! The manager is driven by `enter_scope` / `add_declaration` / `leave_scope`
//! calls while a translation unit is walked. It owns:
//! - the node store of the unit
//! - every scope (the global scope is a field, all others live in a map)
//! - the node → scope map and the FQN → named scope index
//! - diagnostics for structural misuse
//!
//! Misuse never aborts: it is logged, recorded as a `Diagnostic` and the
//! scope tree is left unchanged.

use super::graph::{Scope, ScopeId, ScopeKind};
use super::resolver::ResolutionCache;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::name::{DEFAULT_DELIMITER, Name};
use crate::node::{DeclarationClass, Node, NodeId, NodeKind, NodeStore};
use crate::types::Type;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Stateful scope tree of one translation unit (or, after merge, of all)
#[derive(Debug)]
pub struct ScopeManager {
    pub(super) nodes: NodeStore,
    pub(super) global: Scope,
    pub(super) scopes: HashMap<ScopeId, Scope>,
    pub(super) current: ScopeId,
    pub(super) node_scopes: HashMap<NodeId, ScopeId>,
    pub(super) fqn_scopes: HashMap<Name, ScopeId>,
    pub(super) cache: ResolutionCache,
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    /// Create a manager holding only the (unassociated) global scope
    pub fn new() -> Self {
        let global = Scope::new(ScopeKind::Global, None, None, Some(Name::root(DEFAULT_DELIMITER)));
        Self {
            nodes: NodeStore::new(),
            current: global.id,
            global,
            scopes: HashMap::new(),
            node_scopes: HashMap::new(),
            fqn_scopes: HashMap::new(),
            cache: ResolutionCache::default(),
            diagnostics: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Insert a node, stamping the current scope as its point of use
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        if node.scope.is_none() {
            node.scope = Some(self.current);
        }
        self.nodes.insert(node)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Make the scope of `node` current, creating it if needed.
    ///
    /// Returns `None` (with a diagnostic) for nodes that open no scope.
    pub fn enter_scope(&mut self, node: NodeId) -> Option<ScopeId> {
        if let Some(&existing) = self.node_scopes.get(&node) {
            debug!("Re-entering {} for node {}", existing, node);
            self.current = existing;
            return Some(existing);
        }

        let Some(ast) = self.nodes.get(node) else {
            self.report(DiagnosticKind::UnknownNode, format!("cannot enter scope of unknown node {}", node), None);
            return None;
        };
        let Some(kind) = ScopeKind::for_node(&ast.kind) else {
            let message = format!("{} does not open a scope", ast.describe());
            self.report(DiagnosticKind::NoScopeForNode, message, Some(node));
            return None;
        };

        let fqn = kind.is_named().then(|| {
            let prefix = self.name_prefix();
            if ast.name.is_qualified() && ast.name.starts_with(&prefix) {
                ast.name.clone()
            } else {
                prefix.join(&ast.name).with_delimiter(ast.name.delimiter())
            }
        });

        if let Some(fqn) = &fqn {
            if let Some(node_ref) = self.nodes.get_mut(node) {
                node_ref.name = fqn.clone();
            }
            if let Some(&existing) = self.fqn_scopes.get(fqn) {
                debug!("Reopening {} {} at node {}", kind, fqn, node);
                if let Some(scope) = self.scope_mut(existing) {
                    scope.ast_node = Some(node);
                }
                self.node_scopes.insert(node, existing);
                self.current = existing;
                return Some(existing);
            }
        }

        let parent = self.current;
        let scope = Scope::new(kind, Some(node), Some(parent), fqn.clone());
        let id = scope.id;
        debug!("Entering new {} {} under {}", kind, id, parent);

        if let Some(parent_scope) = self.scope_mut(parent) {
            parent_scope.children.push(id);
        }
        if let Some(fqn) = fqn {
            self.fqn_scopes.insert(fqn, id);
        }
        self.scopes.insert(id, scope);
        self.node_scopes.insert(node, id);
        self.current = id;
        Some(id)
    }

    /// Leave the scope of `node`; it must be current or enclose current.
    ///
    /// Returns the scope left, or `None` (with a diagnostic) when unmatched.
    pub fn leave_scope(&mut self, node: NodeId) -> Option<ScopeId> {
        let Some(&scope) = self.node_scopes.get(&node) else {
            self.report(
                DiagnosticKind::UnmatchedLeave,
                format!("leaving scope of node {} that was never entered", node),
                Some(node),
            );
            return None;
        };
        if !self.encloses(scope, self.current) {
            self.report(
                DiagnosticKind::UnmatchedLeave,
                format!("{} is not on the current scope chain", scope),
                Some(node),
            );
            return None;
        }

        self.current = self.scope(scope).and_then(|s| s.parent).unwrap_or(self.global.id);
        debug!("Left {}, current is {}", scope, self.current);
        Some(scope)
    }

    /// File a declaration into the nearest scope able to hold it.
    ///
    /// With `add_to_ast` the declaration is also attached to the AST node
    /// owning the holding scope. Returns the holding scope.
    pub fn add_declaration(&mut self, decl: NodeId, add_to_ast: bool) -> Option<ScopeId> {
        let Some(node) = self.nodes.get(decl) else {
            self.report(DiagnosticKind::UnknownNode, format!("cannot declare unknown node {}", decl), None);
            return None;
        };
        let Some(class) = node.kind.declaration_class() else {
            let message = format!("{} is not a declaration", node.describe());
            self.report(DiagnosticKind::NotADeclaration, message, Some(decl));
            return None;
        };

        let templated = matches!(node.kind, NodeKind::Function(_) | NodeKind::Record { .. });
        let holder = match class {
            DeclarationClass::Value => self
                .qualifier_scope(node)
                .or_else(|| self.holding_scope(ScopeKind::holds_values, templated)),
            DeclarationClass::Structure => self.holding_scope(ScopeKind::holds_structures, templated),
            DeclarationClass::Import => self.holding_scope(ScopeKind::holds_imports, false),
            DeclarationClass::Typedef => Some(self.current),
            DeclarationClass::Floating => Some(self.global.id),
        };
        let Some(holder) = holder else {
            let message = format!("no enclosing scope can hold {}", node.describe());
            self.report(DiagnosticKind::NoHoldingScope, message, Some(decl));
            return None;
        };

        let symbol = node.name.local_name().to_string();
        let typedef = match &node.kind {
            NodeKind::Typedef { target } => Some(target.clone()),
            _ => None,
        };
        let Some(scope) = self.scope_mut(holder) else {
            return None;
        };
        let holder_kind = scope.kind;
        let holder_ast = scope.ast_node;
        match (class, typedef) {
            (DeclarationClass::Import, _) => scope.add_import(decl),
            (DeclarationClass::Typedef, Some(target)) => scope.add_typedef(symbol, target),
            _ => scope.add_symbol(symbol, decl),
        }

        if holder_kind == ScopeKind::Record {
            if let Some(NodeKind::Function(function)) = self.nodes.get_mut(decl).map(|n| &mut n.kind) {
                function.record = holder_ast;
            }
        }
        if add_to_ast {
            if let Some(owner) = holder_ast.and_then(|ast| self.nodes.get_mut(ast)) {
                if !owner.ast_children.contains(&decl) {
                    owner.ast_children.push(decl);
                }
            }
        }

        self.cache.clear();
        Some(holder)
    }

    /// Register `alias` for `ty` in the current scope
    pub fn add_typedef(&mut self, alias: impl Into<String>, ty: Type) {
        let current = self.current;
        if let Some(scope) = self.scope_mut(current) {
            scope.add_typedef(alias, ty);
        }
        self.cache.clear();
    }

    /// Attach a break statement to its target loop or switch
    pub fn add_break(&mut self, statement: NodeId) -> bool {
        let label = match self.nodes.get(statement).map(|n| &n.kind) {
            Some(NodeKind::Break { label }) => label.clone(),
            _ => None,
        };
        let target = self.jump_target(label.as_deref(), ScopeKind::is_breakable);
        let added = target
            .and_then(|t| self.scope_mut(t))
            .is_some_and(|scope| scope.add_break(statement));
        if !added {
            self.report(
                DiagnosticKind::BreakOutsideBreakable,
                "break outside of a loop or switch",
                Some(statement),
            );
        }
        added
    }

    /// Attach a continue statement to its target loop
    pub fn add_continue(&mut self, statement: NodeId) -> bool {
        let label = match self.nodes.get(statement).map(|n| &n.kind) {
            Some(NodeKind::Continue { label }) => label.clone(),
            _ => None,
        };
        let target = self.jump_target(label.as_deref(), ScopeKind::is_continuable);
        let added = target
            .and_then(|t| self.scope_mut(t))
            .is_some_and(|scope| scope.add_continue(statement));
        if !added {
            self.report(
                DiagnosticKind::ContinueOutsideContinuable,
                "continue outside of a loop",
                Some(statement),
            );
        }
        added
    }

    /// Register a label in the enclosing function
    pub fn add_label(&mut self, label_node: NodeId) -> bool {
        let Some((label, statement)) = self.nodes.get(label_node).and_then(|n| match &n.kind {
            NodeKind::Label { label, statement } => Some((label.clone(), statement.unwrap_or(label_node))),
            _ => None,
        }) else {
            self.report(DiagnosticKind::NotADeclaration, format!("{} is not a label", label_node), Some(label_node));
            return false;
        };

        let function = self.nearest(self.current, ScopeKind::holds_labels);
        match function.and_then(|f| self.scope_mut(f)) {
            Some(scope) => scope.add_label(label, statement),
            None => {
                self.report(
                    DiagnosticKind::LabelOutsideFunction,
                    format!("label '{}' outside of a function", label),
                    Some(label_node),
                );
                false
            }
        }
    }

    /// Statement labeled `label` in the enclosing function
    pub fn label_statement(&self, label: &str) -> Option<NodeId> {
        let function = self.nearest(self.current, ScopeKind::holds_labels)?;
        self.scope(function)?.label(label)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global.id
    }

    /// FQN of the innermost enclosing named scope (empty at global level)
    pub fn current_namespace(&self) -> Name {
        self.nearest(self.current, ScopeKind::is_named)
            .and_then(|id| self.scope(id))
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| Name::root(DEFAULT_DELIMITER))
    }

    /// AST node of the innermost enclosing function
    pub fn current_function(&self) -> Option<NodeId> {
        let id = self.nearest(self.current, |k| k == ScopeKind::Function)?;
        self.scope(id)?.ast_node
    }

    /// AST node of the innermost enclosing record
    pub fn current_record(&self) -> Option<NodeId> {
        let id = self.nearest(self.current, |k| k == ScopeKind::Record)?;
        self.scope(id)?.ast_node
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        if id == self.global.id {
            Some(&self.global)
        } else {
            self.scopes.get(&id)
        }
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        if id == self.global.id {
            Some(&mut self.global)
        } else {
            self.scopes.get_mut(&id)
        }
    }

    /// Scope opened by `node`
    pub fn lookup_scope(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// Named scope with the given FQN; the empty name is the global scope
    pub fn lookup_scope_by_fqn(&self, fqn: &Name) -> Option<ScopeId> {
        if fqn.is_empty() {
            return Some(self.global.id);
        }
        self.fqn_scopes.get(fqn).copied()
    }

    /// All scopes matching `predicate`, in creation order
    pub fn filter_scopes(&self, predicate: impl Fn(&Scope) -> bool) -> Vec<ScopeId> {
        let mut ids: Vec<ScopeId> = self.all_scopes().filter(|s| predicate(s)).map(|s| s.id).collect();
        ids.sort();
        ids
    }

    /// Global scope followed by every other scope, unordered
    pub fn all_scopes(&self) -> impl Iterator<Item = &Scope> {
        std::iter::once(&self.global).chain(self.scopes.values())
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len() + 1
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `scope` and its ancestors, innermost first
    pub fn scope_chain(&self, scope: ScopeId) -> ScopeChain<'_> {
        ScopeChain {
            manager: self,
            next: Some(scope),
        }
    }

    /// True if `outer` is `inner` or one of its ancestors
    pub fn encloses(&self, outer: ScopeId, inner: ScopeId) -> bool {
        self.scope_chain(inner).any(|s| s.id == outer)
    }

    /// Innermost scope from `start` outwards whose kind satisfies `accepts`
    pub(crate) fn nearest(&self, start: ScopeId, accepts: impl Fn(ScopeKind) -> bool) -> Option<ScopeId> {
        self.scope_chain(start).find(|s| accepts(s.kind)).map(|s| s.id)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Nearest holder from the current scope. Functions and records
    /// declared directly inside a template are filed next to the template.
    fn holding_scope(&self, accepts: impl Fn(ScopeKind) -> bool + Copy, templated: bool) -> Option<ScopeId> {
        let holder = self.nearest(self.current, accepts)?;
        let scope = self.scope(holder)?;
        if templated && scope.kind == ScopeKind::Template {
            return scope.parent.and_then(|p| self.nearest(p, accepts));
        }
        Some(holder)
    }

    /// Prefix of a named scope opened here: the current namespace, extended
    /// by every function entered since so function-local records stay distinct
    fn name_prefix(&self) -> Name {
        let mut functions = Vec::new();
        let mut base = None;
        for scope in self.scope_chain(self.current) {
            if scope.kind.is_named() {
                base = scope.name.clone();
                break;
            }
            if scope.kind == ScopeKind::Function {
                if let Some(function) = scope.ast_node.and_then(|n| self.nodes.get(n)) {
                    functions.push(function.name.local_name().to_string());
                }
            }
        }
        let mut prefix = base.unwrap_or_else(|| Name::root(DEFAULT_DELIMITER));
        for function in functions.into_iter().rev() {
            prefix = prefix.child(function);
        }
        prefix
    }

    /// Named scope of an out-of-line definition such as `void C::f()`
    fn qualifier_scope(&self, node: &Node) -> Option<ScopeId> {
        if !node.is_function() {
            return None;
        }
        let qualifier = node.name.parent()?;
        self.lookup_scope_by_fqn(&self.current_namespace().join(&qualifier))
            .or_else(|| self.lookup_scope_by_fqn(&qualifier))
    }

    fn jump_target(&self, label: Option<&str>, accepts: impl Fn(ScopeKind) -> bool) -> Option<ScopeId> {
        match label {
            Some(label) => {
                let statement = self.label_statement(label)?;
                self.lookup_scope(statement)
            }
            None => self.nearest(self.current, accepts),
        }
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, node: Option<NodeId>) {
        let location = node.and_then(|n| self.nodes.get(n)).and_then(|n| n.location.clone());
        let diagnostic = Diagnostic::new(kind, message, location);
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

/// Iterator over a scope and its ancestors
pub struct ScopeChain<'a> {
    manager: &'a ScopeManager,
    next: Option<ScopeId>,
}

impl<'a> Iterator for ScopeChain<'a> {
    type Item = &'a Scope;

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.manager.scope(self.next?)?;
        self.next = scope.parent;
        Some(scope)
    }
}
