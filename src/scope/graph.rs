//! Scope tree nodes
//!
//! Each scope tracks:
//! - Its kind and the AST node that opened it
//! - Parent/child links (ids into the manager's scope map)
//! - A symbol table: local name → declarations, in insertion order
//! - Typedefs and imports
//! - Kind-specific bookkeeping: labels (functions), break/continue
//!   statements (loops and switches)

use crate::name::Name;
use crate::node::{NodeId, NodeKind};
use crate::types::Type;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_SCOPE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// The kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Root of the tree, shared by all units
    Global,
    /// Translation unit; holds only imports and typedefs
    File,
    /// Namespace / package
    Name,
    /// Class, struct, union, interface, enum
    Record,
    Function,
    Block,
    Loop,
    Switch,
    Try,
    Template,
    /// Conditionals and lambdas: values only
    Value,
}

impl ScopeKind {
    /// The scope kind opened by a node, if any
    pub fn for_node(kind: &NodeKind) -> Option<ScopeKind> {
        match kind {
            NodeKind::TranslationUnit { .. } => Some(ScopeKind::File),
            NodeKind::Namespace => Some(ScopeKind::Name),
            NodeKind::Record { .. } => Some(ScopeKind::Record),
            NodeKind::Template { .. } => Some(ScopeKind::Template),
            NodeKind::Function(_) => Some(ScopeKind::Function),
            NodeKind::Block => Some(ScopeKind::Block),
            NodeKind::Loop => Some(ScopeKind::Loop),
            NodeKind::Switch => Some(ScopeKind::Switch),
            NodeKind::Try => Some(ScopeKind::Try),
            NodeKind::If | NodeKind::Lambda => Some(ScopeKind::Value),
            _ => None,
        }
    }

    /// Can hold variables, parameters, fields and functions
    pub fn holds_values(self) -> bool {
        !matches!(self, ScopeKind::File)
    }

    /// Can hold records, namespaces and templates
    pub fn holds_structures(self) -> bool {
        matches!(
            self,
            ScopeKind::Global | ScopeKind::Name | ScopeKind::Record | ScopeKind::Template
        )
    }

    /// Can hold import/using declarations; an import is visible only in
    /// the scope it appears in and below
    pub fn holds_imports(self) -> bool {
        true
    }

    /// Identified by a fully-qualified name, one instance per FQN
    pub fn is_named(self) -> bool {
        matches!(self, ScopeKind::Name | ScopeKind::Record)
    }

    pub fn is_breakable(self) -> bool {
        matches!(self, ScopeKind::Loop | ScopeKind::Switch)
    }

    pub fn is_continuable(self) -> bool {
        self == ScopeKind::Loop
    }

    pub fn holds_labels(self) -> bool {
        self == ScopeKind::Function
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::File => "file",
            ScopeKind::Name => "name",
            ScopeKind::Record => "record",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
            ScopeKind::Loop => "loop",
            ScopeKind::Switch => "switch",
            ScopeKind::Try => "try",
            ScopeKind::Template => "template",
            ScopeKind::Value => "value",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Break and continue statements targeting a scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpTargets {
    pub breaks: Vec<NodeId>,
    /// `None` for scopes that cannot be continued (switch)
    pub continues: Option<Vec<NodeId>>,
}

/// A lexical region with its own symbol table
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// AST node that opened this scope (last seen, for merged scopes)
    pub ast_node: Option<NodeId>,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Fully-qualified name, named kinds only
    pub name: Option<Name>,
    symbols: HashMap<String, Vec<NodeId>>,
    typedefs: HashMap<String, Type>,
    imports: Vec<NodeId>,
    labels: Option<HashMap<String, NodeId>>,
    jumps: Option<JumpTargets>,
}

impl Scope {
    pub fn new(kind: ScopeKind, ast_node: Option<NodeId>, parent: Option<ScopeId>, name: Option<Name>) -> Self {
        let jumps = kind.is_breakable().then(|| JumpTargets {
            breaks: Vec::new(),
            continues: kind.is_continuable().then(Vec::new),
        });
        Self {
            id: ScopeId::next(),
            kind,
            ast_node,
            parent,
            children: Vec::new(),
            name,
            symbols: HashMap::new(),
            typedefs: HashMap::new(),
            imports: Vec::new(),
            labels: kind.holds_labels().then(HashMap::new),
            jumps,
        }
    }

    /// Add a declaration under `name`; re-adding is a no-op
    pub fn add_symbol(&mut self, name: impl Into<String>, decl: NodeId) {
        let entry = self.symbols.entry(name.into()).or_default();
        if !entry.contains(&decl) {
            entry.push(decl);
        }
    }

    /// Declarations of `name` in this scope only, in insertion order
    pub fn symbols(&self, name: &str) -> &[NodeId] {
        self.symbols.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All `(name, declarations)` pairs
    pub fn all_symbols(&self) -> impl Iterator<Item = (&String, &Vec<NodeId>)> {
        self.symbols.iter()
    }

    /// Keep only the declarations for which `keep` returns true
    pub(crate) fn retain_symbols(&mut self, mut keep: impl FnMut(&str, NodeId) -> bool) {
        for (name, decls) in self.symbols.iter_mut() {
            decls.retain(|d| keep(name.as_str(), *d));
        }
        self.symbols.retain(|_, decls| !decls.is_empty());
    }

    pub fn add_typedef(&mut self, alias: impl Into<String>, ty: Type) {
        self.typedefs.insert(alias.into(), ty);
    }

    pub fn typedef(&self, alias: &str) -> Option<&Type> {
        self.typedefs.get(alias)
    }

    pub fn add_import(&mut self, import: NodeId) {
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }

    pub fn imports(&self) -> &[NodeId] {
        &self.imports
    }

    /// Register a label; `false` if this kind holds no labels
    pub fn add_label(&mut self, label: impl Into<String>, statement: NodeId) -> bool {
        match &mut self.labels {
            Some(labels) => {
                labels.insert(label.into(), statement);
                true
            }
            None => false,
        }
    }

    pub fn label(&self, label: &str) -> Option<NodeId> {
        self.labels.as_ref()?.get(label).copied()
    }

    /// Record a break; `false` if this kind is not breakable
    pub fn add_break(&mut self, statement: NodeId) -> bool {
        match &mut self.jumps {
            Some(jumps) => {
                jumps.breaks.push(statement);
                true
            }
            None => false,
        }
    }

    /// Record a continue; `false` if this kind is not continuable
    pub fn add_continue(&mut self, statement: NodeId) -> bool {
        match self.jumps.as_mut().and_then(|j| j.continues.as_mut()) {
            Some(continues) => {
                continues.push(statement);
                true
            }
            None => false,
        }
    }

    pub fn jumps(&self) -> Option<&JumpTargets> {
        self.jumps.as_ref()
    }

    /// Union another scope's tables into this one (same FQN, other unit)
    pub(crate) fn absorb(&mut self, other: Scope) {
        for (name, decls) in other.symbols {
            for decl in decls {
                self.add_symbol(name.clone(), decl);
            }
        }
        self.typedefs.extend(other.typedefs);
        for import in other.imports {
            self.add_import(import);
        }
        if let (Some(labels), Some(other_labels)) = (&mut self.labels, other.labels) {
            labels.extend(other_labels);
        }
        if let (Some(jumps), Some(other_jumps)) = (&mut self.jumps, other.jumps) {
            jumps.breaks.extend(other_jumps.breaks);
            if let (Some(continues), Some(other_continues)) = (&mut jumps.continues, other_jumps.continues) {
                continues.extend(other_continues);
            }
        }
        if other.ast_node.is_some() {
            self.ast_node = other.ast_node;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_follow_kind() {
        let function = Scope::new(ScopeKind::Function, None, None, None);
        assert!(function.jumps().is_none());
        let loop_scope = Scope::new(ScopeKind::Loop, None, None, None);
        assert!(loop_scope.jumps().unwrap().continues.is_some());
        let switch = Scope::new(ScopeKind::Switch, None, None, None);
        assert!(switch.jumps().unwrap().continues.is_none());

        assert!(!ScopeKind::File.holds_values());
        assert!(ScopeKind::File.holds_imports());
        assert!(ScopeKind::Function.holds_imports() && ScopeKind::Block.holds_imports());
        assert!(!ScopeKind::Block.holds_structures());
        assert!(ScopeKind::Record.is_named());
    }

    #[test]
    fn test_symbols_keep_insertion_order() {
        let mut scope = Scope::new(ScopeKind::Global, None, None, None);
        scope.add_symbol("f", NodeId(3));
        scope.add_symbol("f", NodeId(1));
        scope.add_symbol("f", NodeId(3));
        assert_eq!(scope.symbols("f"), &[NodeId(3), NodeId(1)]);
        assert!(scope.symbols("g").is_empty());
    }

    #[test]
    fn test_jumps_rejected_by_wrong_kind() {
        let mut switch = Scope::new(ScopeKind::Switch, None, None, None);
        assert!(switch.add_break(NodeId(1)));
        assert!(!switch.add_continue(NodeId(2)));

        let mut block = Scope::new(ScopeKind::Block, None, None, None);
        assert!(!block.add_break(NodeId(1)));
        assert!(!block.add_label("l", NodeId(1)));
    }

    #[test]
    fn test_absorb_unions_tables() {
        let mut a = Scope::new(ScopeKind::Name, Some(NodeId(1)), None, Some(Name::from("N")));
        let mut b = Scope::new(ScopeKind::Name, Some(NodeId(2)), None, Some(Name::from("N")));
        a.add_symbol("C", NodeId(10));
        b.add_symbol("C", NodeId(10));
        b.add_symbol("D", NodeId(11));
        b.add_typedef("T", Type::Unknown);

        a.absorb(b);
        assert_eq!(a.symbols("C"), &[NodeId(10)]);
        assert_eq!(a.symbols("D"), &[NodeId(11)]);
        assert!(a.typedef("T").is_some());
        assert_eq!(a.ast_node, Some(NodeId(2)));
    }
}
