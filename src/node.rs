//! Nodes - the AST-like graph handed over by frontends
//!
//! Frontends create nodes, the scope manager files declarations into scopes
//! and the resolvers link references and calls to declarations.
//!
//! Node ids come from a process-wide counter, so stores built on different
//! threads can be merged by moving entries without renumbering.

use crate::language::Language;
use crate::name::Name;
use crate::scope::ScopeId;
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Class,
    Struct,
    Union,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub parameters: Vec<NodeId>,
    pub return_type: Type,
    /// Has a body (as opposed to a forward declaration)
    pub is_definition: bool,
    /// Record this function is a method of
    pub record: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDecl {
    pub variadic: bool,
    /// Default value expression
    pub default: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    /// Imported namespace or entity
    pub target: Name,
    /// `import a.b as c`, `namespace c = a::b`
    pub alias: Option<String>,
    /// `using namespace a::b`, `import a.b.*`
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceExpr {
    /// Expected type at the use site, e.g. a function pointer
    pub helper: Option<Type>,
    pub refers_to: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Reference naming the called function
    pub callee: NodeId,
    pub arguments: Vec<NodeId>,
    /// Type of the receiver for member calls (`obj.f()`)
    pub receiver: Option<Type>,
    pub invokes: Vec<NodeId>,
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    TranslationUnit { path: String },
    Namespace,
    Record { kind: RecordKind, supertypes: Vec<Type> },
    EnumConstant,
    Template { parameters: Vec<NodeId> },
    Function(FunctionDecl),
    Parameter(ParameterDecl),
    Variable,
    Field,
    Typedef { target: Type },
    Import(ImportDecl),
    Include { path: String },
    Problem { message: String },
    Reference(ReferenceExpr),
    Call(CallExpr),
    Literal { value: String },
    Block,
    Loop,
    Switch,
    Try,
    If,
    Lambda,
    Label { label: String, statement: Option<NodeId> },
    Break { label: Option<String> },
    Continue { label: Option<String> },
}

/// Which scopes may hold a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationClass {
    /// Variables, parameters, enum constants, fields, functions
    Value,
    /// Records, namespaces, templates
    Structure,
    Import,
    Typedef,
    /// Problems and includes, always global
    Floating,
}

impl NodeKind {
    pub fn declaration_class(&self) -> Option<DeclarationClass> {
        match self {
            NodeKind::Variable
            | NodeKind::Parameter(_)
            | NodeKind::EnumConstant
            | NodeKind::Field
            | NodeKind::Function(_) => Some(DeclarationClass::Value),
            NodeKind::Record { .. } | NodeKind::Namespace | NodeKind::Template { .. } => {
                Some(DeclarationClass::Structure)
            }
            NodeKind::Import(_) => Some(DeclarationClass::Import),
            NodeKind::Typedef { .. } => Some(DeclarationClass::Typedef),
            NodeKind::Problem { .. } | NodeKind::Include { .. } => Some(DeclarationClass::Floating),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::TranslationUnit { .. } => "translation_unit",
            NodeKind::Namespace => "namespace",
            NodeKind::Record { .. } => "record",
            NodeKind::EnumConstant => "enum_constant",
            NodeKind::Template { .. } => "template",
            NodeKind::Function(_) => "function",
            NodeKind::Parameter(_) => "parameter",
            NodeKind::Variable => "variable",
            NodeKind::Field => "field",
            NodeKind::Typedef { .. } => "typedef",
            NodeKind::Import(_) => "import",
            NodeKind::Include { .. } => "include",
            NodeKind::Problem { .. } => "problem",
            NodeKind::Reference(_) => "reference",
            NodeKind::Call(_) => "call",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Block => "block",
            NodeKind::Loop => "loop",
            NodeKind::Switch => "switch",
            NodeKind::Try => "try",
            NodeKind::If => "if",
            NodeKind::Lambda => "lambda",
            NodeKind::Label { .. } => "label",
            NodeKind::Break { .. } => "break",
            NodeKind::Continue { .. } => "continue",
        }
    }
}

/// A node of the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Declared or referenced name
    pub name: Name,
    pub kind: NodeKind,
    pub ty: Type,
    pub location: Option<Location>,
    pub language: Arc<Language>,
    /// Scope the node was created in
    pub scope: Option<ScopeId>,
    /// Declarations attached to this node in the AST
    pub ast_children: Vec<NodeId>,
}

impl Node {
    /// Create a node with a fresh id and unknown type
    pub fn new(name: Name, kind: NodeKind, language: Arc<Language>) -> Self {
        Self {
            id: NodeId::next(),
            name,
            kind,
            ty: Type::Unknown,
            location: None,
            language,
            scope: None,
            ast_children: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, NodeKind::Function(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, NodeKind::Record { .. })
    }

    /// Short description for logs and diagnostics
    pub fn describe(&self) -> String {
        match &self.location {
            Some(location) => format!("{} {} at {}", self.kind.as_str(), self.name, location),
            None => format!("{} {}", self.kind.as_str(), self.name),
        }
    }
}

/// Arena of nodes, iterated in creation order.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its id
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Ids of all nodes matching `predicate`
    pub fn ids_where(&self, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.nodes.values().filter(|n| predicate(n)).map(|n| n.id).collect()
    }

    /// Move every node of `other` into this store
    pub fn absorb(&mut self, other: NodeStore) {
        self.nodes.extend(other.nodes);
    }

    /// Declared parameter types of a function, in order
    pub fn parameter_types(&self, function: NodeId) -> Vec<Type> {
        self.get(function)
            .and_then(Node::as_function)
            .map(|f| {
                f.parameters
                    .iter()
                    .filter_map(|p| self.get(*p))
                    .map(|p| p.ty.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
