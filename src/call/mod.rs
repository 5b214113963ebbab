//! Call & overload resolution
//!
//! `CallResolver` borrows a (merged) scope manager and the type hierarchy
//! and classifies each call site:
//! - `Unresolved`: no candidate, or none with a compatible signature
//! - `Problematic`: the language has no overloading but a scope declares
//!   the callee more than once
//! - `Ambiguous`: several candidates tie at the minimal cast distance
//! - `Successful`: one best candidate, or every override of a dynamically
//!   dispatched method

pub mod rank;
pub mod signature;

pub use rank::{DistanceRanking, RankedCandidate, TieBreak, TieBreaker};
pub use signature::{ParameterMatch, SignatureMatch, Typed, match_signature};

use crate::name::Name;
use crate::node::{CallExpr, DeclarationClass, Node, NodeId, NodeKind};
use crate::scope::{ScopeId, ScopeKind, ScopeManager};
use crate::types::{Type, TypeHierarchy};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Classification of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResolutionKind {
    Successful,
    Problematic,
    Ambiguous,
    Unresolved,
}

impl CallResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallResolutionKind::Successful => "successful",
            CallResolutionKind::Problematic => "problematic",
            CallResolutionKind::Ambiguous => "ambiguous",
            CallResolutionKind::Unresolved => "unresolved",
        }
    }
}

/// Everything learned while resolving one call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResolutionResult {
    pub kind: CallResolutionKind,
    /// Functions found by name
    pub candidates: Vec<NodeId>,
    /// Candidates with a compatible signature
    pub viable: Vec<NodeId>,
    pub signature_results: BTreeMap<NodeId, SignatureMatch>,
    /// Chosen target(s)
    pub best_viable: Vec<NodeId>,
}

impl CallResolutionResult {
    fn unresolved(candidates: Vec<NodeId>) -> Self {
        Self {
            kind: CallResolutionKind::Unresolved,
            candidates,
            viable: Vec::new(),
            signature_results: BTreeMap::new(),
            best_viable: Vec::new(),
        }
    }
}

/// Resolves calls against a scope manager
pub struct CallResolver<'a> {
    manager: &'a ScopeManager,
    hierarchy: &'a TypeHierarchy,
}

impl<'a> CallResolver<'a> {
    pub fn new(manager: &'a ScopeManager, hierarchy: &'a TypeHierarchy) -> Self {
        Self { manager, hierarchy }
    }

    /// Resolve the call node `call`
    pub fn resolve_call(&self, call: NodeId) -> CallResolutionResult {
        let Some((call_node, expr)) = self.manager.node(call).and_then(|n| match &n.kind {
            NodeKind::Call(expr) => Some((n, expr)),
            _ => None,
        }) else {
            return CallResolutionResult::unresolved(Vec::new());
        };
        // Computed callees (`(*table[i])()`) are not references
        let Some(callee) = self
            .manager
            .node(expr.callee)
            .filter(|c| matches!(c.kind, NodeKind::Reference(_)))
        else {
            return CallResolutionResult::unresolved(Vec::new());
        };

        let scope = callee.scope.or(call_node.scope).unwrap_or(self.manager.global_scope());
        let candidates = self.candidates(expr, callee, scope);
        if candidates.is_empty() {
            debug!("Call {} to {}: no candidates", call, callee.name);
            return CallResolutionResult::unresolved(candidates);
        }

        let language = &callee.language;
        if !language.supports_overloading && self.overloaded(&candidates) {
            return CallResolutionResult {
                kind: CallResolutionKind::Problematic,
                best_viable: Vec::new(),
                viable: Vec::new(),
                signature_results: BTreeMap::new(),
                candidates,
            };
        }

        let arguments: Vec<(&Node, Type)> = expr
            .arguments
            .iter()
            .filter_map(|a| self.manager.node(*a))
            .map(|a| (a, self.argument_type(a, scope)))
            .collect();
        let argument_refs: Vec<Typed<'_>> = arguments.iter().map(|(node, ty)| Typed { node: *node, ty }).collect();

        let mut signature_results = BTreeMap::new();
        let mut ranked = Vec::new();
        for candidate in &candidates {
            let Some(function) = self.manager.node(*candidate).and_then(Node::as_function) else {
                continue;
            };
            let parameters: Vec<&Node> = function
                .parameters
                .iter()
                .filter_map(|p| self.manager.node(*p))
                .collect();
            let parameter_types = self.manager.resolved_parameter_types(*candidate);
            let parameter_refs: Vec<Typed<'_>> = parameters
                .iter()
                .zip(&parameter_types)
                .map(|(node, ty)| Typed { node: *node, ty })
                .collect();

            if let Some(matched) = match_signature(
                &argument_refs,
                &parameter_refs,
                language.supports_default_arguments,
                self.hierarchy,
            ) {
                ranked.push(RankedCandidate {
                    function: *candidate,
                    distance: matched.total_distance(),
                    record: function.record,
                    parameter_types: parameter_types.clone(),
                });
                signature_results.insert(*candidate, matched);
            }
        }

        let viable: Vec<NodeId> = ranked.iter().map(|r| r.function).collect();
        let (kind, best_viable) = match viable.len() {
            0 => (CallResolutionKind::Unresolved, Vec::new()),
            1 => (CallResolutionKind::Successful, viable.clone()),
            _ => match DistanceRanking::for_language(language).break_tie(&ranked) {
                TieBreak::Unique(best) => (CallResolutionKind::Successful, vec![best]),
                TieBreak::Dispatch(all) => (CallResolutionKind::Successful, all),
                TieBreak::Tied(tied) => (CallResolutionKind::Ambiguous, tied),
            },
        };
        debug!(
            "Call {} to {}: {} ({} candidates, {} viable)",
            call,
            callee.name,
            kind.as_str(),
            candidates.len(),
            viable.len()
        );

        CallResolutionResult {
            kind,
            candidates,
            viable,
            signature_results,
            best_viable,
        }
    }

    /// Functions the call may target, before signature checks
    fn candidates(&self, expr: &CallExpr, callee: &Node, scope: ScopeId) -> Vec<NodeId> {
        let local = callee.name.local_name();
        let Some(receiver) = &expr.receiver else {
            return self.manager.find_symbols_where(&callee.name, Some(scope), Node::is_function);
        };

        match self.manager.resolve_type(receiver, scope).root_object() {
            Some(object) => self.member_candidates(&object.name, local),
            // Unknown receiver: any record's method may be called
            None => self
                .manager
                .filter_scopes(|s| s.kind == ScopeKind::Record)
                .into_iter()
                .flat_map(|s| self.functions_in(s, local))
                .collect(),
        }
    }

    /// Methods named `local` in `record` or, failing that, the nearest
    /// level of its supertypes
    fn member_candidates(&self, record: &Name, local: &str) -> Vec<NodeId> {
        let mut levels: BTreeMap<u32, Vec<NodeId>> = BTreeMap::new();
        for ancestor in self.hierarchy.ancestors(record) {
            let Some(scope) = self.manager.lookup_scope_by_fqn(&ancestor.name) else {
                continue;
            };
            levels
                .entry(ancestor.depth)
                .or_default()
                .extend(self.functions_in(scope, local));
        }
        levels.into_values().find(|level| !level.is_empty()).unwrap_or_default()
    }

    fn functions_in(&self, scope: ScopeId, local: &str) -> Vec<NodeId> {
        let functions = self
            .manager
            .scope(scope)
            .map(|s| {
                s.symbols(local)
                    .iter()
                    .copied()
                    .filter(|d| self.manager.node(*d).is_some_and(Node::is_function))
                    .collect()
            })
            .unwrap_or_default();
        self.manager.prefer_definitions(functions)
    }

    /// More than one candidate declared in the same record (or outside any)
    fn overloaded(&self, candidates: &[NodeId]) -> bool {
        let mut per_owner: HashMap<Option<NodeId>, usize> = HashMap::new();
        for candidate in candidates {
            let owner = self
                .manager
                .node(*candidate)
                .and_then(Node::as_function)
                .and_then(|f| f.record);
            *per_owner.entry(owner).or_default() += 1;
        }
        per_owner.values().any(|count| *count > 1)
    }

    /// Type of an argument; an untyped reference takes its declaration's type
    fn argument_type(&self, argument: &Node, scope: ScopeId) -> Type {
        let scope = argument.scope.unwrap_or(scope);
        if !argument.ty.is_unknown() {
            return self.manager.resolve_type(&argument.ty, scope);
        }
        let NodeKind::Reference(reference) = &argument.kind else {
            return Type::Unknown;
        };
        let declaration = reference.refers_to.or_else(|| {
            self.manager
                .find_symbols_where(&argument.name, Some(scope), |d| {
                    d.kind.declaration_class() == Some(DeclarationClass::Value) && !d.is_function()
                })
                .first()
                .copied()
        });
        declaration
            .and_then(|d| self.manager.node(d))
            .map(|d| self.manager.resolve_type(&d.ty, d.scope.unwrap_or(scope)))
            .unwrap_or(Type::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::node::{FunctionDecl, ParameterDecl, RecordKind, ReferenceExpr};
    use std::sync::Arc;

    struct Fixture {
        manager: ScopeManager,
        language: Arc<Language>,
    }

    impl Fixture {
        fn new(language: Language) -> Self {
            Self {
                manager: ScopeManager::new(),
                language: Arc::new(language),
            }
        }

        fn node(&mut self, name: &str, kind: NodeKind, ty: Type) -> NodeId {
            self.manager
                .add_node(Node::new(Name::from(name), kind, self.language.clone()).with_type(ty))
        }

        fn function(&mut self, name: &str, params: &[(&str, bool)]) -> NodeId {
            let parameters = params
                .iter()
                .map(|(ty, has_default)| {
                    let default = has_default.then(|| {
                        self.node("10", NodeKind::Literal { value: "10".into() }, Type::primitive("int").unwrap())
                    });
                    self.node(
                        "p",
                        NodeKind::Parameter(ParameterDecl { variadic: false, default }),
                        Type::primitive(ty).unwrap(),
                    )
                })
                .collect();
            let f = self.node(
                name,
                NodeKind::Function(FunctionDecl {
                    parameters,
                    return_type: Type::Incomplete,
                    is_definition: true,
                    record: None,
                }),
                Type::Unknown,
            );
            self.manager.add_declaration(f, true);
            f
        }

        fn record(&mut self, name: &str, supertypes: &[&str]) -> NodeId {
            let r = self.node(
                name,
                NodeKind::Record {
                    kind: RecordKind::Class,
                    supertypes: supertypes.iter().map(|s| Type::object(*s)).collect(),
                },
                Type::Unknown,
            );
            self.manager.add_declaration(r, true);
            r
        }

        fn call(&mut self, name: &str, args: &[&str], receiver: Option<Type>) -> NodeId {
            let arguments = args
                .iter()
                .map(|ty| self.node("v", NodeKind::Literal { value: "v".into() }, Type::primitive(ty).unwrap()))
                .collect();
            let callee = self.node(name, NodeKind::Reference(ReferenceExpr::default()), Type::Unknown);
            self.node(
                name,
                NodeKind::Call(CallExpr {
                    callee,
                    arguments,
                    receiver,
                    invokes: Vec::new(),
                }),
                Type::Unknown,
            )
        }

        fn resolve(&self, call: NodeId) -> CallResolutionResult {
            let hierarchy = self.manager.type_hierarchy();
            CallResolver::new(&self.manager, &hierarchy).resolve_call(call)
        }
    }

    #[test]
    fn test_overload_ranking_picks_closest() {
        let mut fx = Fixture::new(Language::cpp());
        let by_int = fx.function("f", &[("int", false)]);
        let by_long = fx.function("f", &[("long", false)]);
        let call = fx.call("f", &["short"], None);

        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Successful);
        assert_eq!(result.viable, vec![by_int, by_long]);
        assert_eq!(result.best_viable, vec![by_int]);
        assert_eq!(result.signature_results[&by_long].total_distance(), 2);
    }

    #[test]
    fn test_overload_tie_is_ambiguous() {
        let mut fx = Fixture::new(Language::cpp());
        let by_int = fx.function("f", &[("int", false)]);
        let by_long_long = fx.function("f", &[("long long", false)]);
        let call = fx.call("f", &["long"], None);

        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Ambiguous);
        assert_eq!(result.best_viable, vec![by_int, by_long_long]);
    }

    #[test]
    fn test_default_argument_coverage() {
        let mut fx = Fixture::new(Language::cpp());
        let g = fx.function("g", &[("int", false), ("int", true)]);
        let call = fx.call("g", &["int"], None);

        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Successful);
        assert_eq!(result.best_viable, vec![g]);
        assert_eq!(result.signature_results[&g].parameters[1], ParameterMatch::Default);
    }

    #[test]
    fn test_defaults_ignored_without_language_support() {
        let mut fx = Fixture::new(Language::java());
        fx.function("g", &[("int", false), ("int", true)]);
        let call = fx.call("g", &["int"], None);
        assert_eq!(fx.resolve(call).kind, CallResolutionKind::Unresolved);
    }

    #[test]
    fn test_no_overloading_is_problematic() {
        let mut fx = Fixture::new(Language::c());
        fx.function("f", &[("int", false)]);
        fx.function("f", &[("double", false)]);
        let call = fx.call("f", &["int"], None);

        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Problematic);
        assert_eq!(result.candidates.len(), 2);
        assert!(result.best_viable.is_empty());
    }

    #[test]
    fn test_unknown_callee_is_unresolved() {
        let mut fx = Fixture::new(Language::cpp());
        let call = fx.call("missing", &[], None);
        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Unresolved);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_member_call_searches_bases() {
        let mut fx = Fixture::new(Language::cpp());
        let base = fx.record("Base", &[]);
        fx.manager.enter_scope(base);
        let m = fx.function("m", &[]);
        fx.manager.leave_scope(base);
        let derived = fx.record("Derived", &["Base"]);
        fx.manager.enter_scope(derived);
        fx.manager.leave_scope(derived);

        let call = fx.call("m", &[], Some(Type::object("Derived")));
        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Successful);
        assert_eq!(result.best_viable, vec![m]);
    }

    #[test]
    fn test_unknown_receiver_dispatches_to_overrides() {
        let mut fx = Fixture::new(Language::java());
        let mut methods = Vec::new();
        for name in ["Cat", "Dog"] {
            let record = fx.record(name, &[]);
            fx.manager.enter_scope(record);
            methods.push(fx.function("speak", &[]));
            fx.manager.leave_scope(record);
        }

        let call = fx.call("speak", &[], Some(Type::Unknown));
        let result = fx.resolve(call);
        assert_eq!(result.kind, CallResolutionKind::Successful);
        assert_eq!(result.best_viable.len(), 2);
        for method in methods {
            assert!(result.best_viable.contains(&method));
        }
    }
}
