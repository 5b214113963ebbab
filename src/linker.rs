//! Bulk resolution over a merged scope manager
//!
//! Calls are resolved first; their targets are written to the call's
//! `invokes` and the callee reference's `refers_to`. Every other reference
//! is then resolved by name.

use crate::call::{CallResolutionKind, CallResolutionResult, CallResolver};
use crate::node::{NodeId, NodeKind};
use crate::scope::ScopeManager;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkerStats {
    pub total: usize,
    pub calls: usize,
    pub references: usize,
    pub resolved: usize,
    pub ambiguous: usize,
    pub problematic: usize,
    pub unresolved: usize,
}

impl fmt::Display for LinkerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Linker Stats:")?;
        writeln!(f, "  Total: {} ({} calls, {} references)", self.total, self.calls, self.references)?;
        writeln!(f, "  ✅ Resolved: {}", self.resolved)?;
        writeln!(f, "  🤔 Ambiguous: {}", self.ambiguous)?;
        writeln!(f, "  ⚠️ Problematic: {}", self.problematic)?;
        writeln!(f, "  ❌ Unresolved: {}", self.unresolved)
    }
}

/// Outcome of one call site, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallOutcome {
    pub call: NodeId,
    pub callee: String,
    pub result: CallResolutionResult,
}

pub struct Linker<'a> {
    manager: &'a mut ScopeManager,
}

impl<'a> Linker<'a> {
    pub fn new(manager: &'a mut ScopeManager) -> Self {
        Self { manager }
    }

    pub fn run(&mut self) -> (LinkerStats, Vec<CallOutcome>) {
        let mut stats = LinkerStats::default();

        let mut calls = self
            .manager
            .nodes()
            .ids_where(|n| matches!(n.kind, NodeKind::Call(_)));
        calls.sort();

        let hierarchy = self.manager.type_hierarchy();
        let outcomes: Vec<CallOutcome> = {
            let resolver = CallResolver::new(self.manager, &hierarchy);
            calls
                .iter()
                .map(|call| CallOutcome {
                    call: *call,
                    callee: self
                        .manager
                        .node(*call)
                        .map(|n| n.name.to_string())
                        .unwrap_or_default(),
                    result: resolver.resolve_call(*call),
                })
                .collect()
        };

        let mut callees = HashSet::new();
        for outcome in &outcomes {
            stats.calls += 1;
            match outcome.result.kind {
                CallResolutionKind::Successful => stats.resolved += 1,
                CallResolutionKind::Ambiguous => stats.ambiguous += 1,
                CallResolutionKind::Problematic => stats.problematic += 1,
                CallResolutionKind::Unresolved => stats.unresolved += 1,
            }
            if let Some(callee) = self.write_call(outcome) {
                callees.insert(callee);
            }
        }

        let mut references = self.manager.nodes().ids_where(|n| matches!(n.kind, NodeKind::Reference(_)));
        references.retain(|r| !callees.contains(r));
        references.sort();
        for reference in references {
            stats.references += 1;
            let target = self.manager.resolve_reference(reference);
            if let Some(NodeKind::Reference(expr)) = self.manager.node_mut(reference).map(|n| &mut n.kind) {
                expr.refers_to = target;
            }
            match target {
                Some(_) => stats.resolved += 1,
                None => stats.unresolved += 1,
            }
        }

        stats.total = stats.calls + stats.references;
        info!(
            "Linked {} calls and {} references: {} resolved, {} unresolved",
            stats.calls, stats.references, stats.resolved, stats.unresolved
        );
        (stats, outcomes)
    }

    /// Record call targets on the graph; returns the callee reference
    fn write_call(&mut self, outcome: &CallOutcome) -> Option<NodeId> {
        let targets = match outcome.result.kind {
            CallResolutionKind::Successful => outcome.result.best_viable.clone(),
            _ => Vec::new(),
        };
        let callee = match self.manager.node_mut(outcome.call).map(|n| &mut n.kind) {
            Some(NodeKind::Call(expr)) => {
                expr.invokes = targets.clone();
                expr.callee
            }
            _ => return None,
        };
        if let Some(NodeKind::Reference(expr)) = self.manager.node_mut(callee).map(|n| &mut n.kind) {
            expr.refers_to = targets.first().copied();
        }
        debug!("Call {} invokes {:?}", outcome.call, targets);
        Some(callee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::UnitEvents;
    use crate::language::default_registry;
    use crate::pipeline::Pipeline;

    fn merged(units: &[&str]) -> ScopeManager {
        let registry = default_registry();
        let units = units.iter().map(|u| UnitEvents::from_json(u).unwrap()).collect();
        Pipeline::new(&registry).with_workers(1).process(units).unwrap().manager
    }

    fn reference_target(manager: &ScopeManager, name: &str) -> Option<NodeId> {
        manager
            .nodes()
            .iter()
            .find_map(|n| match &n.kind {
                NodeKind::Reference(expr) if n.name.local_name() == name => Some(expr.refers_to),
                _ => None,
            })
            .flatten()
    }

    #[test]
    fn test_links_across_units() {
        let mut manager = merged(&[
            r#"{ "path": "math.cpp", "language": "cpp", "events": [
                { "event": "declare", "id": 1, "decl": { "kind": "function", "name": "square",
                  "parameters": [ { "declarator": "int x" } ], "returns": "int" } },
                { "event": "declare", "id": 2, "decl": { "kind": "variable", "declarator": "int total" } }
            ] }"#,
            r#"{ "path": "main.cpp", "language": "cpp", "events": [
                { "event": "call", "id": 1, "callee": "square", "arguments": [ { "value": "5", "type": "int" } ] },
                { "event": "reference", "id": 2, "name": "total" },
                { "event": "reference", "id": 3, "name": "missing" }
            ] }"#,
        ]);

        let (stats, outcomes) = Linker::new(&mut manager).run();
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.references, 2);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.unresolved, 1);

        let square = manager
            .nodes()
            .iter()
            .find(|n| n.is_function() && n.name.local_name() == "square")
            .map(|n| n.id)
            .unwrap();
        assert_eq!(outcomes[0].result.best_viable, vec![square]);
        let call = manager.node(outcomes[0].call).unwrap();
        let NodeKind::Call(expr) = &call.kind else {
            panic!("expected call");
        };
        assert_eq!(expr.invokes, vec![square]);
        assert_eq!(reference_target(&manager, "square"), Some(square));
        assert!(reference_target(&manager, "total").is_some());
        assert_eq!(reference_target(&manager, "missing"), None);
    }

    #[test]
    fn test_ambiguous_call_invokes_nothing() {
        let mut manager = merged(&[r#"{ "path": "a.cpp", "language": "cpp", "events": [
            { "event": "declare", "id": 1, "decl": { "kind": "function", "name": "f",
              "parameters": [ { "declarator": "int a" } ] } },
            { "event": "declare", "id": 2, "decl": { "kind": "function", "name": "f",
              "parameters": [ { "declarator": "long long a" } ] } },
            { "event": "call", "id": 3, "callee": "f", "arguments": [ { "value": "1L", "type": "long" } ] }
        ] }"#]);

        let (stats, outcomes) = Linker::new(&mut manager).run();
        assert_eq!(stats.ambiguous, 1);
        assert_eq!(outcomes[0].result.best_viable.len(), 2);
        assert_eq!(reference_target(&manager, "f"), None);
    }

    fn prototype_units(language: &str) -> Vec<String> {
        ["a", "b"]
            .iter()
            .map(|unit| {
                format!(
                    r#"{{ "path": "{unit}.{language}", "language": "{language}", "events": [
                        {{ "event": "declare", "id": 1, "decl": {{ "kind": "function", "name": "f",
                          "parameters": [ {{ "declarator": "int a" }} ], "definition": false }} }},
                        {{ "event": "declare", "id": 2, "decl": {{ "kind": "function", "name": "f",
                          "parameters": [ {{ "declarator": "int a" }} ], "definition": false }} }}
                    ] }}"#
                )
            })
            .collect()
    }

    #[test]
    fn test_header_prototypes_in_every_unit_resolve_once() {
        for language in ["c", "cpp"] {
            let mut units = prototype_units(language);
            units.push(format!(
                r#"{{ "path": "main.{language}", "language": "{language}", "events": [
                    {{ "event": "call", "id": 1, "callee": "f", "arguments": [ {{ "value": "1", "type": "int" }} ] }}
                ] }}"#
            ));
            let units: Vec<&str> = units.iter().map(String::as_str).collect();
            let mut manager = merged(&units);
            // The second unit's prototypes fold into the first unit's
            let global = manager.scope(manager.global_scope()).unwrap();
            assert_eq!(global.symbols("f").len(), 2, "{language}");

            let (stats, outcomes) = Linker::new(&mut manager).run();
            assert_eq!(stats.resolved, 1, "{language}");
            assert_eq!(outcomes[0].result.kind, CallResolutionKind::Successful, "{language}");
            assert_eq!(outcomes[0].result.best_viable.len(), 1, "{language}");
            let NodeKind::Call(expr) = &manager.node(outcomes[0].call).unwrap().kind else {
                panic!("expected call");
            };
            assert_eq!(expr.invokes.len(), 1);
        }
    }
}
