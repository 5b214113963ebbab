//! Replaying a unit's events into its own scope manager
//!
//! The translation unit node is created and entered first and left last.
//! Unit-local ids are mapped to fresh `NodeId`s as nodes are created.
//! Functions and templates declare their parameters when first entered.
//!
//! Malformed streams (unknown or duplicate ids) are errors; structural
//! misuse (unmatched leave, stray break) becomes a manager diagnostic.

use super::events::{Argument, Declaration, Event, EventRecord, ParameterSpec, StatementKind, UnitEvents};
use crate::language::{Language, LanguageRegistry};
use crate::name::Name;
use crate::node::{
    CallExpr, FunctionDecl, ImportDecl, Location, Node, NodeId, NodeKind, ParameterDecl, ReferenceExpr,
};
use crate::scope::ScopeManager;
use crate::types::{Declarator, Type, TypeParser};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Spelling of an unknown type in event files
const UNKNOWN_TYPE: &str = "?";

/// Build the scope manager of one unit
pub fn replay_unit(unit: &UnitEvents, registry: &LanguageRegistry) -> Result<ScopeManager> {
    let language = registry
        .find(&unit.language)
        .ok_or_else(|| Error::UnknownLanguage(unit.language.clone()))?;
    let mut replay = Replay::new(&unit.path, language);

    let translation_unit = replay.add(
        &unit.path,
        NodeKind::TranslationUnit { path: unit.path.clone() },
        Type::Unknown,
    );
    replay.manager.enter_scope(translation_unit);
    for record in &unit.events {
        replay.apply(record)?;
    }
    replay.manager.leave_scope(translation_unit);

    debug!(
        "Replayed {}: {} events, {} nodes, {} scopes",
        unit.path,
        unit.events.len(),
        replay.manager.nodes().len(),
        replay.manager.scope_count()
    );
    Ok(replay.manager)
}

struct Replay {
    manager: ScopeManager,
    language: Arc<Language>,
    parser: TypeParser,
    file: String,
    line: Option<u32>,
    ids: HashMap<u32, NodeId>,
    /// Nodes whose parameters were already declared
    entered: HashSet<NodeId>,
}

impl Replay {
    fn new(file: &str, language: Arc<Language>) -> Self {
        Self {
            manager: ScopeManager::new(),
            parser: language.type_parser(),
            language,
            file: file.to_string(),
            line: None,
            ids: HashMap::new(),
            entered: HashSet::new(),
        }
    }

    fn apply(&mut self, record: &EventRecord) -> Result<()> {
        self.line = record.line;
        match &record.event {
            Event::Enter { id, statement } => self.enter(*id, *statement)?,
            Event::Leave { id } => {
                let node = self.lookup(*id)?;
                self.manager.leave_scope(node);
            }
            Event::Declare { id, decl } => {
                let node = self.declaration(decl);
                self.bind(*id, node)?;
                self.manager.add_declaration(node, true);
            }
            Event::Typedef { alias, ty } => {
                let ty = self.parse_type(ty);
                self.manager.add_typedef(alias.clone(), ty);
            }
            Event::Reference { id, name, helper, ty } => {
                let helper = helper.as_deref().map(|h| self.parse_type(h));
                let ty = ty.as_deref().map(|t| self.parse_type(t)).unwrap_or(Type::Unknown);
                let node = self.reference(name, helper, ty);
                self.bind(*id, node)?;
            }
            Event::Call { id, callee, arguments, receiver } => {
                let node = self.call(callee, arguments, receiver.as_deref());
                self.bind(*id, node)?;
            }
            Event::Literal { id, value, ty } => {
                let ty = ty.as_deref().map(|t| self.parse_type(t)).unwrap_or(Type::Unknown);
                let node = self.add(value, NodeKind::Literal { value: value.clone() }, ty);
                self.bind(*id, node)?;
            }
            Event::Label { id, label, statement } => {
                let statement = statement.map(|s| self.lookup(s)).transpose()?;
                let node = self.add(
                    label,
                    NodeKind::Label { label: label.clone(), statement },
                    Type::Unknown,
                );
                self.bind(*id, node)?;
                self.manager.add_label(node);
            }
            Event::Break { id, label } => {
                let node = self.add("break", NodeKind::Break { label: label.clone() }, Type::Unknown);
                self.bind(*id, node)?;
                self.manager.add_break(node);
            }
            Event::Continue { id, label } => {
                let node = self.add("continue", NodeKind::Continue { label: label.clone() }, Type::Unknown);
                self.bind(*id, node)?;
                self.manager.add_continue(node);
            }
        }
        Ok(())
    }

    fn enter(&mut self, id: u32, statement: Option<StatementKind>) -> Result<()> {
        let node = match (self.ids.get(&id).copied(), statement) {
            (Some(node), _) => node,
            (None, Some(kind)) => {
                let kind = match kind {
                    StatementKind::Block => NodeKind::Block,
                    StatementKind::Loop => NodeKind::Loop,
                    StatementKind::Switch => NodeKind::Switch,
                    StatementKind::Try => NodeKind::Try,
                    StatementKind::If => NodeKind::If,
                    StatementKind::Lambda => NodeKind::Lambda,
                };
                let node = self.add("", kind, Type::Unknown);
                self.bind(id, node)?;
                node
            }
            (None, None) => {
                return Err(Error::Event(format!(
                    "{}: enter of undeclared id {} without a statement kind",
                    self.file, id
                )));
            }
        };

        self.manager.enter_scope(node);
        if self.entered.insert(node) {
            let parameters = match self.manager.node(node).map(|n| &n.kind) {
                Some(NodeKind::Function(function)) => function.parameters.clone(),
                Some(NodeKind::Template { parameters }) => parameters.clone(),
                _ => Vec::new(),
            };
            for parameter in parameters {
                self.manager.add_declaration(parameter, true);
            }
        }
        Ok(())
    }

    fn declaration(&mut self, decl: &Declaration) -> NodeId {
        match decl {
            Declaration::Variable { declarator } => {
                let d = self.parse_declarator(declarator);
                self.add(d.name.as_deref().unwrap_or(""), NodeKind::Variable, d.ty)
            }
            Declaration::Field { declarator } => {
                let d = self.parse_declarator(declarator);
                self.add(d.name.as_deref().unwrap_or(""), NodeKind::Field, d.ty)
            }
            Declaration::EnumConstant { name } => {
                let ty = self
                    .manager
                    .current_record()
                    .and_then(|r| self.manager.node(r))
                    .map(|r| Type::object(r.name.clone()))
                    .unwrap_or(Type::Unknown);
                self.add(name, NodeKind::EnumConstant, ty)
            }
            Declaration::Function { name, parameters, returns, definition } => {
                let parameters: Vec<NodeId> = parameters.iter().map(|p| self.parameter(p)).collect();
                let return_type = returns.as_deref().map(|r| self.parse_type(r)).unwrap_or(Type::Unknown);
                let parameter_types = parameters
                    .iter()
                    .filter_map(|p| self.manager.node(*p))
                    .map(|p| p.ty.clone())
                    .collect();
                let ty = Type::function_pointer(parameter_types, return_type.clone());
                self.add(
                    name,
                    NodeKind::Function(FunctionDecl {
                        parameters,
                        return_type,
                        is_definition: *definition,
                        record: None,
                    }),
                    ty,
                )
            }
            Declaration::Record { name, kind, supertypes } => {
                let supertypes = supertypes.iter().map(|s| self.parse_type(s)).collect();
                let ty = Type::object(self.language.parse_name(name));
                self.add(name, NodeKind::Record { kind: *kind, supertypes }, ty)
            }
            Declaration::Template { name, parameters } => {
                let parameters = parameters
                    .iter()
                    .map(|p| {
                        self.add(
                            p,
                            NodeKind::Parameter(ParameterDecl { variadic: false, default: None }),
                            Type::Unknown,
                        )
                    })
                    .collect();
                self.add(name, NodeKind::Template { parameters }, Type::Unknown)
            }
            Declaration::Namespace { name } => self.add(name, NodeKind::Namespace, Type::Unknown),
            Declaration::Typedef { declarator } => {
                let d = self.parse_declarator(declarator);
                let alias = d.name.clone().unwrap_or_default();
                self.add(&alias, NodeKind::Typedef { target: d.ty.clone() }, d.ty)
            }
            Declaration::Import { target, alias, wildcard } => {
                let target = self.language.parse_name(target);
                let name = alias.clone().unwrap_or_else(|| target.local_name().to_string());
                self.add(
                    &name,
                    NodeKind::Import(ImportDecl {
                        target,
                        alias: alias.clone(),
                        wildcard: *wildcard,
                    }),
                    Type::Unknown,
                )
            }
            Declaration::Include { path } => self.add(path, NodeKind::Include { path: path.clone() }, Type::Unknown),
            Declaration::Problem { message } => {
                self.add("problem", NodeKind::Problem { message: message.clone() }, Type::Unknown)
            }
        }
    }

    fn parameter(&mut self, spec: &ParameterSpec) -> NodeId {
        let d = self.parse_declarator(&spec.declarator);
        let default = spec
            .default
            .as_ref()
            .map(|value| self.add(value, NodeKind::Literal { value: value.clone() }, Type::Unknown));
        self.add(
            d.name.as_deref().unwrap_or(""),
            NodeKind::Parameter(ParameterDecl { variadic: d.variadic, default }),
            d.ty,
        )
    }

    fn reference(&mut self, name: &str, helper: Option<Type>, ty: Type) -> NodeId {
        self.add(name, NodeKind::Reference(ReferenceExpr { helper, refers_to: None }), ty)
    }

    fn call(&mut self, callee: &str, arguments: &[Argument], receiver: Option<&str>) -> NodeId {
        let callee_node = self.reference(callee, None, Type::Unknown);
        let arguments = arguments.iter().map(|a| self.argument(a)).collect();
        let receiver = receiver.map(|r| self.parse_type(r));
        self.add(
            callee,
            NodeKind::Call(CallExpr {
                callee: callee_node,
                arguments,
                receiver,
                invokes: Vec::new(),
            }),
            Type::Unknown,
        )
    }

    fn argument(&mut self, argument: &Argument) -> NodeId {
        let ty = argument.ty.as_deref().map(|t| self.parse_type(t)).unwrap_or(Type::Unknown);
        match (&argument.name, &argument.value) {
            (Some(name), _) => self.reference(name, None, ty),
            (None, Some(value)) => self.add(value, NodeKind::Literal { value: value.clone() }, ty),
            (None, None) => self.add(UNKNOWN_TYPE, NodeKind::Literal { value: String::new() }, ty),
        }
    }

    fn add(&mut self, name: &str, kind: NodeKind, ty: Type) -> NodeId {
        let name = match &kind {
            // Paths and literal text are not qualified names
            NodeKind::TranslationUnit { .. } | NodeKind::Include { .. } | NodeKind::Literal { .. } => {
                Name::local(name).with_delimiter(self.language.namespace_delimiter.clone())
            }
            _ => self.language.parse_name(name),
        };
        let mut node = Node::new(name, kind, self.language.clone()).with_type(ty);
        if let Some(line) = self.line {
            node = node.with_location(Location {
                file: self.file.clone(),
                line,
            });
        }
        self.manager.add_node(node)
    }

    fn bind(&mut self, id: u32, node: NodeId) -> Result<()> {
        if self.ids.insert(id, node).is_some() {
            return Err(Error::Event(format!("{}: duplicate id {}", self.file, id)));
        }
        Ok(())
    }

    fn lookup(&self, id: u32) -> Result<NodeId> {
        self.ids
            .get(&id)
            .copied()
            .ok_or_else(|| Error::Event(format!("{}: unknown id {}", self.file, id)))
    }

    fn parse_type(&self, text: &str) -> Type {
        if text.trim() == UNKNOWN_TYPE {
            return Type::Unknown;
        }
        self.parser.parse_type(text).unwrap_or_else(|e| {
            warn!("{}: {}, treating '{}' as unknown", self.file, e, text);
            Type::Unknown
        })
    }

    fn parse_declarator(&self, text: &str) -> Declarator {
        let text = text.trim();
        // A bare identifier is an untyped name (`x` in Python), not a type
        if !text.is_empty()
            && text.chars().all(|c| c.is_alphanumeric() || c == '_')
            && Type::primitive(text).is_none()
        {
            return Declarator {
                ty: Type::Unknown,
                name: Some(text.to_string()),
                variadic: false,
            };
        }
        self.parser.parse_declaration(text).unwrap_or_else(|e| {
            warn!("{}: {}, treating '{}' as untyped", self.file, e, text);
            Declarator {
                ty: Type::Unknown,
                name: text.split_whitespace().last().map(str::to_string),
                variadic: false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::default_registry;
    use crate::node::RecordKind;
    use crate::scope::ScopeKind;

    fn replay(json: &str) -> ScopeManager {
        replay_unit(&UnitEvents::from_json(json).unwrap(), &default_registry()).unwrap()
    }

    #[test]
    fn test_replay_builds_scopes() {
        let manager = replay(
            r#"{ "path": "a.cpp", "language": "cpp", "events": [
                { "event": "declare", "id": 1, "decl": { "kind": "namespace", "name": "geo" } },
                { "event": "enter", "id": 1 },
                { "event": "declare", "id": 2, "line": 4,
                  "decl": { "kind": "function", "name": "scale",
                            "parameters": [ { "declarator": "double factor" } ], "returns": "void" } },
                { "event": "enter", "id": 2 },
                { "event": "enter", "id": 3, "statement": "block" },
                { "event": "declare", "id": 4, "decl": { "kind": "variable", "declarator": "int * p" } },
                { "event": "leave", "id": 3 },
                { "event": "leave", "id": 2 },
                { "event": "leave", "id": 1 }
            ] }"#,
        );

        assert!(manager.diagnostics().is_empty());
        let geo = manager.lookup_scope_by_fqn(&Name::from("geo")).unwrap();
        let scale = manager.scope(geo).unwrap().symbols("scale")[0];
        let function_scope = manager.lookup_scope(scale).unwrap();
        let parameter = manager.scope(function_scope).unwrap().symbols("factor")[0];
        assert_eq!(manager.node(parameter).unwrap().ty, Type::primitive("double").unwrap());
        assert_eq!(manager.node(scale).unwrap().location.as_ref().unwrap().line, 4);
        assert_eq!(manager.filter_scopes(|s| s.kind == ScopeKind::Block).len(), 1);
        assert_eq!(manager.current_scope(), manager.global_scope());
    }

    #[test]
    fn test_record_supertypes_reach_the_hierarchy() {
        let manager = replay(
            r#"{ "path": "shapes.cpp", "language": "cpp", "events": [
                { "event": "declare", "id": 1, "decl": { "kind": "record", "name": "Base" } },
                { "event": "enter", "id": 1 },
                { "event": "leave", "id": 1 },
                { "event": "declare", "id": 2,
                  "decl": { "kind": "record", "name": "Point", "record_kind": "struct", "supertypes": ["Base"] } },
                { "event": "enter", "id": 2 },
                { "event": "leave", "id": 2 }
            ] }"#,
        );

        assert!(manager.diagnostics().is_empty());
        let point = manager.find_symbols(&Name::from("Point"), None)[0];
        let NodeKind::Record { kind, supertypes } = &manager.node(point).unwrap().kind else {
            panic!("expected record");
        };
        assert_eq!(*kind, RecordKind::Struct);
        assert_eq!(supertypes.len(), 1);

        let hierarchy = manager.type_hierarchy();
        assert_eq!(hierarchy.supertypes(&Name::from("Point")), &[Name::from("Base")]);
        assert!(hierarchy.is_ancestor(&Name::from("Base"), &Name::from("Point")));
        assert!(!hierarchy.is_ancestor(&Name::from("Point"), &Name::from("Base")));
    }

    #[test]
    fn test_typedef_declaration() {
        let manager = replay(
            r#"{ "path": "t.cpp", "language": "cpp", "events": [
                { "event": "declare", "id": 1, "decl": { "kind": "namespace", "name": "util" } },
                { "event": "enter", "id": 1 },
                { "event": "declare", "id": 2, "decl": { "kind": "typedef", "declarator": "int myint" } },
                { "event": "leave", "id": 1 }
            ] }"#,
        );

        let util = manager.lookup_scope_by_fqn(&Name::from("util")).unwrap();
        assert_eq!(manager.typedef_for("myint", Some(util)), Some(Type::primitive("int").unwrap()));
        assert_eq!(manager.typedef_for("myint", None), None);
    }

    #[test]
    fn test_import_alias_declaration() {
        let manager = replay(
            r#"{ "path": "i.cpp", "language": "cpp", "events": [
                { "event": "declare", "id": 1, "decl": { "kind": "namespace", "name": "outer" } },
                { "event": "enter", "id": 1 },
                { "event": "declare", "id": 2, "decl": { "kind": "variable", "declarator": "int x" } },
                { "event": "leave", "id": 1 },
                { "event": "declare", "id": 3, "decl": { "kind": "import", "target": "outer", "alias": "o" } }
            ] }"#,
        );

        let file = manager.filter_scopes(|s| s.kind == ScopeKind::File)[0];
        let x = manager.scope(manager.lookup_scope_by_fqn(&Name::from("outer")).unwrap()).unwrap().symbols("x")[0];
        assert_eq!(manager.scope(file).unwrap().imports().len(), 1);
        assert_eq!(manager.find_symbols(&Name::from("o::x"), Some(file)), vec![x]);
    }

    #[test]
    fn test_unknown_language() {
        let unit = UnitEvents::from_json(r#"{ "path": "a.cob", "language": "cobol" }"#).unwrap();
        assert!(matches!(
            replay_unit(&unit, &default_registry()),
            Err(Error::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_duplicate_and_unknown_ids() {
        let duplicate = UnitEvents::from_json(
            r#"{ "path": "a.c", "language": "c", "events": [
                { "event": "literal", "id": 1, "value": "1" },
                { "event": "literal", "id": 1, "value": "2" }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(replay_unit(&duplicate, &default_registry()), Err(Error::Event(_))));

        let unknown = UnitEvents::from_json(
            r#"{ "path": "a.c", "language": "c", "events": [ { "event": "leave", "id": 9 } ] }"#,
        )
        .unwrap();
        assert!(matches!(replay_unit(&unknown, &default_registry()), Err(Error::Event(_))));
    }

    #[test]
    fn test_structural_misuse_is_a_diagnostic() {
        let manager = replay(
            r#"{ "path": "a.c", "language": "c", "events": [
                { "event": "break", "id": 1, "line": 7 }
            ] }"#,
        );
        assert_eq!(manager.diagnostics().len(), 1);
        assert_eq!(manager.diagnostics()[0].location.as_ref().unwrap().line, 7);
    }

    #[test]
    fn test_bad_type_text_becomes_unknown() {
        let manager = replay(
            r#"{ "path": "a.cpp", "language": "cpp", "events": [
                { "event": "reference", "id": 1, "name": "x", "type": "int (((" },
                { "event": "reference", "id": 2, "name": "y", "type": "?" }
            ] }"#,
        );
        assert!(manager.nodes().iter().filter(|n| matches!(n.kind, NodeKind::Reference(_))).all(|n| n.ty.is_unknown()));
    }
}
