//! Serialized frontend events
//!
//! One JSON document per translation unit:
//!
//! ```json
//! {
//!   "path": "src/shapes.cpp",
//!   "language": "cpp",
//!   "events": [
//!     { "event": "declare", "id": 1, "line": 3,
//!       "decl": { "kind": "namespace", "name": "shapes" } },
//!     { "event": "enter", "id": 1 },
//!     { "event": "declare", "id": 2,
//!       "decl": { "kind": "function", "name": "area",
//!                 "parameters": [ { "declarator": "double r" } ],
//!                 "returns": "double" } },
//!     { "event": "enter", "id": 2 },
//!     { "event": "call", "id": 3, "callee": "sqrt",
//!       "arguments": [ { "name": "r" } ] },
//!     { "event": "leave", "id": 2 },
//!     { "event": "leave", "id": 1 }
//!   ]
//! }
//! ```
//!
//! Ids are local to the unit. Types are declarator or type text in the
//! unit's language; `?` stands for an unknown type.

use crate::Result;
use crate::node::RecordKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The recorded events of one translation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEvents {
    /// Source path of the unit
    pub path: String,
    /// Language name, looked up in the registry
    pub language: String,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl UnitEvents {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read an event file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// An event and the source line it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Enter the scope of a declared node, or open a statement scope
    Enter {
        id: u32,
        #[serde(default)]
        statement: Option<StatementKind>,
    },
    Leave {
        id: u32,
    },
    Declare {
        id: u32,
        decl: Declaration,
    },
    /// Type alias without a declaration node (`using T = ...`)
    Typedef {
        alias: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Reference {
        id: u32,
        name: String,
        /// Expected type at the use site (e.g. a function pointer)
        #[serde(default)]
        helper: Option<String>,
        #[serde(default, rename = "type")]
        ty: Option<String>,
    },
    Call {
        id: u32,
        callee: String,
        #[serde(default)]
        arguments: Vec<Argument>,
        /// Receiver type of a member call
        #[serde(default)]
        receiver: Option<String>,
    },
    Literal {
        id: u32,
        value: String,
        #[serde(default, rename = "type")]
        ty: Option<String>,
    },
    Label {
        id: u32,
        label: String,
        /// Previously entered statement the label names
        #[serde(default)]
        statement: Option<u32>,
    },
    Break {
        id: u32,
        #[serde(default)]
        label: Option<String>,
    },
    Continue {
        id: u32,
        #[serde(default)]
        label: Option<String>,
    },
}

/// Statement nodes that open a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Block,
    Loop,
    Switch,
    Try,
    If,
    Lambda,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Variable {
        declarator: String,
    },
    Field {
        declarator: String,
    },
    EnumConstant {
        name: String,
    },
    Function {
        name: String,
        #[serde(default)]
        parameters: Vec<ParameterSpec>,
        #[serde(default)]
        returns: Option<String>,
        #[serde(default = "default_true")]
        definition: bool,
    },
    Record {
        name: String,
        /// `kind` is taken by the declaration tag
        #[serde(default, rename = "record_kind")]
        kind: RecordKind,
        #[serde(default)]
        supertypes: Vec<String>,
    },
    Template {
        name: String,
        #[serde(default)]
        parameters: Vec<String>,
    },
    Namespace {
        name: String,
    },
    Typedef {
        declarator: String,
    },
    Import {
        target: String,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        wildcard: bool,
    },
    Include {
        path: String,
    },
    Problem {
        message: String,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub declarator: String,
    /// Default value expression text
    #[serde(default)]
    pub default: Option<String>,
}

/// A call argument: a named value, a literal, or just a type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
}
