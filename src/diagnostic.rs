//! Diagnostics for structural misuse
//!
//! Input source may be valid yet incomplete from the analysis' point of
//! view, so misuse never aborts processing. Each problem is logged, recorded
//! here with its source location, and the operation falls back to leaving the
//! scope tree unchanged.

use crate::node::Location;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `leave_scope` without a matching `enter_scope`
    UnmatchedLeave,
    /// `enter_scope` on a node kind that has no scope
    NoScopeForNode,
    /// Node id not present in the store
    UnknownNode,
    /// No enclosing scope can hold the declaration
    NoHoldingScope,
    /// Not a declaration
    NotADeclaration,
    BreakOutsideBreakable,
    ContinueOutsideContinuable,
    LabelOutsideFunction,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnmatchedLeave => "unmatched-leave",
            DiagnosticKind::NoScopeForNode => "no-scope-for-node",
            DiagnosticKind::UnknownNode => "unknown-node",
            DiagnosticKind::NoHoldingScope => "no-holding-scope",
            DiagnosticKind::NotADeclaration => "not-a-declaration",
            DiagnosticKind::BreakOutsideBreakable => "break-outside-breakable",
            DiagnosticKind::ContinueOutsideContinuable => "continue-outside-continuable",
            DiagnosticKind::LabelOutsideFunction => "label-outside-function",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structural problem found while building scopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: [{}] {}", location, self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
