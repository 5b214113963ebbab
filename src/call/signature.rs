//! Signature compatibility between call arguments and a candidate
//!
//! Parameters are walked in order:
//! - a variadic parameter accepts every remaining argument
//! - a positional parameter needs an argument that casts to its type
//! - a missing argument may be covered by a default value, when the
//!   language has default arguments
//! Extra arguments without a variadic parameter make the candidate
//! incompatible.

use crate::node::{Node, NodeKind};
use crate::types::{CastContext, CastResult, Type, TypeHierarchy};
use serde::Serialize;

/// How one parameter was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum ParameterMatch {
    /// An argument converted to the parameter type
    Cast { result: CastResult },
    /// No argument; the parameter's default value is used
    Default,
    /// Variadic parameter absorbing the remaining arguments
    Variadic,
}

impl ParameterMatch {
    pub fn distance(&self) -> u32 {
        match self {
            ParameterMatch::Cast { result } => result.distance().unwrap_or(0),
            ParameterMatch::Default | ParameterMatch::Variadic => 0,
        }
    }
}

/// A compatible signature with per-parameter details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureMatch {
    pub parameters: Vec<ParameterMatch>,
}

impl SignatureMatch {
    /// Sum of cast distances; lower ranks better
    pub fn total_distance(&self) -> u32 {
        self.parameters.iter().map(ParameterMatch::distance).sum()
    }

    /// Number of parameters satisfied by their default value
    pub fn defaults_used(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| matches!(p, ParameterMatch::Default))
            .count()
    }
}

/// A call argument or candidate parameter with its resolved type
#[derive(Debug, Clone, Copy)]
pub struct Typed<'a> {
    pub node: &'a Node,
    pub ty: &'a Type,
}

/// Check `arguments` against `parameters`; `None` if incompatible
pub fn match_signature(
    arguments: &[Typed<'_>],
    parameters: &[Typed<'_>],
    defaults_allowed: bool,
    hierarchy: &TypeHierarchy,
) -> Option<SignatureMatch> {
    let mut matches = Vec::with_capacity(parameters.len());

    for (index, parameter) in parameters.iter().enumerate() {
        let (variadic, has_default) = match &parameter.node.kind {
            NodeKind::Parameter(decl) => (decl.variadic, decl.default.is_some()),
            _ => (false, false),
        };
        if variadic {
            matches.push(ParameterMatch::Variadic);
            return Some(SignatureMatch { parameters: matches });
        }

        match arguments.get(index) {
            Some(argument) => {
                let ctx = CastContext::new(hierarchy)
                    .with_argument(argument.node)
                    .with_parameter(parameter.node);
                let result = argument.ty.try_cast(parameter.ty, &ctx);
                if !result.is_possible() {
                    return None;
                }
                matches.push(ParameterMatch::Cast { result });
            }
            None if defaults_allowed && has_default => matches.push(ParameterMatch::Default),
            None => return None,
        }
    }

    if arguments.len() > parameters.len() {
        return None;
    }
    Some(SignatureMatch { parameters: matches })
}
