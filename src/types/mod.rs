//! Type model - a closed set of language-agnostic types
//!
//! Every frontend maps its types into these variants:
//! - `Primitive`: built-in numeric/boolean/character types
//! - `Pointer` / `Reference`: indirections, with pointer origin (pointer or array)
//! - `FunctionPointer`: parameter types and a return type
//! - `Object`: named (possibly generic) types, optionally bound to a record
//! - `Tuple`: ordered element types
//! - `Unknown`: the type could not be determined
//! - `Incomplete`: a type without a complete definition (`void`)
//!
//! Types are immutable values compared structurally.

pub mod cast;
pub mod hierarchy;
pub mod parse;

pub use cast::{CastContext, CastResult};
pub use hierarchy::TypeHierarchy;
pub use parse::{Declarator, TypeParser};

use crate::name::Name;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signedness of a primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signedness {
    Signed,
    Unsigned,
    NotApplicable,
}

/// Where a pointer type came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerOrigin {
    Pointer,
    Array,
}

/// A named type such as a class, struct or generic instantiation.
///
/// Equality compares the name, the ordered generic arguments and whether
/// the type is bound to a record declaration. The record node itself is not
/// compared: two units may bind the same class to different declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: Name,
    #[serde(default)]
    pub generics: Vec<Type>,
    #[serde(skip)]
    pub record: Option<NodeId>,
}

impl ObjectType {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            record: None,
        }
    }

    pub fn with_generics(mut self, generics: Vec<Type>) -> Self {
        self.generics = generics;
        self
    }

    pub fn with_record(mut self, record: NodeId) -> Self {
        self.record = Some(record);
        self
    }
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.generics == other.generics
            && self.record.is_some() == other.record.is_some()
    }
}

impl Eq for ObjectType {}

impl std::hash::Hash for ObjectType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.generics.hash(state);
        self.record.is_some().hash(state);
    }
}

/// Language-agnostic type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Type {
    Primitive {
        name: String,
        bit_width: u16,
        signedness: Signedness,
    },
    Pointer {
        element: Box<Type>,
        origin: PointerOrigin,
    },
    Reference {
        element: Box<Type>,
    },
    FunctionPointer {
        parameters: Vec<Type>,
        return_type: Box<Type>,
    },
    Object(ObjectType),
    Tuple {
        elements: Vec<Type>,
    },
    Unknown,
    Incomplete,
}

/// Built-in primitive: name, bit width, signedness, conversion rank.
///
/// Rank orders the implicit numeric conversions; it is what cast distances
/// are measured in.
struct PrimitiveInfo {
    name: &'static str,
    bits: u16,
    signedness: Signedness,
    rank: u32,
}

const fn prim(name: &'static str, bits: u16, signedness: Signedness, rank: u32) -> PrimitiveInfo {
    PrimitiveInfo { name, bits, signedness, rank }
}

const PRIMITIVES: &[PrimitiveInfo] = &[
    prim("bool", 8, Signedness::NotApplicable, 0),
    prim("boolean", 8, Signedness::NotApplicable, 0),
    prim("char", 8, Signedness::NotApplicable, 1),
    prim("signed char", 8, Signedness::Signed, 1),
    prim("unsigned char", 8, Signedness::Unsigned, 1),
    prim("byte", 8, Signedness::Signed, 1),
    prim("int8", 8, Signedness::Signed, 1),
    prim("uint8", 8, Signedness::Unsigned, 1),
    prim("short", 16, Signedness::Signed, 2),
    prim("unsigned short", 16, Signedness::Unsigned, 2),
    prim("int16", 16, Signedness::Signed, 2),
    prim("uint16", 16, Signedness::Unsigned, 2),
    prim("int", 32, Signedness::Signed, 3),
    prim("unsigned int", 32, Signedness::Unsigned, 3),
    prim("int32", 32, Signedness::Signed, 3),
    prim("uint32", 32, Signedness::Unsigned, 3),
    prim("long", 64, Signedness::Signed, 4),
    prim("unsigned long", 64, Signedness::Unsigned, 4),
    prim("int64", 64, Signedness::Signed, 4),
    prim("uint64", 64, Signedness::Unsigned, 4),
    prim("long long", 64, Signedness::Signed, 5),
    prim("unsigned long long", 64, Signedness::Unsigned, 5),
    prim("float", 32, Signedness::NotApplicable, 6),
    prim("float32", 32, Signedness::NotApplicable, 6),
    prim("double", 64, Signedness::NotApplicable, 7),
    prim("float64", 64, Signedness::NotApplicable, 7),
    prim("long double", 128, Signedness::NotApplicable, 8),
];

fn primitive_info(name: &str) -> Option<&'static PrimitiveInfo> {
    PRIMITIVES.iter().find(|p| p.name == name)
}

impl Type {
    /// Look up a built-in primitive by its canonical name
    pub fn primitive(name: &str) -> Option<Type> {
        primitive_info(name).map(|p| Type::Primitive {
            name: p.name.to_string(),
            bit_width: p.bits,
            signedness: p.signedness,
        })
    }

    /// Create an object type without generics or record binding
    pub fn object(name: impl Into<Name>) -> Type {
        Type::Object(ObjectType::new(name))
    }

    pub fn function_pointer(parameters: Vec<Type>, return_type: Type) -> Type {
        Type::FunctionPointer {
            parameters,
            return_type: Box::new(return_type),
        }
    }

    /// Wrap `self` in a pointer. `Unknown` stays `Unknown`.
    ///
    /// Referencing an existing pointer adds a level; it never collapses.
    pub fn reference(&self, origin: PointerOrigin) -> Type {
        match self {
            Type::Unknown => Type::Unknown,
            _ => Type::Pointer {
                element: Box::new(self.clone()),
                origin,
            },
        }
    }

    /// Remove one level of indirection.
    ///
    /// Function pointers dereference to themselves, unresolved types
    /// propagate unchanged, and the memory behind any other non-pointer type
    /// cannot be tracked, so it becomes `Unknown`.
    pub fn dereference(&self) -> Type {
        match self {
            Type::Pointer { element, .. } | Type::Reference { element } => (**element).clone(),
            Type::FunctionPointer { .. } | Type::Unknown | Type::Incomplete => self.clone(),
            _ => Type::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    /// Numeric conversion rank, `None` for non-arithmetic types
    pub fn numeric_rank(&self) -> Option<u32> {
        match self {
            Type::Primitive { name, .. } => primitive_info(name).map(|p| p.rank),
            _ => None,
        }
    }

    /// The object type at the bottom of any pointer/reference chain
    pub fn root_object(&self) -> Option<&ObjectType> {
        match self {
            Type::Object(object) => Some(object),
            Type::Pointer { element, .. } | Type::Reference { element } => element.root_object(),
            _ => None,
        }
    }

    /// Number of pointer levels
    pub fn pointer_depth(&self) -> usize {
        match self {
            Type::Pointer { element, .. } => 1 + element.pointer_depth(),
            _ => 0,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive { name, .. } => write!(f, "{}", name),
            Type::Pointer { element, origin: PointerOrigin::Pointer } => write!(f, "{}*", element),
            Type::Pointer { element, origin: PointerOrigin::Array } => write!(f, "{}[]", element),
            Type::Reference { element } => write!(f, "{}&", element),
            Type::FunctionPointer { parameters, return_type } => {
                let params: Vec<String> = parameters.iter().map(|p| p.to_string()).collect();
                write!(f, "{}(*)({})", return_type, params.join(", "))
            }
            Type::Object(object) => {
                write!(f, "{}", object.name)?;
                if !object.generics.is_empty() {
                    let generics: Vec<String> = object.generics.iter().map(|g| g.to_string()).collect();
                    write!(f, "<{}>", generics.join(", "))?;
                }
                Ok(())
            }
            Type::Tuple { elements } => {
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", elements.join(", "))
            }
            Type::Unknown => write!(f, "UNKNOWN"),
            Type::Incomplete => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Type {
        Type::primitive("int").unwrap()
    }

    #[test]
    fn test_reference_then_dereference_is_identity() {
        let candidates = vec![
            int(),
            Type::object("A"),
            int().reference(PointerOrigin::Pointer),
            Type::function_pointer(vec![int()], Type::Incomplete),
            Type::Incomplete,
            Type::Tuple { elements: vec![int(), Type::object("B")] },
        ];
        for ty in candidates {
            for origin in [PointerOrigin::Pointer, PointerOrigin::Array] {
                assert_eq!(ty.reference(origin).dereference(), ty);
            }
        }
    }

    #[test]
    fn test_unknown_is_not_referenced() {
        assert_eq!(Type::Unknown.reference(PointerOrigin::Pointer), Type::Unknown);
        assert_eq!(Type::Unknown.dereference(), Type::Unknown);
    }

    #[test]
    fn test_pointer_nesting_never_collapses() {
        let pp = int().reference(PointerOrigin::Pointer).reference(PointerOrigin::Pointer);
        assert_eq!(pp.pointer_depth(), 2);
        assert_eq!(pp.dereference().dereference(), int());
    }

    #[test]
    fn test_dereference_special_cases() {
        let fp = Type::function_pointer(vec![int()], int());
        assert_eq!(fp.dereference(), fp);
        assert_eq!(Type::Incomplete.dereference(), Type::Incomplete);
        assert_eq!(int().dereference(), Type::Unknown);
        assert_eq!(Type::object("A").dereference(), Type::Unknown);
    }

    #[test]
    fn test_object_equality_respects_generics() {
        let list_int = Type::Object(ObjectType::new("List").with_generics(vec![int()]));
        let list_a = Type::Object(ObjectType::new("List").with_generics(vec![Type::object("A")]));
        let pair_ab = Type::Object(ObjectType::new("Pair").with_generics(vec![Type::object("A"), Type::object("B")]));
        let pair_ba = Type::Object(ObjectType::new("Pair").with_generics(vec![Type::object("B"), Type::object("A")]));

        assert_ne!(list_int, list_a);
        assert_ne!(pair_ab, pair_ba);
        assert_ne!(Type::object("List"), list_int);
    }

    #[test]
    fn test_object_equality_uses_record_flag() {
        let bound = Type::Object(ObjectType::new("A").with_record(NodeId(7)));
        let other_binding = Type::Object(ObjectType::new("A").with_record(NodeId(8)));
        assert_ne!(bound, Type::object("A"));
        assert_eq!(bound, other_binding);
    }

    #[test]
    fn test_display() {
        let ty = Type::Object(ObjectType::new(Name::parse("std::vector", "::")).with_generics(vec![int()]));
        assert_eq!(ty.reference(PointerOrigin::Pointer).to_string(), "std::vector<int>*");
        assert_eq!(Type::function_pointer(vec![int()], Type::Incomplete).to_string(), "void(*)(int)");
    }
}
