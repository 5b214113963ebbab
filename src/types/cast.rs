//! Implicit conversions between types
//!
//! `try_cast` answers "can a value of this type be passed where that type
//! is expected, and how far does the conversion travel?". The distance is
//! what overload resolution ranks candidates by; 0 means free.

use super::hierarchy::TypeHierarchy;
use super::{PointerOrigin, Type};
use crate::node::{Node, NodeKind};
use serde::Serialize;

/// Cost of converting any data pointer to `void*`
pub const VOID_POINTER_DISTANCE: u32 = 3;

/// Cost of passing a null-pointer literal as a pointer
pub const NULL_POINTER_DISTANCE: u32 = 1;

/// Literal spellings treated as the null pointer
const NULL_LITERALS: &[&str] = &["0", "NULL", "nullptr", "null", "None", "nil"];

/// Outcome of a cast attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CastResult {
    /// Types are structurally equal
    DirectMatch,
    /// An implicit conversion exists
    Cast { distance: u32 },
    /// No conversion path exists
    NoCast,
}

impl CastResult {
    pub fn is_possible(&self) -> bool {
        !matches!(self, CastResult::NoCast)
    }

    /// Distance of the conversion, `None` if impossible
    pub fn distance(&self) -> Option<u32> {
        match self {
            CastResult::DirectMatch => Some(0),
            CastResult::Cast { distance } => Some(*distance),
            CastResult::NoCast => None,
        }
    }

    /// Combine two component results (element-wise casts)
    fn and(self, other: CastResult) -> CastResult {
        match (self, other) {
            (CastResult::NoCast, _) | (_, CastResult::NoCast) => CastResult::NoCast,
            (CastResult::DirectMatch, CastResult::DirectMatch) => CastResult::DirectMatch,
            (a, b) => CastResult::Cast {
                distance: a.distance().unwrap_or(0) + b.distance().unwrap_or(0),
            },
        }
    }
}

/// Extra information available when casting a call argument
#[derive(Debug, Clone, Copy, Default)]
pub struct CastContext<'a> {
    /// Inheritance edges used for derived-to-base conversions
    pub hierarchy: Option<&'a TypeHierarchy>,
    /// The argument expression being converted
    pub argument: Option<&'a Node>,
    /// The parameter receiving the value
    pub parameter: Option<&'a Node>,
}

impl<'a> CastContext<'a> {
    pub fn new(hierarchy: &'a TypeHierarchy) -> Self {
        Self {
            hierarchy: Some(hierarchy),
            argument: None,
            parameter: None,
        }
    }

    pub fn with_argument(mut self, argument: &'a Node) -> Self {
        self.argument = Some(argument);
        self
    }

    pub fn with_parameter(mut self, parameter: &'a Node) -> Self {
        self.parameter = Some(parameter);
        self
    }

    fn argument_is_null_literal(&self) -> bool {
        matches!(
            self.argument.map(|a| &a.kind),
            Some(NodeKind::Literal { value }) if NULL_LITERALS.contains(&value.as_str())
        )
    }

    fn parameter_is_variadic(&self) -> bool {
        matches!(
            self.parameter.map(|p| &p.kind),
            Some(NodeKind::Parameter(param)) if param.variadic
        )
    }
}

impl Type {
    /// Determine whether `self` converts implicitly to `target`.
    pub fn try_cast(&self, target: &Type, ctx: &CastContext<'_>) -> CastResult {
        if self == target {
            return CastResult::DirectMatch;
        }
        if ctx.parameter_is_variadic() {
            return CastResult::Cast { distance: 0 };
        }

        match (self, target) {
            // Nothing is known about the value, so nothing rules the cast out
            (Type::Unknown | Type::Incomplete, _) | (_, Type::Unknown | Type::Incomplete) => {
                CastResult::Cast { distance: 0 }
            }

            (Type::Reference { element }, _) => element.try_cast(target, ctx),
            (_, Type::Reference { element }) => self.try_cast(element, ctx),

            (Type::Primitive { .. }, Type::Pointer { .. } | Type::FunctionPointer { .. })
                if ctx.argument_is_null_literal() =>
            {
                CastResult::Cast { distance: NULL_POINTER_DISTANCE }
            }

            (Type::Primitive { signedness: from_sign, .. }, Type::Primitive { signedness: to_sign, .. }) => {
                match (self.numeric_rank(), target.numeric_rank()) {
                    (Some(from), Some(to)) => {
                        let sign_change = u32::from(from_sign != to_sign
                            && *from_sign != super::Signedness::NotApplicable
                            && *to_sign != super::Signedness::NotApplicable);
                        CastResult::Cast {
                            distance: from.abs_diff(to) + sign_change,
                        }
                    }
                    _ => CastResult::NoCast,
                }
            }

            (Type::Object(from), Type::Object(to)) => {
                if from.name == to.name {
                    // Same class, differently bound (declared in another unit)
                    return if from.generics == to.generics {
                        CastResult::Cast { distance: 0 }
                    } else {
                        CastResult::NoCast
                    };
                }
                ctx.hierarchy
                    .and_then(|h| h.inheritance_distance(&from.name, &to.name))
                    .map(|distance| CastResult::Cast { distance })
                    .unwrap_or(CastResult::NoCast)
            }

            (
                Type::Pointer { element: from, origin: from_origin },
                Type::Pointer { element: to, origin: to_origin },
            ) => pointee_cast(from, to, *from_origin, *to_origin, ctx),

            (
                Type::FunctionPointer { parameters: from_params, return_type: from_ret },
                Type::FunctionPointer { parameters: to_params, return_type: to_ret },
            ) => {
                if from_params.len() != to_params.len() {
                    return CastResult::NoCast;
                }
                // Function pointer signatures must match exactly, unknown parts aside
                let mut result = exact_or_unknown(from_ret, to_ret);
                for (from, to) in from_params.iter().zip(to_params) {
                    result = result.and(exact_or_unknown(from, to));
                }
                result
            }

            (Type::Tuple { elements: from }, Type::Tuple { elements: to }) => {
                if from.len() != to.len() {
                    return CastResult::NoCast;
                }
                from.iter()
                    .zip(to)
                    .fold(CastResult::DirectMatch, |acc, (f, t)| acc.and(f.try_cast(t, ctx)))
            }

            _ => CastResult::NoCast,
        }
    }
}

fn exact_or_unknown(from: &Type, to: &Type) -> CastResult {
    if from == to {
        CastResult::DirectMatch
    } else if from.is_unknown() || to.is_unknown() {
        CastResult::Cast { distance: 0 }
    } else {
        CastResult::NoCast
    }
}

/// Pointer conversions only permit qualification-free pointee changes:
/// same pointee, derived-to-base, or anything-to-`void`.
fn pointee_cast(
    from: &Type,
    to: &Type,
    from_origin: PointerOrigin,
    to_origin: PointerOrigin,
    ctx: &CastContext<'_>,
) -> CastResult {
    if from == to {
        // Array-to-pointer decay
        return if from_origin == to_origin {
            CastResult::DirectMatch
        } else {
            CastResult::Cast { distance: 0 }
        };
    }
    match (from, to) {
        (Type::Unknown, _) | (_, Type::Unknown) => CastResult::Cast { distance: 0 },
        (Type::FunctionPointer { .. }, Type::Incomplete) => CastResult::NoCast,
        (_, Type::Incomplete) => CastResult::Cast {
            distance: VOID_POINTER_DISTANCE,
        },
        (Type::Object(_), Type::Object(_)) => from.try_cast(to, ctx),
        (Type::Pointer { element: f, origin: fo }, Type::Pointer { element: t, origin: to_o }) => {
            pointee_cast(f, t, *fo, *to_o, ctx)
        }
        _ => CastResult::NoCast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::name::Name;
    use crate::node::{Node, NodeKind, ParameterDecl};
    use std::sync::Arc;

    fn prim(name: &str) -> Type {
        Type::primitive(name).unwrap()
    }

    fn hierarchy() -> TypeHierarchy {
        TypeHierarchy::new(vec![
            (Name::from("Derived"), vec![Name::from("Base")]),
            (Name::from("Base"), vec![Name::from("Root")]),
        ])
    }

    #[test]
    fn test_direct_match() {
        let ctx = CastContext::default();
        assert_eq!(prim("int").try_cast(&prim("int"), &ctx), CastResult::DirectMatch);
    }

    #[test]
    fn test_numeric_widening_distance() {
        let ctx = CastContext::default();
        assert_eq!(prim("short").try_cast(&prim("int"), &ctx), CastResult::Cast { distance: 1 });
        assert_eq!(prim("short").try_cast(&prim("long"), &ctx), CastResult::Cast { distance: 2 });
        assert_eq!(
            prim("int").try_cast(&prim("unsigned int"), &ctx),
            CastResult::Cast { distance: 1 }
        );
    }

    #[test]
    fn test_derived_to_base() {
        let h = hierarchy();
        let ctx = CastContext::new(&h);
        assert_eq!(
            Type::object("Derived").try_cast(&Type::object("Root"), &ctx),
            CastResult::Cast { distance: 2 }
        );
        assert_eq!(Type::object("Root").try_cast(&Type::object("Derived"), &ctx), CastResult::NoCast);

        let derived_ptr = Type::object("Derived").reference(PointerOrigin::Pointer);
        let base_ptr = Type::object("Base").reference(PointerOrigin::Pointer);
        assert_eq!(derived_ptr.try_cast(&base_ptr, &ctx), CastResult::Cast { distance: 1 });
    }

    #[test]
    fn test_void_pointer_and_incompatible_pointees() {
        let ctx = CastContext::default();
        let int_ptr = prim("int").reference(PointerOrigin::Pointer);
        let long_ptr = prim("long").reference(PointerOrigin::Pointer);
        let void_ptr = Type::Incomplete.reference(PointerOrigin::Pointer);

        assert_eq!(
            int_ptr.try_cast(&void_ptr, &ctx),
            CastResult::Cast { distance: VOID_POINTER_DISTANCE }
        );
        assert_eq!(int_ptr.try_cast(&long_ptr, &ctx), CastResult::NoCast);
    }

    #[test]
    fn test_incomplete_types_cast_leniently() {
        let ctx = CastContext::default();
        let shape = Type::object(Name::from("Shape"));
        assert_eq!(Type::Incomplete.try_cast(&shape, &ctx), CastResult::Cast { distance: 0 });
        assert_eq!(prim("int").try_cast(&Type::Incomplete, &ctx), CastResult::Cast { distance: 0 });
        assert_eq!(Type::Incomplete.try_cast(&Type::Incomplete, &ctx), CastResult::DirectMatch);
    }

    #[test]
    fn test_array_decay() {
        let ctx = CastContext::default();
        let array = prim("char").reference(PointerOrigin::Array);
        let pointer = prim("char").reference(PointerOrigin::Pointer);
        assert_eq!(array.try_cast(&pointer, &ctx), CastResult::Cast { distance: 0 });
    }

    #[test]
    fn test_null_literal_to_pointer() {
        let lang = Arc::new(Language::cpp());
        let zero = Node::new(Name::local("0"), NodeKind::Literal { value: "0".into() }, lang.clone())
            .with_type(prim("int"));
        let one = Node::new(Name::local("1"), NodeKind::Literal { value: "1".into() }, lang)
            .with_type(prim("int"));
        let target = Type::object("A").reference(PointerOrigin::Pointer);

        let ctx = CastContext::default().with_argument(&zero);
        assert_eq!(prim("int").try_cast(&target, &ctx), CastResult::Cast { distance: 1 });
        let ctx = CastContext::default().with_argument(&one);
        assert_eq!(prim("int").try_cast(&target, &ctx), CastResult::NoCast);
    }

    #[test]
    fn test_variadic_parameter_accepts_anything() {
        let param = Node::new(
            Name::local("args"),
            NodeKind::Parameter(ParameterDecl { variadic: true, default: None }),
            Arc::new(Language::c()),
        );
        let ctx = CastContext::default().with_parameter(&param);
        assert!(Type::object("A").try_cast(&prim("int"), &ctx).is_possible());
    }

    #[test]
    fn test_references_are_transparent() {
        let ctx = CastContext::default();
        let int_ref = Type::Reference { element: Box::new(prim("int")) };
        assert_eq!(prim("int").try_cast(&int_ref, &ctx), CastResult::DirectMatch);
        assert_eq!(int_ref.try_cast(&prim("long"), &ctx), CastResult::Cast { distance: 1 });
    }

    #[test]
    fn test_unrelated_types() {
        let ctx = CastContext::default();
        assert_eq!(Type::object("A").try_cast(&prim("int"), &ctx), CastResult::NoCast);
        assert_eq!(Type::Unknown.try_cast(&prim("int"), &ctx), CastResult::Cast { distance: 0 });
    }
}
