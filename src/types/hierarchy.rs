//! Type hierarchy - inheritance edges and the common-supertype lattice
//!
//! The hierarchy is immutable once built. Every type's ancestor set
//! (itself plus all transitive supertypes) is computed at construction in
//! depth-first, base-list order, so later queries never walk edges again.
//!
//! Common-type tie-break: when two incomparable ancestors are both minimal
//! (diamond inheritance), the one reached first in the depth-first walk of
//! the first input type wins, i.e. the earliest-declared base.

use super::{ObjectType, PointerOrigin, Type};
use crate::name::Name;
use crate::node::NodeId;
use std::collections::{HashMap, HashSet, VecDeque};

/// One entry of an ancestor set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub name: Name,
    /// Shortest number of inheritance edges from the type to this ancestor
    pub depth: u32,
}

/// Immutable inheritance graph over named types.
#[derive(Debug, Default, Clone)]
pub struct TypeHierarchy {
    /// type → direct supertypes, in declaration order
    supertypes: HashMap<Name, Vec<Name>>,
    /// type → reflexive-transitive ancestors, depth-first order
    ancestors: HashMap<Name, Vec<Ancestor>>,
    /// type → record declaration, when known
    records: HashMap<Name, NodeId>,
}

impl TypeHierarchy {
    /// Build a hierarchy from `(type, direct supertypes)` edges
    pub fn new(edges: impl IntoIterator<Item = (Name, Vec<Name>)>) -> Self {
        Self::with_records(edges, HashMap::new())
    }

    /// Build a hierarchy that also knows which record declares each type
    pub fn with_records(
        edges: impl IntoIterator<Item = (Name, Vec<Name>)>,
        records: HashMap<Name, NodeId>,
    ) -> Self {
        let mut supertypes: HashMap<Name, Vec<Name>> = HashMap::new();
        for (name, supers) in edges {
            let entry = supertypes.entry(name).or_default();
            for sup in supers {
                if !entry.contains(&sup) {
                    entry.push(sup);
                }
            }
        }

        let mut hierarchy = Self {
            supertypes,
            ancestors: HashMap::new(),
            records,
        };
        let names: Vec<Name> = hierarchy.supertypes.keys().cloned().collect();
        for name in names {
            let ancestors = hierarchy.compute_ancestors(&name);
            hierarchy.ancestors.insert(name, ancestors);
        }
        hierarchy
    }

    /// Direct supertypes of `name`
    pub fn supertypes(&self, name: &Name) -> &[Name] {
        self.supertypes.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of types with recorded edges
    pub fn len(&self) -> usize {
        self.supertypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supertypes.is_empty()
    }

    fn compute_ancestors(&self, name: &Name) -> Vec<Ancestor> {
        // Shortest depth via BFS
        let mut depths: HashMap<Name, u32> = HashMap::new();
        let mut queue = VecDeque::from([(name.clone(), 0u32)]);
        while let Some((current, depth)) = queue.pop_front() {
            if depths.contains_key(&current) {
                continue;
            }
            depths.insert(current.clone(), depth);
            for sup in self.supertypes(&current) {
                queue.push_back((sup.clone(), depth + 1));
            }
        }

        // Order via DFS preorder following base-list order
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![name.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for sup in self.supertypes(&current).iter().rev() {
                stack.push(sup.clone());
            }
            let depth = depths.get(&current).copied().unwrap_or(0);
            order.push(Ancestor { name: current, depth });
        }
        order
    }

    /// Reflexive-transitive ancestors of `name`, depth-first
    pub fn ancestors(&self, name: &Name) -> Vec<Ancestor> {
        match self.ancestors.get(name) {
            Some(ancestors) => ancestors.clone(),
            None => vec![Ancestor { name: name.clone(), depth: 0 }],
        }
    }

    /// Number of inheritance edges from `from` up to `to`
    pub fn inheritance_distance(&self, from: &Name, to: &Name) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        self.ancestors
            .get(from)?
            .iter()
            .find(|a| &a.name == to)
            .map(|a| a.depth)
    }

    /// True if `ancestor` is `name` or one of its supertypes
    pub fn is_ancestor(&self, ancestor: &Name, name: &Name) -> bool {
        self.inheritance_distance(name, ancestor).is_some()
    }

    /// Nearest common supertype of `types`, `None` if they share none.
    pub fn common_type(&self, types: &[Type]) -> Option<Type> {
        let first = types.first()?;
        if types.iter().all(|t| t == first) {
            return Some(first.clone());
        }

        if types.iter().all(Type::is_pointer) {
            let elements: Vec<Type> = types.iter().map(Type::dereference).collect();
            return self
                .common_type(&elements)
                .map(|common| common.reference(PointerOrigin::Pointer));
        }

        if types.iter().all(|t| matches!(t, Type::Reference { .. })) {
            let elements: Vec<Type> = types.iter().map(Type::dereference).collect();
            return self
                .common_type(&elements)
                .map(|common| Type::Reference { element: Box::new(common) });
        }

        if types.iter().all(|t| t.numeric_rank().is_some()) {
            // Usual arithmetic conversions: the highest rank wins
            return types.iter().max_by_key(|t| t.numeric_rank()).cloned();
        }

        let objects: Option<Vec<&ObjectType>> = types
            .iter()
            .map(|t| match t {
                Type::Object(object) => Some(object),
                _ => None,
            })
            .collect();
        let objects = objects?;
        let winner = self.lowest_common_ancestor(objects.iter().map(|o| &o.name))?;

        // Prefer returning an input verbatim so generics and bindings survive
        if let Some(input) = objects.iter().find(|o| o.name == winner) {
            return Some(Type::Object((*input).clone()));
        }
        let mut object = ObjectType::new(winner.clone());
        object.record = self.records.get(&winner).copied();
        Some(Type::Object(object))
    }

    /// Minimal element of the intersection of all ancestor sets
    pub fn lowest_common_ancestor<'a>(&self, names: impl IntoIterator<Item = &'a Name>) -> Option<Name> {
        let mut names = names.into_iter();
        let first = names.next()?;

        let mut common: Vec<Name> = self.ancestors(first).into_iter().map(|a| a.name).collect();
        for name in names {
            let ancestors: HashSet<Name> = self.ancestors(name).into_iter().map(|a| a.name).collect();
            common.retain(|c| ancestors.contains(c));
        }
        if common.is_empty() {
            return None;
        }

        // `common` is in the first input's depth-first order, so the first
        // minimal element is also the earliest-declared one. Members of an
        // inheritance cycle are ancestors of each other and do not count as
        // being below one another.
        common
            .iter()
            .find(|candidate| {
                !common.iter().any(|other| {
                    other != *candidate && self.is_ancestor(candidate, other) && !self.is_ancestor(other, candidate)
                })
            })
            .or_else(|| common.first())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &[&str])]) -> TypeHierarchy {
        TypeHierarchy::new(pairs.iter().map(|(name, supers)| {
            (Name::from(*name), supers.iter().map(|s| Name::from(*s)).collect())
        }))
    }

    fn obj(name: &str) -> Type {
        Type::object(name)
    }

    #[test]
    fn test_common_ancestor_lattice() {
        let h = edges(&[
            ("Level0", &["Root"]),
            ("Level1", &["Level0"]),
            ("Level1B", &["Level0"]),
            ("Level2", &["Level1"]),
            ("Unrelated", &[]),
        ]);

        assert_eq!(h.common_type(&[obj("Level1"), obj("Level2")]), Some(obj("Level1")));
        assert_eq!(h.common_type(&[obj("Level1"), obj("Level1B")]), Some(obj("Level0")));
        assert_eq!(h.common_type(&[obj("Unrelated"), obj("Root")]), None);
    }

    #[test]
    fn test_diamond_picks_lowest_common_ancestor() {
        let h = edges(&[
            ("Level0", &["Root"]),
            ("Level0B", &["Root"]),
            ("Level1", &["Level0"]),
            ("Level1B", &["Level0", "Level0B"]),
            ("Level1C", &["Level0B"]),
            ("Level2", &["Level1"]),
            ("Level2B", &["Level1B"]),
        ]);

        assert_eq!(h.common_type(&[obj("Level2"), obj("Level2B")]), Some(obj("Level0")));
        assert_eq!(h.common_type(&[obj("Level1B"), obj("Level1C")]), Some(obj("Level0B")));
    }

    #[test]
    fn test_incomparable_minimal_ancestors_prefer_earliest_base() {
        let h = edges(&[("A", &["X", "Y"]), ("B", &["Y", "X"])]);
        assert_eq!(h.common_type(&[obj("A"), obj("B")]), Some(obj("X")));
        assert_eq!(h.common_type(&[obj("B"), obj("A")]), Some(obj("Y")));
    }

    #[test]
    fn test_inheritance_distance_uses_shortest_path() {
        let h = edges(&[("C", &["B", "A"]), ("B", &["A"])]);
        assert_eq!(h.inheritance_distance(&Name::from("C"), &Name::from("A")), Some(1));
        assert_eq!(h.inheritance_distance(&Name::from("A"), &Name::from("C")), None);
    }

    #[test]
    fn test_cyclic_edges_terminate() {
        let h = edges(&[("A", &["B"]), ("B", &["A"])]);
        assert_eq!(h.ancestors(&Name::from("A")).len(), 2);
    }

    #[test]
    fn test_common_ancestor_through_a_cycle() {
        let h = edges(&[("A", &["B", "Root"]), ("B", &["A"]), ("C", &["A"]), ("D", &["B"])]);
        assert_eq!(h.lowest_common_ancestor([&Name::from("C"), &Name::from("D")]), Some(Name::from("A")));
        assert_eq!(h.common_type(&[obj("D"), obj("C")]), Some(obj("B")));
    }

    #[test]
    fn test_pointer_and_numeric_common_types() {
        let h = edges(&[("D", &["B"])]);
        let ptr = |t: Type| t.reference(PointerOrigin::Pointer);
        assert_eq!(h.common_type(&[ptr(obj("D")), ptr(obj("B"))]), Some(ptr(obj("B"))));

        let int = Type::primitive("int").unwrap();
        let double = Type::primitive("double").unwrap();
        assert_eq!(h.common_type(&[int, double.clone()]), Some(double));
        assert_eq!(h.common_type(&[]), None);
    }
}
