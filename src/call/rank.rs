//! Tie-breaking between several viable candidates
//!
//! Candidates are ranked by total cast distance. A unique minimum wins.
//! A tied set is ambiguous, unless the language dispatches dynamically and
//! the tied candidates are overrides of one method in different records;
//! then every override is a legitimate simultaneous target.

use crate::language::Language;
use crate::node::NodeId;
use crate::types::Type;

/// A viable candidate with what ranking needs to know about it
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub function: NodeId,
    pub distance: u32,
    /// Record the function is a method of
    pub record: Option<NodeId>,
    pub parameter_types: Vec<Type>,
}

/// Outcome of tie-breaking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TieBreak {
    /// One candidate is strictly closest
    Unique(NodeId),
    /// Overrides reachable through dynamic dispatch
    Dispatch(Vec<NodeId>),
    /// Several candidates at the same minimal distance
    Tied(Vec<NodeId>),
}

/// Language-specific choice among viable candidates
pub trait TieBreaker {
    fn break_tie(&self, candidates: &[RankedCandidate]) -> TieBreak;
}

/// Rank by total cast distance, C++/Java style
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceRanking {
    pub dynamic_dispatch: bool,
}

impl DistanceRanking {
    pub fn for_language(language: &Language) -> Self {
        Self {
            dynamic_dispatch: language.dynamic_dispatch,
        }
    }
}

impl TieBreaker for DistanceRanking {
    fn break_tie(&self, candidates: &[RankedCandidate]) -> TieBreak {
        let Some(best) = candidates.iter().map(|c| c.distance).min() else {
            return TieBreak::Tied(Vec::new());
        };
        let closest: Vec<&RankedCandidate> = candidates.iter().filter(|c| c.distance == best).collect();

        if let [only] = closest.as_slice() {
            return TieBreak::Unique(only.function);
        }
        let ids: Vec<NodeId> = closest.iter().map(|c| c.function).collect();
        if self.dynamic_dispatch && is_override_family(&closest) {
            TieBreak::Dispatch(ids)
        } else {
            TieBreak::Tied(ids)
        }
    }
}

/// Methods of distinct records sharing one parameter list
fn is_override_family(candidates: &[&RankedCandidate]) -> bool {
    let Some(first) = candidates.first() else {
        return false;
    };
    let mut records = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match candidate.record {
            Some(record) if !records.contains(&record) => records.push(record),
            _ => return false,
        }
        if candidate.parameter_types != first.parameter_types {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32, distance: u32, record: Option<u32>, params: &[&str]) -> RankedCandidate {
        RankedCandidate {
            function: NodeId(id),
            distance,
            record: record.map(NodeId),
            parameter_types: params.iter().map(|p| Type::primitive(p).unwrap()).collect(),
        }
    }

    #[test]
    fn test_unique_minimum_wins() {
        let ranking = DistanceRanking::default();
        let result = ranking.break_tie(&[candidate(1, 2, None, &["long"]), candidate(2, 1, None, &["int"])]);
        assert_eq!(result, TieBreak::Unique(NodeId(2)));
    }

    #[test]
    fn test_tie_is_ambiguous() {
        let ranking = DistanceRanking { dynamic_dispatch: true };
        let result = ranking.break_tie(&[
            candidate(1, 1, None, &["int"]),
            candidate(2, 1, None, &["long long"]),
            candidate(3, 4, None, &["double"]),
        ]);
        assert_eq!(result, TieBreak::Tied(vec![NodeId(1), NodeId(2)]));
    }

    #[test]
    fn test_overrides_dispatch() {
        let overrides = [candidate(1, 0, Some(10), &["int"]), candidate(2, 0, Some(11), &["int"])];
        assert_eq!(
            DistanceRanking { dynamic_dispatch: true }.break_tie(&overrides),
            TieBreak::Dispatch(vec![NodeId(1), NodeId(2)])
        );
        assert_eq!(
            DistanceRanking { dynamic_dispatch: false }.break_tie(&overrides),
            TieBreak::Tied(vec![NodeId(1), NodeId(2)])
        );

        // Same record: overloads, not overrides
        let overloads = [candidate(1, 0, Some(10), &["int"]), candidate(2, 0, Some(10), &["int"])];
        assert!(matches!(
            DistanceRanking { dynamic_dispatch: true }.break_tie(&overloads),
            TieBreak::Tied(_)
        ));
    }
}
