//! Set operations over player identifiers
//!
//! Inputs are slices that may contain duplicates; outputs never do. Output
//! order follows first appearance in the left operand (then the right one for
//! unions) so results are deterministic.

use crate::types::PlayerId;
use std::collections::HashSet;

/// Every id present in either operand
pub fn union(a: &[PlayerId], b: &[PlayerId]) -> Vec<PlayerId> {
    let mut seen = HashSet::with_capacity(a.len() + b.len());
    a.iter()
        .chain(b.iter())
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Ids present in both operands
pub fn intersection(a: &[PlayerId], b: &[PlayerId]) -> Vec<PlayerId> {
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();
    let mut seen = HashSet::with_capacity(a.len().min(b.len()));
    a.iter()
        .filter(|id| right.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Ids of `a` that are not in `b`
pub fn difference(a: &[PlayerId], b: &[PlayerId]) -> Vec<PlayerId> {
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();
    let mut seen = HashSet::with_capacity(a.len());
    a.iter()
        .filter(|id| !right.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Intersect any number of sets; the first set seeds the reduction
pub fn intersect_all<S: AsRef<[PlayerId]>>(sets: &[S]) -> Vec<PlayerId> {
    let Some((first, rest)) = sets.split_first() else {
        return Vec::new();
    };
    rest.iter().fold(dedup(first.as_ref()), |acc, set| {
        intersection(&acc, set.as_ref())
    })
}

/// Union any number of sets
pub fn union_all<S: AsRef<[PlayerId]>>(sets: &[S]) -> Vec<PlayerId> {
    sets.iter()
        .fold(Vec::new(), |acc, set| union(&acc, set.as_ref()))
}

fn dedup(ids: &[PlayerId]) -> Vec<PlayerId> {
    union(ids, &[])
}
