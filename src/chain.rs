//! Validation of `@PG` provenance chains.
//!
//! Every `@PG` record may name its predecessor through its `PP` field. The
//! full set of records must form a single rooted structure: exactly one
//! record without a `PP` (the head), and no cycles when walking parent
//! pointers. Several records sharing one parent is fine; pipelines fork.
//!
//! [`resolve_pg_chain`] is the standalone check; the accumulator in
//! [`crate::header`] builds chains that satisfy it by construction and
//! debug-asserts that on serialization.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    /// Every record names a parent, so the chain has no starting point.
    #[error("PG chain does not have a head.")]
    NoHead,

    /// More than one record has no parent.
    #[error("PG chain has multiple heads.")]
    MultipleHeads,

    /// Walking parent pointers revisited a record. The path holds the IDs in
    /// walk order, ending with the repeated one.
    #[error("PG chain appears to contain cycle: [{}]", .0.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", "))]
    Cycle(Vec<String>),
}

/// Resolve a set of `(ID, PP)` records into an `ID -> parent` mapping,
/// verifying the parent links form a single rooted, acyclic structure.
///
/// Records may arrive in any order. A repeated `ID` keeps the last record's
/// parent. An empty input resolves to an empty mapping.
///
/// Head counting runs before the cycle walk, so a record set with both
/// anomalies in disjoint subgraphs reports the head problem first.
///
/// # Errors
///
/// Returns `ChainError::NoHead` when no record lacks a parent,
/// `ChainError::MultipleHeads` when more than one does, and
/// `ChainError::Cycle` when parent links revisit a record.
pub fn resolve_pg_chain(
    records: &[(&str, Option<&str>)],
) -> Result<HashMap<String, Option<String>>, ChainError> {
    let mut links: HashMap<&str, Option<&str>> = HashMap::new();
    for (id, parent) in records {
        links.insert(*id, *parent);
    }

    if links.is_empty() {
        return Ok(HashMap::new());
    }

    let heads = links.values().filter(|parent| parent.is_none()).count();
    if heads == 0 {
        return Err(ChainError::NoHead);
    }
    if heads > 1 {
        return Err(ChainError::MultipleHeads);
    }

    // Walk each record to the head. A parent naming an ID absent from the
    // input ends that walk; the head-count scan above is the only arbiter of
    // where chains are allowed to stop.
    for (start, _) in records {
        let mut path = vec![*start];
        let mut current = *start;
        while let Some(Some(parent)) = links.get(current).copied() {
            if path.contains(&parent) {
                path.push(parent);
                return Err(ChainError::Cycle(
                    path.into_iter().map(String::from).collect(),
                ));
            }
            path.push(parent);
            current = parent;
        }
    }

    Ok(links
        .into_iter()
        .map(|(id, parent)| (id.to_string(), parent.map(String::from)))
        .collect())
}
