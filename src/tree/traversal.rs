//! Bounded breadth-first expansion of `parent_of` edges, one direction
//! per call.
//!
//! Cycle policy: a node already in the global `visited` set is never
//! re-enqueued, but an edge between two already-known endpoints is still
//! recorded in the adjacency map. Diamond structures (a grandparent shared
//! through two children) stay representable; true cycles terminate.

use std::collections::{HashMap, HashSet};

use crate::db::Db;
use crate::error::Result;
use crate::model::RelationType;
use crate::store::relationship;

/// Which way the BFS walks the directed `parent_of` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow `to -> from`: the `from` endpoints (parents) are the next
    /// frontier.
    Ancestors,
    /// Follow `from -> to`: the `to` endpoints (children) are the next
    /// frontier.
    Descendants,
}

/// Result of one directional expansion.
#[derive(Debug, Default)]
pub struct Expansion {
    /// Adjacency in expansion order: person -> the IDs one step further in
    /// this direction (children for descendants, parents for ancestors).
    pub adjacency: HashMap<String, HashSet<String>>,
    /// Every ID seen, root included. Doubles as the cycle guard and as the
    /// privacy-filter domain.
    pub visited: HashSet<String>,
}

/// Expand from `root` up to `depth` levels. Depth 0 returns just the root
/// in `visited` with no edges.
pub async fn expand(db: &Db, root: &str, depth: usize, direction: Direction) -> Result<Expansion> {
    let mut visited = HashSet::new();
    visited.insert(root.to_string());
    let mut adjacency: HashMap<String, HashSet<String>> = HashMap::new();

    let mut frontier = vec![root.to_string()];
    let mut level = 0;

    while level < depth && !frontier.is_empty() {
        let edges = match direction {
            Direction::Descendants => {
                relationship::edges_from(db, &frontier, RelationType::ParentOf).await?
            }
            Direction::Ancestors => {
                relationship::edges_to(db, &frontier, RelationType::ParentOf).await?
            }
        };

        let mut next = Vec::new();
        for edge in edges {
            let (node, linked) = match direction {
                Direction::Descendants => (edge.from_person_id, edge.to_person_id),
                Direction::Ancestors => (edge.to_person_id, edge.from_person_id),
            };

            // Record the edge even if the endpoint was already seen;
            // only enqueue endpoints we have not visited.
            adjacency.entry(node).or_default().insert(linked.clone());
            if visited.insert(linked.clone()) {
                next.push(linked);
            }
        }

        frontier = next;
        level += 1;

        log::trace!(
            "{:?} expansion level {}: frontier size {}",
            direction,
            level,
            frontier.len()
        );
    }

    Ok(Expansion { adjacency, visited })
}
