//! Spouse resolution: one query over the full discovered ID set, after
//! both BFS expansions have finished.

use std::collections::{HashMap, HashSet};

use crate::db::Db;
use crate::error::Result;
use crate::store::relationship;

/// Build a symmetric spouse map for every ID in the set. Spouses outside
/// the set are included too; a spouse may not be reachable through
/// parent/child edges at all. Callers run the privacy pass over them like
/// any other candidate.
pub async fn resolve(db: &Db, ids: &HashSet<String>) -> Result<HashMap<String, HashSet<String>>> {
    let id_list: Vec<String> = ids.iter().cloned().collect();
    let edges = relationship::spouse_edges_touching(db, &id_list).await?;

    let mut map: HashMap<String, HashSet<String>> = HashMap::new();
    for edge in edges {
        if edge.from_person_id == edge.to_person_id {
            continue;
        }
        map.entry(edge.from_person_id.clone())
            .or_default()
            .insert(edge.to_person_id.clone());
        map.entry(edge.to_person_id)
            .or_default()
            .insert(edge.from_person_id);
    }
    Ok(map)
}
