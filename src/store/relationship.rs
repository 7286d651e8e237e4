//! Relationship edge store. Carries both the CRUD surface and the three
//! narrow queries the traversal engine runs per BFS level: edges out of a
//! frontier, edges into a frontier, and spouse edges touching a set.

use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::model::{RelationType, Relationship};
use super::{conversion_err, now_rfc3339, placeholders};

/// An edge endpoint pair, the only thing the engine needs per level.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from_person_id: String,
    pub to_person_id: String,
}

/// Fields required to create a new edge.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub branch_id: String,
    pub from_person_id: String,
    pub to_person_id: String,
    pub rel_type: RelationType,
    pub created_by: String,
}

fn map_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relationship> {
    let type_str: String = row.get(4)?;
    let rel_type = type_str
        .parse::<RelationType>()
        .map_err(|_| conversion_err(4, format!("bad relationship type: {}", type_str)))?;
    Ok(Relationship {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        from_person_id: row.get(2)?,
        to_person_id: row.get(3)?,
        rel_type,
        created_by: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const RELATIONSHIP_COLS: &str =
    "id, branch_id, from_person_id, to_person_id, type, created_by, created_at, updated_at";

/// Create an edge. A second edge with an identical
/// (branch, from, to, type) tuple is rejected with `RelationshipExists`.
pub async fn create(db: &Db, new: NewRelationship) -> Result<Relationship> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();

    db.with_connection(move |conn| {
        let exists: bool = conn
            .prepare(
                "SELECT 1 FROM relationships \
                 WHERE branch_id = ?1 AND from_person_id = ?2 AND to_person_id = ?3 AND type = ?4",
            )?
            .exists(params![
                new.branch_id,
                new.from_person_id,
                new.to_person_id,
                new.rel_type.as_str()
            ])?;
        if exists {
            return Err(KintreeError::RelationshipExists);
        }

        conn.execute(
            "INSERT INTO relationships \
             (id, branch_id, from_person_id, to_person_id, type, created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                new.branch_id,
                new.from_person_id,
                new.to_person_id,
                new.rel_type.as_str(),
                new.created_by,
                now,
                now
            ],
        )
        .map_err(|e| {
            // The UNIQUE index backstops the pre-check under concurrency.
            if let rusqlite::Error::SqliteFailure(err, _) = &e {
                if err.code == rusqlite::ffi::ErrorCode::ConstraintViolation {
                    return KintreeError::RelationshipExists;
                }
            }
            KintreeError::Database(e)
        })?;

        Ok(Relationship {
            id,
            branch_id: new.branch_id,
            from_person_id: new.from_person_id,
            to_person_id: new.to_person_id,
            rel_type: new.rel_type,
            created_by: new.created_by,
            created_at: now.clone(),
            updated_at: now,
        })
    })
    .await
}

/// Fetch one edge by ID.
pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<Relationship>> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM relationships WHERE id = ?1",
            RELATIONSHIP_COLS
        ))?;
        let mut rows = stmt.query_map(params![id], map_relationship)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    })
    .await
}

/// Every edge touching the given person, in either direction, any type.
pub async fn find_touching_person(db: &Db, person_id: &str) -> Result<Vec<Relationship>> {
    let person_id = person_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM relationships WHERE from_person_id = ?1 OR to_person_id = ?1",
            RELATIONSHIP_COLS
        ))?;
        let rows = stmt.query_map(params![person_id], map_relationship)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}

/// Delete an edge by ID. Returns whether a row was removed.
pub async fn delete(db: &Db, id: &str) -> Result<bool> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let n = conn.execute("DELETE FROM relationships WHERE id = ?1", params![id])?;
        Ok(n > 0)
    })
    .await
}

/// Edges of the given type whose `from` endpoint is in the set.
/// Descendant expansion: the `to` endpoints are the next frontier.
pub async fn edges_from(
    db: &Db,
    person_ids: &[String],
    rel_type: RelationType,
) -> Result<Vec<Edge>> {
    if person_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = format!(
        "SELECT from_person_id, to_person_id FROM relationships \
         WHERE type = ? AND from_person_id IN ({})",
        placeholders(person_ids.len())
    );
    query_edges(db, query, rel_type.as_str(), person_ids.to_vec()).await
}

/// Edges of the given type whose `to` endpoint is in the set.
/// Ancestor expansion: the `from` endpoints are the next frontier.
pub async fn edges_to(
    db: &Db,
    person_ids: &[String],
    rel_type: RelationType,
) -> Result<Vec<Edge>> {
    if person_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = format!(
        "SELECT from_person_id, to_person_id FROM relationships \
         WHERE type = ? AND to_person_id IN ({})",
        placeholders(person_ids.len())
    );
    query_edges(db, query, rel_type.as_str(), person_ids.to_vec()).await
}

/// Spouse edges with either endpoint in the set, one pass. Endpoints
/// outside the set are returned too; spouses may not be reachable via
/// parent/child edges at all.
pub async fn spouse_edges_touching(db: &Db, person_ids: &[String]) -> Result<Vec<Edge>> {
    if person_ids.is_empty() {
        return Ok(Vec::new());
    }
    let marks = placeholders(person_ids.len());
    let query = format!(
        "SELECT from_person_id, to_person_id FROM relationships \
         WHERE type = ? AND (from_person_id IN ({}) OR to_person_id IN ({}))",
        marks, marks
    );
    let ids = person_ids.to_vec();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&query)?;
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(RelationType::SpouseOf.as_str().to_string())];
        for id in &ids {
            bound.push(Box::new(id.clone()));
        }
        for id in &ids {
            bound.push(Box::new(id.clone()));
        }
        let rows = stmt.query_map(rusqlite::params_from_iter(bound), |row| {
            Ok(Edge {
                from_person_id: row.get(0)?,
                to_person_id: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}

async fn query_edges(
    db: &Db,
    query: String,
    type_str: &'static str,
    ids: Vec<String>,
) -> Result<Vec<Edge>> {
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&query)?;
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(type_str.to_string())];
        for id in &ids {
            bound.push(Box::new(id.clone()));
        }
        let rows = stmt.query_map(rusqlite::params_from_iter(bound), |row| {
            Ok(Edge {
                from_person_id: row.get(0)?,
                to_person_id: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Privacy;
    use crate::store::test_support::{seed_branch, seed_edge, seed_person, test_db};

    #[tokio::test]
    async fn test_create_and_fetch() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let a = seed_person(&db, &bid, "A", Privacy::Public).await;
        let b = seed_person(&db, &bid, "B", Privacy::Public).await;

        let rel = create(
            &db,
            NewRelationship {
                branch_id: bid.clone(),
                from_person_id: a.clone(),
                to_person_id: b.clone(),
                rel_type: RelationType::ParentOf,
                created_by: "u1".into(),
            },
        )
        .await
        .unwrap();

        let fetched = find_by_id(&db, &rel.id).await.unwrap().unwrap();
        assert_eq!(fetched.from_person_id, a);
        assert_eq!(fetched.to_person_id, b);
        assert_eq!(fetched.rel_type, RelationType::ParentOf);
    }

    #[tokio::test]
    async fn test_duplicate_tuple_rejected() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let a = seed_person(&db, &bid, "A", Privacy::Public).await;
        let b = seed_person(&db, &bid, "B", Privacy::Public).await;

        let new = NewRelationship {
            branch_id: bid.clone(),
            from_person_id: a.clone(),
            to_person_id: b.clone(),
            rel_type: RelationType::ParentOf,
            created_by: "u1".into(),
        };
        create(&db, new.clone()).await.unwrap();
        let err = create(&db, new.clone()).await.unwrap_err();
        assert!(matches!(err, KintreeError::RelationshipExists));

        // Same endpoints, different type is a different tuple.
        let sibling = NewRelationship {
            rel_type: RelationType::SiblingOf,
            ..new
        };
        create(&db, sibling).await.unwrap();
    }

    #[tokio::test]
    async fn test_edges_from_and_to() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let parent = seed_person(&db, &bid, "Parent", Privacy::Public).await;
        let child = seed_person(&db, &bid, "Child", Privacy::Public).await;
        seed_edge(&db, &bid, &parent, &child, RelationType::ParentOf).await;

        let down = edges_from(&db, &[parent.clone()], RelationType::ParentOf)
            .await
            .unwrap();
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].to_person_id, child);

        let up = edges_to(&db, &[child.clone()], RelationType::ParentOf)
            .await
            .unwrap();
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].from_person_id, parent);

        // Empty frontier never hits the store.
        assert!(edges_from(&db, &[], RelationType::ParentOf)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_spouse_edges_touching_either_endpoint() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let a = seed_person(&db, &bid, "A", Privacy::Public).await;
        let s = seed_person(&db, &bid, "S", Privacy::Public).await;
        seed_edge(&db, &bid, &s, &a, RelationType::SpouseOf).await;

        // Query by the `to` endpoint only; the stored row is directed s->a.
        let edges = spouse_edges_touching(&db, &[a.clone()]).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from_person_id, s);
    }

    #[tokio::test]
    async fn test_find_touching_and_delete() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        let a = seed_person(&db, &bid, "A", Privacy::Public).await;
        let b = seed_person(&db, &bid, "B", Privacy::Public).await;
        seed_edge(&db, &bid, &a, &b, RelationType::ParentOf).await;
        seed_edge(&db, &bid, &b, &a, RelationType::SpouseOf).await;

        let touching = find_touching_person(&db, &a).await.unwrap();
        assert_eq!(touching.len(), 2);

        let id = touching[0].id.clone();
        assert!(delete(&db, &id).await.unwrap());
        assert!(!delete(&db, &id).await.unwrap());
        assert_eq!(find_touching_person(&db, &a).await.unwrap().len(), 1);
    }
}
