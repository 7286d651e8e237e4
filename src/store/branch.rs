//! Branch store. The privacy guard uses this only to answer "is this actor
//! the owner or a listed member of the branch owning a sensitive resource".

use std::collections::HashMap;

use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;
use crate::model::{Branch, BranchMember};
use super::{now_rfc3339, placeholders};

#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub description: String,
    pub owner_id: String,
}

fn map_branch(row: &rusqlite::Row<'_>) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        members: Vec::new(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn load_members(
    conn: &rusqlite::Connection,
    branch_ids: &[String],
) -> Result<HashMap<String, Vec<BranchMember>>> {
    if branch_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let query = format!(
        "SELECT branch_id, user_id, role_in_branch, joined_at FROM branch_members \
         WHERE branch_id IN ({})",
        placeholders(branch_ids.len())
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(branch_ids.iter()), |row| {
        Ok((
            row.get::<_, String>(0)?,
            BranchMember {
                user_id: row.get(1)?,
                role_in_branch: row.get(2)?,
                joined_at: row.get(3)?,
            },
        ))
    })?;
    let mut members: HashMap<String, Vec<BranchMember>> = HashMap::new();
    for row in rows {
        let (branch_id, member) = row?;
        members.entry(branch_id).or_default().push(member);
    }
    Ok(members)
}

/// Create a branch owned by the given user.
pub async fn create(db: &Db, new: NewBranch) -> Result<Branch> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO branches (id, name, description, owner_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, new.name, new.description, new.owner_id, now, now],
        )?;
        Ok(Branch {
            id,
            name: new.name,
            description: new.description,
            owner_id: new.owner_id,
            members: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    })
    .await
}

/// Add (or re-role) a member on the branch ACL.
pub async fn add_member(db: &Db, branch_id: &str, user_id: &str, role: &str) -> Result<()> {
    let branch_id = branch_id.to_string();
    let user_id = user_id.to_string();
    let role = role.to_string();
    let now = now_rfc3339();
    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO branch_members (branch_id, user_id, role_in_branch, joined_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(branch_id, user_id) DO UPDATE SET role_in_branch = excluded.role_in_branch",
            params![branch_id, user_id, role, now],
        )?;
        Ok(())
    })
    .await
}

/// Fetch one branch with its member list.
pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<Branch>> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, name, description, owner_id, created_at, updated_at \
             FROM branches WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], map_branch)?;
        let mut branch = match rows.next() {
            Some(row) => row?,
            None => return Ok(None),
        };
        let mut members = load_members(conn, std::slice::from_ref(&branch.id))?;
        branch.members = members.remove(&branch.id).unwrap_or_default();
        Ok(Some(branch))
    })
    .await
}

/// Batch fetch for the tree filtering pass: branches (with members) keyed
/// by branch ID.
pub async fn find_by_ids(db: &Db, ids: &[String]) -> Result<HashMap<String, Branch>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids = ids.to_vec();
    db.with_connection(move |conn| {
        let query = format!(
            "SELECT id, name, description, owner_id, created_at, updated_at \
             FROM branches WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), map_branch)?;
        let mut branches = Vec::new();
        for row in rows {
            branches.push(row?);
        }
        let branch_ids: Vec<String> = branches.iter().map(|b| b.id.clone()).collect();
        let mut members = load_members(conn, &branch_ids)?;
        let mut out = HashMap::with_capacity(branches.len());
        for mut branch in branches {
            branch.members = members.remove(&branch.id).unwrap_or_default();
            out.insert(branch.id.clone(), branch);
        }
        Ok(out)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{seed_branch, test_db};

    #[tokio::test]
    async fn test_branch_with_members() {
        let (db, _tmp) = test_db().await;
        let (uid, bid) = seed_branch(&db).await;

        add_member(&db, &bid, "other-user", "viewer").await.unwrap();

        let branch = find_by_id(&db, &bid).await.unwrap().unwrap();
        assert_eq!(branch.owner_id, uid);
        assert_eq!(branch.members.len(), 1);
        assert!(branch.is_owner_or_member("other-user"));
        assert!(!branch.is_owner_or_member("stranger"));

        assert!(find_by_id(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_fetch() {
        let (db, _tmp) = test_db().await;
        let (uid, bid) = seed_branch(&db).await;
        let second = create(
            &db,
            NewBranch {
                name: "Second".into(),
                description: String::new(),
                owner_id: uid.clone(),
            },
        )
        .await
        .unwrap();
        add_member(&db, &second.id, "m1", "editor").await.unwrap();

        let branches = find_by_ids(&db, &[bid.clone(), second.id.clone()])
            .await
            .unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[&second.id].members.len(), 1);
        assert!(branches[&bid].members.is_empty());
    }

    #[tokio::test]
    async fn test_add_member_upsert() {
        let (db, _tmp) = test_db().await;
        let (_uid, bid) = seed_branch(&db).await;
        add_member(&db, &bid, "m1", "viewer").await.unwrap();
        add_member(&db, &bid, "m1", "editor").await.unwrap();
        let branch = find_by_id(&db, &bid).await.unwrap().unwrap();
        assert_eq!(branch.members.len(), 1);
        assert_eq!(branch.members[0].role_in_branch, "editor");
    }
}
