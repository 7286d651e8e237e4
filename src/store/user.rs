//! User store. The engine only consumes actors (`{id, role, is_banned}`);
//! token issuance and session handling live outside this service.

use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;
use crate::model::{Actor, Role};
use super::{conversion_err, now_rfc3339};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub api_token: Option<String>,
}

/// A stored user row, as much of it as this service needs.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_banned: bool,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            role: self.role,
            is_banned: self.is_banned,
        }
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    let role = role_str
        .parse::<Role>()
        .map_err(|_| conversion_err(3, format!("bad role: {}", role_str)))?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role,
        is_banned: row.get::<_, i64>(4)? != 0,
    })
}

/// Insert a user (fixtures and seeding; registration is external).
pub async fn create(db: &Db, new: NewUser) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO users (id, email, full_name, role, is_banned, api_token, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)",
            params![id, new.email, new.full_name, new.role.as_str(), new.api_token, now, now],
        )?;
        Ok(User {
            id,
            email: new.email,
            full_name: new.full_name,
            role: new.role,
            is_banned: false,
        })
    })
    .await
}

/// Resolve an API token to a user. Unknown tokens are simply None.
pub async fn find_by_token(db: &Db, token: &str) -> Result<Option<User>> {
    let token = token.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, email, full_name, role, is_banned FROM users WHERE api_token = ?1",
        )?;
        let mut rows = stmt.query_map(params![token], map_user)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    })
    .await
}

/// Flip the banned flag (moderation surface).
pub async fn set_banned(db: &Db, user_id: &str, banned: bool) -> Result<bool> {
    let user_id = user_id.to_string();
    db.with_connection(move |conn| {
        let n = conn.execute(
            "UPDATE users SET is_banned = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, banned as i64, now_rfc3339()],
        )?;
        Ok(n > 0)
    })
    .await
}
