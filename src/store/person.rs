//! Person store: CRUD, batch fetch for tree assembly, paged name search,
//! and the cascade that removes everything referencing a deleted person.

use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::model::{Person, Privacy};
use super::{conversion_err, now_rfc3339, placeholders};

/// Fields accepted when creating a person.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub branch_id: String,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub phone: String,
    pub address: String,
    pub privacy: Privacy,
    pub note: String,
    pub generation: Option<i64>,
    pub created_by: String,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct PersonUpdate {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<Option<String>>,
    pub date_of_death: Option<Option<String>>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub privacy: Option<Privacy>,
    pub note: Option<String>,
    pub generation: Option<Option<i64>>,
    pub updated_by: Option<String>,
}

/// Filters for the paged person listing.
#[derive(Debug, Clone, Default)]
pub struct PersonFilter {
    pub branch_id: Option<String>,
    pub full_name: Option<String>,
    pub page: u32,
    pub limit: u32,
}

const PERSON_COLS: &str = "id, branch_id, full_name, gender, date_of_birth, date_of_death, \
     phone, address, privacy, note, avatar_media_id, generation, \
     created_by, updated_by, created_at, updated_at";

pub(crate) fn map_person(row: &rusqlite::Row<'_>) -> rusqlite::Result<Person> {
    let privacy_str: String = row.get(8)?;
    let privacy = privacy_str
        .parse::<Privacy>()
        .map_err(|_| conversion_err(8, format!("bad privacy value: {}", privacy_str)))?;
    Ok(Person {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        full_name: row.get(2)?,
        gender: row.get(3)?,
        date_of_birth: row.get(4)?,
        date_of_death: row.get(5)?,
        phone: row.get(6)?,
        address: row.get(7)?,
        privacy,
        note: row.get(9)?,
        avatar_media_id: row.get(10)?,
        generation: row.get(11)?,
        created_by: row.get(12)?,
        updated_by: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// Insert a new person record.
pub async fn create(db: &Db, new: NewPerson) -> Result<Person> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();

    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO persons \
             (id, branch_id, full_name, gender, date_of_birth, date_of_death, \
              phone, address, privacy, note, avatar_media_id, generation, \
              created_by, updated_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11, ?12, NULL, ?13, ?14)",
            params![
                id,
                new.branch_id,
                new.full_name,
                new.gender,
                new.date_of_birth,
                new.date_of_death,
                new.phone,
                new.address,
                new.privacy.as_str(),
                new.note,
                new.generation,
                new.created_by,
                now,
                now
            ],
        )?;

        Ok(Person {
            id,
            branch_id: new.branch_id,
            full_name: new.full_name,
            gender: new.gender,
            date_of_birth: new.date_of_birth,
            date_of_death: new.date_of_death,
            phone: new.phone,
            address: new.address,
            privacy: new.privacy,
            note: new.note,
            avatar_media_id: None,
            generation: new.generation,
            created_by: new.created_by,
            updated_by: None,
            created_at: now.clone(),
            updated_at: now,
        })
    })
    .await
}

/// Fetch a person by ID.
pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<Person>> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM persons WHERE id = ?1",
            PERSON_COLS
        ))?;
        let mut rows = stmt.query_map(params![id], map_person)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    })
    .await
}

/// Batch fetch for tree assembly: all persons whose ID is in the set.
/// Missing IDs are silently absent from the result.
pub async fn find_by_ids(db: &Db, ids: &[String]) -> Result<Vec<Person>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = format!(
        "SELECT {} FROM persons WHERE id IN ({})",
        PERSON_COLS,
        placeholders(ids.len())
    );
    let ids = ids.to_vec();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), map_person)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}

/// Paged listing with optional branch and case-insensitive name filters.
/// Returns (persons, total matching count).
pub async fn list(db: &Db, filter: PersonFilter) -> Result<(Vec<Person>, u64)> {
    let page = filter.page.max(1);
    let limit = if filter.limit == 0 { 20 } else { filter.limit };

    db.with_connection(move |conn| {
        let mut clauses: Vec<&str> = Vec::new();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(branch_id) = &filter.branch_id {
            clauses.push("branch_id = ?");
            bound.push(Box::new(branch_id.clone()));
        }
        if let Some(name) = &filter.full_name {
            clauses.push("full_name LIKE ? COLLATE NOCASE");
            bound.push(Box::new(format!("%{}%", name)));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM persons{}", where_sql),
            rusqlite::params_from_iter(bound.iter()),
            |row| row.get(0),
        )?;

        let query = format!(
            "SELECT {} FROM persons{} ORDER BY full_name LIMIT {} OFFSET {}",
            PERSON_COLS,
            where_sql,
            limit,
            (page - 1) * limit
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bound.iter()), map_person)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok((out, total))
    })
    .await
}

/// Apply a partial update. Returns the updated record, or None if the
/// person does not exist.
pub async fn update(db: &Db, id: &str, patch: PersonUpdate) -> Result<Option<Person>> {
    let id = id.to_string();
    let now = now_rfc3339();

    db.with_connection(move |conn| {
        let tx = conn.transaction()?;

        let current = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM persons WHERE id = ?1",
                PERSON_COLS
            ))?;
            let mut rows = stmt.query_map(params![id], map_person)?;
            match rows.next() {
                Some(row) => row?,
                None => return Ok(None),
            }
        };

        let updated = Person {
            id: current.id,
            branch_id: current.branch_id,
            full_name: patch.full_name.unwrap_or(current.full_name),
            gender: patch.gender.unwrap_or(current.gender),
            date_of_birth: patch.date_of_birth.unwrap_or(current.date_of_birth),
            date_of_death: patch.date_of_death.unwrap_or(current.date_of_death),
            phone: patch.phone.unwrap_or(current.phone),
            address: patch.address.unwrap_or(current.address),
            privacy: patch.privacy.unwrap_or(current.privacy),
            note: patch.note.unwrap_or(current.note),
            avatar_media_id: current.avatar_media_id,
            generation: patch.generation.unwrap_or(current.generation),
            created_by: current.created_by,
            updated_by: patch.updated_by.or(current.updated_by),
            created_at: current.created_at,
            updated_at: now.clone(),
        };

        tx.execute(
            "UPDATE persons SET full_name = ?2, gender = ?3, date_of_birth = ?4, \
             date_of_death = ?5, phone = ?6, address = ?7, privacy = ?8, note = ?9, \
             generation = ?10, updated_by = ?11, updated_at = ?12 WHERE id = ?1",
            params![
                updated.id,
                updated.full_name,
                updated.gender,
                updated.date_of_birth,
                updated.date_of_death,
                updated.phone,
                updated.address,
                updated.privacy.as_str(),
                updated.note,
                updated.generation,
                updated.updated_by,
                updated.updated_at
            ],
        )?;
        tx.commit()?;

        Ok(Some(updated))
    })
    .await
}

/// Delete a person and cascade: every relationship touching them, their
/// event links, and media rows pointing at them go in the same
/// transaction. Returns whether the person existed.
pub async fn delete(db: &Db, id: &str) -> Result<bool> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;

        let n = tx.execute("DELETE FROM persons WHERE id = ?1", params![id])?;
        if n == 0 {
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM relationships WHERE from_person_id = ?1 OR to_person_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM event_persons WHERE person_id = ?1", params![id])?;
        tx.execute("DELETE FROM media WHERE person_id = ?1", params![id])?;

        tx.commit().map_err(KintreeError::Database)?;
        Ok(true)
    })
    .await
}
