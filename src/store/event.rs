//! Event store: privacy-tagged life events linked to persons.

use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;
use crate::model::{Event, Privacy};
use super::{conversion_err, now_rfc3339};

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub branch_id: String,
    pub title: String,
    pub event_type: String,
    pub event_date: Option<String>,
    pub location: String,
    pub description: String,
    pub person_ids: Vec<String>,
    pub privacy: Privacy,
    pub created_by: String,
}

fn map_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let privacy_str: String = row.get(7)?;
    let privacy = privacy_str
        .parse::<Privacy>()
        .map_err(|_| conversion_err(7, format!("bad privacy value: {}", privacy_str)))?;
    Ok(Event {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        title: row.get(2)?,
        event_type: row.get(3)?,
        event_date: row.get(4)?,
        location: row.get(5)?,
        description: row.get(6)?,
        person_ids: Vec::new(),
        privacy,
        created_by: row.get(8)?,
        updated_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const EVENT_COLS: &str = "id, branch_id, title, type, event_date, location, description, \
     privacy, created_by, updated_by, created_at, updated_at";

/// Create an event and its person links in one transaction.
pub async fn create(db: &Db, new: NewEvent) -> Result<Event> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO events \
             (id, branch_id, title, type, event_date, location, description, privacy, \
              created_by, updated_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?11)",
            params![
                id,
                new.branch_id,
                new.title,
                new.event_type,
                new.event_date,
                new.location,
                new.description,
                new.privacy.as_str(),
                new.created_by,
                now,
                now
            ],
        )?;
        for person_id in &new.person_ids {
            tx.execute(
                "INSERT OR IGNORE INTO event_persons (event_id, person_id) VALUES (?1, ?2)",
                params![id, person_id],
            )?;
        }
        tx.commit()?;

        Ok(Event {
            id,
            branch_id: new.branch_id,
            title: new.title,
            event_type: new.event_type,
            event_date: new.event_date,
            location: new.location,
            description: new.description,
            person_ids: new.person_ids,
            privacy: new.privacy,
            created_by: new.created_by,
            updated_by: None,
            created_at: now.clone(),
            updated_at: now,
        })
    })
    .await
}

/// Fetch one event with its linked person IDs.
pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<Event>> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLS))?;
        let mut rows = stmt.query_map(params![id], map_event)?;
        let mut event = match rows.next() {
            Some(row) => row?,
            None => return Ok(None),
        };
        let mut stmt =
            conn.prepare("SELECT person_id FROM event_persons WHERE event_id = ?1")?;
        let links = stmt.query_map(params![event.id], |row| row.get::<_, String>(0))?;
        for link in links {
            event.person_ids.push(link?);
        }
        Ok(Some(event))
    })
    .await
}

/// Events linked to the given person, newest first.
pub async fn list_for_person(db: &Db, person_id: &str) -> Result<Vec<Event>> {
    let person_id = person_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM events e \
             JOIN event_persons ep ON ep.event_id = e.id \
             WHERE ep.person_id = ?1 ORDER BY e.event_date DESC",
            EVENT_COLS
        ))?;
        let rows = stmt.query_map(params![person_id], map_event)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}
