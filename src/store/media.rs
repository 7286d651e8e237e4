//! Media metadata store. File storage, upload and streaming are external;
//! only privacy-tagged records live here.

use rusqlite::params;
use uuid::Uuid;

use crate::db::Db;
use crate::error::Result;
use crate::model::{Media, Privacy};
use super::{conversion_err, now_rfc3339};

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub branch_id: String,
    pub person_id: Option<String>,
    pub event_id: Option<String>,
    pub kind: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub privacy: Privacy,
    pub uploaded_by: String,
}

fn map_media(row: &rusqlite::Row<'_>) -> rusqlite::Result<Media> {
    let privacy_str: String = row.get(9)?;
    let privacy = privacy_str
        .parse::<Privacy>()
        .map_err(|_| conversion_err(9, format!("bad privacy value: {}", privacy_str)))?;
    Ok(Media {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        person_id: row.get(2)?,
        event_id: row.get(3)?,
        kind: row.get(4)?,
        original_name: row.get(5)?,
        mime_type: row.get(6)?,
        size_bytes: row.get(7)?,
        storage_path: row.get(8)?,
        privacy,
        uploaded_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const MEDIA_COLS: &str = "id, branch_id, person_id, event_id, kind, original_name, mime_type, \
     size_bytes, storage_path, privacy, uploaded_by, created_at, updated_at";

pub async fn create(db: &Db, new: NewMedia) -> Result<Media> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO media \
             (id, branch_id, person_id, event_id, kind, original_name, mime_type, \
              size_bytes, storage_path, privacy, uploaded_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                new.branch_id,
                new.person_id,
                new.event_id,
                new.kind,
                new.original_name,
                new.mime_type,
                new.size_bytes,
                new.storage_path,
                new.privacy.as_str(),
                new.uploaded_by,
                now,
                now
            ],
        )?;
        Ok(Media {
            id,
            branch_id: new.branch_id,
            person_id: new.person_id,
            event_id: new.event_id,
            kind: new.kind,
            original_name: new.original_name,
            mime_type: new.mime_type,
            size_bytes: new.size_bytes,
            storage_path: new.storage_path,
            privacy: new.privacy,
            uploaded_by: new.uploaded_by,
            created_at: now.clone(),
            updated_at: now,
        })
    })
    .await
}

pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<Media>> {
    let id = id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM media WHERE id = ?1", MEDIA_COLS))?;
        let mut rows = stmt.query_map(params![id], map_media)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    })
    .await
}

pub async fn list_for_person(db: &Db, person_id: &str) -> Result<Vec<Media>> {
    let person_id = person_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM media WHERE person_id = ?1 ORDER BY created_at DESC",
            MEDIA_COLS
        ))?;
        let rows = stmt.query_map(params![person_id], map_media)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
    .await
}
