//! Bearer-token authentication. Requests without an Authorization header
//! are anonymous; the privacy guard then sees them as `None`. Banned
//! accounts also resolve to anonymous, so a banned editor reads like a
//! stranger and cannot write at all.

use axum::http::HeaderMap;

use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::model::{Actor, Role};
use crate::store::user;

/// Resolve the request's actor from the Authorization header.
pub async fn resolve_actor(db: &Db, headers: &HeaderMap) -> Result<Option<Actor>> {
    let header = match headers.get("authorization").and_then(|h| h.to_str().ok()) {
        Some(h) => h,
        None => return Ok(None),
    };

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        KintreeError::InvalidParameter(
            "Invalid Authorization header format; use 'Authorization: Bearer <token>'".to_string(),
        )
    })?;

    let found = user::find_by_token(db, token).await?;
    match found {
        Some(u) if u.is_banned => {
            log::warn!("banned account {} presented a valid token", u.id);
            Ok(None)
        }
        Some(u) => Ok(Some(u.actor())),
        None => Err(KintreeError::Forbidden("Unknown API token".to_string())),
    }
}

/// Mutations require an authenticated editor or admin.
pub fn require_editor(actor: Option<&Actor>) -> Result<&Actor> {
    match actor {
        Some(a) if matches!(a.role, Role::Admin | Role::Editor) => Ok(a),
        Some(_) => Err(KintreeError::Forbidden(
            "Editor role required".to_string(),
        )),
        None => Err(KintreeError::Forbidden(
            "Authentication required".to_string(),
        )),
    }
}
