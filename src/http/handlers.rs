//! Request handlers. Every response uses the same envelope:
//! `{success, data, meta, error}`; errors carry `{code, message}` and map
//! onto 400/403/404/409/500.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::KintreeError;
use crate::model::{Privacy, RelationType};
use crate::privacy;
use crate::store::{branch, event, media, person, relationship};
use crate::tree;
use super::{auth, AppState};

pub struct ApiError(KintreeError);

impl From<KintreeError> for ApiError {
    fn from(e: KintreeError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            KintreeError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            KintreeError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            KintreeError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETER"),
            KintreeError::RelationshipExists => (StatusCode::CONFLICT, "RELATIONSHIP_EXISTS"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {}", self.0);
        }
        let body = json!({
            "success": false,
            "data": null,
            "meta": null,
            "error": { "code": code, "message": self.0.to_string() },
        });
        (status, Json(body)).into_response()
    }
}

type HandlerResult = std::result::Result<Response, ApiError>;

fn ok(data: serde_json::Value) -> Response {
    envelope(StatusCode::OK, data, serde_json::Value::Null)
}

fn ok_meta(data: serde_json::Value, meta: serde_json::Value) -> Response {
    envelope(StatusCode::OK, data, meta)
}

fn created(data: serde_json::Value) -> Response {
    envelope(StatusCode::CREATED, data, serde_json::Value::Null)
}

fn envelope(status: StatusCode, data: serde_json::Value, meta: serde_json::Value) -> Response {
    (
        status,
        Json(json!({ "success": true, "data": data, "meta": meta, "error": null })),
    )
        .into_response()
}

fn parse_privacy(raw: Option<&str>) -> std::result::Result<Privacy, KintreeError> {
    match raw {
        Some(s) => s.parse(),
        None => Ok(Privacy::Internal),
    }
}

fn validate_gender(gender: &str) -> std::result::Result<(), KintreeError> {
    match gender {
        "male" | "female" | "other" | "unknown" => Ok(()),
        other => Err(KintreeError::InvalidParameter(format!(
            "gender must be male, female, other or unknown, got '{}'",
            other
        ))),
    }
}

fn validate_event_type(event_type: &str) -> std::result::Result<(), KintreeError> {
    match event_type {
        "birth" | "death" | "marriage" | "anniversary" | "other" => Ok(()),
        other => Err(KintreeError::InvalidParameter(format!(
            "event type must be birth, death, marriage, anniversary or other, got '{}'",
            other
        ))),
    }
}

pub async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "kintree",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

// ---- tree engine ----

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    pub depth: Option<i64>,
    pub format: Option<String>,
    pub include_spouses: Option<bool>,
}

pub async fn get_tree(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<TreeQuery>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;

    match tree::TreeFormat::parse(q.format.as_deref()) {
        tree::TreeFormat::Nested => {
            let depth = tree::validate_depth(q.depth, tree::DEFAULT_NESTED_DEPTH)?;
            let include_spouses = q.include_spouses.unwrap_or(true);
            let node =
                tree::build_nested_tree(&state.db, &id, actor.as_ref(), depth, include_spouses)
                    .await?;
            Ok(ok_meta(
                json!(node),
                json!({ "format": "nested", "depth": depth, "include_spouses": include_spouses }),
            ))
        }
        tree::TreeFormat::Flat => {
            // Flat output ignores depth, but an explicit bad value is still
            // rejected.
            tree::validate_depth(q.depth, tree::DEFAULT_NESTED_DEPTH)?;
            let flat = tree::build_flat_tree(&state.db, &id, actor.as_ref()).await?;
            Ok(ok_meta(json!(flat), json!({ "format": "flat" })))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    pub depth: Option<i64>,
}

pub async fn get_ancestors(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<DepthQuery>,
) -> HandlerResult {
    let depth = tree::validate_depth(q.depth, tree::DEFAULT_LEGACY_DEPTH)?;
    let people = tree::list_ancestors(&state.db, &id, depth).await?;
    let count = people.len();
    Ok(ok_meta(json!(people), json!({ "count": count, "depth": depth })))
}

pub async fn get_descendants(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<DepthQuery>,
) -> HandlerResult {
    let depth = tree::validate_depth(q.depth, tree::DEFAULT_LEGACY_DEPTH)?;
    let people = tree::list_descendants(&state.db, &id, depth).await?;
    let count = people.len();
    Ok(ok_meta(json!(people), json!({ "count": count, "depth": depth })))
}

// ---- persons ----

#[derive(Debug, Deserialize)]
pub struct CreatePersonBody {
    pub branch_id: String,
    pub full_name: String,
    #[serde(default = "default_gender")]
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub privacy: Option<String>,
    #[serde(default)]
    pub note: String,
    pub generation: Option<i64>,
}

fn default_gender() -> String {
    "unknown".to_string()
}

pub async fn create_person(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePersonBody>,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let actor = auth::require_editor(actor.as_ref())?;

    let privacy = parse_privacy(body.privacy.as_deref())?;
    validate_gender(&body.gender)?;
    if branch::find_by_id(&state.db, &body.branch_id).await?.is_none() {
        return Err(KintreeError::NotFound(format!("Branch {}", body.branch_id)).into());
    }

    let p = person::create(
        &state.db,
        person::NewPerson {
            branch_id: body.branch_id,
            full_name: body.full_name,
            gender: body.gender,
            date_of_birth: body.date_of_birth,
            date_of_death: body.date_of_death,
            phone: body.phone,
            address: body.address,
            privacy,
            note: body.note,
            generation: body.generation,
            created_by: actor.id.clone(),
        },
    )
    .await?;
    Ok(created(json!(p)))
}

#[derive(Debug, Deserialize)]
pub struct PersonListQuery {
    pub branch_id: Option<String>,
    pub name: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_persons(
    State(state): State<AppState>,
    Query(q): Query<PersonListQuery>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;

    let page = q.page.unwrap_or(1);
    let limit = q.limit.unwrap_or(20);
    let (people, total) = person::list(
        &state.db,
        person::PersonFilter {
            branch_id: q.branch_id,
            full_name: q.name,
            page,
            limit,
        },
    )
    .await?;

    // Privacy pass over the page: hidden records are dropped, the total
    // still counts every match.
    let branch_ids: Vec<String> = people
        .iter()
        .map(|p| p.branch_id.clone())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    let branches = branch::find_by_ids(&state.db, &branch_ids).await?;
    let visible: Vec<_> = people
        .into_iter()
        .filter(|p| privacy::can_view(p, actor.as_ref(), branches.get(&p.branch_id)))
        .collect();

    Ok(ok_meta(
        json!(visible),
        json!({ "page": page, "limit": limit, "total": total }),
    ))
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let p = person::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Person {}", id)))?;
    if !privacy::check(&state.db, &p, actor.as_ref()).await? {
        return Err(
            KintreeError::Forbidden("You do not have access to this person".to_string()).into(),
        );
    }
    Ok(ok(json!(p)))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePersonBody {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub privacy: Option<String>,
    pub note: Option<String>,
    pub generation: Option<i64>,
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdatePersonBody>,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let actor = auth::require_editor(actor.as_ref())?;

    let privacy = body
        .privacy
        .as_deref()
        .map(str::parse::<Privacy>)
        .transpose()?;
    if let Some(gender) = &body.gender {
        validate_gender(gender)?;
    }

    let updated = person::update(
        &state.db,
        &id,
        person::PersonUpdate {
            full_name: body.full_name,
            gender: body.gender,
            date_of_birth: body.date_of_birth.map(Some),
            date_of_death: body.date_of_death.map(Some),
            phone: body.phone,
            address: body.address,
            privacy,
            note: body.note,
            generation: body.generation.map(Some),
            updated_by: Some(actor.id.clone()),
        },
    )
    .await?
    .ok_or_else(|| KintreeError::NotFound(format!("Person {}", id)))?;
    Ok(ok(json!(updated)))
}

pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    auth::require_editor(actor.as_ref())?;

    if !person::delete(&state.db, &id).await? {
        return Err(KintreeError::NotFound(format!("Person {}", id)).into());
    }
    Ok(ok(json!({ "deleted": true })))
}

// ---- relationships ----

#[derive(Debug, Deserialize)]
pub struct CreateRelationshipBody {
    pub branch_id: String,
    pub from_person_id: String,
    pub to_person_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

pub async fn create_relationship(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRelationshipBody>,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let actor = auth::require_editor(actor.as_ref())?;

    let rel_type: RelationType = body.rel_type.parse()?;
    if body.from_person_id == body.to_person_id {
        return Err(KintreeError::InvalidParameter(
            "a person cannot be related to themselves".to_string(),
        )
        .into());
    }
    for pid in [&body.from_person_id, &body.to_person_id] {
        if person::find_by_id(&state.db, pid).await?.is_none() {
            return Err(KintreeError::NotFound(format!("Person {}", pid)).into());
        }
    }

    let rel = relationship::create(
        &state.db,
        relationship::NewRelationship {
            branch_id: body.branch_id,
            from_person_id: body.from_person_id,
            to_person_id: body.to_person_id,
            rel_type,
            created_by: actor.id.clone(),
        },
    )
    .await?;
    Ok(created(json!(rel)))
}

pub async fn get_relationship(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let rel = relationship::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Relationship {}", id)))?;
    Ok(ok(json!(rel)))
}

pub async fn delete_relationship(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    auth::require_editor(actor.as_ref())?;

    if !relationship::delete(&state.db, &id).await? {
        return Err(KintreeError::NotFound(format!("Relationship {}", id)).into());
    }
    Ok(ok(json!({ "deleted": true })))
}

pub async fn get_person_relationships(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    if person::find_by_id(&state.db, &id).await?.is_none() {
        return Err(KintreeError::NotFound(format!("Person {}", id)).into());
    }
    let rels = relationship::find_touching_person(&state.db, &id).await?;
    let count = rels.len();
    Ok(ok_meta(json!(rels), json!({ "count": count })))
}

// ---- events ----

#[derive(Debug, Deserialize)]
pub struct CreateEventBody {
    pub branch_id: String,
    pub title: String,
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    pub event_date: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub person_ids: Vec<String>,
    pub privacy: Option<String>,
}

fn default_event_type() -> String {
    "other".to_string()
}

pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateEventBody>,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let actor = auth::require_editor(actor.as_ref())?;

    let privacy = parse_privacy(body.privacy.as_deref())?;
    validate_event_type(&body.event_type)?;
    for pid in &body.person_ids {
        if person::find_by_id(&state.db, pid).await?.is_none() {
            return Err(KintreeError::NotFound(format!("Person {}", pid)).into());
        }
    }

    let ev = event::create(
        &state.db,
        event::NewEvent {
            branch_id: body.branch_id,
            title: body.title,
            event_type: body.event_type,
            event_date: body.event_date,
            location: body.location,
            description: body.description,
            person_ids: body.person_ids,
            privacy,
            created_by: actor.id.clone(),
        },
    )
    .await?;
    Ok(created(json!(ev)))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let ev = event::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Event {}", id)))?;
    if !privacy::check(&state.db, &ev, actor.as_ref()).await? {
        return Err(
            KintreeError::Forbidden("You do not have access to this event".to_string()).into(),
        );
    }
    Ok(ok(json!(ev)))
}

pub async fn get_person_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    if person::find_by_id(&state.db, &id).await?.is_none() {
        return Err(KintreeError::NotFound(format!("Person {}", id)).into());
    }
    let mut visible = Vec::new();
    for ev in event::list_for_person(&state.db, &id).await? {
        if privacy::check(&state.db, &ev, actor.as_ref()).await? {
            visible.push(ev);
        }
    }
    let count = visible.len();
    Ok(ok_meta(json!(visible), json!({ "count": count })))
}

pub async fn get_person_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    if person::find_by_id(&state.db, &id).await?.is_none() {
        return Err(KintreeError::NotFound(format!("Person {}", id)).into());
    }
    let mut visible = Vec::new();
    for m in media::list_for_person(&state.db, &id).await? {
        if privacy::check(&state.db, &m, actor.as_ref()).await? {
            visible.push(m);
        }
    }
    let count = visible.len();
    Ok(ok_meta(json!(visible), json!({ "count": count })))
}

// ---- branches ----

#[derive(Debug, Deserialize)]
pub struct CreateBranchBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub async fn create_branch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateBranchBody>,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let actor = auth::require_editor(actor.as_ref())?;

    let b = branch::create(
        &state.db,
        branch::NewBranch {
            name: body.name,
            description: body.description,
            owner_id: actor.id.clone(),
        },
    )
    .await?;
    branch::add_member(&state.db, &b.id, &actor.id, "owner").await?;
    let b = branch::find_by_id(&state.db, &b.id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Branch {}", b.id)))?;
    Ok(created(json!(b)))
}

pub async fn get_branch(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let b = branch::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Branch {}", id)))?;
    Ok(ok(json!(b)))
}

#[derive(Debug, Deserialize)]
pub struct AddMemberBody {
    pub user_id: String,
    pub role_in_branch: String,
}

pub async fn add_branch_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AddMemberBody>,
) -> HandlerResult {
    let actor = auth::resolve_actor(&state.db, &headers).await?;
    let actor = actor.ok_or_else(|| {
        KintreeError::Forbidden("Authentication required".to_string())
    })?;

    let b = branch::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Branch {}", id)))?;

    // Only a service admin or the branch owner manages the member list.
    if !matches!(actor.role, crate::model::Role::Admin) && b.owner_id != actor.id {
        return Err(KintreeError::Forbidden(
            "Only the branch owner can manage members".to_string(),
        )
        .into());
    }

    if !matches!(body.role_in_branch.as_str(), "owner" | "editor" | "viewer") {
        return Err(KintreeError::InvalidParameter(format!(
            "role_in_branch must be owner, editor or viewer, got '{}'",
            body.role_in_branch
        ))
        .into());
    }

    branch::add_member(&state.db, &id, &body.user_id, &body.role_in_branch).await?;
    let b = branch::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| KintreeError::NotFound(format!("Branch {}", id)))?;
    Ok(ok(json!(b)))
}
