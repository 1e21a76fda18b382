//! Entity CRUD handlers: list, create, retrieve, update, partial update, destroy, plus the API root.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::model::{entity_by_path, EntityDef, Operation, ENTITIES};
use crate::service::{authorize, CrudService, Mode};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Host, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

/// Resolve the entity and check the caller may run `op` on it.
fn guard(path_segment: &str, op: Operation, caller: &Caller) -> Result<&'static EntityDef, AppError> {
    let entity = entity_by_path(path_segment).ok_or_else(|| AppError::NotFound(path_segment.to_string()))?;
    authorize(entity, op, caller)?;
    Ok(entity)
}

/// Ids are storage-assigned integers; anything else cannot name a row.
fn parse_id(entity: &EntityDef, id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::NotFound(format!("{} {}", entity.name, id_str)))
}

pub async fn list(
    caller: Caller,
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entity = guard(&path_segment, Operation::List, &caller)?;
    let rows = CrudService::list(state.store.as_ref(), entity).await?;
    Ok((StatusCode::OK, Json(rows)))
}

pub async fn create(
    caller: Caller,
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = guard(&path_segment, Operation::Create, &caller)?;
    let Json(body) = payload?;
    let row = CrudService::create(state.store.as_ref(), entity, body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn retrieve(
    caller: Caller,
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = guard(&path_segment, Operation::Retrieve, &caller)?;
    let id = parse_id(entity, &id_str)?;
    let row = CrudService::read(state.store.as_ref(), entity, id).await?;
    Ok((StatusCode::OK, Json(row)))
}

pub async fn update(
    caller: Caller,
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    write(caller, state, path_segment, id_str, payload, Mode::Replace).await
}

pub async fn partial_update(
    caller: Caller,
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    write(caller, state, path_segment, id_str, payload, Mode::Partial).await
}

async fn write(
    caller: Caller,
    state: AppState,
    path_segment: String,
    id_str: String,
    payload: Result<Json<Value>, JsonRejection>,
    mode: Mode,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let op = match mode {
        Mode::Partial => Operation::PartialUpdate,
        Mode::Create | Mode::Replace => Operation::Update,
    };
    let entity = guard(&path_segment, op, &caller)?;
    let id = parse_id(entity, &id_str)?;
    let Json(body) = payload?;
    let row = CrudService::update(state.store.as_ref(), entity, id, body, mode).await?;
    Ok((StatusCode::OK, Json(row)))
}

pub async fn destroy(
    caller: Caller,
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = guard(&path_segment, Operation::Destroy, &caller)?;
    let id = parse_id(entity, &id_str)?;
    CrudService::delete(state.store.as_ref(), entity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Scheme the client used: `https` only when a proxy says so via `X-Forwarded-Proto`.
fn request_scheme(headers: &HeaderMap) -> &'static str {
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    match forwarded {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}

/// GET /: every resource's list URL, keyed by path segment.
pub async fn api_root(Host(host): Host, headers: HeaderMap) -> Json<Value> {
    let scheme = request_scheme(&headers);
    let links: Map<String, Value> = ENTITIES
        .iter()
        .map(|e| {
            (
                e.path_segment.to_string(),
                Value::String(format!("{}://{}/{}/", scheme, host, e.path_segment)),
            )
        })
        .collect();
    Json(Value::Object(links))
}
