use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use crate::api::models::{
    FolderRequest, GroupingRequest, IssuesQuery, PageRequest, PageSizeRequest, ShowAllRequest,
    SortRequest,
};
use crate::api::AppState;
use crate::browser::{PageSize, SortKey, SortOrder, ViewSnapshot};
use crate::errors::GateError;

pub const SESSION_HEADER: &str = "x-session-id";

fn session_id(headers: &HeaderMap) -> Result<String, GateError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GateError::InvalidInput(format!("Missing {} header", SESSION_HEADER)))
}

fn updated() -> Json<Value> {
    Json(json!({ "updated": true }))
}

pub async fn get_issues(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IssuesQuery>,
) -> Result<Json<ViewSnapshot>, GateError> {
    let session = session_id(&headers)?;
    let snapshot = state.registry.snapshot(&session, query.is_first_time()).await?;
    Ok(Json(snapshot))
}

pub async fn end_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, GateError> {
    let session = session_id(&headers)?;
    Ok(Json(json!({ "ended": state.registry.end_session(&session) })))
}

pub async fn set_folder(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FolderRequest>,
) -> Result<Json<Value>, GateError> {
    state.registry.set_folder(&session_id(&headers)?, &req.name).await?;
    Ok(updated())
}

pub async fn set_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PageRequest>,
) -> Result<Json<Value>, GateError> {
    state.registry.set_page(&session_id(&headers)?, req.page).await?;
    Ok(updated())
}

pub async fn set_page_size(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PageSizeRequest>,
) -> Result<Json<Value>, GateError> {
    state
        .registry
        .set_page_size(&session_id(&headers)?, PageSize::from_request(req.size))
        .await?;
    Ok(updated())
}

pub async fn set_show_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ShowAllRequest>,
) -> Result<Json<Value>, GateError> {
    state.registry.set_show_all(&session_id(&headers)?, req.show_all).await?;
    Ok(updated())
}

pub async fn set_sort(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SortRequest>,
) -> Result<Json<Value>, GateError> {
    let sort = SortOrder::new(SortKey::parse(&req.key)?, req.descending);
    state.registry.set_sort(&session_id(&headers)?, sort).await?;
    Ok(updated())
}

pub async fn set_grouping(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GroupingRequest>,
) -> Result<Json<Value>, GateError> {
    if req.grouping.trim().is_empty() {
        return Err(GateError::InvalidInput("Grouping must not be empty".into()));
    }
    state.registry.set_grouping(&session_id(&headers)?, req.grouping.trim()).await?;
    Ok(updated())
}
