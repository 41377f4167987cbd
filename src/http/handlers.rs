//! Route handlers for `/api/issues`, `/api/issues/events` and `/api/stats`.

use std::convert::Infallible;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use schoolfix_lib::service::{self, IssueStats};
use schoolfix_lib::{
    Category, Issue, IssueDraft, IssueUpdate, ListFilters, Priority, SortOrder, Status,
};
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, warn};

use super::AppState;
use super::error::{ApiError, INTERNAL_ERROR_MESSAGE};

pub const DELETED_MESSAGE: &str = "Issue deleted successfully";

/// Query string accepted by `GET /api/issues`.
///
/// Empty values and `all` mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    /// Parse into store filters.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` naming the first value that does not parse.
    pub fn into_filters(self) -> Result<ListFilters, ApiError> {
        let limit = match given(self.limit) {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                ApiError::BadRequest(format!("limit must be a non-negative integer, got '{raw}'"))
            })?),
            None => None,
        };

        Ok(ListFilters {
            status: given(self.status).map(|s| s.parse::<Status>()).transpose()?,
            category: given(self.category).map(|c| c.parse::<Category>()).transpose()?,
            priority: given(self.priority).map(|p| p.parse::<Priority>()).transpose()?,
            search: given(self.q),
            sort: given(self.sort).map(|s| s.parse::<SortOrder>()).transpose()?,
            limit,
        })
    }
}

fn given(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Body of `PUT /api/issues`: the target id plus any updatable fields.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub update: IssueUpdate,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `GET /api/issues`
pub async fn list_issues(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    let Query(query) = query?;
    let filters = query.into_filters()?;
    let issues = state.store.list().await?;
    Ok(Json(filters.apply(issues)))
}

/// `POST /api/issues`
pub async fn create_issue(
    State(state): State<AppState>,
    body: Result<Json<IssueDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let Json(draft) = body?;
    let issue = state.store.create(draft).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// `PUT /api/issues`
pub async fn update_issue(
    State(state): State<AppState>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<Issue>, ApiError> {
    let Json(request) = body?;
    let id = request
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Issue ID is required".to_string()))?;

    let issue = state.store.update(&id, &request.update).await?;
    Ok(Json(issue))
}

/// `DELETE /api/issues?id=ID`
pub async fn delete_issue(
    State(state): State<AppState>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Query(query) = query?;
    let id = query
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Issue ID is required".to_string()))?;

    state.store.delete(&id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE,
    }))
}

/// `GET /api/stats`
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<IssueStats>, ApiError> {
    let issues = state.store.list().await?;
    Ok(Json(service::stats(&issues)))
}

/// `GET /api/issues/events`: one `snapshot` event per change.
pub async fn issue_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscription = state.store.subscribe(state.shutdown.child_token()).await?;
    debug!(backend = state.store.backend(), "event stream opened");
    let events = subscription.map(|snapshot| Ok::<_, Infallible>(snapshot_event(snapshot)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn snapshot_event(snapshot: schoolfix_lib::Result<Vec<Issue>>) -> Event {
    match snapshot {
        Ok(issues) => Event::default()
            .event("snapshot")
            .json_data(&issues)
            .unwrap_or_else(|e| {
                error!(error = %e, "failed to encode snapshot");
                error_event()
            }),
        Err(e) => {
            warn!(error = %e, "snapshot refresh failed");
            error_event()
        }
    }
}

fn error_event() -> Event {
    Event::default()
        .event("error")
        .data(serde_json::json!({ "error": INTERNAL_ERROR_MESSAGE }).to_string())
}
