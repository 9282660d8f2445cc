use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::error::ApiError;
use super::AppState;
use crate::model::query::{RawTaskQuery, TaskQuery};
use crate::model::task::TaskDetail;
use crate::retrieval::TaskListing;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Describes the available tools and their parameters.
pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let default_limit = state.retriever.config().default_limit;
    Json(json!({
        "tools": [
            {
                "name": "list_tasks",
                "path": "/tools/list_tasks",
                "description": "Active pipeline tasks, optionally followed by invoicing tasks",
                "params": {
                    "search": "free text over name, description and custom fields",
                    "list_id": "restrict to one list instead of the whole workspace",
                    "sector": "match a Sector custom field",
                    "job_number": "match name, description or a Job Number field; searches every list",
                    "include_invoicing": "true to append the invoicing list",
                    "limit": format!("maximum items returned (default {default_limit})"),
                }
            },
            {
                "name": "get_task",
                "path": "/tools/get_task/{task_id}",
                "description": "One task by id",
            }
        ]
    }))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(raw): Query<RawTaskQuery>,
) -> Result<Json<TaskListing>, ApiError> {
    let query = TaskQuery::try_from(raw)?;
    let listing = state.retriever.list_tasks(&query).await?;
    info!(
        returned = listing.total_returned,
        active = listing.active_count,
        invoicing = listing.invoicing_count,
        "Listed tasks"
    );
    Ok(Json(listing))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskDetail>, ApiError> {
    let detail = state.retriever.get_task(&task_id).await?;
    Ok(Json(detail))
}
