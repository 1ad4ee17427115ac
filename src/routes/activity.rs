use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{error::Result, AppState};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
    pub status: Option<String>,
}

#[axum::debug_handler]
pub async fn list_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let logs = state.store.list_automation_logs(limit, query.status).await?;
    Ok(Json(logs))
}

#[axum::debug_handler]
pub async fn activity_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.store.activity_stats(Utc::now()).await?;
    Ok(Json(stats))
}
