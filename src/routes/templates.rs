use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{dto::template_dto::TemplateListResponse, error::Result, AppState};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TemplateListQuery {
    pub refresh: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/templates",
    params(
        ("refresh" = Option<String>, Query, description = "Set to true to bypass the cache")
    ),
    responses(
        (status = 200, description = "Approved templates for the business account"),
        (status = 500, description = "Business account id not configured"),
        (status = 502, description = "Provider catalog fetch failed")
    )
)]
#[axum::debug_handler]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateListQuery>,
) -> Result<impl IntoResponse> {
    let force_refresh = query.refresh.as_deref() == Some("true");
    let listing = state.templates.list(force_refresh).await?;
    Ok(Json(TemplateListResponse::from(listing)))
}
