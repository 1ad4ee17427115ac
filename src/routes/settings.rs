use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    dto::settings_dto::{TestNotificationResponse, UpdateSettingsPayload, UpdateSettingsResponse},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let settings = state.settings.get().await?;
    Ok(Json(settings))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettingsPayload>,
) -> Result<impl IntoResponse> {
    let settings = state.settings.update(payload.into()).await?;
    Ok(Json(UpdateSettingsResponse {
        success: true,
        settings,
    }))
}

#[utoipa::path(
    post,
    path = "/api/settings/test-notification",
    responses(
        (status = 200, description = "Test message delivered to the admin phone"),
        (status = 400, description = "Admin phone missing or notifications disabled"),
        (status = 502, description = "Provider rejected the test message")
    )
)]
#[axum::debug_handler]
pub async fn send_test_notification(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let receipt = state.settings.send_test_notification().await?;
    Ok(Json(TestNotificationResponse::from(receipt)))
}
