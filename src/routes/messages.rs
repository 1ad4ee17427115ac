use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::message_dto::{
        MarkReadPayload, SendImagePayload, SendResponse, SendTemplatePayload, SendTextPayload,
        TemplateSendResponse,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/messages/send",
    request_body = SendTextPayload,
    responses(
        (status = 200, description = "Message accepted by the provider"),
        (status = 400, description = "Invalid payload or session window expired"),
        (status = 404, description = "Contact not found"),
        (status = 502, description = "Provider rejected the message")
    )
)]
#[axum::debug_handler]
pub async fn send_text(
    State(state): State<AppState>,
    Json(payload): Json<SendTextPayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .sender
        .send_text(&payload.recipient, &payload.body)
        .await?;
    Ok(Json(SendResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn send_image(
    State(state): State<AppState>,
    Json(payload): Json<SendImagePayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .sender
        .send_image(
            &payload.recipient,
            &payload.media_url,
            payload.caption.as_deref(),
        )
        .await?;
    Ok(Json(SendResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/messages/send-template",
    request_body = SendTemplatePayload,
    responses(
        (status = 200, description = "Template message accepted by the provider"),
        (status = 400, description = "Invalid payload, parameter mismatch, or paused template"),
        (status = 404, description = "Template not found"),
        (status = 502, description = "Provider rejected the message")
    )
)]
#[axum::debug_handler]
pub async fn send_template(
    State(state): State<AppState>,
    Json(payload): Json<SendTemplatePayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .sender
        .send_template(
            &payload.recipient,
            &payload.template_name,
            &payload.language_code,
            &payload.components,
        )
        .await?;
    Ok(Json(TemplateSendResponse::from(outcome)))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Json(payload): Json<MarkReadPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .store
        .mark_contact_messages_read(&payload.contact_phone)
        .await?;
    Ok(Json(json!({ "success": true })))
}
