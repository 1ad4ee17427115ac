use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::{
    dto::contact_dto::{ContactLookupPayload, ContactLookupResponse, ContactWithSession},
    error::{Error, Result},
    utils::phone::normalize_to_e164,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/contacts",
    responses(
        (status = 200, description = "All contacts with evaluated session windows")
    )
)]
#[axum::debug_handler]
pub async fn list_contacts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let now = Utc::now();
    let contacts = state.store.list_contacts().await?;
    let items: Vec<ContactWithSession> = contacts
        .into_iter()
        .map(|contact| ContactWithSession::evaluate(contact, now))
        .collect();
    Ok(Json(items))
}

#[axum::debug_handler]
pub async fn contact_messages(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<impl IntoResponse> {
    let messages = state.store.messages_for_contact(&phone).await?;
    Ok(Json(messages))
}

/// Normalizes the number, then asks the provider whether it is a
/// reachable WhatsApp user.
#[axum::debug_handler]
pub async fn lookup_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactLookupPayload>,
) -> Result<impl IntoResponse> {
    let Some(normalized) = normalize_to_e164(&payload.phone) else {
        return Err(Error::BadRequestDetailed {
            error: "Invalid phone format",
            message: "Phone number must be in E.164 format.",
        });
    };

    let lookup = state
        .provider
        .lookup_contact(&normalized)
        .await
        .map_err(|err| Error::Provider {
            context: "Failed to look up contact",
            source: err,
        })?;

    Ok(Json(ContactLookupResponse {
        valid: lookup.valid,
        wa_id: lookup.wa_id,
        normalized,
    }))
}
