use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub contact_phone: String,
    pub direction: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub meta_id: Option<String>,
    pub status: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub contact_phone: String,
    pub direction: String,
    pub message_type: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub meta_id: Option<String>,
    pub status: String,
    pub source: String,
}

impl NewMessage {
    /// Outbound record with the defaults shared by every send path.
    pub fn outbound(contact_phone: &str, message_type: &str, source: &str) -> Self {
        Self {
            contact_phone: contact_phone.to_string(),
            direction: "outbound".to_string(),
            message_type: message_type.to_string(),
            body: None,
            media_url: None,
            meta_id: None,
            status: "sent".to_string(),
            source: source.to_string(),
        }
    }
}
