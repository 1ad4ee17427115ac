use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub phone_number: String,
    pub profile_name: Option<String>,
    pub last_interaction_at: Option<DateTime<Utc>>,
    pub session_status: String,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
}
