use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::contact::Contact;
use crate::utils::session_window::{self, SessionWindow};

/// Contact row with the session window evaluated at response time, so
/// the console never has to redo the window math.
#[derive(Debug, Serialize)]
pub struct ContactWithSession {
    #[serde(flatten)]
    pub contact: Contact,
    pub session: SessionWindow,
}

impl ContactWithSession {
    pub fn evaluate(contact: Contact, now: DateTime<Utc>) -> Self {
        let session = session_window::evaluate(contact.last_interaction_at, now);
        Self { contact, session }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ContactLookupPayload {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct ContactLookupResponse {
    pub valid: bool,
    pub wa_id: Option<String>,
    pub normalized: String,
}
