use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::template::MessageTemplate;
use crate::services::template_service::TemplateListing;

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<MessageTemplate>,
    pub cached: bool,
    pub last_sync: DateTime<Utc>,
    pub count: usize,
}

impl From<TemplateListing> for TemplateListResponse {
    fn from(listing: TemplateListing) -> Self {
        let templates = listing.templates.as_ref().clone();
        Self {
            success: true,
            count: templates.len(),
            templates,
            cached: listing.cached,
            last_sync: listing.last_sync,
        }
    }
}
