use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::message::Message;
use crate::services::meta_service::TemplateComponentPayload;
use crate::services::send_service::{SendOutcome, TemplateSendOutcome};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SendTextPayload {
    pub recipient: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SendImagePayload {
    pub recipient: String,
    pub media_url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SendTemplatePayload {
    pub recipient: String,
    pub template_name: String,
    pub language_code: String,
    pub components: Vec<TemplateComponentPayload>,
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
#[serde(default)]
pub struct MarkReadPayload {
    #[validate(length(min = 1))]
    pub contact_phone: String,
}

/// `message` is absent when the provider accepted the send but the local
/// record failed; `warning` says so.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    pub meta_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct TemplateSendResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    pub meta_id: String,
    pub template_name: String,
    pub template_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

impl From<SendOutcome> for SendResponse {
    fn from(outcome: SendOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            meta_id: outcome.meta_id,
            warning: outcome.warning,
        }
    }
}

impl From<TemplateSendOutcome> for TemplateSendResponse {
    fn from(outcome: TemplateSendOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            meta_id: outcome.meta_id,
            template_name: outcome.template_name,
            template_body: outcome.template_body,
            warning: outcome.warning,
        }
    }
}
