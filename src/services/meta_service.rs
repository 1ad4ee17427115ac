use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::get_config;
use crate::models::template::MessageTemplate;

pub const META_API_BASE_URL: &str = "https://graph.facebook.com/v24.0";

/// Provider error codes this backend reacts to specifically.
pub const CODE_SESSION_WINDOW_CLOSED: i64 = 131047;
pub const CODE_TEMPLATE_NOT_FOUND: i64 = 132000;
pub const CODE_TEMPLATE_PARAM_MISMATCH: i64 = 132001;
pub const CODE_TEMPLATE_PAUSED: i64 = 132005;

/// Error object from the Graph API envelope, forwarded to API consumers
/// under the `meta_error` key. Transport failures are folded into the same
/// shape with `code` 0 so callers have a single error type to match on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaApiError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

impl MetaApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: "transport".to_string(),
            code: 0,
            error_subcode: None,
            fbtrace_id: None,
        }
    }

    pub fn is_session_window_closed(&self) -> bool {
        self.code == CODE_SESSION_WINDOW_CLOSED
    }

    /// One-line rendering for audit rows.
    pub fn detail(&self) -> String {
        if self.code == 0 {
            self.message.clone()
        } else {
            format!("{} (code {})", self.message, self.code)
        }
    }
}

impl std::fmt::Display for MetaApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail())
    }
}

impl std::error::Error for MetaApiError {}

#[derive(Debug, Deserialize)]
struct MetaErrorEnvelope {
    error: MetaApiError,
}

pub type ProviderResult<T> = std::result::Result<T, MetaApiError>;

/// Template component forwarded verbatim in the send payload. Parameter
/// objects stay untyped; the provider validates them against the template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateComponentPayload {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<JsonValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactLookup {
    pub valid: bool,
    pub wa_id: Option<String>,
}

/// Outbound surface of the WhatsApp Business provider. The send
/// coordinator and the routes depend on this trait, not on the concrete
/// HTTP client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WhatsappApi: Send + Sync {
    /// Free-form text message. Returns the provider message id.
    async fn send_text(&self, to: &str, body: &str) -> ProviderResult<String>;

    /// Image message referencing an already-uploaded media id.
    async fn send_image(
        &self,
        to: &str,
        media_id: &str,
        caption: Option<String>,
    ) -> ProviderResult<String>;

    /// Pre-approved template message. Works outside the session window.
    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language: &str,
        components: &[TemplateComponentPayload],
    ) -> ProviderResult<String>;

    /// Downloads the media behind `media_url` and uploads it to the
    /// provider. Returns the provider media id.
    async fn upload_media_from_url(&self, media_url: &str) -> ProviderResult<String>;

    /// Raw template catalog for the business account, unfiltered.
    async fn fetch_templates(&self) -> ProviderResult<Vec<MessageTemplate>>;

    /// Asks the provider whether a number is a reachable WhatsApp user.
    async fn lookup_contact(&self, phone: &str) -> ProviderResult<ContactLookup>;
}

pub fn text_payload(to: &str, body: &str) -> JsonValue {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "text",
        "text": {
            "preview_url": false,
            "body": body,
        },
    })
}

pub fn image_payload(to: &str, media_id: &str, caption: Option<&str>) -> JsonValue {
    let mut payload = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "image",
        "image": {
            "id": media_id,
        },
    });
    if let Some(caption) = caption {
        payload["image"]["caption"] = json!(caption);
    }
    payload
}

/// Template payloads carry no `recipient_type` and omit `components`
/// entirely when there are none.
pub fn template_payload(
    to: &str,
    name: &str,
    language: &str,
    components: &[TemplateComponentPayload],
) -> JsonValue {
    let mut payload = json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "template",
        "template": {
            "name": name,
            "language": { "code": language },
        },
    });
    if !components.is_empty() {
        payload["template"]["components"] = json!(components);
    }
    payload
}

fn parse_error_envelope(data: JsonValue, fallback: &str) -> MetaApiError {
    serde_json::from_value::<MetaErrorEnvelope>(data)
        .map(|envelope| envelope.error)
        .unwrap_or_else(|_| MetaApiError::transport(fallback))
}

fn media_part(data: Bytes, content_type: &str) -> reqwest::Result<reqwest::multipart::Part> {
    reqwest::multipart::Part::stream(data)
        .file_name("image.jpg")
        .mime_str(content_type)
}

#[derive(Clone)]
pub struct MetaClient {
    client: Client,
    access_token: String,
    phone_number_id: String,
    waba_id: Option<String>,
}

impl MetaClient {
    pub fn new(client: Client) -> Self {
        let config = get_config();
        Self {
            client,
            access_token: config.meta_access_token.clone(),
            phone_number_id: config.meta_phone_number_id.clone(),
            waba_id: config.meta_waba_id.clone(),
        }
    }

    fn phone_url(&self, resource: &str) -> String {
        format!("{}/{}/{}", META_API_BASE_URL, self.phone_number_id, resource)
    }

    async fn post_message(&self, payload: JsonValue) -> ProviderResult<String> {
        let response = self
            .client
            .post(self.phone_url("messages"))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| MetaApiError::transport(format!("Message delivery failed: {}", err)))?;

        let status = response.status();
        let data: JsonValue = response.json().await.map_err(|err| {
            MetaApiError::transport(format!("Unreadable provider response: {}", err))
        })?;

        if !status.is_success() {
            let error = parse_error_envelope(data, "Provider rejected the message");
            tracing::warn!("Message send rejected by provider: {}", error);
            return Err(error);
        }

        data.get("messages")
            .and_then(|m| m.get(0))
            .and_then(|m| m.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| MetaApiError::transport("Provider response missing message id"))
    }
}

#[async_trait]
impl WhatsappApi for MetaClient {
    async fn send_text(&self, to: &str, body: &str) -> ProviderResult<String> {
        self.post_message(text_payload(to, body)).await
    }

    async fn send_image(
        &self,
        to: &str,
        media_id: &str,
        caption: Option<String>,
    ) -> ProviderResult<String> {
        self.post_message(image_payload(to, media_id, caption.as_deref()))
            .await
    }

    async fn send_template(
        &self,
        to: &str,
        name: &str,
        language: &str,
        components: &[TemplateComponentPayload],
    ) -> ProviderResult<String> {
        self.post_message(template_payload(to, name, language, components))
            .await
    }

    async fn upload_media_from_url(&self, media_url: &str) -> ProviderResult<String> {
        let source = self
            .client
            .get(media_url)
            .send()
            .await
            .map_err(|_| MetaApiError::transport("Failed to fetch image from storage"))?;
        if !source.status().is_success() {
            return Err(MetaApiError::transport("Failed to fetch image from storage"));
        }

        let content_type = source
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = source
            .bytes()
            .await
            .map_err(|_| MetaApiError::transport("Failed to fetch image from storage"))?;

        let file = media_part(bytes, &content_type)
            .map_err(|_| MetaApiError::transport("Failed to upload media to Meta"))?;
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .part("file", file)
            .text("type", content_type);

        let response = self
            .client
            .post(self.phone_url("media"))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|_| MetaApiError::transport("Failed to upload media to Meta"))?;

        let status = response.status();
        let data: JsonValue = response
            .json()
            .await
            .map_err(|_| MetaApiError::transport("Failed to upload media to Meta"))?;

        if !status.is_success() {
            return Err(parse_error_envelope(data, "Failed to upload to Meta"));
        }

        data.get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| MetaApiError::transport("Failed to upload media to Meta"))
    }

    async fn fetch_templates(&self) -> ProviderResult<Vec<MessageTemplate>> {
        let Some(waba_id) = self.waba_id.as_deref() else {
            return Err(MetaApiError::transport(
                "META_WABA_ID environment variable is required for fetching templates",
            ));
        };

        let url = format!(
            "{}/{}/message_templates?fields=id,name,language,status,category,components",
            META_API_BASE_URL, waba_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| {
                MetaApiError::transport(format!("Template catalog fetch failed: {}", err))
            })?;

        let status = response.status();
        let data: JsonValue = response.json().await.map_err(|err| {
            MetaApiError::transport(format!("Unreadable provider response: {}", err))
        })?;

        if !status.is_success() {
            let error = parse_error_envelope(data, "Failed to fetch templates from provider");
            tracing::warn!("Template catalog fetch rejected: {}", error);
            return Err(error);
        }

        let list = data.get("data").cloned().unwrap_or_else(|| json!([]));
        serde_json::from_value::<Vec<MessageTemplate>>(list)
            .map_err(|err| MetaApiError::transport(format!("Unreadable template catalog: {}", err)))
    }

    async fn lookup_contact(&self, phone: &str) -> ProviderResult<ContactLookup> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "contacts": [phone],
            "type": "individual",
        });
        let response = self
            .client
            .post(self.phone_url("contacts"))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|err| MetaApiError::transport(format!("Contact lookup failed: {}", err)))?;

        let status = response.status();
        let data: JsonValue = response.json().await.map_err(|err| {
            MetaApiError::transport(format!("Unreadable provider response: {}", err))
        })?;

        if !status.is_success() {
            return Err(parse_error_envelope(data, "Contact lookup failed"));
        }

        let contact = data.get("contacts").and_then(|contacts| contacts.get(0));
        Ok(ContactLookup {
            valid: contact
                .and_then(|c| c.get("status"))
                .and_then(|status| status.as_str())
                == Some("valid"),
            wa_id: contact
                .and_then(|c| c.get("wa_id"))
                .and_then(|id| id.as_str())
                .map(str::to_string),
        })
    }
}
