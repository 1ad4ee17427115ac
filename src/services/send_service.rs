use std::sync::Arc;

use rust_decimal::Decimal;
use url::Url;

use crate::error::{Error, Result};
use crate::models::contact::Contact;
use crate::models::message::{Message, NewMessage};
use crate::services::audit_service::{AuditOutcome, AuditService};
use crate::services::meta_service::{
    MetaApiError, TemplateComponentPayload, WhatsappApi, CODE_TEMPLATE_NOT_FOUND,
    CODE_TEMPLATE_PARAM_MISMATCH, CODE_TEMPLATE_PAUSED,
};
use crate::services::store::StoreGateway;
use crate::services::template_service::{
    build_display_text, component_parameters, TemplateService,
};
use crate::utils::session_window;
use crate::utils::time::Clock;

pub const MAX_TEXT_LENGTH: usize = 4096;
pub const MAX_CAPTION_LENGTH: usize = 1024;

/// Source tag on message rows sent from the console.
pub const SOURCE_MANUAL_UI: &str = "manual_ui";

/// Workflow names on the audit rows console sends produce.
pub const WORKFLOW_SEND_TEXT: &str = "ui_send_message";
pub const WORKFLOW_SEND_IMAGE: &str = "ui_send_image";
pub const WORKFLOW_SEND_TEMPLATE: &str = "ui_send_template";

/// Result of a text or image send. `message` is `None` when the provider
/// accepted the send but the local record could not be written.
#[derive(Debug)]
pub struct SendOutcome {
    pub message: Option<Message>,
    pub meta_id: String,
    pub warning: Option<&'static str>,
}

#[derive(Debug)]
pub struct TemplateSendOutcome {
    pub message: Option<Message>,
    pub meta_id: String,
    pub template_name: String,
    pub template_body: String,
    pub warning: Option<&'static str>,
}

/// Coordinates outbound sends: validates, enforces the 24 hour session
/// window for free-form messages, calls the provider, and records the
/// message row plus an audit row for every attempt that reaches a
/// decision.
#[derive(Clone)]
pub struct SendService {
    store: Arc<dyn StoreGateway>,
    provider: Arc<dyn WhatsappApi>,
    templates: TemplateService,
    audit: AuditService,
    clock: Arc<dyn Clock>,
    template_cost: Option<Decimal>,
}

impl SendService {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        provider: Arc<dyn WhatsappApi>,
        templates: TemplateService,
        audit: AuditService,
        clock: Arc<dyn Clock>,
        template_cost: Option<Decimal>,
    ) -> Self {
        Self {
            store,
            provider,
            templates,
            audit,
            clock,
            template_cost,
        }
    }

    pub async fn send_text(&self, recipient: &str, body: &str) -> Result<SendOutcome> {
        if recipient.is_empty() || body.is_empty() {
            return Err(Error::BadRequest(
                "Missing required fields: recipient and body".to_string(),
            ));
        }
        if body.chars().count() > MAX_TEXT_LENGTH {
            return Err(Error::BadRequest(format!(
                "Message body exceeds maximum length of {MAX_TEXT_LENGTH} characters"
            )));
        }

        let contact = self.require_contact(WORKFLOW_SEND_TEXT, recipient).await?;
        self.require_open_window(WORKFLOW_SEND_TEXT, &contact).await?;

        let meta_id = match self.provider.send_text(recipient, body).await {
            Ok(meta_id) => meta_id,
            Err(err) => {
                return Err(self
                    .provider_failure(WORKFLOW_SEND_TEXT, recipient, err, "Failed to send message")
                    .await)
            }
        };

        self.audit
            .record_best_effort(WORKFLOW_SEND_TEXT, Some(recipient), AuditOutcome::Success, None, None)
            .await;

        let mut record = NewMessage::outbound(recipient, "text", SOURCE_MANUAL_UI);
        record.body = Some(body.to_string());
        record.meta_id = Some(meta_id.clone());

        let (message, warning) = self
            .record_sent(record, "Message sent but failed to record locally")
            .await;
        Ok(SendOutcome {
            message,
            meta_id,
            warning,
        })
    }

    pub async fn send_image(
        &self,
        recipient: &str,
        media_url: &str,
        caption: Option<&str>,
    ) -> Result<SendOutcome> {
        if recipient.is_empty() || media_url.is_empty() {
            return Err(Error::BadRequest(
                "Missing required fields: recipient and media_url".to_string(),
            ));
        }
        match Url::parse(media_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => {
                return Err(Error::BadRequestDetailed {
                    error: "invalid_media_url",
                    message: "media_url must be an HTTP or HTTPS link",
                });
            }
        }
        if let Some(caption) = caption {
            if caption.chars().count() > MAX_CAPTION_LENGTH {
                return Err(Error::BadRequest(format!(
                    "Caption exceeds maximum length of {MAX_CAPTION_LENGTH} characters"
                )));
            }
        }

        let contact = self.require_contact(WORKFLOW_SEND_IMAGE, recipient).await?;
        self.require_open_window(WORKFLOW_SEND_IMAGE, &contact).await?;

        let media_id = match self.provider.upload_media_from_url(media_url).await {
            Ok(media_id) => media_id,
            Err(err) => {
                self.record_failure(WORKFLOW_SEND_IMAGE, recipient, err.detail())
                    .await;
                return Err(Error::MediaUpload(err));
            }
        };

        let meta_id = match self
            .provider
            .send_image(recipient, &media_id, caption.map(str::to_string))
            .await
        {
            Ok(meta_id) => meta_id,
            Err(err) => {
                return Err(self
                    .provider_failure(WORKFLOW_SEND_IMAGE, recipient, err, "Failed to send image")
                    .await)
            }
        };

        self.audit
            .record_best_effort(WORKFLOW_SEND_IMAGE, Some(recipient), AuditOutcome::Success, None, None)
            .await;

        let mut record = NewMessage::outbound(recipient, "image", SOURCE_MANUAL_UI);
        record.body = caption.map(str::to_string);
        record.media_url = Some(media_url.to_string());
        record.meta_id = Some(meta_id.clone());

        let (message, warning) = self
            .record_sent(record, "Image sent but failed to record locally")
            .await;
        Ok(SendOutcome {
            message,
            meta_id,
            warning,
        })
    }

    /// Template sends skip the session window gate; that is what templates
    /// are for. The recipient contact is created on the fly when unknown.
    pub async fn send_template(
        &self,
        recipient: &str,
        template_name: &str,
        language_code: &str,
        components: &[TemplateComponentPayload],
    ) -> Result<TemplateSendOutcome> {
        if recipient.is_empty() || template_name.is_empty() || language_code.is_empty() {
            return Err(Error::BadRequest(
                "Missing required fields: recipient, template_name, and language_code".to_string(),
            ));
        }
        if !is_valid_template_name(template_name) {
            self.record_failure(
                WORKFLOW_SEND_TEMPLATE,
                recipient,
                format!("Template '{template_name}': Invalid template name format"),
            )
            .await;
            return Err(Error::BadRequest(
                "Invalid template name format. Use lowercase letters, numbers, and underscores only."
                    .to_string(),
            ));
        }

        let display = match self.templates.find(template_name, language_code).await {
            Some(template) => build_display_text(
                &template,
                &component_parameters(components, "header"),
                &component_parameters(components, "body"),
            ),
            None => format!("Template: {template_name}"),
        };

        if let Err(err) = self.store.ensure_contact(recipient).await {
            tracing::warn!("Could not ensure contact {} before template send: {}", recipient, err);
        }

        let meta_id = match self
            .provider
            .send_template(recipient, template_name, language_code, components)
            .await
        {
            Ok(meta_id) => meta_id,
            Err(err) => return Err(self.template_failure(recipient, template_name, err).await),
        };

        self.audit
            .record_best_effort(
                WORKFLOW_SEND_TEMPLATE,
                Some(recipient),
                AuditOutcome::Success,
                None,
                self.template_cost,
            )
            .await;

        let mut record = NewMessage::outbound(recipient, "template", SOURCE_MANUAL_UI);
        record.body = Some(display.clone());
        record.meta_id = Some(meta_id.clone());

        let (message, warning) = self
            .record_sent(record, "Template sent but failed to record locally")
            .await;
        Ok(TemplateSendOutcome {
            message,
            meta_id,
            template_name: template_name.to_string(),
            template_body: display,
            warning,
        })
    }

    async fn require_contact(&self, workflow: &'static str, recipient: &str) -> Result<Contact> {
        match self.store.get_contact(recipient).await? {
            Some(contact) => Ok(contact),
            None => {
                self.record_failure(workflow, recipient, "Contact not found".to_string())
                    .await;
                Err(Error::ContactNotFound)
            }
        }
    }

    async fn require_open_window(&self, workflow: &'static str, contact: &Contact) -> Result<()> {
        let window = session_window::evaluate(contact.last_interaction_at, self.clock.now());
        if window.is_active {
            return Ok(());
        }
        self.record_failure(
            workflow,
            &contact.phone_number,
            "Session window expired".to_string(),
        )
        .await;
        Err(Error::SessionExpired {
            last_interaction_at: contact.last_interaction_at,
            meta_error: None,
        })
    }

    /// Maps a provider rejection of a free-form send. A window-closed code
    /// means our local state was stale, so the contact is flagged expired
    /// before the error is surfaced.
    async fn provider_failure(
        &self,
        workflow: &'static str,
        recipient: &str,
        err: MetaApiError,
        context: &'static str,
    ) -> Error {
        if err.is_session_window_closed() {
            if let Err(db_err) = self.store.mark_contact_expired(recipient).await {
                tracing::warn!(
                    "Could not flag contact {} expired after provider rejection: {}",
                    recipient,
                    db_err
                );
            }
            self.record_failure(workflow, recipient, err.detail()).await;
            return Error::SessionExpired {
                last_interaction_at: None,
                meta_error: Some(err),
            };
        }

        self.record_failure(workflow, recipient, err.detail()).await;
        Error::Provider {
            context,
            source: err,
        }
    }

    async fn template_failure(&self, recipient: &str, name: &str, err: MetaApiError) -> Error {
        self.record_failure(
            WORKFLOW_SEND_TEMPLATE,
            recipient,
            format!("Template '{}': {}", name, err.detail()),
        )
        .await;
        match err.code {
            CODE_TEMPLATE_NOT_FOUND => Error::TemplateNotFound(name.to_string(), err),
            CODE_TEMPLATE_PARAM_MISMATCH => Error::TemplateParamMismatch(name.to_string(), err),
            CODE_TEMPLATE_PAUSED => Error::TemplatePaused(name.to_string(), err),
            _ => Error::Provider {
                context: "Failed to send template message",
                source: err,
            },
        }
    }

    async fn record_failure(
        &self,
        workflow: &'static str,
        recipient: &str,
        detail: impl Into<String>,
    ) {
        self.audit
            .record_best_effort(
                workflow,
                Some(recipient),
                AuditOutcome::Failed,
                Some(detail.into()),
                None,
            )
            .await;
    }

    /// The provider already accepted the message at this point, so a local
    /// write failure downgrades to a warning instead of failing the send.
    async fn record_sent(
        &self,
        record: NewMessage,
        warning: &'static str,
    ) -> (Option<Message>, Option<&'static str>) {
        match self.store.insert_message(record).await {
            Ok(stored) => (Some(stored), None),
            Err(err) => {
                tracing::warn!("{}: {}", warning, err);
                (None, Some(warning))
            }
        }
    }
}

fn is_valid_template_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation_log::{AutomationLog, CreateAutomationLog};
    use crate::models::template::{MessageTemplate, TemplateComponent};
    use crate::services::meta_service::{MockWhatsappApi, CODE_SESSION_WINDOW_CLOSED};
    use crate::services::store::MockStoreGateway;
    use crate::utils::time::ManualClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    const RECIPIENT: &str = "972501234567";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn contact_with_last_interaction(last: Option<DateTime<Utc>>) -> Contact {
        Contact {
            phone_number: RECIPIENT.to_string(),
            profile_name: None,
            last_interaction_at: last,
            session_status: if last.is_some() { "active" } else { "expired" }.to_string(),
            unread_count: 0,
            created_at: now() - Duration::days(30),
        }
    }

    fn stored_message(record: &NewMessage) -> Message {
        Message {
            id: Uuid::new_v4(),
            contact_phone: record.contact_phone.clone(),
            direction: record.direction.clone(),
            message_type: record.message_type.clone(),
            body: record.body.clone(),
            media_url: record.media_url.clone(),
            meta_id: record.meta_id.clone(),
            status: record.status.clone(),
            source: record.source.clone(),
            created_at: now(),
        }
    }

    fn stored_log(entry: &CreateAutomationLog) -> AutomationLog {
        AutomationLog {
            id: Uuid::new_v4(),
            workflow_name: entry.workflow_name.clone(),
            contact_phone: entry.contact_phone.clone(),
            status: entry.status.clone(),
            error_detail: entry.error_detail.clone(),
            cost_estimate: entry.cost_estimate,
            executed_at: now(),
        }
    }

    fn meta_error(code: i64, message: &str) -> MetaApiError {
        MetaApiError {
            message: message.to_string(),
            error_type: "OAuthException".to_string(),
            code,
            error_subcode: None,
            fbtrace_id: None,
        }
    }

    fn service(
        store: MockStoreGateway,
        provider: MockWhatsappApi,
        waba_id: Option<String>,
        template_cost: Option<Decimal>,
    ) -> SendService {
        let store: Arc<dyn StoreGateway> = Arc::new(store);
        let provider: Arc<dyn WhatsappApi> = Arc::new(provider);
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(now()));
        let templates = TemplateService::new(provider.clone(), clock.clone(), waba_id);
        let audit = AuditService::new(store.clone());
        SendService::new(store, provider, templates, audit, clock, template_cost)
    }

    #[tokio::test]
    async fn text_send_records_message_and_success_audit() {
        let mut store = MockStoreGateway::new();
        store
            .expect_get_contact()
            .returning(|_| Ok(Some(contact_with_last_interaction(Some(now() - Duration::hours(2))))));
        store
            .expect_insert_automation_log()
            .withf(|entry| {
                entry.workflow_name == WORKFLOW_SEND_TEXT
                    && entry.status == "success"
                    && entry.contact_phone.as_deref() == Some(RECIPIENT)
            })
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));
        store
            .expect_insert_message()
            .withf(|record| {
                record.message_type == "text"
                    && record.body.as_deref() == Some("hello")
                    && record.meta_id.as_deref() == Some("wamid.1")
                    && record.source == SOURCE_MANUAL_UI
            })
            .returning(|record| Ok(stored_message(&record)));

        let mut provider = MockWhatsappApi::new();
        provider
            .expect_send_text()
            .withf(|to, body| to == RECIPIENT && body == "hello")
            .times(1)
            .returning(|_, _| Ok("wamid.1".to_string()));

        let svc = service(store, provider, None, None);
        let outcome = svc.send_text(RECIPIENT, "hello").await.unwrap();
        assert_eq!(outcome.meta_id, "wamid.1");
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.message.unwrap().status, "sent");
    }

    #[tokio::test]
    async fn text_send_rejects_oversized_body_before_any_io() {
        let svc = service(MockStoreGateway::new(), MockWhatsappApi::new(), None, None);
        let body = "x".repeat(MAX_TEXT_LENGTH + 1);
        let err = svc.send_text(RECIPIENT, &body).await.unwrap_err();
        match err {
            Error::BadRequest(msg) => {
                assert_eq!(msg, "Message body exceeds maximum length of 4096 characters")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_send_requires_recipient_and_body() {
        let svc = service(MockStoreGateway::new(), MockWhatsappApi::new(), None, None);
        let err = svc.send_text("", "hello").await.unwrap_err();
        match err {
            Error::BadRequest(msg) => {
                assert_eq!(msg, "Missing required fields: recipient and body")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_window_blocks_send_and_audits_failure() {
        let last = now() - Duration::hours(25);
        let mut store = MockStoreGateway::new();
        store
            .expect_get_contact()
            .returning(move |_| Ok(Some(contact_with_last_interaction(Some(last)))));
        store
            .expect_insert_automation_log()
            .withf(|entry| {
                entry.status == "failed"
                    && entry.error_detail.as_deref() == Some("Session window expired")
            })
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));

        // No provider expectations: reaching the provider would panic.
        let svc = service(store, MockWhatsappApi::new(), None, None);
        let err = svc.send_text(RECIPIENT, "hello").await.unwrap_err();
        match err {
            Error::SessionExpired {
                last_interaction_at,
                meta_error,
            } => {
                assert_eq!(last_interaction_at, Some(last));
                assert!(meta_error.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_contact_blocks_send_and_audits_failure() {
        let mut store = MockStoreGateway::new();
        store.expect_get_contact().returning(|_| Ok(None));
        store
            .expect_insert_automation_log()
            .withf(|entry| {
                entry.status == "failed"
                    && entry.error_detail.as_deref() == Some("Contact not found")
            })
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));

        let svc = service(store, MockWhatsappApi::new(), None, None);
        let err = svc.send_text(RECIPIENT, "hello").await.unwrap_err();
        assert!(matches!(err, Error::ContactNotFound));
    }

    #[tokio::test]
    async fn provider_window_rejection_flags_contact_expired() {
        let mut store = MockStoreGateway::new();
        store
            .expect_get_contact()
            .returning(|_| Ok(Some(contact_with_last_interaction(Some(now() - Duration::hours(1))))));
        store
            .expect_mark_contact_expired()
            .withf(|phone| phone == RECIPIENT)
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_insert_automation_log()
            .withf(|entry| {
                entry.status == "failed"
                    && entry
                        .error_detail
                        .as_deref()
                        .is_some_and(|d| d.contains("131047"))
            })
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));

        let mut provider = MockWhatsappApi::new();
        provider.expect_send_text().returning(|_, _| {
            Err(meta_error(
                CODE_SESSION_WINDOW_CLOSED,
                "Re-engagement message",
            ))
        });

        let svc = service(store, provider, None, None);
        let err = svc.send_text(RECIPIENT, "hello").await.unwrap_err();
        match err {
            Error::SessionExpired {
                last_interaction_at,
                meta_error,
            } => {
                assert!(last_interaction_at.is_none());
                assert_eq!(meta_error.unwrap().code, CODE_SESSION_WINDOW_CLOSED);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_record_failure_downgrades_to_warning() {
        let mut store = MockStoreGateway::new();
        store
            .expect_get_contact()
            .returning(|_| Ok(Some(contact_with_last_interaction(Some(now() - Duration::hours(1))))));
        store
            .expect_insert_automation_log()
            .returning(|entry| Ok(stored_log(&entry)));
        store
            .expect_insert_message()
            .times(1)
            .returning(|_| Err(Error::Internal("insert failed".to_string())));

        let mut provider = MockWhatsappApi::new();
        provider
            .expect_send_text()
            .times(1)
            .returning(|_, _| Ok("wamid.2".to_string()));

        let svc = service(store, provider, None, None);
        let outcome = svc.send_text(RECIPIENT, "hello").await.unwrap();
        assert_eq!(outcome.meta_id, "wamid.2");
        assert!(outcome.message.is_none());
        assert_eq!(
            outcome.warning,
            Some("Message sent but failed to record locally")
        );
    }

    #[tokio::test]
    async fn image_send_uploads_media_first() {
        let mut store = MockStoreGateway::new();
        store
            .expect_get_contact()
            .returning(|_| Ok(Some(contact_with_last_interaction(Some(now() - Duration::hours(1))))));
        store
            .expect_insert_automation_log()
            .returning(|entry| Ok(stored_log(&entry)));
        store
            .expect_insert_message()
            .withf(|record| {
                record.message_type == "image"
                    && record.body.as_deref() == Some("look at this")
                    && record.media_url.as_deref() == Some("https://cdn.example.com/pic.png")
            })
            .returning(|record| Ok(stored_message(&record)));

        let mut provider = MockWhatsappApi::new();
        provider
            .expect_upload_media_from_url()
            .withf(|url| url == "https://cdn.example.com/pic.png")
            .times(1)
            .returning(|_| Ok("media-42".to_string()));
        provider
            .expect_send_image()
            .withf(|to, media_id, caption| {
                to == RECIPIENT
                    && media_id == "media-42"
                    && caption.as_deref() == Some("look at this")
            })
            .times(1)
            .returning(|_, _, _| Ok("wamid.3".to_string()));

        let svc = service(store, provider, None, None);
        let outcome = svc
            .send_image(RECIPIENT, "https://cdn.example.com/pic.png", Some("look at this"))
            .await
            .unwrap();
        assert_eq!(outcome.meta_id, "wamid.3");
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn image_send_rejects_non_http_media_url() {
        let svc = service(MockStoreGateway::new(), MockWhatsappApi::new(), None, None);
        let err = svc
            .send_image(RECIPIENT, "ftp://cdn.example.com/pic.png", None)
            .await
            .unwrap_err();
        match err {
            Error::BadRequestDetailed { error, .. } => assert_eq!(error, "invalid_media_url"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn image_upload_failure_audits_and_maps() {
        let mut store = MockStoreGateway::new();
        store
            .expect_get_contact()
            .returning(|_| Ok(Some(contact_with_last_interaction(Some(now() - Duration::hours(1))))));
        store
            .expect_insert_automation_log()
            .withf(|entry| entry.status == "failed")
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));

        let mut provider = MockWhatsappApi::new();
        provider
            .expect_upload_media_from_url()
            .returning(|_| Err(MetaApiError::transport("Failed to upload to Meta")));

        let svc = service(store, provider, None, None);
        let err = svc
            .send_image(RECIPIENT, "https://cdn.example.com/pic.png", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MediaUpload(_)));
    }

    #[tokio::test]
    async fn template_send_skips_window_gate_and_renders_body() {
        let template = MessageTemplate {
            id: "1".to_string(),
            name: "order_update".to_string(),
            language: "en".to_string(),
            status: "APPROVED".to_string(),
            category: "UTILITY".to_string(),
            components: Some(vec![TemplateComponent {
                component_type: "BODY".to_string(),
                format: None,
                text: Some("Your order {{1}} has shipped.".to_string()),
                example: None,
                buttons: None,
            }]),
        };

        let mut store = MockStoreGateway::new();
        store
            .expect_ensure_contact()
            .withf(|phone| phone == RECIPIENT)
            .times(1)
            .returning(|_| Ok(contact_with_last_interaction(None)));
        store
            .expect_insert_automation_log()
            .withf(|entry| {
                entry.status == "success" && entry.cost_estimate == Some(Decimal::new(5, 2))
            })
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));
        store
            .expect_insert_message()
            .withf(|record| {
                record.message_type == "template"
                    && record.body.as_deref() == Some("Your order A-17 has shipped.")
            })
            .returning(|record| Ok(stored_message(&record)));

        let mut provider = MockWhatsappApi::new();
        provider
            .expect_fetch_templates()
            .returning(move || Ok(vec![template.clone()]));
        provider
            .expect_send_template()
            .withf(|to, name, language, components| {
                to == RECIPIENT
                    && name == "order_update"
                    && language == "en"
                    && components.len() == 1
            })
            .times(1)
            .returning(|_, _, _, _| Ok("wamid.4".to_string()));

        let components = vec![TemplateComponentPayload {
            component_type: "body".to_string(),
            sub_type: None,
            index: None,
            parameters: Some(vec![json!({"type": "text", "text": "A-17"})]),
        }];

        let svc = service(
            store,
            provider,
            Some("waba-1".to_string()),
            Some(Decimal::new(5, 2)),
        );
        let outcome = svc
            .send_template(RECIPIENT, "order_update", "en", &components)
            .await
            .unwrap();
        assert_eq!(outcome.meta_id, "wamid.4");
        assert_eq!(outcome.template_name, "order_update");
        assert_eq!(outcome.template_body, "Your order A-17 has shipped.");
    }

    #[tokio::test]
    async fn template_name_format_is_validated_and_audited() {
        let mut store = MockStoreGateway::new();
        store
            .expect_insert_automation_log()
            .withf(|entry| {
                entry.status == "failed"
                    && entry
                        .error_detail
                        .as_deref()
                        .is_some_and(|d| d.contains("Bad-Name") && d.contains("Invalid template name format"))
            })
            .times(1)
            .returning(|entry| Ok(stored_log(&entry)));

        let svc = service(store, MockWhatsappApi::new(), None, None);
        let err = svc
            .send_template(RECIPIENT, "Bad-Name", "en", &[])
            .await
            .unwrap_err();
        match err {
            Error::BadRequest(msg) => assert_eq!(
                msg,
                "Invalid template name format. Use lowercase letters, numbers, and underscores only."
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn template_provider_errors_map_by_code() {
        for (code, check) in [
            (CODE_TEMPLATE_NOT_FOUND, 0_u8),
            (CODE_TEMPLATE_PARAM_MISMATCH, 1),
            (CODE_TEMPLATE_PAUSED, 2),
            (99, 3),
        ] {
            let mut store = MockStoreGateway::new();
            store
                .expect_ensure_contact()
                .returning(|_| Ok(contact_with_last_interaction(None)));
            store
                .expect_insert_automation_log()
                .withf(|entry| {
                    entry.status == "failed"
                        && entry
                            .error_detail
                            .as_deref()
                            .is_some_and(|d| d.starts_with("Template 'order_update':"))
                })
                .times(1)
                .returning(|entry| Ok(stored_log(&entry)));

            let mut provider = MockWhatsappApi::new();
            provider
                .expect_send_template()
                .returning(move |_, _, _, _| Err(meta_error(code, "rejected")));

            let svc = service(store, provider, None, None);
            let err = svc
                .send_template(RECIPIENT, "order_update", "en", &[])
                .await
                .unwrap_err();
            match (check, err) {
                (0, Error::TemplateNotFound(name, _)) => assert_eq!(name, "order_update"),
                (1, Error::TemplateParamMismatch(name, _)) => assert_eq!(name, "order_update"),
                (2, Error::TemplatePaused(name, _)) => assert_eq!(name, "order_update"),
                (3, Error::Provider { context, .. }) => {
                    assert_eq!(context, "Failed to send template message")
                }
                (_, other) => panic!("unexpected mapping for code {code}: {other:?}"),
            }
        }
    }
}
