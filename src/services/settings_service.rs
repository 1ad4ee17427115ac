use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::services::audit_service::{AuditOutcome, AuditService};
use crate::services::meta_service::WhatsappApi;
use crate::services::store::StoreGateway;
use crate::utils::phone::is_valid_e164_plus;

pub const SETTING_ADMIN_PHONE: &str = "admin_phone";
pub const SETTING_NOTIFICATION_ENABLED: &str = "notification_enabled";

/// Workflow name on audit rows written by the notification test.
pub const WORKFLOW_TEST_NOTIFICATION: &str = "test_notification";

pub const TEST_NOTIFICATION_BODY: &str = "\u{1F514} Test Notification\n\nThis is a test notification from your WhatsApp Interface. If you received this message, admin notifications are working correctly!";

/// Key-value settings folded into the shape the console works with.
/// An empty stored admin phone reads back as unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    pub admin_phone: Option<String>,
    pub notification_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub admin_phone: Option<String>,
    pub notification_enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct TestNotificationReceipt {
    pub message_id: String,
    pub recipient: String,
}

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn StoreGateway>,
    provider: Arc<dyn WhatsappApi>,
    audit: AuditService,
}

impl SettingsService {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        provider: Arc<dyn WhatsappApi>,
        audit: AuditService,
    ) -> Self {
        Self {
            store,
            provider,
            audit,
        }
    }

    pub async fn get(&self) -> Result<SettingsView> {
        let settings = self.store.list_settings().await?;

        let value_of = |key: &str| {
            settings
                .iter()
                .find(|setting| setting.key == key)
                .map(|setting| setting.value.clone())
        };

        Ok(SettingsView {
            admin_phone: value_of(SETTING_ADMIN_PHONE).filter(|value| !value.is_empty()),
            notification_enabled: value_of(SETTING_NOTIFICATION_ENABLED).as_deref() == Some("true"),
        })
    }

    /// Writes the provided fields. An empty admin phone clears the number;
    /// a non-empty one must be in plus-prefixed E.164 form.
    pub async fn update(&self, update: SettingsUpdate) -> Result<SettingsView> {
        if update.admin_phone.is_none() && update.notification_enabled.is_none() {
            return Err(Error::BadRequest(
                "No settings provided to update".to_string(),
            ));
        }

        if let Some(phone) = &update.admin_phone {
            if !phone.is_empty() && !is_valid_e164_plus(phone) {
                return Err(Error::BadRequestDetailed {
                    error: "Invalid phone format",
                    message: "Phone number must be in E.164 format (e.g., +972501234567)",
                });
            }
            self.store.upsert_setting(SETTING_ADMIN_PHONE, phone).await?;
        }

        if let Some(enabled) = update.notification_enabled {
            self.store
                .upsert_setting(
                    SETTING_NOTIFICATION_ENABLED,
                    if enabled { "true" } else { "false" },
                )
                .await?;
        }

        self.get().await
    }

    /// Sends the canned test message to the configured admin phone. No
    /// message row is written; only the audit trail records the attempt.
    pub async fn send_test_notification(&self) -> Result<TestNotificationReceipt> {
        let admin_phone = self
            .store
            .get_setting(SETTING_ADMIN_PHONE)
            .await?
            .map(|setting| setting.value)
            .filter(|value| !value.is_empty())
            .ok_or(Error::BadRequestDetailed {
                error: "Admin phone not configured",
                message: "Please save an admin phone number first",
            })?;

        let enabled = self
            .store
            .get_setting(SETTING_NOTIFICATION_ENABLED)
            .await?
            .is_some_and(|setting| setting.value == "true");
        if !enabled {
            return Err(Error::BadRequestDetailed {
                error: "Notifications disabled",
                message: "Please enable notifications before testing",
            });
        }

        match self
            .provider
            .send_text(&admin_phone, TEST_NOTIFICATION_BODY)
            .await
        {
            Ok(message_id) => {
                self.audit
                    .record_best_effort(
                        WORKFLOW_TEST_NOTIFICATION,
                        Some(&admin_phone),
                        AuditOutcome::Success,
                        None,
                        None,
                    )
                    .await;
                Ok(TestNotificationReceipt {
                    message_id,
                    recipient: admin_phone,
                })
            }
            Err(err) => {
                self.audit
                    .record_best_effort(
                        WORKFLOW_TEST_NOTIFICATION,
                        Some(&admin_phone),
                        AuditOutcome::Failed,
                        Some(err.detail()),
                        None,
                    )
                    .await;
                Err(Error::NotificationSend(err))
            }
        }
    }
}
