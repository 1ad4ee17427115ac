use serde::{Deserialize, Serialize};

use crate::services::settings_service::{SettingsUpdate, SettingsView, TestNotificationReceipt};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UpdateSettingsPayload {
    pub admin_phone: Option<String>,
    pub notification_enabled: Option<bool>,
}

impl From<UpdateSettingsPayload> for SettingsUpdate {
    fn from(payload: UpdateSettingsPayload) -> Self {
        Self {
            admin_phone: payload.admin_phone,
            notification_enabled: payload.notification_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateSettingsResponse {
    pub success: bool,
    pub settings: SettingsView,
}

#[derive(Debug, Serialize)]
pub struct TestNotificationResponse {
    pub success: bool,
    pub message: &'static str,
    pub message_id: String,
    pub recipient: String,
}

impl From<TestNotificationReceipt> for TestNotificationResponse {
    fn from(receipt: TestNotificationReceipt) -> Self {
        Self {
            success: true,
            message: "Test notification sent successfully",
            message_id: receipt.message_id,
            recipient: receipt.recipient,
        }
    }
}
