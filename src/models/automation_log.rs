use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only send audit row. One per attempt, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AutomationLog {
    pub id: Uuid,
    pub workflow_name: String,
    pub contact_phone: Option<String>,
    pub status: String,
    pub error_detail: Option<String>,
    pub cost_estimate: Option<Decimal>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAutomationLog {
    pub workflow_name: String,
    pub contact_phone: Option<String>,
    pub status: String,
    pub error_detail: Option<String>,
    pub cost_estimate: Option<Decimal>,
}
