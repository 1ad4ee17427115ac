use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::automation_log::{AutomationLog, CreateAutomationLog};
use crate::services::store::StoreGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failed => "failed",
        }
    }
}

/// Writes the append-only send trail. One row per attempt.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn StoreGateway>,
}

impl AuditService {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        workflow_name: &str,
        contact_phone: Option<&str>,
        outcome: AuditOutcome,
        error_detail: Option<String>,
        cost_estimate: Option<Decimal>,
    ) -> Result<AutomationLog> {
        self.store
            .insert_automation_log(CreateAutomationLog {
                workflow_name: workflow_name.to_string(),
                contact_phone: contact_phone.map(str::to_string),
                status: outcome.as_str().to_string(),
                error_detail,
                cost_estimate,
            })
            .await
    }

    /// Audit writes must never change the outcome the caller reports.
    /// Failures are noted for operators and swallowed.
    pub async fn record_best_effort(
        &self,
        workflow_name: &str,
        contact_phone: Option<&str>,
        outcome: AuditOutcome,
        error_detail: Option<String>,
        cost_estimate: Option<Decimal>,
    ) {
        if let Err(err) = self
            .record(workflow_name, contact_phone, outcome, error_detail, cost_estimate)
            .await
        {
            tracing::warn!(
                "Audit log write failed for workflow '{}': {}",
                workflow_name,
                err
            );
        }
    }
}
