use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::automation_log::{AutomationLog, CreateAutomationLog};
use crate::models::contact::Contact;
use crate::models::message::{Message, NewMessage};
use crate::models::setting::Setting;
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeKind};

#[derive(Debug, Clone, Serialize)]
pub struct ActivityStats {
    pub messages_24h: i64,
    pub messages_prev_24h: i64,
    pub failed_24h: i64,
    pub error_rate_pct: f64,
    pub cost_month: Decimal,
}

/// Durable-state boundary. Every write that commits also publishes a
/// change event, strictly after the commit, so feed consumers never see
/// a row that later rolled back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn get_contact(&self, phone: &str) -> Result<Option<Contact>>;
    async fn list_contacts(&self) -> Result<Vec<Contact>>;
    /// Creates the contact if missing (`session_status=expired`, zero
    /// unread). A pre-existing row is returned untouched.
    async fn ensure_contact(&self, phone: &str) -> Result<Contact>;
    async fn mark_contact_expired(&self, phone: &str) -> Result<()>;
    /// Flips `active` contacts whose window lapsed at or before
    /// `window_start`. Returns how many rows changed.
    async fn sweep_expired_sessions(&self, window_start: DateTime<Utc>) -> Result<u64>;

    async fn insert_message(&self, message: NewMessage) -> Result<Message>;
    async fn messages_for_contact(&self, phone: &str) -> Result<Vec<Message>>;
    /// Status transition keyed by the provider message id.
    async fn update_message_status(&self, meta_id: &str, status: &str) -> Result<Option<Message>>;
    /// Marks unread inbound messages `read` and zeroes the contact's
    /// unread counter as one transaction. Returns the number of messages
    /// marked.
    async fn mark_contact_messages_read(&self, phone: &str) -> Result<u64>;

    async fn insert_automation_log(&self, entry: CreateAutomationLog) -> Result<AutomationLog>;
    async fn list_automation_logs(
        &self,
        limit: i64,
        status: Option<String>,
    ) -> Result<Vec<AutomationLog>>;
    async fn activity_stats(&self, now: DateTime<Utc>) -> Result<ActivityStats>;

    async fn get_setting(&self, key: &str) -> Result<Option<Setting>>;
    async fn list_settings(&self) -> Result<Vec<Setting>>;
    async fn upsert_setting(&self, key: &str, value: &str) -> Result<Setting>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgStore {
    pub fn new(pool: PgPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }
}

#[async_trait]
impl StoreGateway for PgStore {
    async fn get_contact(&self, phone: &str) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE phone_number = $1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let contacts = sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            ORDER BY last_interaction_at DESC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    async fn ensure_contact(&self, phone: &str) -> Result<Contact> {
        let inserted = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (phone_number, profile_name, session_status, unread_count)
            VALUES ($1, NULL, 'expired', 0)
            ON CONFLICT (phone_number) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(contact) = inserted {
            self.feed
                .publish(ChangeEvent::contact(ChangeKind::Insert, contact.clone()));
            return Ok(contact);
        }

        let existing = sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE phone_number = $1
            "#,
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    async fn mark_contact_expired(&self, phone: &str) -> Result<()> {
        let updated = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET session_status = 'expired'
            WHERE phone_number = $1
            RETURNING *
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(contact) = updated {
            self.feed
                .publish(ChangeEvent::contact(ChangeKind::Update, contact));
        }
        Ok(())
    }

    async fn sweep_expired_sessions(&self, window_start: DateTime<Utc>) -> Result<u64> {
        let flipped = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET session_status = 'expired'
            WHERE session_status = 'active'
              AND (last_interaction_at IS NULL OR last_interaction_at <= $1)
            RETURNING *
            "#,
        )
        .bind(window_start)
        .fetch_all(&self.pool)
        .await?;

        let count = flipped.len() as u64;
        for contact in flipped {
            self.feed
                .publish(ChangeEvent::contact(ChangeKind::Update, contact));
        }
        Ok(count)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message> {
        let inserted = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages
                (contact_phone, direction, message_type, body, media_url, meta_id, status, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&message.contact_phone)
        .bind(&message.direction)
        .bind(&message.message_type)
        .bind(&message.body)
        .bind(&message.media_url)
        .bind(&message.meta_id)
        .bind(&message.status)
        .bind(&message.source)
        .fetch_one(&self.pool)
        .await?;

        self.feed
            .publish(ChangeEvent::message(ChangeKind::Insert, inserted.clone()));
        Ok(inserted)
    }

    async fn messages_for_contact(&self, phone: &str) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE contact_phone = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn update_message_status(&self, meta_id: &str, status: &str) -> Result<Option<Message>> {
        let updated = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET status = $2
            WHERE meta_id = $1
            RETURNING *
            "#,
        )
        .bind(meta_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(message) = &updated {
            self.feed
                .publish(ChangeEvent::message(ChangeKind::Update, message.clone()));
        }
        Ok(updated)
    }

    async fn mark_contact_messages_read(&self, phone: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET status = 'read'
            WHERE contact_phone = $1
              AND direction = 'inbound'
              AND status IN ('pending', 'sent', 'delivered')
            RETURNING *
            "#,
        )
        .bind(phone)
        .fetch_all(&mut *tx)
        .await?;

        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET unread_count = 0
            WHERE phone_number = $1
            RETURNING *
            "#,
        )
        .bind(phone)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        let count = marked.len() as u64;
        for message in marked {
            self.feed
                .publish(ChangeEvent::message(ChangeKind::Update, message));
        }
        if let Some(contact) = contact {
            self.feed
                .publish(ChangeEvent::contact(ChangeKind::Update, contact));
        }
        Ok(count)
    }

    async fn insert_automation_log(&self, entry: CreateAutomationLog) -> Result<AutomationLog> {
        let inserted = sqlx::query_as::<_, AutomationLog>(
            r#"
            INSERT INTO automation_logs
                (workflow_name, contact_phone, status, error_detail, cost_estimate)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&entry.workflow_name)
        .bind(&entry.contact_phone)
        .bind(&entry.status)
        .bind(&entry.error_detail)
        .bind(entry.cost_estimate)
        .fetch_one(&self.pool)
        .await?;

        self.feed
            .publish(ChangeEvent::automation_log(inserted.clone()));
        Ok(inserted)
    }

    async fn list_automation_logs(
        &self,
        limit: i64,
        status: Option<String>,
    ) -> Result<Vec<AutomationLog>> {
        let logs = sqlx::query_as::<_, AutomationLog>(
            r#"
            SELECT * FROM automation_logs
            WHERE ($2::text IS NULL OR status = $2)
            ORDER BY executed_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn activity_stats(&self, now: DateTime<Utc>) -> Result<ActivityStats> {
        let day_ago = now - Duration::hours(24);
        let two_days_ago = now - Duration::hours(48);

        let messages_24h: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM automation_logs
            WHERE executed_at >= $1
            "#,
        )
        .bind(day_ago)
        .fetch_one(&self.pool)
        .await?;

        let messages_prev_24h: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM automation_logs
            WHERE executed_at >= $1 AND executed_at < $2
            "#,
        )
        .bind(two_days_ago)
        .bind(day_ago)
        .fetch_one(&self.pool)
        .await?;

        let failed_24h: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM automation_logs
            WHERE status = 'failed' AND executed_at >= $1
            "#,
        )
        .bind(day_ago)
        .fetch_one(&self.pool)
        .await?;

        let cost_month: (Option<Decimal>,) = sqlx::query_as(
            r#"
            SELECT SUM(cost_estimate) FROM automation_logs
            WHERE executed_at >= date_trunc('month', $1)
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let total = messages_24h.0;
        let error_rate_pct = if total == 0 {
            0.0
        } else {
            failed_24h.0 as f64 * 100.0 / total as f64
        };

        Ok(ActivityStats {
            messages_24h: total,
            messages_prev_24h: messages_prev_24h.0,
            failed_24h: failed_24h.0,
            error_rate_pct,
            cost_month: cost_month.0.unwrap_or_default(),
        })
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            SELECT * FROM settings
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    async fn list_settings(&self) -> Result<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            r#"
            SELECT * FROM settings
            ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<Setting> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(setting)
    }
}
