//! Materialized views over the change feed, mirroring what the web
//! console renders: one conversation, the contact sidebar, and the
//! activity feed. Events arrive at-least-once, so every view
//! de-duplicates by primary key before mutating its state.

use crate::models::automation_log::AutomationLog;
use crate::models::contact::Contact;
use crate::models::message::Message;
use crate::realtime::{ChangeEvent, ChangeKind, ChangeRow};

pub const MAX_ACTIVITY_ROWS: usize = 50;

/// Optimistic entry shown while a send is in flight, keyed by a
/// client-generated correlation id. The server never learns the id; the
/// entry is resolved when the send response (or its feed event) delivers
/// the canonical row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub message_type: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
}

/// One contact's message history plus the in-flight overlay.
#[derive(Debug, Default)]
pub struct ConversationView {
    contact_phone: String,
    messages: Vec<Message>,
    pending: Vec<(String, PendingSend)>,
}

impl ConversationView {
    pub fn new(contact_phone: impl Into<String>) -> Self {
        Self {
            contact_phone: contact_phone.into(),
            messages: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn with_history(contact_phone: impl Into<String>, messages: Vec<Message>) -> Self {
        let mut view = Self::new(contact_phone);
        for message in messages {
            view.insert_message(message);
        }
        view
    }

    pub fn apply(&mut self, event: &ChangeEvent) {
        let ChangeRow::Message(message) = &event.new else {
            return;
        };
        if message.contact_phone != self.contact_phone {
            return;
        }
        match event.kind {
            ChangeKind::Insert => self.insert_message(message.clone()),
            ChangeKind::Update => {
                if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
                    *existing = message.clone();
                }
            }
        }
    }

    pub fn begin_send(&mut self, correlation_id: impl Into<String>, entry: PendingSend) {
        let correlation_id = correlation_id.into();
        if self.pending.iter().any(|(id, _)| *id == correlation_id) {
            return;
        }
        self.pending.push((correlation_id, entry));
    }

    /// Server response arrived: drop the overlay entry and adopt the
    /// canonical row. Safe to call after the feed already delivered it.
    pub fn resolve_send(&mut self, correlation_id: &str, row: Message) {
        self.pending.retain(|(id, _)| id != correlation_id);
        if row.contact_phone == self.contact_phone {
            self.insert_message(row);
        }
    }

    /// Send failed before a canonical row existed.
    pub fn abandon_send(&mut self, correlation_id: &str) -> Option<PendingSend> {
        let position = self.pending.iter().position(|(id, _)| id == correlation_id)?;
        Some(self.pending.remove(position).1)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> &[(String, PendingSend)] {
        &self.pending
    }

    fn insert_message(&mut self, message: Message) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        self.messages.push(message);
        self.messages.sort_by_key(|m| m.created_at);
    }
}

/// Contact sidebar: most recently active first, contacts with no
/// interaction yet at the bottom.
#[derive(Debug, Default)]
pub struct ContactListView {
    contacts: Vec<Contact>,
}

impl ContactListView {
    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        let mut view = Self::default();
        for contact in contacts {
            view.upsert(contact);
        }
        view
    }

    pub fn apply(&mut self, event: &ChangeEvent) {
        let ChangeRow::Contact(contact) = &event.new else {
            return;
        };
        match event.kind {
            ChangeKind::Insert => {
                if self
                    .contacts
                    .iter()
                    .any(|c| c.phone_number == contact.phone_number)
                {
                    return;
                }
                self.upsert(contact.clone());
            }
            ChangeKind::Update => {
                if let Some(existing) = self
                    .contacts
                    .iter_mut()
                    .find(|c| c.phone_number == contact.phone_number)
                {
                    *existing = contact.clone();
                    self.resort();
                }
            }
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn upsert(&mut self, contact: Contact) {
        self.contacts.push(contact);
        self.resort();
    }

    fn resort(&mut self) {
        self.contacts.sort_by_key(|c| {
            std::cmp::Reverse(
                c.last_interaction_at
                    .map(|t| t.timestamp_millis())
                    .unwrap_or(0),
            )
        });
    }
}

/// Rolling window of the newest automation log rows.
#[derive(Debug, Default)]
pub struct ActivityFeedView {
    logs: Vec<AutomationLog>,
}

impl ActivityFeedView {
    pub fn with_logs(logs: Vec<AutomationLog>) -> Self {
        let mut view = Self::default();
        for log in logs.into_iter().rev() {
            view.prepend(log);
        }
        view
    }

    pub fn apply(&mut self, event: &ChangeEvent) {
        let ChangeRow::AutomationLog(log) = &event.new else {
            return;
        };
        self.prepend(log.clone());
    }

    pub fn logs(&self) -> &[AutomationLog] {
        &self.logs
    }

    fn prepend(&mut self, log: AutomationLog) {
        if self.logs.iter().any(|l| l.id == log.id) {
            return;
        }
        self.logs.insert(0, log);
        self.logs.truncate(MAX_ACTIVITY_ROWS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn message(phone: &str, minutes: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            contact_phone: phone.to_string(),
            direction: "outbound".to_string(),
            message_type: "text".to_string(),
            body: Some("hi".to_string()),
            media_url: None,
            meta_id: None,
            status: "sent".to_string(),
            source: "manual_ui".to_string(),
            created_at: base_time() + Duration::minutes(minutes),
        }
    }

    fn contact(phone: &str, minutes_ago: Option<i64>) -> Contact {
        Contact {
            phone_number: phone.to_string(),
            profile_name: None,
            last_interaction_at: minutes_ago.map(|m| base_time() - Duration::minutes(m)),
            session_status: "active".to_string(),
            unread_count: 0,
            created_at: base_time(),
        }
    }

    fn log_row(minutes: i64) -> AutomationLog {
        AutomationLog {
            id: Uuid::new_v4(),
            workflow_name: "ui_send_message".to_string(),
            contact_phone: Some("972501234567".to_string()),
            status: "success".to_string(),
            error_detail: None,
            cost_estimate: None,
            executed_at: base_time() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn conversation_orders_by_created_at_and_dedups() {
        let mut view = ConversationView::new("972501234567");
        let late = message("972501234567", 10);
        let early = message("972501234567", 1);

        view.apply(&ChangeEvent::message(ChangeKind::Insert, late.clone()));
        view.apply(&ChangeEvent::message(ChangeKind::Insert, early.clone()));
        view.apply(&ChangeEvent::message(ChangeKind::Insert, late.clone()));

        let ids: Vec<_> = view.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn conversation_ignores_other_contacts() {
        let mut view = ConversationView::new("972501234567");
        view.apply(&ChangeEvent::message(
            ChangeKind::Insert,
            message("15550100100", 1),
        ));
        assert!(view.messages().is_empty());
    }

    #[test]
    fn conversation_update_replaces_row_in_place() {
        let mut view = ConversationView::new("972501234567");
        let mut row = message("972501234567", 1);
        view.apply(&ChangeEvent::message(ChangeKind::Insert, row.clone()));

        row.status = "read".to_string();
        view.apply(&ChangeEvent::message(ChangeKind::Update, row.clone()));

        assert_eq!(view.messages()[0].status, "read");
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn conversation_update_for_unknown_row_is_ignored() {
        let mut view = ConversationView::new("972501234567");
        view.apply(&ChangeEvent::message(
            ChangeKind::Update,
            message("972501234567", 1),
        ));
        assert!(view.messages().is_empty());
    }

    #[test]
    fn pending_overlay_resolves_against_canonical_row() {
        let mut view = ConversationView::new("972501234567");
        view.begin_send(
            "corr-1",
            PendingSend {
                message_type: "text".to_string(),
                body: Some("hi".to_string()),
                media_url: None,
            },
        );
        assert_eq!(view.pending().len(), 1);

        let row = message("972501234567", 1);
        // Feed may deliver the row before the send response returns.
        view.apply(&ChangeEvent::message(ChangeKind::Insert, row.clone()));
        view.resolve_send("corr-1", row);

        assert!(view.pending().is_empty());
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn pending_overlay_abandons_failed_sends() {
        let mut view = ConversationView::new("972501234567");
        view.begin_send(
            "corr-1",
            PendingSend {
                message_type: "text".to_string(),
                body: Some("hi".to_string()),
                media_url: None,
            },
        );
        assert!(view.abandon_send("corr-1").is_some());
        assert!(view.pending().is_empty());
        assert!(view.abandon_send("corr-1").is_none());
    }

    #[test]
    fn contacts_sort_recent_first_with_missing_timestamps_last() {
        let mut view = ContactListView::default();
        view.apply(&ChangeEvent::contact(ChangeKind::Insert, contact("100", None)));
        view.apply(&ChangeEvent::contact(ChangeKind::Insert, contact("200", Some(60))));
        view.apply(&ChangeEvent::contact(ChangeKind::Insert, contact("300", Some(5))));

        let phones: Vec<_> = view.contacts().iter().map(|c| c.phone_number.as_str()).collect();
        assert_eq!(phones, vec!["300", "200", "100"]);
    }

    #[test]
    fn contact_update_resorts_the_list() {
        let mut view = ContactListView::with_contacts(vec![
            contact("100", Some(60)),
            contact("200", Some(5)),
        ]);

        let mut bumped = contact("100", Some(0));
        bumped.unread_count = 2;
        view.apply(&ChangeEvent::contact(ChangeKind::Update, bumped));

        assert_eq!(view.contacts()[0].phone_number, "100");
        assert_eq!(view.contacts()[0].unread_count, 2);
    }

    #[test]
    fn duplicate_contact_insert_is_ignored() {
        let mut view = ContactListView::default();
        view.apply(&ChangeEvent::contact(ChangeKind::Insert, contact("100", Some(1))));
        view.apply(&ChangeEvent::contact(ChangeKind::Insert, contact("100", Some(2))));
        assert_eq!(view.contacts().len(), 1);
    }

    #[test]
    fn activity_feed_prepends_newest_and_caps_length() {
        let mut view = ActivityFeedView::default();
        for i in 0..(MAX_ACTIVITY_ROWS as i64 + 5) {
            view.apply(&ChangeEvent::automation_log(log_row(i)));
        }
        assert_eq!(view.logs().len(), MAX_ACTIVITY_ROWS);

        let newest = log_row(1000);
        view.apply(&ChangeEvent::automation_log(newest.clone()));
        assert_eq!(view.logs()[0].id, newest.id);
    }

    #[test]
    fn activity_feed_dedups_by_id() {
        let mut view = ActivityFeedView::default();
        let row = log_row(1);
        view.apply(&ChangeEvent::automation_log(row.clone()));
        view.apply(&ChangeEvent::automation_log(row));
        assert_eq!(view.logs().len(), 1);
    }
}
