pub mod projection;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::automation_log::AutomationLog;
use crate::models::contact::Contact;
use crate::models::message::Message;

pub const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChangeRow {
    Contact(Contact),
    Message(Message),
    AutomationLog(AutomationLog),
}

/// Row-level change notification, published by the store after the
/// corresponding write has committed. Consumers receive at-least-once
/// delivery and de-duplicate by primary key.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: &'static str,
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    pub new: ChangeRow,
}

impl ChangeEvent {
    pub fn contact(kind: ChangeKind, row: Contact) -> Self {
        Self {
            table: "contacts",
            kind,
            new: ChangeRow::Contact(row),
        }
    }

    pub fn message(kind: ChangeKind, row: Message) -> Self {
        Self {
            table: "messages",
            kind,
            new: ChangeRow::Message(row),
        }
    }

    pub fn automation_log(row: AutomationLog) -> Self {
        Self {
            table: "automation_logs",
            kind: ChangeKind::Insert,
            new: ChangeRow::AutomationLog(row),
        }
    }

    /// Phone the event concerns, used for per-contact feed filtering.
    pub fn contact_phone(&self) -> Option<&str> {
        match &self.new {
            ChangeRow::Contact(contact) => Some(&contact.phone_number),
            ChangeRow::Message(message) => Some(&message.contact_phone),
            ChangeRow::AutomationLog(log) => log.contact_phone.as_deref(),
        }
    }

    /// Singular event name used on the SSE stream.
    pub fn stream_name(&self) -> &'static str {
        match &self.new {
            ChangeRow::Contact(_) => "contact",
            ChangeRow::Message(_) => "message",
            ChangeRow::AutomationLog(_) => "automation_log",
        }
    }
}

/// Broadcast fan-out for change events. Slow subscribers that lag past
/// the channel capacity miss events and are expected to re-sync from the
/// read endpoints.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Never fails: an event with no live subscribers is simply dropped.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn contact(phone: &str) -> Contact {
        Contact {
            phone_number: phone.to_string(),
            profile_name: None,
            last_interaction_at: None,
            session_status: "expired".to_string(),
            unread_count: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(ChangeEvent::contact(ChangeKind::Insert, contact("972501234567")));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table, "contacts");
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.contact_phone(), Some("972501234567"));
        assert_eq!(event.stream_name(), "contact");
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let feed = ChangeFeed::new();
        feed.publish(ChangeEvent::contact(ChangeKind::Update, contact("972501234567")));
    }

    #[test]
    fn events_serialize_with_table_and_event_type_envelope() {
        let event = ChangeEvent::contact(ChangeKind::Insert, contact("972501234567"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["table"], "contacts");
        assert_eq!(value["eventType"], "INSERT");
        assert_eq!(value["new"]["phone_number"], "972501234567");
    }
}
