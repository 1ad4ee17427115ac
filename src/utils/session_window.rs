use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const SESSION_WINDOW_HOURS: i64 = 24;

/// Evaluated state of the 24-hour customer service window.
///
/// A window is open for exactly `SESSION_WINDOW_HOURS` after the last
/// inbound customer message. At the boundary (elapsed == window) the
/// session counts as expired. A contact with no recorded inbound message
/// has no window at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionWindow {
    pub is_active: bool,
    pub status: &'static str,
    /// Milliseconds until the window closes. `None` once expired.
    pub time_remaining_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_remaining: Option<i64>,
}

impl SessionWindow {
    fn expired() -> Self {
        Self {
            is_active: false,
            status: "expired",
            time_remaining_ms: None,
            hours_remaining: None,
            minutes_remaining: None,
        }
    }
}

/// Single source of truth for window state. Every caller that needs an
/// active/expired decision goes through here rather than re-deriving it.
pub fn evaluate(last_inbound_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> SessionWindow {
    let Some(last) = last_inbound_at else {
        return SessionWindow::expired();
    };

    let elapsed = now - last;
    let remaining = Duration::hours(SESSION_WINDOW_HOURS) - elapsed;

    if remaining <= Duration::zero() {
        return SessionWindow::expired();
    }

    let remaining_ms = remaining.num_milliseconds();
    SessionWindow {
        is_active: true,
        status: "active",
        time_remaining_ms: Some(remaining_ms),
        hours_remaining: Some(remaining_ms / (60 * 60 * 1000)),
        minutes_remaining: Some((remaining_ms % (60 * 60 * 1000)) / (60 * 1000)),
    }
}

/// Timestamps at or before this instant belong to expired sessions.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(SESSION_WINDOW_HOURS)
}
