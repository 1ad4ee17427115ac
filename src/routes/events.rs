use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Deserialize;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::AppState;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct EventsQuery {
    pub contact: Option<String>,
}

/// Change-event stream for the console. With `?contact=` only events
/// touching that contact pass the filter. A subscriber that lags past
/// the channel capacity misses events and re-syncs via the list
/// endpoints.
#[axum::debug_handler]
pub async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let receiver = state.feed.subscribe();
    let contact = query.contact;

    let stream = BroadcastStream::new(receiver).filter_map(move |received| {
        let event = received.ok()?;
        if let Some(contact) = &contact {
            if event.contact_phone() != Some(contact.as_str()) {
                return None;
            }
        }
        let sse = Event::default()
            .event(event.stream_name())
            .json_data(&event)
            .ok()?;
        Some(Ok(sse))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
