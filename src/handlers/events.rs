use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::AppointmentEvent;
use crate::state::AppState;

use super::check_auth;

const EVENT_NAME: &str = "appointment_event";

// GET /api/events (SSE)
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource can't set headers, so the token may also come as a query param.
    let from_query = query
        .token
        .as_deref()
        .is_some_and(|t| !t.is_empty() && t == state.config.admin_token);
    if !from_query {
        check_auth(&headers, &state.config.admin_token)?;
    }

    // Subscribe before the catch-up read so nothing committed in between is lost.
    let rx = state.events.subscribe();

    let last_id = query.last_id.unwrap_or(0);
    let catchup = {
        let db = state.conn()?;
        queries::get_outbox_events_since(&db, last_id)?
    };
    let newest = catchup.last().map_or(last_id, |e| e.id);

    let catchup_stream =
        tokio_stream::iter(catchup.into_iter().map(|e| Ok::<_, Infallible>(to_sse(&e))));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.id > newest => Some(Ok(to_sse(&event))),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event stream subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    let merged = catchup_stream.chain(live_stream).merge(keepalive_stream);
    Ok(Sse::new(merged))
}

fn to_sse(event: &AppointmentEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_default();
    Event::default()
        .id(event.id.to_string())
        .event(EVENT_NAME)
        .data(data)
}
