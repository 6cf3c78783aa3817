use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_core::Stream;
use serde::Serialize;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream, WatchStream},
    StreamExt,
};

use crate::{
    auth::require_admin,
    error::AppResult,
    schemas::ChangesQuery,
    services::counters::Counters,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/counters", axum::routing::get(current_counters))
        .route("/counters/stream", axum::routing::get(counters_stream))
        .route("/changes/stream", axum::routing::get(changes_stream))
}

async fn current_counters(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Counters>> {
    require_admin(&state, &headers).await?;
    Ok(Json(state.counters.current()))
}

async fn counters_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    require_admin(&state, &headers).await?;
    let stream = WatchStream::new(state.counters.subscribe())
        .filter_map(|counters| json_event("counters", &counters).map(Ok));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn changes_stream(
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
    headers: HeaderMap,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    require_admin(&state, &headers).await?;
    let table = query
        .table
        .map(|table| table.trim().to_string())
        .filter(|table| !table.is_empty());

    let stream =
        BroadcastStream::new(state.changes.subscribe()).filter_map(move |item| match item {
            Ok(change) => {
                if table.as_deref().is_some_and(|wanted| wanted != change.table) {
                    return None;
                }
                json_event("change", &change).map(Ok)
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Change stream subscriber lagged");
                None
            }
        });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn json_event<T: Serialize>(name: &'static str, payload: &T) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(error) => {
            tracing::error!(event = name, error = %error, "Could not encode SSE payload");
            None
        }
    }
}
