use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use super::AppState;

/// Server-sent stream of every alert published after the client connects.
///
/// A subscriber that falls behind the broadcast buffer skips the missed
/// alerts and keeps streaming.
pub(super) async fn stream_alerts(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.service.subscribe_alerts();
    tracing::debug!("alert stream subscriber connected");
    Sse::new(alert_events(rx)).keep_alive(KeepAlive::default())
}

fn alert_events(
    rx: broadcast::Receiver<finnews_core::Alert>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(alert) => match Event::default().event("alert").json_data(&alert) {
                    Ok(event) => return Some((Ok(event), rx)),
                    Err(e) => tracing::warn!(error = %e, "alert could not be encoded; skipped"),
                },
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "alert stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
