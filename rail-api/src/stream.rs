use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Live availability and status changes for one train, as server-sent events.
pub async fn train_stream(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // 404 for unknown trains instead of an idle stream
    state.inventory.query(train_id).await?;
    let rx = state.inventory.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.train_id() == train_id => match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                debug!(error = %e, "failed to encode inventory event");
                None
            }
        },
        Ok(_) => None,
        Err(e) => {
            debug!(%train_id, error = %e, "stream subscriber lagged");
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
