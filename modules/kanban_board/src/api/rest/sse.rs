use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use std::{convert::Infallible, time::Duration};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::api::rest::dto::BoardViewDto;
use crate::contract::model::BoardView;

pub const BOARD_VIEW_EVENT: &str = "board_view";

/// SSE stream of board views under the `board_view` event name.
///
/// The current view is sent first, then every published view. Intermediate
/// views may be skipped when the client is slow; each event is complete.
/// Ends when the session behind `views` is gone.
pub fn board_view_events(
    views: watch::Receiver<BoardView>,
    keepalive: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(views).map(|view| {
        let dto = BoardViewDto::from(&view);
        let ev = Event::default()
            .event(BOARD_VIEW_EVENT)
            .json_data(&dto)
            .unwrap_or_else(|_| {
                Event::default()
                    .event(BOARD_VIEW_EVENT)
                    .data("serialization_error")
            });
        Ok(ev)
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keepalive).text("keepalive"))
}
