use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use std::time::Duration;

use crate::api::rest::handlers::{self, SseSettings};
use crate::api::rest::sessions::SessionRegistry;
use crate::config::KanbanBoardConfig;

pub fn register_routes(
    router: Router,
    sessions: SessionRegistry,
    cfg: &KanbanBoardConfig,
) -> anyhow::Result<Router> {
    anyhow::ensure!(
        cfg.sse_keepalive_secs > 0,
        "kanban_board.sse_keepalive_secs must be positive"
    );

    let board = Router::new()
        // Session lifecycle
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/sign-out", post(handlers::sign_out))
        // Live view
        .route("/board", get(handlers::get_board))
        .route("/board/events", get(handlers::board_events))
        // Mutations
        .route("/board/columns", post(handlers::add_column))
        .route("/board/columns/{column_id}", delete(handlers::delete_column))
        .route("/board/columns/{column_id}/tasks", post(handlers::add_task))
        .route(
            "/board/columns/{column_id}/tasks/{task_id}",
            delete(handlers::delete_task),
        )
        .layer(Extension(sessions))
        .layer(Extension(SseSettings {
            keepalive: Duration::from_secs(cfg.sse_keepalive_secs),
        }));

    Ok(router.merge(board))
}
