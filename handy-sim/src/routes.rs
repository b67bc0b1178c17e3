use axum::{routing::get, Router};
use crate::app_state::SharedState;
use crate::handlers;

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/:key/:command", get(handlers::command_handler))
        .with_state(state)
}
