//! Simulated Handy v1 API.
//!
//! Serves `/api/v1/<key>/<command>` from in-memory device state, with a
//! server clock that can be skewed from the host clock. Used to exercise
//! `handy-core` end to end.

pub mod app_state;
pub mod control;
pub mod handlers;
pub mod routes;

use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use app_state::{AppState, SharedState}; // Re-export for convenience

pub async fn run(port: u16, app_state: SharedState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Simulator listening on {}", addr);

    serve(listener, app_state).await?;
    Ok(())
}

/// Serve on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, app_state: SharedState) -> std::io::Result<()> {
    let app = routes::create_router(app_state);
    axum::serve(listener, app).await
}
