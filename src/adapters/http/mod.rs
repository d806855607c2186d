pub mod routes;
pub mod sink;
pub mod state;
pub mod ws;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/config", get(routes::get_config))
        .route("/api/confidence", post(routes::set_confidence))
        .route("/api/photo", post(routes::upload_photo))
        .route("/api/video", post(routes::upload_video))
        .route("/api/webcam/start", post(routes::start_webcam))
        .route("/api/webcam/stop", post(routes::stop_webcam))
        .route("/api/session", get(routes::get_session))
        .route("/api/records", get(routes::download_records))
        .route("/ws/stream", get(ws_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
