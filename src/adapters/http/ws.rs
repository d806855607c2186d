use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::adapters::http::state::HttpState;
use crate::domain::stream::{StreamEvent, WsMessage};

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    let mut rx = st.session.subscribe();

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            // Cliente lento: se salta frames en vez de cortar la conexión.
            Err(RecvError::Lagged(n)) => {
                debug!("Cliente WebSocket retrasado, {} eventos descartados", n);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let (text, jpeg) = match event {
            StreamEvent::Frame { meta, jpeg } => (WsMessage::Frame { meta }, Some(jpeg)),
            StreamEvent::Status { level, message } => (WsMessage::Status { level, message }, None),
        };
        let json = match serde_json::to_string(&text) {
            Ok(json) => json,
            Err(e) => {
                warn!("No se pudo serializar el mensaje WebSocket: {}", e);
                continue;
            }
        };

        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
        if let Some(jpeg) = jpeg {
            if socket.send(Message::Binary(jpeg.into())).await.is_err() {
                break;
            }
        }
    }
}
