use tokio::sync::broadcast;
use tracing::trace;

use crate::application::ports::FrameSinkPort;
use crate::domain::stream::StreamEvent;

const CHANNEL_CAPACITY: usize = 16;

/// Difunde frames y avisos a todos los WebSocket conectados.
/// Sin suscriptores los eventos se descartan.
pub struct BroadcastSink {
    tx: broadcast::Sender<StreamEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSinkPort for BroadcastSink {
    fn publish(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            trace!("Evento sin suscriptores");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stream::StatusLevel;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let sink = BroadcastSink::new();
        sink.publish(StreamEvent::Status { level: StatusLevel::Info, message: "perdido".into() });

        let mut rx = sink.subscribe();
        sink.publish(StreamEvent::Status { level: StatusLevel::Warning, message: "hola".into() });

        match rx.recv().await.unwrap() {
            StreamEvent::Status { level, message } => {
                assert_eq!(level, StatusLevel::Warning);
                assert_eq!(message, "hola");
            }
            other => panic!("evento inesperado: {other:?}"),
        }
    }
}
