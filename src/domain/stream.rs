use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::detection::Detection;
use super::source::SourceKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMeta {
    pub source: SourceKind,
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub fps_est: f32,
    pub objects: Vec<Detection>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Eventos difundidos a los clientes del dashboard.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Frame { meta: FrameMeta, jpeg: Vec<u8> },
    Status { level: StatusLevel, message: String },
}

/// Mensaje de texto por WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WsMessage {
    Frame { meta: FrameMeta },
    Status { level: StatusLevel, message: String },
}

pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.class_name.as_str()).or_insert(0) += 1;
    }
    counts.iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_per_class() {
        let dets = vec![
            Detection::new(1, "person"),
            Detection::new(2, "car"),
            Detection::new(3, "person"),
        ];
        assert_eq!(summarize_detections(&dets), "1 car, 2 person");
    }

    #[test]
    fn status_message_is_tagged() {
        let msg = WsMessage::Status { level: StatusLevel::Warning, message: "x".into() };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"status","level":"warning","message":"x"}"#
        );
    }
}
