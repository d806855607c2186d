use serde::{Deserialize, Serialize};

/// Tipo de entrada seleccionado en la interfaz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Photo,
    Video,
    Webcam,
}

/// Cámara a abrir al pulsar "start".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "camera", rename_all = "lowercase")]
pub enum CameraSelection {
    Local {
        #[serde(default)]
        index: u32,
    },
    Ip {
        #[serde(default)]
        url: String,
    },
}

impl CameraSelection {
    pub fn describe(&self) -> String {
        match self {
            CameraSelection::Local { index } => format!("/dev/video{index}"),
            CameraSelection::Ip { url } => url.clone(),
        }
    }
}

/// Estado visible de la sesión, común a los tres drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Processed,
    Running,
    Finished,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub source: Option<SourceKind>,
    pub state: SessionState,
    pub frames_processed: u64,
    pub records: usize,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self { source: None, state: SessionState::Idle, frames_processed: 0, records: 0 }
    }
}
