use serde::{Deserialize, Serialize};

use crate::domain::{
    detection::Detection,
    model::ModelId,
    record::FrameRecord,
    source::SessionStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetConfidenceRequest {
    pub value: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub confidence: f32,
    pub confidence_options: Vec<f32>,
    pub model: ModelId,
    pub records_file: String,
    pub default_camera_index: u32,
    pub ip_camera_placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub objects: Vec<Detection>,
    /// JPEG anotado en base64.
    pub image: String,
    pub records: Vec<FrameRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub status: SessionStatus,
    pub download_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
