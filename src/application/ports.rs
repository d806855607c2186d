use async_trait::async_trait;
use image::RgbImage;
use tokio::sync::broadcast;

use crate::domain::{
    detection::{RawDetection, TrackedBox},
    errors::DomainResult,
    frame::RawFrame,
    model::ModelId,
    record::FrameRecord,
    source::CameraSelection,
    stream::StreamEvent,
};

/// Detector de objetos sin estado entre llamadas.
pub trait DetectorPort: Send {
    fn detect(&mut self, frame: &RgbImage, confidence: f32) -> anyhow::Result<Vec<RawDetection>>;
}

/// Detector + tracker con estado. Debe invocarse en orden estricto de frames
/// y reiniciarse al comienzo de cada sesión.
pub trait TrackerPort: Send {
    fn reset(&mut self);
    fn track(&mut self, frame: &RgbImage, confidence: f32) -> DomainResult<Vec<TrackedBox>>;
    fn class_name(&self, class_id: usize) -> String;
}

/// Fuente de frames. `Ok(None)` indica fin de flujo.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> DomainResult<Option<RawFrame>>;
}

pub trait SourceFactoryPort: Send + Sync {
    fn decode_image(&self, bytes: &[u8]) -> DomainResult<RawFrame>;
    fn open_video(&self, bytes: Vec<u8>) -> DomainResult<Box<dyn FrameSource>>;
    fn open_camera(&self, camera: &CameraSelection) -> DomainResult<Box<dyn FrameSource>>;
}

/// Persistencia plana del registro de la sesión.
pub trait RecordStorePort: Send + Sync {
    /// Sobrescribe el fichero con el registro completo.
    fn persist(&self, records: &[FrameRecord]) -> DomainResult<()>;
    fn load(&self) -> DomainResult<Option<Vec<u8>>>;
    /// Hay fichero escrito, sin leer su contenido.
    fn exists(&self) -> bool;
}

pub trait FrameSinkPort: Send + Sync {
    fn publish(&self, event: StreamEvent);
    fn subscribe(&self) -> broadcast::Receiver<StreamEvent>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
