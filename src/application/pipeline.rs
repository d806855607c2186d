use image::RgbImage;
use std::time::Instant;
use tracing::{debug, warn};

use super::annotator::{Annotation, FrameAnnotator};
use super::ports::TrackerPort;
use crate::domain::{
    detection::Detection,
    frame::{normalize, RawFrame},
    record::{build_record, FrameRecord},
};

/// Resultado de pasar un frame por el pipeline.
pub struct ProcessedFrame {
    pub frame_number: u64,
    pub image: RgbImage,
    pub objects: Vec<Detection>,
    pub record: Option<FrameRecord>,
    pub infer_ms: f32,
}

/// normalizar -> detectar+seguir -> anotar -> construir registro.
pub struct FramePipeline {
    tracker: Box<dyn TrackerPort>,
    annotator: FrameAnnotator,
}

impl FramePipeline {
    pub fn new(tracker: Box<dyn TrackerPort>, annotator: FrameAnnotator) -> Self {
        Self { tracker, annotator }
    }

    /// Reinicia el estado del tracker para que no se filtren identidades entre sesiones.
    pub fn begin_session(&mut self) {
        self.tracker.reset();
    }

    pub fn process(&mut self, raw: RawFrame, frame_number: u64, confidence: f32) -> ProcessedFrame {
        let mut image = normalize(raw);

        let t_infer_start = Instant::now();
        let tracked = self.tracker.track(&image, confidence).unwrap_or_else(|e| {
            warn!("Inferencia fallida en frame {}: {}", frame_number, e);
            Vec::new()
        });
        let infer_ms = t_infer_start.elapsed().as_secs_f32() * 1000.0;

        // Las detecciones sin identidad no se dibujan ni se registran.
        let annotations: Vec<Annotation> = tracked
            .into_iter()
            .filter_map(|t| {
                t.track_id.map(|id| Annotation {
                    bbox: t.bbox,
                    track_id: id,
                    class_name: self.tracker.class_name(t.class_id),
                })
            })
            .collect();

        self.annotator.annotate(&mut image, &annotations);

        let objects: Vec<Detection> = annotations
            .into_iter()
            .map(|a| Detection::new(a.track_id, a.class_name))
            .collect();
        debug!("Frame {}: {} objetos con identidad", frame_number, objects.len());

        let record = build_record(frame_number, objects.clone());
        ProcessedFrame { frame_number, image, objects, record, infer_ms }
    }
}
