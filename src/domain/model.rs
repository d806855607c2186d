use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolov8m"
    pub onnx_path: String,  // filesystem path
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorParams {
    pub input_size: u32,        // 640 typical
    pub iou_threshold: f32,     // NMS, 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerParams {
    pub match_iou: f32,       // IoU mínimo para asociar detección y track
    pub max_lost_frames: u32, // frames sin ver antes de descartar un track
    pub min_hits: u32,        // apariciones antes de asignar identidad
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            match_iou: 0.3,
            max_lost_frames: 30,
            min_hits: 2,
        }
    }
}

/// Umbral de confianza validado, en [0.05, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    pub const MIN: f32 = 0.05;
    pub const MAX: f32 = 1.0;
    pub const STEP: f32 = 0.05;

    pub fn new(value: f32) -> DomainResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::InvalidInput(format!(
                "umbral de confianza {value} fuera de [{}, {}]",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Opciones del selector: 0.05, 0.10, ..., 1.00.
    pub fn options() -> Vec<f32> {
        (1..=20).map(|i| (i as f32 * Self::STEP * 100.0).round() / 100.0).collect()
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(0.5)
    }
}

/// Umbral compartido: lo escribe la API, el pipeline lo lee en cada frame.
#[derive(Debug, Clone)]
pub struct SharedConfidence(Arc<AtomicU32>);

impl SharedConfidence {
    pub fn new(initial: ConfidenceThreshold) -> Self {
        Self(Arc::new(AtomicU32::new(initial.value().to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: ConfidenceThreshold) {
        self.0.store(value.value().to_bits(), Ordering::Relaxed);
    }
}

/// Tabla de nombres COCO (80 clases) del modelo YOLO.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub fn class_name(class_id: usize) -> String {
    COCO_CLASSES
        .get(class_id)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("class_{class_id}"))
}
