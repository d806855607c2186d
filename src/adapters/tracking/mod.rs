pub mod iou_tracker;

use image::RgbImage;

use crate::application::ports::{DetectorPort, TrackerPort};
use crate::domain::{
    detection::TrackedBox,
    errors::{DomainError, DomainResult},
    model::{class_name, TrackerParams},
};
use iou_tracker::IouTracker;

/// Detector + tracker en modo persistente: el estado de seguimiento
/// sobrevive entre llamadas hasta el siguiente `reset`.
pub struct DetectorTracker<D: DetectorPort> {
    detector: D,
    tracker: IouTracker,
}

impl<D: DetectorPort> DetectorTracker<D> {
    pub fn new(detector: D, params: TrackerParams) -> Self {
        Self { detector, tracker: IouTracker::new(params) }
    }
}

impl<D: DetectorPort> TrackerPort for DetectorTracker<D> {
    fn reset(&mut self) {
        self.tracker.reset();
    }

    fn track(&mut self, frame: &RgbImage, confidence: f32) -> DomainResult<Vec<TrackedBox>> {
        let detections = self
            .detector
            .detect(frame, confidence)
            .map_err(|e| DomainError::OperationFailed(format!("detector: {e:#}")))?;

        let ids = self.tracker.update(&detections);
        Ok(detections
            .iter()
            .zip(ids)
            .map(|(det, track_id)| TrackedBox {
                bbox: det.to_bbox(frame.width(), frame.height()),
                track_id,
                class_id: det.class_id,
                score: det.score,
            })
            .collect())
    }

    fn class_name(&self, class_id: usize) -> String {
        class_name(class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::{BoundingBox, RawDetection};

    struct FixedDetector(Vec<RawDetection>);

    impl DetectorPort for FixedDetector {
        fn detect(&mut self, _frame: &RgbImage, confidence: f32) -> anyhow::Result<Vec<RawDetection>> {
            Ok(self.0.iter().filter(|d| d.score >= confidence).cloned().collect())
        }
    }

    fn raw(x1: f32, score: f32) -> RawDetection {
        RawDetection { x1, y1: -10.0, x2: x1 + 100.0, y2: 900.0, score, class_id: 0 }
    }

    #[test]
    fn boxes_are_clamped_and_identified() {
        let mut tt = DetectorTracker::new(FixedDetector(vec![raw(600.0, 0.9)]), TrackerParams::default());
        let frame = RgbImage::new(640, 480);

        let out = tt.track(&frame, 0.5).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bbox, BoundingBox::new(600, 0, 639, 479));
        assert_eq!(out[0].track_id, Some(1));
    }

    #[test]
    fn confidence_is_forwarded_to_detector() {
        let mut tt = DetectorTracker::new(
            FixedDetector(vec![raw(0.0, 0.9), raw(300.0, 0.3)]),
            TrackerParams::default(),
        );
        let frame = RgbImage::new(640, 480);
        assert_eq!(tt.track(&frame, 0.5).unwrap().len(), 1);
        assert_eq!(tt.track(&frame, 0.2).unwrap().len(), 2);
    }

    struct FailingDetector;

    impl DetectorPort for FailingDetector {
        fn detect(&mut self, _frame: &RgbImage, _confidence: f32) -> anyhow::Result<Vec<RawDetection>> {
            anyhow::bail!("sesión ONNX no disponible")
        }
    }

    #[test]
    fn detector_errors_are_mapped() {
        let mut tt = DetectorTracker::new(FailingDetector, TrackerParams::default());
        let err = tt.track(&RgbImage::new(8, 8), 0.5).unwrap_err();
        assert!(matches!(err, DomainError::OperationFailed(_)));
    }
}
