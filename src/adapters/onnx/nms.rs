use crate::domain::detection::RawDetection;

/// NMS voraz por clase.
pub fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32, max_detections: usize) -> Vec<RawDetection> {
    detections.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<RawDetection> = Vec::new();
    for det in detections {
        if kept.len() >= max_detections {
            break;
        }
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !overlaps {
            kept.push(det);
        }
    }
    kept
}
