use crate::domain::detection::RawDetection;
use crate::domain::model::TrackerParams;

struct Track {
    last: RawDetection,
    public_id: Option<u32>,
    hits: u32,
    frames_lost: u32,
}

/// Tracker por solapamiento (IoU) con asociación voraz por clase.
///
/// Los tracks nacidos en el primer frame de la sesión se confirman al instante;
/// los posteriores necesitan `min_hits` apariciones antes de recibir identidad.
pub struct IouTracker {
    params: TrackerParams,
    tracks: Vec<Track>,
    next_id: u32,
    frame_count: u64,
}

impl IouTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self { params, tracks: Vec::new(), next_id: 1, frame_count: 0 }
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
        self.frame_count = 0;
    }

    /// Devuelve la identidad asignada a cada detección, en el mismo orden de entrada.
    pub fn update(&mut self, detections: &[RawDetection]) -> Vec<Option<u32>> {
        self.frame_count += 1;

        let mut order: Vec<usize> = (0..detections.len()).collect();
        order.sort_by(|&a, &b| detections[b].score.total_cmp(&detections[a].score));

        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut assignment: Vec<Option<usize>> = vec![None; detections.len()];

        for &di in &order {
            let det = &detections[di];
            let best = self
                .tracks
                .iter()
                .enumerate()
                .filter(|(ti, t)| !matched_tracks[*ti] && t.last.class_id == det.class_id)
                .map(|(ti, t)| (ti, t.last.iou(det)))
                .filter(|(_, iou)| *iou >= self.params.match_iou)
                .max_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((ti, _)) = best {
                matched_tracks[ti] = true;
                assignment[di] = Some(ti);
            }
        }

        for (ti, track) in self.tracks.iter_mut().enumerate() {
            if !matched_tracks[ti] {
                track.frames_lost += 1;
            }
        }

        let mut ids = vec![None; detections.len()];
        for (di, det) in detections.iter().enumerate() {
            let ti = match assignment[di] {
                Some(ti) => {
                    let track = &mut self.tracks[ti];
                    track.last = det.clone();
                    track.hits += 1;
                    track.frames_lost = 0;
                    ti
                }
                None => {
                    self.tracks.push(Track { last: det.clone(), public_id: None, hits: 1, frames_lost: 0 });
                    self.tracks.len() - 1
                }
            };

            let confirmed = self.frame_count == 1 || self.tracks[ti].hits >= self.params.min_hits;
            if confirmed && self.tracks[ti].public_id.is_none() {
                self.tracks[ti].public_id = Some(self.next_id);
                self.next_id += 1;
            }
            ids[di] = self.tracks[ti].public_id;
        }

        let max_lost = self.params.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);
        ids
    }

    pub fn active_tracks(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, class_id: usize) -> RawDetection {
        RawDetection { x1: x, y1: 100.0, x2: x + 50.0, y2: 200.0, score: 0.9, class_id }
    }

    fn tracker() -> IouTracker {
        IouTracker::new(TrackerParams { match_iou: 0.3, max_lost_frames: 2, min_hits: 2 })
    }

    #[test]
    fn first_frame_objects_are_confirmed_immediately() {
        let mut t = tracker();
        assert_eq!(t.update(&[det(0.0, 0), det(300.0, 2)]), vec![Some(1), Some(2)]);
    }

    #[test]
    fn moving_object_keeps_its_identity() {
        let mut t = tracker();
        t.update(&[det(0.0, 0)]);
        assert_eq!(t.update(&[det(5.0, 0)]), vec![Some(1)]);
        assert_eq!(t.update(&[det(10.0, 0)]), vec![Some(1)]);
    }

    #[test]
    fn late_arrivals_need_min_hits() {
        let mut t = tracker();
        t.update(&[det(0.0, 0)]);
        assert_eq!(t.update(&[det(0.0, 0), det(400.0, 0)]), vec![Some(1), None]);
        assert_eq!(t.update(&[det(0.0, 0), det(402.0, 0)]), vec![Some(1), Some(2)]);
    }

    #[test]
    fn classes_are_never_mixed() {
        let mut t = tracker();
        t.update(&[det(0.0, 0)]);
        assert_eq!(t.update(&[det(0.0, 16)]), vec![None]);
    }

    #[test]
    fn lost_tracks_are_dropped() {
        let mut t = tracker();
        t.update(&[det(0.0, 0)]);
        for _ in 0..3 {
            t.update(&[]);
        }
        assert_eq!(t.active_tracks(), 0);
    }

    #[test]
    fn reset_forgets_previous_session() {
        let mut t = tracker();
        t.update(&[det(0.0, 0), det(300.0, 0)]);
        t.reset();
        assert_eq!(t.active_tracks(), 0);
        assert_eq!(t.update(&[det(300.0, 0)]), vec![Some(1)]);
    }
}
