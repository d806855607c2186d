use serde::{Deserialize, Serialize};

use super::detection::Detection;

/// Registro de un frame con al menos una identidad confirmada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub objects: Vec<Detection>,
}

/// Solo se genera registro si el frame tiene detecciones; los frames vacíos no se anotan.
pub fn build_record(frame: u64, objects: Vec<Detection>) -> Option<FrameRecord> {
    if objects.is_empty() {
        return None;
    }
    Some(FrameRecord { frame, objects })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_produces_no_record() {
        assert_eq!(build_record(3, Vec::new()), None);
    }

    #[test]
    fn record_keeps_object_order() {
        let rec = build_record(1, vec![Detection::new(10, "person"), Detection::new(11, "car")]).unwrap();
        assert_eq!(
            serde_json::to_string(&rec).unwrap(),
            r#"{"frame":1,"objects":[{"id":10,"class":"person"},{"id":11,"class":"car"}]}"#
        );
    }
}
