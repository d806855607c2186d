use serde::{Deserialize, Serialize};

/// Salida cruda del detector, antes del seguimiento.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
}

impl RawDetection {
    pub fn iou(&self, other: &RawDetection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let area_a = (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0);
        let area_b = (other.x2 - other.x1).max(0.0) * (other.y2 - other.y1).max(0.0);
        let union = area_a + area_b - inter;

        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Caja en píxeles enteros, recortada a los límites del frame.
    pub fn to_bbox(&self, width: u32, height: u32) -> BoundingBox {
        BoundingBox::new(self.x1 as i32, self.y1 as i32, self.x2 as i32, self.y2 as i32)
            .clamp(width, height)
    }
}

/// Caja en coordenadas de píxel (esquinas superior-izquierda e inferior-derecha).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }

    pub fn clamp(self, width: u32, height: u32) -> Self {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        Self {
            x1: self.x1.clamp(0, max_x),
            y1: self.y1.clamp(0, max_y),
            x2: self.x2.clamp(0, max_x),
            y2: self.y2.clamp(0, max_y),
        }
    }
}

/// Resultado del adaptador detector+tracker para un objeto.
/// `track_id` es `None` mientras el tracker no ha confirmado la identidad.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedBox {
    pub bbox: BoundingBox,
    pub track_id: Option<u32>,
    pub class_id: usize,
    pub score: f32,
}

/// Entrada del registro: identidad persistente + clase legible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "id")]
    pub track_id: u32,
    #[serde(rename = "class")]
    pub class_name: String,
}

impl Detection {
    pub fn new(track_id: u32, class_name: impl Into<String>) -> Self {
        Self { track_id, class_name: class_name.into() }
    }
}
