use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::warn;

use super::color::ColorRegistry;
use crate::domain::detection::BoundingBox;

const LABEL_SCALE: f32 = 20.0;
const ID_SCALE: f32 = 16.0;
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// DejaVu Sans embebida: las etiquetas nunca dependen de las fuentes del sistema.
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/font/DejaVuSans.ttf");

pub fn bundled_font() -> Option<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT)
        .map_err(|e| warn!("Fuente embebida inválida: {}", e))
        .ok()
}

/// Objeto a dibujar: ya filtrado (tiene identidad) y con nombre de clase resuelto.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub track_id: u32,
    pub class_name: String,
}

/// Dibuja cajas y etiquetas sobre el frame normalizado.
/// Es dueño del registro de colores, que vive lo mismo que el anotador.
pub struct FrameAnnotator {
    colors: ColorRegistry,
    font: Option<FontArc>,
}

impl FrameAnnotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { colors: ColorRegistry::new(), font }
    }

    /// Carga la fuente TTF indicada; sin ruta, o si no se puede cargar, usa la embebida.
    pub fn with_font_file(path: Option<&Path>) -> Self {
        let font = path
            .and_then(|p| match std::fs::read(p) {
                Ok(bytes) => FontArc::try_from_vec(bytes)
                    .map_err(|e| warn!("Fuente inválida {}: {} (se usa la embebida)", p.display(), e))
                    .ok(),
                Err(e) => {
                    warn!("No se pudo leer la fuente {}: {} (se usa la embebida)", p.display(), e);
                    None
                }
            })
            .or_else(bundled_font);
        Self::new(font)
    }

    pub fn colors(&mut self) -> &mut ColorRegistry {
        &mut self.colors
    }

    pub fn annotate<'a>(&mut self, frame: &'a mut RgbImage, items: &[Annotation]) -> &'a mut RgbImage {
        for item in items {
            let color = self.colors.color_for(&item.class_name);
            draw_box(frame, &item.bbox, color);

            if let Some(font) = &self.font {
                let label_y = (item.bbox.y1 - 2 * LABEL_SCALE as i32 + 8).max(0);
                draw_text_mut(frame, TEXT_COLOR, item.bbox.x1, label_y, PxScale::from(LABEL_SCALE), font, &item.class_name);

                let id_y = label_y + ID_SCALE as i32;
                let id_text = format!("ID:{}", item.track_id);
                draw_text_mut(frame, TEXT_COLOR, item.bbox.x1, id_y, PxScale::from(ID_SCALE), font, &id_text);
            }
        }
        frame
    }
}

/// Rectángulo de 2 px de grosor.
fn draw_box(frame: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (w, h) = (bbox.width(), bbox.height());
    if w == 0 || h == 0 {
        return;
    }
    draw_hollow_rect_mut(frame, Rect::at(bbox.x1, bbox.y1).of_size(w + 1, h + 1), color);
    if w > 2 && h > 2 {
        draw_hollow_rect_mut(frame, Rect::at(bbox.x1 + 1, bbox.y1 + 1).of_size(w - 1, h - 1), color);
    }
}
