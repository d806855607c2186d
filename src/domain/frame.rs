use image::{imageops::FilterType, RgbImage};

use super::errors::{DomainError, DomainResult};

/// Resolución de trabajo del pipeline.
pub const WORK_WIDTH: u32 = 640;
pub const WORK_HEIGHT: u32 = 480;

/// Orden de canales con el que una fuente entrega los píxeles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Frame tal y como sale de una fuente (foto, vídeo o cámara).
/// El buffer es de 3 canales; `order` dice cómo interpretarlos.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub pixels: RgbImage,
    pub order: ChannelOrder,
}

impl RawFrame {
    pub fn rgb(pixels: RgbImage) -> Self {
        Self { pixels, order: ChannelOrder::Rgb }
    }

    pub fn bgr(pixels: RgbImage) -> Self {
        Self { pixels, order: ChannelOrder::Bgr }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>, order: ChannelOrder) -> DomainResult<Self> {
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            DomainError::InvalidInput(format!("buffer de frame inconsistente con {}x{}", width, height))
        })?;
        Ok(Self { pixels, order })
    }
}

/// Normalizador: reescala a 640x480 y deja los canales en RGB.
pub fn normalize(raw: RawFrame) -> RgbImage {
    let RawFrame { pixels, order } = raw;
    let mut out = if pixels.dimensions() == (WORK_WIDTH, WORK_HEIGHT) {
        pixels
    } else {
        image::imageops::resize(&pixels, WORK_WIDTH, WORK_HEIGHT, FilterType::Triangle)
    };

    if order == ChannelOrder::Bgr {
        for px in out.pixels_mut() {
            px.0.swap(0, 2);
        }
    }
    out
}

/// Comprime el frame anotado para el navegador.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> DomainResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality);
    enc.encode(frame.as_raw(), frame.width(), frame.height(), image::ExtendedColorType::Rgb8)
        .map_err(|e| DomainError::OperationFailed(format!("codificando JPEG: {e}")))?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn normalize_resizes_to_working_resolution() {
        let raw = RawFrame::rgb(RgbImage::from_pixel(1280, 720, Rgb([10, 20, 30])));
        let out = normalize(raw);
        assert_eq!(out.dimensions(), (WORK_WIDTH, WORK_HEIGHT));
        assert_eq!(*out.get_pixel(320, 240), Rgb([10, 20, 30]));
    }

    #[test]
    fn normalize_swaps_bgr_to_rgb() {
        let raw = RawFrame::bgr(RgbImage::from_pixel(64, 48, Rgb([255, 0, 7])));
        let out = normalize(raw);
        assert_eq!(*out.get_pixel(0, 0), Rgb([7, 0, 255]));
    }

    #[test]
    fn from_raw_rejects_short_buffers() {
        assert!(RawFrame::from_raw(4, 4, vec![0; 10], ChannelOrder::Rgb).is_err());
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let frame = RgbImage::from_pixel(16, 16, Rgb([200, 10, 10]));
        let jpeg = encode_jpeg(&frame, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
