use image::ImageFormat;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::frame::RawFrame;

/// Formatos aceptados para fotos.
const PHOTO_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

pub fn decode_photo(bytes: &[u8]) -> DomainResult<RawFrame> {
    if bytes.is_empty() {
        return Err(DomainError::InvalidInput("la imagen está vacía".into()));
    }
    let format = image::guess_format(bytes)
        .map_err(|e| DomainError::InvalidInput(format!("formato de imagen desconocido: {e}")))?;
    if !PHOTO_FORMATS.contains(&format) {
        return Err(DomainError::InvalidInput(format!("formato {:?} no admitido (jpg, jpeg, png)", format)));
    }
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DomainError::InvalidInput(format!("imagen corrupta: {e}")))?;
    Ok(RawFrame::rgb(img.to_rgb8()))
}
