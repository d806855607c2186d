use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use tracing::debug;

use crate::application::ports::FrameSource;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::frame::RawFrame;

/// Frames decodificados por adelantado como máximo.
const PREFETCH_FRAMES: usize = 2;

/// Vídeo GIF animado decodificado bajo demanda.
///
/// El iterador de frames de `image` no es `Send`, así que vive en un hilo
/// decodificador que entrega los frames por un canal acotado.
/// Si un frame está corrupto, el vídeo termina ahí.
pub struct GifVideoSource {
    frames: Receiver<RawFrame>,
    decoded: Arc<AtomicUsize>,
}

impl GifVideoSource {
    pub fn from_bytes(bytes: Vec<u8>) -> DomainResult<Self> {
        // Validar la cabecera antes de lanzar el hilo.
        GifDecoder::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| DomainError::InvalidInput(format!("GIF inválido: {e}")))?;

        let (tx, rx) = sync_channel(PREFETCH_FRAMES);
        let decoded = Arc::new(AtomicUsize::new(0));
        let counter = decoded.clone();
        std::thread::Builder::new()
            .name("gif-decoder".into())
            .spawn(move || {
                let decoder = match GifDecoder::new(Cursor::new(bytes)) {
                    Ok(decoder) => decoder,
                    Err(e) => {
                        debug!("GIF ilegible: {}", e);
                        return;
                    }
                };
                for frame in decoder.into_frames() {
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(e) => {
                            debug!("GIF truncado tras {} frames: {}", counter.load(Ordering::Relaxed), e);
                            break;
                        }
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                    let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
                    // El receptor desaparece cuando se cancela la sesión.
                    if tx.send(RawFrame::rgb(rgb)).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| DomainError::OperationFailed(format!("no se pudo lanzar el decodificador GIF: {e}")))?;

        Ok(Self { frames: rx, decoded })
    }

    /// Frames decodificados hasta ahora por el hilo.
    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::Relaxed)
    }
}

impl Drop for GifVideoSource {
    fn drop(&mut self) {
        debug!("GIF cerrado tras decodificar {} frames", self.decoded());
    }
}

impl FrameSource for GifVideoSource {
    fn next_frame(&mut self) -> DomainResult<Option<RawFrame>> {
        // Canal cerrado = fin del vídeo.
        Ok(self.frames.recv().ok())
    }
}
