use image::ImageFormat;
use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use super::yuyv::yuyv_to_rgb;
use crate::application::ports::FrameSource;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::frame::{RawFrame, WORK_HEIGHT, WORK_WIDTH};

const BUFFER_COUNT: u32 = 4;

/// Webcam local vía V4L2 con buffers MMAP.
pub struct V4l2Capture {
    // El stream guarda su propio handle del dispositivo.
    stream: Stream<'static>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl V4l2Capture {
    /// Abre `/dev/video{index}` pidiendo MJPG a la resolución de trabajo.
    pub fn open(index: u32) -> DomainResult<Self> {
        let path = format!("/dev/video{index}");
        let unavailable = |what: &str, e: std::io::Error| {
            DomainError::SourceUnavailable(format!("{what} {path}: {e}"))
        };

        let dev = Device::with_path(&path).map_err(|e| unavailable("no se pudo abrir", e))?;

        let mut fmt = dev.format().map_err(|e| unavailable("leyendo formato de", e))?;
        fmt.fourcc = FourCC::new(b"MJPG");
        fmt.width = WORK_WIDTH;
        fmt.height = WORK_HEIGHT;
        let actual = dev.set_format(&fmt).map_err(|e| unavailable("configurando", e))?;

        let stream = Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| unavailable("iniciando captura de", e))?;

        info!("Cámara abierta: {} {}x{} [{}]", path, actual.width, actual.height, actual.fourcc);
        Ok(Self { stream, fourcc: actual.fourcc, width: actual.width, height: actual.height })
    }
}

impl FrameSource for V4l2Capture {
    fn next_frame(&mut self) -> DomainResult<Option<RawFrame>> {
        let (data, _) = self
            .stream
            .next()
            .map_err(|e| DomainError::StreamInterrupted(format!("captura V4L2: {e}")))?;

        match &self.fourcc.repr {
            b"MJPG" => {
                let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                    .map_err(|e| DomainError::StreamInterrupted(format!("frame MJPG corrupto: {e}")))?;
                Ok(Some(RawFrame::rgb(img.to_rgb8())))
            }
            b"YUYV" => Ok(Some(RawFrame::rgb(yuyv_to_rgb(data, self.width, self.height)))),
            other => {
                warn!("Formato de cámara {:?} no soportado", String::from_utf8_lossy(other));
                Err(DomainError::SourceUnavailable(format!(
                    "formato de cámara {} no soportado",
                    String::from_utf8_lossy(other)
                )))
            }
        }
    }
}
