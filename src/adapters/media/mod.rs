//! Fuentes de frames: fotos, vídeos subidos y cámaras.

#[cfg(feature = "video-ffmpeg")]
pub mod ffmpeg_video;
pub mod gif_video;
pub mod image_decoder;
pub mod mjpeg_http;

use crate::application::ports::{FrameSource, SourceFactoryPort};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::frame::RawFrame;
use crate::domain::source::CameraSelection;

use gif_video::GifVideoSource;
use image_decoder::decode_photo;
use mjpeg_http::IpCameraSource;

const GIF_MAGIC: &[u8] = b"GIF8";

/// Abre cada tipo de fuente con el adaptador que le corresponde según
/// las features compiladas.
#[derive(Default)]
pub struct MediaSourceFactory;

impl MediaSourceFactory {
    pub fn new() -> Self {
        Self
    }
}

impl SourceFactoryPort for MediaSourceFactory {
    fn decode_image(&self, bytes: &[u8]) -> DomainResult<RawFrame> {
        decode_photo(bytes)
    }

    fn open_video(&self, bytes: Vec<u8>) -> DomainResult<Box<dyn FrameSource>> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidInput("el vídeo está vacío".into()));
        }
        if bytes.starts_with(GIF_MAGIC) {
            return Ok(Box::new(GifVideoSource::from_bytes(bytes)?));
        }
        open_container(bytes)
    }

    fn open_camera(&self, camera: &CameraSelection) -> DomainResult<Box<dyn FrameSource>> {
        match camera {
            CameraSelection::Local { index } => open_local(*index),
            CameraSelection::Ip { url } => Ok(Box::new(IpCameraSource::connect(url)?)),
        }
    }
}

#[cfg(feature = "video-ffmpeg")]
fn open_container(bytes: Vec<u8>) -> DomainResult<Box<dyn FrameSource>> {
    Ok(Box::new(ffmpeg_video::FfmpegVideoSource::from_bytes(&bytes)?))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_container(_bytes: Vec<u8>) -> DomainResult<Box<dyn FrameSource>> {
    tracing::warn!("Vídeo recibido pero el binario se compiló sin la feature video-ffmpeg");
    Err(DomainError::InvalidInput(
        "solo se admiten GIF animados; compila con --features video-ffmpeg para mp4/avi/mov".into(),
    ))
}

#[cfg(feature = "v4l2")]
fn open_local(index: u32) -> DomainResult<Box<dyn FrameSource>> {
    Ok(Box::new(crate::adapters::v4l2::capture::V4l2Capture::open(index)?))
}

#[cfg(not(feature = "v4l2"))]
fn open_local(index: u32) -> DomainResult<Box<dyn FrameSource>> {
    tracing::warn!("Cámara local {} pedida sin soporte V4L2", index);
    Err(DomainError::SourceUnavailable(format!(
        "cámara local {index} no disponible: compila con --features v4l2"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Frame, Rgba, RgbaImage};

    #[test]
    fn gif_uploads_become_video_sources() {
        let mut gif = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut gif);
            enc.encode_frame(Frame::new(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])))).unwrap();
        }
        let mut src = MediaSourceFactory::new().open_video(gif).unwrap();
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn empty_video_is_rejected() {
        assert!(matches!(
            MediaSourceFactory::new().open_video(Vec::new()),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn ip_camera_with_bad_url_is_unavailable() {
        let cam = CameraSelection::Ip { url: "ftp://cam.local/video".into() };
        assert!(matches!(
            MediaSourceFactory::new().open_camera(&cam),
            Err(DomainError::SourceUnavailable(_))
        ));
    }
}
