use std::io::Read;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::application::ports::FrameSource;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::frame::RawFrame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Cámara IP (p. ej. la app "IP Webcam" de Android): MJPEG multipart
/// o, si el servidor no es multipart, una instantánea JPEG por petición.
pub struct IpCameraSource {
    url: String,
    agent: ureq::Agent,
    stream: HttpStream,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    Snapshot,
}

impl IpCameraSource {
    pub fn connect(url: &str) -> DomainResult<Self> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| DomainError::SourceUnavailable(format!("URL de cámara inválida '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::SourceUnavailable(format!(
                "esquema '{}' no soportado; usa http(s)",
                parsed.scheme()
            )));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        let response = agent
            .get(parsed.as_str())
            .call()
            .map_err(|e| DomainError::SourceUnavailable(format!("no se pudo conectar a {url}: {e}")))?;

        let content_type = response.header("Content-Type").unwrap_or("").to_lowercase();
        let stream = if content_type.contains("multipart") {
            HttpStream::Mjpeg(MjpegStream::new(response.into_reader()))
        } else {
            HttpStream::Snapshot
        };
        info!("Cámara IP conectada: {} ({})", parsed, content_type);

        Ok(Self { url: parsed.to_string(), agent, stream })
    }

    fn fetch_snapshot(&self) -> DomainResult<Vec<u8>> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| DomainError::StreamInterrupted(format!("instantánea de {}: {e}", self.url)))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_JPEG_BYTES as u64)
            .read_to_end(&mut bytes)
            .map_err(|e| DomainError::StreamInterrupted(format!("leyendo instantánea: {e}")))?;
        if bytes.is_empty() {
            return Err(DomainError::StreamInterrupted("instantánea vacía".into()));
        }
        Ok(bytes)
    }
}

impl FrameSource for IpCameraSource {
    fn next_frame(&mut self) -> DomainResult<Option<RawFrame>> {
        let jpeg = match &mut self.stream {
            HttpStream::Mjpeg(stream) => stream.read_next_jpeg()?,
            HttpStream::Snapshot => self.fetch_snapshot()?,
        };
        // Las cámaras IP entregan JPEG; tras decodificar los canales quedan en RGB.
        let img = image::load_from_memory(&jpeg)
            .map_err(|e| DomainError::StreamInterrupted(format!("JPEG corrupto: {e}")))?;
        Ok(Some(RawFrame::rgb(img.into_rgb8())))
    }
}

/// Separa los JPEG de un flujo multipart buscando los marcadores SOI/EOI.
pub struct MjpegStream {
    reader: Box<dyn Read + Send + Sync>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    pub fn new(reader: Box<dyn Read + Send + Sync>) -> Self {
        Self { reader, buffer: Vec::with_capacity(64 * 1024) }
    }

    pub fn read_next_jpeg(&mut self) -> DomainResult<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self
                .reader
                .read(&mut chunk)
                .map_err(|e| DomainError::StreamInterrupted(format!("leyendo MJPEG: {e}")))?;
            if read == 0 {
                return Err(DomainError::StreamInterrupted("el flujo MJPEG terminó".into()));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let drain_len = self.buffer.len() - 1;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD9])
        .map(|p| start + 2 + p + 2)?;
    Some((start, end))
}
