//! Vídeos mp4/avi/mov decodificados con FFmpeg.
//!
//! Los bytes subidos se vuelcan a un fichero temporal que vive lo mismo que la fuente.
//! Los frames salen en BGR24, igual que una captura clásica.

use ffmpeg_next as ffmpeg;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::application::ports::FrameSource;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::frame::{ChannelOrder, RawFrame};

pub struct FfmpegVideoSource {
    _spool: NamedTempFile,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    eof_sent: bool,
}

fn op_err(context: &str) -> impl Fn(ffmpeg::Error) -> DomainError + '_ {
    move |e| DomainError::InvalidInput(format!("{context}: {e}"))
}

impl FfmpegVideoSource {
    pub fn from_bytes(bytes: &[u8]) -> DomainResult<Self> {
        ffmpeg::init().map_err(op_err("inicializando ffmpeg"))?;

        let mut spool = NamedTempFile::new()
            .map_err(|e| DomainError::OperationFailed(format!("creando fichero temporal: {e}")))?;
        spool
            .write_all(bytes)
            .and_then(|_| spool.flush())
            .map_err(|e| DomainError::OperationFailed(format!("volcando vídeo: {e}")))?;

        let input = ffmpeg::format::input(&spool.path()).map_err(op_err("abriendo vídeo"))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| DomainError::InvalidInput("el fichero no tiene pista de vídeo".into()))?;
        let stream_index = stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(op_err("parámetros del decodificador"))?;
        let decoder = context.decoder().video().map_err(op_err("abriendo decodificador"))?;

        info!("Vídeo abierto: {}x{} ({} bytes)", decoder.width(), decoder.height(), bytes.len());
        Ok(Self { _spool: spool, input, stream_index, decoder, eof_sent: false })
    }

    fn to_bgr(&self, decoded: &ffmpeg::frame::Video) -> DomainResult<RawFrame> {
        let (w, h) = (decoded.width(), decoded.height());
        let mut scaler = ffmpeg::software::scaling::context::Context::get(
            decoded.format(),
            w,
            h,
            ffmpeg::util::format::pixel::Pixel::BGR24,
            w,
            h,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(op_err("creando conversor"))?;

        let mut bgr = ffmpeg::frame::Video::empty();
        scaler.run(decoded, &mut bgr).map_err(op_err("convirtiendo frame"))?;

        let stride = bgr.stride(0);
        let row = w as usize * 3;
        let mut data = Vec::with_capacity(row * h as usize);
        for y in 0..h as usize {
            data.extend_from_slice(&bgr.data(0)[y * stride..y * stride + row]);
        }
        RawFrame::from_raw(w, h, data, ChannelOrder::Bgr)
    }
}

impl FrameSource for FfmpegVideoSource {
    fn next_frame(&mut self) -> DomainResult<Option<RawFrame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.to_bgr(&decoded).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        debug!("Paquete descartado: {}", e);
                    }
                }
                Err(ffmpeg::Error::Eof) => {
                    self.decoder.send_eof().map_err(op_err("vaciando decodificador"))?;
                    self.eof_sent = true;
                }
                Err(e) => return Err(DomainError::StreamInterrupted(format!("leyendo paquete: {e}"))),
            }
        }
    }
}
