use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::pipeline::{FramePipeline, ProcessedFrame};
use super::ports::{FrameSinkPort, FrameSource, RecordStorePort, SourceFactoryPort};
use crate::domain::{
    errors::{DomainError, DomainResult},
    frame::{encode_jpeg, RawFrame},
    model::SharedConfidence,
    session::SharedLog,
    source::{CameraSelection, SessionState, SessionStatus, SourceKind},
    stream::{summarize_detections, FrameMeta, StatusLevel, StreamEvent},
};

/// Bandera de parada consultada en cada iteración de los bucles de captura.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Colaboradores compartidos por los tres drivers.
pub struct DriverContext {
    pub pipeline: Arc<Mutex<FramePipeline>>,
    pub log: SharedLog,
    pub store: Arc<dyn RecordStorePort>,
    pub sink: Arc<dyn FrameSinkPort>,
    pub confidence: SharedConfidence,
    pub status: Arc<RwLock<SessionStatus>>,
    pub frame_delay: Duration,
    pub jpeg_quality: u8,
}

impl DriverContext {
    /// Punto de reinicio de sesión: vacía el registro y el estado del tracker.
    fn begin(&self, source: SourceKind) -> DomainResult<()> {
        self.log.lock()?.reset();
        self.lock_pipeline()?.begin_session();
        self.update_status(|s| {
            *s = SessionStatus { source: Some(source), state: SessionState::Running, frames_processed: 0, records: 0 };
        });
        Ok(())
    }

    fn lock_pipeline(&self) -> DomainResult<std::sync::MutexGuard<'_, FramePipeline>> {
        self.pipeline
            .lock()
            .map_err(|_| DomainError::OperationFailed("lock del pipeline envenenado".into()))
    }

    fn run_frame(&self, source: SourceKind, raw: RawFrame, frame_number: u64, fps_est: f32) -> DomainResult<ProcessedFrame> {
        let processed = self.lock_pipeline()?.process(raw, frame_number, self.confidence.get());

        let records = {
            let mut log = self.log.lock()?;
            if let Some(record) = processed.record.clone() {
                log.append(record)?;
            }
            log.len()
        };
        self.update_status(|s| {
            s.frames_processed = frame_number;
            s.records = records;
        });

        let jpeg = encode_jpeg(&processed.image, self.jpeg_quality)?;
        let meta = FrameMeta {
            source,
            frame: frame_number,
            width: processed.image.width(),
            height: processed.image.height(),
            infer_ms: processed.infer_ms,
            fps_est,
            summary: summarize_detections(&processed.objects),
            objects: processed.objects.clone(),
        };
        self.sink.publish(StreamEvent::Frame { meta, jpeg });
        Ok(processed)
    }

    fn persist(&self) {
        let result = self.log.snapshot().and_then(|records| {
            self.store.persist(&records)?;
            Ok(records.len())
        });
        match result {
            Ok(n) => info!("Registro de seguimiento guardado ({} frames con objetos)", n),
            Err(e) => {
                error!("No se pudo guardar el registro: {}", e);
                self.notify(StatusLevel::Error, format!("No se pudo guardar el registro: {e}"));
            }
        }
    }

    pub fn notify(&self, level: StatusLevel, message: impl Into<String>) {
        self.sink.publish(StreamEvent::Status { level, message: message.into() });
    }

    fn set_state(&self, state: SessionState) {
        self.update_status(|s| s.state = state);
    }

    fn update_status(&self, f: impl FnOnce(&mut SessionStatus)) {
        match self.status.write() {
            Ok(mut s) => f(&mut s),
            Err(_) => warn!("Lock de estado de sesión envenenado"),
        }
    }
}

/// Media móvil exponencial de FPS para la interfaz.
struct FpsMeter {
    fps_est: f32,
    last_t: Instant,
}

impl FpsMeter {
    fn new() -> Self {
        Self { fps_est: 0.0, last_t: Instant::now() }
    }

    fn tick(&mut self) -> f32 {
        let dt = self.last_t.elapsed().as_secs_f32().max(0.001);
        self.last_t = Instant::now();
        self.fps_est = 0.9 * self.fps_est + 0.1 * (1.0 / dt);
        self.fps_est
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Idle,
    Processed,
}

pub struct ImageDriver {
    state: ImageState,
}

impl ImageDriver {
    pub fn new() -> Self {
        Self { state: ImageState::Idle }
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn run(&mut self, ctx: &DriverContext, raw: RawFrame) -> DomainResult<ProcessedFrame> {
        self.state = ImageState::Idle;
        ctx.begin(SourceKind::Photo)?;

        let processed = ctx.run_frame(SourceKind::Photo, raw, 1, 0.0)?;

        self.state = ImageState::Processed;
        ctx.set_state(SessionState::Processed);
        ctx.persist();
        Ok(processed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoState {
    Idle,
    Running,
    Finished,
}

pub struct VideoDriver {
    state: VideoState,
}

impl VideoDriver {
    pub fn new() -> Self {
        Self { state: VideoState::Idle }
    }

    pub fn state(&self) -> VideoState {
        self.state
    }

    /// Procesa el vídeo hasta agotarlo. Un fallo de decodificación se trata como fin de vídeo.
    pub fn run(&mut self, ctx: &DriverContext, mut source: Box<dyn FrameSource>, cancel: &CancellationToken) -> DomainResult<u64> {
        ctx.begin(SourceKind::Video)?;
        self.state = VideoState::Running;

        let mut fps = FpsMeter::new();
        let mut frame_number = 0u64;
        loop {
            if cancel.is_cancelled() {
                info!("Vídeo cancelado en el frame {}", frame_number);
                break;
            }
            let raw = match source.next_frame() {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) => {
                    debug!("Decodificación detenida en frame {}: {}", frame_number + 1, e);
                    break;
                }
            };
            frame_number += 1;
            if let Err(e) = ctx.run_frame(SourceKind::Video, raw, frame_number, fps.tick()) {
                error!("Error procesando frame {}: {}", frame_number, e);
                ctx.notify(StatusLevel::Error, e.to_string());
                break;
            }
            std::thread::sleep(ctx.frame_delay);
        }
        drop(source);

        self.state = VideoState::Finished;
        ctx.set_state(SessionState::Finished);
        ctx.persist();
        ctx.notify(StatusLevel::Info, "Vídeo terminado");
        Ok(frame_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Stopped,
    Running,
}

/// Motivo por el que terminó el bucle de captura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamExit {
    StoppedByUser { frames: u64 },
    Interrupted { frames: u64 },
}

pub struct StreamDriver {
    state: StreamState,
}

impl StreamDriver {
    pub fn new() -> Self {
        Self { state: StreamState::Stopped }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Orden "start": reinicia la sesión y abre la cámara.
    /// Si no se puede abrir, vuelve a `Stopped` sin persistir nada.
    pub fn start(&mut self, ctx: &DriverContext, camera: &CameraSelection, sources: &dyn SourceFactoryPort) -> DomainResult<Box<dyn FrameSource>> {
        // Pulsar "start" siempre descarta el registro anterior.
        ctx.begin(SourceKind::Webcam)?;

        if let CameraSelection::Ip { url } = camera {
            if url.trim().is_empty() {
                self.state = StreamState::Stopped;
                ctx.set_state(SessionState::Stopped);
                ctx.notify(StatusLevel::Warning, "Introduce la URL de la cámara IP");
                return Err(DomainError::SourceUnavailable("URL de cámara IP vacía".into()));
            }
        }

        self.state = StreamState::Running;

        match sources.open_camera(camera) {
            Ok(source) => {
                info!("Cámara abierta: {}", camera.describe());
                Ok(source)
            }
            Err(e) => {
                error!("No se pudo abrir la cámara {}: {}", camera.describe(), e);
                self.state = StreamState::Stopped;
                ctx.set_state(SessionState::Stopped);
                ctx.notify(StatusLevel::Error, "No se puede acceder a la cámara. Revisa la webcam o la URL de la cámara IP.");
                Err(e)
            }
        }
    }

    /// Bucle de captura hasta la orden "stop" o un fallo de lectura. Persiste una sola vez al salir.
    pub fn run(&mut self, ctx: &DriverContext, mut source: Box<dyn FrameSource>, cancel: &CancellationToken) -> StreamExit {
        let mut fps = FpsMeter::new();
        let mut frame_number = 0u64;
        let mut interrupted = false;

        while !cancel.is_cancelled() {
            match source.next_frame() {
                Ok(Some(raw)) => {
                    frame_number += 1;
                    if let Err(e) = ctx.run_frame(SourceKind::Webcam, raw, frame_number, fps.tick()) {
                        error!("Error procesando frame {}: {}", frame_number, e);
                        ctx.notify(StatusLevel::Error, e.to_string());
                        interrupted = true;
                        break;
                    }
                }
                other => {
                    if let Err(e) = other {
                        debug!("Lectura de cámara fallida: {}", e);
                    }
                    warn!("Flujo de cámara interrumpido tras {} frames", frame_number);
                    ctx.notify(StatusLevel::Warning, "Flujo de cámara interrumpido");
                    interrupted = true;
                    break;
                }
            }
            std::thread::sleep(ctx.frame_delay);
        }
        drop(source);

        self.state = StreamState::Stopped;
        ctx.set_state(SessionState::Stopped);
        ctx.persist();

        if interrupted {
            StreamExit::Interrupted { frames: frame_number }
        } else {
            StreamExit::StoppedByUser { frames: frame_number }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{blank_frame, tracked, Harness, ScriptedSource, ScriptedTracker};
    use crate::domain::detection::Detection;
    use crate::domain::record::FrameRecord;

    #[test]
    fn single_image_with_two_objects() {
        let tracker = ScriptedTracker::new(vec![vec![tracked(10, 0), tracked(11, 2)]]);
        let h = Harness::new(tracker);
        let mut driver = ImageDriver::new();

        driver.run(&h.ctx, blank_frame()).unwrap();

        assert_eq!(driver.state(), ImageState::Processed);
        let persisted = h.store.last().unwrap();
        assert_eq!(
            serde_json::to_string(&persisted).unwrap(),
            r#"[{"frame":1,"objects":[{"id":10,"class":"person"},{"id":11,"class":"car"}]}]"#
        );
        assert_eq!(h.store.writes(), 1);
    }

    #[test]
    fn new_image_session_clears_previous_records() {
        let tracker = ScriptedTracker::new(vec![vec![tracked(1, 16)], vec![tracked(2, 15)]]);
        let h = Harness::new(tracker);

        ImageDriver::new().run(&h.ctx, blank_frame()).unwrap();
        ImageDriver::new().run(&h.ctx, blank_frame()).unwrap();

        assert_eq!(
            h.ctx.log.snapshot().unwrap(),
            vec![FrameRecord { frame: 1, objects: vec![Detection::new(2, "cat")] }]
        );
    }

    #[test]
    fn video_records_only_frames_with_detections() {
        let tracker = ScriptedTracker::new(vec![vec![], vec![tracked(5, 16)], vec![]]);
        let h = Harness::new(tracker);
        let mut driver = VideoDriver::new();

        let frames = driver.run(&h.ctx, ScriptedSource::frames(3), &CancellationToken::new()).unwrap();

        assert_eq!(frames, 3);
        assert_eq!(driver.state(), VideoState::Finished);
        assert_eq!(
            serde_json::to_string(&h.store.last().unwrap()).unwrap(),
            r#"[{"frame":2,"objects":[{"id":5,"class":"dog"}]}]"#
        );
        assert_eq!(h.status().state, SessionState::Finished);
        assert_eq!(h.status().frames_processed, 3);
    }

    #[test]
    fn video_decode_failure_is_a_silent_stop() {
        let tracker = ScriptedTracker::new(vec![vec![tracked(1, 0)], vec![tracked(1, 0)]]);
        let h = Harness::new(tracker);
        let source = ScriptedSource::frames(1).then_fail();

        let frames = VideoDriver::new().run(&h.ctx, source, &CancellationToken::new()).unwrap();

        assert_eq!(frames, 1);
        assert_eq!(h.store.writes(), 1);
        assert!(h.statuses().iter().all(|(level, _)| *level == StatusLevel::Info));
    }

    #[test]
    fn ip_camera_without_url_never_opens_a_source() {
        let h = Harness::new(ScriptedTracker::new(vec![]));
        let mut driver = StreamDriver::new();

        let res = driver.start(&h.ctx, &CameraSelection::Ip { url: "  ".into() }, &*h.factory);

        assert!(matches!(res, Err(DomainError::SourceUnavailable(_))));
        assert_eq!(driver.state(), StreamState::Stopped);
        assert_eq!(h.factory.opened(), 0);
        assert!(h.statuses().iter().any(|(level, _)| *level == StatusLevel::Warning));
        assert_eq!(h.store.writes(), 0);
        assert_eq!(h.status().state, SessionState::Stopped);
    }

    #[test]
    fn ip_camera_without_url_still_clears_previous_log() {
        let h = Harness::new(ScriptedTracker::new(vec![vec![tracked(1, 0)]]));
        ImageDriver::new().run(&h.ctx, blank_frame()).unwrap();
        assert_eq!(h.ctx.log.snapshot().unwrap().len(), 1);

        let mut driver = StreamDriver::new();
        let res = driver.start(&h.ctx, &CameraSelection::Ip { url: String::new() }, &*h.factory);

        assert!(res.is_err());
        assert!(h.ctx.log.snapshot().unwrap().is_empty());
        assert_eq!(h.factory.opened(), 0);
    }

    #[test]
    fn camera_open_failure_forces_stop_without_persisting() {
        let h = Harness::new(ScriptedTracker::new(vec![]));
        h.factory.fail_cameras();
        let mut driver = StreamDriver::new();

        let res = driver.start(&h.ctx, &CameraSelection::Local { index: 0 }, &*h.factory);

        assert!(res.is_err());
        assert_eq!(driver.state(), StreamState::Stopped);
        assert_eq!(h.status().state, SessionState::Stopped);
        assert_eq!(h.store.writes(), 0);
        assert!(h.statuses().iter().any(|(level, _)| *level == StatusLevel::Error));
    }

    #[test]
    fn stop_command_exits_loop_and_persists_once() {
        let tracker = ScriptedTracker::new(vec![vec![tracked(3, 0)]; 1000]);
        let h = Harness::new(tracker);
        let cancel = CancellationToken::new();
        let mut driver = StreamDriver::new();

        let opened = driver.start(&h.ctx, &CameraSelection::Local { index: 0 }, &*h.factory).unwrap();
        assert_eq!(driver.state(), StreamState::Running);
        drop(opened);

        // La orden "stop" llega mientras se entrega el cuarto frame.
        let source = ScriptedSource::cancel_after(4, cancel.clone());
        let exit = driver.run(&h.ctx, source, &cancel);

        assert_eq!(exit, StreamExit::StoppedByUser { frames: 4 });
        assert_eq!(driver.state(), StreamState::Stopped);
        assert_eq!(h.store.writes(), 1);
        let frames: Vec<u64> = h.store.last().unwrap().iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![1, 2, 3, 4]);
    }

    #[test]
    fn interrupted_stream_warns_and_keeps_records() {
        let tracker = ScriptedTracker::new(vec![vec![tracked(8, 0)], vec![tracked(8, 0)]]);
        let h = Harness::new(tracker);
        let mut driver = StreamDriver::new();

        let exit = driver.run(&h.ctx, ScriptedSource::frames(2).then_fail(), &CancellationToken::new());

        assert_eq!(exit, StreamExit::Interrupted { frames: 2 });
        assert_eq!(h.store.last().unwrap().len(), 2);
        assert!(h
            .statuses()
            .iter()
            .any(|(level, msg)| *level == StatusLevel::Warning && msg.contains("interrumpido")));
    }

    #[test]
    fn frame_counter_advances_on_empty_frames() {
        let tracker = ScriptedTracker::new(vec![vec![], vec![], vec![tracked(2, 0)]]);
        let h = Harness::new(tracker);

        VideoDriver::new().run(&h.ctx, ScriptedSource::frames(3), &CancellationToken::new()).unwrap();

        let frames: Vec<u64> = h.store.last().unwrap().iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![3]);
    }

    #[test]
    fn every_processed_frame_is_published() {
        let h = Harness::new(ScriptedTracker::new(vec![]));
        VideoDriver::new().run(&h.ctx, ScriptedSource::frames(3), &CancellationToken::new()).unwrap();
        assert_eq!(h.published_frames(), vec![1, 2, 3]);
    }
}
