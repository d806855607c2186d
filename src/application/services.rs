use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

use crate::{
    application::{
        drivers::{CancellationToken, DriverContext, ImageDriver, StreamDriver, StreamExit, VideoDriver},
        pipeline::ProcessedFrame,
        ports::SourceFactoryPort,
    },
    domain::{
        errors::{DomainError, DomainResult},
        frame::encode_jpeg,
        model::ConfidenceThreshold,
        record::FrameRecord,
        source::{CameraSelection, SessionStatus, SourceKind},
        stream::StreamEvent,
    },
};

struct ActiveSession {
    kind: SourceKind,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

pub struct PhotoResult {
    pub processed: ProcessedFrame,
    /// Frame anotado en JPEG, listo para devolver al navegador.
    pub jpeg: Vec<u8>,
    pub records: Vec<FrameRecord>,
}

/// Orquestador de sesiones: una sola sesión activa a la vez.
/// Iniciar una sesión nueva cancela (y espera) la anterior.
pub struct SessionService {
    ctx: Arc<DriverContext>,
    sources: Arc<dyn SourceFactoryPort>,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionService {
    pub fn new(ctx: DriverContext, sources: Arc<dyn SourceFactoryPort>) -> Self {
        Self { ctx: Arc::new(ctx), sources, active: Mutex::new(None) }
    }

    pub async fn process_photo(&self, bytes: Vec<u8>) -> DomainResult<PhotoResult> {
        let mut active = self.active.lock().await;
        Self::stop_active(&mut active).await?;

        let ctx = self.ctx.clone();
        let sources = self.sources.clone();
        tokio::task::spawn_blocking(move || {
            let raw = sources.decode_image(&bytes)?;
            let processed = ImageDriver::new().run(&ctx, raw)?;
            let jpeg = encode_jpeg(&processed.image, ctx.jpeg_quality)?;
            let records = ctx.log.snapshot()?;
            Ok(PhotoResult { processed, jpeg, records })
        })
        .await
        .map_err(join_error)?
    }

    pub async fn start_video(&self, bytes: Vec<u8>) -> DomainResult<()> {
        let mut active = self.active.lock().await;
        Self::stop_active(&mut active).await?;

        let sources = self.sources.clone();
        let source = tokio::task::spawn_blocking(move || sources.open_video(bytes))
            .await
            .map_err(join_error)??;

        let ctx = self.ctx.clone();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let worker = spawn_worker("video-worker", move || {
            match VideoDriver::new().run(&ctx, source, &worker_cancel) {
                Ok(frames) => info!("Vídeo terminado tras {} frames", frames),
                Err(e) => error!("Sesión de vídeo abortada: {}", e),
            }
        })?;

        *active = Some(ActiveSession { kind: SourceKind::Video, cancel, worker });
        Ok(())
    }

    pub async fn start_webcam(&self, camera: CameraSelection) -> DomainResult<()> {
        let mut active = self.active.lock().await;
        Self::stop_active(&mut active).await?;

        let ctx = self.ctx.clone();
        let sources = self.sources.clone();
        let (mut driver, source) = tokio::task::spawn_blocking(move || {
            let mut driver = StreamDriver::new();
            let source = driver.start(&ctx, &camera, &*sources);
            (driver, source)
        })
        .await
        .map_err(join_error)?;
        let source = source?;

        let ctx = self.ctx.clone();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let worker = spawn_worker("webcam-worker", move || {
            match driver.run(&ctx, source, &worker_cancel) {
                StreamExit::StoppedByUser { frames } => info!("Webcam detenida tras {} frames", frames),
                StreamExit::Interrupted { frames } => info!("Webcam interrumpida tras {} frames", frames),
            }
        })?;

        *active = Some(ActiveSession { kind: SourceKind::Webcam, cancel, worker });
        Ok(())
    }

    /// Orden "stop". Devuelve `false` si no había webcam activa.
    pub async fn stop_webcam(&self) -> DomainResult<bool> {
        let mut active = self.active.lock().await;
        match active.as_ref().map(|s| s.kind) {
            Some(SourceKind::Webcam) => {
                Self::stop_active(&mut active).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn shutdown(&self) -> DomainResult<()> {
        let mut active = self.active.lock().await;
        Self::stop_active(&mut active).await?;
        Ok(())
    }

    async fn stop_active(active: &mut Option<ActiveSession>) -> DomainResult<()> {
        let Some(session) = active.take() else {
            return Ok(());
        };
        session.cancel.cancel();
        tokio::task::spawn_blocking(move || session.worker.join())
            .await
            .map_err(join_error)?
            .map_err(|_| DomainError::OperationFailed("el hilo de captura terminó con pánico".into()))
    }

    pub fn status(&self) -> SessionStatus {
        self.ctx.status.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn records(&self) -> DomainResult<Vec<FrameRecord>> {
        self.ctx.log.snapshot()
    }

    /// Contenido descargable: solo si hay fichero y el registro en memoria no está vacío.
    pub fn download(&self) -> DomainResult<Option<Vec<u8>>> {
        if self.ctx.log.lock()?.is_empty() {
            return Ok(None);
        }
        self.ctx.store.load()
    }

    /// Igual que `download` pero sin leer el fichero.
    pub fn download_available(&self) -> DomainResult<bool> {
        Ok(!self.ctx.log.lock()?.is_empty() && self.ctx.store.exists())
    }

    pub fn confidence(&self) -> f32 {
        self.ctx.confidence.get()
    }

    pub fn set_confidence(&self, value: f32) -> DomainResult<ConfidenceThreshold> {
        let threshold = ConfidenceThreshold::new(value)?;
        self.ctx.confidence.set(threshold);
        info!("Umbral de confianza: {}", threshold.value());
        Ok(threshold)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.ctx.sink.subscribe()
    }
}

fn spawn_worker(name: &str, f: impl FnOnce() + Send + 'static) -> DomainResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| DomainError::OperationFailed(format!("no se pudo lanzar {name}: {e}")))
}

fn join_error(e: tokio::task::JoinError) -> DomainError {
    DomainError::OperationFailed(format!("tarea bloqueante fallida: {e}"))
}
