mod adapters;
mod application;
mod config;
mod domain;

use clap::Parser;
use std::sync::{Arc, Mutex, RwLock};
use tower_http::services::ServeDir;

use crate::adapters::{
    http::{
        router,
        sink::BroadcastSink,
        state::{DashboardInfo, HttpState},
    },
    media::MediaSourceFactory,
    onnx::model_catalog::OnnxModelCatalog,
    storage::JsonRecordStore,
};
use crate::application::{
    annotator::FrameAnnotator,
    drivers::DriverContext,
    pipeline::FramePipeline,
    ports::{ModelCatalogPort, TrackerPort},
    services::SessionService,
};
use crate::config::{AppConfig, Cli};
use crate::domain::{model::SharedConfidence, session::SharedLog, source::SessionStatus};

#[cfg(feature = "onnx")]
fn build_tracker(cfg: &AppConfig) -> anyhow::Result<Box<dyn TrackerPort>> {
    use crate::adapters::{onnx::yolo_engine::OnnxYoloEngine, tracking::DetectorTracker};

    let engine = OnnxYoloEngine::load(&cfg.model.onnx_path, cfg.detector.clone())?;
    Ok(Box::new(DetectorTracker::new(engine, cfg.tracker.clone())))
}

#[cfg(not(feature = "onnx"))]
fn build_tracker(_cfg: &AppConfig) -> anyhow::Result<Box<dyn TrackerPort>> {
    anyhow::bail!("binario compilado sin soporte ONNX: recompila con --features onnx")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs con RUST_LOG=info por defecto
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli)?;

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    OnnxModelCatalog::new().validate_model(&cfg.model).await?;
    let tracker = build_tracker(&cfg)?;
    let annotator = FrameAnnotator::with_font_file(cfg.font_path.as_deref());

    let store = Arc::new(JsonRecordStore::new(cfg.records_path.clone()));
    let sink = Arc::new(BroadcastSink::new());

    let ctx = DriverContext {
        pipeline: Arc::new(Mutex::new(FramePipeline::new(tracker, annotator))),
        log: SharedLog::new(),
        store,
        sink,
        confidence: SharedConfidence::new(cfg.confidence),
        status: Arc::new(RwLock::new(SessionStatus::default())),
        frame_delay: cfg.frame_delay,
        jpeg_quality: cfg.jpeg_quality,
    };
    let session = Arc::new(SessionService::new(ctx, Arc::new(MediaSourceFactory::new())));

    let state = HttpState {
        session: session.clone(),
        info: Arc::new(DashboardInfo {
            model: cfg.model.clone(),
            records_file: cfg.records_path.display().to_string(),
            default_camera_index: cfg.default_camera_index,
            ip_camera_placeholder: cfg.ip_camera_placeholder.clone(),
        }),
    };

    let app = router(state, cfg.max_upload_bytes()).fallback_service(ServeDir::new(&cfg.static_dir));

    tracing::info!("🚀 Servidor de seguimiento iniciado en http://{}", cfg.bind);
    tracing::info!("📂 Archivos estáticos servidos desde '{}'", cfg.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("No se pudo escuchar Ctrl+C: {}", e);
            }
        })
        .await?;

    // Detener la sesión activa guarda su registro antes de salir.
    session.shutdown().await?;
    tracing::info!("Servidor detenido");
    Ok(())
}
