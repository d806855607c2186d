use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::storage::RECORDS_FILE_NAME;
use crate::domain::model::{ConfidenceThreshold, DetectorParams, ModelId, TrackerParams};

const DEFAULT_BIND: &str = "0.0.0.0:8090";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_MODEL_NAME: &str = "yolov8m";
const DEFAULT_MODEL_PATH: &str = "models/yolov8m.onnx";
const DEFAULT_IP_PLACEHOLDER: &str = "http://192.168.1.100:8080/video";
const DEFAULT_MAX_UPLOAD_MB: usize = 200;
const DEFAULT_FRAME_DELAY_MS: u64 = 5;
const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Dashboard de detección y seguimiento YOLO.
#[derive(Debug, Parser, Default)]
#[command(version, about)]
pub struct Cli {
    /// Fichero TOML de configuración.
    #[arg(long, env = "TRACKER_CONFIG")]
    pub config: Option<PathBuf>,
    /// Dirección de escucha, p. ej. 0.0.0.0:8090.
    #[arg(long)]
    pub bind: Option<String>,
    /// Ruta del modelo .onnx.
    #[arg(long)]
    pub model: Option<String>,
    /// Ruta del fichero de registros de seguimiento.
    #[arg(long)]
    pub records: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    server: Option<ServerConfigFile>,
    model: Option<ModelConfigFile>,
    tracker: Option<TrackerConfigFile>,
    session: Option<SessionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    bind: Option<String>,
    static_dir: Option<PathBuf>,
    max_upload_mb: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    name: Option<String>,
    onnx_path: Option<String>,
    input_size: Option<u32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    match_iou: Option<f32>,
    max_lost_frames: Option<u32>,
    min_hits: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    confidence: Option<f32>,
    frame_delay_ms: Option<u64>,
    jpeg_quality: Option<u8>,
    records_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
    default_camera_index: Option<u32>,
    ip_camera_placeholder: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub static_dir: PathBuf,
    pub max_upload_mb: usize,
    pub model: ModelId,
    pub detector: DetectorParams,
    pub tracker: TrackerParams,
    pub confidence: ConfidenceThreshold,
    pub frame_delay: Duration,
    pub jpeg_quality: u8,
    pub records_path: PathBuf,
    pub font_path: Option<PathBuf>,
    pub default_camera_index: u32,
    pub ip_camera_placeholder: String,
}

impl AppConfig {
    /// Defaults -> TOML -> variables de entorno -> flags, y validación.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match cli.config.as_deref() {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file)?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.apply_cli(cli);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let server = file.server.unwrap_or_default();
        let model = file.model.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        let session = file.session.unwrap_or_default();

        let detector_defaults = DetectorParams::default();
        let tracker_defaults = TrackerParams::default();

        let confidence = match session.confidence {
            Some(value) => ConfidenceThreshold::new(value).map_err(|e| anyhow!("[session] {e}"))?,
            None => ConfidenceThreshold::default(),
        };

        Ok(Self {
            bind: server.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            static_dir: server.static_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            max_upload_mb: server.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB),
            model: ModelId {
                name: model.name.unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
                onnx_path: model.onnx_path.unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            },
            detector: DetectorParams {
                input_size: model.input_size.unwrap_or(detector_defaults.input_size),
                iou_threshold: model.iou_threshold.unwrap_or(detector_defaults.iou_threshold),
                max_detections: model.max_detections.unwrap_or(detector_defaults.max_detections),
            },
            tracker: TrackerParams {
                match_iou: tracker.match_iou.unwrap_or(tracker_defaults.match_iou),
                max_lost_frames: tracker.max_lost_frames.unwrap_or(tracker_defaults.max_lost_frames),
                min_hits: tracker.min_hits.unwrap_or(tracker_defaults.min_hits),
            },
            confidence,
            frame_delay: Duration::from_millis(session.frame_delay_ms.unwrap_or(DEFAULT_FRAME_DELAY_MS)),
            jpeg_quality: session.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            records_path: session.records_path.unwrap_or_else(|| PathBuf::from(RECORDS_FILE_NAME)),
            font_path: session.font_path,
            default_camera_index: session.default_camera_index.unwrap_or(0),
            ip_camera_placeholder: session
                .ip_camera_placeholder
                .unwrap_or_else(|| DEFAULT_IP_PLACEHOLDER.to_string()),
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = non_empty("TRACKER_BIND") {
            self.bind = bind;
        }
        if let Some(model) = non_empty("TRACKER_MODEL") {
            self.model.onnx_path = model;
        }
        if let Some(records) = non_empty("TRACKER_RECORDS") {
            self.records_path = PathBuf::from(records);
        }
        if let Some(conf) = non_empty("TRACKER_CONFIDENCE") {
            let value: f32 = conf
                .trim()
                .parse()
                .map_err(|_| anyhow!("TRACKER_CONFIDENCE debe ser un número"))?;
            self.confidence = ConfidenceThreshold::new(value).map_err(|e| anyhow!("TRACKER_CONFIDENCE: {e}"))?;
        }
        Ok(())
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.bind = bind.clone();
        }
        if let Some(model) = &cli.model {
            self.model.onnx_path = model.clone();
        }
        if let Some(records) = &cli.records {
            self.records_path = records.clone();
        }
    }

    fn validate(&self) -> Result<()> {
        if self.bind.trim().is_empty() {
            return Err(anyhow!("la dirección de escucha no puede estar vacía"));
        }
        if self.max_upload_mb == 0 {
            return Err(anyhow!("max_upload_mb debe ser mayor que cero"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow!("jpeg_quality debe estar entre 1 y 100"));
        }
        if self.detector.input_size == 0 || self.detector.input_size % 32 != 0 {
            return Err(anyhow!("input_size debe ser múltiplo de 32"));
        }
        if let Some(font) = &self.font_path {
            if !font.is_file() {
                return Err(anyhow!("fuente no encontrada: {}", font.display()));
            }
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) || !(0.0..=1.0).contains(&self.tracker.match_iou) {
            return Err(anyhow!("los umbrales IoU deben estar en [0, 1]"));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("leyendo configuración {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("configuración inválida en {}", path.display()))
}
