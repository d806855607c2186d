//! Dobles de prueba para los puertos de la aplicación.

use image::RgbImage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

use super::annotator::FrameAnnotator;
use super::drivers::{CancellationToken, DriverContext};
use super::pipeline::FramePipeline;
use super::ports::{FrameSinkPort, FrameSource, RecordStorePort, SourceFactoryPort, TrackerPort};
use crate::domain::{
    detection::{BoundingBox, TrackedBox},
    errors::{DomainError, DomainResult},
    frame::RawFrame,
    model::{class_name, ConfidenceThreshold, SharedConfidence},
    record::FrameRecord,
    session::SharedLog,
    source::{CameraSelection, SessionStatus},
    stream::{StatusLevel, StreamEvent},
};

pub fn blank_frame() -> RawFrame {
    RawFrame::rgb(RgbImage::new(64, 48))
}

pub fn tracked(id: u32, class_id: usize) -> TrackedBox {
    TrackedBox { bbox: BoundingBox::new(100, 100, 200, 220), track_id: Some(id), class_id, score: 0.8 }
}

/// Devuelve, frame a frame, las detecciones del guion. Agotado el guion, no detecta nada.
pub struct ScriptedTracker {
    script: VecDeque<Vec<TrackedBox>>,
    resets: Arc<AtomicUsize>,
    confidences: Arc<Mutex<Vec<f32>>>,
}

impl ScriptedTracker {
    pub fn new(script: Vec<Vec<TrackedBox>>) -> Self {
        Self {
            script: script.into(),
            resets: Arc::new(AtomicUsize::new(0)),
            confidences: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn resets(&self) -> Arc<AtomicUsize> {
        self.resets.clone()
    }

    pub fn confidences(&self) -> Arc<Mutex<Vec<f32>>> {
        self.confidences.clone()
    }
}

impl TrackerPort for ScriptedTracker {
    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn track(&mut self, _frame: &RgbImage, confidence: f32) -> DomainResult<Vec<TrackedBox>> {
        self.confidences.lock().unwrap().push(confidence);
        Ok(self.script.pop_front().unwrap_or_default())
    }

    fn class_name(&self, class_id: usize) -> String {
        class_name(class_id)
    }
}

pub struct ScriptedSource {
    limit: Option<usize>,
    fail_at_end: bool,
    cancel_after: Option<(usize, CancellationToken)>,
    delivered: usize,
}

impl ScriptedSource {
    pub fn frames(n: usize) -> Box<Self> {
        Box::new(Self { limit: Some(n), fail_at_end: false, cancel_after: None, delivered: 0 })
    }

    pub fn endless() -> Box<Self> {
        Box::new(Self { limit: None, fail_at_end: false, cancel_after: None, delivered: 0 })
    }

    /// Fuente infinita que dispara `cancel` al entregar el frame `n`.
    pub fn cancel_after(n: usize, cancel: CancellationToken) -> Box<Self> {
        Box::new(Self { limit: None, fail_at_end: false, cancel_after: Some((n, cancel)), delivered: 0 })
    }

    pub fn then_fail(mut self: Box<Self>) -> Box<Self> {
        self.fail_at_end = true;
        self
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> DomainResult<Option<RawFrame>> {
        if let Some(limit) = self.limit {
            if self.delivered >= limit {
                return if self.fail_at_end {
                    Err(DomainError::StreamInterrupted("lectura fallida".into()))
                } else {
                    Ok(None)
                };
            }
        }
        self.delivered += 1;
        if let Some((n, cancel)) = &self.cancel_after {
            if self.delivered >= *n {
                cancel.cancel();
            }
        }
        Ok(Some(blank_frame()))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<Vec<FrameRecord>>>,
}

impl MemoryStore {
    pub fn writes(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Vec<FrameRecord>> {
        self.writes.lock().unwrap().last().cloned()
    }
}

impl RecordStorePort for MemoryStore {
    fn persist(&self, records: &[FrameRecord]) -> DomainResult<()> {
        self.writes.lock().unwrap().push(records.to_vec());
        Ok(())
    }

    fn load(&self) -> DomainResult<Option<Vec<u8>>> {
        Ok(self.last().map(|r| serde_json::to_vec(&r).unwrap()))
    }

    fn exists(&self) -> bool {
        self.writes() > 0
    }
}

pub struct RecordingSink {
    events: Mutex<Vec<StreamEvent>>,
    tx: broadcast::Sender<StreamEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { events: Mutex::new(Vec::new()), tx }
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FrameSinkPort for RecordingSink {
    fn publish(&self, event: StreamEvent) {
        self.events.lock().unwrap().push(event.clone());
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}

/// Fábrica de fuentes: las cámaras son infinitas, un vídeo tiene tantos frames como bytes.
#[derive(Default)]
pub struct FakeFactory {
    fail_cameras: AtomicBool,
    opened: AtomicUsize,
}

impl FakeFactory {
    pub fn fail_cameras(&self) {
        self.fail_cameras.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl SourceFactoryPort for FakeFactory {
    fn decode_image(&self, bytes: &[u8]) -> DomainResult<RawFrame> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidInput("imagen vacía".into()));
        }
        Ok(blank_frame())
    }

    fn open_video(&self, bytes: Vec<u8>) -> DomainResult<Box<dyn FrameSource>> {
        Ok(ScriptedSource::frames(bytes.len()))
    }

    fn open_camera(&self, camera: &CameraSelection) -> DomainResult<Box<dyn FrameSource>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_cameras.load(Ordering::SeqCst) {
            return Err(DomainError::SourceUnavailable(camera.describe()));
        }
        Ok(ScriptedSource::endless())
    }
}

pub struct Harness {
    pub ctx: DriverContext,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub factory: Arc<FakeFactory>,
}

impl Harness {
    pub fn new(tracker: ScriptedTracker) -> Self {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = FramePipeline::new(Box::new(tracker), FrameAnnotator::new(None));
        let ctx = DriverContext {
            pipeline: Arc::new(Mutex::new(pipeline)),
            log: SharedLog::new(),
            store: store.clone(),
            sink: sink.clone(),
            confidence: SharedConfidence::new(ConfidenceThreshold::default()),
            status: Arc::new(RwLock::new(SessionStatus::default())),
            frame_delay: Duration::ZERO,
            jpeg_quality: 70,
        };
        Self { ctx, store, sink, factory: Arc::new(FakeFactory::default()) }
    }

    pub fn status(&self) -> SessionStatus {
        self.ctx.status.read().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(StatusLevel, String)> {
        self.sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::Status { level, message } => Some((level, message)),
                _ => None,
            })
            .collect()
    }

    pub fn published_frames(&self) -> Vec<u64> {
        self.sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::Frame { meta, .. } => Some(meta.frame),
                _ => None,
            })
            .collect()
    }
}
