//! Capture coordination.
//!
//! The coordinator owns both phases of a capture. Phase one walks the hierarchy
//! synchronously on the caller's (UI) context; phase two is handed to a single
//! background worker over a bounded channel, so consecutive snapshots are always
//! processed in order and never concurrently.

use crate::config::{BackpressurePolicy, Config};
use crate::element::UiElement;
use crate::identity::IdentityGenerator;
use crate::processor::{CaptureRequest, Processor};
use crate::recorder::Recorder;
use crate::resources::{ImageDataProvider, ResourcePipeline};
use crate::segment::SegmentTransport;
use crate::telemetry::Telemetry;
use crate::touch::TouchSampler;
use crate::types::{RecordingContext, Size};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Result of a capture trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Snapshot taken and queued for processing
    Captured,
    /// Dropped by the backpressure policy
    Skipped,
    /// Recording is disabled or stopped
    Disabled,
}

/// Drives capture cycles for one recording session
pub struct RecordingCoordinator {
    enabled: bool,
    backpressure: BackpressurePolicy,
    recorder: Recorder,
    touches: Arc<TouchSampler>,
    /// Requests queued or being processed
    in_flight: Arc<AtomicUsize>,
    tx: Option<mpsc::Sender<CaptureRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl RecordingCoordinator {
    /// Create the coordinator and spawn its worker on the current tokio runtime
    pub fn new(
        config: &Config,
        transport: Arc<dyn SegmentTransport>,
        pipeline: Arc<dyn ResourcePipeline>,
        images: Arc<dyn ImageDataProvider>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let identity = Arc::new(IdentityGenerator::new());
        let recorder = Recorder::new(config, identity, telemetry.clone());
        let processor = Processor::new(config, images, transport, pipeline, telemetry);

        let capacity = match config.capture.backpressure {
            BackpressurePolicy::Drop => 1,
            BackpressurePolicy::Queue => config.capture.queue_depth.max(1),
        };
        let (tx, rx) = mpsc::channel::<CaptureRequest>(capacity);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(run_worker(processor, rx, in_flight.clone()));

        info!(
            "Recording coordinator started ({:?} backpressure, capacity {})",
            config.capture.backpressure, capacity
        );

        Self {
            enabled: config.general.enabled,
            backpressure: config.capture.backpressure,
            recorder,
            touches: Arc::new(TouchSampler::new()),
            in_flight,
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Capture the hierarchy under `root`.
    ///
    /// Never blocks: when the worker cannot take the snapshot the cycle is
    /// skipped before the hierarchy is walked.
    pub fn capture<E: UiElement>(
        &self,
        root: &E,
        viewport_size: Size,
        context: &RecordingContext,
    ) -> CaptureOutcome {
        let tx = match (&self.tx, self.enabled) {
            (Some(tx), true) => tx,
            _ => return CaptureOutcome::Disabled,
        };

        if self.backpressure == BackpressurePolicy::Drop
            && self.in_flight.load(Ordering::SeqCst) > 0
        {
            debug!("Previous snapshot still processing, skipping capture");
            return CaptureOutcome::Skipped;
        }

        let permit = match tx.try_reserve() {
            Ok(permit) => permit,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Capture queue full, skipping capture");
                return CaptureOutcome::Skipped;
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("Recording worker gone, capture disabled");
                return CaptureOutcome::Disabled;
            }
        };

        let snapshot = self.recorder.record(root, viewport_size, context);
        let touches = self.touches.take_snapshot(context);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        permit.send(CaptureRequest { snapshot, touches });

        debug!("Captured snapshot for view {}", context.view_id);
        CaptureOutcome::Captured
    }

    /// Touch sampler feeding pointer records
    pub fn touches(&self) -> &Arc<TouchSampler> {
        &self.touches
    }

    /// Identity generator shared by both phases
    pub fn identity(&self) -> &Arc<IdentityGenerator> {
        self.recorder.identity()
    }

    /// Requests queued or being processed
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    /// Stop recording.
    ///
    /// Queued snapshots are processed and the open segment is sealed and sent
    /// before this returns.
    pub async fn stop(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("Recording worker failed: {}", e);
            }
        }
        info!("Recording coordinator stopped");
    }
}

async fn run_worker(
    mut processor: Processor,
    mut rx: mpsc::Receiver<CaptureRequest>,
    in_flight: Arc<AtomicUsize>,
) {
    while let Some(request) = rx.recv().await {
        processor.process(request).await;
        in_flight.fetch_sub(1, Ordering::SeqCst);
    }
    processor.flush().await;
    debug!("Recording worker drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::tests::recording_context;
    use crate::element::{ElementContent, ElementTree};
    use crate::resources::{Base64ImageDataProvider, NoopResourcePipeline};
    use crate::segment::{ChannelSegmentTransport, Segment};
    use crate::telemetry::TracingTelemetry;
    use crate::touch::{TouchEvent, TouchPhase};
    use crate::types::{Color, Point, Rect};

    fn coordinator(config: Config) -> (RecordingCoordinator, mpsc::Receiver<Segment>) {
        let (tx, rx) = mpsc::channel(64);
        let coordinator = RecordingCoordinator::new(
            &config,
            Arc::new(ChannelSegmentTransport::new(tx)),
            Arc::new(NoopResourcePipeline),
            Arc::new(Base64ImageDataProvider),
            Arc::new(TracingTelemetry),
        );
        (coordinator, rx)
    }

    fn tree(color: Color) -> ElementTree {
        let mut tree = ElementTree::new(1, Rect::new(0.0, 0.0, 100.0, 100.0), ElementContent::Container);
        tree.attributes.background_color = Some(color);
        tree
    }

    fn viewport() -> Size {
        Size::new(100.0, 100.0)
    }

    #[tokio::test]
    async fn test_stop_flushes_open_segment() {
        let (mut coordinator, mut rx) = coordinator(Config::default());
        let context = recording_context();
        assert_eq!(coordinator.capture(&tree(Color::WHITE), viewport(), &context), CaptureOutcome::Captured);

        coordinator.stop().await;
        assert!(!coordinator.is_running());

        let segment = rx.recv().await.unwrap();
        assert!(segment.has_full_snapshot);
        assert_eq!(segment.records_count, 3);
        assert_eq!(coordinator.capture(&tree(Color::WHITE), viewport(), &context), CaptureOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_drop_policy_skips_while_in_flight() {
        let (mut coordinator, _rx) = coordinator(Config::default());
        let context = recording_context();

        // The worker cannot run before the test yields
        assert_eq!(coordinator.capture(&tree(Color::WHITE), viewport(), &context), CaptureOutcome::Captured);
        assert_eq!(coordinator.capture(&tree(Color::BLACK), viewport(), &context), CaptureOutcome::Skipped);
        assert_eq!(coordinator.in_flight(), 1);

        coordinator.stop().await;
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_queue_policy_bounded_by_depth() {
        let mut config = Config::default();
        config.capture.backpressure = BackpressurePolicy::Queue;
        config.capture.queue_depth = 2;
        let (mut coordinator, mut rx) = coordinator(config);
        let context = recording_context();

        assert_eq!(coordinator.capture(&tree(Color::WHITE), viewport(), &context), CaptureOutcome::Captured);
        assert_eq!(coordinator.capture(&tree(Color::BLACK), viewport(), &context), CaptureOutcome::Captured);
        assert_eq!(coordinator.capture(&tree(Color::WHITE), viewport(), &context), CaptureOutcome::Skipped);

        coordinator.stop().await;
        let records = rx.recv().await.unwrap().decode_records().unwrap();
        let codes: Vec<u8> = records.iter().map(|r| r.type_code()).collect();
        assert_eq!(codes, vec![4, 6, 10, 11]);
    }

    #[tokio::test]
    async fn test_disabled_config() {
        let mut config = Config::default();
        config.general.enabled = false;
        let (mut coordinator, _rx) = coordinator(config);
        let outcome = coordinator.capture(&tree(Color::WHITE), viewport(), &recording_context());
        assert_eq!(outcome, CaptureOutcome::Disabled);
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn test_touches_flow_into_segment() {
        let (mut coordinator, mut rx) = coordinator(Config::default());
        let context = recording_context();
        coordinator.touches().record(TouchEvent {
            id: 1,
            phase: TouchPhase::Down,
            position: Point::new(1.0, 2.0),
            date: context.date,
            privacy_override: None,
        });

        coordinator.capture(&tree(Color::WHITE), viewport(), &context);
        coordinator.stop().await;

        let segment = rx.recv().await.unwrap();
        assert_eq!(segment.records_count, 4);
        assert_eq!(coordinator.touches().pending(), 0);
    }
}
