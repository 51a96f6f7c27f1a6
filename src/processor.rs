//! Background snapshot processing.
//!
//! The processor runs on the single serial worker. For every captured snapshot it
//! builds wireframes, moves image payloads to the resource pipeline, diffs against
//! the previous capture and appends the resulting records to the open segment.

use crate::config::Config;
use crate::diff::SnapshotDiffer;
use crate::records::{
    FocusData, IncrementalData, MetaData, PointerEventType, PointerInteractionData, PointerType,
    Record, ViewportResizeData,
};
use crate::resources::{EnrichedResource, ImageDataProvider, ResourceExtractor, ResourcePipeline};
use crate::segment::{SegmentBuilder, SegmentTransport};
use crate::snapshot::ViewTreeSnapshot;
use crate::telemetry::Telemetry;
use crate::touch::{TouchPhase, TouchSnapshot};
use crate::types::{NodeId, RecordingContext, Size};
use crate::wireframe::{Wireframe, WireframesBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// One unit of work for the background worker
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub snapshot: ViewTreeSnapshot,
    pub touches: Option<TouchSnapshot>,
}

/// Serial snapshot processor
pub struct Processor {
    images: Arc<dyn ImageDataProvider>,
    extractor: ResourceExtractor,
    differ: SnapshotDiffer,
    segments: SegmentBuilder,
    transport: Arc<dyn SegmentTransport>,
    pipeline: Arc<dyn ResourcePipeline>,
    last_context: Option<RecordingContext>,
    last_viewport: Option<Size>,
    /// Web view slots seen so far in the current view
    webview_slots: BTreeMap<i64, NodeId>,
}

impl Processor {
    pub fn new(
        config: &Config,
        images: Arc<dyn ImageDataProvider>,
        transport: Arc<dyn SegmentTransport>,
        pipeline: Arc<dyn ResourcePipeline>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            images,
            extractor: ResourceExtractor::new(config.resources.inline_images),
            differ: SnapshotDiffer::new(),
            segments: SegmentBuilder::new(&config.segment, &config.general.source, telemetry),
            transport,
            pipeline,
            last_context: None,
            last_viewport: None,
            webview_slots: BTreeMap::new(),
        }
    }

    /// Process one capture
    pub async fn process(&mut self, request: CaptureRequest) {
        let CaptureRequest { snapshot, touches } = request;
        let context = snapshot.context.clone();
        let timestamp = context.timestamp_ms();

        let is_new_view = self
            .last_context
            .as_ref()
            .map_or(true, |last| !last.same_view(&context));
        if is_new_view {
            let is_new_session = self
                .last_context
                .as_ref()
                .map_or(false, |last| last.session_id != context.session_id);
            if is_new_session {
                debug!(
                    "Session changed, forgetting {} known resources",
                    self.extractor.known_count()
                );
                self.extractor.reset();
            }
            if let Some(last) = self.last_context.take() {
                info!("View {} ended, starting view {}", last.view_id, context.view_id);
                self.push(&last, Record::ViewEnd { timestamp }).await;
                self.flush().await;
            }
            self.differ.reset();
            self.webview_slots.clear();
            self.last_viewport = None;
        }

        self.webview_slots
            .extend(snapshot.webview_slots.iter().map(|(slot, id)| (*slot, *id)));
        let mut builder = WireframesBuilder::new(self.images.as_ref(), self.webview_slots.clone());
        let mut wireframes = snapshot.build_wireframes(&mut builder);

        let resources = self.extractor.extract_all(&mut wireframes);
        if !resources.is_empty() {
            debug!("Submitting {} new resources", resources.len());
            let enriched = resources
                .into_iter()
                .map(|resource| EnrichedResource::new(resource, &context))
                .collect();
            self.pipeline.submit(enriched).await;
        }

        let pointer_records = touches
            .map(|touches| pointer_records(&touches, &context))
            .unwrap_or_default();

        let viewport_size = snapshot.viewport_size;
        let mut records = self.snapshot_records(wireframes, timestamp, viewport_size);

        // A new segment has to start with meta, focus and a full snapshot
        if self
            .segments
            .would_seal(&context, timestamp, records.len() + pointer_records.len())
        {
            self.flush().await;
            if let Some(full) = self.differ.full_snapshot(timestamp) {
                records = opening_records(timestamp, viewport_size, full);
            }
        }
        records.extend(pointer_records);

        trace!("Capture at {} produced {} records", timestamp, records.len());
        for record in records {
            self.push(&context, record).await;
        }

        self.last_viewport = Some(viewport_size);
        self.last_context = Some(context);
    }

    /// Diff `wireframes` and wrap the result in the records of one capture
    fn snapshot_records(
        &mut self,
        wireframes: Vec<Wireframe>,
        timestamp: i64,
        viewport_size: Size,
    ) -> Vec<Record> {
        let record = self.differ.diff(wireframes, timestamp);
        if record.is_full_snapshot() {
            return opening_records(timestamp, viewport_size, record);
        }

        let mut records = Vec::with_capacity(2);
        if self.last_viewport != Some(viewport_size) {
            records.push(viewport_resize_record(timestamp, viewport_size));
        }
        if !is_empty_mutation(&record) {
            records.push(record);
        }
        records
    }

    /// Seal the open segment and hand it to the transport
    pub async fn flush(&mut self) {
        if let Some(segment) = self.segments.seal() {
            self.transport.send(segment).await;
        }
    }

    async fn push(&mut self, context: &RecordingContext, record: Record) {
        if let Some(segment) = self.segments.push(context, record) {
            self.transport.send(segment).await;
        }
    }
}

fn is_empty_mutation(record: &Record) -> bool {
    matches!(
        record,
        Record::IncrementalSnapshot {
            data: IncrementalData::Mutation(mutation),
            ..
        } if mutation.is_empty()
    )
}

/// Meta and focus followed by `full_snapshot`
fn opening_records(timestamp: i64, viewport: Size, full_snapshot: Record) -> Vec<Record> {
    vec![
        meta_record(timestamp, viewport),
        Record::Focus {
            timestamp,
            data: FocusData { has_focus: true },
        },
        full_snapshot,
    ]
}

fn meta_record(timestamp: i64, viewport: Size) -> Record {
    Record::Meta {
        timestamp,
        data: MetaData {
            width: viewport.width.round() as i64,
            height: viewport.height.round() as i64,
            href: None,
        },
    }
}

fn viewport_resize_record(timestamp: i64, viewport: Size) -> Record {
    Record::IncrementalSnapshot {
        timestamp,
        data: IncrementalData::ViewportResize(ViewportResizeData {
            width: viewport.width.round() as i64,
            height: viewport.height.round() as i64,
        }),
    }
}

fn pointer_records(touches: &TouchSnapshot, context: &RecordingContext) -> Vec<Record> {
    touches
        .touches
        .iter()
        .map(|touch| Record::IncrementalSnapshot {
            timestamp: touch.date.timestamp_millis() + context.server_time_offset_ms,
            data: IncrementalData::PointerInteraction(PointerInteractionData {
                pointer_event_type: match touch.phase {
                    TouchPhase::Down => PointerEventType::Down,
                    TouchPhase::Move => PointerEventType::Move,
                    TouchPhase::Up => PointerEventType::Up,
                },
                pointer_type: PointerType::Touch,
                pointer_id: touch.id,
                x: touch.position.x,
                y: touch.position.y,
            }),
        })
        .collect()
}
