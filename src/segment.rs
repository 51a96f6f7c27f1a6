//! Segment batching.
//!
//! Records of one view are accumulated until a record-count or duration budget is
//! exceeded, or the view changes, then sealed into an immutable [`Segment`] for
//! the transport.

use crate::config::SegmentConfig;
use crate::records::Record;
use crate::telemetry::Telemetry;
use crate::types::RecordingContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors that can occur while building segments
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("Failed to encode record: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Record encoder rejected record of type {0}")]
    Rejected(u8),
}

/// Identifier wrapper used for application, session and view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityId {
    pub id: String,
}

impl EntityId {
    fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// Sealed batch of records for one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub application: EntityId,
    pub session: EntityId,
    pub view: EntityId,
    /// Timestamp of the earliest record (ms)
    pub start: i64,
    /// Timestamp of the latest record (ms)
    pub end: i64,
    pub has_full_snapshot: bool,
    /// Position of this segment among the segments of its view, from 0
    pub index_in_view: u64,
    pub records: Vec<serde_json::Value>,
    pub records_count: usize,
    pub source: String,
}

impl Segment {
    /// Decode the encoded records back into records
    pub fn decode_records(&self) -> Result<Vec<Record>, serde_json::Error> {
        self.records
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect()
    }
}

/// Encodes one record for inclusion in a segment
pub trait RecordEncoder: Send + Sync {
    fn encode(&self, record: &Record) -> Result<serde_json::Value, SegmentError>;
}

/// Encodes records with their serde representation
#[derive(Debug, Default)]
pub struct JsonRecordEncoder;

impl RecordEncoder for JsonRecordEncoder {
    fn encode(&self, record: &Record) -> Result<serde_json::Value, SegmentError> {
        Ok(serde_json::to_value(record)?)
    }
}

/// Consumer of sealed segments
#[async_trait]
pub trait SegmentTransport: Send + Sync {
    async fn send(&self, segment: Segment);
}

/// Forwards sealed segments into a channel
pub struct ChannelSegmentTransport {
    tx: mpsc::Sender<Segment>,
}

impl ChannelSegmentTransport {
    pub fn new(tx: mpsc::Sender<Segment>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SegmentTransport for ChannelSegmentTransport {
    async fn send(&self, segment: Segment) {
        if let Err(e) = self.tx.send(segment).await {
            warn!("Segment receiver dropped: {}", e);
        }
    }
}

struct OpenSegment {
    application_id: String,
    session_id: String,
    view_id: String,
    start: i64,
    end: i64,
    has_full_snapshot: bool,
    records: Vec<serde_json::Value>,
}

impl OpenSegment {
    fn new(context: &RecordingContext, timestamp: i64) -> Self {
        Self {
            application_id: context.application_id.clone(),
            session_id: context.session_id.clone(),
            view_id: context.view_id.clone(),
            start: timestamp,
            end: timestamp,
            has_full_snapshot: false,
            records: Vec::new(),
        }
    }

    fn belongs_to(&self, context: &RecordingContext) -> bool {
        self.application_id == context.application_id
            && self.session_id == context.session_id
            && self.view_id == context.view_id
    }
}

/// Accumulates records into segments
pub struct SegmentBuilder {
    max_records: usize,
    max_duration_ms: i64,
    source: String,
    encoder: Box<dyn RecordEncoder>,
    telemetry: Arc<dyn Telemetry>,
    current: Option<OpenSegment>,
    /// Next `index_in_view` per view id
    next_index: HashMap<String, u64>,
}

impl SegmentBuilder {
    pub fn new(config: &SegmentConfig, source: &str, telemetry: Arc<dyn Telemetry>) -> Self {
        Self::with_encoder(config, source, Box::new(JsonRecordEncoder), telemetry)
    }

    pub fn with_encoder(
        config: &SegmentConfig,
        source: &str,
        encoder: Box<dyn RecordEncoder>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            max_records: config.max_records.max(1),
            max_duration_ms: config.max_duration_ms,
            source: source.to_string(),
            encoder,
            telemetry,
            current: None,
            next_index: HashMap::new(),
        }
    }

    /// Records in the open segment
    pub fn pending(&self) -> usize {
        self.current.as_ref().map_or(0, |segment| segment.records.len())
    }

    /// Whether adding `count` records at `timestamp` for `context` would seal the
    /// open segment first
    pub fn would_seal(&self, context: &RecordingContext, timestamp: i64, count: usize) -> bool {
        match &self.current {
            Some(segment) => {
                !segment.belongs_to(context)
                    || segment.records.len() + count > self.max_records
                    || timestamp - segment.start > self.max_duration_ms
            }
            None => false,
        }
    }

    /// Add a record, sealing the open segment first if the record does not fit.
    ///
    /// Returns the sealed segment, if any. A record that fails to encode is
    /// dropped and reported.
    pub fn push(&mut self, context: &RecordingContext, record: Record) -> Option<Segment> {
        let encoded = match self.encoder.encode(&record) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.telemetry.error(
                    &format!("Dropped record of type {}: {}", record.type_code(), e),
                    "serialization",
                );
                return None;
            }
        };

        let timestamp = record.timestamp();
        let sealed = if self.would_seal(context, timestamp, 1) {
            self.seal()
        } else {
            None
        };

        let segment = self
            .current
            .get_or_insert_with(|| OpenSegment::new(context, timestamp));
        segment.start = segment.start.min(timestamp);
        segment.end = segment.end.max(timestamp);
        segment.has_full_snapshot |= record.is_full_snapshot();
        segment.records.push(encoded);

        sealed
    }

    /// Seal the open segment, if it holds any record
    pub fn seal(&mut self) -> Option<Segment> {
        let open = self.current.take()?;
        if open.records.is_empty() {
            return None;
        }

        let index = self.next_index.entry(open.view_id.clone()).or_insert(0);
        let index_in_view = *index;
        *index += 1;

        debug!(
            "Sealed segment {} of view {} with {} records",
            index_in_view,
            open.view_id,
            open.records.len()
        );

        Some(Segment {
            application: EntityId::new(&open.application_id),
            session: EntityId::new(&open.session_id),
            view: EntityId::new(&open.view_id),
            start: open.start,
            end: open.end,
            has_full_snapshot: open.has_full_snapshot,
            index_in_view,
            records_count: open.records.len(),
            records: open.records,
            source: self.source.clone(),
        })
    }
}
