//! Touch sampling.
//!
//! Touches are buffered as they happen, independently of view tree capture, and
//! drained into a [`TouchSnapshot`] on each capture cycle.

use crate::types::{Point, RecordingContext, TouchPrivacyLevel};
use crate::privacy::should_record_touch;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Phase of a touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    Down,
    Move,
    Up,
}

/// One sampled touch position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Pointer id, stable for the lifetime of one touch
    pub id: i64,
    pub phase: TouchPhase,
    /// Position in the root coordinate space
    pub position: Point,
    pub date: DateTime<Utc>,
    /// Privacy override of the touched element, if any
    #[serde(default)]
    pub privacy_override: Option<TouchPrivacyLevel>,
}

/// Touches sampled since the previous capture
#[derive(Debug, Clone, PartialEq)]
pub struct TouchSnapshot {
    /// Date of the earliest touch
    pub date: DateTime<Utc>,
    pub touches: Vec<TouchEvent>,
}

/// Buffers touches until the next capture cycle
#[derive(Debug, Default)]
pub struct TouchSampler {
    buffer: Mutex<Vec<TouchEvent>>,
}

impl TouchSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer one touch
    pub fn record(&self, event: TouchEvent) {
        trace!("Touch {} {:?} at {:?}", event.id, event.phase, event.position);
        self.buffer.lock().push(event);
    }

    /// Number of buffered touches
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Drain the buffer into a snapshot.
    ///
    /// Touches resolved to `hide` (their own override first, then the session
    /// level) are dropped. Returns `None` when nothing remains.
    pub fn take_snapshot(&self, context: &RecordingContext) -> Option<TouchSnapshot> {
        let touches: Vec<TouchEvent> = std::mem::take(&mut *self.buffer.lock())
            .into_iter()
            .filter(|touch| {
                should_record_touch(touch.privacy_override.unwrap_or(context.touch_privacy))
            })
            .collect();

        let date = touches.iter().map(|touch| touch.date).min()?;
        Some(TouchSnapshot { date, touches })
    }
}
