//! Core types used throughout the session replay engine.
//!
//! This module defines geometry primitives, element and node identifiers,
//! privacy levels and the recording context supplied by the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a recorded node (and of the wireframes it produces)
pub type NodeId = i64;

/// Handle of a live UI element, issued by the host hierarchy.
///
/// The host may reuse a `slot` after an element is destroyed, but it must bump
/// the `generation` when it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ElementHandle {
    pub slot: u32,
    #[serde(default)]
    pub generation: u32,
}

impl ElementHandle {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }
}

/// A point in the root coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height, never negative
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: non_negative(width),
            height: non_negative(height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle (origin at top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle; negative or NaN sizes are clamped to zero
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: finite_or_zero(x),
            y: finite_or_zero(y),
            width: non_negative(width),
            height: non_negative(height),
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// A rectangle with no area
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Translate the rectangle by the given offset
    pub fn offset_by(&self, origin: Point) -> Rect {
        Rect::new(self.x + origin.x, self.y + origin.y, self.width, self.height)
    }

    /// Intersect two rectangles.
    ///
    /// Disjoint rectangles produce an empty rectangle anchored at the
    /// nearest corner of the overlap region.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x1 = self.min_x().max(other.min_x());
        let y1 = self.min_y().max(other.min_y());
        let x2 = self.max_x().min(other.max_x());
        let y2 = self.max_y().min(other.max_y());
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Check if both rectangles share a non-empty area
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Check if `other` lies fully inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.min_y() >= self.min_y()
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Check if a point is inside this rectangle
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }
}

/// RGBA colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Format as `#RRGGBBAA`
    pub fn hex_string(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            channel(self.r),
            channel(self.g),
            channel(self.b),
            channel(self.a)
        )
    }
}

fn channel(value: f64) -> u8 {
    (finite_or_zero(value).clamp(0.0, 1.0) * 255.0).round() as u8
}

fn opaque() -> f64 {
    1.0
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

/// Privacy level for static text and text inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAndInputPrivacyLevel {
    /// Only inputs flagged as sensitive (passwords, emails, phone numbers) are masked
    MaskSensitiveInputs,
    /// Every text input is masked, static text is shown
    MaskAllInputs,
    /// All text is masked
    #[default]
    MaskAll,
}

/// Privacy level for images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePrivacyLevel {
    /// Only images shipped with the app are recorded
    MaskNonBundledOnly,
    /// No image content is recorded
    #[default]
    MaskAll,
    /// Every image is recorded
    MaskNone,
}

/// Privacy level for touch positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPrivacyLevel {
    Show,
    #[default]
    Hide,
}

/// Context supplied by the host view-tracking system at the start of every capture
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingContext {
    pub text_and_input_privacy: TextAndInputPrivacyLevel,
    pub image_privacy: ImagePrivacyLevel,
    pub touch_privacy: TouchPrivacyLevel,
    pub application_id: String,
    pub session_id: String,
    pub view_id: String,
    /// Offset between device clock and server clock in milliseconds
    pub server_time_offset_ms: i64,
    pub date: DateTime<Utc>,
}

impl RecordingContext {
    /// Record timestamp in UTC milliseconds, corrected by the server time offset
    pub fn timestamp_ms(&self) -> i64 {
        self.date.timestamp_millis() + self.server_time_offset_ms
    }

    /// Check if both contexts describe the same application, session and view
    pub fn same_view(&self, other: &RecordingContext) -> bool {
        self.application_id == other.application_id
            && self.session_id == other.session_id
            && self.view_id == other.view_id
    }
}

/// Errors that can occur while recording
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Failed to read element attributes: {0}")]
    AttributeRead(String),

    #[error("Classifier '{classifier}' failed: {reason}")]
    Classification {
        classifier: &'static str,
        reason: String,
    },
}
