//! Session Replay - view tree snapshot and mutation diffing engine
//!
//! This crate records the visual state of a UI hierarchy as a stream of replay
//! records:
//!
//! - **Capture**: a pre-order walk over the live hierarchy classifies every
//!   element and resolves its privacy, producing a [`ViewTreeSnapshot`]
//! - **Processing**: a single background worker turns snapshots into wireframes,
//!   extracts image resources and diffs consecutive captures
//! - **Segments**: records are batched per view into size and time bounded
//!   [`Segment`]s and handed to a transport
//!
//! # Architecture
//!
//! The [`RecordingCoordinator`] owns both phases. The only state shared between
//! them is the [`IdentityGenerator`], which gives every element a stable node id
//! for the lifetime of the session.

pub mod classifiers;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod element;
pub mod identity;
pub mod privacy;
pub mod processor;
pub mod recorder;
pub mod records;
pub mod resources;
pub mod segment;
pub mod snapshot;
pub mod telemetry;
pub mod touch;
pub mod types;
pub mod wireframe;

// Re-export commonly used types
pub use classifiers::{Classifier, ClassifierRegistry};
pub use config::Config;
pub use coordinator::{CaptureOutcome, RecordingCoordinator};
pub use diff::{diff, diff_wireframes, SnapshotDiffer};
pub use element::{ElementAttributes, ElementContent, ElementTree, UiElement};
pub use identity::IdentityGenerator;
pub use privacy::{PrivacyFilter, PrivacyOverrides, ResolvedPrivacy};
pub use processor::{CaptureRequest, Processor};
pub use recorder::Recorder;
pub use records::{MutationData, Record};
pub use resources::{
    Base64ImageDataProvider, EnrichedResource, ImageDataProvider, NoopResourcePipeline,
    ResourceExtractor, ResourcePipeline,
};
pub use segment::{ChannelSegmentTransport, Segment, SegmentBuilder, SegmentTransport};
pub use snapshot::{Node, NodeSemantics, ViewTreeSnapshot};
pub use telemetry::{Telemetry, TracingTelemetry};
pub use touch::{TouchEvent, TouchSampler, TouchSnapshot};
pub use types::{
    Color, ElementHandle, ImagePrivacyLevel, NodeId, Point, Rect, RecorderError,
    RecordingContext, Size, TextAndInputPrivacyLevel, TouchPrivacyLevel,
};
pub use wireframe::Wireframe;
