//! Record wire models.
//!
//! Every record carries a `timestamp` and an integer `type` discriminator;
//! incremental snapshot data carries an integer `source` discriminator.

use crate::types::NodeId;
use crate::wireframe::{
    ContentClip, ShapeBorder, ShapeStyle, TextPosition, TextStyle, Wireframe,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const RECORD_META: u8 = 4;
const RECORD_FOCUS: u8 = 6;
const RECORD_VIEW_END: u8 = 7;
const RECORD_VISUAL_VIEWPORT: u8 = 8;
const RECORD_FULL_SNAPSHOT: u8 = 10;
const RECORD_INCREMENTAL_SNAPSHOT: u8 = 11;

const SOURCE_MUTATION: u8 = 0;
const SOURCE_VIEWPORT_RESIZE: u8 = 4;
const SOURCE_POINTER_INTERACTION: u8 = 9;

/// One entry of the replay stream
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Meta {
        timestamp: i64,
        data: MetaData,
    },
    Focus {
        timestamp: i64,
        data: FocusData,
    },
    ViewEnd {
        timestamp: i64,
    },
    VisualViewport {
        timestamp: i64,
        data: VisualViewportData,
    },
    FullSnapshot {
        timestamp: i64,
        data: FullSnapshotData,
    },
    IncrementalSnapshot {
        timestamp: i64,
        data: IncrementalData,
    },
}

impl Record {
    pub fn timestamp(&self) -> i64 {
        match self {
            Record::Meta { timestamp, .. }
            | Record::Focus { timestamp, .. }
            | Record::ViewEnd { timestamp }
            | Record::VisualViewport { timestamp, .. }
            | Record::FullSnapshot { timestamp, .. }
            | Record::IncrementalSnapshot { timestamp, .. } => *timestamp,
        }
    }

    /// Integer discriminator written as `type`
    pub fn type_code(&self) -> u8 {
        match self {
            Record::Meta { .. } => RECORD_META,
            Record::Focus { .. } => RECORD_FOCUS,
            Record::ViewEnd { .. } => RECORD_VIEW_END,
            Record::VisualViewport { .. } => RECORD_VISUAL_VIEWPORT,
            Record::FullSnapshot { .. } => RECORD_FULL_SNAPSHOT,
            Record::IncrementalSnapshot { .. } => RECORD_INCREMENTAL_SNAPSHOT,
        }
    }

    pub fn is_full_snapshot(&self) -> bool {
        matches!(self, Record::FullSnapshot { .. })
    }

    pub fn full_snapshot(timestamp: i64, wireframes: Vec<Wireframe>) -> Self {
        Record::FullSnapshot {
            timestamp,
            data: FullSnapshotData { wireframes },
        }
    }

    pub fn mutation(timestamp: i64, mutation: MutationData) -> Self {
        Record::IncrementalSnapshot {
            timestamp,
            data: IncrementalData::Mutation(mutation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub width: i64,
    pub height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusData {
    pub has_focus: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualViewportData {
    pub width: f64,
    pub height: f64,
    pub offset_left: f64,
    pub offset_top: f64,
    pub page_left: f64,
    pub page_top: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullSnapshotData {
    pub wireframes: Vec<Wireframe>,
}

/// Payload of an incremental snapshot record
#[derive(Debug, Clone, PartialEq)]
pub enum IncrementalData {
    Mutation(MutationData),
    ViewportResize(ViewportResizeData),
    PointerInteraction(PointerInteractionData),
}

impl IncrementalData {
    pub fn source_code(&self) -> u8 {
        match self {
            IncrementalData::Mutation(_) => SOURCE_MUTATION,
            IncrementalData::ViewportResize(_) => SOURCE_VIEWPORT_RESIZE,
            IncrementalData::PointerInteraction(_) => SOURCE_POINTER_INTERACTION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportResizeData {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventType {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerInteractionData {
    pub pointer_event_type: PointerEventType,
    pub pointer_type: PointerType,
    pub pointer_id: i64,
    pub x: f64,
    pub y: f64,
}

/// Delta between two consecutive snapshots
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MutationData {
    pub adds: Vec<AddedNode>,
    pub removes: Vec<RemovedNode>,
    pub updates: Vec<WireframeUpdate>,
}

impl MutationData {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty() && self.updates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedNode {
    /// Wireframe this one is inserted after, `None` for the first position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_id: Option<NodeId>,
    pub wireframe: Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedNode {
    pub id: NodeId,
}

/// Partial wireframe: only fields that changed are set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireframeUpdate {
    Shape(ShapeWireframeUpdate),
    Text(TextWireframeUpdate),
    Image(ImageWireframeUpdate),
    Placeholder(PlaceholderWireframeUpdate),
    Webview(WebviewWireframeUpdate),
}

impl WireframeUpdate {
    pub fn id(&self) -> NodeId {
        match self {
            WireframeUpdate::Shape(u) => u.id,
            WireframeUpdate::Text(u) => u.id,
            WireframeUpdate::Image(u) => u.id,
            WireframeUpdate::Placeholder(u) => u.id,
            WireframeUpdate::Webview(u) => u.id,
        }
    }
}

/// Changed position and size fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl GeometryUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeWireframeUpdate {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: GeometryUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextWireframeUpdate {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: GeometryUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_position: Option<TextPosition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageWireframeUpdate {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: GeometryUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_empty: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderWireframeUpdate {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: GeometryUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebviewWireframeUpdate {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: GeometryUpdate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
}

#[derive(Serialize)]
struct TaggedRecord<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: u8,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: u8,
    timestamp: i64,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.type_code();
        let timestamp = self.timestamp();
        match self {
            Record::Meta { data, .. } => TaggedRecord { kind, timestamp, data: Some(data) }
                .serialize(serializer),
            Record::Focus { data, .. } => TaggedRecord { kind, timestamp, data: Some(data) }
                .serialize(serializer),
            Record::ViewEnd { .. } => TaggedRecord::<()> { kind, timestamp, data: None }
                .serialize(serializer),
            Record::VisualViewport { data, .. } => {
                TaggedRecord { kind, timestamp, data: Some(data) }.serialize(serializer)
            }
            Record::FullSnapshot { data, .. } => TaggedRecord { kind, timestamp, data: Some(data) }
                .serialize(serializer),
            Record::IncrementalSnapshot { data, .. } => {
                TaggedRecord { kind, timestamp, data: Some(data) }.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRecord::deserialize(deserializer)?;
        let timestamp = raw.timestamp;

        fn data<T: serde::de::DeserializeOwned, E: serde::de::Error>(
            value: Option<serde_json::Value>,
        ) -> Result<T, E> {
            let value = value.ok_or_else(|| E::missing_field("data"))?;
            serde_json::from_value(value).map_err(E::custom)
        }

        Ok(match raw.kind {
            RECORD_META => Record::Meta {
                timestamp,
                data: data::<_, D::Error>(raw.data)?,
            },
            RECORD_FOCUS => Record::Focus {
                timestamp,
                data: data::<_, D::Error>(raw.data)?,
            },
            RECORD_VIEW_END => Record::ViewEnd { timestamp },
            RECORD_VISUAL_VIEWPORT => Record::VisualViewport {
                timestamp,
                data: data::<_, D::Error>(raw.data)?,
            },
            RECORD_FULL_SNAPSHOT => Record::FullSnapshot {
                timestamp,
                data: data::<_, D::Error>(raw.data)?,
            },
            RECORD_INCREMENTAL_SNAPSHOT => Record::IncrementalSnapshot {
                timestamp,
                data: data::<_, D::Error>(raw.data)?,
            },
            other => {
                return Err(D::Error::custom(format!("unknown record type {}", other)));
            }
        })
    }
}

#[derive(Serialize)]
struct WithSource<'a, T: Serialize> {
    source: u8,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for IncrementalData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let source = self.source_code();
        match self {
            IncrementalData::Mutation(body) => WithSource { source, body }.serialize(serializer),
            IncrementalData::ViewportResize(body) => {
                WithSource { source, body }.serialize(serializer)
            }
            IncrementalData::PointerInteraction(body) => {
                WithSource { source, body }.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for IncrementalData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let source = value
            .get("source")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| D::Error::missing_field("source"))?;

        match u8::try_from(source) {
            Ok(SOURCE_MUTATION) => serde_json::from_value(value)
                .map(IncrementalData::Mutation)
                .map_err(D::Error::custom),
            Ok(SOURCE_VIEWPORT_RESIZE) => serde_json::from_value(value)
                .map(IncrementalData::ViewportResize)
                .map_err(D::Error::custom),
            Ok(SOURCE_POINTER_INTERACTION) => serde_json::from_value(value)
                .map(IncrementalData::PointerInteraction)
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom(format!(
                "unknown incremental source {}",
                source
            ))),
        }
    }
}
