//! Snapshot differ.
//!
//! Compares consecutive wireframe lists by id. The first capture (or the first
//! after a reset) yields a full snapshot record; later captures yield a mutation
//! record with adds, removes and partial updates. Changes that a mutation cannot
//! express (reordered survivors, a wireframe changing kind, duplicate ids) fall
//! back to a full snapshot.

use crate::records::{
    AddedNode, GeometryUpdate, ImageWireframeUpdate, MutationData, PlaceholderWireframeUpdate,
    Record, RemovedNode, ShapeWireframeUpdate, TextWireframeUpdate, WebviewWireframeUpdate,
    WireframeUpdate,
};
use crate::resources::ImageDataProvider;
use crate::snapshot::ViewTreeSnapshot;
use crate::types::NodeId;
use crate::wireframe::{
    ContentClip, Geometry, ShapeBorder, ShapeStyle, TextPosition, Wireframe, WireframesBuilder,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Diff two snapshots, building their wireframes with `images`.
///
/// Without a previous snapshot the result is a full snapshot record.
pub fn diff(
    previous: Option<&ViewTreeSnapshot>,
    current: &ViewTreeSnapshot,
    images: &dyn ImageDataProvider,
) -> Record {
    let build = |snapshot: &ViewTreeSnapshot| {
        let mut builder = WireframesBuilder::new(images, snapshot.webview_slots.clone());
        snapshot.build_wireframes(&mut builder)
    };
    let previous = previous.map(build);
    let current_wireframes = build(current);
    diff_wireframes(
        previous.as_deref(),
        &current_wireframes,
        current.context.timestamp_ms(),
    )
}

/// Diff two wireframe lists
pub fn diff_wireframes(
    previous: Option<&[Wireframe]>,
    current: &[Wireframe],
    timestamp: i64,
) -> Record {
    let previous = match previous {
        Some(previous) => previous,
        None => return Record::full_snapshot(timestamp, current.to_vec()),
    };

    match mutation(previous, current) {
        Some(mutation) => Record::mutation(timestamp, mutation),
        None => Record::full_snapshot(timestamp, current.to_vec()),
    }
}

/// Stateful differ holding the last wireframes it saw
#[derive(Debug, Default)]
pub struct SnapshotDiffer {
    previous: Option<Vec<Wireframe>>,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff against the previous call and remember `current`
    pub fn diff(&mut self, current: Vec<Wireframe>, timestamp: i64) -> Record {
        let record = diff_wireframes(self.previous.as_deref(), &current, timestamp);
        self.previous = Some(current);
        record
    }

    /// Forget the previous wireframes so the next diff is a full snapshot
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Full snapshot of the wireframes last passed to [`diff`](Self::diff).
    ///
    /// They stay the baseline for the next diff.
    pub fn full_snapshot(&self, timestamp: i64) -> Option<Record> {
        self.previous
            .as_ref()
            .map(|previous| Record::full_snapshot(timestamp, previous.clone()))
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// `None` when the change cannot be expressed as a mutation
fn mutation(previous: &[Wireframe], current: &[Wireframe]) -> Option<MutationData> {
    let previous_by_id: HashMap<NodeId, &Wireframe> =
        previous.iter().map(|w| (w.id(), w)).collect();
    if previous_by_id.len() != previous.len() {
        debug!("Duplicate ids in previous wireframes, sending full snapshot");
        return None;
    }

    let mut current_ids = HashSet::with_capacity(current.len());
    for wireframe in current {
        if !current_ids.insert(wireframe.id()) {
            debug!("Duplicate id {} in wireframes, sending full snapshot", wireframe.id());
            return None;
        }
    }

    let survivors_before = previous
        .iter()
        .map(Wireframe::id)
        .filter(|id| current_ids.contains(id));
    let survivors_after = current
        .iter()
        .map(Wireframe::id)
        .filter(|id| previous_by_id.contains_key(id));
    if !survivors_before.eq(survivors_after) {
        debug!("Wireframes reordered, sending full snapshot");
        return None;
    }

    let mut mutation = MutationData {
        removes: previous
            .iter()
            .map(Wireframe::id)
            .filter(|id| !current_ids.contains(id))
            .map(|id| RemovedNode { id })
            .collect(),
        ..Default::default()
    };

    let mut previous_id = None;
    for wireframe in current {
        match previous_by_id.get(&wireframe.id()) {
            None => mutation.adds.push(AddedNode {
                previous_id,
                wireframe: wireframe.clone(),
            }),
            Some(old) => match wireframe_update(old, wireframe) {
                UpdateOutcome::Unchanged => {}
                UpdateOutcome::Updated(update) => mutation.updates.push(update),
                UpdateOutcome::KindChanged => {
                    debug!(
                        "Wireframe {} changed kind ({} -> {}), sending full snapshot",
                        wireframe.id(),
                        old.kind(),
                        wireframe.kind()
                    );
                    return None;
                }
            },
        }
        previous_id = Some(wireframe.id());
    }

    Some(mutation)
}

enum UpdateOutcome {
    Unchanged,
    Updated(WireframeUpdate),
    KindChanged,
}

/// Partial update carrying only the fields of `new` that differ from `old`
fn wireframe_update(old: &Wireframe, new: &Wireframe) -> UpdateOutcome {
    let update = match (old, new) {
        (Wireframe::Shape(old), Wireframe::Shape(new)) => {
            let update = ShapeWireframeUpdate {
                id: new.id,
                geometry: geometry_update(old.geometry, new.geometry),
                clip: changed_or(&new.clip, &old.clip, cleared_clip),
                border: changed_or(&new.border, &old.border, cleared_border),
                shape_style: changed_or(&new.shape_style, &old.shape_style, cleared_style),
            };
            unchanged_unless(update, |id| ShapeWireframeUpdate { id, ..Default::default() })
                .map(WireframeUpdate::Shape)
        }
        (Wireframe::Text(old), Wireframe::Text(new)) => {
            let update = TextWireframeUpdate {
                id: new.id,
                geometry: geometry_update(old.geometry, new.geometry),
                clip: changed_or(&new.clip, &old.clip, cleared_clip),
                border: changed_or(&new.border, &old.border, cleared_border),
                shape_style: changed_or(&new.shape_style, &old.shape_style, cleared_style),
                text: changed(&new.text, &old.text),
                text_style: changed(&new.text_style, &old.text_style),
                text_position: changed_or(
                    &new.text_position,
                    &old.text_position,
                    TextPosition::default,
                ),
            };
            unchanged_unless(update, |id| TextWireframeUpdate { id, ..Default::default() })
                .map(WireframeUpdate::Text)
        }
        (Wireframe::Image(old), Wireframe::Image(new)) => {
            let update = ImageWireframeUpdate {
                id: new.id,
                geometry: geometry_update(old.geometry, new.geometry),
                clip: changed_or(&new.clip, &old.clip, cleared_clip),
                border: changed_or(&new.border, &old.border, cleared_border),
                shape_style: changed_or(&new.shape_style, &old.shape_style, cleared_style),
                base64: changed_some(&new.base64, &old.base64),
                resource_id: changed_some(&new.resource_id, &old.resource_id),
                mime_type: changed_some(&new.mime_type, &old.mime_type),
                is_empty: changed_or(&new.is_empty, &old.is_empty, || false),
            };
            unchanged_unless(update, |id| ImageWireframeUpdate { id, ..Default::default() })
                .map(WireframeUpdate::Image)
        }
        (Wireframe::Placeholder(old), Wireframe::Placeholder(new)) => {
            let update = PlaceholderWireframeUpdate {
                id: new.id,
                geometry: geometry_update(old.geometry, new.geometry),
                clip: changed_or(&new.clip, &old.clip, cleared_clip),
                label: changed_or(&new.label, &old.label, String::new),
            };
            unchanged_unless(update, |id| PlaceholderWireframeUpdate {
                id,
                ..Default::default()
            })
            .map(WireframeUpdate::Placeholder)
        }
        (Wireframe::Webview(old), Wireframe::Webview(new)) => {
            let update = WebviewWireframeUpdate {
                id: new.id,
                geometry: geometry_update(old.geometry, new.geometry),
                clip: changed_or(&new.clip, &old.clip, cleared_clip),
                border: changed_or(&new.border, &old.border, cleared_border),
                shape_style: changed_or(&new.shape_style, &old.shape_style, cleared_style),
                slot_id: changed(&new.slot_id, &old.slot_id),
                is_visible: changed_or(&new.is_visible, &old.is_visible, || true),
            };
            unchanged_unless(update, |id| WebviewWireframeUpdate { id, ..Default::default() })
                .map(WireframeUpdate::Webview)
        }
        _ => return UpdateOutcome::KindChanged,
    };

    match update {
        Some(update) => UpdateOutcome::Updated(update),
        None => UpdateOutcome::Unchanged,
    }
}

fn unchanged_unless<T: PartialEq, F: FnOnce(NodeId) -> T>(update: T, empty: F) -> Option<T>
where
    T: HasId,
{
    (update != empty(update.id())).then_some(update)
}

trait HasId {
    fn id(&self) -> NodeId;
}

macro_rules! impl_has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn id(&self) -> NodeId {
                self.id
            }
        })*
    };
}

impl_has_id!(
    ShapeWireframeUpdate,
    TextWireframeUpdate,
    ImageWireframeUpdate,
    PlaceholderWireframeUpdate,
    WebviewWireframeUpdate
);

fn geometry_update(old: Geometry, new: Geometry) -> GeometryUpdate {
    GeometryUpdate {
        x: changed(&new.x, &old.x),
        y: changed(&new.y, &old.y),
        width: changed(&new.width, &old.width),
        height: changed(&new.height, &old.height),
    }
}

fn changed<T: PartialEq + Clone>(new: &T, old: &T) -> Option<T> {
    (new != old).then(|| new.clone())
}

/// Changed optional field; a field that disappeared is sent as its `cleared` value
fn changed_or<T, F>(new: &Option<T>, old: &Option<T>, cleared: F) -> Option<T>
where
    T: PartialEq + Clone,
    F: FnOnce() -> T,
{
    if new == old {
        None
    } else {
        Some(new.clone().unwrap_or_else(cleared))
    }
}

/// Changed optional field; a field that disappeared is not sent
fn changed_some<T: PartialEq + Clone>(new: &Option<T>, old: &Option<T>) -> Option<T> {
    if new == old {
        None
    } else {
        new.clone()
    }
}

fn cleared_clip() -> ContentClip {
    ContentClip {
        top: Some(0),
        bottom: Some(0),
        left: Some(0),
        right: Some(0),
    }
}

fn cleared_border() -> ShapeBorder {
    ShapeBorder {
        color: "#00000000".to_string(),
        width: 0,
    }
}

fn cleared_style() -> ShapeStyle {
    ShapeStyle {
        background_color: Some("#00000000".to_string()),
        corner_radius: Some(0.0),
        opacity: Some(1.0),
    }
}

/// Ids of the wireframes in a record's full snapshot or mutation adds
pub fn added_ids(record: &Record) -> Vec<NodeId> {
    match record {
        Record::FullSnapshot { data, .. } => data.wireframes.iter().map(Wireframe::id).collect(),
        Record::IncrementalSnapshot {
            data: crate::records::IncrementalData::Mutation(mutation),
            ..
        } => mutation.adds.iter().map(|add| add.wireframe.id()).collect(),
        _ => Vec::new(),
    }
}
