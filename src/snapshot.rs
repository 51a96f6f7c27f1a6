//! View tree snapshot model.
//!
//! A [`ViewTreeSnapshot`] is the output of one walk over the live hierarchy: an
//! ordered list of [`Node`]s, each carrying absolute geometry, its resolved privacy
//! and the builder that turns it into wireframes on the background worker.

use crate::element::ElementAttributes;
use crate::privacy::ResolvedPrivacy;
use crate::types::{Color, NodeId, Point, Rect, RecordingContext, Size};
use crate::wireframe::{Wireframe, WireframesBuilder};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Geometry and style of an element in the root coordinate space
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAttributes {
    /// Absolute frame
    pub frame: Rect,
    /// Visible area inherited from clipping ancestors (absolute)
    pub clip: Rect,
    pub background_color: Option<Color>,
    pub border_color: Option<Color>,
    pub border_width: f64,
    pub corner_radius: f64,
    pub alpha: f64,
    pub is_hidden: bool,
    pub intrinsic_content_size: Option<Size>,
}

impl ViewAttributes {
    /// Place parent-local attributes into the root coordinate space
    pub fn new(local: &ElementAttributes, parent_origin: Point, parent_clip: Rect) -> Self {
        Self {
            frame: local.frame.offset_by(parent_origin),
            clip: parent_clip,
            background_color: local.background_color,
            border_color: local.border_color,
            border_width: local.border_width,
            corner_radius: local.corner_radius,
            alpha: local.alpha,
            is_hidden: local.is_hidden,
            intrinsic_content_size: local.intrinsic_content_size,
        }
    }

    /// Attributes of an element whose real attributes could not be read
    pub fn placeholder(origin: Point, clip: Rect) -> Self {
        Self::new(&ElementAttributes::default(), origin, clip)
    }

    /// Not hidden, not fully transparent and has some area
    pub fn is_visible(&self) -> bool {
        !self.is_hidden && self.alpha > 0.0 && !self.frame.is_empty()
    }

    /// Entirely outside the inherited clip
    pub fn is_offscreen(&self) -> bool {
        !self.frame.intersects(&self.clip)
    }

    /// Visible and draws a fill or a border
    pub fn has_any_appearance(&self) -> bool {
        if !self.is_visible() {
            return false;
        }
        let has_border = self.border_width > 0.0
            && self.border_color.map_or(false, |color| color.a > 0.0);
        let has_fill = self.background_color.map_or(false, |color| color.a > 0.0);
        has_border || has_fill
    }

    /// Content behind this element may show through
    pub fn is_translucent(&self) -> bool {
        !self.is_visible()
            || self.alpha < 1.0
            || self.background_color.map_or(true, |color| color.a < 1.0)
    }
}

/// Turns one node into wireframes on the background worker
pub trait NodeWireframesBuilder: Send + Sync + Debug {
    fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe>;
}

/// Builder for nodes that contribute no wireframes
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWireframesBuilder;

impl NodeWireframesBuilder for EmptyWireframesBuilder {
    fn build_wireframes(&self, _builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        Vec::new()
    }
}

/// One classified element in a snapshot
#[derive(Debug, Clone)]
pub struct Node {
    pub view_attributes: ViewAttributes,
    pub privacy: ResolvedPrivacy,
    pub wireframes_builder: Arc<dyn NodeWireframesBuilder>,
}

impl Node {
    pub fn new(
        view_attributes: ViewAttributes,
        privacy: ResolvedPrivacy,
        wireframes_builder: Arc<dyn NodeWireframesBuilder>,
    ) -> Self {
        Self {
            view_attributes,
            privacy,
            wireframes_builder,
        }
    }

    /// A node that records nothing (degraded element)
    pub fn empty(view_attributes: ViewAttributes, privacy: ResolvedPrivacy) -> Self {
        Self::new(view_attributes, privacy, Arc::new(EmptyWireframesBuilder))
    }
}

/// Whether descendants of a classified element are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeStrategy {
    Record,
    Ignore,
}

/// Result of classifying one element
#[derive(Debug, Clone)]
pub enum NodeSemantics {
    /// Not recorded, descendants skipped
    Ignore,
    /// Present but not rendered, descendants skipped
    Invisible,
    /// No classifier matched; no wireframes, descendants visited
    Unknown,
    /// A classifier produced the element's wireframes
    Specific {
        subtree_strategy: SubtreeStrategy,
        nodes: Vec<Node>,
    },
    /// Only generic classifiers matched; every candidate is kept
    Ambiguous { nodes: Vec<Node> },
}

impl NodeSemantics {
    pub fn subtree_strategy(&self) -> SubtreeStrategy {
        match self {
            NodeSemantics::Ignore | NodeSemantics::Invisible => SubtreeStrategy::Ignore,
            NodeSemantics::Unknown | NodeSemantics::Ambiguous { .. } => SubtreeStrategy::Record,
            NodeSemantics::Specific {
                subtree_strategy, ..
            } => *subtree_strategy,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, NodeSemantics::Ambiguous { .. })
    }

    /// Consume the semantics, keeping the nodes it carries
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            NodeSemantics::Specific { nodes, .. } | NodeSemantics::Ambiguous { nodes } => nodes,
            _ => Vec::new(),
        }
    }
}

/// Everything captured in one walk over the hierarchy
#[derive(Debug, Clone)]
pub struct ViewTreeSnapshot {
    pub date: DateTime<Utc>,
    pub context: RecordingContext,
    pub viewport_size: Size,
    pub nodes: Vec<Node>,
    /// Embedded web content slots found during the walk, with their node id
    pub webview_slots: BTreeMap<i64, NodeId>,
}

impl ViewTreeSnapshot {
    /// Build every node's wireframes in order
    pub fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        let mut wireframes: Vec<Wireframe> = self
            .nodes
            .iter()
            .flat_map(|node| node.wireframes_builder.build_wireframes(builder))
            .collect();
        wireframes.extend(builder.hidden_webview_wireframes());
        wireframes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(frame: Rect) -> ViewAttributes {
        ViewAttributes::new(
            &ElementAttributes::with_frame(frame),
            Point::new(0.0, 0.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
    }

    #[test]
    fn test_offset_into_root_space() {
        let local = ElementAttributes::with_frame(Rect::new(5.0, 5.0, 10.0, 10.0));
        let attrs = ViewAttributes::new(&local, Point::new(20.0, 30.0), Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(attrs.frame, Rect::new(25.0, 35.0, 10.0, 10.0));
        assert_eq!(attrs.clip, Rect::new(0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn test_visibility() {
        let mut attrs = attributes(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(attrs.is_visible());
        assert!(!attrs.is_offscreen());

        attrs.alpha = 0.0;
        assert!(!attrs.is_visible());

        let empty = attributes(Rect::new(0.0, 0.0, 0.0, 10.0));
        assert!(!empty.is_visible());

        let offscreen = attributes(Rect::new(200.0, 200.0, 10.0, 10.0));
        assert!(offscreen.is_offscreen());
    }

    #[test]
    fn test_appearance() {
        let mut attrs = attributes(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!attrs.has_any_appearance());
        assert!(attrs.is_translucent());

        attrs.background_color = Some(Color::WHITE);
        assert!(attrs.has_any_appearance());
        assert!(!attrs.is_translucent());

        attrs.background_color = None;
        attrs.border_color = Some(Color::BLACK);
        assert!(!attrs.has_any_appearance());
        attrs.border_width = 1.0;
        assert!(attrs.has_any_appearance());
    }

    #[test]
    fn test_semantics_subtree_strategy() {
        assert_eq!(NodeSemantics::Invisible.subtree_strategy(), SubtreeStrategy::Ignore);
        assert_eq!(NodeSemantics::Unknown.subtree_strategy(), SubtreeStrategy::Record);
        let specific = NodeSemantics::Specific {
            subtree_strategy: SubtreeStrategy::Ignore,
            nodes: vec![Node::empty(attributes(Rect::zero()), ResolvedPrivacy::default())],
        };
        assert_eq!(specific.subtree_strategy(), SubtreeStrategy::Ignore);
        assert_eq!(specific.into_nodes().len(), 1);
    }
}
