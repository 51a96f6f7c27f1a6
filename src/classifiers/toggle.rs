//! On/off switch classifier.
//!
//! A switch renders a rounded track and a round thumb. Under `mask_all` only a
//! neutral track is drawn so the on/off state is not revealed.

use super::{ClassificationContext, Classifier};
use crate::element::ElementContent;
use crate::snapshot::{Node, NodeSemantics, NodeWireframesBuilder, SubtreeStrategy, ViewAttributes};
use crate::types::{Color, NodeId, Rect, RecorderError, TextAndInputPrivacyLevel};
use crate::wireframe::{Appearance, Wireframe, WireframesBuilder};
use std::sync::Arc;

const TRACK_OFF_COLOR: Color = Color::rgba(0.91, 0.91, 0.92, 1.0);
const TRACK_ON_COLOR: Color = Color::rgba(0.2, 0.78, 0.35, 1.0);
const THUMB_COLOR: Color = Color::WHITE;
const THUMB_INSET: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleClassifier;

impl Classifier for ToggleClassifier {
    fn name(&self) -> &'static str {
        "toggle"
    }

    fn semantics(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError> {
        let (is_on, on_tint_color) = match content {
            ElementContent::Toggle {
                is_on,
                on_tint_color,
            } => (*is_on, *on_tint_color),
            _ => return Ok(None),
        };

        let ids = context.ids.node_ids(context.handle, 2);
        let builder = ToggleNodeBuilder {
            track_id: ids[0],
            thumb_id: ids[1],
            attributes: attributes.clone(),
            is_on,
            on_tint_color: on_tint_color.unwrap_or(TRACK_ON_COLOR),
            is_masked: context.privacy.text_and_input == TextAndInputPrivacyLevel::MaskAll,
        };

        Ok(Some(NodeSemantics::Specific {
            subtree_strategy: SubtreeStrategy::Ignore,
            nodes: vec![Node::new(attributes.clone(), context.privacy, Arc::new(builder))],
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ToggleNodeBuilder {
    pub track_id: NodeId,
    pub thumb_id: NodeId,
    pub attributes: ViewAttributes,
    pub is_on: bool,
    pub on_tint_color: Color,
    pub is_masked: bool,
}

impl NodeWireframesBuilder for ToggleNodeBuilder {
    fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        let frame = self.attributes.frame;
        let clip = self.attributes.clip;
        let radius = frame.height / 2.0;

        let track_color = if self.is_on && !self.is_masked {
            self.on_tint_color
        } else {
            TRACK_OFF_COLOR
        };
        let track = builder.shape_wireframe(
            self.track_id,
            frame,
            clip,
            &Appearance {
                opacity: self.attributes.alpha,
                ..Appearance::filled(track_color, radius)
            },
        );
        if self.is_masked {
            return vec![track];
        }

        let diameter = (frame.height - 2.0 * THUMB_INSET).max(0.0);
        let thumb_x = if self.is_on {
            frame.max_x() - THUMB_INSET - diameter
        } else {
            frame.min_x() + THUMB_INSET
        };
        let thumb_frame = Rect::new(thumb_x, frame.y + THUMB_INSET, diameter, diameter);
        let thumb = builder.shape_wireframe(
            self.thumb_id,
            thumb_frame,
            clip,
            &Appearance {
                opacity: self.attributes.alpha,
                ..Appearance::filled(THUMB_COLOR, diameter / 2.0)
            },
        );

        vec![track, thumb]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::tests::recording_context;
    use crate::element::ElementAttributes;
    use crate::identity::IdentityGenerator;
    use crate::privacy::ResolvedPrivacy;
    use crate::resources::Base64ImageDataProvider;
    use crate::types::{ElementHandle, Point};
    use std::collections::BTreeMap;

    fn build(is_on: bool, level: TextAndInputPrivacyLevel) -> Vec<Wireframe> {
        let ids = IdentityGenerator::new();
        let recording = recording_context();
        let mut privacy = ResolvedPrivacy::from_context(&recording);
        privacy.text_and_input = level;
        let context = ClassificationContext {
            handle: ElementHandle::new(2, 0),
            privacy,
            recording: &recording,
            ids: &ids,
        };
        let attributes = ViewAttributes::new(
            &ElementAttributes::with_frame(Rect::new(10.0, 10.0, 51.0, 31.0)),
            Point::default(),
            Rect::new(0.0, 0.0, 200.0, 200.0),
        );

        let nodes = ToggleClassifier
            .semantics(
                &ElementContent::Toggle {
                    is_on,
                    on_tint_color: None,
                },
                &attributes,
                &context,
            )
            .unwrap()
            .unwrap()
            .into_nodes();
        let provider = Base64ImageDataProvider;
        let mut builder = WireframesBuilder::new(&provider, BTreeMap::new());
        nodes[0].wireframes_builder.build_wireframes(&mut builder)
    }

    #[test]
    fn test_thumb_position_follows_state() {
        let off = build(false, TextAndInputPrivacyLevel::MaskSensitiveInputs);
        let on = build(true, TextAndInputPrivacyLevel::MaskSensitiveInputs);
        assert_eq!(off.len(), 2);
        assert_eq!(on.len(), 2);
        assert_eq!(off[0].id(), on[0].id());
        assert!(on[1].geometry().x > off[1].geometry().x);
    }

    #[test]
    fn test_masked_toggle_hides_state() {
        let off = build(false, TextAndInputPrivacyLevel::MaskAll);
        let on = build(true, TextAndInputPrivacyLevel::MaskAll);
        assert_eq!(off.len(), 1);
        assert_eq!(off, on);
    }
}
