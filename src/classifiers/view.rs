//! Generic view classifier.
//!
//! Matches any element that draws a fill or a border. The result is ambiguous so
//! that a more specific classifier can take over the same element.

use super::{ClassificationContext, Classifier};
use crate::element::ElementContent;
use crate::snapshot::{Node, NodeSemantics, NodeWireframesBuilder, ViewAttributes};
use crate::types::{NodeId, RecorderError};
use crate::wireframe::{Appearance, Wireframe, WireframesBuilder};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewClassifier;

impl Classifier for ViewClassifier {
    fn name(&self) -> &'static str {
        "view"
    }

    fn semantics(
        &self,
        _content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError> {
        if !attributes.has_any_appearance() {
            return Ok(None);
        }

        let builder = ShapeNodeBuilder {
            id: context.ids.node_id(context.handle),
            attributes: attributes.clone(),
        };
        Ok(Some(NodeSemantics::Ambiguous {
            nodes: vec![Node::new(
                attributes.clone(),
                context.privacy,
                Arc::new(builder),
            )],
        }))
    }
}

/// Draws the element's own fill and border
#[derive(Debug, Clone)]
pub struct ShapeNodeBuilder {
    pub id: NodeId,
    pub attributes: ViewAttributes,
}

impl NodeWireframesBuilder for ShapeNodeBuilder {
    fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        vec![builder.shape_wireframe(
            self.id,
            self.attributes.frame,
            self.attributes.clip,
            &Appearance::from_attributes(&self.attributes),
        )]
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
    use crate::types::{Color, ElementHandle, Point, Rect};
    use std::collections::BTreeMap;

    fn classify(attributes: &ElementAttributes) -> Option<NodeSemantics> {
        let ids = IdentityGenerator::new();
        let recording = recording_context();
        let context = ClassificationContext {
            handle: ElementHandle::new(1, 0),
            privacy: ResolvedPrivacy::from_context(&recording),
            recording: &recording,
            ids: &ids,
        };
        let view_attributes = ViewAttributes::new(
            attributes,
            Point::default(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        ViewClassifier
            .semantics(&ElementContent::Container, &view_attributes, &context)
            .unwrap()
    }

    #[test]
    fn test_plain_container_declines() {
        let attributes = ElementAttributes::with_frame(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(classify(&attributes).is_none());
    }

    #[test]
    fn test_filled_view_is_ambiguous_shape() {
        let attributes = ElementAttributes {
            background_color: Some(Color::WHITE),
            ..ElementAttributes::with_frame(Rect::new(5.0, 5.0, 10.0, 10.0))
        };
        let semantics = classify(&attributes).unwrap();
        assert!(semantics.is_ambiguous());

        let nodes = semantics.into_nodes();
        let provider = Base64ImageDataProvider;
        let mut builder = WireframesBuilder::new(&provider, BTreeMap::new());
        let wireframes = nodes[0].wireframes_builder.build_wireframes(&mut builder);
        assert_eq!(wireframes.len(), 1);
        assert_eq!(wireframes[0].kind(), "shape");
        assert_eq!(wireframes[0].geometry().x, 5);
    }
}
