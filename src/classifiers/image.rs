//! Image view classifier.
//!
//! An image view renders up to two wireframes: its own fill and border, then the
//! image content (or a placeholder when image privacy forbids recording it).

use super::{ClassificationContext, Classifier};
use crate::element::{ElementContent, ImageRef};
use crate::privacy::should_record_image;
use crate::snapshot::{Node, NodeSemantics, NodeWireframesBuilder, SubtreeStrategy, ViewAttributes};
use crate::types::{Color, NodeId, Point, Rect, RecorderError};
use crate::wireframe::{Appearance, Wireframe, WireframesBuilder};
use std::sync::Arc;

/// Label of the placeholder drawn instead of masked images
pub const MASKED_IMAGE_LABEL: &str = "Image";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageClassifier;

impl Classifier for ImageClassifier {
    fn name(&self) -> &'static str {
        "image"
    }

    fn semantics(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError> {
        let (image, tint_color, is_bundled, content_frame) = match content {
            ElementContent::Image {
                image,
                tint_color,
                is_bundled,
                content_frame,
            } => (image, *tint_color, *is_bundled, *content_frame),
            _ => return Ok(None),
        };

        let ids = context.ids.node_ids(context.handle, 2);
        let origin = Point::new(attributes.frame.x, attributes.frame.y);
        let content_frame = content_frame
            .map(|frame| frame.offset_by(origin))
            .unwrap_or(attributes.frame);

        let builder = ImageNodeBuilder {
            background_id: ids[0],
            content_id: ids[1],
            attributes: attributes.clone(),
            content_frame,
            image: image.clone(),
            tint_color,
            should_record_image: should_record_image(context.privacy.image, is_bundled),
        };

        Ok(Some(NodeSemantics::Specific {
            subtree_strategy: SubtreeStrategy::Record,
            nodes: vec![Node::new(attributes.clone(), context.privacy, Arc::new(builder))],
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ImageNodeBuilder {
    pub background_id: NodeId,
    pub content_id: NodeId,
    pub attributes: ViewAttributes,
    /// Absolute frame of the drawn image
    pub content_frame: Rect,
    pub image: Option<ImageRef>,
    pub tint_color: Option<Color>,
    pub should_record_image: bool,
}

impl NodeWireframesBuilder for ImageNodeBuilder {
    fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        let mut wireframes = Vec::with_capacity(2);

        if self.attributes.has_any_appearance() {
            wireframes.push(builder.shape_wireframe(
                self.background_id,
                self.attributes.frame,
                self.attributes.clip,
                &Appearance::from_attributes(&self.attributes),
            ));
        }

        let image = match &self.image {
            Some(image) => image,
            None => return wireframes,
        };

        // The drawn image never escapes the view's own bounds
        let clip = self.attributes.clip.intersection(&self.attributes.frame);
        if self.should_record_image {
            wireframes.push(builder.image_wireframe(
                self.content_id,
                self.content_frame,
                clip,
                image,
                self.tint_color,
                &Appearance {
                    opacity: self.attributes.alpha,
                    ..Appearance::none()
                },
            ));
        } else {
            wireframes.push(builder.placeholder_wireframe(
                self.content_id,
                self.content_frame,
                clip,
                MASKED_IMAGE_LABEL,
            ));
        }

        wireframes
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
    use crate::types::{ElementHandle, ImagePrivacyLevel};
    use std::collections::BTreeMap;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn build(
        level: ImagePrivacyLevel,
        is_bundled: bool,
        background: Option<Color>,
        image: Option<ImageRef>,
    ) -> Vec<Wireframe> {
        let ids = IdentityGenerator::new();
        let recording = recording_context();
        let mut privacy = ResolvedPrivacy::from_context(&recording);
        privacy.image = level;
        let context = ClassificationContext {
            handle: ElementHandle::new(4, 0),
            privacy,
            recording: &recording,
            ids: &ids,
        };
        let attributes = ViewAttributes::new(
            &ElementAttributes {
                background_color: background,
                ..ElementAttributes::with_frame(Rect::new(0.0, 0.0, 40.0, 40.0))
            },
            Point::default(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let content = ElementContent::Image {
            image,
            tint_color: None,
            is_bundled,
            content_frame: None,
        };

        let nodes = ImageClassifier
            .semantics(&content, &attributes, &context)
            .unwrap()
            .unwrap()
            .into_nodes();
        let provider = Base64ImageDataProvider;
        let mut builder = WireframesBuilder::new(&provider, BTreeMap::new());
        nodes[0].wireframes_builder.build_wireframes(&mut builder)
    }

    fn png() -> Option<ImageRef> {
        Some(ImageRef::new(PNG_HEADER.to_vec()))
    }

    #[test]
    fn test_background_and_image() {
        let wireframes = build(ImagePrivacyLevel::MaskNone, false, Some(Color::WHITE), png());
        let kinds: Vec<&str> = wireframes.iter().map(Wireframe::kind).collect();
        assert_eq!(kinds, vec!["shape", "image"]);
        assert_ne!(wireframes[0].id(), wireframes[1].id());
    }

    #[test]
    fn test_masked_image_is_placeholder() {
        let wireframes = build(ImagePrivacyLevel::MaskAll, true, None, png());
        assert_eq!(wireframes.len(), 1);
        match &wireframes[0] {
            Wireframe::Placeholder(placeholder) => {
                assert_eq!(placeholder.label.as_deref(), Some(MASKED_IMAGE_LABEL));
            }
            other => panic!("expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_non_bundled_only() {
        let bundled = build(ImagePrivacyLevel::MaskNonBundledOnly, true, None, png());
        assert_eq!(bundled[0].kind(), "image");
        let downloaded = build(ImagePrivacyLevel::MaskNonBundledOnly, false, None, png());
        assert_eq!(downloaded[0].kind(), "placeholder");
    }

    #[test]
    fn test_no_image_no_content_wireframe() {
        assert!(build(ImagePrivacyLevel::MaskNone, false, None, None).is_empty());
    }
}
