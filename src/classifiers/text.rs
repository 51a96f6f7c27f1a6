//! Static text and text input classifiers.
//!
//! Text is masked here, on the capture side, so unmasked content never reaches
//! the background worker.

use super::{ClassificationContext, Classifier};
use crate::element::{ElementContent, TextAlignment};
use crate::privacy::TextObfuscator;
use crate::snapshot::{Node, NodeSemantics, NodeWireframesBuilder, SubtreeStrategy, ViewAttributes};
use crate::types::{Color, NodeId, Point, Rect, RecorderError};
use crate::wireframe::{Appearance, Font, Wireframe, WireframesBuilder};
use std::sync::Arc;

/// Colour of input placeholders
const PLACEHOLDER_TEXT_COLOR: Color = Color::rgba(0.24, 0.24, 0.26, 0.3);

#[derive(Debug, Clone, Copy, Default)]
pub struct LabelClassifier;

impl Classifier for LabelClassifier {
    fn name(&self) -> &'static str {
        "label"
    }

    fn semantics(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError> {
        let (text, font_family, font_size, text_color, alignment, text_frame) = match content {
            ElementContent::Label {
                text,
                font_family,
                font_size,
                text_color,
                alignment,
                text_frame,
            } => (text, font_family, font_size, text_color, alignment, text_frame),
            _ => return Ok(None),
        };

        if text.is_empty() && !attributes.has_any_appearance() {
            return Ok(Some(NodeSemantics::Specific {
                subtree_strategy: SubtreeStrategy::Ignore,
                nodes: Vec::new(),
            }));
        }

        let obfuscator = TextObfuscator::for_static_text(context.privacy.text_and_input);
        let builder = TextNodeBuilder {
            id: context.ids.node_id(context.handle),
            attributes: attributes.clone(),
            text: obfuscator.mask(text),
            text_frame: text_frame.map(|frame| frame.offset_by(origin(attributes))),
            alignment: Some(*alignment),
            font: Font {
                color: *text_color,
                family: font_family.clone(),
                size: *font_size,
            },
        };

        Ok(Some(NodeSemantics::Specific {
            subtree_strategy: SubtreeStrategy::Ignore,
            nodes: vec![Node::new(attributes.clone(), context.privacy, Arc::new(builder))],
        }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextInputClassifier;

impl Classifier for TextInputClassifier {
    fn name(&self) -> &'static str {
        "text_input"
    }

    fn semantics(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError> {
        let (text, placeholder, is_sensitive, font_size, text_color, alignment) = match content {
            ElementContent::TextInput {
                text,
                placeholder,
                is_sensitive,
                font_size,
                text_color,
                alignment,
            } => (text, placeholder, *is_sensitive, font_size, text_color, alignment),
            _ => return Ok(None),
        };

        let level = context.privacy.text_and_input;
        let (display, color) = if !text.is_empty() {
            let masked = TextObfuscator::for_input_text(level, is_sensitive).mask(text);
            (masked, *text_color)
        } else {
            let placeholder = placeholder.as_deref().unwrap_or_default();
            let masked = TextObfuscator::for_input_placeholder(level).mask(placeholder);
            (masked, Some(PLACEHOLDER_TEXT_COLOR))
        };

        let builder = TextNodeBuilder {
            id: context.ids.node_id(context.handle),
            attributes: attributes.clone(),
            text: display,
            text_frame: None,
            alignment: Some(*alignment),
            font: Font {
                color,
                family: None,
                size: *font_size,
            },
        };

        Ok(Some(NodeSemantics::Specific {
            subtree_strategy: SubtreeStrategy::Ignore,
            nodes: vec![Node::new(attributes.clone(), context.privacy, Arc::new(builder))],
        }))
    }
}

fn origin(attributes: &ViewAttributes) -> Point {
    Point::new(attributes.frame.x, attributes.frame.y)
}

/// Draws an already-masked text with the element's fill and border
#[derive(Debug, Clone)]
pub struct TextNodeBuilder {
    pub id: NodeId,
    pub attributes: ViewAttributes,
    pub text: String,
    /// Absolute frame of the text inside the element
    pub text_frame: Option<Rect>,
    pub alignment: Option<TextAlignment>,
    pub font: Font,
}

impl NodeWireframesBuilder for TextNodeBuilder {
    fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        vec![builder.text_wireframe(
            self.id,
            self.attributes.frame,
            self.attributes.clip,
            self.text.clone(),
            self.text_frame,
            self.alignment,
            &self.font,
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
    use crate::types::{ElementHandle, TextAndInputPrivacyLevel};
    use crate::wireframe::TextWireframe;
    use std::collections::BTreeMap;

    fn build_text(
        classifier: &dyn Classifier,
        content: ElementContent,
        level: TextAndInputPrivacyLevel,
    ) -> Option<TextWireframe> {
        let ids = IdentityGenerator::new();
        let recording = recording_context();
        let mut privacy = ResolvedPrivacy::from_context(&recording);
        privacy.text_and_input = level;
        let context = ClassificationContext {
            handle: ElementHandle::new(1, 0),
            privacy,
            recording: &recording,
            ids: &ids,
        };
        let attributes = ViewAttributes::new(
            &ElementAttributes::with_frame(Rect::new(10.0, 10.0, 100.0, 20.0)),
            Point::default(),
            Rect::new(0.0, 0.0, 200.0, 200.0),
        );

        let nodes = classifier
            .semantics(&content, &attributes, &context)
            .unwrap()?
            .into_nodes();
        let provider = Base64ImageDataProvider;
        let mut builder = WireframesBuilder::new(&provider, BTreeMap::new());
        match nodes.first()?.wireframes_builder.build_wireframes(&mut builder).pop()? {
            Wireframe::Text(text) => Some(text),
            _ => None,
        }
    }

    fn label(text: &str) -> ElementContent {
        ElementContent::Label {
            text: text.to_string(),
            font_family: None,
            font_size: Some(14.0),
            text_color: Some(Color::BLACK),
            alignment: TextAlignment::default(),
            text_frame: Some(Rect::new(2.0, 2.0, 96.0, 16.0)),
        }
    }

    fn input(text: &str, is_sensitive: bool) -> ElementContent {
        ElementContent::TextInput {
            text: text.to_string(),
            placeholder: Some("Email".to_string()),
            is_sensitive,
            font_size: None,
            text_color: None,
            alignment: TextAlignment::default(),
        }
    }

    #[test]
    fn test_label_masking_by_level() {
        let masked = build_text(&LabelClassifier, label("Hello you"), TextAndInputPrivacyLevel::MaskAll).unwrap();
        assert_eq!(masked.text, "xxxxx xxx");

        let shown = build_text(&LabelClassifier, label("Hello you"), TextAndInputPrivacyLevel::MaskAllInputs).unwrap();
        assert_eq!(shown.text, "Hello you");
        assert_eq!(shown.text_style.size, 14);
        assert_eq!(shown.text_style.color, "#000000FF");
    }

    #[test]
    fn test_label_text_frame_becomes_padding() {
        let text = build_text(&LabelClassifier, label("Hi"), TextAndInputPrivacyLevel::MaskSensitiveInputs).unwrap();
        let padding = text.text_position.unwrap().padding.unwrap();
        assert_eq!(padding.left, Some(2));
        assert_eq!(padding.top, Some(2));
    }

    #[test]
    fn test_empty_label_without_appearance_records_nothing() {
        assert!(build_text(&LabelClassifier, label(""), TextAndInputPrivacyLevel::MaskAll).is_none());
    }

    #[test]
    fn test_input_masking() {
        use TextAndInputPrivacyLevel::*;
        assert_eq!(build_text(&TextInputClassifier, input("secret", false), MaskAllInputs).unwrap().text, "***");
        assert_eq!(build_text(&TextInputClassifier, input("visible", false), MaskSensitiveInputs).unwrap().text, "visible");
        assert_eq!(build_text(&TextInputClassifier, input("hunter2", true), MaskSensitiveInputs).unwrap().text, "***");
    }

    #[test]
    fn test_input_placeholder() {
        use TextAndInputPrivacyLevel::*;
        let shown = build_text(&TextInputClassifier, input("", false), MaskAllInputs).unwrap();
        assert_eq!(shown.text, "Email");
        assert_eq!(shown.text_style.color, PLACEHOLDER_TEXT_COLOR.hex_string());

        let masked = build_text(&TextInputClassifier, input("", false), MaskAll).unwrap();
        assert_eq!(masked.text, "***");
    }

    #[test]
    fn test_other_content_declines() {
        assert!(build_text(&LabelClassifier, ElementContent::Container, TextAndInputPrivacyLevel::MaskAll).is_none());
        assert!(build_text(&TextInputClassifier, label("x"), TextAndInputPrivacyLevel::MaskAll).is_none());
    }
}
