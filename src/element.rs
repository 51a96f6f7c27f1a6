//! Host-side view hierarchy abstraction.
//!
//! The recorder walks any type implementing [`UiElement`]. [`ElementTree`] is a
//! plain serde-loadable implementation used by the daemon binary and by tests.

use crate::privacy::PrivacyOverrides;
use crate::types::{Color, ElementHandle, Rect, RecorderError, Size};
use serde::{Deserialize, Serialize};

/// A live UI element as seen from the capture context
pub trait UiElement {
    /// Stable handle of the element
    fn handle(&self) -> ElementHandle;

    /// Read geometry and style attributes (frame is relative to the parent)
    fn attributes(&self) -> Result<ElementAttributes, RecorderError>;

    /// What kind of element this is and what it displays
    fn content(&self) -> &ElementContent;

    /// Explicit privacy overrides set on this element
    fn privacy_overrides(&self) -> PrivacyOverrides {
        PrivacyOverrides::default()
    }

    /// Host identifier (e.g. accessibility identifier), matched against hidden patterns
    fn identifier(&self) -> Option<&str> {
        None
    }

    /// Child elements in z-order (back to front)
    fn children(&self) -> &[Self]
    where
        Self: Sized;
}

/// Parent-local geometry and style of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementAttributes {
    /// Frame in the parent's coordinate space
    pub frame: Rect,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,

    #[serde(default)]
    pub border_width: f64,

    #[serde(default)]
    pub corner_radius: f64,

    #[serde(default = "default_alpha")]
    pub alpha: f64,

    #[serde(default)]
    pub is_hidden: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic_content_size: Option<Size>,

    /// Whether children are clipped to this element's bounds
    #[serde(default)]
    pub clips_to_bounds: bool,
}

impl Default for ElementAttributes {
    fn default() -> Self {
        Self {
            frame: Rect::zero(),
            background_color: None,
            border_color: None,
            border_width: 0.0,
            corner_radius: 0.0,
            alpha: default_alpha(),
            is_hidden: false,
            intrinsic_content_size: None,
            clips_to_bounds: false,
        }
    }
}

impl ElementAttributes {
    pub fn with_frame(frame: Rect) -> Self {
        Self {
            frame,
            ..Default::default()
        }
    }
}

fn default_alpha() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextAlignment {
    #[serde(default)]
    pub horizontal: HorizontalAlignment,
    #[serde(default)]
    pub vertical: VerticalAlignment,
}

/// Raw image content held by an image element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Encoded image bytes (base64 in JSON)
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl ImageRef {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// What an element displays
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementContent {
    /// Plain view without specific content
    #[default]
    Container,

    /// Static text
    Label {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_family: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_color: Option<Color>,
        #[serde(default)]
        alignment: TextAlignment,
        /// Frame of the rendered text, relative to the element
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_frame: Option<Rect>,
    },

    /// Editable text field or text view
    TextInput {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        /// Password, email, phone number or other sensitive content type
        #[serde(default)]
        is_sensitive: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_size: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_color: Option<Color>,
        #[serde(default)]
        alignment: TextAlignment,
    },

    /// Image view
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<ImageRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tint_color: Option<Color>,
        /// Shipped with the application bundle
        #[serde(default)]
        is_bundled: bool,
        /// Frame of the drawn image, relative to the element
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_frame: Option<Rect>,
    },

    /// Embedded web content, identified by a host slot id
    WebView { slot_id: i64 },

    /// On/off switch
    Toggle {
        is_on: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_tint_color: Option<Color>,
    },

    /// Element of a kind no built-in classifier knows about
    Custom { class_name: String },
}

/// Serde-loadable element hierarchy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementTree {
    pub handle: ElementHandle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default)]
    pub attributes: ElementAttributes,

    #[serde(default)]
    pub content: ElementContent,

    #[serde(default, skip_serializing_if = "PrivacyOverrides::is_empty")]
    pub privacy: PrivacyOverrides,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementTree>,
}

impl ElementTree {
    pub fn new(slot: u32, frame: Rect, content: ElementContent) -> Self {
        Self {
            handle: ElementHandle::new(slot, 0),
            identifier: None,
            attributes: ElementAttributes::with_frame(frame),
            content,
            privacy: PrivacyOverrides::default(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ElementTree) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacyOverrides) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    /// Find a descendant (or self) by handle slot
    pub fn find_mut(&mut self, slot: u32) -> Option<&mut ElementTree> {
        if self.handle.slot == slot {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(slot))
    }

    /// Remove a descendant by handle slot
    pub fn remove(&mut self, slot: u32) -> Option<ElementTree> {
        if let Some(index) = self.children.iter().position(|c| c.handle.slot == slot) {
            return Some(self.children.remove(index));
        }
        self.children.iter_mut().find_map(|child| child.remove(slot))
    }
}

impl UiElement for ElementTree {
    fn handle(&self) -> ElementHandle {
        self.handle
    }

    fn attributes(&self) -> Result<ElementAttributes, RecorderError> {
        Ok(self.attributes.clone())
    }

    fn content(&self) -> &ElementContent {
        &self.content
    }

    fn privacy_overrides(&self) -> PrivacyOverrides {
        self.privacy
    }

    fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_tree() {
        let json = r#"{
            "handle": {"slot": 1},
            "attributes": {"frame": {"x": 0, "y": 0, "width": 320, "height": 480}},
            "children": [
                {
                    "handle": {"slot": 2, "generation": 3},
                    "identifier": "greeting",
                    "attributes": {"frame": {"x": 10, "y": 20, "width": 100, "height": 20}, "alpha": 0.5},
                    "content": {"kind": "label", "text": "Hello"},
                    "privacy": {"text_and_input": "mask_all_inputs"}
                },
                {
                    "handle": {"slot": 3},
                    "attributes": {"frame": {"x": 0, "y": 50, "width": 40, "height": 40}},
                    "content": {"kind": "image", "image": {"bytes": "iVBORw0KGgo="}}
                }
            ]
        }"#;

        let tree: ElementTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.content, ElementContent::Container);
        assert_eq!(tree.attributes.alpha, 1.0);
        assert_eq!(tree.children.len(), 2);

        let label = &tree.children[0];
        assert_eq!(label.handle, ElementHandle::new(2, 3));
        assert_eq!(label.identifier(), Some("greeting"));
        assert_eq!(label.attributes.alpha, 0.5);
        assert!(matches!(label.content(), ElementContent::Label { text, .. } if text == "Hello"));
        assert_eq!(
            label.privacy_overrides().text_and_input,
            Some(crate::types::TextAndInputPrivacyLevel::MaskAllInputs)
        );

        match tree.children[1].content() {
            ElementContent::Image { image: Some(image), .. } => {
                assert_eq!(&image.bytes[..4], &[0x89, b'P', b'N', b'G']);
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_find_and_remove() {
        let mut tree = ElementTree::new(1, Rect::new(0.0, 0.0, 100.0, 100.0), ElementContent::Container)
            .with_child(
                ElementTree::new(2, Rect::new(0.0, 0.0, 50.0, 50.0), ElementContent::Container)
                    .with_child(ElementTree::new(3, Rect::zero(), ElementContent::Container)),
            );

        assert!(tree.find_mut(3).is_some());
        let removed = tree.remove(3).unwrap();
        assert_eq!(removed.handle.slot, 3);
        assert!(tree.find_mut(3).is_none());
        assert!(tree.remove(42).is_none());
    }
}
