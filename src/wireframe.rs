//! Wireframe wire models and the builder that produces them.
//!
//! Wireframes are positioned in the root coordinate space with integer geometry.
//! Building is deterministic: identical node state always yields identical
//! wireframes, which is what lets the differ detect updates by value.

use crate::element::{ImageRef, TextAlignment};
use crate::resources::ImageDataProvider;
use crate::snapshot::ViewAttributes;
use crate::types::{Color, NodeId, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text colour used when the element colour cannot be read
pub const FALLBACK_TEXT_COLOR: &str = "#FF0000FF";
/// Font family used when the element font is unknown
pub const FALLBACK_FONT_FAMILY: &str = "-apple-system, BlinkMacSystemFont, 'Roboto', sans-serif";
/// Font size used when the element font size is unknown
pub const FALLBACK_FONT_SIZE: i64 = 10;

/// A serializable description of one element's visual state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Wireframe {
    Shape(ShapeWireframe),
    Text(TextWireframe),
    Image(ImageWireframe),
    Placeholder(PlaceholderWireframe),
    Webview(WebviewWireframe),
}

impl Wireframe {
    pub fn id(&self) -> NodeId {
        match self {
            Wireframe::Shape(w) => w.id,
            Wireframe::Text(w) => w.id,
            Wireframe::Image(w) => w.id,
            Wireframe::Placeholder(w) => w.id,
            Wireframe::Webview(w) => w.id,
        }
    }

    /// Wire name of the wireframe kind
    pub fn kind(&self) -> &'static str {
        match self {
            Wireframe::Shape(_) => "shape",
            Wireframe::Text(_) => "text",
            Wireframe::Image(_) => "image",
            Wireframe::Placeholder(_) => "placeholder",
            Wireframe::Webview(_) => "webview",
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            Wireframe::Shape(w) => w.geometry,
            Wireframe::Text(w) => w.geometry,
            Wireframe::Image(w) => w.geometry,
            Wireframe::Placeholder(w) => w.geometry,
            Wireframe::Webview(w) => w.geometry,
        }
    }

    pub fn clip(&self) -> Option<&ContentClip> {
        match self {
            Wireframe::Shape(w) => w.clip.as_ref(),
            Wireframe::Text(w) => w.clip.as_ref(),
            Wireframe::Image(w) => w.clip.as_ref(),
            Wireframe::Placeholder(w) => w.clip.as_ref(),
            Wireframe::Webview(w) => w.clip.as_ref(),
        }
    }
}

/// Integer position and size of a wireframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Geometry {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.x.round() as i64,
            y: rect.y.round() as i64,
            width: rect.width.round() as i64,
            height: rect.height.round() as i64,
        }
    }
}

/// Insets of a wireframe frame that are clipped away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentClip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<i64>,
}

impl ContentClip {
    /// Clip of `frame` against `clip`; `None` when the frame is fully inside
    pub fn from_frames(frame: Rect, clip: Rect) -> Option<ContentClip> {
        if clip.contains_rect(&frame) {
            return None;
        }

        let visible = frame.intersection(&clip);
        if visible.is_empty() {
            return Some(ContentClip {
                top: Some(frame.height.round() as i64),
                bottom: None,
                left: Some(frame.width.round() as i64),
                right: None,
            });
        }

        let inset = |value: f64| {
            let value = value.max(0.0).round() as i64;
            (value > 0).then_some(value)
        };
        let content_clip = ContentClip {
            top: inset(visible.min_y() - frame.min_y()),
            bottom: inset(frame.max_y() - visible.max_y()),
            left: inset(visible.min_x() - frame.min_x()),
            right: inset(frame.max_x() - visible.max_x()),
        };
        (content_clip != ContentClip::default()).then_some(content_clip)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeBorder {
    pub color: String,
    pub width: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    pub color: String,
    pub family: String,
    pub size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<TextAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeWireframe {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextWireframe {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
    pub text: String,
    pub text_style: TextStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_position: Option<TextPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageWireframe {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: Geometry,
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
    /// Image content is not available (yet)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_empty: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderWireframe {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebviewWireframe {
    pub id: NodeId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ContentClip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<ShapeBorder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<ShapeStyle>,
    pub slot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
}

/// Border and fill of a wireframe
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Appearance {
    pub border_color: Option<Color>,
    pub border_width: f64,
    pub background_color: Option<Color>,
    pub corner_radius: f64,
    pub opacity: f64,
}

impl Appearance {
    pub fn from_attributes(attributes: &ViewAttributes) -> Self {
        Self {
            border_color: attributes.border_color,
            border_width: attributes.border_width,
            background_color: attributes.background_color,
            corner_radius: attributes.corner_radius,
            opacity: attributes.alpha,
        }
    }

    /// No border, no fill, fully opaque
    pub fn none() -> Self {
        Self {
            opacity: 1.0,
            ..Default::default()
        }
    }

    pub fn filled(color: Color, corner_radius: f64) -> Self {
        Self {
            background_color: Some(color),
            corner_radius,
            ..Self::none()
        }
    }

    fn border(&self) -> Option<ShapeBorder> {
        let color = self.border_color?;
        let width = finite(self.border_width)?;
        (width > 0.0).then(|| ShapeBorder {
            color: color.hex_string(),
            width: width.round() as i64,
        })
    }

    fn shape_style(&self) -> Option<ShapeStyle> {
        let style = ShapeStyle {
            background_color: self.background_color.map(|c| c.hex_string()),
            corner_radius: finite(self.corner_radius).filter(|r| *r > 0.0),
            opacity: finite(self.opacity).filter(|o| *o < 1.0),
        };
        (style != ShapeStyle::default()).then_some(style)
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Font settings of a text wireframe before fallbacks apply
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub color: Option<Color>,
    pub family: Option<String>,
    pub size: Option<f64>,
}

/// Creates wireframes for node builders during one processing pass
pub struct WireframesBuilder<'a> {
    images: &'a dyn ImageDataProvider,
    /// Web view slots known in this view and not yet rendered in this pass
    pending_webview_slots: BTreeMap<i64, NodeId>,
}

impl<'a> WireframesBuilder<'a> {
    pub fn new(images: &'a dyn ImageDataProvider, webview_slots: BTreeMap<i64, NodeId>) -> Self {
        Self {
            images,
            pending_webview_slots: webview_slots,
        }
    }

    pub fn shape_wireframe(
        &self,
        id: NodeId,
        frame: Rect,
        clip: Rect,
        appearance: &Appearance,
    ) -> Wireframe {
        Wireframe::Shape(ShapeWireframe {
            id,
            geometry: Geometry::from_rect(frame),
            clip: ContentClip::from_frames(frame, clip),
            border: appearance.border(),
            shape_style: appearance.shape_style(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn text_wireframe(
        &self,
        id: NodeId,
        frame: Rect,
        clip: Rect,
        text: String,
        text_frame: Option<Rect>,
        alignment: Option<TextAlignment>,
        font: &Font,
        appearance: &Appearance,
    ) -> Wireframe {
        let padding = text_frame.map(|inner| Padding {
            top: padding_value(inner.min_y() - frame.min_y()),
            bottom: padding_value(frame.max_y() - inner.max_y()),
            left: padding_value(inner.min_x() - frame.min_x()),
            right: padding_value(frame.max_x() - inner.max_x()),
        });
        let text_position = (alignment.is_some() || padding.is_some())
            .then_some(TextPosition { alignment, padding });

        Wireframe::Text(TextWireframe {
            id,
            geometry: Geometry::from_rect(frame),
            clip: ContentClip::from_frames(frame, clip),
            border: appearance.border(),
            shape_style: appearance.shape_style(),
            text,
            text_style: TextStyle {
                color: font
                    .color
                    .map(|c| c.hex_string())
                    .unwrap_or_else(|| FALLBACK_TEXT_COLOR.to_string()),
                family: font
                    .family
                    .clone()
                    .unwrap_or_else(|| FALLBACK_FONT_FAMILY.to_string()),
                size: font
                    .size
                    .and_then(finite)
                    .map(|s| s.round() as i64)
                    .unwrap_or(FALLBACK_FONT_SIZE),
            },
            text_position,
        })
    }

    /// Image wireframe with content from the image data provider.
    ///
    /// When the provider has no data the wireframe is marked empty.
    pub fn image_wireframe(
        &self,
        id: NodeId,
        frame: Rect,
        clip: Rect,
        image: &ImageRef,
        tint: Option<Color>,
        appearance: &Appearance,
    ) -> Wireframe {
        let data = self.images.content_base64(image, tint);
        let is_empty = data.is_none();
        let (base64, mime_type) = match data {
            Some(data) => (Some(data.base64), data.mime_type),
            None => (None, None),
        };

        Wireframe::Image(ImageWireframe {
            id,
            geometry: Geometry::from_rect(frame),
            clip: ContentClip::from_frames(frame, clip),
            border: appearance.border(),
            shape_style: appearance.shape_style(),
            base64,
            resource_id: None,
            mime_type,
            is_empty: is_empty.then_some(true),
        })
    }

    pub fn placeholder_wireframe(
        &self,
        id: NodeId,
        frame: Rect,
        clip: Rect,
        label: &str,
    ) -> Wireframe {
        Wireframe::Placeholder(PlaceholderWireframe {
            id,
            geometry: Geometry::from_rect(frame),
            clip: ContentClip::from_frames(frame, clip),
            label: Some(label.to_string()),
        })
    }

    /// Visible web view; its slot no longer needs a hidden wireframe
    pub fn webview_wireframe(
        &mut self,
        id: NodeId,
        slot_id: i64,
        frame: Rect,
        clip: Rect,
        appearance: &Appearance,
    ) -> Wireframe {
        self.pending_webview_slots.remove(&slot_id);
        Wireframe::Webview(WebviewWireframe {
            id,
            geometry: Geometry::from_rect(frame),
            clip: ContentClip::from_frames(frame, clip),
            border: appearance.border(),
            shape_style: appearance.shape_style(),
            slot_id: slot_id.to_string(),
            is_visible: Some(true),
        })
    }

    /// Hidden wireframes for known web view slots not rendered in this pass
    pub fn hidden_webview_wireframes(&mut self) -> Vec<Wireframe> {
        std::mem::take(&mut self.pending_webview_slots)
            .into_iter()
            .map(|(slot_id, id)| {
                Wireframe::Webview(WebviewWireframe {
                    id,
                    geometry: Geometry::default(),
                    clip: None,
                    border: None,
                    shape_style: None,
                    slot_id: slot_id.to_string(),
                    is_visible: Some(false),
                })
            })
            .collect()
    }
}

fn padding_value(value: f64) -> Option<i64> {
    let value = finite(value)?.max(0.0).round() as i64;
    (value > 0).then_some(value)
}
