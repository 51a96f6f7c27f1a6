//! Image payloads and resource extraction.
//!
//! Image wireframes are first built with inline base64 content. Unless inline
//! images are configured, the extractor then moves the payload out of the
//! wireframe into a content-addressed [`Resource`] and leaves only its identifier.

use crate::element::ImageRef;
use crate::types::{Color, RecordingContext};
use crate::wireframe::Wireframe;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Encoded image content returned by an [`ImageDataProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub identifier: String,
    pub base64: String,
    pub mime_type: Option<String>,
}

/// Supplies encoded content for image elements
pub trait ImageDataProvider: Send + Sync {
    fn content_base64(&self, image: &ImageRef, tint: Option<Color>) -> Option<ImageData>;
}

/// Encodes the raw image bytes as they are
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64ImageDataProvider;

impl ImageDataProvider for Base64ImageDataProvider {
    fn content_base64(&self, image: &ImageRef, tint: Option<Color>) -> Option<ImageData> {
        if image.bytes.is_empty() {
            return None;
        }
        let mut identifier = content_hash(&image.bytes);
        if let Some(tint) = tint {
            identifier.push_str(&tint.hex_string());
        }
        Some(ImageData {
            identifier,
            base64: STANDARD.encode(&image.bytes),
            mime_type: mime_type(&image.bytes),
        })
    }
}

/// SHA-256 hex digest of a payload
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn mime_type(data: &[u8]) -> Option<String> {
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

/// Content-addressed binary payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub identifier: String,
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Resource with the context that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedResource {
    pub identifier: String,
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub application_id: String,
    pub session_id: String,
    pub view_id: String,
}

impl EnrichedResource {
    pub fn new(resource: Resource, context: &RecordingContext) -> Self {
        Self {
            identifier: resource.identifier,
            data: resource.data,
            mime_type: resource.mime_type,
            application_id: context.application_id.clone(),
            session_id: context.session_id.clone(),
            view_id: context.view_id.clone(),
        }
    }
}

/// Consumes extracted resources (upload is handled outside the recorder)
#[async_trait]
pub trait ResourcePipeline: Send + Sync {
    async fn submit(&self, resources: Vec<EnrichedResource>);
}

/// Resource pipeline that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResourcePipeline;

#[async_trait]
impl ResourcePipeline for NoopResourcePipeline {
    async fn submit(&self, _resources: Vec<EnrichedResource>) {}
}

/// Moves image payloads out of wireframes
#[derive(Debug, Default)]
pub struct ResourceExtractor {
    /// Keep payloads inline and never extract
    inline_images: bool,
    /// Identifiers already handed to the pipeline in the current session
    known: HashSet<String>,
}

impl ResourceExtractor {
    pub fn new(inline_images: bool) -> Self {
        Self {
            inline_images,
            known: HashSet::new(),
        }
    }

    /// Extract the payload of an image wireframe.
    ///
    /// The wireframe keeps only the resource identifier. Returns `None` for other
    /// wireframes, inline mode, payloads already known, or undecodable payloads
    /// (the wireframe is then marked empty).
    pub fn extract(&mut self, wireframe: &mut Wireframe) -> Option<Resource> {
        if self.inline_images {
            return None;
        }
        let image = match wireframe {
            Wireframe::Image(image) => image,
            _ => return None,
        };
        let encoded = image.base64.take()?;

        let data = match STANDARD.decode(encoded.as_bytes()) {
            Ok(data) => data,
            Err(e) => {
                warn!("Dropping undecodable image payload for wireframe {}: {}", image.id, e);
                image.resource_id = None;
                image.is_empty = Some(true);
                return None;
            }
        };

        let identifier = content_hash(&data);
        let mime_type = mime_type(&data).or_else(|| image.mime_type.clone());
        image.resource_id = Some(identifier.clone());
        image.mime_type = mime_type.clone();
        image.is_empty = None;

        if !self.known.insert(identifier.clone()) {
            debug!("Resource {} already known", identifier);
            return None;
        }

        Some(Resource {
            identifier,
            data,
            mime_type,
        })
    }

    /// Extract every new resource referenced by `wireframes`
    pub fn extract_all(&mut self, wireframes: &mut [Wireframe]) -> Vec<Resource> {
        wireframes
            .iter_mut()
            .filter_map(|wireframe| self.extract(wireframe))
            .collect()
    }

    /// Forget every known identifier so they are extracted again
    pub fn reset(&mut self) {
        self.known.clear();
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }
}
