//! Privacy resolution and masking.
//!
//! This module provides functionality to:
//! - Resolve the effective privacy of an element from its ancestor override chain
//! - Force-hide elements whose host identifier matches a configured pattern
//! - Mask text and decide whether image or touch content may be recorded

use crate::config::PrivacyConfig;
use crate::types::{
    ImagePrivacyLevel, RecordingContext, TextAndInputPrivacyLevel, TouchPrivacyLevel,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Explicit per-element overrides. `None` inherits from the nearest ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_and_input: Option<TextAndInputPrivacyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePrivacyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touch: Option<TouchPrivacyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<bool>,
}

impl PrivacyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Effective privacy of one element, every axis resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResolvedPrivacy {
    pub text_and_input: TextAndInputPrivacyLevel,
    pub image: ImagePrivacyLevel,
    pub touch: TouchPrivacyLevel,
    pub hide: bool,
}

impl ResolvedPrivacy {
    /// Session-wide defaults taken from the recording context
    pub fn from_context(context: &RecordingContext) -> Self {
        Self {
            text_and_input: context.text_and_input_privacy,
            image: context.image_privacy,
            touch: context.touch_privacy,
            hide: false,
        }
    }
}

/// Resolve the privacy of `element` given its ancestors (root first).
///
/// Each axis is resolved on its own: the element itself or the nearest ancestor
/// that sets the axis wins, otherwise the session default applies.
pub fn resolve(
    element: &PrivacyOverrides,
    ancestors: &[PrivacyOverrides],
    defaults: &ResolvedPrivacy,
) -> ResolvedPrivacy {
    let chain = || std::iter::once(element).chain(ancestors.iter().rev());

    ResolvedPrivacy {
        text_and_input: chain()
            .find_map(|o| o.text_and_input)
            .unwrap_or(defaults.text_and_input),
        image: chain().find_map(|o| o.image).unwrap_or(defaults.image),
        touch: chain().find_map(|o| o.touch).unwrap_or(defaults.touch),
        hide: chain().find_map(|o| o.hide).unwrap_or(defaults.hide),
    }
}

/// Turns configured identifier patterns into force-hide overrides
#[derive(Debug, Clone, Default)]
pub struct PrivacyFilter {
    /// Compiled patterns for hidden element identifiers
    hidden_patterns: Vec<glob::Pattern>,
}

impl PrivacyFilter {
    /// Create a new privacy filter with the given configuration
    pub fn new(config: &PrivacyConfig) -> Self {
        let hidden_patterns = config
            .hidden_identifiers
            .iter()
            .filter_map(|pattern| {
                glob::Pattern::new(pattern)
                    .map_err(|e| {
                        warn!("Invalid hidden identifier pattern '{}': {}", pattern, e);
                        e
                    })
                    .ok()
            })
            .collect();

        Self { hidden_patterns }
    }

    /// Check if an element identifier matches one of the hidden patterns
    pub fn is_hidden(&self, identifier: &str) -> bool {
        for pattern in &self.hidden_patterns {
            if pattern.matches(identifier) {
                debug!("Element '{}' hidden by pattern '{}'", identifier, pattern);
                return true;
            }
        }
        false
    }

    /// Apply the identifier patterns on top of an element's own overrides
    pub fn effective_overrides(
        &self,
        overrides: PrivacyOverrides,
        identifier: Option<&str>,
    ) -> PrivacyOverrides {
        match identifier {
            Some(id) if self.is_hidden(id) => PrivacyOverrides {
                hide: Some(true),
                ..overrides
            },
            _ => overrides,
        }
    }

    /// Add a hidden identifier pattern at runtime
    pub fn hide_identifier(&mut self, pattern: &str) {
        if let Ok(pattern) = glob::Pattern::new(pattern) {
            debug!("Added '{}' to hidden identifiers", pattern);
            self.hidden_patterns.push(pattern);
        }
    }
}

/// Text masking transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObfuscator {
    /// Keep the text as is
    Reveal,
    /// Replace every non-whitespace character with `x`
    SpacePreserving,
    /// Replace the whole text with `***`
    FixedLength,
    /// Drop the text
    Blank,
}

impl TextObfuscator {
    pub fn mask(&self, text: &str) -> String {
        match self {
            TextObfuscator::Reveal => text.to_string(),
            TextObfuscator::SpacePreserving => text
                .chars()
                .map(|c| if c.is_whitespace() { c } else { 'x' })
                .collect(),
            TextObfuscator::FixedLength => {
                if text.is_empty() {
                    String::new()
                } else {
                    "***".to_string()
                }
            }
            TextObfuscator::Blank => String::new(),
        }
    }

    /// Obfuscator for static text (labels, buttons, headings)
    pub fn for_static_text(level: TextAndInputPrivacyLevel) -> Self {
        match level {
            TextAndInputPrivacyLevel::MaskAll => TextObfuscator::SpacePreserving,
            TextAndInputPrivacyLevel::MaskAllInputs
            | TextAndInputPrivacyLevel::MaskSensitiveInputs => TextObfuscator::Reveal,
        }
    }

    /// Obfuscator for the value of a text input
    pub fn for_input_text(level: TextAndInputPrivacyLevel, is_sensitive: bool) -> Self {
        if is_sensitive {
            return TextObfuscator::FixedLength;
        }
        match level {
            TextAndInputPrivacyLevel::MaskAll | TextAndInputPrivacyLevel::MaskAllInputs => {
                TextObfuscator::FixedLength
            }
            TextAndInputPrivacyLevel::MaskSensitiveInputs => TextObfuscator::Reveal,
        }
    }

    /// Obfuscator for the placeholder of a text input
    pub fn for_input_placeholder(level: TextAndInputPrivacyLevel) -> Self {
        match level {
            TextAndInputPrivacyLevel::MaskAll => TextObfuscator::FixedLength,
            TextAndInputPrivacyLevel::MaskAllInputs
            | TextAndInputPrivacyLevel::MaskSensitiveInputs => TextObfuscator::Reveal,
        }
    }
}

/// Check if image content may be recorded
pub fn should_record_image(level: ImagePrivacyLevel, is_bundled: bool) -> bool {
    match level {
        ImagePrivacyLevel::MaskNone => true,
        ImagePrivacyLevel::MaskNonBundledOnly => is_bundled,
        ImagePrivacyLevel::MaskAll => false,
    }
}

/// Check if touch positions may be recorded
pub fn should_record_touch(level: TouchPrivacyLevel) -> bool {
    level == TouchPrivacyLevel::Show
}
