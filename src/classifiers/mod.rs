//! Element classifiers.
//!
//! Each classifier inspects one kind of element and either declines (`None`) or
//! returns its [`NodeSemantics`]. The registry queries them in a fixed priority
//! order:
//! - the first specific (non-ambiguous) result wins, subject to the tie-break policy
//! - when only ambiguous results match, all their candidate nodes are kept
//! - when nothing matches the element is unknown

pub mod image;
pub mod text;
pub mod toggle;
pub mod view;
pub mod webview;

use crate::config::TieBreak;
use crate::element::ElementContent;
use crate::identity::IdentityGenerator;
use crate::privacy::ResolvedPrivacy;
use crate::snapshot::{NodeSemantics, SubtreeStrategy, ViewAttributes};
use crate::types::{ElementHandle, RecordingContext, RecorderError};
use tracing::trace;

pub use image::ImageClassifier;
pub use text::{LabelClassifier, TextInputClassifier};
pub use toggle::ToggleClassifier;
pub use view::ViewClassifier;
pub use webview::WebViewClassifier;

/// Everything a classifier may consult besides the element itself
pub struct ClassificationContext<'a> {
    pub handle: ElementHandle,
    pub privacy: ResolvedPrivacy,
    pub recording: &'a RecordingContext,
    pub ids: &'a IdentityGenerator,
}

/// Classifies one kind of element
pub trait Classifier: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// `None` when this classifier does not apply to the element
    fn semantics(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError>;
}

/// Ordered set of classifiers
pub struct ClassifierRegistry {
    classifiers: Vec<Box<dyn Classifier>>,
    tie_break: TieBreak,
}

impl ClassifierRegistry {
    /// Registry with no classifiers
    pub fn empty(tie_break: TieBreak) -> Self {
        Self {
            classifiers: Vec::new(),
            tie_break,
        }
    }

    /// Registry with the built-in classifiers in priority order
    pub fn new(tie_break: TieBreak) -> Self {
        let mut registry = Self::empty(tie_break);
        registry.register(Box::new(ViewClassifier));
        registry.register(Box::new(LabelClassifier));
        registry.register(Box::new(TextInputClassifier));
        registry.register(Box::new(ImageClassifier));
        registry.register(Box::new(ToggleClassifier));
        registry.register(Box::new(WebViewClassifier));
        registry
    }

    /// Append a classifier with the lowest priority so far
    pub fn register(&mut self, classifier: Box<dyn Classifier>) {
        self.classifiers.push(classifier);
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Classify an element.
    ///
    /// An error from any classifier is returned as is; the caller decides how the
    /// element degrades.
    pub fn classify(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<NodeSemantics, RecorderError> {
        let mut specific = Vec::new();
        let mut ambiguous = Vec::new();
        let mut any_ambiguous = false;

        for classifier in &self.classifiers {
            let semantics = match classifier.semantics(content, attributes, context)? {
                Some(semantics) => semantics,
                None => continue,
            };
            trace!(
                "Classifier '{}' matched element {:?}",
                classifier.name(),
                context.handle
            );

            if semantics.is_ambiguous() {
                any_ambiguous = true;
                ambiguous.extend(semantics.into_nodes());
            } else if self.tie_break == TieBreak::FirstMatch {
                return Ok(semantics);
            } else {
                specific.push(semantics);
            }
        }

        if !specific.is_empty() {
            let preferred = match self.tie_break {
                TieBreak::FirstMatch => None,
                TieBreak::PreferRecordSubtree => specific
                    .iter()
                    .position(|s| s.subtree_strategy() == SubtreeStrategy::Record),
                TieBreak::PreferIgnoreSubtree => specific
                    .iter()
                    .position(|s| s.subtree_strategy() == SubtreeStrategy::Ignore),
            };
            return Ok(specific.swap_remove(preferred.unwrap_or(0)));
        }

        if any_ambiguous {
            return Ok(NodeSemantics::Ambiguous { nodes: ambiguous });
        }

        Ok(NodeSemantics::Unknown)
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new(TieBreak::default())
    }
}
