//! View tree recorder.
//!
//! Walks the live hierarchy in pre-order on the UI context, reading attributes,
//! resolving privacy and classifying every element. The result is a flat, ordered
//! [`ViewTreeSnapshot`] that the background worker turns into wireframes.
//!
//! A single failing element never aborts the walk: it degrades to an empty node
//! and its children are still visited.

use crate::classifiers::{ClassificationContext, ClassifierRegistry};
use crate::config::Config;
use crate::element::{ElementContent, UiElement};
use crate::identity::IdentityGenerator;
use crate::privacy::{self, PrivacyFilter, PrivacyOverrides, ResolvedPrivacy};
use crate::snapshot::{Node, NodeSemantics, SubtreeStrategy, ViewAttributes, ViewTreeSnapshot};
use crate::telemetry::Telemetry;
use crate::types::{NodeId, Point, Rect, RecordingContext, Size};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Phase-one recorder
pub struct Recorder {
    registry: ClassifierRegistry,
    identity: Arc<IdentityGenerator>,
    privacy_filter: PrivacyFilter,
    telemetry: Arc<dyn Telemetry>,
}

/// Mutable state of one walk
struct Walk<'a> {
    context: &'a RecordingContext,
    defaults: ResolvedPrivacy,
    /// Effective overrides of the current element's ancestors, root first
    ancestors: Vec<PrivacyOverrides>,
    nodes: Vec<Node>,
    webview_slots: BTreeMap<i64, NodeId>,
}

impl Recorder {
    /// Recorder with the built-in classifiers
    pub fn new(
        config: &Config,
        identity: Arc<IdentityGenerator>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self::with_registry(
            ClassifierRegistry::new(config.classification.tie_break),
            identity,
            PrivacyFilter::new(&config.privacy),
            telemetry,
        )
    }

    /// Recorder with a custom classifier registry
    pub fn with_registry(
        registry: ClassifierRegistry,
        identity: Arc<IdentityGenerator>,
        privacy_filter: PrivacyFilter,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            registry,
            identity,
            privacy_filter,
            telemetry,
        }
    }

    pub fn identity(&self) -> &Arc<IdentityGenerator> {
        &self.identity
    }

    /// Walk the hierarchy under `root` and capture a snapshot
    pub fn record<E: UiElement>(
        &self,
        root: &E,
        viewport_size: Size,
        context: &RecordingContext,
    ) -> ViewTreeSnapshot {
        let mut walk = Walk {
            context,
            defaults: ResolvedPrivacy::from_context(context),
            ancestors: Vec::new(),
            nodes: Vec::new(),
            webview_slots: BTreeMap::new(),
        };

        let viewport = Rect::from_size(viewport_size);
        self.visit(root, Point::default(), viewport, &mut walk);

        debug!(
            "Recorded {} nodes ({} web view slots)",
            walk.nodes.len(),
            walk.webview_slots.len()
        );

        ViewTreeSnapshot {
            date: context.date,
            context: context.clone(),
            viewport_size,
            nodes: walk.nodes,
            webview_slots: walk.webview_slots,
        }
    }

    fn visit<E: UiElement>(
        &self,
        element: &E,
        parent_origin: Point,
        parent_clip: Rect,
        walk: &mut Walk<'_>,
    ) {
        let handle = element.handle();
        let overrides = self
            .privacy_filter
            .effective_overrides(element.privacy_overrides(), element.identifier());
        let privacy = privacy::resolve(&overrides, &walk.ancestors, &walk.defaults);

        let local = match element.attributes() {
            Ok(local) => local,
            Err(e) => {
                self.telemetry.error(
                    &format!("Element {:?} degraded to an empty node: {}", handle, e),
                    "attribute_read",
                );
                let origin = parent_origin;
                walk.nodes
                    .push(Node::empty(ViewAttributes::placeholder(origin, parent_clip), privacy));
                self.visit_children(element, overrides, origin, parent_clip, walk);
                return;
            }
        };
        let attributes = ViewAttributes::new(&local, parent_origin, parent_clip);

        // Slots are tracked even when the web view is not drawn this time
        if let ElementContent::WebView { slot_id } = element.content() {
            walk.webview_slots
                .insert(*slot_id, self.identity.node_id(handle));
        }

        let semantics = if privacy.hide || !attributes.is_visible() || attributes.is_offscreen() {
            NodeSemantics::Invisible
        } else {
            let classification = ClassificationContext {
                handle,
                privacy,
                recording: walk.context,
                ids: &self.identity,
            };
            match self
                .registry
                .classify(element.content(), &attributes, &classification)
            {
                Ok(semantics) => semantics,
                Err(e) => {
                    self.telemetry.error(
                        &format!("Element {:?} degraded to an empty node: {}", handle, e),
                        "classification",
                    );
                    walk.nodes.push(Node::empty(attributes.clone(), privacy));
                    NodeSemantics::Unknown
                }
            }
        };

        trace!("Element {:?} classified as {:?}", handle, semantics_tag(&semantics));
        let strategy = semantics.subtree_strategy();
        walk.nodes.extend(semantics.into_nodes());

        if strategy == SubtreeStrategy::Record {
            let origin = Point::new(attributes.frame.x, attributes.frame.y);
            let clip = if local.clips_to_bounds {
                attributes.clip.intersection(&attributes.frame)
            } else {
                attributes.clip
            };
            self.visit_children(element, overrides, origin, clip, walk);
        }
    }

    fn visit_children<E: UiElement>(
        &self,
        element: &E,
        overrides: PrivacyOverrides,
        origin: Point,
        clip: Rect,
        walk: &mut Walk<'_>,
    ) {
        let children = element.children();
        if children.is_empty() {
            return;
        }

        walk.ancestors.push(overrides);
        for child in children {
            self.visit(child, origin, clip, walk);
        }
        walk.ancestors.pop();
    }
}

fn semantics_tag(semantics: &NodeSemantics) -> &'static str {
    match semantics {
        NodeSemantics::Ignore => "ignore",
        NodeSemantics::Invisible => "invisible",
        NodeSemantics::Unknown => "unknown",
        NodeSemantics::Specific { .. } => "specific",
        NodeSemantics::Ambiguous { .. } => "ambiguous",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::Classifier;
    use crate::config::TieBreak;
    use crate::element::{ElementAttributes, ElementTree, TextAlignment};
    use crate::resources::Base64ImageDataProvider;
    use crate::telemetry::CountingTelemetry;
    use crate::types::{
        Color, ElementHandle, ImagePrivacyLevel, RecorderError, TextAndInputPrivacyLevel,
        TouchPrivacyLevel,
    };
    use crate::wireframe::{Wireframe, WireframesBuilder};
    use chrono::Utc;
    use proptest::prelude::*;

    fn context(text: TextAndInputPrivacyLevel) -> RecordingContext {
        RecordingContext {
            text_and_input_privacy: text,
            image_privacy: ImagePrivacyLevel::MaskNone,
            touch_privacy: TouchPrivacyLevel::Show,
            application_id: "app".to_string(),
            session_id: "session".to_string(),
            view_id: "view".to_string(),
            server_time_offset_ms: 0,
            date: Utc::now(),
        }
    }

    fn recorder() -> Recorder {
        Recorder::new(
            &Config::default(),
            Arc::new(IdentityGenerator::new()),
            Arc::new(CountingTelemetry::new()),
        )
    }

    fn filled(slot: u32, frame: Rect) -> ElementTree {
        let mut tree = ElementTree::new(slot, frame, ElementContent::Container);
        tree.attributes.background_color = Some(Color::WHITE);
        tree
    }

    fn label(slot: u32, frame: Rect, text: &str) -> ElementTree {
        ElementTree::new(
            slot,
            frame,
            ElementContent::Label {
                text: text.to_string(),
                font_family: None,
                font_size: None,
                text_color: None,
                alignment: TextAlignment::default(),
                text_frame: None,
            },
        )
    }

    fn wireframes(snapshot: &ViewTreeSnapshot) -> Vec<Wireframe> {
        let provider = Base64ImageDataProvider;
        let mut builder = WireframesBuilder::new(&provider, snapshot.webview_slots.clone());
        snapshot.build_wireframes(&mut builder)
    }

    fn viewport() -> Size {
        Size::new(100.0, 100.0)
    }

    #[test]
    fn test_pre_order_with_absolute_geometry() {
        let tree = filled(1, Rect::new(10.0, 10.0, 80.0, 80.0))
            .with_child(filled(2, Rect::new(5.0, 5.0, 20.0, 20.0)))
            .with_child(label(3, Rect::new(5.0, 30.0, 50.0, 10.0), "Hi"));

        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAllInputs));
        let wireframes = wireframes(&snapshot);

        assert_eq!(wireframes.len(), 3);
        assert_eq!(wireframes[1].geometry().x, 15);
        assert_eq!(wireframes[2].geometry().y, 40);
        assert_eq!(wireframes[2].kind(), "text");
    }

    #[test]
    fn test_unknown_container_is_transparent() {
        let tree = ElementTree::new(1, Rect::new(0.0, 0.0, 100.0, 100.0), ElementContent::Container)
            .with_child(filled(2, Rect::new(0.0, 0.0, 10.0, 10.0)));
        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        assert_eq!(snapshot.nodes.len(), 1);
    }

    #[test]
    fn test_hidden_and_offscreen_subtrees_skipped() {
        let mut hidden = filled(2, Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_child(filled(3, Rect::new(0.0, 0.0, 5.0, 5.0)));
        hidden.attributes.is_hidden = true;
        let offscreen = filled(4, Rect::new(500.0, 500.0, 10.0, 10.0));
        let transparent = ElementTree {
            attributes: ElementAttributes {
                alpha: 0.0,
                ..filled(5, Rect::new(0.0, 0.0, 10.0, 10.0)).attributes
            },
            ..filled(5, Rect::new(0.0, 0.0, 10.0, 10.0))
        };

        let tree = filled(1, Rect::new(0.0, 0.0, 100.0, 100.0))
            .with_child(hidden)
            .with_child(offscreen)
            .with_child(transparent);
        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        assert_eq!(snapshot.nodes.len(), 1);
    }

    #[test]
    fn test_force_hide_wins_over_classifiers() {
        let tree = filled(1, Rect::new(0.0, 0.0, 100.0, 100.0)).with_child(
            label(2, Rect::new(0.0, 0.0, 50.0, 10.0), "secret").with_privacy(PrivacyOverrides {
                hide: Some(true),
                ..PrivacyOverrides::default()
            }),
        );
        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAllInputs));
        assert_eq!(snapshot.nodes.len(), 1);
    }

    #[test]
    fn test_hidden_identifier_pattern() {
        let tree = filled(1, Rect::new(0.0, 0.0, 100.0, 100.0))
            .with_child(filled(2, Rect::new(0.0, 0.0, 10.0, 10.0)).with_identifier("user-password-field"));
        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        assert_eq!(snapshot.nodes.len(), 1);
    }

    #[test]
    fn test_ancestor_override_cascades() {
        let tree = ElementTree::new(1, Rect::new(0.0, 0.0, 100.0, 100.0), ElementContent::Container)
            .with_privacy(PrivacyOverrides {
                text_and_input: Some(TextAndInputPrivacyLevel::MaskAll),
                ..PrivacyOverrides::default()
            })
            .with_child(label(2, Rect::new(0.0, 0.0, 50.0, 10.0), "Hello"));

        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAllInputs));
        match &wireframes(&snapshot)[0] {
            Wireframe::Text(text) => assert_eq!(text.text, "xxxxx"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_clips_to_bounds_narrows_children() {
        let mut parent = filled(1, Rect::new(0.0, 0.0, 50.0, 50.0))
            .with_child(filled(2, Rect::new(40.0, 0.0, 20.0, 20.0)));
        parent.attributes.clips_to_bounds = true;

        let snapshot = recorder().record(&parent, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        let child = &wireframes(&snapshot)[1];
        assert_eq!(child.clip().and_then(|clip| clip.right), Some(10));
    }

    #[test]
    fn test_webview_slot_tracked_when_hidden() {
        let mut webview = ElementTree::new(2, Rect::new(0.0, 0.0, 50.0, 50.0), ElementContent::WebView { slot_id: 9 });
        webview.attributes.is_hidden = true;
        let tree = filled(1, Rect::new(0.0, 0.0, 100.0, 100.0)).with_child(webview);

        let snapshot = recorder().record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        assert!(snapshot.webview_slots.contains_key(&9));

        let wireframes = wireframes(&snapshot);
        match wireframes.last() {
            Some(Wireframe::Webview(webview)) => assert_eq!(webview.is_visible, Some(false)),
            other => panic!("expected hidden webview, got {:?}", other),
        }
    }

    /// Element whose attributes cannot be read
    struct Broken {
        children: Vec<Broken>,
        content: ElementContent,
        fails: bool,
        slot: u32,
    }

    impl UiElement for Broken {
        fn handle(&self) -> ElementHandle {
            ElementHandle::new(self.slot, 0)
        }

        fn attributes(&self) -> Result<ElementAttributes, RecorderError> {
            if self.fails {
                return Err(RecorderError::AttributeRead("detached".to_string()));
            }
            Ok(ElementAttributes {
                background_color: Some(Color::BLACK),
                ..ElementAttributes::with_frame(Rect::new(0.0, 0.0, 10.0, 10.0))
            })
        }

        fn content(&self) -> &ElementContent {
            &self.content
        }

        fn children(&self) -> &[Self] {
            &self.children
        }
    }

    #[test]
    fn test_attribute_failure_degrades_single_node() {
        let telemetry = Arc::new(CountingTelemetry::new());
        let recorder = Recorder::new(&Config::default(), Arc::new(IdentityGenerator::new()), telemetry.clone());
        let tree = Broken {
            slot: 1,
            fails: true,
            content: ElementContent::Container,
            children: vec![Broken {
                slot: 2,
                fails: false,
                content: ElementContent::Container,
                children: Vec::new(),
            }],
        };

        let snapshot = recorder.record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(telemetry.error_count(), 1);
        assert_eq!(wireframes(&snapshot).len(), 1);
    }

    /// Fails on custom elements of class `Broken`
    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn semantics(
            &self,
            content: &ElementContent,
            _attributes: &ViewAttributes,
            _context: &ClassificationContext<'_>,
        ) -> Result<Option<NodeSemantics>, RecorderError> {
            match content {
                ElementContent::Custom { class_name } if class_name == "Broken" => {
                    Err(RecorderError::Classification {
                        classifier: self.name(),
                        reason: "unreadable state".to_string(),
                    })
                }
                _ => Ok(None),
            }
        }
    }

    #[test]
    fn test_classifier_failure_degrades_single_node() {
        let telemetry = Arc::new(CountingTelemetry::new());
        let mut registry = ClassifierRegistry::new(TieBreak::FirstMatch);
        registry.register(Box::new(FailingClassifier));
        let recorder = Recorder::with_registry(
            registry,
            Arc::new(IdentityGenerator::new()),
            PrivacyFilter::default(),
            telemetry.clone(),
        );

        let mut broken = ElementTree::new(
            1,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            ElementContent::Custom {
                class_name: "Broken".to_string(),
            },
        );
        broken.attributes.background_color = Some(Color::WHITE);
        let tree = broken
            .with_child(filled(2, Rect::new(10.0, 10.0, 20.0, 20.0)))
            .with_child(label(3, Rect::new(10.0, 40.0, 50.0, 10.0), "Hi"));

        let snapshot = recorder.record(&tree, viewport(), &context(TextAndInputPrivacyLevel::MaskAllInputs));
        assert_eq!(telemetry.error_count(), 1);
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes[0].view_attributes.frame, Rect::new(0.0, 0.0, 100.0, 100.0));

        let wireframes = wireframes(&snapshot);
        let kinds: Vec<&str> = wireframes.iter().map(Wireframe::kind).collect();
        assert_eq!(kinds, vec!["shape", "text"]);
        assert_eq!(wireframes[0].geometry().x, 10);
        let root_id = recorder.identity().node_id(ElementHandle::new(1, 0));
        assert!(wireframes.iter().all(|wireframe| wireframe.id() != root_id));
    }

    #[test]
    fn test_ids_stable_across_captures() {
        let recorder = recorder();
        let tree = filled(1, Rect::new(0.0, 0.0, 100.0, 100.0))
            .with_child(label(2, Rect::new(0.0, 0.0, 50.0, 10.0), "a"));
        let ctx = context(TextAndInputPrivacyLevel::MaskAll);

        let first: Vec<NodeId> = wireframes(&recorder.record(&tree, viewport(), &ctx)).iter().map(Wireframe::id).collect();
        let second: Vec<NodeId> = wireframes(&recorder.record(&tree, viewport(), &ctx)).iter().map(Wireframe::id).collect();
        assert_eq!(first, second);
    }

    /// `outer` contains `inner`, up to float rounding of the intersection
    fn contains_within(outer: &Rect, inner: &Rect) -> bool {
        const EPSILON: f64 = 1e-9;
        inner.min_x() >= outer.min_x() - EPSILON
            && inner.min_y() >= outer.min_y() - EPSILON
            && inner.max_x() <= outer.max_x() + EPSILON
            && inner.max_y() <= outer.max_y() + EPSILON
    }

    #[test]
    fn test_nested_clips_shrink() {
        let mut inner = filled(2, Rect::new(20.0, 20.0, 60.0, 60.0))
            .with_child(filled(3, Rect::new(-10.0, -10.0, 100.0, 100.0)));
        inner.attributes.clips_to_bounds = true;
        let mut outer = filled(1, Rect::new(10.0, 10.0, 50.0, 50.0)).with_child(inner);
        outer.attributes.clips_to_bounds = true;

        let snapshot = recorder().record(&outer, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
        let clips: Vec<Rect> = snapshot.nodes.iter().map(|node| node.view_attributes.clip).collect();
        assert_eq!(
            clips,
            vec![
                Rect::new(0.0, 0.0, 100.0, 100.0),
                Rect::new(10.0, 10.0, 50.0, 50.0),
                Rect::new(30.0, 30.0, 30.0, 30.0),
            ]
        );
    }

    proptest! {
        #[test]
        fn test_geometry_invariants(
            frames in proptest::collection::vec((-50.0f64..150.0, -50.0f64..150.0, -10.0f64..80.0, -10.0f64..80.0), 1..12),
            clips in proptest::collection::vec(any::<bool>(), 12),
        ) {
            let mut root = filled(0, Rect::new(0.0, 0.0, 100.0, 100.0));
            root.attributes.clips_to_bounds = true;
            let mut parent = &mut root;
            for (i, (x, y, w, h)) in frames.iter().enumerate() {
                let mut child = filled(i as u32 + 1, Rect::new(*x, *y, *w, *h));
                child.attributes.clips_to_bounds = clips[i];
                parent.children.push(child);
                parent = &mut parent.children[0];
            }

            let snapshot = recorder().record(&root, viewport(), &context(TextAndInputPrivacyLevel::MaskAll));
            for wireframe in wireframes(&snapshot) {
                let geometry = wireframe.geometry();
                prop_assert!(geometry.width >= 0 && geometry.height >= 0);
                if let Some(clip) = wireframe.clip() {
                    for inset in [clip.top, clip.bottom, clip.left, clip.right].into_iter().flatten() {
                        prop_assert!(inset >= 0);
                    }
                }
            }

            // The chain is recorded as a prefix, so each node's parent is the one before it
            let mut parent_clip = Rect::from_size(viewport());
            for node in &snapshot.nodes {
                let clip = node.view_attributes.clip;
                prop_assert!(
                    clip.is_empty() || contains_within(&parent_clip, &clip),
                    "clip {:?} escapes parent clip {:?}",
                    clip,
                    parent_clip
                );
                parent_clip = clip;
            }
        }
    }
}
