//! Embedded web content classifier.

use super::{ClassificationContext, Classifier};
use crate::element::ElementContent;
use crate::snapshot::{Node, NodeSemantics, NodeWireframesBuilder, SubtreeStrategy, ViewAttributes};
use crate::types::{NodeId, RecorderError};
use crate::wireframe::{Appearance, Wireframe, WireframesBuilder};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebViewClassifier;

impl Classifier for WebViewClassifier {
    fn name(&self) -> &'static str {
        "webview"
    }

    fn semantics(
        &self,
        content: &ElementContent,
        attributes: &ViewAttributes,
        context: &ClassificationContext<'_>,
    ) -> Result<Option<NodeSemantics>, RecorderError> {
        let slot_id = match content {
            ElementContent::WebView { slot_id } => *slot_id,
            _ => return Ok(None),
        };

        let builder = WebViewNodeBuilder {
            id: context.ids.node_id(context.handle),
            slot_id,
            attributes: attributes.clone(),
        };
        Ok(Some(NodeSemantics::Specific {
            subtree_strategy: SubtreeStrategy::Ignore,
            nodes: vec![Node::new(attributes.clone(), context.privacy, Arc::new(builder))],
        }))
    }
}

#[derive(Debug, Clone)]
pub struct WebViewNodeBuilder {
    pub id: NodeId,
    pub slot_id: i64,
    pub attributes: ViewAttributes,
}

impl NodeWireframesBuilder for WebViewNodeBuilder {
    fn build_wireframes(&self, builder: &mut WireframesBuilder<'_>) -> Vec<Wireframe> {
        vec![builder.webview_wireframe(
            self.id,
            self.slot_id,
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
    use crate::types::{ElementHandle, Point, Rect};
    use std::collections::BTreeMap;

    #[test]
    fn test_visible_webview_wireframe() {
        let ids = IdentityGenerator::new();
        let recording = recording_context();
        let handle = ElementHandle::new(8, 0);
        let context = ClassificationContext {
            handle,
            privacy: ResolvedPrivacy::from_context(&recording),
            recording: &recording,
            ids: &ids,
        };
        let attributes = ViewAttributes::new(
            &ElementAttributes::with_frame(Rect::new(0.0, 0.0, 50.0, 50.0)),
            Point::default(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );

        let nodes = WebViewClassifier
            .semantics(&ElementContent::WebView { slot_id: 77 }, &attributes, &context)
            .unwrap()
            .unwrap()
            .into_nodes();

        let provider = Base64ImageDataProvider;
        let node_id = ids.node_id(handle);
        let mut builder = WireframesBuilder::new(&provider, BTreeMap::from([(77, node_id)]));
        let wireframes = nodes[0].wireframes_builder.build_wireframes(&mut builder);
        assert!(builder.hidden_webview_wireframes().is_empty());

        match &wireframes[0] {
            Wireframe::Webview(webview) => {
                assert_eq!(webview.id, node_id);
                assert_eq!(webview.slot_id, "77");
                assert_eq!(webview.is_visible, Some(true));
            }
            other => panic!("expected webview, got {:?}", other),
        }
    }
}
