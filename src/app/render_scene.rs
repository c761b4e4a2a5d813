//! Builder für Render-Szenen aus Store und Segment-Manager.

use crate::core::{FeatureStore, LatLng, LineSegment, LineSegmentManager, Node};
use crate::shared::{NodeRenderPayload, RenderScene, SegmentRenderPayload};

/// Payload eines einzelnen Segments.
pub fn segment_payload(segment: &LineSegment) -> SegmentRenderPayload {
    let style = &segment.style;
    SegmentRenderPayload {
        way_id: segment.way_id,
        node_start: segment.node_start,
        node_end: segment.node_end,
        path: segment.path,
        stroke_color: style.stroke_color.clone(),
        stroke_weight: style.stroke_weight,
        stroke_opacity: style.stroke_opacity,
        z_index: style.z_index,
        visible: style.visible,
        clickable: style.clickable,
        draggable: style.draggable,
    }
}

/// Payload eines einzelnen Nodes.
pub fn node_payload(node: &Node) -> NodeRenderPayload {
    NodeRenderPayload {
        id: node.id,
        position: node.position,
        visible: node.visible,
        clickable: node.clickable,
        draggable: node.draggable,
    }
}

/// Baut eine RenderScene aus dem aktuellen Zustand.
pub fn build(
    store: &FeatureStore,
    segments: &LineSegmentManager,
    focus: Option<LatLng>,
) -> RenderScene {
    let mut segment_payloads: Vec<SegmentRenderPayload> =
        segments.iter().map(segment_payload).collect();
    segment_payloads.sort_by_key(|s| (s.z_index, s.key()));

    let mut node_payloads: Vec<NodeRenderPayload> = store.nodes_iter().map(node_payload).collect();
    node_payloads.sort_by_key(|n| n.id);

    RenderScene {
        segments: segment_payloads,
        nodes: node_payloads,
        focus,
    }
}

#[cfg(test)]
mod tests {
    use super::build;
    use crate::core::{FeatureStore, LatLng, LineSegmentKey, LineSegmentManager, NodeOptions};

    #[test]
    fn build_orders_by_z_index_and_carries_style() {
        let mut store = FeatureStore::new();
        store
            .create_node(1, LatLng::new(0.0, 0.0), None, None)
            .expect("Node");
        store
            .create_node(
                2,
                LatLng::new(0.0, 1.0),
                Some(NodeOptions {
                    visible: false,
                    ..NodeOptions::default()
                }),
                None,
            )
            .expect("Node");
        store
            .create_node(3, LatLng::new(0.0, 2.0), None, None)
            .expect("Node");
        store.create_way(7, &[1, 2, 3], None, None).expect("Way");

        let mut segments = LineSegmentManager::default();
        segments
            .sync_way(store.get_way(7).expect("Way"), &store)
            .expect("Segmente");
        segments
            .get_line_segment_mut(&LineSegmentKey::new(7, 1, 2))
            .expect("Segment")
            .style
            .z_index = 5;

        let scene = build(&store, &segments, None);
        assert!(scene.has_content());
        assert_eq!(scene.segments.len(), 2);
        assert_eq!(scene.segments[0].key(), LineSegmentKey::new(7, 2, 3));
        assert_eq!(scene.segments[1].z_index, 5);
        assert_eq!(scene.nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!scene.nodes[1].visible);
    }
}
