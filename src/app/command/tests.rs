use super::*;
use crate::core::{TagMap, TagValue};

/// Way 100: 1-2-3-4, Way 200: 3-5, alle Segmente angelegt.
fn fixture() -> (FeatureStore, LineSegmentManager) {
    let mut store = FeatureStore::new();
    for id in 1..=5 {
        store
            .create_node(id, LatLng::new(id as f64, 0.5 * id as f64), None, None)
            .expect("Node anlegen");
    }
    let mut tags = TagMap::new();
    tags.insert("highway".to_string(), TagValue::from("residential"));
    store
        .create_way(100, &[1, 2, 3, 4], Some(tags), None)
        .expect("Way 100");
    store.create_way(200, &[3, 5], None, Some(false)).expect("Way 200");

    let mut segments = LineSegmentManager::default();
    for way_id in [100, 200] {
        segments
            .sync_way(store.get_way(way_id).expect("Way"), &store)
            .expect("Segmente");
    }
    (store, segments)
}

type Fingerprint = (Vec<Node>, Vec<Way>, Vec<LineSegment>);

fn fingerprint(store: &FeatureStore, segments: &LineSegmentManager) -> Fingerprint {
    let nodes = store
        .node_ids()
        .into_iter()
        .map(|id| store.get_node(id).expect("Node").clone())
        .collect();
    let ways = store
        .way_ids()
        .into_iter()
        .map(|id| store.get_way(id).expect("Way").clone())
        .collect();
    let segs = segments
        .keys()
        .iter()
        .map(|key| segments.get_by_key(key).expect("Segment").clone())
        .collect();
    (nodes, ways, segs)
}

#[test]
fn delete_node_removes_containing_ways_and_undo_restores_exactly() {
    let (mut store, mut segments) = fixture();
    let before = fingerprint(&store, &segments);

    let mut command = FeatureCommand::new(&[3], &[]);
    let effect = command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    assert_eq!(effect.ways_removed, vec![100, 200]);
    assert_eq!(store.way_count(), 0);
    assert!(segments.is_empty());
    // Ohne Ways bleiben keine Member-Nodes übrig
    assert_eq!(effect.nodes_removed, vec![3, 1, 2, 4, 5]);
    assert_eq!(command.snapshot().deleted_nodes.len(), 1);
    assert_eq!(command.snapshot().orphaned_nodes, vec![1, 2, 4, 5]);
    assert_eq!(store.node_count(), 0);
    assert_eq!(command.center(), Some(LatLng::new(3.0, 1.5)));

    command
        .undo(&mut store, &mut segments)
        .expect("undo erfolgreich");
    assert_eq!(fingerprint(&store, &segments), before);
}

#[test]
fn undo_is_idempotent() {
    let (mut store, mut segments) = fixture();
    let mut command = FeatureCommand::new(&[2], &[LineSegmentKey::new(200, 5, 3)]);
    command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    command.undo(&mut store, &mut segments).expect("erstes undo");
    let once = fingerprint(&store, &segments);
    let second = command.undo(&mut store, &mut segments).expect("zweites undo");

    assert!(second.is_empty());
    assert_eq!(fingerprint(&store, &segments), once);
}

#[test]
fn delete_middle_segment_splits_way() {
    let (mut store, mut segments) = fixture();
    let before = fingerprint(&store, &segments);

    let mut command = FeatureCommand::new(&[], &[LineSegmentKey::new(100, 3, 2)]);
    let effect = command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    assert!(!store.is_way_contains(100));
    assert_eq!(effect.ways_created.len(), 2);
    let left = store.get_way(effect.ways_created[0]).expect("linker Teil");
    let right = store.get_way(effect.ways_created[1]).expect("rechter Teil");
    assert_eq!(left.node_ids, vec![1, 2]);
    assert_eq!(right.node_ids, vec![3, 4]);
    assert_eq!(left.tags, before.1[0].tags);
    // Keine Nodes gelöscht
    assert_eq!(store.node_count(), 5);
    assert!(segments.get_line_segment(left.id, 1, 2).is_some());
    assert!(segments.get_line_segment(right.id, 3, 4).is_some());
    assert_eq!(segments.len(), 3);

    command
        .undo(&mut store, &mut segments)
        .expect("undo erfolgreich");
    assert_eq!(fingerprint(&store, &segments), before);
}

#[test]
fn delete_end_segment_keeps_only_viable_part() {
    let (mut store, mut segments) = fixture();
    let mut command = FeatureCommand::new(&[], &[LineSegmentKey::new(200, 3, 5)]);
    let effect = command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    assert_eq!(effect.ways_removed, vec![200]);
    assert!(effect.ways_created.is_empty());
    // Node 5 hängt an keinem Way mehr, Node 3 gehört noch zu Way 100
    assert!(!store.is_node_contains(5));
    assert!(store.is_node_contains(3));
    assert!(segments.segments_of_way(200).is_empty());
}

#[test]
fn second_segment_resolves_through_split_byproduct() {
    let (mut store, mut segments) = fixture();
    let before = fingerprint(&store, &segments);

    let mut command = FeatureCommand::new(
        &[],
        &[LineSegmentKey::new(100, 1, 2), LineSegmentKey::new(100, 3, 4)],
    );
    command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    let remaining: Vec<Vec<i64>> = store
        .way_ids()
        .into_iter()
        .filter(|id| *id != 200)
        .map(|id| store.get_way(id).expect("Way").node_ids.clone())
        .collect();
    assert_eq!(remaining, vec![vec![2, 3]]);
    assert_eq!(command.snapshot().splits.len(), 2);
    assert_eq!(command.snapshot().orphaned_nodes, vec![1, 4]);

    command
        .undo(&mut store, &mut segments)
        .expect("undo erfolgreich");
    assert_eq!(fingerprint(&store, &segments), before);
}

#[test]
fn segment_of_way_deleted_by_node_is_skipped() {
    let (mut store, mut segments) = fixture();
    let mut command = FeatureCommand::new(&[4], &[LineSegmentKey::new(100, 1, 2)]);
    let effect = command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    assert_eq!(effect.ways_removed, vec![100]);
    assert!(effect.ways_created.is_empty());
}

#[test]
fn missing_target_fails_before_mutation() {
    let (mut store, mut segments) = fixture();
    let before = fingerprint(&store, &segments);

    let mut command = FeatureCommand::new(&[1, 99], &[]);
    let result = command.do_command(&mut store, &mut segments);
    assert_eq!(result, Err(GraphError::node_not_exists(99)));

    let mut command = FeatureCommand::new(&[1], &[LineSegmentKey::new(100, 1, 3)]);
    let result = command.do_command(&mut store, &mut segments);
    assert!(matches!(
        result,
        Err(GraphError::NotExists {
            kind: FeatureKind::LineSegment,
            ..
        })
    ));
    assert_eq!(fingerprint(&store, &segments), before);
}

#[test]
fn redo_after_undo_replaces_snapshot() {
    let (mut store, mut segments) = fixture();
    let mut command = FeatureCommand::new(&[1], &[]);
    command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");
    command.undo(&mut store, &mut segments).expect("undo");

    let effect = command
        .do_command(&mut store, &mut segments)
        .expect("redo erfolgreich");
    assert_eq!(effect.nodes_removed, vec![1, 2, 4]);
    assert_eq!(command.snapshot().deleted_nodes.len(), 1);
    assert_eq!(command.snapshot().deleted_ways.len(), 1);
}

#[test]
fn custom_segment_style_survives_undo() {
    let (mut store, mut segments) = fixture();
    let key = LineSegmentKey::new(100, 1, 2);
    segments
        .get_line_segment_mut(&key)
        .expect("Segment")
        .style
        .stroke_color = "#FF0000".to_string();

    let mut command = FeatureCommand::new(&[2], &[]);
    command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");
    command.undo(&mut store, &mut segments).expect("undo");

    assert_eq!(
        segments.get_by_key(&key).expect("Segment").style.stroke_color,
        "#FF0000"
    );
}

#[test]
fn split_byproducts_inherit_segment_style() {
    let (mut store, mut segments) = fixture();
    segments
        .get_line_segment_mut(&LineSegmentKey::new(100, 3, 4))
        .expect("Segment")
        .style
        .stroke_weight = 8.0;

    let mut command = FeatureCommand::new(&[], &[LineSegmentKey::new(100, 2, 3)]);
    let effect = command
        .do_command(&mut store, &mut segments)
        .expect("do erfolgreich");

    let right = effect.ways_created[1];
    let segment = segments.get_line_segment(right, 4, 3).expect("Segment");
    assert_eq!(segment.style.stroke_weight, 8.0);
}
