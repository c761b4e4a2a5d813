use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use road_graph_editor::{
    parse_geojson, EditorOptions, FeatureStore, GraphEditor, LatLng, TagMap, TagSchema, TagValue,
    WayTracker,
};
use std::hint::black_box;
use std::time::{Duration, Instant};

fn bench_geojson_parsing(c: &mut Criterion) {
    let content = include_str!("../tests/fixtures/simple_map.geojson");
    let schema = TagSchema::new();

    c.bench_function("geojson_parse_simple_map", |b| {
        b.iter(|| {
            let (store, _) = parse_geojson(black_box(content), &schema).expect("GeoJSON parse failed");
            black_box(store.node_count())
        })
    });
}

/// Gitter aus `rows` parallelen Ways mit je `columns` Nodes.
fn build_synthetic_store(rows: usize, columns: usize) -> FeatureStore {
    let mut store = FeatureStore::new();
    for row in 0..rows {
        let mut node_ids = Vec::with_capacity(columns);
        for column in 0..columns {
            let id = (row * columns + column) as i64 + 1;
            let lat = row as f64 * 0.001 + column as f64 * 0.0000001;
            let lng = column as f64 * 0.001 + row as f64 * 0.000001;
            store
                .create_node(id, LatLng::new(lat, lng), None, None)
                .expect("Node anlegen");
            node_ids.push(id);
        }
        let mut tags = TagMap::new();
        let class = if row % 2 == 0 { "primary" } else { "residential" };
        tags.insert("highway".to_string(), TagValue::from(class));
        store
            .create_way(row as i64 + 1, &node_ids, Some(tags), None)
            .expect("Way anlegen");
    }
    store.ensure_spatial_index();
    store
}

fn build_query_points(count: usize) -> Vec<LatLng> {
    (0..count)
        .map(|i| {
            let lat = ((i * 7) % 100) as f64 * 0.001 + 0.00037;
            let lng = (i % 100) as f64 * 0.001 + 0.00063;
            LatLng::new(lat, lng)
        })
        .collect()
}

fn bench_spatial_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_queries");

    for &(rows, columns) in &[(100usize, 100usize), (100usize, 1000usize)] {
        let store = build_synthetic_store(rows, columns);
        let query_points = build_query_points(1024);
        let node_count = rows * columns;

        group.bench_with_input(
            BenchmarkId::new("nearest_batch", node_count),
            &store,
            |b, store| {
                b.iter(|| {
                    let mut hits = 0usize;
                    for point in &query_points {
                        if store.nearest_node(black_box(*point)).is_some() {
                            hits += 1;
                        }
                    }
                    black_box(hits)
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("radius_query", node_count),
            &store,
            |b, store| {
                b.iter(|| {
                    let hits =
                        store.nodes_within_radius(black_box(LatLng::new(0.05, 0.05)), 0.005);
                    black_box(hits.len())
                })
            },
        );
    }

    group.finish();
}

fn bench_way_tracker(c: &mut Criterion) {
    let store = build_synthetic_store(100, 100);
    let mut tracker = WayTracker::new(
        road_graph_editor::core::DISTANCE_THRESHOLD,
        Duration::from_millis(300),
    );
    let start = Instant::now();
    tracker.sync_from_store(&store, "highway", start);
    let track = build_query_points(1024);

    c.bench_function("way_tracker_update_1024", |b| {
        b.iter(|| {
            let mut changes = 0usize;
            for (i, point) in track.iter().enumerate() {
                let now = start + Duration::from_millis(i as u64 * 10);
                changes += tracker.update_position(black_box(*point), now).len();
                tracker.poll(now);
            }
            black_box(changes)
        })
    });
}

fn bench_delete_undo(c: &mut Criterion) {
    let mut editor = GraphEditor::new(EditorOptions::default(), TagSchema::new());
    editor
        .load_store(build_synthetic_store(50, 200))
        .expect("Store laden");

    c.bench_function("delete_node_undo_cycle", |b| {
        b.iter(|| {
            editor
                .delete_features(black_box(&[150]), &[])
                .expect("löschen");
            black_box(editor.undo().expect("undo"))
        })
    });
}

criterion_group!(
    core_benches,
    bench_geojson_parsing,
    bench_spatial_queries,
    bench_way_tracker,
    bench_delete_undo
);
criterion_main!(core_benches);
