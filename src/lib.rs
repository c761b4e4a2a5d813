//! Road-Graph-Editor Library.
//! Feature-Graph-Engine (Nodes, Ways, Line-Segmente, Tags, Undo/Redo, Way-Tracking)
//! als Library exportiert für Tests und Wiederverwendung.

pub mod app;
pub mod core;
pub mod geojson;
pub mod shared;

pub use app::{
    ActiveWayChange, CommandEffect, EditHistory, FeatureCommand, GraphEditor, GraphEvent,
    GraphRequest, ListenerKey, ListenerTopic, RequestQueue, TagTarget, WayPresenceEvent,
    WayTracker,
};
pub use core::{
    FeatureKind, FeatureStore, GraphError, GraphResult, LatLng, LineSegment, LineSegmentKey,
    LineSegmentManager, LineSegmentStyle, Node, NodeOptions, TagKeyMeta, TagMap, TagSchema,
    TagValue, Way,
};
pub use core::{SpatialIndex, SpatialMatch};
pub use geojson::{parse_geojson, write_geojson, ImportReport};
pub use shared::{EditorOptions, RenderScene};
