//! Core-Domänentypen: Nodes, Ways, Line-Segmente, Tags, FeatureStore, Spatial-Index.

pub mod error;
pub mod feature_store;
pub mod geo;
pub mod line_segment;
pub mod line_segment_manager;
/// Core-Datenmodelle des Straßennetzes
///
/// - FeatureStore: Besitzer aller Nodes und Ways
/// - Node: Wegpunkt mit Position und Tags
/// - Way: geordneter Pfad über Node-IDs
pub mod node;
pub mod spatial;
pub mod split;
pub mod tags;
pub mod way;

pub use error::{FeatureKind, GraphError, GraphResult};
pub use feature_store::FeatureStore;
pub use geo::{BoundingBox, LatLng, SegmentProjection, DISTANCE_THRESHOLD};
pub use line_segment::{LineSegment, LineSegmentKey, LineSegmentStyle};
pub use line_segment_manager::{LineSegmentManager, SegmentSync};
pub use node::{Node, NodeOptions};
pub use spatial::{SpatialIndex, SpatialMatch};
pub use split::{SplitParts, SplitRecord};
pub use tags::{TagKeyMeta, TagMap, TagOptions, TagSchema, TagValue, TagValueType};
pub use way::Way;
