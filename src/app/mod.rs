//! Application-Layer: Editor-Fassade, Löschbefehle, History, Events und Way-Tracker.

pub mod command;
pub mod editor;
pub mod events;
pub mod history;
pub mod listeners;
pub mod render_scene;
pub mod way_tracker;

pub use command::{CommandEffect, CommandSnapshot, FeatureCommand};
pub use editor::GraphEditor;
pub use events::{GraphEvent, GraphRequest, RequestQueue, TagTarget};
pub use history::EditHistory;
pub use listeners::{
    EventListenerRegistry, ListenerKey, ListenerKeyGenerator, ListenerTopic,
    DEFAULT_DEBOUNCE_WINDOW,
};
pub use render_scene::build as build_render_scene;
pub use way_tracker::{ActiveWayChange, WayPresenceEvent, WayTracker};
