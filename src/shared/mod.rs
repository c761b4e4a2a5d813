//! Geteilte Typen für layer-übergreifende Verträge.
//!
//! Enthält die Laufzeit-Optionen und die Render-Payloads, die zwischen `app`
//! und einer Kartenansicht geteilt werden.

pub mod options;
mod render_scene;

pub use options::{is_valid_color, EditorOptions};
pub use render_scene::{NodeRenderPayload, RenderScene, SegmentRenderPayload};
