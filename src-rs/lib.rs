//! Layered raster annotation editor core.
//!
//! An [`Editor`] holds a base image and a z-ordered stack of non-destructive
//! layers (crop, blur, highlight, arrow line, text). Pointer events drive a
//! small state machine that creates, moves and resizes layers; every
//! mutating gesture is preceded by one snapshot so [`Editor::undo`] reverts
//! it whole. The compositor renders a live preview with crop mask and
//! handles, and the export path produces the final cropped bitmap.

pub mod color;
pub mod config;
pub mod draw;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod history;
pub mod interaction;
pub mod layers;
pub mod render;
pub mod text;

pub use config::{EditorConfig, ToolSettings};
pub use editor::{Editor, LayerPanelEntry, TextPrompt};
pub use error::EditorError;
pub use export::ExportFormat;
pub use geometry::{Bounds, Handle, Point, Rect};
pub use interaction::{Cursor, DownOutcome, Interaction, PointerDown};
pub use layers::{HitOrder, Layer, LayerId, LayerKind, LayerStack};
