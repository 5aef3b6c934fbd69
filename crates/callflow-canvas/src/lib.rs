//! # Callflow Canvas
//!
//! Pure lookups used by the flow editing surface: how each node kind is drawn,
//! the palette new nodes are dragged from, and a derived view of a graph with
//! display-only hints such as animated edges. Nothing here affects validation.

pub mod style;
pub mod view;

pub use style::{palette, style_for, style_for_name, NodeStyle, PaletteEntry, PaletteGroup};
pub use view::{CanvasStats, CanvasView, EdgeView, NodeView};
