//! Rendering: placement, composition and the viewport transform

pub mod layout;
pub mod paint;
pub mod raster;
pub mod viewport;

pub use layout::{LayoutManager, Placement, PlacementConfig};
pub use viewport::Viewport;
