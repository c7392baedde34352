// IDW module - inverse-distance-weighted noise surfaces
//
// gradient: colour stops and the 256-entry lookup table
// viewport: Web-Mercator pixel <-> geographic mapping
// engine:   pure per-cell interpolation and rasterization
// layer:    redraw state machine and drawing surfaces

pub mod engine;
pub mod gradient;
pub mod layer;
pub mod viewport;

pub use engine::{interpolate_cell, render, RasterCell, RasterFrame};
pub use gradient::{ColorLut, GradientStop, Rgba};
pub use layer::{IdwLayer, LayerState, PixelBuffer, RedrawJob, RenderedFrame, SharedSurface, Surface, ViewEvent};
pub use viewport::Viewport;
