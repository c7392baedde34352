// IdwLayer: keeps an IDW raster in sync with a map view
//
// State machine:
//   Detached --attach--> Attached --request_redraw--> Redrawing --present--> Attached
//   any --detach--> Detached (surface released)
//
// Redraws are last-request-wins: every request bumps a generation counter
// and a finished job is only presented if no newer request was made. Jobs
// own snapshots of their inputs, so they can run on another thread while
// the layer keeps accepting view changes.

use std::sync::Arc;

use super::engine::{render, RasterFrame};
use super::gradient::{ColorLut, GradientStop};
use super::viewport::Viewport;
use crate::config::IdwConfig;
use crate::measurement::MeasurementPoint;

/// Drawing target for a layer
pub trait Surface: Send {
    /// Match the container size
    fn resize(&mut self, width: u32, height: u32);

    /// Remove everything drawn
    fn clear(&mut self);

    /// Replace the visible image with `frame` in a single swap
    fn present(&mut self, frame: &RasterFrame);
}

/// Map notifications that invalidate the raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent {
    MoveEnd(Viewport),
    ZoomEnd(Viewport),
    Resize(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    Detached,
    Attached,
    Redrawing,
}

/// A self-contained redraw, safe to run off the layer's thread
pub struct RedrawJob {
    generation: u64,
    viewport: Viewport,
    points: Arc<[MeasurementPoint]>,
    config: Arc<IdwConfig>,
    lut: Arc<ColorLut>,
}

impl RedrawJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn run(self) -> RenderedFrame {
        let frame = render(&self.viewport, &self.points, &self.config, &self.lut);
        RenderedFrame {
            generation: self.generation,
            frame,
        }
    }
}

pub struct RenderedFrame {
    generation: u64,
    pub frame: RasterFrame,
}

struct CachedLut {
    gradient: Vec<GradientStop>,
    lut: Arc<ColorLut>,
}

pub struct IdwLayer {
    config: Arc<IdwConfig>,
    points: Arc<[MeasurementPoint]>,
    surface: Option<Box<dyn Surface>>,
    viewport: Option<Viewport>,
    lut: Option<CachedLut>,
    generation: u64,
    pending: Option<u64>,
    lut_builds: usize,
}

impl IdwLayer {
    pub fn new(config: IdwConfig) -> Self {
        Self {
            config: Arc::new(config),
            points: Arc::from(Vec::<MeasurementPoint>::new()),
            surface: None,
            viewport: None,
            lut: None,
            generation: 0,
            pending: None,
            lut_builds: 0,
        }
    }

    pub fn state(&self) -> LayerState {
        match (&self.surface, self.pending) {
            (None, _) => LayerState::Detached,
            (Some(_), Some(_)) => LayerState::Redrawing,
            (Some(_), None) => LayerState::Attached,
        }
    }

    pub fn config(&self) -> &IdwConfig {
        &self.config
    }

    /// Number of gradient tables built so far
    pub fn lut_builds(&self) -> usize {
        self.lut_builds
    }

    /// Add the layer to a map view and draw it
    pub fn attach(&mut self, mut surface: Box<dyn Surface>, viewport: Viewport) {
        surface.resize(viewport.width, viewport.height);
        self.surface = Some(surface);
        self.viewport = Some(viewport);
        tracing::debug!("[IdwLayer] Attached ({}x{})", viewport.width, viewport.height);
        self.redraw();
    }

    /// Remove the layer; the surface is returned to the caller
    ///
    /// Any in-flight redraw is discarded.
    pub fn detach(&mut self) -> Option<Box<dyn Surface>> {
        self.pending = None;
        self.generation += 1;
        let mut surface = self.surface.take()?;
        surface.clear();
        tracing::debug!("[IdwLayer] Detached");
        Some(surface)
    }

    /// Replace the measurement set and redraw
    pub fn set_points(&mut self, points: Vec<MeasurementPoint>) {
        self.points = Arc::from(points);
        self.redraw();
    }

    /// Replace rendering options and redraw
    ///
    /// The gradient table is rebuilt lazily, and only if the gradient changed.
    pub fn set_config(&mut self, config: IdwConfig) {
        self.config = Arc::new(config);
        self.redraw();
    }

    pub fn handle_view_event(&mut self, event: ViewEvent) {
        let viewport = match event {
            ViewEvent::MoveEnd(v) | ViewEvent::ZoomEnd(v) => v,
            ViewEvent::Resize(v) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.resize(v.width, v.height);
                }
                v
            }
        };
        self.viewport = Some(viewport);
        self.redraw();
    }

    fn current_lut(&mut self) -> Arc<ColorLut> {
        match &self.lut {
            Some(cached) if cached.gradient == self.config.gradient => Arc::clone(&cached.lut),
            _ => {
                let lut = Arc::new(ColorLut::build(&self.config.gradient));
                self.lut_builds += 1;
                self.lut = Some(CachedLut {
                    gradient: self.config.gradient.clone(),
                    lut: Arc::clone(&lut),
                });
                lut
            }
        }
    }

    /// Start a redraw, superseding any in flight
    ///
    /// Returns `None` when there is nothing to compute: the layer is
    /// detached, has no viewport, or has no points (the surface is cleared).
    pub fn request_redraw(&mut self) -> Option<RedrawJob> {
        let viewport = self.viewport?;
        self.surface.as_ref()?;

        self.generation += 1;
        if self.points.is_empty() {
            self.pending = None;
            if let Some(surface) = self.surface.as_mut() {
                surface.clear();
            }
            return None;
        }

        let lut = self.current_lut();
        self.pending = Some(self.generation);
        Some(RedrawJob {
            generation: self.generation,
            viewport,
            points: Arc::clone(&self.points),
            config: Arc::clone(&self.config),
            lut,
        })
    }

    /// Show a finished redraw unless a newer one was requested
    ///
    /// Returns whether the frame was presented.
    pub fn present(&mut self, rendered: RenderedFrame) -> bool {
        if self.pending != Some(rendered.generation) {
            tracing::trace!(
                "[IdwLayer] Dropping stale frame {} (current {})",
                rendered.generation,
                self.generation
            );
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        surface.present(&rendered.frame);
        self.pending = None;
        true
    }

    /// Request, compute and present on the calling thread
    pub fn redraw(&mut self) {
        if let Some(job) = self.request_redraw() {
            let rendered = job.run();
            self.present(rendered);
        }
    }
}

/// In-memory RGBA8 surface
///
/// Frames are painted into a back buffer which is then swapped with the
/// visible one.
#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    front: Vec<u8>,
    back: Vec<u8>,
    presented: usize,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self::default();
        buffer.resize(width, height);
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of frames presented so far
    pub fn presented(&self) -> usize {
        self.presented
    }

    /// Visible RGBA bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.front
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([self.front[i], self.front[i + 1], self.front[i + 2], self.front[i + 3]])
    }

    /// Count of pixels with non-zero alpha
    pub fn painted_pixels(&self) -> usize {
        self.front.chunks_exact(4).filter(|px| px[3] > 0).count()
    }
}

impl Surface for PixelBuffer {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let len = width as usize * height as usize * 4;
        self.front = vec![0; len];
        self.back = vec![0; len];
    }

    fn clear(&mut self) {
        self.front.fill(0);
    }

    fn present(&mut self, frame: &RasterFrame) {
        self.back.fill(0);
        let alpha = (frame.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        for cell in &frame.cells {
            let x_end = (cell.x + frame.cell_size).min(self.width);
            let y_end = (cell.y + frame.cell_size).min(self.height);
            for y in cell.y..y_end {
                for x in cell.x..x_end {
                    let i = ((y * self.width + x) * 4) as usize;
                    self.back[i..i + 4].copy_from_slice(&[cell.color.r, cell.color.g, cell.color.b, alpha]);
                }
            }
        }
        std::mem::swap(&mut self.front, &mut self.back);
        self.presented += 1;
    }
}

/// Surface handle that can be inspected after being given to a layer
#[derive(Debug, Clone, Default)]
pub struct SharedSurface(pub Arc<std::sync::Mutex<PixelBuffer>>);

impl SharedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self(Arc::new(std::sync::Mutex::new(PixelBuffer::new(width, height))))
    }

    /// Run `f` against the current buffer; `None` if the lock is poisoned
    pub fn with<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> Option<R> {
        self.0.lock().ok().map(|buffer| f(&buffer))
    }
}

impl Surface for SharedSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if let Ok(mut buffer) = self.0.lock() {
            buffer.resize(width, height);
        }
    }

    fn clear(&mut self) {
        if let Ok(mut buffer) = self.0.lock() {
            buffer.clear();
        }
    }

    fn present(&mut self, frame: &RasterFrame) {
        if let Ok(mut buffer) = self.0.lock() {
            buffer.present(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idw::gradient::Rgba;

    fn viewport() -> Viewport {
        Viewport::new(39.105, 26.555, 16.0, 120, 90)
    }

    fn points() -> Vec<MeasurementPoint> {
        vec![MeasurementPoint::new(39.105, 26.555, 72.0)]
    }

    #[test]
    fn test_state_transitions() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        assert_eq!(layer.state(), LayerState::Detached);

        let surface = SharedSurface::new(1, 1);
        layer.attach(Box::new(surface.clone()), viewport());
        assert_eq!(layer.state(), LayerState::Attached);

        layer.set_points(points());
        let job = layer.request_redraw().unwrap();
        assert_eq!(layer.state(), LayerState::Redrawing);
        assert!(layer.present(job.run()));
        assert_eq!(layer.state(), LayerState::Attached);

        assert!(layer.detach().is_some());
        assert_eq!(layer.state(), LayerState::Detached);
        assert_eq!(surface.with(|b| b.painted_pixels()), Some(0));
    }

    #[test]
    fn test_attach_sizes_surface_and_draws() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        layer.set_points(points());

        let surface = SharedSurface::new(1, 1);
        layer.attach(Box::new(surface.clone()), viewport());

        surface
            .with(|buffer| {
                assert_eq!((buffer.width(), buffer.height()), (120, 90));
                assert_eq!(buffer.presented(), 1);
                assert!(buffer.painted_pixels() > 0);
                let [_, _, _, a] = buffer.pixel(60, 45).unwrap();
                assert_eq!(a, 128);
            })
            .unwrap();
    }

    #[test]
    fn test_newer_request_wins() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        let surface = SharedSurface::new(1, 1);
        layer.attach(Box::new(surface.clone()), viewport());
        layer.set_points(points());
        let before = surface.with(|b| b.presented()).unwrap();

        let stale = layer.request_redraw().unwrap();
        let fresh = layer.request_redraw().unwrap();
        assert!(fresh.generation() > stale.generation());

        let fresh_frame = fresh.run();
        let stale_frame = stale.run();
        assert!(!layer.present(stale_frame));
        assert!(layer.present(fresh_frame));
        assert_eq!(surface.with(|b| b.presented()), Some(before + 1));
    }

    #[test]
    fn test_empty_points_only_clear() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        let surface = SharedSurface::new(1, 1);
        layer.attach(Box::new(surface.clone()), viewport());
        layer.set_points(points());
        assert!(surface.with(|b| b.painted_pixels()).unwrap() > 0);

        layer.set_points(Vec::new());
        assert!(layer.request_redraw().is_none());
        assert_eq!(surface.with(|b| b.painted_pixels()), Some(0));
    }

    #[test]
    fn test_gradient_table_rebuilt_only_on_change() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        layer.attach(Box::new(PixelBuffer::new(1, 1)), viewport());
        layer.set_points(points());
        layer.handle_view_event(ViewEvent::MoveEnd(viewport()));
        layer.handle_view_event(ViewEvent::ZoomEnd(viewport()));
        assert_eq!(layer.lut_builds(), 1);

        let mut config = IdwConfig::default();
        config.opacity = 0.8;
        layer.set_config(config.clone());
        assert_eq!(layer.lut_builds(), 1);

        config.gradient = vec![GradientStop::new(0.0, Rgba::rgb(0, 0, 255))];
        layer.set_config(config);
        assert_eq!(layer.lut_builds(), 2);
    }

    #[test]
    fn test_resize_event_resizes_surface() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        let surface = SharedSurface::new(1, 1);
        layer.attach(Box::new(surface.clone()), viewport());

        let mut bigger = viewport();
        bigger.width = 200;
        layer.handle_view_event(ViewEvent::Resize(bigger));
        assert_eq!(surface.with(|b| b.width()), Some(200));
    }

    #[test]
    fn test_detached_layer_does_not_render() {
        let mut layer = IdwLayer::new(IdwConfig::default());
        layer.set_points(points());
        assert!(layer.request_redraw().is_none());
        assert_eq!(layer.lut_builds(), 0);
    }
}
