//! Inverse-distance-weighted interpolation over a cell grid.
//!
//! [`render`] is pure: the same viewport, points and configuration always
//! produce the same [`RasterFrame`]. Presenting the frame is the layer's job.
//!
//! Per cell, points are weighted by `boost / distance^exponent` where the
//! boost favours loud measurements, and the result is floored at a fraction
//! of the loudest contributing point so that a loud source is not averaged
//! away by quiet neighbours.

use serde::Serialize;

use super::gradient::{ColorLut, Rgba};
use super::viewport::Viewport;
use crate::config::IdwConfig;
use crate::measurement::MeasurementPoint;

/// Squared degree distance under which a point is treated as coincident
pub const COINCIDENT_EPSILON: f64 = 1e-7;

/// One painted cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterCell {
    /// Left edge in container pixels
    pub x: u32,
    /// Top edge in container pixels
    pub y: u32,
    pub color: Rgba,
    /// Interpolated value before normalization
    pub value: f64,
}

/// Off-screen result of one redraw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    pub cell_size: u32,
    /// Fill opacity applied to every cell
    pub opacity: f64,
    pub cells: Vec<RasterCell>,
}

impl RasterFrame {
    pub fn empty(width: u32, height: u32, cell_size: u32, opacity: f64) -> Self {
        Self {
            width,
            height,
            cell_size,
            opacity,
            cells: Vec::new(),
        }
    }

    /// Cell whose area covers container pixel `(x, y)`
    pub fn cell_at(&self, x: u32, y: u32) -> Option<&RasterCell> {
        let size = self.cell_size.max(1);
        let (cx, cy) = (x - x % size, y - y % size);
        self.cells.iter().find(|cell| cell.x == cx && cell.y == cy)
    }
}

fn boost(value: f64, config: &IdwConfig) -> f64 {
    if value > config.high_threshold {
        config.high_boost
    } else if value > config.mid_threshold {
        config.mid_boost
    } else {
        1.0
    }
}

/// Interpolated value at a position, or `None` when no point is in range
///
/// A coincident point short-circuits to its exact value; with several
/// coincident points the last one wins. The hybrid floor is not applied to
/// exact values. A `max_distance` of zero disables the range cut-off.
/// Point values are clamped into `[min_value, max_value]` before weighting.
pub fn interpolate_cell(
    lat: f64,
    lon: f64,
    points: &[MeasurementPoint],
    config: &IdwConfig,
) -> Option<f64> {
    let max_dist_sq = config.max_distance * config.max_distance;
    let mut sum = 0.0;
    let mut wsum = 0.0;
    let mut max_local = 0.0f64;
    let mut exact = None;

    for point in points.iter().filter(|p| p.is_finite()) {
        let d = (lat - point.latitude).powi(2) + (lon - point.longitude).powi(2);

        let value = point.value.max(config.min_value).min(config.max_value);

        if d < COINCIDENT_EPSILON {
            exact = Some(value);
            continue;
        }
        if config.max_distance > 0.0 && d > max_dist_sq {
            continue;
        }

        let w = boost(value, config) / d.powf(config.exponent / 2.0);
        sum += w * value;
        wsum += w;
        max_local = max_local.max(value);
    }

    if exact.is_some() {
        return exact;
    }
    if wsum <= 0.0 {
        return None;
    }
    Some((sum / wsum).max(max_local * config.floor_factor))
}

/// Points that can influence any cell of the viewport
fn relevant_points(viewport: &Viewport, points: &[MeasurementPoint], config: &IdwConfig) -> Vec<MeasurementPoint> {
    let bounds = viewport.bounds();
    let margin = if config.max_distance > 0.0 {
        config.max_distance
    } else {
        f64::INFINITY
    };
    points
        .iter()
        .filter(|p| p.is_finite())
        .filter(|p| {
            p.latitude >= bounds.south - margin
                && p.latitude <= bounds.north + margin
                && p.longitude >= bounds.west - margin
                && p.longitude <= bounds.east + margin
        })
        .copied()
        .collect()
}

/// Rasterize `points` over `viewport`
///
/// Cells are visited column by column. Cells whose centre falls outside the
/// viewport, cells with no point in range, non-positive values and fully
/// transparent gradient entries are left unpainted.
pub fn render(
    viewport: &Viewport,
    points: &[MeasurementPoint],
    config: &IdwConfig,
    lut: &ColorLut,
) -> RasterFrame {
    let cell_size = config.cell_size.max(1);
    let mut frame = RasterFrame::empty(viewport.width, viewport.height, cell_size, config.opacity);

    let points = relevant_points(viewport, points, config);
    if points.is_empty() {
        return frame;
    }

    let bounds = viewport.bounds();
    let half = cell_size as f64 / 2.0;
    let span = config.max_value - config.min_value;

    for x in (0..viewport.width).step_by(cell_size as usize) {
        for y in (0..viewport.height).step_by(cell_size as usize) {
            let (lat, lon) = viewport.container_to_geo(x as f64 + half, y as f64 + half);
            if !bounds.contains(lat, lon) {
                continue;
            }

            let Some(value) = interpolate_cell(lat, lon, &points, config) else {
                continue;
            };
            if value <= 0.0 {
                continue;
            }

            let norm = ((value - config.min_value) / span).clamp(0.0, 1.0);
            let color = lut.lookup(norm);
            if color.a == 0 {
                continue;
            }

            frame.cells.push(RasterCell { x, y, color, value });
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idw::gradient::GradientStop;

    fn config() -> IdwConfig {
        IdwConfig::default()
    }

    #[test]
    fn test_no_points_in_range_is_none() {
        let far = [MeasurementPoint::new(39.2, 26.7, 70.0)];
        assert_eq!(interpolate_cell(39.1, 26.55, &far, &config()), None);
        assert_eq!(interpolate_cell(39.1, 26.55, &[], &config()), None);
    }

    #[test]
    fn test_coincident_point_is_exact_and_last_wins() {
        let points = [
            MeasurementPoint::new(39.1, 26.55, 50.0),
            MeasurementPoint::new(39.1, 26.55, 90.0),
            MeasurementPoint::new(39.1005, 26.55, 40.0),
        ];
        assert_eq!(interpolate_cell(39.1, 26.55, &points, &config()), Some(90.0));
    }

    #[test]
    fn test_dominance_beats_plain_idw() {
        // Equidistant 50 and 80 dB points: plain IDW gives 65
        let points = [
            MeasurementPoint::new(39.1, 26.5505, 50.0),
            MeasurementPoint::new(39.1, 26.5495, 80.0),
        ];
        let value = interpolate_cell(39.1, 26.55, &points, &config()).unwrap();

        // (50 + 4 * 80) / 5
        assert!((value - 74.0).abs() < 1e-9, "got {}", value);
        assert!(value >= 68.0);
    }

    #[test]
    fn test_out_of_domain_values_are_clamped_before_weighting() {
        // 120 dB counts as 100: (40 + 4 * 100) / 5
        let points = [
            MeasurementPoint::new(39.1, 26.5500, 40.0),
            MeasurementPoint::new(39.1, 26.5510, 120.0),
        ];
        let value = interpolate_cell(39.1, 26.5505, &points, &config()).unwrap();
        assert!((value - 88.0).abs() < 1e-9, "got {}", value);

        let coincident = [MeasurementPoint::new(39.1, 26.55, 12.0)];
        assert_eq!(interpolate_cell(39.1, 26.55, &coincident, &config()), Some(30.0));
    }

    #[test]
    fn test_loud_outlier_is_painted_below_full_red() {
        let viewport = Viewport::new(39.1, 26.5505, 16.0, 60, 60);
        let points = [
            MeasurementPoint::new(39.1, 26.5500, 40.0),
            MeasurementPoint::new(39.1, 26.5510, 120.0),
        ];
        let lut = ColorLut::build(&config().gradient);

        let frame = render(&viewport, &points, &config(), &lut);
        assert!(frame.cells.iter().all(|cell| cell.value <= 100.0));

        let centre = frame.cell_at(30, 30).unwrap();
        assert!(centre.color.g > 0, "got {:?}", centre.color);
    }

    #[test]
    fn test_hybrid_floor_lifts_quiet_majority() {
        // One loud point far-ish, several quiet points close
        let mut points = vec![MeasurementPoint::new(39.1, 26.5514, 90.0)];
        for i in 0..6 {
            points.push(MeasurementPoint::new(39.1 + i as f64 * 1e-5, 26.5504, 35.0));
        }
        let value = interpolate_cell(39.1, 26.55, &points, &config()).unwrap();
        assert!((value - 90.0 * 0.85).abs() < 1e-9, "got {}", value);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let mut plain = config();
        plain.high_boost = 1.0;
        plain.mid_boost = 1.0;
        plain.floor_factor = 0.0;
        let points = [
            MeasurementPoint::new(39.1, 26.5505, 50.0),
            MeasurementPoint::new(39.1, 26.5495, 80.0),
        ];
        let value = interpolate_cell(39.1, 26.55, &points, &plain).unwrap();
        assert!((value - 65.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_paints_only_near_points() {
        let viewport = Viewport::new(39.105, 26.555, 16.0, 300, 300);
        let points = [MeasurementPoint::new(39.105, 26.555, 70.0)];
        let lut = ColorLut::build(&config().gradient);

        let frame = render(&viewport, &points, &config(), &lut);

        assert!(!frame.cells.is_empty());
        assert!(frame.cell_at(150, 150).is_some());
        assert!(frame.cells.iter().all(|cell| cell.value == 70.0));
        let color = frame.cells[0].color;
        assert!(frame.cells.iter().all(|cell| cell.color == color));
        // Corners are beyond max_distance
        assert!(frame.cell_at(0, 0).is_none());
        assert!(frame.cells.len() < 100 * 100);
    }

    #[test]
    fn test_transparent_gradient_entries_are_skipped() {
        let mut config = config();
        config.gradient = vec![GradientStop::new(0.0, Rgba::TRANSPARENT)];
        let lut = ColorLut::build(&config.gradient);
        let viewport = Viewport::new(39.105, 26.555, 16.0, 60, 60);

        let frame = render(&viewport, &[MeasurementPoint::new(39.105, 26.555, 70.0)], &config, &lut);
        assert!(frame.cells.is_empty());
    }

    #[test]
    fn test_malformed_points_are_ignored() {
        let viewport = Viewport::new(39.105, 26.555, 16.0, 60, 60);
        let lut = ColorLut::build(&config().gradient);
        let points = [MeasurementPoint::new(f64::NAN, 26.555, 70.0)];

        assert!(render(&viewport, &points, &config(), &lut).cells.is_empty());
    }
}
