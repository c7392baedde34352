//! IDW surface properties over realistic viewports

use std::collections::HashSet;
use std::thread;

use noise_watch::config::IdwConfig;
use noise_watch::idw::{interpolate_cell, render, ColorLut, IdwLayer, SharedSurface, Viewport};
use noise_watch::measurement::MeasurementPoint;

const CENTER: (f64, f64) = (39.105, 26.555);

fn viewport() -> Viewport {
    Viewport::new(CENTER.0, CENTER.1, 16.0, 400, 400)
}

fn frame_for(points: &[MeasurementPoint]) -> noise_watch::idw::RasterFrame {
    let config = IdwConfig::default();
    let lut = ColorLut::build(&config.gradient);
    render(&viewport(), points, &config, &lut)
}

#[test]
fn test_single_point_paints_a_constant_disc() {
    let frame = frame_for(&[MeasurementPoint::new(CENTER.0, CENTER.1, 74.0)]);

    assert!(!frame.cells.is_empty());
    let colors: HashSet<_> = frame.cells.iter().map(|cell| cell.color).collect();
    assert_eq!(colors.len(), 1);
    assert!(frame.cells.iter().all(|cell| (cell.value - 74.0).abs() < 1e-9));

    // Corners are further than max_distance from the point
    assert!(frame.cell_at(0, 0).is_none());
    assert!(frame.cell_at(396, 396).is_none());
    assert!(frame.cell_at(198, 198).is_some());
}

#[test]
fn test_loud_point_dominates_at_equal_distance() {
    let config = IdwConfig::default();
    let points = [
        MeasurementPoint::new(39.1, 26.5500, 50.0),
        MeasurementPoint::new(39.1, 26.5510, 80.0),
    ];

    let value = interpolate_cell(39.1, 26.5505, &points, &config).unwrap();
    assert!(value > 65.0, "plain IDW would give 65, got {value}");
    assert!(value >= 68.0);
}

#[test]
fn test_colors_saturate_outside_the_range() {
    let at = |value: f64| {
        let frame = frame_for(&[MeasurementPoint::new(CENTER.0, CENTER.1, value)]);
        frame.cells[0].color
    };

    assert_eq!(at(101.0), at(130.0));
    assert_eq!(at(30.0), at(25.0));
    assert_ne!(at(30.0), at(100.0));
}

#[test]
fn test_points_outside_the_view_do_not_paint() {
    let frame = frame_for(&[MeasurementPoint::new(39.2, 26.7, 90.0)]);
    assert!(frame.cells.is_empty());
}

#[test]
fn test_redraw_computed_off_thread_is_presented() {
    let surface = SharedSurface::new(1, 1);
    let mut layer = IdwLayer::new(IdwConfig::default());
    layer.attach(Box::new(surface.clone()), viewport());
    layer.set_points(vec![MeasurementPoint::new(CENTER.0, CENTER.1, 85.0)]);
    let presented_before = surface.with(|b| b.presented()).unwrap();

    let stale = layer.request_redraw().unwrap();
    let fresh = layer.request_redraw().unwrap();

    let stale = thread::spawn(move || stale.run()).join().unwrap();
    let fresh = thread::spawn(move || fresh.run()).join().unwrap();

    assert!(layer.present(fresh));
    assert!(!layer.present(stale));
    assert_eq!(surface.with(|b| b.presented()), Some(presented_before + 1));
    assert!(surface.with(|b| b.painted_pixels()).unwrap() > 0);
}
