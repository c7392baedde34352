//! Web-Mercator viewport: maps container pixels to geographic coordinates.
//!
//! Uses the 256-pixel tile convention, so zoom `z` spans `256 * 2^z` world
//! pixels around the globe. Latitudes are clamped to the Mercator limit.

use serde::{Deserialize, Serialize};

use crate::measurement::GeoBounds;

/// Latitude limit of the square Web-Mercator world
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

const TILE_SIZE: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    /// Container width in pixels
    pub width: u32,
    /// Container height in pixels
    pub height: u32,
}

impl Viewport {
    pub fn new(center_lat: f64, center_lon: f64, zoom: f64, width: u32, height: u32) -> Self {
        Self {
            center_lat,
            center_lon,
            zoom,
            width,
            height,
        }
    }

    fn scale(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// World pixel coordinates of a position
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let scale = self.scale();
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (lon + 180.0) / 360.0 * scale;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * scale;
        (x, y)
    }

    /// Position of world pixel coordinates
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = self.scale();
        let lon = x / scale * 360.0 - 180.0;
        let n = std::f64::consts::PI * (1.0 - 2.0 * y / scale);
        let lat = n.sinh().atan().to_degrees();
        (lat, lon)
    }

    fn origin(&self) -> (f64, f64) {
        let (cx, cy) = self.project(self.center_lat, self.center_lon);
        (cx - self.width as f64 / 2.0, cy - self.height as f64 / 2.0)
    }

    /// `(lat, lon)` under a container pixel
    pub fn container_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let (ox, oy) = self.origin();
        self.unproject(ox + x, oy + y)
    }

    /// Container pixel over a position
    pub fn geo_to_container(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (ox, oy) = self.origin();
        let (x, y) = self.project(lat, lon);
        (x - ox, y - oy)
    }

    /// Geographic extent of the container
    pub fn bounds(&self) -> GeoBounds {
        let (north, west) = self.container_to_geo(0.0, 0.0);
        let (south, east) = self.container_to_geo(self.width as f64, self.height as f64);
        GeoBounds::new(south, west, north, east)
    }
}
