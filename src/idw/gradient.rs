// Colour gradient and its 256-entry lookup table

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of entries in a [`ColorLut`]
pub const LUT_SIZE: usize = 256;

/// 8-bit RGBA colour, serialized as `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    pub fn parse_hex(text: &str) -> Result<Self, String> {
        let hex = text.trim().trim_start_matches('#');
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid colour {:?}", text))
        };
        match hex.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(format!("invalid colour {:?}: expected #rrggbb or #rrggbbaa", text)),
        }
    }

    /// Linear blend; `t = 0` is `self`, `t = 1` is `other`
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xff {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgba::parse_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(value: Rgba) -> Self {
        value.to_string()
    }
}

/// A colour at a position in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f64,
    pub color: Rgba,
}

impl GradientStop {
    pub const fn new(position: f64, color: Rgba) -> Self {
        Self { position, color }
    }
}

/// Precomputed gradient samples indexed by `floor(norm * 255)`
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLut {
    entries: Box<[Rgba; LUT_SIZE]>,
}

impl ColorLut {
    /// Sample the gradient at `i / 255` for every entry
    ///
    /// Entry 0 is exactly the first stop and entry 255 exactly the last, so
    /// the domain ends map to the stop colours rather than to pixel centres
    /// at `(i + 0.5) / 256`.
    ///
    /// Stops are sorted by position (clamped into `[0, 1]`). Before the first
    /// stop and after the last one the edge colour extends. No stops yields
    /// a fully transparent table.
    pub fn build(stops: &[GradientStop]) -> Self {
        let mut sorted: Vec<GradientStop> = stops
            .iter()
            .filter(|stop| stop.position.is_finite())
            .map(|stop| GradientStop::new(stop.position.clamp(0.0, 1.0), stop.color))
            .collect();
        sorted.sort_by(|a, b| a.position.total_cmp(&b.position));

        let mut entries = Box::new([Rgba::TRANSPARENT; LUT_SIZE]);
        if sorted.is_empty() {
            return Self { entries };
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            *entry = sample(&sorted, i as f64 / (LUT_SIZE - 1) as f64);
        }
        Self { entries }
    }

    pub fn get(&self, index: usize) -> Rgba {
        self.entries[index.min(LUT_SIZE - 1)]
    }

    /// Colour for a normalized value in `[0, 1]`; out-of-range input is clamped
    pub fn lookup(&self, norm: f64) -> Rgba {
        let norm = if norm.is_nan() { 0.0 } else { norm.clamp(0.0, 1.0) };
        self.get((norm * (LUT_SIZE - 1) as f64).floor() as usize)
    }
}

fn sample(sorted: &[GradientStop], t: f64) -> Rgba {
    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);
    if t <= first.position {
        return first.color;
    }
    if t >= last.position {
        return last.color;
    }
    for pair in sorted.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t >= lo.position && t <= hi.position {
            let span = hi.position - lo.position;
            if span <= 0.0 {
                return hi.color;
            }
            return lo.color.lerp(hi.color, (t - lo.position) / span);
        }
    }
    last.color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdwConfig;

    #[test]
    fn test_hex_round_trip() {
        let color = Rgba::parse_hex("#ffff00").unwrap();
        assert_eq!(color, Rgba::rgb(255, 255, 0));
        assert_eq!(color.to_string(), "#ffff00");

        let translucent = Rgba::parse_hex("00ff0080").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_string(), "#00ff0080");

        assert!(Rgba::parse_hex("#12345").is_err());
        assert!(Rgba::parse_hex("#gg0000").is_err());
    }

    #[test]
    fn test_default_gradient_endpoints_and_midpoint() {
        let lut = ColorLut::build(&IdwConfig::default().gradient);

        assert_eq!(lut.get(0), Rgba::rgb(0, 255, 0));
        assert_eq!(lut.get(255), Rgba::rgb(255, 0, 0));
        // Roughly halfway between green and yellow
        let quarter = lut.lookup(0.25);
        assert!((120..=135).contains(&quarter.r), "r = {}", quarter.r);
        assert_eq!((quarter.g, quarter.b, quarter.a), (255, 0, 255));
    }

    #[test]
    fn test_edges_extend_beyond_stops() {
        let lut = ColorLut::build(&[
            GradientStop::new(0.25, Rgba::rgb(0, 0, 255)),
            GradientStop::new(0.75, Rgba::rgb(255, 0, 0)),
        ]);
        assert_eq!(lut.lookup(0.0), Rgba::rgb(0, 0, 255));
        assert_eq!(lut.lookup(1.0), Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn test_unsorted_stops_are_sorted() {
        let lut = ColorLut::build(&[
            GradientStop::new(1.0, Rgba::rgb(255, 0, 0)),
            GradientStop::new(0.0, Rgba::rgb(0, 255, 0)),
        ]);
        assert_eq!(lut.get(0), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn test_empty_gradient_is_transparent() {
        let lut = ColorLut::build(&[]);
        assert_eq!(lut.lookup(0.5).a, 0);
    }

    #[test]
    fn test_stop_serializes_as_hex() {
        let json = serde_json::to_string(&GradientStop::new(0.5, Rgba::rgb(255, 255, 0))).unwrap();
        assert_eq!(json, r##"{"position":0.5,"color":"#ffff00"}"##);
    }
}
