//! Point types for the three coordinate spaces the engine moves between:
//! projected meters, geographic degrees, and integer tile indices.

use serde::{Deserialize, Serialize};

/// Convert degrees to radians.
pub fn deg2rad(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Convert radians to degrees.
pub fn rad2deg(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// A point in projected (EPSG:3857) meters, or in pyramid pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Projected2D {
    pub x: f64,
    pub y: f64,
}

impl Projected2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A geographic (WGS84) point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geographic2D {
    pub latitude: f64,
    pub longitude: f64,
}

impl Geographic2D {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// An integer tile index within one zoom level.
///
/// Signed: raw indices produced by mapping a raster's corners into tile
/// space may fall outside the world before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileXY {
    pub x: i64,
    pub y: i64,
}

impl TileXY {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}
