//! Spherical-mercator (EPSG:3857) tile pyramid math.
//!
//! Pure coordinate conversions between pixel, projected-meter, and
//! tile-index spaces at a given zoom level. No I/O, no state beyond the
//! tile size.

use tiles_common::{rad2deg, BoundingBox, Geographic2D, Projected2D, TileXY};

/// Earth radius in meters (WGS84 semi-major axis).
const EARTH_RADIUS: f64 = 6378137.0;

/// Highest zoom level considered by the pixel-size scan.
const MAX_ZOOM: u8 = 31;

/// Tile pyramid conversions for a spherical-mercator grid with a
/// configurable tile size.
#[derive(Debug, Clone, Copy)]
pub struct GlobalMercator {
    tile_size: u32,
    origin_shift: f64,
    initial_resolution: f64,
}

impl GlobalMercator {
    /// Create a pyramid for the given tile size.
    ///
    /// `initial_resolution` is 156543.03392804062 m/px for 256-pixel tiles.
    pub fn new(tile_size: u32) -> Self {
        let initial_resolution = 2.0 * std::f64::consts::PI * EARTH_RADIUS / tile_size as f64;
        let origin_shift = std::f64::consts::PI * EARTH_RADIUS;
        Self {
            tile_size,
            origin_shift,
            initial_resolution,
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Resolution in meters per pixel at the given zoom, measured at the
    /// equator.
    pub fn resolution(&self, zoom: u8) -> f64 {
        self.initial_resolution / (1u64 << zoom) as f64
    }

    /// Convert pyramid pixel coordinates at a zoom level to EPSG:3857
    /// meters.
    pub fn pixels_to_meters(&self, px: f64, py: f64, zoom: u8) -> Projected2D {
        let res = self.resolution(zoom);
        Projected2D::new(px * res - self.origin_shift, py * res - self.origin_shift)
    }

    /// Convert EPSG:3857 meters to pyramid pixel coordinates at a zoom
    /// level.
    pub fn meters_to_pixels(&self, mx: f64, my: f64, zoom: u8) -> Projected2D {
        let res = self.resolution(zoom);
        Projected2D::new((mx + self.origin_shift) / res, (my + self.origin_shift) / res)
    }

    /// Convert EPSG:3857 meters to WGS84 lat/lon degrees.
    pub fn meters_to_lat_lon(&self, mx: f64, my: f64) -> Geographic2D {
        let lon = (mx / self.origin_shift) * 180.0;
        let y = (my / self.origin_shift) * 180.0;
        let lat = rad2deg(2.0 * (y * std::f64::consts::PI / 180.0).exp().atan()
            - std::f64::consts::PI / 2.0);
        Geographic2D::new(lat, lon)
    }

    /// Convert WGS84 lat/lon degrees to EPSG:3857 meters.
    pub fn lat_lon_to_meters(&self, lat: f64, lon: f64) -> Projected2D {
        let mx = lon / 180.0 * self.origin_shift;
        let my = ((90.0 + lat) * std::f64::consts::PI / 360.0).tan().ln()
            / (std::f64::consts::PI / 180.0);
        Projected2D::new(mx, my / 180.0 * self.origin_shift)
    }

    /// Tile covering the given pyramid pixel coordinates.
    ///
    /// The `ceil(p / S) - 1` form yields the tile containing the point
    /// while staying stable for values landing exactly on a tile edge.
    pub fn pixels_to_tile(&self, px: f64, py: f64) -> TileXY {
        let s = self.tile_size as f64;
        TileXY::new(
            (px / s).ceil() as i64 - 1,
            (py / s).ceil() as i64 - 1,
        )
    }

    /// Tile containing the given EPSG:3857 point at a zoom level.
    pub fn meters_to_tile(&self, mx: f64, my: f64, zoom: u8) -> TileXY {
        let p = self.meters_to_pixels(mx, my, zoom);
        self.pixels_to_tile(p.x, p.y)
    }

    /// Bounds of a tile in EPSG:3857 meters.
    pub fn tile_bounds(&self, tx: i64, ty: i64, zoom: u8) -> BoundingBox<Projected2D> {
        let s = self.tile_size as i64;
        let min = self.pixels_to_meters((tx * s) as f64, (ty * s) as f64, zoom);
        let max = self.pixels_to_meters(((tx + 1) * s) as f64, ((ty + 1) * s) as f64, zoom);
        BoundingBox::new(min, max)
    }

    /// Bounds of a tile in WGS84 lat/lon degrees.
    pub fn tile_lat_lon_bounds(&self, tx: i64, ty: i64, zoom: u8) -> BoundingBox<Geographic2D> {
        let bounds = self.tile_bounds(tx, ty, zoom);
        let min = self.meters_to_lat_lon(bounds.min.x, bounds.min.y);
        let max = self.meters_to_lat_lon(bounds.max.x, bounds.max.y);
        BoundingBox::new(min, max)
    }

    /// Smallest zoom whose resolution does not exceed the given pixel
    /// size. Returns 31 when none qualifies (degenerate or extremely
    /// high-resolution input).
    pub fn zoom_for_pixel_size(&self, pixel_size: f64) -> u8 {
        for zoom in 0..MAX_ZOOM {
            if self.resolution(zoom) <= pixel_size {
                return zoom;
            }
        }
        MAX_ZOOM
    }

    /// Minimum zoom level that can fully contain a line of the given
    /// length in meters.
    pub fn zoom_for_length(&self, meter_length: f64) -> u8 {
        for zoom in 0..MAX_ZOOM {
            if self.resolution(zoom) <= meter_length {
                return zoom;
            }
        }
        MAX_ZOOM
    }
}
