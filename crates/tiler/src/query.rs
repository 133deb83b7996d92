//! Geo-query: map a tile's projected footprint onto source pixels.
//!
//! Produces a (source window, destination window) pair. When the
//! footprint extends past a raster edge, the source rectangle is clamped
//! and the destination rectangle is trimmed by the same fraction, so a
//! partial tile carries data only for the pixels that exist, placed at
//! the correct offset within the canvas rather than stretched to fill
//! it.

use raster_source::Geotransform;
use tiles_common::{PixelWindow, TilerError, TilerResult};

/// Result of a geo-query: where to read and where to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoQuery {
    /// Source rectangle in raster pixels.
    pub src: PixelWindow,
    /// Destination rectangle in tile-canvas pixels.
    pub dst: PixelWindow,
}

impl GeoQuery {
    /// Whether the tile footprint misses the raster entirely.
    pub fn is_empty(&self) -> bool {
        self.src.is_empty() || self.dst.is_empty()
    }
}

/// Compute the source/destination windows for a projected footprint.
///
/// `(ulx, uly)` and `(lrx, lry)` are the footprint's upper-left and
/// lower-right corners in the raster's projected coordinates.
/// `query_size` is the destination edge length (the tile size); 0 keeps
/// the source resolution.
pub fn geo_query(
    gt: &Geotransform,
    raster_width: usize,
    raster_height: usize,
    ulx: f64,
    uly: f64,
    lrx: f64,
    lry: f64,
    query_size: usize,
) -> TilerResult<GeoQuery> {
    if gt.has_degenerate_pixel_size() {
        return Err(TilerError::DegenerateGeotransform);
    }

    // The small bias absorbs footprints that land a hair outside a pixel
    // boundary from floating-point noise.
    let mut rx = ((ulx - gt.origin_x()) / gt.pixel_width() + 0.001) as i64;
    let mut ry = ((uly - gt.origin_y()) / gt.pixel_height() + 0.001) as i64;
    let mut rx_size = (((lrx - ulx) / gt.pixel_width()) + 0.5).max(1.0) as i64;
    let mut ry_size = (((lry - uly) / gt.pixel_height()) + 0.5).max(1.0) as i64;

    let (mut wx, mut wy) = (0i64, 0i64);
    let (mut wx_size, mut wy_size) = if query_size == 0 {
        (rx_size, ry_size)
    } else {
        (query_size as i64, query_size as i64)
    };

    if rx < 0 {
        let shift = (-rx) as f64;
        wx = (wx_size as f64 * (shift / rx_size as f64)) as i64;
        wx_size -= wx;
        rx_size -= (rx_size as f64 * (shift / rx_size as f64)) as i64;
        rx = 0;
    }
    if rx + rx_size > raster_width as i64 {
        wx_size = (wx_size as f64 * ((raster_width as f64 - rx as f64) / rx_size as f64)) as i64;
        rx_size = raster_width as i64 - rx;
    }

    if ry < 0 {
        let shift = (-ry) as f64;
        wy = (wy_size as f64 * (shift / ry_size as f64)) as i64;
        wy_size -= wy;
        ry_size -= (ry_size as f64 * (shift / ry_size as f64)) as i64;
        ry = 0;
    }
    if ry + ry_size > raster_height as i64 {
        wy_size = (wy_size as f64 * ((raster_height as f64 - ry as f64) / ry_size as f64)) as i64;
        ry_size = raster_height as i64 - ry;
    }

    Ok(GeoQuery {
        src: window(rx, ry, rx_size, ry_size),
        dst: window(wx, wy, wx_size, wy_size),
    })
}

fn window(x: i64, y: i64, width: i64, height: i64) -> PixelWindow {
    PixelWindow::new(
        x.max(0) as usize,
        y.max(0) as usize,
        width.max(0) as usize,
        height.max(0) as usize,
    )
}
