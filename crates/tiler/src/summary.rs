//! Raster summary: dimensions, bands, and geographic footprint.

use serde::{Deserialize, Serialize};

use mercator::GlobalMercator;
use raster_source::{RasterSource, SampleType, SpatialRef};
use tiles_common::{Geographic2D, TilerResult};

/// A human-consumable description of an opened raster.
///
/// The footprint is reported for web-mercator rasters only: corners as
/// a closed five-point ring (UL, UR, LR, LL, UL) plus the center point,
/// all in WGS84 degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterSummary {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub footprint: Option<Vec<Geographic2D>>,
    pub center: Option<Geographic2D>,
}

impl RasterSummary {
    pub fn of(source: &dyn RasterSource) -> TilerResult<Self> {
        let width = source.width();
        let height = source.height();
        let gt = source.geotransform()?;

        let in_mercator = source
            .spatial_ref()
            .map(|srs| srs.matches(&SpatialRef::web_mercator()))
            .unwrap_or(false);

        let (footprint, center) = if in_mercator && !gt.is_identity() {
            // Tile size does not affect the inverse projection.
            let mercator = GlobalMercator::new(256);
            let to_geo = |px: f64, py: f64| {
                let (mx, my) = gt.apply(px, py);
                mercator.meters_to_lat_lon(mx, my)
            };

            let (w, h) = (width as f64, height as f64);
            let ul = to_geo(0.0, 0.0);
            let ring = vec![ul, to_geo(w, 0.0), to_geo(w, h), to_geo(0.0, h), ul];
            let center = to_geo(w / 2.0, h / 2.0);
            (Some(ring), Some(center))
        } else {
            (None, None)
        };

        Ok(Self {
            width,
            height,
            band_count: source.band_count(),
            sample_type: source.sample_type(),
            footprint,
            center,
        })
    }
}
