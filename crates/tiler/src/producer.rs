//! Raster tile producer.
//!
//! Orchestrates one tile's generation: validates the tile index against
//! the raster's pyramid range, windows the tile footprint onto source
//! pixels, reads and rescales the samples, composes the RGB(+alpha)
//! canvas, and writes the encoded image at the tile path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use raster_source::{find_alpha_band, ColorInterpretation, RasterSource, SampleBuffer, SpatialRef};
use tile_image::{TileCanvas, TileFormat};
use tiles_common::{BoundingBox, Projected2D, TileXY, TilerError, TilerResult};

use crate::grid::Tiler;
use crate::query::geo_query;
use crate::rescale::rescale_to_bytes;

/// Tiling configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TileOptions {
    /// Tile edge length in pixels; must be a power of two.
    pub tile_size: u32,
    /// Interpret requested rows in TMS order (row 0 at the south edge).
    pub tms: bool,
    /// Output image format.
    pub format: TileFormat,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            tms: false,
            format: TileFormat::Png,
        }
    }
}

/// Tile producer over an opened raster source.
///
/// Owns the source handle (and, when a reprojected view was created,
/// the original handle too) for its lifetime; both are released on
/// drop. Holds no per-tile state, so one producer can serve concurrent
/// `tile` calls as long as the source tolerates concurrent reads.
pub struct RasterTiler {
    tiler: Tiler,
    source: Box<dyn RasterSource>,
    /// Pre-reprojection dataset. Band statistics are computed against
    /// original sample values, never against the resampled view.
    original: Option<Box<dyn RasterSource>>,
    format: TileFormat,
    bounds: BoundingBox<Projected2D>,
    data_bands: usize,
    min_zoom: u8,
    max_zoom: u8,
}

impl RasterTiler {
    /// Build a producer for an opened raster.
    ///
    /// Fails on an invalid tile size or missing input path, a raster
    /// with no bands, no resolvable spatial reference, no
    /// georeferencing, or a degenerate geotransform. When the input
    /// spatial reference differs from web mercator, a reprojected view
    /// is requested from the source.
    pub fn new(
        source: Box<dyn RasterSource>,
        input_path: &Path,
        output_root: &Path,
        options: TileOptions,
    ) -> TilerResult<Self> {
        let tiler = Tiler::new(input_path, output_root, options.tile_size, options.tms)?;
        let input_name = input_path.display().to_string();

        if source.band_count() == 0 {
            return Err(TilerError::NoBands(input_name));
        }

        // Input spatial reference: projection metadata first, ground
        // control points as the fallback.
        let input_srs = source
            .spatial_ref()
            .or_else(|| {
                if source.gcp_count() > 0 {
                    source.gcp_spatial_ref()
                } else {
                    None
                }
            })
            .ok_or_else(|| TilerError::MissingProjection(input_name.clone()))?;

        // Output is always EPSG:3857; geodetic tiling is unsupported.
        let output_srs = SpatialRef::web_mercator();

        let gt = source.geotransform()?;
        if gt.is_identity() && source.gcp_count() == 0 {
            return Err(TilerError::NotGeoreferenced(input_name));
        }

        let (source, original) = if !input_srs.matches(&output_srs) {
            let warped = source.warped_to(&output_srs)?;
            (warped, Some(source))
        } else {
            (source, None)
        };

        let data_bands = data_bands_count(source.as_ref());

        let gt = source.geotransform()?;
        if gt.has_degenerate_pixel_size() {
            return Err(TilerError::DegenerateGeotransform);
        }

        let width = source.width();
        let height = source.height();
        let o_min_x = gt.origin_x();
        let o_max_x = gt.origin_x() + width as f64 * gt.pixel_width();
        let o_max_y = gt.origin_y();
        // A mercator-aligned raster has square pixels; the x pixel size
        // drives both axes.
        let o_min_y = gt.origin_y() - height as f64 * gt.pixel_width();
        let bounds = BoundingBox::new(
            Projected2D::new(o_min_x, o_min_y),
            Projected2D::new(o_max_x, o_max_y),
        );

        let max_zoom = tiler.mercator().zoom_for_pixel_size(gt.pixel_width());
        let min_zoom = tiler.mercator().zoom_for_pixel_size(
            gt.pixel_width() * width.max(height) as f64 / options.tile_size as f64,
        );

        debug!(
            min_x = bounds.min.x,
            min_y = bounds.min.y,
            max_x = bounds.max.x,
            max_y = bounds.max.y,
            "raster bounds in output SRS"
        );
        debug!(min_zoom, max_zoom, data_bands, "tile producer ready");

        Ok(Self {
            tiler,
            source,
            original,
            format: options.format,
            bounds,
            data_bands,
            min_zoom,
            max_zoom,
        })
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn data_bands(&self) -> usize {
        self.data_bands
    }

    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Raster bounding box in the output projection.
    pub fn bounds(&self) -> &BoundingBox<Projected2D> {
        &self.bounds
    }

    /// Valid tile-index range at a zoom level.
    pub fn min_max_coords_for_z(&self, zoom: u8) -> BoundingBox<TileXY> {
        self.tiler.min_max_coords_for_z(&self.bounds, zoom)
    }

    /// Generate one tile and return its file path.
    ///
    /// Out-of-range indices and footprints that miss the raster fail
    /// with skippable errors and leave the producer untouched.
    pub fn tile(&self, z: u8, x: i64, y: i64) -> TilerResult<PathBuf> {
        let tile_path = self.tiler.tile_path(z, x, y, self.format);
        if let Some(parent) = tile_path.parent() {
            // Existing directories are not an error.
            fs::create_dir_all(parent)?;
        }

        let ty = if self.tiler.tms() {
            self.tiler.tms_to_xyz(y, z)
        } else {
            y
        };

        let min_max = self.tiler.min_max_coords_for_z(&self.bounds, z);
        if !min_max.contains(x, ty) {
            return Err(TilerError::TileOutOfBounds { z, x, y: ty });
        }

        // Capped RGB output; a raster whose only band is alpha still
        // gets one data band.
        let capped_bands = self.data_bands.clamp(1, 3);
        let tile_size = self.tiler.tile_size();
        let mut canvas = TileCanvas::new(tile_size, capped_bands);

        let b = self.tiler.mercator().tile_bounds(x, ty, z);
        let gt = self.source.geotransform()?;
        let query = geo_query(
            &gt,
            self.source.width(),
            self.source.height(),
            b.min.x,
            b.max.y,
            b.max.x,
            b.min.y,
            tile_size as usize,
        )?;
        debug!(z, x, y = ty, src = ?query.src, dst = ?query.dst, "geo query");

        // Distinct from the index check above: the index can be in the
        // pyramid range while the footprint still misses actual pixels.
        if query.is_empty() {
            return Err(TilerError::NoIntersection);
        }

        let buffer =
            self.source
                .read_window(query.src, capped_bands, query.dst.width, query.dst.height)?;

        let bytes = match buffer {
            SampleBuffer::U8(bytes) => bytes,
            buffer => {
                let (global_min, global_max) = self.global_range(capped_bands)?;
                rescale_to_bytes(&buffer, global_min, global_max)?
            }
        };

        // Alpha source: an explicit alpha band wins, the default mask
        // covers the rest.
        let alpha = match find_alpha_band(self.source.as_ref()) {
            Some(band) => self.source.read_band_window_u8(
                band,
                query.src,
                query.dst.width,
                query.dst.height,
            )?,
            None => {
                self.source
                    .read_mask_window(query.src, query.dst.width, query.dst.height)?
            }
        };

        canvas.write_bands(query.dst, &bytes)?;
        canvas.write_alpha(query.dst, &alpha)?;

        let encoded = tile_image::encode(self.format, &canvas)?;
        fs::write(&tile_path, encoded)?;
        debug!(path = %tile_path.display(), "wrote tile");

        Ok(tile_path)
    }

    /// Global min/max across the capped data bands, read from the
    /// original (un-reprojected) dataset when one exists. Missing
    /// statistics are computed and written back to the source's cache.
    fn global_range(&self, capped_bands: usize) -> TilerResult<(f64, f64)> {
        let stats_source = self.original.as_deref().unwrap_or(self.source.as_ref());

        let mut global_min = f64::INFINITY;
        let mut global_max = f64::NEG_INFINITY;
        for band in 0..capped_bands {
            let stats = match stats_source.band_statistics(band, false)? {
                Some(stats) => stats,
                None => {
                    let stats = stats_source
                        .band_statistics(band, true)?
                        .ok_or(TilerError::Statistics(band))?;
                    stats_source.cache_band_statistics(band, stats)?;
                    debug!(band, min = stats.min, max = stats.max, "cached band statistics");
                    stats
                }
            };
            global_min = global_min.min(stats.min);
            global_max = global_max.max(stats.max);
        }
        Ok((global_min, global_max))
    }
}

/// Number of data bands, excluding an alpha band.
///
/// Alpha is assumed when the dataset mask is an alpha mask, the band
/// count is 2 or 4, or the last band is interpreted as alpha.
fn data_bands_count(source: &dyn RasterSource) -> usize {
    let band_count = source.band_count();
    let last_is_alpha =
        source.color_interpretation(band_count - 1) == ColorInterpretation::Alpha;

    if source.mask_is_alpha() || band_count == 4 || band_count == 2 || last_is_alpha {
        band_count - 1
    } else {
        band_count
    }
}
