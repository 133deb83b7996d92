//! Raster access abstraction for the tile engine.
//!
//! The tile producer consumes rasters exclusively through the
//! [`RasterSource`] trait: windowed pixel reads, band statistics with a
//! write-back cache, and an optional reprojected view. Two
//! implementations ship here: [`MemoryRaster`] for fully in-memory data
//! and [`open_image_raster`] for image files georeferenced by world-file
//! sidecars.

pub mod geotransform;
pub mod loader;
pub mod memory;
pub mod srs;
pub mod types;

pub use geotransform::Geotransform;
pub use loader::open_image_raster;
pub use memory::MemoryRaster;
pub use srs::SpatialRef;
pub use types::{BandStatistics, ColorInterpretation, SampleBuffer, SampleType};

pub use tiles_common::PixelWindow;
use tiles_common::TilerResult;

/// Read-side contract over an opened raster dataset.
///
/// Implementations must be safe for concurrent reads; interior caches
/// (band statistics) carry their own locking. Band indices are
/// zero-based.
pub trait RasterSource: Send + Sync {
    /// Raster width in pixels.
    fn width(&self) -> usize;

    /// Raster height in pixels.
    fn height(&self) -> usize;

    /// Total number of bands, including any alpha band.
    fn band_count(&self) -> usize;

    /// Native sample type of the data bands.
    fn sample_type(&self) -> SampleType;

    /// Affine pixel-to-projected mapping. Sources without georeferencing
    /// report the identity transform.
    fn geotransform(&self) -> TilerResult<Geotransform>;

    /// Spatial reference from the raster's projection metadata.
    fn spatial_ref(&self) -> Option<SpatialRef>;

    /// Number of ground control points.
    fn gcp_count(&self) -> usize {
        0
    }

    /// Spatial reference attached to the ground control points.
    fn gcp_spatial_ref(&self) -> Option<SpatialRef> {
        None
    }

    /// Color interpretation of a band.
    fn color_interpretation(&self, band: usize) -> ColorInterpretation;

    /// Whether the dataset's default mask flags indicate an alpha mask.
    fn mask_is_alpha(&self) -> bool {
        false
    }

    /// Read a source window for the first `band_count` bands, resampled
    /// (nearest neighbor) to `out_width x out_height`. Returns
    /// band-sequential planes in the native sample type.
    fn read_window(
        &self,
        window: PixelWindow,
        band_count: usize,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<SampleBuffer>;

    /// Read one band's window converted to 8-bit samples.
    fn read_band_window_u8(
        &self,
        band: usize,
        window: PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<Vec<u8>>;

    /// Read the dataset's default mask for a window, as 8-bit coverage.
    fn read_mask_window(
        &self,
        window: PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<Vec<u8>>;

    /// Fetch band statistics. Returns `Ok(None)` when no statistics are
    /// cached and `force_compute` is false; with `force_compute` the
    /// source must scan the band or fail.
    fn band_statistics(
        &self,
        band: usize,
        force_compute: bool,
    ) -> TilerResult<Option<BandStatistics>>;

    /// Write statistics back to the source's cache.
    fn cache_band_statistics(&self, band: usize, stats: BandStatistics) -> TilerResult<()>;

    /// Produce a view of this raster reprojected to `target`.
    ///
    /// Warping algorithms are outside this crate; implementations may
    /// refuse with `TilerError::ReprojectionUnsupported`.
    fn warped_to(&self, target: &SpatialRef) -> TilerResult<Box<dyn RasterSource>>;
}

/// Find an explicit alpha band by color interpretation, if any.
pub fn find_alpha_band(source: &dyn RasterSource) -> Option<usize> {
    (0..source.band_count())
        .find(|&band| source.color_interpretation(band) == ColorInterpretation::Alpha)
}

/// Shared handles delegate, so a caller can keep a reference to a source
/// it hands to the tile producer.
impl<T: RasterSource + ?Sized> RasterSource for std::sync::Arc<T> {
    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn band_count(&self) -> usize {
        (**self).band_count()
    }

    fn sample_type(&self) -> SampleType {
        (**self).sample_type()
    }

    fn geotransform(&self) -> TilerResult<Geotransform> {
        (**self).geotransform()
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        (**self).spatial_ref()
    }

    fn gcp_count(&self) -> usize {
        (**self).gcp_count()
    }

    fn gcp_spatial_ref(&self) -> Option<SpatialRef> {
        (**self).gcp_spatial_ref()
    }

    fn color_interpretation(&self, band: usize) -> ColorInterpretation {
        (**self).color_interpretation(band)
    }

    fn mask_is_alpha(&self) -> bool {
        (**self).mask_is_alpha()
    }

    fn read_window(
        &self,
        window: PixelWindow,
        band_count: usize,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<SampleBuffer> {
        (**self).read_window(window, band_count, out_width, out_height)
    }

    fn read_band_window_u8(
        &self,
        band: usize,
        window: PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<Vec<u8>> {
        (**self).read_band_window_u8(band, window, out_width, out_height)
    }

    fn read_mask_window(
        &self,
        window: PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<Vec<u8>> {
        (**self).read_mask_window(window, out_width, out_height)
    }

    fn band_statistics(
        &self,
        band: usize,
        force_compute: bool,
    ) -> TilerResult<Option<BandStatistics>> {
        (**self).band_statistics(band, force_compute)
    }

    fn cache_band_statistics(&self, band: usize, stats: BandStatistics) -> TilerResult<()> {
        (**self).cache_band_statistics(band, stats)
    }

    fn warped_to(&self, target: &SpatialRef) -> TilerResult<Box<dyn RasterSource>> {
        (**self).warped_to(target)
    }
}
