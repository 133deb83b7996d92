//! Fully in-memory raster source.
//!
//! Backs both the unit/integration fixtures and the image-file loader.
//! Band planes are stored in their native sample type; window reads
//! resample with nearest neighbor, matching how the engine pulls a
//! source rectangle into a differently-sized destination window.

use std::collections::HashMap;
use std::sync::RwLock;

use tiles_common::{PixelWindow, TilerError, TilerResult};
use tracing::debug;

use crate::geotransform::Geotransform;
use crate::srs::SpatialRef;
use crate::types::{BandStatistics, ColorInterpretation, SampleBuffer, SampleType};
use crate::RasterSource;

#[derive(Debug)]
struct Band {
    data: SampleBuffer,
    interp: ColorInterpretation,
}

#[derive(Debug)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    bands: Vec<Band>,
    geotransform: Option<Geotransform>,
    spatial_ref: Option<SpatialRef>,
    gcp_count: usize,
    gcp_spatial_ref: Option<SpatialRef>,
    mask_is_alpha: bool,
    stats: RwLock<HashMap<usize, BandStatistics>>,
}

impl MemoryRaster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bands: Vec::new(),
            geotransform: None,
            spatial_ref: None,
            gcp_count: 0,
            gcp_spatial_ref: None,
            mask_is_alpha: false,
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_geotransform(mut self, gt: Geotransform) -> Self {
        self.geotransform = Some(gt);
        self
    }

    pub fn with_spatial_ref(mut self, srs: SpatialRef) -> Self {
        self.spatial_ref = Some(srs);
        self
    }

    pub fn with_gcps(mut self, count: usize, srs: SpatialRef) -> Self {
        self.gcp_count = count;
        self.gcp_spatial_ref = Some(srs);
        self
    }

    pub fn with_mask_is_alpha(mut self, mask_is_alpha: bool) -> Self {
        self.mask_is_alpha = mask_is_alpha;
        self
    }

    /// Append a band plane.
    ///
    /// # Panics
    /// Panics if the plane length is not `width * height`.
    pub fn with_band(mut self, data: SampleBuffer, interp: ColorInterpretation) -> Self {
        assert_eq!(
            data.len(),
            self.width * self.height,
            "band plane must be width * height samples"
        );
        self.bands.push(Band { data, interp });
        self
    }

    fn check_window(
        &self,
        window: &PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<()> {
        if window.is_empty()
            || window.x + window.width > self.width
            || window.y + window.height > self.height
        {
            return Err(TilerError::ReadFailed(format!(
                "window {},{} {}x{} outside raster {}x{}",
                window.x, window.y, window.width, window.height, self.width, self.height
            )));
        }
        if out_width == 0 || out_height == 0 {
            return Err(TilerError::ReadFailed(format!(
                "empty output buffer {out_width}x{out_height}"
            )));
        }
        Ok(())
    }

    fn band(&self, band: usize) -> TilerResult<&Band> {
        self.bands
            .get(band)
            .ok_or_else(|| TilerError::ReadFailed(format!("no band {band}")))
    }

    fn resample_plane<T: Copy>(
        &self,
        data: &[T],
        window: &PixelWindow,
        out_width: usize,
        out_height: usize,
        out: &mut Vec<T>,
    ) {
        for oy in 0..out_height {
            let sy = (window.y + oy * window.height / out_height).min(self.height - 1);
            for ox in 0..out_width {
                let sx = (window.x + ox * window.width / out_width).min(self.width - 1);
                out.push(data[sy * self.width + sx]);
            }
        }
    }

    /// Scan a band and compute min/max/mean/stddev, skipping NaNs.
    fn compute_statistics(&self, band: usize) -> TilerResult<BandStatistics> {
        let plane = &self.band(band)?.data;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut count = 0usize;

        for i in 0..plane.len() {
            let v = match plane.get_f64(i) {
                Some(v) if !v.is_nan() => v,
                _ => continue,
            };
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_sq += v * v;
            count += 1;
        }

        if count == 0 {
            return Err(TilerError::Statistics(band));
        }

        let mean = sum / count as f64;
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        debug!(band, min, max, mean, "computed band statistics");

        Ok(BandStatistics {
            min,
            max,
            mean: Some(mean),
            std_dev: Some(variance.sqrt()),
        })
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn sample_type(&self) -> SampleType {
        self.bands
            .first()
            .map(|b| b.data.sample_type())
            .unwrap_or(SampleType::U8)
    }

    fn geotransform(&self) -> TilerResult<Geotransform> {
        Ok(self.geotransform.unwrap_or(Geotransform::IDENTITY))
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        self.spatial_ref.clone()
    }

    fn gcp_count(&self) -> usize {
        self.gcp_count
    }

    fn gcp_spatial_ref(&self) -> Option<SpatialRef> {
        self.gcp_spatial_ref.clone()
    }

    fn color_interpretation(&self, band: usize) -> ColorInterpretation {
        self.bands
            .get(band)
            .map(|b| b.interp)
            .unwrap_or(ColorInterpretation::Undefined)
    }

    fn mask_is_alpha(&self) -> bool {
        self.mask_is_alpha
    }

    fn read_window(
        &self,
        window: PixelWindow,
        band_count: usize,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<SampleBuffer> {
        self.check_window(&window, out_width, out_height)?;
        if band_count == 0 || band_count > self.bands.len() {
            return Err(TilerError::ReadFailed(format!(
                "requested {band_count} bands from {}-band raster",
                self.bands.len()
            )));
        }

        macro_rules! gather {
            ($variant:ident) => {{
                let mut out = Vec::with_capacity(band_count * out_width * out_height);
                for band in 0..band_count {
                    match &self.bands[band].data {
                        SampleBuffer::$variant(plane) => {
                            self.resample_plane(plane, &window, out_width, out_height, &mut out)
                        }
                        other => {
                            return Err(TilerError::ReadFailed(format!(
                                "band {band} sample type {:?} differs from band 0",
                                other.sample_type()
                            )))
                        }
                    }
                }
                SampleBuffer::$variant(out)
            }};
        }

        Ok(match self.sample_type() {
            SampleType::U8 => gather!(U8),
            SampleType::U16 => gather!(U16),
            SampleType::I16 => gather!(I16),
            SampleType::U32 => gather!(U32),
            SampleType::I32 => gather!(I32),
            SampleType::F32 => gather!(F32),
            SampleType::F64 => gather!(F64),
        })
    }

    fn read_band_window_u8(
        &self,
        band: usize,
        window: PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<Vec<u8>> {
        self.check_window(&window, out_width, out_height)?;
        let plane = &self.band(band)?.data;

        let mut out = Vec::with_capacity(out_width * out_height);
        for oy in 0..out_height {
            let sy = (window.y + oy * window.height / out_height).min(self.height - 1);
            for ox in 0..out_width {
                let sx = (window.x + ox * window.width / out_width).min(self.width - 1);
                let v = plane.get_f64(sy * self.width + sx).unwrap_or(0.0);
                out.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }
        Ok(out)
    }

    fn read_mask_window(
        &self,
        window: PixelWindow,
        out_width: usize,
        out_height: usize,
    ) -> TilerResult<Vec<u8>> {
        self.check_window(&window, out_width, out_height)?;
        // No nodata model: every stored pixel is valid.
        Ok(vec![255u8; out_width * out_height])
    }

    fn band_statistics(
        &self,
        band: usize,
        force_compute: bool,
    ) -> TilerResult<Option<BandStatistics>> {
        self.band(band)?;

        if let Some(cached) = self.stats.read().expect("stats lock poisoned").get(&band) {
            return Ok(Some(*cached));
        }
        if !force_compute {
            return Ok(None);
        }
        self.compute_statistics(band).map(Some)
    }

    fn cache_band_statistics(&self, band: usize, stats: BandStatistics) -> TilerResult<()> {
        self.band(band)?;
        self.stats
            .write()
            .expect("stats lock poisoned")
            .insert(band, stats);
        Ok(())
    }

    fn warped_to(&self, target: &SpatialRef) -> TilerResult<Box<dyn RasterSource>> {
        match &self.spatial_ref {
            Some(srs) if srs.matches(target) => Ok(Box::new(self.clone_raster())),
            _ => Err(TilerError::ReprojectionUnsupported),
        }
    }
}

impl MemoryRaster {
    fn clone_raster(&self) -> MemoryRaster {
        MemoryRaster {
            width: self.width,
            height: self.height,
            bands: self
                .bands
                .iter()
                .map(|b| Band {
                    data: b.data.clone(),
                    interp: b.interp,
                })
                .collect(),
            geotransform: self.geotransform,
            spatial_ref: self.spatial_ref.clone(),
            gcp_count: self.gcp_count,
            gcp_spatial_ref: self.gcp_spatial_ref.clone(),
            mask_is_alpha: self.mask_is_alpha,
            stats: RwLock::new(self.stats.read().expect("stats lock poisoned").clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_raster() -> MemoryRaster {
        // 4x4 gray ramp 0..=15.
        let plane: Vec<u8> = (0..16).collect();
        MemoryRaster::new(4, 4)
            .with_geotransform(Geotransform::new([0.0, 10.0, 0.0, 40.0, 0.0, -10.0]))
            .with_spatial_ref(SpatialRef::web_mercator())
            .with_band(SampleBuffer::U8(plane), ColorInterpretation::Gray)
    }

    #[test]
    fn test_read_window_identity() {
        let r = gradient_raster();
        let buf = r
            .read_window(PixelWindow::new(1, 1, 2, 2), 1, 2, 2)
            .unwrap();
        assert_eq!(buf, SampleBuffer::U8(vec![5, 6, 9, 10]));
    }

    #[test]
    fn test_read_window_upsamples() {
        let r = gradient_raster();
        // 1x1 source window blown up to 2x2 repeats the sample.
        let buf = r
            .read_window(PixelWindow::new(2, 0, 1, 1), 1, 2, 2)
            .unwrap();
        assert_eq!(buf, SampleBuffer::U8(vec![2, 2, 2, 2]));
    }

    #[test]
    fn test_read_window_out_of_bounds() {
        let r = gradient_raster();
        assert!(r.read_window(PixelWindow::new(3, 3, 2, 2), 1, 2, 2).is_err());
        assert!(r.read_window(PixelWindow::new(0, 0, 0, 1), 1, 1, 1).is_err());
    }

    #[test]
    fn test_statistics_cache_round_trip() {
        let r = gradient_raster();

        // Nothing cached, not forced.
        assert!(r.band_statistics(0, false).unwrap().is_none());

        // Forced computation scans the plane but does not populate the
        // cache on its own.
        let stats = r.band_statistics(0, true).unwrap().unwrap();
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 15.0);
        assert!(r.band_statistics(0, false).unwrap().is_none());

        // Written back, the stats come from the cache.
        r.cache_band_statistics(0, stats).unwrap();
        let cached = r.band_statistics(0, false).unwrap().unwrap();
        assert_eq!(cached.min, 0.0);
        assert_eq!(cached.max, 15.0);
    }

    #[test]
    fn test_float_statistics_skip_nan() {
        let plane = vec![1.0f32, f32::NAN, 3.0, f32::NAN];
        let r = MemoryRaster::new(2, 2)
            .with_band(SampleBuffer::F32(plane), ColorInterpretation::Gray);
        let stats = r.band_statistics(0, true).unwrap().unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.mean, Some(2.0));
    }

    #[test]
    fn test_warped_to_same_projection_clones() {
        let r = gradient_raster();
        let warped = r.warped_to(&SpatialRef::web_mercator()).unwrap();
        assert_eq!(warped.width(), 4);
        assert_eq!(warped.band_count(), 1);
    }

    #[test]
    fn test_warped_to_other_projection_refuses() {
        let r = gradient_raster();
        assert!(matches!(
            r.warped_to(&SpatialRef::wgs84()),
            Err(TilerError::ReprojectionUnsupported)
        ));
    }

    #[test]
    fn test_mixed_band_types_rejected() {
        let r = MemoryRaster::new(2, 2)
            .with_band(SampleBuffer::U16(vec![0; 4]), ColorInterpretation::Gray)
            .with_band(SampleBuffer::U8(vec![0; 4]), ColorInterpretation::Alpha);
        assert!(r.read_window(PixelWindow::new(0, 0, 2, 2), 2, 2, 2).is_err());
    }
}
