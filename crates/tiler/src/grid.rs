//! Tile addressing: bridges raster geometry to the pyramid math.

use std::path::{Path, PathBuf};

use mercator::GlobalMercator;
use tile_image::TileFormat;
use tiles_common::{BoundingBox, Projected2D, TileXY, TilerError, TilerResult};

/// Validated tiling parameters plus the pyramid math they imply.
#[derive(Debug)]
pub struct Tiler {
    input_path: PathBuf,
    output_root: PathBuf,
    tile_size: u32,
    tms: bool,
    mercator: GlobalMercator,
}

impl Tiler {
    /// Validate the input path and tile size.
    pub fn new(
        input_path: &Path,
        output_root: &Path,
        tile_size: u32,
        tms: bool,
    ) -> TilerResult<Self> {
        if !input_path.exists() {
            return Err(TilerError::InputNotFound(
                input_path.display().to_string(),
            ));
        }
        if tile_size == 0 || !tile_size.is_power_of_two() {
            return Err(TilerError::InvalidTileSize(tile_size));
        }

        Ok(Self {
            input_path: input_path.to_path_buf(),
            output_root: output_root.to_path_buf(),
            tile_size,
            tms,
            mercator: GlobalMercator::new(tile_size),
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tms(&self) -> bool {
        self.tms
    }

    pub fn mercator(&self) -> &GlobalMercator {
        &self.mercator
    }

    /// On-disk path for a tile: `{output_root}/{z}/{x}/{y}.{ext}`.
    ///
    /// `(z, x, y)` uniquely addresses a tile, so collisions are
    /// impossible.
    pub fn tile_path(&self, z: u8, x: i64, y: i64, format: TileFormat) -> PathBuf {
        self.output_root
            .join(z.to_string())
            .join(x.to_string())
            .join(format!("{y}.{}", format.extension()))
    }

    /// Flip a tile row between TMS (row 0 south) and XYZ (row 0 north)
    /// ordering. Involution: applying it twice returns the input.
    pub fn tms_to_xyz(&self, ty: i64, tz: u8) -> i64 {
        (1i64 << tz) - 1 - ty
    }

    /// Valid tile-index range for a raster bounding box at a zoom level.
    ///
    /// X is cropped to the world limit `[0, 2^z - 1]`.
    pub fn min_max_coords_for_z(
        &self,
        bounds: &BoundingBox<Projected2D>,
        zoom: u8,
    ) -> BoundingBox<TileXY> {
        let min = self.mercator.meters_to_tile(bounds.min.x, bounds.min.y, zoom);
        let max = self.mercator.meters_to_tile(bounds.max.x, bounds.max.y, zoom);

        let world_max = (1i64 << zoom) - 1;
        // TODO: clamp y once the TMS/XYZ row convention for requests is
        // settled; clamping it here rejects valid flipped rows.
        BoundingBox::new(
            TileXY::new(min.x.max(0), min.y),
            TileXY::new(max.x.min(world_max), max.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn test_tiler(tile_size: u32, tms: bool) -> TilerResult<Tiler> {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        fs::write(&input, b"raster").unwrap();
        // The tempdir is dropped here; Tiler only checks existence at
        // construction, which has already happened.
        Tiler::new(&input, &dir.path().join("tiles"), tile_size, tms)
    }

    #[test]
    fn test_rejects_missing_input() {
        let err = Tiler::new(
            Path::new("/nonexistent/input.tif"),
            Path::new("/tmp/out"),
            256,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, TilerError::InputNotFound(_)));
    }

    #[test]
    fn test_rejects_non_power_of_two_tile_size() {
        for bad in [0u32, 100, 255, 300] {
            assert!(matches!(
                test_tiler(bad, false),
                Err(TilerError::InvalidTileSize(_))
            ));
        }
        assert!(test_tiler(128, false).is_ok());
        assert!(test_tiler(512, false).is_ok());
    }

    #[test]
    fn test_tile_path_layout() {
        let tiler = test_tiler(256, false).unwrap();
        let path = tiler.tile_path(12, 2076, 1410, TileFormat::Png);
        assert!(path.ends_with("12/2076/1410.png"));
        let path = tiler.tile_path(0, 0, 0, TileFormat::Webp);
        assert!(path.ends_with("0/0/0.webp"));
    }

    #[test]
    fn test_tms_to_xyz_involution() {
        let tiler = test_tiler(256, true).unwrap();
        for z in 0..8u8 {
            for y in 0..(1i64 << z) {
                assert_eq!(tiler.tms_to_xyz(tiler.tms_to_xyz(y, z), z), y);
            }
        }
    }

    #[test]
    fn test_min_max_coords_ordering_after_clamp() {
        let tiler = test_tiler(256, false).unwrap();
        let shift = 20037508.342789244;
        // A bounding box wider than the world: x gets cropped to the
        // world limits and stays ordered.
        let bounds = BoundingBox::new(
            Projected2D::new(-shift * 1.5, -10000.0),
            Projected2D::new(shift * 1.5, 10000.0),
        );
        for z in 0..12u8 {
            let mm = tiler.min_max_coords_for_z(&bounds, z);
            assert!(mm.min.x <= mm.max.x, "zoom {z}");
            assert!(mm.min.y <= mm.max.y, "zoom {z}");
            assert_eq!(mm.min.x, 0);
            assert_eq!(mm.max.x, (1i64 << z) - 1);
        }
    }

    #[test]
    fn test_min_max_coords_small_raster() {
        let tiler = test_tiler(256, false).unwrap();
        let bounds = BoundingBox::new(
            Projected2D::new(-10000.0, -10000.0),
            Projected2D::new(10000.0, 10000.0),
        );
        // At zoom 11 the raster straddles the pyramid center seam.
        let mm = tiler.min_max_coords_for_z(&bounds, 11);
        assert_eq!(mm.min, TileXY::new(1023, 1023));
        assert_eq!(mm.max, TileXY::new(1024, 1024));
    }
}
