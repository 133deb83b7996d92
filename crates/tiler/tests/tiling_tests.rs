//! End-to-end tile generation against in-memory rasters.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use mercator::GlobalMercator;
use raster_source::{
    ColorInterpretation, Geotransform, MemoryRaster, RasterSource, SampleBuffer, SpatialRef,
};
use tile_image::TileFormat;
use tiler::{RasterTiler, TileOptions};
use tiles_common::TilerError;

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.mem");
    fs::write(&input, b"in-memory raster placeholder").unwrap();
    let output = dir.path().join("tiles");
    Fixture {
        input,
        output,
        _dir: dir,
    }
}

/// A 256x256 raster whose extent equals tile (520, 600) at zoom 10.
fn tile_aligned_geotransform() -> Geotransform {
    let mercator = GlobalMercator::new(256);
    let b = mercator.tile_bounds(520, 600, 10);
    let res = mercator.resolution(10);
    Geotransform::new([b.min.x, res, 0.0, b.max.y, 0.0, -res])
}

fn gray_gradient_raster() -> MemoryRaster {
    // Pixel value is its column index.
    let plane: Vec<u8> = (0..256 * 256).map(|i| (i % 256) as u8).collect();
    MemoryRaster::new(256, 256)
        .with_geotransform(tile_aligned_geotransform())
        .with_spatial_ref(SpatialRef::web_mercator())
        .with_band(SampleBuffer::U8(plane), ColorInterpretation::Gray)
}

fn producer(raster: MemoryRaster, fx: &Fixture, options: TileOptions) -> RasterTiler {
    RasterTiler::new(Box::new(raster), &fx.input, &fx.output, options).unwrap()
}

#[test]
fn test_aligned_raster_fills_full_canvas() {
    let fx = fixture();
    let tiler = producer(gray_gradient_raster(), &fx, TileOptions::default());

    // The raster's native resolution pins both ends of the zoom range.
    assert_eq!(tiler.min_zoom(), 10);
    assert_eq!(tiler.max_zoom(), 10);

    let path = tiler.tile(10, 520, 600).unwrap();
    assert!(path.ends_with("10/520/600.png"));

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (256, 256));

    // Gray replicated across RGB, fully opaque everywhere.
    for &(x, y) in &[(0u32, 0u32), (17, 3), (255, 255), (128, 64)] {
        let p = decoded.get_pixel(x, y).0;
        let v = x as u8;
        assert_eq!(p, [v, v, v, 255], "pixel ({x}, {y})");
    }
}

#[test]
fn test_index_past_max_is_out_of_bounds() {
    let fx = fixture();
    let tiler = producer(gray_gradient_raster(), &fx, TileOptions::default());

    let mm = tiler.min_max_coords_for_z(10);
    let err = tiler.tile(10, mm.max.x + 1, 600).unwrap_err();
    assert!(matches!(err, TilerError::TileOutOfBounds { .. }));
    assert!(err.is_skippable());

    // The failed call left no tile file behind.
    let path = fx.output.join("10").join((mm.max.x + 1).to_string());
    assert!(fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true));
}

#[test]
fn test_in_range_index_without_pixels_is_no_intersection() {
    let fx = fixture();
    let tiler = producer(gray_gradient_raster(), &fx, TileOptions::default());

    // Row 599 is inside the index range (the raster's south edge maps
    // onto the row seam) but its footprint holds no raster pixels.
    let mm = tiler.min_max_coords_for_z(10);
    assert!(mm.contains(520, 599));
    let err = tiler.tile(10, 520, 599).unwrap_err();
    assert!(matches!(err, TilerError::NoIntersection));
}

#[test]
fn test_u16_raster_rescales_and_caches_statistics() {
    let fx = fixture();
    // Full u16 ramp: row-major index as the sample value.
    let plane: Vec<u16> = (0..256u32 * 256).map(|i| i as u16).collect();
    let raster = Arc::new(
        MemoryRaster::new(256, 256)
            .with_geotransform(tile_aligned_geotransform())
            .with_spatial_ref(SpatialRef::web_mercator())
            .with_band(SampleBuffer::U16(plane), ColorInterpretation::Gray),
    );

    let tiler = RasterTiler::new(
        Box::new(raster.clone()),
        &fx.input,
        &fx.output,
        TileOptions::default(),
    )
    .unwrap();

    let path = tiler.tile(10, 520, 600).unwrap();
    let decoded = image::open(&path).unwrap().to_rgba8();

    // Rescaled against the global 0..65535 range.
    assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert_eq!(decoded.get_pixel(255, 255).0, [255, 255, 255, 255]);

    // The forced statistics computation was written back to the cache.
    let cached = raster.band_statistics(0, false).unwrap().unwrap();
    assert_eq!(cached.min, 0.0);
    assert_eq!(cached.max, 65535.0);
}

#[test]
fn test_rgba_raster_carries_explicit_alpha() {
    let fx = fixture();
    let pixels = 256 * 256;
    let raster = MemoryRaster::new(256, 256)
        .with_geotransform(tile_aligned_geotransform())
        .with_spatial_ref(SpatialRef::web_mercator())
        .with_mask_is_alpha(true)
        .with_band(SampleBuffer::U8(vec![10; pixels]), ColorInterpretation::Red)
        .with_band(SampleBuffer::U8(vec![20; pixels]), ColorInterpretation::Green)
        .with_band(SampleBuffer::U8(vec![30; pixels]), ColorInterpretation::Blue)
        .with_band(SampleBuffer::U8(vec![128; pixels]), ColorInterpretation::Alpha);

    let tiler = producer(raster, &fx, TileOptions::default());
    assert_eq!(tiler.data_bands(), 3);

    let path = tiler.tile(10, 520, 600).unwrap();
    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(40, 200).0, [10, 20, 30, 128]);
}

#[test]
fn test_symmetric_raster_tiles_at_derived_zoom() {
    let fx = fixture();
    // Projected bounds -10000..10000 on both axes, 256x256 pixels:
    // pixel size 78.125 m selects zoom 11 for both ends of the range.
    let plane: Vec<u8> = (0..256 * 256).map(|i| (i % 251) as u8).collect();
    let raster = MemoryRaster::new(256, 256)
        .with_geotransform(Geotransform::new([
            -10000.0, 78.125, 0.0, 10000.0, 0.0, -78.125,
        ]))
        .with_spatial_ref(SpatialRef::web_mercator())
        .with_band(SampleBuffer::U8(plane), ColorInterpretation::Gray);

    let tiler = producer(raster, &fx, TileOptions::default());
    assert_eq!(tiler.min_zoom(), 11);
    assert_eq!(tiler.max_zoom(), 11);

    // The raster straddles the pyramid center: a 2x2 block of tiles.
    let mm = tiler.min_max_coords_for_z(11);
    assert_eq!((mm.min.x, mm.max.x), (1023, 1024));
    assert_eq!((mm.min.y, mm.max.y), (1023, 1024));

    for x in mm.min.x..=mm.max.x {
        for y in mm.min.y..=mm.max.y {
            let path = tiler.tile(11, x, y).unwrap();
            assert!(path.exists(), "tile {x},{y}");
            assert!(fs::metadata(&path).unwrap().len() > 0);
        }
    }

    // One step past the range fails cleanly instead of corrupting output.
    assert!(matches!(
        tiler.tile(11, mm.max.x + 1, mm.min.y),
        Err(TilerError::TileOutOfBounds { .. })
    ));
}

#[test]
fn test_tms_flag_flips_requested_rows() {
    let fx = fixture();
    let options = TileOptions {
        tms: true,
        ..TileOptions::default()
    };
    let tiler = producer(gray_gradient_raster(), &fx, options);

    // Under TMS the caller addresses the aligned tile as row
    // 2^10 - 1 - 600 = 423; the unflipped row is now out of range.
    let path = tiler.tile(10, 520, 423).unwrap();
    assert!(path.ends_with("10/520/423.png"));
    assert!(matches!(
        tiler.tile(10, 520, 600),
        Err(TilerError::TileOutOfBounds { .. })
    ));
}

#[test]
fn test_webp_output() {
    let fx = fixture();
    let options = TileOptions {
        format: TileFormat::Webp,
        ..TileOptions::default()
    };
    let tiler = producer(gray_gradient_raster(), &fx, options);

    let path = tiler.tile(10, 520, 600).unwrap();
    assert!(path.ends_with("10/520/600.webp"));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[test]
fn test_construction_failures() {
    let fx = fixture();

    // No bands.
    let empty = MemoryRaster::new(4, 4)
        .with_geotransform(tile_aligned_geotransform())
        .with_spatial_ref(SpatialRef::web_mercator());
    assert!(matches!(
        RasterTiler::new(Box::new(empty), &fx.input, &fx.output, TileOptions::default()),
        Err(TilerError::NoBands(_))
    ));

    // No spatial reference anywhere.
    let unprojected = MemoryRaster::new(4, 4)
        .with_geotransform(tile_aligned_geotransform())
        .with_band(SampleBuffer::U8(vec![0; 16]), ColorInterpretation::Gray);
    assert!(matches!(
        RasterTiler::new(
            Box::new(unprojected),
            &fx.input,
            &fx.output,
            TileOptions::default()
        ),
        Err(TilerError::MissingProjection(_))
    ));

    // Identity geotransform and no ground control points.
    let ungeoreferenced = MemoryRaster::new(4, 4)
        .with_spatial_ref(SpatialRef::web_mercator())
        .with_band(SampleBuffer::U8(vec![0; 16]), ColorInterpretation::Gray);
    assert!(matches!(
        RasterTiler::new(
            Box::new(ungeoreferenced),
            &fx.input,
            &fx.output,
            TileOptions::default()
        ),
        Err(TilerError::NotGeoreferenced(_))
    ));

    // Zero pixel size.
    let degenerate = MemoryRaster::new(4, 4)
        .with_geotransform(Geotransform::new([0.0, 0.0, 0.0, 100.0, 0.0, 0.0]))
        .with_spatial_ref(SpatialRef::web_mercator())
        .with_band(SampleBuffer::U8(vec![0; 16]), ColorInterpretation::Gray);
    assert!(matches!(
        RasterTiler::new(
            Box::new(degenerate),
            &fx.input,
            &fx.output,
            TileOptions::default()
        ),
        Err(TilerError::DegenerateGeotransform)
    ));

    // A source that cannot produce the reprojected view it would need.
    let wgs84 = MemoryRaster::new(4, 4)
        .with_geotransform(Geotransform::new([0.0, 0.001, 0.0, 1.0, 0.0, -0.001]))
        .with_spatial_ref(SpatialRef::wgs84())
        .with_band(SampleBuffer::U8(vec![0; 16]), ColorInterpretation::Gray);
    assert!(matches!(
        RasterTiler::new(Box::new(wgs84), &fx.input, &fx.output, TileOptions::default()),
        Err(TilerError::ReprojectionUnsupported)
    ));

    // Bad tile size.
    let raster = gray_gradient_raster();
    let options = TileOptions {
        tile_size: 300,
        ..TileOptions::default()
    };
    assert!(matches!(
        RasterTiler::new(Box::new(raster), &fx.input, &fx.output, options),
        Err(TilerError::InvalidTileSize(300))
    ));
}

#[test]
fn test_small_raster_inside_one_tile_reads_whole_source() {
    let fx = fixture();
    let mercator = GlobalMercator::new(256);

    // A 64x64 raster occupying the central quarter of tile (20, 9) at
    // zoom 5: the source window covers the entire raster and lands at an
    // interior canvas offset.
    let b = mercator.tile_bounds(20, 9, 5);
    let res = mercator.resolution(5);
    let origin_x = b.min.x + 96.0 * res;
    let origin_y = b.max.y - 96.0 * res;
    let raster = MemoryRaster::new(64, 64)
        .with_geotransform(Geotransform::new([origin_x, res, 0.0, origin_y, 0.0, -res]))
        .with_spatial_ref(SpatialRef::web_mercator())
        .with_band(SampleBuffer::U8(vec![200; 64 * 64]), ColorInterpretation::Gray);

    let tiler = producer(raster, &fx, TileOptions::default());
    let path = tiler.tile(5, 20, 9).unwrap();
    let decoded = image::open(&path).unwrap().to_rgba8();

    // Inside the raster's footprint: data, opaque.
    assert_eq!(decoded.get_pixel(128, 128).0, [200, 200, 200, 255]);
    // Outside it: transparent padding, not stretched data.
    assert_eq!(decoded.get_pixel(10, 10).0, [0, 0, 0, 0]);
    assert_eq!(decoded.get_pixel(250, 250).0, [0, 0, 0, 0]);
}
