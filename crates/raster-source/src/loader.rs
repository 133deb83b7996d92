//! Image-file raster loader.
//!
//! Opens PNG/JPEG/TIFF rasters with the `image` crate and georeferences
//! them from an ESRI world-file sidecar (`.pgw`/`.jgw`/`.tfw`/`.wld`).
//! A `.prj` sidecar holding a PROJ4 string supplies the spatial
//! reference; without one the raster is assumed to already be in web
//! mercator, since this crate performs no reprojection.

use std::fs;
use std::path::Path;

use image::DynamicImage;
use tiles_common::{TilerError, TilerResult};
use tracing::debug;

use crate::geotransform::Geotransform;
use crate::memory::MemoryRaster;
use crate::srs::SpatialRef;
use crate::types::{ColorInterpretation, SampleBuffer};

/// World-file extensions probed next to the image, most specific first.
fn world_file_extensions(image_ext: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    match image_ext.to_ascii_lowercase().as_str() {
        "png" => candidates.push("pgw".to_string()),
        "jpg" | "jpeg" => candidates.push("jgw".to_string()),
        "tif" | "tiff" => candidates.push("tfw".to_string()),
        _ => {}
    }
    candidates.push("wld".to_string());
    candidates
}

fn read_sidecar(path: &Path, extensions: &[String]) -> Option<String> {
    for ext in extensions {
        let sidecar = path.with_extension(ext);
        if let Ok(contents) = fs::read_to_string(&sidecar) {
            debug!(sidecar = %sidecar.display(), "loaded sidecar");
            return Some(contents);
        }
    }
    None
}

/// Split interleaved 8-bit channels into per-band planes.
fn planes_u8(samples: &[u8], channels: usize) -> Vec<Vec<u8>> {
    let mut planes: Vec<Vec<u8>> = (0..channels)
        .map(|_| Vec::with_capacity(samples.len() / channels))
        .collect();
    for pixel in samples.chunks_exact(channels) {
        for (c, &s) in pixel.iter().enumerate() {
            planes[c].push(s);
        }
    }
    planes
}

/// Split interleaved 16-bit channels into per-band planes.
fn planes_u16(samples: &[u16], channels: usize) -> Vec<Vec<u16>> {
    let mut planes: Vec<Vec<u16>> = (0..channels)
        .map(|_| Vec::with_capacity(samples.len() / channels))
        .collect();
    for pixel in samples.chunks_exact(channels) {
        for (c, &s) in pixel.iter().enumerate() {
            planes[c].push(s);
        }
    }
    planes
}

fn interpretations(channels: usize) -> Vec<ColorInterpretation> {
    match channels {
        1 => vec![ColorInterpretation::Gray],
        2 => vec![ColorInterpretation::Gray, ColorInterpretation::Alpha],
        3 => vec![
            ColorInterpretation::Red,
            ColorInterpretation::Green,
            ColorInterpretation::Blue,
        ],
        _ => vec![
            ColorInterpretation::Red,
            ColorInterpretation::Green,
            ColorInterpretation::Blue,
            ColorInterpretation::Alpha,
        ],
    }
}

/// Open an image file as a georeferenced raster source.
pub fn open_image_raster(path: &Path) -> TilerResult<MemoryRaster> {
    let img = image::open(path)
        .map_err(|e| TilerError::OpenFailed(format!("{}: {e}", path.display())))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let (width, height) = (img.width() as usize, img.height() as usize);
    let mut raster = MemoryRaster::new(width, height);

    // Band planes in the native bit depth; anything exotic falls back to
    // 8-bit RGBA.
    let (planes, interps): (Vec<SampleBuffer>, Vec<ColorInterpretation>) = match img {
        DynamicImage::ImageLuma8(buf) => (
            planes_u8(buf.as_raw(), 1).into_iter().map(SampleBuffer::U8).collect(),
            interpretations(1),
        ),
        DynamicImage::ImageLumaA8(buf) => (
            planes_u8(buf.as_raw(), 2).into_iter().map(SampleBuffer::U8).collect(),
            interpretations(2),
        ),
        DynamicImage::ImageRgb8(buf) => (
            planes_u8(buf.as_raw(), 3).into_iter().map(SampleBuffer::U8).collect(),
            interpretations(3),
        ),
        DynamicImage::ImageRgba8(buf) => (
            planes_u8(buf.as_raw(), 4).into_iter().map(SampleBuffer::U8).collect(),
            interpretations(4),
        ),
        DynamicImage::ImageLuma16(buf) => (
            planes_u16(buf.as_raw(), 1).into_iter().map(SampleBuffer::U16).collect(),
            interpretations(1),
        ),
        DynamicImage::ImageLumaA16(buf) => (
            planes_u16(buf.as_raw(), 2).into_iter().map(SampleBuffer::U16).collect(),
            interpretations(2),
        ),
        DynamicImage::ImageRgb16(buf) => (
            planes_u16(buf.as_raw(), 3).into_iter().map(SampleBuffer::U16).collect(),
            interpretations(3),
        ),
        DynamicImage::ImageRgba16(buf) => (
            planes_u16(buf.as_raw(), 4).into_iter().map(SampleBuffer::U16).collect(),
            interpretations(4),
        ),
        other => {
            let buf = other.to_rgba8();
            (
                planes_u8(buf.as_raw(), 4).into_iter().map(SampleBuffer::U8).collect(),
                interpretations(4),
            )
        }
    };

    let has_alpha = interps.contains(&ColorInterpretation::Alpha);
    for (plane, interp) in planes.into_iter().zip(interps) {
        raster = raster.with_band(plane, interp);
    }
    raster = raster.with_mask_is_alpha(has_alpha);

    if let Some(contents) = read_sidecar(path, &world_file_extensions(ext)) {
        raster = raster.with_geotransform(Geotransform::from_world_file(&contents)?);
    }

    let srs = match read_sidecar(path, &["prj".to_string()]) {
        Some(contents) => SpatialRef::from_proj4(contents.trim()),
        None => SpatialRef::web_mercator(),
    };

    Ok(raster.with_spatial_ref(srs))
}
