//! Numeric rescale of native samples to 8-bit output.
//!
//! One generic function over the closed set of sample kinds, selected
//! once per tile from the raster's sample type. Samples are clamped to
//! the band range and mapped linearly onto 0..=255.

use num_traits::ToPrimitive;
use raster_source::SampleBuffer;
use tiles_common::{TilerError, TilerResult};

/// Widening applied when the band min equals the band max, so a
/// single-valued raster still divides cleanly.
const RANGE_NUDGE: f64 = 0.1;

/// Rescale a band-sequential buffer into bytes using one global range.
pub fn rescale_to_bytes(
    buffer: &SampleBuffer,
    band_min: f64,
    band_max: f64,
) -> TilerResult<Vec<u8>> {
    match buffer {
        SampleBuffer::U8(v) => rescale(v, band_min, band_max),
        SampleBuffer::U16(v) => rescale(v, band_min, band_max),
        SampleBuffer::I16(v) => rescale(v, band_min, band_max),
        SampleBuffer::U32(v) => rescale(v, band_min, band_max),
        SampleBuffer::I32(v) => rescale(v, band_min, band_max),
        SampleBuffer::F32(v) => rescale(v, band_min, band_max),
        SampleBuffer::F64(v) => rescale(v, band_min, band_max),
    }
}

fn rescale<T: ToPrimitive + Copy>(
    samples: &[T],
    band_min: f64,
    mut band_max: f64,
) -> TilerResult<Vec<u8>> {
    if band_min == band_max {
        band_max += RANGE_NUDGE;
    }
    // The nudge can be absorbed for very large magnitudes.
    if band_min == band_max {
        return Err(TilerError::DegenerateRange);
    }

    let delta = band_max - band_min;
    Ok(samples
        .iter()
        .map(|s| {
            let v = s.to_f64().unwrap_or(band_min).clamp(band_min, band_max);
            (255.0 * (v - band_min) / delta) as u8
        })
        .collect())
}
