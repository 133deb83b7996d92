//! WebP encoding for tile canvases.
//!
//! Lossless mode: tiles hold rescaled measurement data, and lossy
//! artifacts would show up as false values at tile seams.

use tiles_common::{TilerError, TilerResult};

/// Encode RGBA pixels as a lossless WebP.
pub fn encode_lossless(pixels: &[u8], width: u32, height: u32) -> TilerResult<Vec<u8>> {
    if pixels.len() != (width as usize) * (height as usize) * 4 {
        return Err(TilerError::EncodeFailed(format!(
            "expected {} RGBA bytes, got {}",
            (width as usize) * (height as usize) * 4,
            pixels.len()
        )));
    }

    let encoder = ::webp::Encoder::from_rgba(pixels, width, height);
    let memory = encoder.encode_lossless();
    Ok(memory.to_vec())
}
