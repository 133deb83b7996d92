//! Tile canvas composition and image encoding.
//!
//! The producer assembles a tile as band planes plus alpha in a
//! [`TileCanvas`], then [`encode`]s it to PNG or WebP bytes.

pub mod canvas;
pub mod png;
pub mod webp;

pub use canvas::TileCanvas;

use serde::{Deserialize, Serialize};
use tiles_common::TilerResult;

/// Output image format for emitted tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    #[default]
    Png,
    Webp,
}

impl TileFormat {
    /// File extension for tile paths.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Webp => "webp",
        }
    }
}

impl std::str::FromStr for TileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(TileFormat::Png),
            "webp" => Ok(TileFormat::Webp),
            other => Err(format!("unsupported tile format: {other}")),
        }
    }
}

/// Encode a canvas to the requested format.
pub fn encode(format: TileFormat, canvas: &TileCanvas) -> TilerResult<Vec<u8>> {
    let rgba = canvas.to_rgba();
    let size = canvas.size() as usize;
    match format {
        TileFormat::Png => png::encode_auto(&rgba, size, size),
        TileFormat::Webp => webp::encode_lossless(&rgba, canvas.size(), canvas.size()),
    }
}
