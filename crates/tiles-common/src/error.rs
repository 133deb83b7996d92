//! Error types for the tile engine.

use thiserror::Error;

/// Result type alias using TilerError.
pub type TilerResult<T> = Result<T, TilerError>;

/// Primary error type for tile generation.
#[derive(Debug, Error)]
pub enum TilerError {
    // === Configuration errors (fatal at construction) ===
    #[error("Tile size must be a power of 2 greater than 0, got {0}")]
    InvalidTileSize(u32),

    #[error("{0} does not exist")]
    InputNotFound(String),

    #[error("Invalid geotransform: pixel size is zero")]
    DegenerateGeotransform,

    // === Georeferencing errors (fatal at construction) ===
    #[error("No projection found in {0}")]
    MissingProjection(String),

    #[error("{0} is not georeferenced")]
    NotGeoreferenced(String),

    #[error("Reprojection is not supported by this raster source")]
    ReprojectionUnsupported,

    // === Per-tile errors (do not affect producer state) ===
    #[error("Tile ({x}, {y}) out of bounds at zoom {z}")]
    TileOutOfBounds { z: u8, x: i64, y: i64 },

    #[error("Tile does not intersect the raster")]
    NoIntersection,

    #[error("Cannot scale values due to source min/max being equal")]
    DegenerateRange,

    // === Collaborator / I/O errors ===
    #[error("Cannot open {0}")]
    OpenFailed(String),

    #[error("No raster bands found in {0}")]
    NoBands(String),

    #[error("Cannot read raster window: {0}")]
    ReadFailed(String),

    #[error("Cannot compute statistics for band {0}")]
    Statistics(usize),

    #[error("Cannot encode tile: {0}")]
    EncodeFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TilerError {
    /// Whether a `tile()` caller may treat this error as "skip this tile"
    /// in a batch rather than aborting.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            TilerError::TileOutOfBounds { .. } | TilerError::NoIntersection
        )
    }
}
