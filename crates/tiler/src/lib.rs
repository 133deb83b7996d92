//! Map-tile generation engine.
//!
//! Turns a georeferenced raster into a pyramid of fixed-size image tiles
//! addressed by `(zoom, x, y)` in the web-mercator tiling scheme. The
//! raster is reached only through the `raster-source` collaborator; this
//! crate owns the tile addressing, the windowing of a tile's footprint
//! onto source pixels, the numeric rescale to 8-bit, and the composition
//! of the output canvas.

pub mod grid;
pub mod producer;
pub mod query;
pub mod rescale;
pub mod summary;

pub use grid::Tiler;
pub use producer::{RasterTiler, TileOptions};
pub use query::{geo_query, GeoQuery};
pub use summary::RasterSummary;
