//! Common types shared across the tile engine crates.

pub mod bbox;
pub mod error;
pub mod geo;
pub mod window;

pub use bbox::{BoundingBox, Coord2};
pub use error::{TilerError, TilerResult};
pub use geo::{deg2rad, rad2deg, Geographic2D, Projected2D, TileXY};
pub use window::PixelWindow;
