//! Affine geotransform: pixel/line coordinates to projected coordinates.

use serde::{Deserialize, Serialize};
use tiles_common::{TilerError, TilerResult};

/// The six GDAL-ordered affine coefficients:
///
/// ```text
/// x = gt[0] + px * gt[1] + py * gt[2]
/// y = gt[3] + px * gt[4] + py * gt[5]
/// ```
///
/// `gt[5]` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geotransform(pub [f64; 6]);

impl Geotransform {
    /// The identity transform GDAL reports for non-georeferenced rasters.
    pub const IDENTITY: Geotransform = Geotransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    pub fn new(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// Map pixel/line coordinates to projected coordinates.
    pub fn apply(&self, px: f64, py: f64) -> (f64, f64) {
        let g = &self.0;
        (
            g[0] + px * g[1] + py * g[2],
            g[3] + px * g[4] + py * g[5],
        )
    }

    /// Whether this is the identity-like transform of an ungeoreferenced
    /// raster.
    pub fn is_identity(&self) -> bool {
        self.0 == Self::IDENTITY.0
    }

    /// Whether either pixel dimension is too close to zero to tile.
    pub fn has_degenerate_pixel_size(&self) -> bool {
        self.0[1].abs() < f64::EPSILON || self.0[5].abs() < f64::EPSILON
    }

    /// Parse an ESRI world file (six lines: A, D, B, E, C, F).
    ///
    /// World files anchor C/F at the *center* of the top-left pixel; the
    /// geotransform origin is the pixel's outer corner, so the anchor is
    /// shifted back by half a pixel on both axes.
    pub fn from_world_file(contents: &str) -> TilerResult<Self> {
        let values: Vec<f64> = contents
            .split_whitespace()
            .map(|line| {
                line.parse::<f64>().map_err(|_| {
                    TilerError::OpenFailed(format!("invalid world file value: {line}"))
                })
            })
            .collect::<TilerResult<_>>()?;

        if values.len() != 6 {
            return Err(TilerError::OpenFailed(format!(
                "world file must contain 6 values, found {}",
                values.len()
            )));
        }

        let (a, d, b, e, c, f) = (
            values[0], values[1], values[2], values[3], values[4], values[5],
        );
        Ok(Self([
            c - a / 2.0 - b / 2.0,
            a,
            b,
            f - d / 2.0 - e / 2.0,
            d,
            e,
        ]))
    }
}
