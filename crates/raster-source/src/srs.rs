//! Spatial reference identity via normalized PROJ4 strings.
//!
//! The engine never parses WKT or performs datum math; it only needs to
//! answer "is this raster already in the output projection?". Sources
//! carry a PROJ4 string and equality of the normalized form is the
//! same-projection predicate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialRef {
    proj4: String,
}

impl SpatialRef {
    /// Build from a PROJ4 string, normalizing whitespace.
    pub fn from_proj4(proj4: &str) -> Self {
        let normalized = proj4.split_whitespace().collect::<Vec<_>>().join(" ");
        Self { proj4: normalized }
    }

    /// EPSG:3857, the fixed output projection of the tile pyramid.
    pub fn web_mercator() -> Self {
        Self::from_proj4(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 \
             +k=1 +units=m +nadgrids=@null +wgs84=0,0,0 +no_defs",
        )
    }

    /// EPSG:4326 geographic coordinates.
    pub fn wgs84() -> Self {
        Self::from_proj4("+proj=longlat +datum=WGS84 +no_defs")
    }

    pub fn proj4(&self) -> &str {
        &self.proj4
    }

    /// Same-projection comparison over the normalized PROJ4 form.
    pub fn matches(&self, other: &SpatialRef) -> bool {
        self.proj4 == other.proj4
    }
}
