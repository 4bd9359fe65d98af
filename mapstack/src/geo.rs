//! Geographic primitives shared by element geometry, viewport bounds and
//! map click positions.

use std::fmt;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, -90 to 90.
    pub lat: f64,
    /// Longitude in degrees, -180 to 180.
    pub lon: f64,
}

impl LatLon {
    /// Create a new position.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Axis-aligned geographic bounding box.
///
/// Boxes crossing the antimeridian are not supported; `west` must not
/// exceed `east`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Southern edge latitude.
    pub south: f64,
    /// Western edge longitude.
    pub west: f64,
    /// Northern edge latitude.
    pub north: f64,
    /// Eastern edge longitude.
    pub east: f64,
}

impl GeoBounds {
    /// Bounds covering the whole globe.
    pub const WORLD: GeoBounds = GeoBounds {
        south: -90.0,
        west: -180.0,
        north: 90.0,
        east: 180.0,
    };

    /// Create bounds from edges, normalizing swapped edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            west: west.min(east),
            north: south.max(north),
            east: west.max(east),
        }
    }

    /// Smallest bounds enclosing all the given positions.
    ///
    /// Returns `None` for an empty input.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a LatLon>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.lat, first.lon, first.lat, first.lon);
        for p in iter {
            bounds.south = bounds.south.min(p.lat);
            bounds.north = bounds.north.max(p.lat);
            bounds.west = bounds.west.min(p.lon);
            bounds.east = bounds.east.max(p.lon);
        }
        Some(bounds)
    }

    /// Check whether a position lies inside (edges inclusive).
    pub fn contains(&self, p: &LatLon) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }

    /// Check whether two boxes overlap (touching edges count).
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.south <= other.north
            && other.south <= self.north
            && self.west <= other.east
            && other.west <= self.east
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::WORLD
    }
}
