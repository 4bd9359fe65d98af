//! Provider-supplied layer adapters and the element specifications they
//! produce.

use crate::geo::{GeoBounds, LatLon};

use super::PrimitiveHandle;

/// Kind of visual primitive an element is drawn as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Marker,
    Polyline,
    Polygon,
    TileOverlay,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 4] = [
        PrimitiveKind::Marker,
        PrimitiveKind::Polyline,
        PrimitiveKind::Polygon,
        PrimitiveKind::TileOverlay,
    ];
}

/// Shape of a map element.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single point, drawn as a marker.
    Point(LatLon),
    /// An open path.
    Path(Vec<LatLon>),
    /// A closed ring.
    Polygon(Vec<LatLon>),
    /// A raster tile overlay; `url_template` uses `{z}/{x}/{y}` placeholders.
    Tiles { url_template: String },
}

impl Geometry {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Point(_) => PrimitiveKind::Marker,
            Self::Path(_) => PrimitiveKind::Polyline,
            Self::Polygon(_) => PrimitiveKind::Polygon,
            Self::Tiles { .. } => PrimitiveKind::TileOverlay,
        }
    }

    /// Bounding box of the geometry. Tile overlays cover everything.
    pub fn bounds(&self) -> Option<GeoBounds> {
        match self {
            Self::Point(p) => GeoBounds::enclosing(std::iter::once(p)),
            Self::Path(points) | Self::Polygon(points) => GeoBounds::enclosing(points),
            Self::Tiles { .. } => Some(GeoBounds::WORLD),
        }
    }
}

/// One visual element produced by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    /// Logical id, unique within the layer.
    pub id: String,
    pub geometry: Geometry,
    pub label: Option<String>,
}

impl ElementSpec {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.geometry.kind()
    }
}

/// One-shot, finite stream of element specifications.
pub type ElementStream = Box<dyn Iterator<Item = ElementSpec> + Send>;

/// Live element source for one realized layer.
///
/// Adapters are created by a provider on a background worker. The element
/// stream is drained on that worker; every other method is called on the
/// owner of the layer manager.
pub trait LayerAdapter: Send {
    /// Elements intersecting `bounds`. Called once per build.
    fn elements_in_bounds(&mut self, bounds: GeoBounds) -> ElementStream;

    /// A primitive was created on the surface for `spec`.
    fn on_element_added(&mut self, _spec: &ElementSpec, _handle: PrimitiveHandle) {}

    /// A primitive owned by this layer was clicked. Returns a description
    /// to show the user, if any.
    fn on_click(&mut self, handle: PrimitiveHandle) -> Option<String>;

    /// The map was clicked at `position`.
    fn on_map_click(&mut self, _position: LatLon) -> Option<String> {
        None
    }

    /// Release anything held by the adapter.
    fn dispose(&mut self) {}
}
