//! Layer manifest format.
//!
//! A manifest is an INI file. The general section may carry a `name`; every
//! named section is one layer:
//!
//! ```ini
//! name = Portland outdoors
//!
//! [trails]
//! title = Hiking trails
//! icon = hiker.png
//! info = Maintained by the parks department
//! point = 45.52,-122.68 | Trailhead
//! path = 45.52,-122.68 45.53,-122.70 45.55,-122.71
//! polygon = 45.50,-122.70 45.50,-122.60 45.56,-122.65
//! tiles = https://tiles.example.com/{z}/{x}/{y}.png
//! ```
//!
//! Element keys may repeat and keep their order. Coordinates are
//! `lat,lon` pairs separated by whitespace; a `| label` suffix names the
//! element.

use ini::Ini;
use mapstack::geo::LatLon;
use mapstack::layer::{ElementSpec, Geometry};

/// One layer section of a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestLayer {
    pub name: String,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub info: Option<String>,
    pub elements: Vec<ElementSpec>,
}

/// Parsed manifest file.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,
    pub layers: Vec<ManifestLayer>,
}

impl Manifest {
    /// Parse manifest text. `fallback_name` is used when no `name` is set.
    pub fn parse(text: &str, fallback_name: &str) -> Result<Self, String> {
        let ini = Ini::load_from_str(text).map_err(|e| e.to_string())?;

        let name = ini
            .general_section()
            .get("name")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(fallback_name)
            .to_string();

        let mut layers = Vec::new();
        for (section, props) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            let mut layer = ManifestLayer {
                name: section.to_string(),
                title: None,
                icon: None,
                info: None,
                elements: Vec::new(),
            };
            for (key, value) in props.iter() {
                let value = value.trim();
                match key {
                    "title" => layer.title = Some(value.to_string()),
                    "icon" => layer.icon = Some(value.to_string()),
                    "info" => layer.info = Some(value.to_string()),
                    "point" | "path" | "polygon" | "tiles" => {
                        let id = format!("{}-{}", section, layer.elements.len());
                        let element = parse_element(&id, key, value)
                            .map_err(|e| format!("layer '{}': {} '{}': {}", section, key, value, e))?;
                        layer.elements.push(element);
                    }
                    other => {
                        return Err(format!("layer '{}': unknown key '{}'", section, other));
                    }
                }
            }
            layers.push(layer);
        }

        Ok(Self { name, layers })
    }

    pub fn layer(&self, name: &str) -> Option<&ManifestLayer> {
        self.layers.iter().find(|l| l.name == name)
    }
}

fn parse_element(id: &str, key: &str, value: &str) -> Result<ElementSpec, String> {
    let (body, label) = match value.split_once('|') {
        Some((body, label)) => (body.trim(), Some(label.trim())),
        None => (value, None),
    };

    let geometry = match key {
        "tiles" => {
            if body.is_empty() {
                return Err("missing url template".to_string());
            }
            Geometry::Tiles {
                url_template: body.to_string(),
            }
        }
        "point" => {
            let points = parse_points(body)?;
            let [point] = points.as_slice() else {
                return Err("expected exactly one coordinate".to_string());
            };
            Geometry::Point(*point)
        }
        "path" => {
            let points = parse_points(body)?;
            if points.len() < 2 {
                return Err("a path needs at least 2 coordinates".to_string());
            }
            Geometry::Path(points)
        }
        _ => {
            let points = parse_points(body)?;
            if points.len() < 3 {
                return Err("a polygon needs at least 3 coordinates".to_string());
            }
            Geometry::Polygon(points)
        }
    };

    let element = ElementSpec::new(id, geometry);
    Ok(match label.filter(|l| !l.is_empty()) {
        Some(label) => element.with_label(label),
        None => element,
    })
}

fn parse_points(body: &str) -> Result<Vec<LatLon>, String> {
    body.split_whitespace().map(parse_lat_lon).collect()
}

/// Parse a `lat,lon` pair in degrees.
pub fn parse_lat_lon(s: &str) -> Result<LatLon, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("'{}' is not a lat,lon pair", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {} out of range", lon));
    }
    Ok(LatLon::new(lat, lon))
}
