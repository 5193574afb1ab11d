//! Wire models for the statistics API responses.

use crate::page::SubjectPageConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Fulfillment result: the detected place plus the page layout to render.
/// The place block uses snake_case, the config is proto-JSON.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NlResponse {
    pub place: NlPlace,
    pub config: SubjectPageConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NlPlace {
    pub dcid: String,
    pub name: String,
    pub place_type: String,
}

/// Latest observation per variable per entity.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PointResponse {
    pub data: HashMap<String, HashMap<String, Observation>>,
    pub facets: HashMap<String, Facet>,
}

/// A single observation. `value` is absent when the entity has no data
/// for the variable; upstream still emits an empty object entry.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Observation {
    pub date: String,
    pub value: Option<f64>,
    pub facet: String,
}

/// Full observation series per variable per entity.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SeriesResponse {
    pub data: HashMap<String, HashMap<String, SeriesObservation>>,
    pub facets: HashMap<String, Facet>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SeriesObservation {
    pub series: Vec<DateValue>,
    pub facet: String,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct DateValue {
    pub date: String,
    pub value: f64,
}

/// Provenance record referenced by observations through their facet id.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Facet {
    pub import_name: String,
    pub provenance_url: String,
    pub unit: String,
}

/// GeoJSON feature collection for the children of a place.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeoJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<GeoFeature>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeoFeature {
    pub properties: GeoProperties,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GeoProperties {
    pub name: String,
    pub geo_dcid: String,
}

/// Polygon or MultiPolygon geometry. Coordinates stay untyped until
/// [`Geometry::rings`] flattens them, so unexpected geometry kinds degrade
/// to an empty outline instead of failing the whole response.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: serde_json::Value,
}

impl Geometry {
    /// All rings as lon/lat point lists. The first ring of a polygon is
    /// its outer boundary, later rings are holes.
    pub fn rings(&self) -> Vec<Vec<(f64, f64)>> {
        match self.kind.as_str() {
            "Polygon" => polygon_rings(&self.coordinates),
            "MultiPolygon" => self
                .coordinates
                .as_array()
                .map(|polygons| polygons.iter().flat_map(polygon_rings).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

fn polygon_rings(coordinates: &serde_json::Value) -> Vec<Vec<(f64, f64)>> {
    let Some(rings) = coordinates.as_array() else {
        return Vec::new();
    };
    rings
        .iter()
        .map(|ring| {
            ring.as_array()
                .map(|points| points.iter().filter_map(lon_lat).collect())
                .unwrap_or_default()
        })
        .filter(|ring: &Vec<(f64, f64)>| !ring.is_empty())
        .collect()
}

fn lon_lat(point: &serde_json::Value) -> Option<(f64, f64)> {
    let coords = point.as_array()?;
    Some((coords.first()?.as_f64()?, coords.get(1)?.as_f64()?))
}

/// Disaster events with their geo coordinates.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EventResponse {
    pub event_collection: EventCollection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EventCollection {
    pub events: Vec<DisasterEvent>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DisasterEvent {
    pub dcid: String,
    pub name: String,
    pub geo_locations: Vec<GeoLocation>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeoLocation {
    pub point: GeoPoint,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}
