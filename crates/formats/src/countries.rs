//! Country polygons from a GeoJSON `FeatureCollection`.
//!
//! Parsed once per scene mount and treated as immutable afterwards; the
//! boundary renderer and the hit-test mesh builder share one
//! [`CountryDataset`].

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

/// Identifier Natural Earth uses for "no ISO code assigned".
pub const UNASSIGNED_ISO_A3: &str = "-99";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// A closed ring: the first point is repeated as the last one.
pub type Ring = Vec<GeoPoint>;

/// One exterior boundary plus zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct RingGroup {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl RingGroup {
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Exterior first, then each hole.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(&self.holes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountryShape {
    Polygon(RingGroup),
    MultiPolygon(Vec<RingGroup>),
}

impl CountryShape {
    /// Independently triangulable ring groups (one for a Polygon).
    pub fn ring_groups(&self) -> &[RingGroup] {
        match self {
            CountryShape::Polygon(group) => std::slice::from_ref(group),
            CountryShape::MultiPolygon(groups) => groups,
        }
    }

    pub fn exterior_rings(&self) -> impl Iterator<Item = &Ring> {
        self.ring_groups().iter().map(RingGroup::exterior)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryFeature {
    /// Unique within the dataset; usually the ISO-3166 alpha-3 code.
    pub identifier: String,
    pub display_name: String,
    pub shape: CountryShape,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountryDataset {
    pub features: Vec<CountryFeature>,
    /// Features dropped for null, non-areal or malformed geometry, or a
    /// missing name.
    pub skipped: usize,
}

#[derive(Debug, Error)]
pub enum CountryDatasetError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
}

/// One feature that survived parsing, before identity assignment.
struct ParsedFeature {
    iso: String,
    display_name: String,
    shape: CountryShape,
}

impl CountryDataset {
    pub fn from_geojson_str(payload: &str) -> Result<Self, CountryDatasetError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, CountryDatasetError> {
        let obj = value
            .as_object()
            .ok_or(CountryDatasetError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(CountryDatasetError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(CountryDatasetError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut skipped = 0;

        for (index, feat_val) in features_val.iter().enumerate() {
            let ParsedFeature {
                iso,
                display_name,
                shape,
            } = match parse_feature(feat_val) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => {
                    tracing::debug!(index, "skipping feature without areal geometry");
                    skipped += 1;
                    continue;
                }
                Err(reason) => {
                    tracing::debug!(index, %reason, "skipping invalid feature");
                    skipped += 1;
                    continue;
                }
            };

            let identifier = if iso == UNASSIGNED_ISO_A3 || seen.contains(&iso) {
                format!("{iso}#{index}")
            } else {
                iso
            };
            seen.insert(identifier.clone());

            features.push(CountryFeature {
                identifier,
                display_name,
                shape,
            });
        }

        tracing::info!(features = features.len(), skipped, "country dataset parsed");
        Ok(Self { features, skipped })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&CountryFeature> {
        self.features.iter().find(|f| f.identifier == identifier)
    }
}

/// `Ok(None)` for null geometry or geometry types that carry no area.
fn parse_feature(value: &Value) -> Result<Option<ParsedFeature>, String> {
    let feat_obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;
    match feat_obj.get("type").and_then(Value::as_str) {
        Some("Feature") => {}
        Some(other) => return Err(format!("unexpected feature type: {other}")),
        None => return Err("feature missing type".to_string()),
    }

    let empty = Map::new();
    let properties = feat_obj
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let display_name = properties
        .get("name")
        .and_then(Value::as_str)
        .ok_or("properties.name missing".to_string())?
        .to_string();

    let shape = match feat_obj.get("geometry") {
        None | Some(Value::Null) => return Ok(None),
        Some(geometry) => match parse_geometry(geometry)? {
            Some(shape) => shape,
            None => return Ok(None),
        },
    };

    let iso = properties
        .get("iso_a3")
        .and_then(Value::as_str)
        .unwrap_or(UNASSIGNED_ISO_A3)
        .to_string();

    Ok(Some(ParsedFeature {
        iso,
        display_name,
        shape,
    }))
}

/// `Ok(None)` for geometry types that carry no area.
fn parse_geometry(value: &Value) -> Result<Option<CountryShape>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;

    let coords = || {
        obj.get("coordinates")
            .ok_or("geometry missing coordinates".to_string())
    };

    match ty {
        "Polygon" => match parse_polygon(coords()?)? {
            Some(group) => Ok(Some(CountryShape::Polygon(group))),
            None => Err("Polygon exterior ring is degenerate".to_string()),
        },
        "MultiPolygon" => {
            let polys = coords()?
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut groups = Vec::with_capacity(polys.len());
            for poly in polys {
                match parse_polygon(poly)? {
                    Some(group) => groups.push(group),
                    None => tracing::debug!("dropping degenerate MultiPolygon part"),
                }
            }
            if groups.is_empty() {
                return Err("MultiPolygon has no usable polygons".to_string());
            }
            Ok(Some(CountryShape::MultiPolygon(groups)))
        }
        _ => Ok(None),
    }
}

fn parse_position(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("lon {lon} outside [-180, 180]"));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("lat {lat} outside [-90, 90]"));
    }
    Ok(GeoPoint::new(lon, lat))
}

/// `Ok(None)` for a ring with fewer than 4 positions once closed.
fn parse_ring(coords: &Value) -> Result<Option<Ring>, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?;
    let mut ring = arr
        .iter()
        .map(parse_position)
        .collect::<Result<Vec<_>, _>>()?;

    // Tolerate rings that omit the closing position.
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    if ring.len() < 4 {
        return Ok(None);
    }
    Ok(Some(ring))
}

/// `Ok(None)` when the exterior ring is missing or degenerate. Degenerate
/// holes are dropped.
fn parse_polygon(coords: &Value) -> Result<Option<RingGroup>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    let Some((exterior, holes)) = rings.split_first() else {
        return Ok(None);
    };
    let Some(exterior) = parse_ring(exterior)? else {
        return Ok(None);
    };
    let mut kept = Vec::with_capacity(holes.len());
    for hole in holes {
        match parse_ring(hole)? {
            Some(ring) => kept.push(ring),
            None => tracing::debug!("dropping degenerate hole"),
        }
    }
    Ok(Some(RingGroup::new(exterior, kept)))
}

#[cfg(test)]
mod tests {
    use super::{CountryDataset, CountryDatasetError, CountryShape, GeoPoint, RingGroup};
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = include_str!("../tests/fixtures/countries_small.geojson");

    #[test]
    fn parses_fixture_polygons_and_multipolygons() {
        let ds = CountryDataset::from_geojson_str(FIXTURE).expect("parse dataset");
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.skipped, 2);

        let zaf = ds.get("ZAF").expect("south africa");
        assert_eq!(zaf.display_name, "South Africa");
        let CountryShape::Polygon(group) = &zaf.shape else {
            panic!("expected polygon");
        };
        assert_eq!(group.holes().len(), 1);
        assert_eq!(group.exterior().len(), 5);

        let nzl = ds.get("NZL").expect("new zealand");
        assert_eq!(nzl.shape.ring_groups().len(), 2);
        assert_eq!(nzl.shape.exterior_rings().count(), 2);
    }

    #[test]
    fn unassigned_codes_get_unique_identifiers() {
        let ds = CountryDataset::from_geojson_str(FIXTURE).expect("parse dataset");
        let ids: Vec<&str> = ds.features.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["ZAF", "LSO", "NZL", "-99#3", "-99#4", "FJI"]);
    }

    #[test]
    fn duplicate_codes_are_disambiguated() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"A","iso_a3":"AAA"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type":"Feature","properties":{"name":"A bis","iso_a3":"AAA"},
             "geometry":{"type":"Polygon","coordinates":[[[2,0],[3,0],[3,1],[2,0]]]}}
        ]}"#;
        let ds = CountryDataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.features[0].identifier, "AAA");
        assert_eq!(ds.features[1].identifier, "AAA#1");
    }

    #[test]
    fn open_rings_are_closed() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Open","iso_a3":"OPN"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1]]]}}
        ]}"#;
        let ds = CountryDataset::from_geojson_str(payload).expect("parse");
        let ring = ds.features[0].shape.ring_groups()[0].exterior();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[3], GeoPoint::new(0.0, 0.0));
    }

    #[test]
    fn out_of_range_coordinates_skip_only_that_feature() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Bad","iso_a3":"BAD"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[200,0],[1,1],[0,0]]]}},
            {"type":"Feature","properties":{"name":"Good","iso_a3":"GOD"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}
        ]}"#;
        let ds = CountryDataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.skipped, 1);
        let ids: Vec<&str> = ds.features.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["GOD"]);
    }

    #[test]
    fn degenerate_hole_is_dropped_and_neighbours_survive() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"West","iso_a3":"WST"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[5,0],[5,5],[0,0]]]}},
            {"type":"Feature","properties":{"name":"Middle","iso_a3":"MID"},
             "geometry":{"type":"Polygon","coordinates":[
                [[20,0],[30,0],[30,10],[20,10],[20,0]],
                [[22,2],[23,3],[22,2]]
             ]}},
            {"type":"Feature","properties":{"name":"East","iso_a3":"EST"},
             "geometry":{"type":"Polygon","coordinates":[[[40,0],[45,0],[45,5],[40,0]]]}}
        ]}"#;
        let ds = CountryDataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.skipped, 0);
        let mid = ds.get("MID").expect("middle");
        let group = &mid.shape.ring_groups()[0];
        assert_eq!(group.exterior().len(), 5);
        assert!(group.holes().is_empty());
    }

    #[test]
    fn unnamed_feature_between_good_ones_is_skipped() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"West","iso_a3":"WST"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[5,0],[5,5],[0,0]]]}},
            {"type":"Feature","properties":{"iso_a3":"ANO"},
             "geometry":{"type":"Polygon","coordinates":[[[20,0],[25,0],[25,5],[20,0]]]}},
            {"type":"Feature","properties":{"name":"East","iso_a3":"EST"},
             "geometry":{"type":"Polygon","coordinates":[[[40,0],[45,0],[45,5],[40,0]]]}}
        ]}"#;
        let ds = CountryDataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.skipped, 1);
        let ids: Vec<&str> = ds.features.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["WST", "EST"]);
    }

    #[test]
    fn multipolygon_keeps_its_usable_parts() {
        let payload = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Isles","iso_a3":"ISL"},
             "geometry":{"type":"MultiPolygon","coordinates":[
                [[[0,0],[1,1],[0,0]]],
                [[[10,0],[12,0],[12,2],[10,0]]]
             ]}},
            {"type":"Feature","properties":{"name":"Specks","iso_a3":"SPK"},
             "geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,1],[0,0]]]]}}
        ]}"#;
        let ds = CountryDataset::from_geojson_str(payload).expect("parse");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.skipped, 1);
        let isl = ds.get("ISL").expect("isles");
        assert_eq!(isl.shape.ring_groups().len(), 1);
        assert_eq!(isl.shape.ring_groups()[0].exterior()[0], GeoPoint::new(10.0, 0.0));
    }

    #[test]
    fn ring_group_lists_exterior_before_holes() {
        let square = |o: f64| {
            vec![
                GeoPoint::new(o, o),
                GeoPoint::new(o + 1.0, o),
                GeoPoint::new(o + 1.0, o + 1.0),
                GeoPoint::new(o, o),
            ]
        };
        let bare = RingGroup::new(square(0.0), Vec::new());
        assert!(bare.holes().is_empty());
        assert_eq!(bare.rings().count(), 1);

        let holed = RingGroup::new(square(0.0), vec![square(0.25)]);
        let firsts: Vec<GeoPoint> = holed.rings().map(|r| r[0]).collect();
        assert_eq!(firsts, vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.25, 0.25)]);
    }

    #[test]
    fn rejects_non_collections() {
        assert!(matches!(
            CountryDataset::from_geojson_str(r#"{"type":"Feature"}"#),
            Err(CountryDatasetError::NotAFeatureCollection)
        ));
        assert!(matches!(
            CountryDataset::from_geojson_str("[1,2"),
            Err(CountryDatasetError::Json(_))
        ));
    }
}
