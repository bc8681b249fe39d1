//! Per-country hit-test meshes.
//!
//! Each ring group is triangulated in flat (lon, lat) space with its holes,
//! then every vertex is projected onto the globe at its nominal radius.

use earcutr::earcut;
use formats::countries::{CountryDataset, CountryFeature, GeoPoint, RingGroup};
use foundation::bounds::Aabb2;
use foundation::math::{Vec3, project};

#[derive(Debug, Clone, PartialEq)]
pub struct CountryMesh {
    pub identifier: String,
    pub display_name: String,
    pub positions: Vec<Vec3>,
    /// Source `[lon, lat]` of each position, for geographic hit tests.
    pub lon_lat: Vec<[f64; 2]>,
    pub normals: Vec<Vec3>,
    /// Triangle list, wound counter-clockwise seen from outside the globe.
    pub indices: Vec<u32>,
    /// Extent in `[lon, lat]`.
    pub geo_bounds: Aabb2,
}

impl CountryMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        let t = &self.indices[i * 3..i * 3 + 3];
        [
            self.positions[t[0] as usize],
            self.positions[t[1] as usize],
            self.positions[t[2] as usize],
        ]
    }

    pub fn triangle_lon_lat(&self, i: usize) -> [[f64; 2]; 3] {
        let t = &self.indices[i * 3..i * 3 + 3];
        [
            self.lon_lat[t[0] as usize],
            self.lon_lat[t[1] as usize],
            self.lon_lat[t[2] as usize],
        ]
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangle_count()).map(|i| self.triangle(i))
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

fn drop_closing_duplicate(points: &mut Vec<GeoPoint>) {
    if points.len() >= 2 && points.first() == points.last() {
        points.pop();
    }
}

/// Triangulate one ring group in (lon, lat) space.
///
/// Returns the flattened vertices (exterior first, then each hole) and the
/// triangle indices into them. Degenerate rings are skipped; a degenerate
/// exterior yields no triangles.
pub fn triangulate_ring_group(group: &RingGroup) -> (Vec<GeoPoint>, Vec<usize>) {
    let mut vertices: Vec<GeoPoint> = Vec::new();
    let mut coords_2d: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    for (ring_i, ring) in group.rings().enumerate() {
        let mut ring_pts = ring.clone();
        drop_closing_duplicate(&mut ring_pts);
        if ring_pts.len() < 3 {
            if ring_i == 0 {
                return (Vec::new(), Vec::new());
            }
            continue;
        }

        if ring_i > 0 {
            hole_indices.push(vertices.len());
        }
        for p in ring_pts {
            coords_2d.push(p.lon_deg);
            coords_2d.push(p.lat_deg);
            vertices.push(p);
        }
    }

    match earcut(&coords_2d, &hole_indices, 2) {
        Ok(indices) => (vertices, indices),
        Err(_) => {
            tracing::debug!(vertices = vertices.len(), "ring group triangulation failed");
            (Vec::new(), Vec::new())
        }
    }
}

/// Triangulate, project and shade one country.
pub fn build_country_mesh(feature: &CountryFeature, radius: f64) -> CountryMesh {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut lon_lat: Vec<[f64; 2]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for group in feature.shape.ring_groups() {
        let (flat, tri) = triangulate_ring_group(group);
        let base = positions.len() as u32;
        positions.extend(flat.iter().map(|p| project(p.lat_deg, p.lon_deg, radius)));
        lon_lat.extend(flat.iter().map(|p| [p.lon_deg, p.lat_deg]));

        for t in tri.chunks_exact(3) {
            let (a, mut b, mut c) = (t[0] as u32 + base, t[1] as u32 + base, t[2] as u32 + base);
            // earcut's winding depends on ring orientation; face every
            // triangle away from the globe centre.
            let (pa, pb, pc) = (
                positions[a as usize],
                positions[b as usize],
                positions[c as usize],
            );
            let n = (pb - pa).cross(pc - pa);
            if n.dot(pa + pb + pc) < 0.0 {
                std::mem::swap(&mut b, &mut c);
            }
            indices.extend([a, b, c]);
        }
    }

    let normals = vertex_normals(&positions, &indices);
    let geo_bounds = Aabb2::from_points(lon_lat.iter().copied());

    CountryMesh {
        identifier: feature.identifier.clone(),
        display_name: feature.display_name.clone(),
        positions,
        lon_lat,
        normals,
        indices,
        geo_bounds,
    }
}

/// Area-weighted vertex normals. Vertices touched only by degenerate
/// triangles use the radial direction.
fn vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for t in indices.chunks_exact(3) {
        let (a, b, c) = (t[0] as usize, t[1] as usize, t[2] as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }
    acc.iter()
        .zip(positions)
        .map(|(n, p)| n.normalized().or_else(|| p.normalized()).unwrap_or(Vec3::ZERO))
        .collect()
}

/// Hit-test meshes for a whole dataset, in dataset order.
#[derive(Debug, Clone, Default)]
pub struct CountryMeshSet {
    meshes: Vec<CountryMesh>,
    radius: f64,
}

impl CountryMeshSet {
    pub fn build(dataset: &CountryDataset, radius: f64) -> Self {
        let meshes: Vec<CountryMesh> = dataset
            .features
            .iter()
            .map(|f| build_country_mesh(f, radius))
            .collect();
        let triangles: usize = meshes.iter().map(CountryMesh::triangle_count).sum();
        tracing::debug!(countries = meshes.len(), triangles, "country meshes built");
        Self { meshes, radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn meshes(&self) -> &[CountryMesh] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CountryMesh> {
        self.meshes.get(index)
    }

    pub fn find(&self, identifier: &str) -> Option<&CountryMesh> {
        self.meshes.iter().find(|m| m.identifier == identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::{CountryMeshSet, build_country_mesh, triangulate_ring_group};
    use formats::countries::{
        CountryDataset, CountryFeature, CountryShape, GeoPoint, RingGroup,
    };

    const FIXTURE: &str = include_str!("../../formats/tests/fixtures/countries_small.geojson");

    fn rect(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(lon0, lat0),
            GeoPoint::new(lon1, lat0),
            GeoPoint::new(lon1, lat1),
            GeoPoint::new(lon0, lat1),
            GeoPoint::new(lon0, lat0),
        ]
    }

    fn area2(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> f64 {
        ((b.lon_deg - a.lon_deg) * (c.lat_deg - a.lat_deg)
            - (c.lon_deg - a.lon_deg) * (b.lat_deg - a.lat_deg))
            .abs()
            * 0.5
    }

    #[test]
    fn rectangle_with_hole_triangulates_around_the_hole() {
        let group = RingGroup::new(rect(0.0, 0.0, 10.0, 10.0), vec![rect(4.0, 4.0, 6.0, 6.0)]);
        let (verts, idx) = triangulate_ring_group(&group);
        assert_eq!(verts.len(), 8);
        // n + 2h - 2 triangles for n vertices and h holes.
        assert_eq!(idx.len() / 3, 8);

        let mut total = 0.0;
        for t in idx.chunks_exact(3) {
            let (a, b, c) = (verts[t[0]], verts[t[1]], verts[t[2]]);
            total += area2(a, b, c);
            let cx = (a.lon_deg + b.lon_deg + c.lon_deg) / 3.0;
            let cy = (a.lat_deg + b.lat_deg + c.lat_deg) / 3.0;
            let inside_hole = cx > 4.0 && cx < 6.0 && cy > 4.0 && cy < 6.0;
            assert!(!inside_hole, "triangle centroid ({cx}, {cy}) inside hole");
        }
        assert!((total - (100.0 - 4.0)).abs() < 1e-9);
    }

    #[test]
    fn degenerate_exterior_yields_nothing() {
        let group = RingGroup::new(
            vec![
                GeoPoint::new(0.0, 0.0),
                GeoPoint::new(1.0, 1.0),
                GeoPoint::new(0.0, 0.0),
            ],
            Vec::new(),
        );
        let (verts, idx) = triangulate_ring_group(&group);
        assert!(verts.is_empty());
        assert!(idx.is_empty());
    }

    #[test]
    fn mesh_sits_on_the_sphere_and_faces_outward() {
        let feature = CountryFeature {
            identifier: "RCT".into(),
            display_name: "Rectland".into(),
            shape: CountryShape::Polygon(RingGroup::new(
                rect(10.0, 10.0, 30.0, 30.0),
                vec![rect(15.0, 15.0, 20.0, 20.0)],
            )),
        };
        let mesh = build_country_mesh(&feature, 3.0);
        assert_eq!(mesh.triangle_count(), 8);
        for p in &mesh.positions {
            assert!((p.length() - 3.0).abs() < 1e-9);
        }
        for [a, b, c] in mesh.triangles() {
            let n = (b - a).cross(c - a);
            assert!(n.dot(a + b + c) > 0.0);
        }
        for (n, p) in mesh.normals.iter().zip(&mesh.positions) {
            assert!((n.length() - 1.0).abs() < 1e-9);
            assert!(n.dot(*p) > 0.0);
        }
    }

    #[test]
    fn multipolygons_merge_into_one_mesh() {
        let ds = CountryDataset::from_geojson_str(FIXTURE).expect("fixture");
        let set = CountryMeshSet::build(&ds, 3.0);
        assert_eq!(set.len(), ds.len());
        let nzl = set.find("NZL").expect("nzl");
        // Triangle island (1) + pentagon-ish island (2).
        assert_eq!(nzl.triangle_count(), 3);
        let zaf = set.find("ZAF").expect("zaf");
        assert_eq!(zaf.triangle_count(), 8);
        assert_eq!(set.get(0).map(|m| m.identifier.as_str()), Some("ZAF"));
        assert_eq!(zaf.geo_bounds.min, [16.0, -35.0]);
    }
}
