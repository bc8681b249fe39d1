use foundation::bounds::Aabb2;
use foundation::math::{Vec3, unproject};
use layers::countries::CountryMeshSet;

use crate::spatial::{Bvh, Item as BvhItem};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }

    /// The same ray expressed in a frame rotated by `angle_rad` about +Y.
    ///
    /// Used to bring a world-space ray into the spinning globe's frame.
    pub fn into_rotated_y(self, angle_rad: f64) -> Self {
        let rot = |v: Vec3| {
            let (s, c) = (-angle_rad).sin_cos();
            Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
        };
        Self::new(rot(self.origin), rot(self.dir))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    /// Position of the country in its [`CountryMeshSet`].
    pub index: usize,
    /// Distance along the (normalized) ray.
    pub distance: f64,
    /// Hit point on the globe surface, globe frame.
    pub point: Vec3,
    pub lat_deg: f64,
    pub lon_deg: f64,
}

/// Nearest intersection of `ray` with the sphere of `radius` at the origin.
///
/// Returns `None` when the ray misses or the sphere lies behind the origin.
pub fn ray_sphere_entry(ray: Ray, radius: f64) -> Option<f64> {
    let dir = ray.dir.normalized()?;
    let b = ray.origin.dot(dir);
    let c = ray.origin.dot(ray.origin) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = -b - sq;
    let t1 = -b + sq;
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Spatial index over the countries' geographic extents.
#[derive(Debug, Clone, Default)]
pub struct CountryPicker {
    bvh: Bvh,
}

impl CountryPicker {
    pub fn new(meshes: &CountryMeshSet) -> Self {
        let items = meshes
            .meshes()
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .map(|(i, m)| BvhItem {
                index: i as u32,
                bounds: m.geo_bounds,
            })
            .collect();
        Self {
            bvh: Bvh::build(items),
        }
    }
}

/// Which country, if any, lies under `ray` (globe frame).
///
/// The ray is intersected with the globe at the meshes' radius; the front
/// surface point decides, so countries on the far side never win through
/// open ocean. The point is then located in each candidate's (lon, lat)
/// triangulation. Overlapping countries resolve to the lower index.
pub fn pick_country(meshes: &CountryMeshSet, picker: &CountryPicker, ray: Ray) -> Option<PickHit> {
    let dir = ray.dir.normalized()?;
    let ray = Ray::new(ray.origin, dir);
    let distance = ray_sphere_entry(ray, meshes.radius())?;
    let point = ray.at(distance);
    let (lat_deg, lon_deg) = unproject(point)?;
    let p = [lon_deg, lat_deg];

    picker
        .bvh
        .query_point(p)
        .into_iter()
        .map(|i| i as usize)
        .find(|&i| {
            meshes.get(i).is_some_and(|mesh| {
                (0..mesh.triangle_count()).any(|t| point_in_triangle(p, mesh.triangle_lon_lat(t)))
            })
        })
        .map(|index| PickHit {
            index,
            distance,
            point,
            lat_deg,
            lon_deg,
        })
}

/// Edge-inclusive, orientation-agnostic.
fn point_in_triangle(p: [f64; 2], [a, b, c]: [[f64; 2]; 3]) -> bool {
    if !Aabb2::from_points([a, b, c]).contains(p) {
        return false;
    }
    let edge = |u: [f64; 2], v: [f64; 2]| (v[0] - u[0]) * (p[1] - u[1]) - (v[1] - u[1]) * (p[0] - u[0]);
    let d0 = edge(a, b);
    let d1 = edge(b, c);
    let d2 = edge(c, a);
    let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
    let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::{CountryPicker, Ray, pick_country, point_in_triangle, ray_sphere_entry};
    use formats::countries::CountryDataset;
    use foundation::math::{Vec3, project};
    use layers::countries::CountryMeshSet;

    const FIXTURE: &str = include_str!("../../formats/tests/fixtures/countries_small.geojson");

    fn setup() -> (CountryDataset, CountryMeshSet, CountryPicker) {
        let ds = CountryDataset::from_geojson_str(FIXTURE).expect("fixture");
        let meshes = CountryMeshSet::build(&ds, 3.0);
        let picker = CountryPicker::new(&meshes);
        (ds, meshes, picker)
    }

    /// A ray from outside the globe straight down onto (lat, lon).
    fn ray_onto(lat: f64, lon: f64) -> Ray {
        let target = project(lat, lon, 3.0);
        let origin = project(lat, lon, 10.0);
        Ray::new(origin, target - origin)
    }

    fn picked<'a>(meshes: &'a CountryMeshSet, picker: &CountryPicker, ray: Ray) -> Option<&'a str> {
        pick_country(meshes, picker, ray)
            .and_then(|hit| meshes.get(hit.index))
            .map(|m| m.identifier.as_str())
    }

    #[test]
    fn sphere_entry_distance() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -2.0));
        let t = ray_sphere_entry(ray, 3.0).expect("hit");
        assert!((t - 7.0).abs() < 1e-12);
        let miss = Ray::new(Vec3::new(0.0, 5.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_sphere_entry(miss, 3.0).is_none());
        let away = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray_sphere_entry(away, 3.0).is_none());
    }

    #[test]
    fn picks_country_under_ray() {
        let (_, meshes, picker) = setup();
        assert_eq!(picked(&meshes, &picker, ray_onto(-25.0, 20.0)), Some("ZAF"));
        assert_eq!(picked(&meshes, &picker, ray_onto(42.5, 21.0)), Some("-99#3"));
        assert_eq!(picked(&meshes, &picker, ray_onto(-44.0, 170.0)), Some("NZL"));
    }

    #[test]
    fn enclave_inside_hole_picks_the_enclave() {
        let (_, meshes, picker) = setup();
        assert_eq!(picked(&meshes, &picker, ray_onto(-29.5, 28.2)), Some("LSO"));
    }

    #[test]
    fn open_ocean_picks_nothing_even_with_countries_behind() {
        let (_, meshes, picker) = setup();
        // Mid-Atlantic; the ray exits the globe near the Pacific.
        assert_eq!(picked(&meshes, &picker, ray_onto(0.0, -30.0)), None);
        // Straight through the globe: the far side is South Africa, the near side is ocean.
        let zaf_far = project(-25.0, 20.0, 3.0);
        let ray = Ray::new(zaf_far.scale(-10.0 / 3.0), zaf_far);
        assert_eq!(picked(&meshes, &picker, ray), None);
    }

    #[test]
    fn rotated_globe_is_picked_in_its_own_frame() {
        let (_, meshes, picker) = setup();
        let angle: f64 = 0.7;
        // Where South Africa's interior point sits after the globe turns by `angle`.
        let local = project(-25.0, 20.0, 3.0);
        let (s, c) = angle.sin_cos();
        let world = Vec3::new(local.x * c + local.z * s, local.y, -local.x * s + local.z * c);
        let world_ray = Ray::new(world.scale(10.0 / 3.0), world.scale(-1.0));
        let hit = pick_country(&meshes, &picker, world_ray.into_rotated_y(angle)).expect("hit");
        assert_eq!(meshes.get(hit.index).map(|m| m.identifier.as_str()), Some("ZAF"));
        assert!((hit.lat_deg + 25.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_test_includes_edges() {
        let tri = [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]];
        assert!(point_in_triangle([1.0, 1.0], tri));
        assert!(point_in_triangle([2.0, 0.0], tri));
        assert!(!point_in_triangle([3.0, 3.0], tri));
        let reversed = [[0.0, 0.0], [0.0, 4.0], [4.0, 0.0]];
        assert!(point_in_triangle([1.0, 1.0], reversed));
    }
}
