//! Geographic projection onto the display sphere.
//!
//! The boundary lines, the hit-test meshes and the textured globe all go
//! through [`project`], so they share one convention: latitude 0 /
//! longitude 0 lands on +X, the north pole on +Y and longitude +90 on -Z.

use super::vec::Vec3;

/// Project a (latitude, longitude) pair in degrees onto a sphere of `radius`.
///
/// Pure; any finite input gives a finite point at distance `radius` from the
/// origin.
pub fn project(lat_deg: f64, lon_deg: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (lon_deg + 180.0).to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();

    Vec3 {
        x: -(radius * sin_phi * cos_theta),
        y: radius * cos_phi,
        z: radius * sin_phi * sin_theta,
    }
}

/// [`project`] for a GeoJSON-ordered `[lon, lat]` position.
pub fn project_lon_lat(position: [f64; 2], radius: f64) -> Vec3 {
    project(position[1], position[0], radius)
}

/// Inverse of [`project`]: `(lat_deg, lon_deg)` of the direction of `p`.
///
/// Longitude is returned in `[-180, 180)`. `None` for the origin.
pub fn unproject(p: Vec3) -> Option<(f64, f64)> {
    let r = p.length();
    if r <= 1e-12 || !r.is_finite() {
        return None;
    }
    let lat = (p.y / r).clamp(-1.0, 1.0).asin().to_degrees();
    let theta = p.z.atan2(-p.x).to_degrees();
    let mut lon = theta - 180.0;
    if lon < -180.0 {
        lon += 360.0;
    }
    if lon >= 180.0 {
        lon -= 360.0;
    }
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::{project, project_lon_lat, unproject};
    use crate::math::Vec3;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn known_points() {
        let r = 3.0;
        assert!(close(project(0.0, 0.0, r), Vec3::new(r, 0.0, 0.0)));
        assert!(close(project(0.0, 90.0, r), Vec3::new(0.0, 0.0, -r)));
        assert!(close(project(0.0, -90.0, r), Vec3::new(0.0, 0.0, r)));
        assert!(close(project(90.0, 45.0, r), Vec3::new(0.0, r, 0.0)));
        assert!(close(project(-90.0, 0.0, r), Vec3::new(0.0, -r, 0.0)));
    }

    #[test]
    fn projected_points_lie_on_the_sphere() {
        for r in [0.5, 3.0, 3.01, 100.0] {
            let mut lat = -90.0;
            while lat <= 90.0 {
                let mut lon = -180.0;
                while lon <= 180.0 {
                    let p = project(lat, lon, r);
                    assert!(
                        (p.length() - r).abs() < 1e-9 * r.max(1.0),
                        "lat={lat} lon={lon} r={r} -> {p:?}"
                    );
                    lon += 7.5;
                }
                lat += 7.5;
            }
        }
    }

    #[test]
    fn projection_is_deterministic() {
        let a = project(48.8566, 2.3522, 3.0);
        let b = project(48.8566, 2.3522, 3.0);
        assert_eq!(a, b);
    }

    #[test]
    fn antimeridian_sides_meet() {
        assert!(close(project(12.0, 180.0, 3.0), project(12.0, -180.0, 3.0)));
    }

    #[test]
    fn unproject_recovers_coordinates() {
        for (lat, lon) in [(0.0, 0.0), (48.85, 2.35), (-33.9, 151.2), (64.1, -21.9), (-45.0, -179.5)] {
            let (la, lo) = unproject(project(lat, lon, 3.0)).expect("non-zero");
            assert!((la - lat).abs() < 1e-9, "{lat} vs {la}");
            assert!((lo - lon).abs() < 1e-9, "{lon} vs {lo}");
        }
        assert!(unproject(Vec3::ZERO).is_none());
    }

    #[test]
    fn lon_lat_order_matches_geojson() {
        assert_eq!(project_lon_lat([10.0, 20.0], 2.0), project(20.0, 10.0, 2.0));
    }
}
