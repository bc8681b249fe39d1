//! The textured base sphere.

use foundation::math::project;
use foundation::time::MonthKey;

pub const DEFAULT_SEGMENTS: u32 = 32;

/// Substitute the lowercase month name into a `{month}` URL template.
pub fn texture_url(template: &str, month: MonthKey) -> String {
    template.replace("{month}", month.name())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SphereMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Equirectangular: u = 0 at longitude -180, v = 0 at the north pole.
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobeModel {
    pub radius: f64,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl GlobeModel {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            width_segments: DEFAULT_SEGMENTS,
            height_segments: DEFAULT_SEGMENTS,
        }
    }

    /// UV sphere whose vertices go through the same projection as the
    /// country geometry, so texture and outlines line up.
    pub fn mesh(&self) -> SphereMesh {
        let lat_segments = self.height_segments.max(3);
        let lon_segments = self.width_segments.max(3);
        let count = ((lat_segments + 1) * (lon_segments + 1)) as usize;

        let mut mesh = SphereMesh {
            positions: Vec::with_capacity(count),
            normals: Vec::with_capacity(count),
            uvs: Vec::with_capacity(count),
            indices: Vec::with_capacity((lat_segments * lon_segments * 6) as usize),
        };

        for lat in 0..=lat_segments {
            let v = lat as f64 / lat_segments as f64;
            let lat_deg = 90.0 - v * 180.0;
            for lon in 0..=lon_segments {
                let u = lon as f64 / lon_segments as f64;
                let lon_deg = u * 360.0 - 180.0;
                let p = project(lat_deg, lon_deg, self.radius);
                let n = project(lat_deg, lon_deg, 1.0);
                mesh.positions.push(p.to_f32());
                mesh.normals.push(n.to_f32());
                mesh.uvs.push([u as f32, v as f32]);
            }
        }

        let stride = lon_segments + 1;
        for lat in 0..lat_segments {
            for lon in 0..lon_segments {
                let i0 = lat * stride + lon;
                let i1 = i0 + 1;
                let i2 = i0 + stride;
                let i3 = i2 + 1;
                mesh.indices.extend([i0, i2, i1, i1, i2, i3]);
            }
        }
        mesh
    }
}
