//! Country outlines as closed polylines just above the globe surface.

use std::sync::Arc;

use formats::countries::CountryDataset;
use foundation::math::{StableF64, Vec3, project};

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolyline {
    /// Identifier of the owning country.
    pub identifier: String,
    /// Closed: the last point repeats the first.
    pub points: Vec<Vec3>,
}

/// One polyline per exterior ring; holes are not stroked.
pub fn build_boundary_lines(dataset: &CountryDataset, radius: f64) -> Vec<BoundaryPolyline> {
    let mut out = Vec::new();
    for feature in &dataset.features {
        for ring in feature.shape.exterior_rings() {
            let points = ring
                .iter()
                .map(|p| project(p.lat_deg, p.lon_deg, radius))
                .collect();
            out.push(BoundaryPolyline {
                identifier: feature.identifier.clone(),
                points,
            });
        }
    }
    out
}

/// Flatten polylines into `LineList` vertex pairs.
pub fn line_list_positions(lines: &[BoundaryPolyline]) -> Vec<[f32; 3]> {
    let segments: usize = lines.iter().map(|l| l.points.len().saturating_sub(1)).sum();
    let mut out = Vec::with_capacity(segments * 2);
    for line in lines {
        for pair in line.points.windows(2) {
            out.push(pair[0].to_f32());
            out.push(pair[1].to_f32());
        }
    }
    out
}

/// Memoizes [`build_boundary_lines`] on (dataset, radius).
#[derive(Debug, Default)]
pub struct BoundaryRenderer {
    memo: Option<(Arc<CountryDataset>, StableF64, Arc<[BoundaryPolyline]>)>,
    rebuilds: u64,
}

impl BoundaryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polylines for the current dataset, or nothing while it is unresolved.
    pub fn lines(
        &mut self,
        dataset: Option<&Arc<CountryDataset>>,
        radius: f64,
    ) -> Arc<[BoundaryPolyline]> {
        let Some(dataset) = dataset else {
            return Arc::from(Vec::new());
        };
        let key = StableF64(radius);
        if let Some((memo_ds, memo_radius, lines)) = &self.memo {
            if Arc::ptr_eq(memo_ds, dataset) && *memo_radius == key {
                return Arc::clone(lines);
            }
        }

        let lines: Arc<[BoundaryPolyline]> = build_boundary_lines(dataset, radius).into();
        self.rebuilds += 1;
        tracing::debug!(
            polylines = lines.len(),
            radius,
            rebuilds = self.rebuilds,
            "boundary polylines rebuilt"
        );
        self.memo = Some((Arc::clone(dataset), key, Arc::clone(&lines)));
        lines
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Forget the memo (scene unmount).
    pub fn clear(&mut self) {
        self.memo = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundaryRenderer, build_boundary_lines, line_list_positions};
    use formats::countries::CountryDataset;
    use std::sync::Arc;

    const FIXTURE: &str = include_str!("../../formats/tests/fixtures/countries_small.geojson");

    fn dataset() -> Arc<CountryDataset> {
        Arc::new(CountryDataset::from_geojson_str(FIXTURE).expect("fixture"))
    }

    #[test]
    fn one_polyline_per_exterior_ring() {
        let ds = dataset();
        let lines = build_boundary_lines(&ds, 3.01);
        // 5 polygons + 2 New Zealand islands; South Africa's hole is not stroked.
        assert_eq!(lines.len(), 7);
        let nzl: Vec<_> = lines.iter().filter(|l| l.identifier == "NZL").collect();
        assert_eq!(nzl.len(), 2);
        let zaf: Vec<_> = lines.iter().filter(|l| l.identifier == "ZAF").collect();
        assert_eq!(zaf.len(), 1);
        assert_eq!(zaf[0].points.len(), 5);
    }

    #[test]
    fn polylines_are_closed_and_lifted() {
        let ds = dataset();
        for line in build_boundary_lines(&ds, 3.01) {
            assert_eq!(line.points.first(), line.points.last());
            for p in &line.points {
                assert!((p.length() - 3.01).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn memo_rebuilds_only_on_input_change() {
        let ds = dataset();
        let mut renderer = BoundaryRenderer::new();
        assert!(renderer.lines(None, 3.01).is_empty());
        assert_eq!(renderer.rebuilds(), 0);

        let a = renderer.lines(Some(&ds), 3.01);
        let b = renderer.lines(Some(&ds), 3.01);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(renderer.rebuilds(), 1);

        renderer.lines(Some(&ds), 4.0);
        assert_eq!(renderer.rebuilds(), 2);

        let other = dataset();
        renderer.lines(Some(&other), 4.0);
        assert_eq!(renderer.rebuilds(), 3);
    }

    #[test]
    fn line_list_has_two_vertices_per_segment() {
        let ds = dataset();
        let lines = build_boundary_lines(&ds, 3.01);
        let segments: usize = lines.iter().map(|l| l.points.len() - 1).sum();
        assert_eq!(line_list_positions(&lines).len(), segments * 2);
    }
}
