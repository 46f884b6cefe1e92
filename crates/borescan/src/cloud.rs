//! Point cloud extraction from parsed facets.

use borescan_math::{Axis, Point3, Vec3};
use borescan_stl::Facet;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds {
    /// Box around a single point.
    pub fn from_point(p: Point3) -> Self {
        Self { min: p, max: p }
    }

    /// Grow to include `p`.
    pub fn include(&mut self, p: &Point3) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    /// Edge lengths.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Extent `(min, max)` along an axis.
    pub fn range(&self, axis: Axis) -> (f64, f64) {
        (axis.height(&self.min), axis.height(&self.max))
    }
}

/// Every vertex of every facet, in file order.
///
/// Shared vertices are not merged: a vertex used by N triangles appears N
/// times, and the density-based detectors count on that.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<Point3>,
    bounds: Option<Bounds>,
    centroid: Option<Point3>,
}

impl PointCloud {
    /// Build a cloud from raw points, computing bounds and centroid.
    pub fn from_points(points: Vec<Point3>) -> Self {
        let mut bounds: Option<Bounds> = None;
        let mut sum = Vec3::zeros();
        for p in &points {
            match bounds.as_mut() {
                Some(b) => b.include(p),
                None => bounds = Some(Bounds::from_point(*p)),
            }
            sum += p.coords;
        }
        let centroid = (!points.is_empty()).then(|| Point3::from(sum / points.len() as f64));
        Self {
            points,
            bounds,
            centroid,
        }
    }

    /// All points.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Number of points (three per facet).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box, `None` for an empty cloud.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Mean of all points (duplicates included), `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Point3> {
        self.centroid
    }
}

/// Flatten facets into a point cloud, keeping duplicates and order.
pub fn extract(facets: &[Facet]) -> PointCloud {
    let points = facets
        .iter()
        .flat_map(|f| f.vertices.iter().copied())
        .collect();
    PointCloud::from_points(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_extract_keeps_duplicates() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);
        let d = Point3::new(2.0, 2.0, 4.0);
        let facets = [Facet::from_vertices(a, b, c), Facet::from_vertices(b, d, c)];
        let cloud = extract(&facets);

        assert_eq!(cloud.len(), 6);
        assert_eq!(cloud.points()[3], b);

        let bounds = cloud.bounds().unwrap();
        assert_abs_diff_eq!(bounds.max.z, 4.0);
        assert_abs_diff_eq!(bounds.size().x, 2.0);
        assert_eq!(bounds.range(Axis::Z), (0.0, 4.0));

        // b and c count twice
        let centroid = cloud.centroid().unwrap();
        assert_abs_diff_eq!(centroid.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centroid.z, 4.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_cloud() {
        let cloud = extract(&[]);
        assert!(cloud.is_empty());
        assert!(cloud.bounds().is_none());
        assert!(cloud.centroid().is_none());
    }
}
