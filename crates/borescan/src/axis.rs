//! Candidate axis estimation.
//!
//! Bores are assumed to run parallel to one of the coordinate axes. The
//! caller picks which; this module only supplies the in-plane center,
//! either from a seed the caller already suspects or from the centroid of
//! the whole cloud.

use borescan_math::{Axis, CylindricalPoint, Point2, Point3};
use tracing::debug;

use crate::cloud::PointCloud;

/// A candidate axis: a coordinate axis and the point where it pierces the
/// perpendicular plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisEstimate {
    /// Direction of the axis.
    pub axis: Axis,
    /// In-plane center.
    pub center: Point2,
    /// True when the center came from a caller-supplied seed.
    pub seeded: bool,
}

impl AxisEstimate {
    /// Axis through an explicit center.
    pub fn new(axis: Axis, center: Point2) -> Self {
        Self {
            axis,
            center,
            seeded: true,
        }
    }

    /// Express `p` in cylindrical coordinates about this axis.
    pub fn cylindrical(&self, p: &Point3) -> CylindricalPoint {
        self.axis.to_cylindrical(p, &self.center)
    }

    /// In-plane distance from the axis.
    pub fn radial_distance(&self, p: &Point3) -> f64 {
        (self.axis.plane(p) - self.center).norm()
    }
}

/// Estimate an axis parallel to `axis`.
///
/// Uses `seed` when given; otherwise the cloud centroid projected onto the
/// perpendicular plane. Returns `None` for an empty cloud without a seed.
pub fn estimate_axis(cloud: &PointCloud, axis: Axis, seed: Option<Point2>) -> Option<AxisEstimate> {
    if let Some(center) = seed {
        return Some(AxisEstimate::new(axis, center));
    }
    let centroid = cloud.centroid()?;
    let center = axis.plane(&centroid);
    debug!(%axis, u = center.x, v = center.y, "axis center from centroid");
    Some(AxisEstimate {
        axis,
        center,
        seeded: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_seed_wins() {
        let cloud = PointCloud::from_points(vec![Point3::new(10.0, 10.0, 10.0)]);
        let est = estimate_axis(&cloud, Axis::Z, Some(Point2::new(1.0, 2.0))).unwrap();
        assert!(est.seeded);
        assert_eq!(est.center, Point2::new(1.0, 2.0));
    }

    #[test]
    fn test_centroid_projection() {
        let cloud = PointCloud::from_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 2.0, 6.0),
        ]);
        let est = estimate_axis(&cloud, Axis::Y, None).unwrap();
        assert!(!est.seeded);
        // Y plane is (z, x)
        assert_abs_diff_eq!(est.center.x, 3.0);
        assert_abs_diff_eq!(est.center.y, 2.0);
    }

    #[test]
    fn test_empty_without_seed() {
        assert!(estimate_axis(&PointCloud::default(), Axis::Z, None).is_none());
    }

    #[test]
    fn test_radial_distance() {
        let est = AxisEstimate::new(Axis::X, Point2::new(1.0, 1.0));
        assert_abs_diff_eq!(est.radial_distance(&Point3::new(9.0, 4.0, 5.0)), 5.0);
    }
}
