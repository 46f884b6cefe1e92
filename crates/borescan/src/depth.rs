//! Void depth profile along a bore axis.
//!
//! Starting at a face, step slab by slab into the part and test each slab
//! for the same empty-disk, crowded-annulus signature the void sweep uses.

use borescan_math::{Axis, Point2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cloud::PointCloud;
use crate::error::{ensure, DetectError, Result};
use crate::void_sweep::{FaceSide, SampleDisk};

/// Depth scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthScanSettings {
    /// Distance between slab centers (mm).
    pub step: f64,
    /// Half-thickness of each slab (mm).
    pub slab_half_width: f64,
    /// Inner disk radius as a fraction of the sample radius.
    pub inner_ratio: f64,
    /// Annulus inner edge as a fraction of the sample radius.
    pub annulus_inner_ratio: f64,
    /// Annulus outer edge as a fraction of the sample radius.
    pub annulus_outer_ratio: f64,
    /// A void slab has fewer inner points than this.
    pub max_inner_points: usize,
    /// A void slab has more annulus points than this.
    pub min_annulus_points: usize,
    /// Most slabs one scan will test.
    pub max_slabs: usize,
}

impl Default for DepthScanSettings {
    fn default() -> Self {
        Self {
            step: 1.0,
            slab_half_width: 0.5,
            inner_ratio: 0.5,
            annulus_inner_ratio: 0.8,
            annulus_outer_ratio: 1.5,
            max_inner_points: 5,
            min_annulus_points: 15,
            max_slabs: 100_000,
        }
    }
}

impl DepthScanSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(self.step > 0.0, "depth.step must be positive")?;
        ensure(self.slab_half_width > 0.0, "depth.slab_half_width must be positive")?;
        ensure(
            self.inner_ratio > 0.0 && self.inner_ratio <= self.annulus_inner_ratio,
            "depth.inner_ratio must be positive and inside the annulus",
        )?;
        ensure(
            self.annulus_inner_ratio < self.annulus_outer_ratio,
            "depth annulus ratios must be increasing",
        )?;
        ensure(self.max_slabs > 0, "depth.max_slabs must be positive")
    }
}

/// A run of consecutive void slabs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoidSpan {
    /// Height of the first void slab, nearest the face.
    pub start: f64,
    /// Height of the last void slab.
    pub end: f64,
}

impl VoidSpan {
    /// Distance between the first and last void slab.
    pub fn depth(&self) -> f64 {
        (self.start - self.end).abs()
    }

    /// Lower of the two heights.
    pub fn bottom(&self) -> f64 {
        self.start.min(self.end)
    }

    /// Upper of the two heights.
    pub fn top(&self) -> f64 {
        self.start.max(self.end)
    }
}

/// Walk from the `side` face through the part at `center` and report the
/// void runs in walk order.
///
/// Fails with [`DetectError::SearchBudgetExceeded`] when the part is taller
/// than `max_slabs` steps, which also covers stray far-away vertices.
pub fn scan_depth(
    cloud: &PointCloud,
    axis: Axis,
    center: Point2,
    sample_radius: f64,
    side: FaceSide,
    settings: &DepthScanSettings,
) -> Result<Vec<VoidSpan>> {
    let Some(bounds) = cloud.bounds() else {
        return Ok(Vec::new());
    };
    let (lo, hi) = bounds.range(axis);
    let steps = ((hi - lo) / settings.step).floor();
    if !steps.is_finite() || steps >= settings.max_slabs as f64 {
        let slabs = if steps.is_finite() {
            (steps as usize).saturating_add(1)
        } else {
            usize::MAX
        };
        warn!(slabs, budget = settings.max_slabs, "depth scan too long");
        return Err(DetectError::SearchBudgetExceeded {
            cells: slabs,
            budget: settings.max_slabs,
        });
    }
    let slabs = steps as usize + 1;
    let (face, direction) = match side {
        FaceSide::Max => (hi, -1.0),
        FaceSide::Min => (lo, 1.0),
    };

    let disk = SampleDisk::new(
        sample_radius,
        settings.inner_ratio,
        settings.annulus_inner_ratio,
        settings.annulus_outer_ratio,
    );

    let profile: Vec<(f64, bool)> = (0..slabs)
        .into_par_iter()
        .map(|i| {
            let height = face + direction * i as f64 * settings.step;
            let slab = cloud
                .points()
                .iter()
                .filter(|p| (axis.height(p) - height).abs() < settings.slab_half_width)
                .map(|p| axis.plane(p));
            let counts = disk.count(slab, center);
            let void = counts.inner < settings.max_inner_points
                && counts.annulus > settings.min_annulus_points;
            (height, void)
        })
        .collect();

    let mut spans = Vec::new();
    let mut open: Option<VoidSpan> = None;
    for (height, void) in profile {
        if void {
            match open.as_mut() {
                Some(span) => span.end = height,
                None => {
                    open = Some(VoidSpan {
                        start: height,
                        end: height,
                    })
                }
            }
        } else if let Some(span) = open.take() {
            spans.push(span);
        }
    }
    spans.extend(open);

    debug!(
        %axis,
        u = center.x,
        v = center.y,
        sample_radius,
        spans = spans.len(),
        "depth scan"
    );
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use borescan_math::Point3;

    /// Stack of square slices at integer heights 0..=10, holed from
    /// `hole_from` upward.
    fn block(axis: Axis, hole: Point2, hole_from: i32) -> PointCloud {
        let mut points: Vec<Point3> = Vec::new();
        for h in 0..=10 {
            for i in 0..=24 {
                for j in 0..=24 {
                    let q = Point2::new(hole.x - 6.0 + 0.5 * i as f64, hole.y - 6.0 + 0.5 * j as f64);
                    if h >= hole_from && (q - hole).norm() < 3.0 {
                        continue;
                    }
                    points.push(axis.lift(&q, h as f64));
                }
            }
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn test_blind_hole_from_top() {
        let hole = Point2::new(1.0, 2.0);
        let cloud = block(Axis::Z, hole, 6);
        let spans = scan_depth(
            &cloud,
            Axis::Z,
            hole,
            3.0,
            FaceSide::Max,
            &DepthScanSettings::default(),
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        assert_abs_diff_eq!(spans[0].start, 10.0);
        assert_abs_diff_eq!(spans[0].end, 6.0);
        assert_abs_diff_eq!(spans[0].depth(), 4.0);
        assert_abs_diff_eq!(spans[0].bottom(), 6.0);
    }

    #[test]
    fn test_from_min_side_on_y_axis() {
        // Hole from height 6 up to the top; walking up from the bottom
        // finds solid first.
        let hole = Point2::new(-2.0, 0.0);
        let cloud = block(Axis::Y, hole, 6);
        let spans = scan_depth(
            &cloud,
            Axis::Y,
            hole,
            3.0,
            FaceSide::Min,
            &DepthScanSettings::default(),
        )
        .unwrap();
        assert_eq!(spans.len(), 1);
        assert_abs_diff_eq!(spans[0].start, 6.0);
        assert_abs_diff_eq!(spans[0].end, 10.0);
    }

    #[test]
    fn test_solid_has_no_span() {
        let cloud = block(Axis::Z, Point2::origin(), 11);
        let spans = scan_depth(
            &cloud,
            Axis::Z,
            Point2::origin(),
            3.0,
            FaceSide::Max,
            &DepthScanSettings::default(),
        )
        .unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn test_far_outlier_exceeds_budget() {
        let hole = Point2::new(1.0, 2.0);
        let mut points = block(Axis::Z, hole, 6).points().to_vec();
        points.push(Point3::new(50.0, 50.0, -1e30));
        let cloud = PointCloud::from_points(points);
        match scan_depth(
            &cloud,
            Axis::Z,
            hole,
            3.0,
            FaceSide::Max,
            &DepthScanSettings::default(),
        ) {
            Err(DetectError::SearchBudgetExceeded { cells, budget }) => {
                assert_eq!(budget, 100_000);
                assert!(cells > budget);
            }
            other => panic!("expected budget error, got {other:?}"),
        }
    }

    #[test]
    fn test_slab_budget_is_inclusive() {
        // Heights 0..=10 need exactly 11 slabs.
        let cloud = block(Axis::Z, Point2::origin(), 6);
        let tight = DepthScanSettings {
            max_slabs: 11,
            ..Default::default()
        };
        let spans = scan_depth(&cloud, Axis::Z, Point2::origin(), 3.0, FaceSide::Max, &tight)
            .unwrap();
        assert_eq!(spans.len(), 1);

        let short = DepthScanSettings {
            max_slabs: 10,
            ..Default::default()
        };
        assert!(scan_depth(&cloud, Axis::Z, Point2::origin(), 3.0, FaceSide::Max, &short).is_err());
    }

    #[test]
    fn test_empty_cloud() {
        let spans = scan_depth(
            &PointCloud::default(),
            Axis::Z,
            Point2::origin(),
            3.0,
            FaceSide::Max,
            &DepthScanSettings::default(),
        )
        .unwrap();
        assert!(spans.is_empty());
    }
}
