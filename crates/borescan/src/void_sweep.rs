//! Void sweep: look for round openings on a face of the part.
//!
//! For every center on a regular grid over the face, count points in an
//! inner disk and in a surrounding annulus. A hole opening leaves the disk
//! empty while its rim crowds the annulus.

use borescan_math::{Axis, Point2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cloud::PointCloud;
use crate::cluster::{BoreHit, HitSource};
use crate::error::{ensure, DetectError, Result};

/// End of the part a sweep or depth scan starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSide {
    /// Lowest extent along the axis.
    Min,
    /// Highest extent along the axis.
    #[default]
    Max,
}

/// Void sweep parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoidSweepSettings {
    /// Sample radii to sweep with (mm). Earlier radii win at a location.
    pub sample_radii: Vec<f64>,
    /// Openings closer than this to an already kept one are dropped (mm).
    pub min_separation: f64,
    /// Grid spacing (mm).
    pub grid_step: f64,
    /// Inner disk radius as a fraction of the sample radius.
    pub inner_ratio: f64,
    /// Annulus inner edge as a fraction of the sample radius.
    pub annulus_inner_ratio: f64,
    /// Annulus outer edge as a fraction of the sample radius.
    pub annulus_outer_ratio: f64,
    /// A void has fewer inner points than this.
    pub max_inner_points: usize,
    /// A void has more annulus points than this.
    pub min_annulus_points: usize,
    /// Thickness of the face slab below (or above) the extreme (mm).
    pub face_depth: f64,
    /// Which face to sweep.
    pub face_side: FaceSide,
    /// Largest grid the sweep will visit.
    pub max_grid_cells: usize,
}

impl Default for VoidSweepSettings {
    fn default() -> Self {
        Self {
            sample_radii: vec![3.0, 4.0, 5.0, 6.0],
            min_separation: 3.0,
            grid_step: 1.0,
            inner_ratio: 0.5,
            annulus_inner_ratio: 0.8,
            annulus_outer_ratio: 1.5,
            max_inner_points: 10,
            min_annulus_points: 40,
            face_depth: 2.0,
            face_side: FaceSide::Max,
            max_grid_cells: 1_000_000,
        }
    }
}

impl VoidSweepSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(!self.sample_radii.is_empty(), "void_sweep.sample_radii must not be empty")?;
        ensure(
            self.sample_radii.iter().all(|r| r.is_finite() && *r > 0.0),
            "void_sweep.sample_radii must be positive",
        )?;
        ensure(self.min_separation > 0.0, "void_sweep.min_separation must be positive")?;
        ensure(self.grid_step > 0.0, "void_sweep.grid_step must be positive")?;
        ensure(
            self.inner_ratio > 0.0 && self.inner_ratio <= self.annulus_inner_ratio,
            "void_sweep.inner_ratio must be positive and inside the annulus",
        )?;
        ensure(
            self.annulus_inner_ratio < self.annulus_outer_ratio,
            "void_sweep annulus ratios must be increasing",
        )?;
        ensure(self.face_depth > 0.0, "void_sweep.face_depth must be positive")?;
        ensure(self.max_grid_cells > 0, "void_sweep.max_grid_cells must be positive")
    }
}

/// A grid location that looks like a hole opening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoidHit {
    /// In-plane disk center.
    pub center: Point2,
    /// Height of the swept face.
    pub face_height: f64,
    /// Points in the inner disk.
    pub inner_count: usize,
    /// Points in the annulus.
    pub annulus_count: usize,
    /// Sample radius used (mm).
    pub sample_radius: f64,
    /// Mean distance of the annulus points from the center (mm).
    pub rim_radius: f64,
}

impl VoidHit {
    /// Annulus-to-inner density ratio.
    pub fn ratio(&self) -> f64 {
        self.annulus_count as f64 / self.inner_count.max(1) as f64
    }
}

impl From<&VoidHit> for BoreHit {
    fn from(v: &VoidHit) -> Self {
        Self {
            center: v.center,
            radius: v.rim_radius,
            height_min: v.face_height,
            height_max: v.face_height,
            confidence: v.annulus_count,
            source: HitSource::VoidSweep,
        }
    }
}

/// Inner disk and annulus around a center point.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SampleDisk {
    inner: f64,
    ring_lo: f64,
    ring_hi: f64,
}

impl SampleDisk {
    pub(crate) fn new(radius: f64, inner_ratio: f64, ring_lo_ratio: f64, ring_hi_ratio: f64) -> Self {
        Self {
            inner: radius * inner_ratio,
            ring_lo: radius * ring_lo_ratio,
            ring_hi: radius * ring_hi_ratio,
        }
    }

    /// Count points in the inner disk and the annulus. Both annulus bounds
    /// are open.
    pub(crate) fn count<I>(&self, points: I, center: Point2) -> DiskCounts
    where
        I: IntoIterator<Item = Point2>,
    {
        let mut counts = DiskCounts::default();
        for q in points {
            let d = (q - center).norm();
            if d < self.inner {
                counts.inner += 1;
            } else if d > self.ring_lo && d < self.ring_hi {
                counts.annulus += 1;
                counts.rim_sum += d;
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DiskCounts {
    pub(crate) inner: usize,
    pub(crate) annulus: usize,
    rim_sum: f64,
}

impl DiskCounts {
    /// Mean distance of the annulus points from the disk center.
    pub(crate) fn rim_radius(&self) -> Option<f64> {
        (self.annulus > 0).then(|| self.rim_sum / self.annulus as f64)
    }
}

/// Height of the chosen face, `None` for an empty cloud.
pub fn face_height(cloud: &PointCloud, axis: Axis, side: FaceSide) -> Option<f64> {
    let (lo, hi) = cloud.bounds()?.range(axis);
    Some(match side {
        FaceSide::Min => lo,
        FaceSide::Max => hi,
    })
}

/// Grid coordinates strictly inside `(min, max)`, aligned to multiples of
/// `step`.
pub(crate) fn grid_values(min: f64, max: f64, step: f64) -> (f64, usize) {
    let start = (min / step).floor() * step + step;
    let count = if start < max {
        ((max - start) / step).ceil() as usize
    } else {
        0
    };
    (start, count)
}

/// Sweep the chosen face of the part for voids of `sample_radius`.
///
/// Fails with [`DetectError::SearchBudgetExceeded`] if the grid would have
/// more than `max_grid_cells` cells. An empty cloud yields no hits.
pub fn sweep_face(
    cloud: &PointCloud,
    axis: Axis,
    sample_radius: f64,
    settings: &VoidSweepSettings,
) -> Result<Vec<VoidHit>> {
    let Some(face) = face_height(cloud, axis, settings.face_side) else {
        return Ok(Vec::new());
    };

    let face_points: Vec<Point2> = cloud
        .points()
        .iter()
        .filter(|p| match settings.face_side {
            FaceSide::Max => axis.height(p) > face - settings.face_depth,
            FaceSide::Min => axis.height(p) < face + settings.face_depth,
        })
        .map(|p| axis.plane(p))
        .collect();

    let Some((lo, hi)) = plane_extent(&face_points) else {
        return Ok(Vec::new());
    };
    let (u0, nu) = grid_values(lo.x, hi.x, settings.grid_step);
    let (v0, nv) = grid_values(lo.y, hi.y, settings.grid_step);
    let cells = nu.saturating_mul(nv);
    if cells > settings.max_grid_cells {
        warn!(cells, budget = settings.max_grid_cells, "void sweep grid too large");
        return Err(DetectError::SearchBudgetExceeded {
            cells,
            budget: settings.max_grid_cells,
        });
    }

    let disk = SampleDisk::new(
        sample_radius,
        settings.inner_ratio,
        settings.annulus_inner_ratio,
        settings.annulus_outer_ratio,
    );

    let hits: Vec<VoidHit> = (0..cells)
        .into_par_iter()
        .filter_map(|cell| {
            let center = Point2::new(
                u0 + (cell / nv) as f64 * settings.grid_step,
                v0 + (cell % nv) as f64 * settings.grid_step,
            );
            let counts = disk.count(face_points.iter().copied(), center);
            if counts.inner >= settings.max_inner_points
                || counts.annulus <= settings.min_annulus_points
            {
                return None;
            }
            Some(VoidHit {
                center,
                face_height: face,
                inner_count: counts.inner,
                annulus_count: counts.annulus,
                sample_radius,
                rim_radius: counts.rim_radius().unwrap_or(sample_radius),
            })
        })
        .collect();

    debug!(
        %axis,
        face,
        face_points = face_points.len(),
        cells,
        hits = hits.len(),
        sample_radius,
        "void sweep"
    );
    Ok(hits)
}

/// Sweep the face once per configured sample radius and keep the distinct
/// openings.
pub fn sweep_radii(
    cloud: &PointCloud,
    axis: Axis,
    settings: &VoidSweepSettings,
) -> Result<Vec<VoidHit>> {
    let per_radius = settings
        .sample_radii
        .iter()
        .map(|&radius| sweep_face(cloud, axis, radius, settings))
        .collect::<Result<Vec<_>>>()?;
    let kept = select_openings(per_radius, settings.min_separation);
    debug!(%axis, openings = kept.len(), "multi-radius void sweep");
    Ok(kept)
}

/// Non-maximum suppression over sweeps at several radii.
///
/// Radii are visited in the given order and each sweep strongest first. A
/// hit is kept unless it lies within `min_separation` of a hit kept before
/// it, so one opening yields one hit even though neighboring grid cells and
/// other sample radii see it too.
pub fn select_openings(per_radius: Vec<Vec<VoidHit>>, min_separation: f64) -> Vec<VoidHit> {
    let mut kept: Vec<VoidHit> = Vec::new();
    for mut hits in per_radius {
        hits.sort_by(|a, b| {
            b.annulus_count
                .cmp(&a.annulus_count)
                .then(a.center.x.total_cmp(&b.center.x))
                .then(a.center.y.total_cmp(&b.center.y))
        });
        for hit in hits {
            if kept
                .iter()
                .all(|k| (k.center - hit.center).norm() >= min_separation)
            {
                kept.push(hit);
            }
        }
    }
    kept
}

fn plane_extent(points: &[Point2]) -> Option<(Point2, Point2)> {
    let first = points.first()?;
    let mut lo = *first;
    let mut hi = *first;
    for q in points {
        lo.x = lo.x.min(q.x);
        lo.y = lo.y.min(q.y);
        hi.x = hi.x.max(q.x);
        hi.y = hi.y.max(q.y);
    }
    Some((lo, hi))
}
