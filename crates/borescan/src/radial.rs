//! Radial ring scan around a candidate axis.
//!
//! Points are binned by their distance from the axis. A bore wall shows up
//! as a thin ring that is both well populated and tall.

use std::collections::BTreeSet;

use borescan_math::{bucket_key, bucket_value, group_by_bucket, Point2, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis::AxisEstimate;
use crate::cloud::PointCloud;
use crate::cluster::{BoreHit, HitSource};
use crate::error::{ensure, Result};

/// Radial ring scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialScanSettings {
    /// Smallest ring radius considered (mm).
    pub min_radius: f64,
    /// Largest ring radius considered (mm).
    pub max_radius: f64,
    /// Ring width (mm).
    pub ring_width: f64,
    /// Height level size used to count distinct levels (mm).
    pub level_height: f64,
    /// A ring must cover more distinct levels than this.
    pub min_levels: usize,
    /// A ring must span more than this along the axis (mm).
    pub min_span: f64,
    /// A ring must hold more points than this.
    pub min_points: usize,
}

impl Default for RadialScanSettings {
    fn default() -> Self {
        Self {
            min_radius: 2.0,
            max_radius: 12.0,
            ring_width: 0.5,
            level_height: 1.0,
            min_levels: 3,
            min_span: 5.0,
            min_points: 100,
        }
    }
}

impl RadialScanSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(self.min_radius >= 0.0, "radial.min_radius must be non-negative")?;
        ensure(
            self.max_radius > self.min_radius,
            "radial.max_radius must exceed min_radius",
        )?;
        ensure(self.ring_width > 0.0, "radial.ring_width must be positive")?;
        ensure(self.level_height > 0.0, "radial.level_height must be positive")
    }
}

/// Scan rings around `estimate` and return one hit per qualifying ring, in
/// ascending radius order.
pub fn scan_rings(
    cloud: &PointCloud,
    estimate: &AxisEstimate,
    settings: &RadialScanSettings,
) -> Vec<BoreHit> {
    let axis = estimate.axis;
    let near: Vec<(f64, &Point3)> = cloud
        .points()
        .iter()
        .map(|p| (estimate.radial_distance(p), p))
        .filter(|(r, _)| *r >= settings.min_radius && *r <= settings.max_radius)
        .collect();

    let rings = group_by_bucket(near, settings.ring_width, |(r, _)| *r);
    let mut hits = Vec::new();
    for (key, ring) in &rings {
        if ring.len() <= settings.min_points {
            continue;
        }
        let levels: BTreeSet<i64> = ring
            .iter()
            .map(|(_, p)| bucket_key(axis.height(p), settings.level_height))
            .collect();
        let (lo, hi) = ring
            .iter()
            .map(|(_, p)| axis.height(p))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| (lo.min(h), hi.max(h)));
        if levels.len() <= settings.min_levels || hi - lo <= settings.min_span {
            continue;
        }

        let n = ring.len() as f64;
        let sum = ring
            .iter()
            .fold(Point2::origin().coords, |acc, (_, p)| acc + axis.plane(p).coords);
        hits.push(BoreHit {
            center: Point2::from(sum / n),
            radius: bucket_value(*key, settings.ring_width),
            height_min: lo,
            height_max: hi,
            confidence: ring.len(),
            source: HitSource::RadialScan,
        });
    }

    debug!(rings = rings.len(), hits = hits.len(), "radial ring scan");
    hits
}
