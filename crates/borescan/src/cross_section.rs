//! Circular cross-section detection.
//!
//! Points are bucketed by height along the axis. A bucket whose points sit
//! at a consistent distance from their own mean is a slice through a
//! circular wall.

use borescan_math::{bucket_value, group_by_bucket, mean_variance, Axis, Point2, Point3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis::AxisEstimate;
use crate::cloud::PointCloud;
use crate::error::{ensure, Result};

/// Cross-section finder thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSectionSettings {
    /// Height bucket width (mm).
    pub bucket_width: f64,
    /// Minimum points in a bucket.
    pub min_points: usize,
    /// Maximum radius variance (mm²) for a bucket to count as circular.
    pub max_radius_variance: f64,
    /// Minimum average radius (mm). Rejects solid-fill noise.
    pub min_radius: f64,
    /// Only consider points within this in-plane distance of the axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_radius: Option<f64>,
}

impl Default for CrossSectionSettings {
    fn default() -> Self {
        Self {
            bucket_width: 0.25,
            min_points: 8,
            max_radius_variance: 2.0,
            min_radius: 1.0,
            search_radius: None,
        }
    }
}

impl CrossSectionSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(self.bucket_width > 0.0, "cross_section.bucket_width must be positive")?;
        ensure(self.min_points >= 3, "cross_section.min_points must be at least 3")?;
        ensure(
            self.max_radius_variance > 0.0,
            "cross_section.max_radius_variance must be positive",
        )?;
        ensure(self.min_radius > 0.0, "cross_section.min_radius must be positive")?;
        if let Some(r) = self.search_radius {
            ensure(r > 0.0, "cross_section.search_radius must be positive")?;
        }
        Ok(())
    }
}

/// One accepted circular slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossSectionSample {
    /// Bucket height along the axis (mm).
    pub height: f64,
    /// In-plane center (mean of the bucket's points).
    pub center: Point2,
    /// Mean distance from `center` (mm).
    pub avg_radius: f64,
    /// Population variance of that distance (mm²).
    pub radius_variance: f64,
    /// Points in the bucket.
    pub point_count: usize,
}

/// Find height levels where points form a circle.
///
/// Buckets with too few points, too much radius spread or too small a
/// radius are skipped. Samples come back in ascending height order.
pub fn find_cross_sections(
    cloud: &PointCloud,
    estimate: &AxisEstimate,
    settings: &CrossSectionSettings,
) -> Vec<CrossSectionSample> {
    let axis = estimate.axis;
    let selected = cloud.points().iter().filter(|p| match settings.search_radius {
        Some(r) => estimate.radial_distance(p) <= r,
        None => true,
    });
    let buckets = group_by_bucket(selected, settings.bucket_width, |p| axis.height(p));
    let buckets: Vec<(i64, Vec<&Point3>)> = buckets.into_iter().collect();

    let samples: Vec<CrossSectionSample> = buckets
        .par_iter()
        .filter_map(|(key, points)| {
            let height = bucket_value(*key, settings.bucket_width);
            let sample = fit_circle(height, points, axis)?;
            accept(&sample, settings).then_some(sample)
        })
        .collect();

    debug!(
        buckets = buckets.len(),
        accepted = samples.len(),
        "cross-section sweep"
    );
    samples
}

fn fit_circle(height: f64, points: &[&Point3], axis: Axis) -> Option<CrossSectionSample> {
    let plane: Vec<Point2> = points.iter().map(|p| axis.plane(p)).collect();
    let (cu, _) = mean_variance(plane.iter().map(|q| q.x))?;
    let (cv, _) = mean_variance(plane.iter().map(|q| q.y))?;
    let center = Point2::new(cu, cv);
    let (avg_radius, radius_variance) = mean_variance(plane.iter().map(|q| (q - center).norm()))?;
    Some(CrossSectionSample {
        height,
        center,
        avg_radius,
        radius_variance,
        point_count: points.len(),
    })
}

fn accept(sample: &CrossSectionSample, settings: &CrossSectionSettings) -> bool {
    sample.point_count >= settings.min_points
        && sample.radius_variance < settings.max_radius_variance
        && sample.avg_radius > settings.min_radius
}
