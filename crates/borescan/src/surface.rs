//! Whole-part surface statistics that corroborate the bore detectors.

use std::collections::BTreeSet;

use borescan_math::{bucket_key, bucket_value, mean_variance, Axis};
use borescan_stl::Facet;
use serde::{Deserialize, Serialize};

use crate::cloud::PointCloud;
use crate::error::{ensure, Result};

/// Surface statistic thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    /// Normals with |axial component| below this are radial.
    pub radial_threshold: f64,
    /// Height rounding for level spacing (mm).
    pub level_step: f64,
    /// Spacing is only judged with more levels than this.
    pub min_levels: usize,
    /// Maximum spacing variance for regular levels (mm²).
    pub max_spacing_variance: f64,
    /// Spacing window for thread-like levels (mm), exclusive.
    pub min_spacing: f64,
    /// Spacing window for thread-like levels (mm), exclusive.
    pub max_spacing: f64,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            radial_threshold: 0.3,
            level_step: 0.1,
            min_levels: 10,
            max_spacing_variance: 0.1,
            min_spacing: 0.3,
            max_spacing: 2.0,
        }
    }
}

impl SurfaceSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(
            self.radial_threshold > 0.0 && self.radial_threshold <= 1.0,
            "surface.radial_threshold must be in (0, 1]",
        )?;
        ensure(self.level_step > 0.0, "surface.level_step must be positive")?;
        ensure(
            self.min_spacing < self.max_spacing,
            "surface.min_spacing must be below max_spacing",
        )
    }
}

/// Facet normal orientation relative to an axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalStats {
    /// Facets whose normal is roughly perpendicular to the axis.
    pub radial: usize,
    /// All other facets.
    pub angled: usize,
    /// Mean |axial component| of the normals.
    pub mean_axial: f64,
}

impl NormalStats {
    /// Count radial and angled facets. Normals are used as stored.
    pub fn from_facets(facets: &[Facet], axis: Axis, settings: &SurfaceSettings) -> Self {
        let mut radial = 0;
        let mut angled = 0;
        let mut sum = 0.0;
        for f in facets {
            let a = f.normal[axis.index()].abs();
            sum += a;
            if a < settings.radial_threshold {
                radial += 1;
            } else {
                angled += 1;
            }
        }
        let mean_axial = if facets.is_empty() {
            0.0
        } else {
            sum / facets.len() as f64
        };
        Self {
            radial,
            angled,
            mean_axial,
        }
    }

    /// Vertical walls dominate: more than twice as many radial as angled
    /// facets.
    pub fn radial_dominant(&self) -> bool {
        self.radial > 2 * self.angled
    }
}

/// Regularity of the distinct height levels in a cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSpacing {
    /// Distinct levels.
    pub levels: usize,
    /// Mean gap between consecutive levels (mm).
    pub mean: f64,
    /// Population variance of the gaps (mm²).
    pub variance: f64,
}

impl LevelSpacing {
    /// Measure level spacing along `axis`. `None` with fewer than two levels.
    pub fn from_cloud(cloud: &PointCloud, axis: Axis, settings: &SurfaceSettings) -> Option<Self> {
        let keys: BTreeSet<i64> = cloud
            .points()
            .iter()
            .map(|p| bucket_key(axis.height(p), settings.level_step))
            .collect();
        let heights: Vec<f64> = keys
            .iter()
            .map(|k| bucket_value(*k, settings.level_step))
            .collect();
        let gaps = heights.windows(2).map(|w| w[1] - w[0]);
        let (mean, variance) = mean_variance(gaps)?;
        Some(Self {
            levels: heights.len(),
            mean,
            variance,
        })
    }

    /// Levels are evenly spaced at a thread-like pitch.
    pub fn suggests_thread(&self, settings: &SurfaceSettings) -> bool {
        self.levels > settings.min_levels
            && self.variance < settings.max_spacing_variance
            && self.mean > settings.min_spacing
            && self.mean < settings.max_spacing
    }
}
