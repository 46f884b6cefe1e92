//! Thread classification from the angle-versus-height profile of a bore wall.
//!
//! Points near the wall are grouped into height levels. On a printed thread
//! the dominant angle of each level turns steadily with height; on a smooth
//! bore the points of a level spread evenly around the circle and there is
//! no dominant angle at all.

use std::f64::consts::TAU;

use borescan_math::{
    bucket_key, bucket_value, circular_mean, group_by_bucket, mean_variance, wrap_angle, Axis,
    CylindricalPoint, Point2,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cloud::PointCloud;
use crate::cluster::BoreCandidate;
use crate::error::{ensure, Result};

/// Helix detector thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelixSettings {
    /// Half-width of the radius window around the bore radius (mm).
    pub radius_band: f64,
    /// Height bucket width (mm).
    pub bucket_width: f64,
    /// Minimum points for a level to be used.
    pub min_level_points: usize,
    /// Minimum number of levels for a verdict.
    pub min_levels: usize,
    /// Level pairs closer than this in height are skipped (mm).
    pub min_height_step: f64,
    /// Maximum variance of the per-pair slopes ((rad/mm)²).
    pub max_slope_variance: f64,
    /// Minimum magnitude of the mean slope (rad/mm).
    pub min_slope: f64,
    /// Minimum mean resultant length for a level to have a dominant angle.
    pub min_resultant: f64,
}

impl Default for HelixSettings {
    fn default() -> Self {
        Self {
            radius_band: 1.5,
            bucket_width: 0.2,
            min_level_points: 4,
            min_levels: 5,
            min_height_step: 0.01,
            max_slope_variance: 0.01,
            min_slope: 0.01,
            min_resultant: 0.05,
        }
    }
}

impl HelixSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(self.radius_band > 0.0, "helix.radius_band must be positive")?;
        ensure(self.bucket_width > 0.0, "helix.bucket_width must be positive")?;
        ensure(self.min_level_points >= 1, "helix.min_level_points must be at least 1")?;
        ensure(self.min_levels >= 2, "helix.min_levels must be at least 2")?;
        ensure(
            self.min_height_step >= 0.0 && self.min_height_step < self.bucket_width,
            "helix.min_height_step must be non-negative and below bucket_width",
        )?;
        ensure(
            self.max_slope_variance > 0.0,
            "helix.max_slope_variance must be positive",
        )?;
        ensure(self.min_slope >= 0.0, "helix.min_slope must be non-negative")?;
        ensure(
            (0.0..=1.0).contains(&self.min_resultant),
            "helix.min_resultant must be between 0 and 1",
        )
    }
}

/// Closed range of distances from the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusBand {
    /// Inner radius (mm).
    pub min: f64,
    /// Outer radius (mm).
    pub max: f64,
}

impl RadiusBand {
    /// Band of `half_width` either side of `radius`, clamped at zero.
    pub fn around(radius: f64, half_width: f64) -> Self {
        Self {
            min: (radius - half_width).max(0.0),
            max: radius + half_width,
        }
    }

    /// True if `r` lies in the band.
    pub fn contains(&self, r: f64) -> bool {
        r >= self.min && r <= self.max
    }
}

/// Thread rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    /// Angle increases with height.
    Right,
    /// Angle decreases with height.
    Left,
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handedness::Right => f.write_str("right"),
            Handedness::Left => f.write_str("left"),
        }
    }
}

/// Angular summary of one height level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelAngle {
    /// Bucket height (mm).
    pub height: f64,
    /// Circular mean of the level's angles.
    pub angle: f64,
    /// Mean resultant length in [0, 1].
    pub resultant: f64,
    /// Mean distance from the axis (mm).
    pub mean_radius: f64,
    /// Points in the level.
    pub count: usize,
}

/// A successful helix fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelixFit {
    /// Axial advance per revolution (mm).
    pub pitch: f64,
    /// Rotation direction.
    pub handedness: Handedness,
    /// Mean angle slope (rad/mm).
    pub slope: f64,
    /// Variance of the per-pair slopes.
    pub slope_variance: f64,
    /// Mean wall radius over the fitted levels (mm).
    pub mean_radius: f64,
    /// Levels used.
    pub levels: usize,
}

/// Why a bore was not classified as helical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotHelicalReason {
    /// Too few populated height levels.
    InsufficientData,
    /// Levels have no dominant angle: points surround the axis evenly.
    UniformAngle,
    /// The angle does not turn with height.
    NoProgression,
    /// The angle turns, but not at a consistent rate.
    IrregularProgression,
}

impl std::fmt::Display for NotHelicalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotHelicalReason::InsufficientData => "insufficient data",
            NotHelicalReason::UniformAngle => "uniform angle",
            NotHelicalReason::NoProgression => "no angular progression",
            NotHelicalReason::IrregularProgression => "irregular angular progression",
        };
        f.write_str(s)
    }
}

/// Outcome of thread classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThreadClassification {
    /// A printed thread.
    Helical(HelixFit),
    /// A smooth bore, or not enough evidence for a thread.
    NotHelical {
        /// Deciding check.
        reason: NotHelicalReason,
        /// Populated levels seen.
        levels: usize,
        /// Mean slope, when it got that far.
        slope: Option<f64>,
        /// Slope variance, when it got that far.
        slope_variance: Option<f64>,
    },
}

impl ThreadClassification {
    fn rejected(reason: NotHelicalReason, levels: usize) -> Self {
        ThreadClassification::NotHelical {
            reason,
            levels,
            slope: None,
            slope_variance: None,
        }
    }

    /// True for a printed thread.
    pub fn is_helical(&self) -> bool {
        matches!(self, ThreadClassification::Helical(_))
    }

    /// Thread pitch (mm), if helical.
    pub fn pitch(&self) -> Option<f64> {
        match self {
            ThreadClassification::Helical(fit) => Some(fit.pitch),
            ThreadClassification::NotHelical { .. } => None,
        }
    }

    /// Thread direction, if helical.
    pub fn handedness(&self) -> Option<Handedness> {
        match self {
            ThreadClassification::Helical(fit) => Some(fit.handedness),
            ThreadClassification::NotHelical { .. } => None,
        }
    }

    /// Reason for rejection, if not helical.
    pub fn reason(&self) -> Option<NotHelicalReason> {
        match self {
            ThreadClassification::Helical(_) => None,
            ThreadClassification::NotHelical { reason, .. } => Some(*reason),
        }
    }
}

/// Per-level angle summaries for points in `band` around the axis through
/// `center`, in ascending height order.
pub fn angle_levels(
    cloud: &PointCloud,
    axis: Axis,
    center: Point2,
    band: RadiusBand,
    settings: &HelixSettings,
) -> Vec<LevelAngle> {
    let wall = cloud
        .points()
        .iter()
        .map(|p| axis.to_cylindrical(p, &center))
        .filter(|c| band.contains(c.radius));

    group_by_bucket(wall, settings.bucket_width, |c| c.height)
        .into_iter()
        .filter(|(_, pts)| pts.len() >= settings.min_level_points)
        .filter_map(|(key, pts)| level_angle(bucket_value(key, settings.bucket_width), &pts))
        .collect()
}

fn level_angle(height: f64, pts: &[CylindricalPoint]) -> Option<LevelAngle> {
    let (angle, resultant) = circular_mean(pts.iter().map(|c| c.angle))?;
    let (mean_radius, _) = mean_variance(pts.iter().map(|c| c.radius))?;
    Some(LevelAngle {
        height,
        angle,
        resultant,
        mean_radius,
        count: pts.len(),
    })
}

/// Classify the wall in `band` around the axis through `center`.
pub fn classify_band(
    cloud: &PointCloud,
    axis: Axis,
    center: Point2,
    band: RadiusBand,
    settings: &HelixSettings,
) -> ThreadClassification {
    let levels = angle_levels(cloud, axis, center, band, settings);
    let result = classify_levels(&levels, settings);
    debug!(
        %axis,
        levels = levels.len(),
        helical = result.is_helical(),
        "classified band"
    );
    result
}

/// Classify the wall of a bore candidate.
pub fn classify_thread(
    cloud: &PointCloud,
    bore: &BoreCandidate,
    settings: &HelixSettings,
) -> ThreadClassification {
    let band = RadiusBand::around(bore.radius, settings.radius_band);
    let result = classify_band(cloud, bore.axis, bore.center, band, settings);
    match &result {
        ThreadClassification::Helical(fit) => info!(
            u = bore.center.x,
            v = bore.center.y,
            pitch = fit.pitch,
            handedness = %fit.handedness,
            "thread detected"
        ),
        ThreadClassification::NotHelical { reason, .. } => info!(
            u = bore.center.x,
            v = bore.center.y,
            %reason,
            "smooth bore"
        ),
    }
    result
}

/// Fit the angle progression of already-summarized levels.
pub fn classify_levels(levels: &[LevelAngle], settings: &HelixSettings) -> ThreadClassification {
    if levels.len() < settings.min_levels {
        return ThreadClassification::rejected(NotHelicalReason::InsufficientData, levels.len());
    }

    let dominant: Vec<&LevelAngle> = levels
        .iter()
        .filter(|l| l.resultant >= settings.min_resultant)
        .collect();
    if dominant.len() < settings.min_levels {
        return ThreadClassification::rejected(NotHelicalReason::UniformAngle, levels.len());
    }

    // Only neighboring buckets: across a gap the wrapped angle can alias.
    let slopes: Vec<f64> = levels
        .windows(2)
        .filter(|w| w.iter().all(|l| l.resultant >= settings.min_resultant))
        .filter_map(|w| {
            let dh = w[1].height - w[0].height;
            let adjacent = bucket_key(dh, settings.bucket_width) == 1;
            (adjacent && dh > settings.min_height_step)
                .then(|| wrap_angle(w[1].angle - w[0].angle) / dh)
        })
        .collect();

    let Some((slope, slope_variance)) = mean_variance(slopes.iter().copied()) else {
        return ThreadClassification::rejected(NotHelicalReason::InsufficientData, levels.len());
    };

    let reason = if slope.abs() <= settings.min_slope {
        Some(NotHelicalReason::NoProgression)
    } else if slope_variance >= settings.max_slope_variance {
        Some(NotHelicalReason::IrregularProgression)
    } else {
        None
    };
    if let Some(reason) = reason {
        return ThreadClassification::NotHelical {
            reason,
            levels: levels.len(),
            slope: Some(slope),
            slope_variance: Some(slope_variance),
        };
    }

    let mean_radius =
        dominant.iter().map(|l| l.mean_radius).sum::<f64>() / dominant.len() as f64;
    ThreadClassification::Helical(HelixFit {
        pitch: TAU / slope.abs(),
        handedness: if slope > 0.0 {
            Handedness::Right
        } else {
            Handedness::Left
        },
        slope,
        slope_variance,
        mean_radius,
        levels: dominant.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use borescan_math::Point3;

    /// One point every 0.01 mm of height, filling whole 0.2 mm buckets.
    fn helix(radius: f64, pitch: f64, turns: f64, left: bool) -> PointCloud {
        let n = ((turns * pitch / 0.2).round() as usize) * 20;
        let sign = if left { -1.0 } else { 1.0 };
        let points = (0..n)
            .map(|k| {
                let z = 0.105 + 0.01 * k as f64;
                let a = sign * TAU * z / pitch;
                Point3::new(radius * a.cos(), radius * a.sin(), z)
            })
            .collect();
        PointCloud::from_points(points)
    }

    fn cylinder(radius: f64, height: f64) -> PointCloud {
        let mut points = Vec::new();
        let levels = (height / 0.1) as usize;
        for j in 0..=levels {
            let z = j as f64 * 0.1;
            for i in 0..24 {
                let a = TAU * i as f64 / 24.0;
                points.push(Point3::new(radius * a.cos(), radius * a.sin(), z));
            }
        }
        PointCloud::from_points(points)
    }

    fn classify(cloud: &PointCloud, radius: f64) -> ThreadClassification {
        let settings = HelixSettings::default();
        classify_band(
            cloud,
            Axis::Z,
            Point2::origin(),
            RadiusBand::around(radius, settings.radius_band),
            &settings,
        )
    }

    #[test]
    fn test_right_hand_helix() {
        let result = classify(&helix(3.0, 1.5, 6.0, false), 3.0);
        assert!(result.is_helical(), "{result:?}");
        assert_relative_eq!(result.pitch().unwrap(), 1.5, max_relative = 0.1);
        assert_eq!(result.handedness(), Some(Handedness::Right));
    }

    #[test]
    fn test_left_hand_helix() {
        let result = classify(&helix(2.5, 1.0, 8.0, true), 2.5);
        assert!(result.is_helical(), "{result:?}");
        assert_relative_eq!(result.pitch().unwrap(), 1.0, max_relative = 0.1);
        assert_eq!(result.handedness(), Some(Handedness::Left));
    }

    #[test]
    fn test_smooth_cylinder_not_helical() {
        let result = classify(&cylinder(3.0, 10.0), 3.0);
        assert!(!result.is_helical());
        assert_eq!(result.reason(), Some(NotHelicalReason::UniformAngle));
    }

    #[test]
    fn test_insufficient_levels() {
        let result = classify(&cylinder(3.0, 0.3), 3.0);
        assert_eq!(result.reason(), Some(NotHelicalReason::InsufficientData));
        assert_eq!(result.pitch(), None);
    }

    #[test]
    fn test_points_outside_band_ignored() {
        let result = classify(&helix(3.0, 1.5, 6.0, false), 8.0);
        assert_eq!(result.reason(), Some(NotHelicalReason::InsufficientData));
    }

    fn level(height: f64, angle: f64) -> LevelAngle {
        LevelAngle {
            height,
            angle,
            resultant: 1.0,
            mean_radius: 3.0,
            count: 10,
        }
    }

    #[test]
    fn test_wraparound_slope() {
        // 0.5 rad per 0.2 mm, crossing the ±π seam.
        let levels: Vec<LevelAngle> = (0..10)
            .map(|i| level(i as f64 * 0.2, wrap_angle(2.5 + 0.5 * i as f64)))
            .collect();
        let result = classify_levels(&levels, &HelixSettings::default());
        match result {
            ThreadClassification::Helical(fit) => {
                assert_relative_eq!(fit.slope, 2.5, max_relative = 1e-9);
                assert_eq!(fit.levels, 10);
            }
            other => panic!("expected helix, got {other:?}"),
        }
    }

    #[test]
    fn test_gap_in_levels_does_not_alias() {
        // 1 mm pitch: 1.257 rad per level, so a pair across two missing
        // levels would wrap.
        let slope = TAU / 1.0;
        let mut levels: Vec<LevelAngle> = (0..12)
            .map(|i| {
                let h = i as f64 * 0.2;
                level(h, wrap_angle(slope * h))
            })
            .collect();
        levels[5].resultant = 0.01;
        levels[6].resultant = 0.01;
        let result = classify_levels(&levels, &HelixSettings::default());
        assert!(result.is_helical(), "{result:?}");
        assert_relative_eq!(result.pitch().unwrap(), 1.0, max_relative = 1e-6);

        // Sparse levels never make it into the list at all.
        levels.drain(5..7);
        let result = classify_levels(&levels, &HelixSettings::default());
        assert_relative_eq!(result.pitch().unwrap(), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_constant_angle_is_no_progression() {
        let levels: Vec<LevelAngle> = (0..8).map(|i| level(i as f64 * 0.2, 1.0)).collect();
        let result = classify_levels(&levels, &HelixSettings::default());
        assert_eq!(result.reason(), Some(NotHelicalReason::NoProgression));
    }

    #[test]
    fn test_irregular_progression() {
        let angles = [0.0, 0.5, 0.6, 1.4, 1.5, 2.3, 2.4];
        let levels: Vec<LevelAngle> = angles
            .iter()
            .enumerate()
            .map(|(i, a)| level(i as f64 * 0.2, *a))
            .collect();
        let result = classify_levels(&levels, &HelixSettings::default());
        assert_eq!(result.reason(), Some(NotHelicalReason::IrregularProgression));
    }

    #[test]
    fn test_validate() {
        assert!(HelixSettings::default().validate().is_ok());
        let bad = HelixSettings {
            min_resultant: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
