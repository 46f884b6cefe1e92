#![warn(missing_docs)]

//! Bore detection and thread classification for STL parts.
//!
//! Given a triangulated part, locate its cylindrical bores and decide for
//! each whether it is a smooth hole (to be tapped afterwards) or an
//! already-printed thread.
//!
//! # Example
//!
//! ```ignore
//! use borescan::{analyze, AnalysisSettings};
//!
//! let facets = borescan_stl::read_stl("part.stl")?;
//! let report = analyze(&facets, &AnalysisSettings::default())?;
//!
//! for record in report.hole_records() {
//!     println!("{:?} threaded={}", record.as_tuple(), record.threaded);
//! }
//! ```

pub mod axis;
pub mod cloud;
pub mod cluster;
pub mod cross_section;
pub mod depth;
pub mod error;
pub mod fitting;
pub mod helix;
pub mod pipeline;
pub mod radial;
pub mod report;
pub mod surface;
pub mod void_sweep;

pub use axis::{estimate_axis, AxisEstimate};
pub use cloud::{extract, Bounds, PointCloud};
pub use cluster::{
    cluster_hits, drop_nested_voids, BoreCandidate, BoreHit, ClusterSettings, HitSource,
};
pub use cross_section::{find_cross_sections, CrossSectionSample, CrossSectionSettings};
pub use depth::{scan_depth, DepthScanSettings, VoidSpan};
pub use error::{DetectError, Result};
pub use fitting::{closest_pitch, ThreadSpec, THREAD_SPECS};
pub use helix::{
    angle_levels, classify_band, classify_levels, classify_thread, Handedness, HelixFit,
    HelixSettings, LevelAngle, NotHelicalReason, RadiusBand, ThreadClassification,
};
pub use pipeline::{AnalysisReport, Analyzer, ClassifiedBore};
pub use radial::{scan_rings, RadialScanSettings};
pub use report::{position_list, HoleRecord};
pub use surface::{LevelSpacing, NormalStats, SurfaceSettings};
pub use void_sweep::{
    face_height, select_openings, sweep_face, sweep_radii, FaceSide, VoidHit, VoidSweepSettings,
};

pub use borescan_math::{Axis, Point2, Point3};

use borescan_stl::Facet;
use serde::{Deserialize, Serialize};

/// Which detectors feed the clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSwitches {
    /// Circular cross-sections along the axis.
    pub cross_sections: bool,
    /// Radial ring scan around the axis.
    pub radial_scan: bool,
    /// Void sweep over the end face.
    pub void_sweep: bool,
}

impl Default for DetectorSwitches {
    fn default() -> Self {
        Self {
            cross_sections: true,
            radial_scan: true,
            void_sweep: true,
        }
    }
}

/// Analysis parameters.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// axis = "y"
/// seed_center = [12.0, 4.5]
///
/// [detectors]
/// void_sweep = false
///
/// [helix]
/// radius_band = 1.0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Axis bores are assumed to run along.
    pub axis: Axis,
    /// Known bore center in the axis plane; the cloud centroid otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_center: Option<[f64; 2]>,
    /// Enabled detectors.
    pub detectors: DetectorSwitches,
    /// Cross-section finder.
    pub cross_section: CrossSectionSettings,
    /// Radial ring scan.
    pub radial: RadialScanSettings,
    /// Void sweep.
    pub sweep: VoidSweepSettings,
    /// Depth profile for void-only bores.
    pub depth: DepthScanSettings,
    /// Hit clustering.
    pub cluster: ClusterSettings,
    /// Thread classification.
    pub helix: HelixSettings,
    /// Surface statistics.
    pub surface: SurfaceSettings,
}

impl AnalysisSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if let Some([u, v]) = self.seed_center {
            if !u.is_finite() || !v.is_finite() {
                return Err(DetectError::InvalidSettings(
                    "seed_center must be finite".into(),
                ));
            }
        }
        self.cross_section.validate()?;
        self.radial.validate()?;
        self.sweep.validate()?;
        self.depth.validate()?;
        self.cluster.validate()?;
        self.helix.validate()?;
        self.surface.validate()
    }

    /// Parse settings from TOML. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Seed center as a point.
    pub fn seed(&self) -> Option<Point2> {
        self.seed_center.map(|[u, v]| Point2::new(u, v))
    }
}

/// Analyze parsed facets with the given settings.
///
/// This is the main entry point. It:
/// 1. Flattens the facets into a point cloud
/// 2. Estimates the axis center
/// 3. Runs the enabled detectors
/// 4. Merges their hits into bores
/// 5. Classifies each bore as smooth or threaded
pub fn analyze(facets: &[Facet], settings: &AnalysisSettings) -> Result<AnalysisReport> {
    Analyzer::new(settings.clone())?.analyze_facets(facets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        assert!(AnalysisSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_from_toml() {
        let text = r#"
            axis = "y"
            seed_center = [12.0, 4.5]

            [detectors]
            void_sweep = false

            [helix]
            radius_band = 1.0

            [sweep]
            face_side = "min"
        "#;
        let settings = AnalysisSettings::from_toml_str(text).unwrap();
        assert_eq!(settings.axis, Axis::Y);
        assert_eq!(settings.seed(), Some(Point2::new(12.0, 4.5)));
        assert!(!settings.detectors.void_sweep);
        assert!(settings.detectors.cross_sections);
        assert_eq!(settings.helix.radius_band, 1.0);
        assert_eq!(settings.helix.min_levels, 5);
        assert_eq!(settings.sweep.face_side, FaceSide::Min);
        assert_eq!(settings.cluster, ClusterSettings::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = AnalysisSettings::default();
        let text = toml::to_string(&settings).unwrap();
        let back = AnalysisSettings::from_toml_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_toml_rejects_bad_values() {
        let err = AnalysisSettings::from_toml_str("[cluster]\nmerge_distance = -1.0\n").unwrap_err();
        assert!(matches!(err, DetectError::InvalidSettings(_)));

        let err = AnalysisSettings::from_toml_str("axis = \"w\"").unwrap_err();
        assert!(matches!(err, DetectError::SettingsParse(_)));
    }
}
