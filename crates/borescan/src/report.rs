//! Flat hole records for downstream CAD tooling.

use borescan_math::Axis;
use serde::{Deserialize, Serialize};

use crate::fitting::{closest_pitch, ThreadSpec, THREAD_SPECS};
use crate::helix::Handedness;
use crate::pipeline::ClassifiedBore;

/// One classified bore in a serializable, tuple-compatible shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleRecord {
    /// Bore axis.
    pub axis: Axis,
    /// In-plane center `[u, v]`; `[x, y]` for the Z axis.
    pub center: [f64; 2],
    /// Lowest height of the bore along its axis (mm).
    pub start: f64,
    /// Axial extent (mm).
    pub depth: f64,
    /// Diameter (mm).
    pub diameter: f64,
    /// Supporting point count.
    pub confidence: usize,
    /// True for a printed thread.
    pub threaded: bool,
    /// Thread pitch (mm), if threaded.
    pub pitch: Option<f64>,
    /// Thread direction, if threaded.
    pub handedness: Option<Handedness>,
}

impl From<&ClassifiedBore> for HoleRecord {
    fn from(c: &ClassifiedBore) -> Self {
        Self {
            axis: c.bore.axis,
            center: [c.bore.center.x, c.bore.center.y],
            start: c.bore.height_min,
            depth: c.bore.depth(),
            diameter: c.bore.diameter(),
            confidence: c.bore.confidence,
            threaded: c.thread.is_helical(),
            pitch: c.thread.pitch(),
            handedness: c.thread.handedness(),
        }
    }
}

impl HoleRecord {
    /// `[u, v, start, depth, diameter]`, which for the Z axis reads
    /// `[x, y, z_start, depth, diameter]`.
    pub fn as_tuple(&self) -> [f64; 5] {
        [
            self.center[0],
            self.center[1],
            self.start,
            self.depth,
            self.diameter,
        ]
    }

    /// Standard thread whose pitch matches the detected one.
    pub fn pitch_match(&self, relative_tolerance: f64) -> Option<&'static ThreadSpec> {
        closest_pitch(self.pitch?, relative_tolerance)
    }

    /// Standard thread this hole could be tapped for, sized at its tap drill.
    pub fn tap_drill_match(&self, tolerance: f64) -> Option<&'static ThreadSpec> {
        THREAD_SPECS
            .iter()
            .find(|t| t.tap_drill_match(self.diameter, tolerance))
    }
}

/// Position list for a set of records.
pub fn position_list(records: &[HoleRecord]) -> Vec<[f64; 5]> {
    records.iter().map(HoleRecord::as_tuple).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{BoreCandidate, HitSource};
    use crate::helix::{HelixFit, NotHelicalReason, ThreadClassification};
    use borescan_math::Point2;

    fn bore(radius: f64) -> BoreCandidate {
        BoreCandidate {
            axis: Axis::Z,
            center: Point2::new(12.5, -4.0),
            radius,
            height_min: 2.0,
            height_max: 14.0,
            confidence: 400,
            peak_confidence: 64,
            contributions: 12,
            sources: vec![HitSource::CrossSection],
        }
    }

    #[test]
    fn test_smooth_record() {
        let classified = ClassifiedBore {
            bore: bore(2.75),
            thread: ThreadClassification::NotHelical {
                reason: NotHelicalReason::UniformAngle,
                levels: 40,
                slope: None,
                slope_variance: None,
            },
        };
        let record = HoleRecord::from(&classified);
        assert_eq!(record.as_tuple(), [12.5, -4.0, 2.0, 12.0, 5.5]);
        assert!(!record.threaded);
        assert!(record.pitch_match(0.1).is_none());
        assert_eq!(record.tap_drill_match(0.1).map(|t| t.name), Some("1/4-28 UNF"));
    }

    #[test]
    fn test_threaded_record_serializes() {
        let classified = ClassifiedBore {
            bore: bore(3.0),
            thread: ThreadClassification::Helical(HelixFit {
                pitch: 1.02,
                handedness: Handedness::Right,
                slope: 6.16,
                slope_variance: 0.001,
                mean_radius: 3.0,
                levels: 50,
            }),
        };
        let record = HoleRecord::from(&classified);
        assert_eq!(record.pitch_match(0.1).map(|t| t.name), Some("M6x1.0"));

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"handedness\":\"right\""));
        assert!(json.contains("\"axis\":\"z\""));
        let back: HoleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);

        let positions = serde_json::to_string(&position_list(&[record])).unwrap();
        assert_eq!(positions, "[[12.5,-4.0,2.0,12.0,6.0]]");
    }
}
