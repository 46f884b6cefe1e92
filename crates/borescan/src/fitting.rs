//! Common fitting threads and hole-size checks against them.

use serde::Serialize;

/// Dimensions of a standard thread (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThreadSpec {
    /// Designation.
    pub name: &'static str,
    /// Major diameter.
    pub major: f64,
    /// Minor diameter (tap drill size).
    pub minor: f64,
    /// Pitch.
    pub pitch: f64,
}

/// Threads commonly tapped into printed fittings.
pub const THREAD_SPECS: [ThreadSpec; 3] = [
    ThreadSpec {
        name: "10-32 UNF",
        major: 4.826,
        minor: 4.0,
        pitch: 0.794,
    },
    ThreadSpec {
        name: "1/4-28 UNF",
        major: 6.35,
        minor: 5.49,
        pitch: 0.907,
    },
    ThreadSpec {
        name: "M6x1.0",
        major: 6.0,
        minor: 5.0,
        pitch: 1.0,
    },
];

impl ThreadSpec {
    /// Look up a thread by designation, ignoring case.
    pub fn by_name(name: &str) -> Option<&'static ThreadSpec> {
        THREAD_SPECS.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// A hole of `diameter` leaves material for this thread to be tapped.
    pub fn fits(&self, diameter: f64) -> bool {
        diameter >= self.minor
    }

    /// `diameter` is within `tolerance` of the tap drill size.
    pub fn tap_drill_match(&self, diameter: f64, tolerance: f64) -> bool {
        (diameter - self.minor).abs() < tolerance
    }
}

/// The listed thread whose pitch is nearest `pitch`, if within
/// `relative_tolerance` of it.
pub fn closest_pitch(pitch: f64, relative_tolerance: f64) -> Option<&'static ThreadSpec> {
    THREAD_SPECS
        .iter()
        .map(|t| (t, (t.pitch - pitch).abs()))
        .filter(|(t, d)| *d <= t.pitch * relative_tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}
