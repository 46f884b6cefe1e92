//! Merging detector hits into bore candidates.

use std::cmp::Ordering;

use borescan_math::{Axis, Point2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cross_section::CrossSectionSample;
use crate::error::{ensure, Result};

/// Which detector produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSource {
    /// Circular cross-section along the bore.
    CrossSection,
    /// Void on a face.
    VoidSweep,
    /// Radial ring scan.
    RadialScan,
}

/// A single detector observation of a possible bore.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoreHit {
    /// In-plane center.
    pub center: Point2,
    /// Radius (mm).
    pub radius: f64,
    /// Lowest height covered (mm).
    pub height_min: f64,
    /// Highest height covered (mm).
    pub height_max: f64,
    /// Supporting point count.
    pub confidence: usize,
    /// Producing detector.
    pub source: HitSource,
}

impl From<&CrossSectionSample> for BoreHit {
    fn from(s: &CrossSectionSample) -> Self {
        Self {
            center: s.center,
            radius: s.avg_radius,
            height_min: s.height,
            height_max: s.height,
            confidence: s.point_count,
            source: HitSource::CrossSection,
        }
    }
}

/// Clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Hits closer than this to a candidate center join it (mm).
    pub merge_distance: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            merge_distance: 2.5,
        }
    }
}

impl ClusterSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        ensure(self.merge_distance > 0.0, "cluster.merge_distance must be positive")
    }
}

/// A physical bore hypothesis built from one or more hits.
#[derive(Debug, Clone, PartialEq)]
pub struct BoreCandidate {
    /// Axis the bore runs along.
    pub axis: Axis,
    /// In-plane center, from the strongest contributor.
    pub center: Point2,
    /// Radius (mm), from the strongest contributor.
    pub radius: f64,
    /// Union of contributor height ranges.
    pub height_min: f64,
    /// Union of contributor height ranges.
    pub height_max: f64,
    /// Sum of contributor point counts.
    pub confidence: usize,
    /// Point count of the strongest contributor.
    pub peak_confidence: usize,
    /// Number of merged hits.
    pub contributions: usize,
    /// Detectors that contributed, without repeats.
    pub sources: Vec<HitSource>,
}

impl BoreCandidate {
    fn seed(axis: Axis, hit: &BoreHit) -> Self {
        Self {
            axis,
            center: hit.center,
            radius: hit.radius,
            height_min: hit.height_min,
            height_max: hit.height_max,
            confidence: hit.confidence,
            peak_confidence: hit.confidence,
            contributions: 1,
            sources: vec![hit.source],
        }
    }

    fn absorb(&mut self, hit: &BoreHit) {
        self.height_min = self.height_min.min(hit.height_min);
        self.height_max = self.height_max.max(hit.height_max);
        self.confidence += hit.confidence;
        self.contributions += 1;
        if hit.confidence > self.peak_confidence {
            self.center = hit.center;
            self.radius = hit.radius;
            self.peak_confidence = hit.confidence;
        }
        if !self.sources.contains(&hit.source) {
            self.sources.push(hit.source);
        }
    }

    /// Axial extent (mm).
    pub fn depth(&self) -> f64 {
        self.height_max - self.height_min
    }

    /// Diameter (mm).
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }
}

/// Total order on hits: strongest first, then by position.
fn hit_order(a: &BoreHit, b: &BoreHit) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then(a.center.x.total_cmp(&b.center.x))
        .then(a.center.y.total_cmp(&b.center.y))
        .then(a.height_min.total_cmp(&b.height_min))
        .then(a.height_max.total_cmp(&b.height_max))
        .then(a.radius.total_cmp(&b.radius))
        .then(a.source.cmp(&b.source))
}

/// Greedily merge hits into bore candidates.
///
/// Hits are visited strongest first. Each joins the nearest existing
/// candidate when that is within `merge_distance`; ties go to the candidate
/// created first. The result does not depend on input order and is sorted
/// by confidence, highest first.
pub fn cluster_hits(hits: &[BoreHit], axis: Axis, settings: &ClusterSettings) -> Vec<BoreCandidate> {
    let mut ordered = hits.to_vec();
    ordered.sort_by(hit_order);

    let mut candidates: Vec<BoreCandidate> = Vec::new();
    for hit in &ordered {
        let mut nearest: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            let d = (c.center - hit.center).norm();
            if nearest.map_or(true, |(_, best)| d < best) {
                nearest = Some((i, d));
            }
        }
        match nearest {
            Some((i, d)) if d < settings.merge_distance => candidates[i].absorb(hit),
            _ => candidates.push(BoreCandidate::seed(axis, hit)),
        }
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.center.x.total_cmp(&b.center.x))
            .then(a.center.y.total_cmp(&b.center.y))
    });

    debug!(hits = hits.len(), candidates = candidates.len(), "clustered hits");
    candidates
}

/// Drop candidates seen only by the void sweep whose center lies inside
/// the radius of a stronger kept candidate.
///
/// A sample disk smaller than a wide bore also fits off-center inside it; those
/// hits describe the same bore, not new ones. `candidates` must be sorted
/// strongest first, as [`cluster_hits`] returns them.
pub fn drop_nested_voids(candidates: Vec<BoreCandidate>) -> Vec<BoreCandidate> {
    let before = candidates.len();
    let mut kept: Vec<BoreCandidate> = Vec::with_capacity(before);
    for candidate in candidates {
        let void_only = candidate.sources == [HitSource::VoidSweep];
        if void_only
            && kept
                .iter()
                .any(|k| (k.center - candidate.center).norm() < k.radius)
        {
            continue;
        }
        kept.push(candidate);
    }
    if kept.len() < before {
        debug!(dropped = before - kept.len(), "dropped nested void candidates");
    }
    kept
}
