//! The parameterized analysis pipeline.
//!
//! extract → axis → {cross sections, radial scan, void sweep} → cluster →
//! depth for void-only bores → classify.

use std::path::Path;

use borescan_math::{Axis, Point2};
use borescan_stl::Facet;
use tracing::{debug, info, warn};

use crate::axis::estimate_axis;
use crate::cloud::{extract, Bounds, PointCloud};
use crate::cluster::{cluster_hits, drop_nested_voids, BoreCandidate, BoreHit, HitSource};
use crate::cross_section::find_cross_sections;
use crate::depth::scan_depth;
use crate::error::Result;
use crate::helix::{classify_thread, ThreadClassification};
use crate::radial::scan_rings;
use crate::report::HoleRecord;
use crate::surface::{LevelSpacing, NormalStats};
use crate::void_sweep::sweep_radii;
use crate::AnalysisSettings;

/// A bore with its thread verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedBore {
    /// The merged bore.
    pub bore: BoreCandidate,
    /// Smooth or threaded.
    pub thread: ThreadClassification,
}

/// Everything one analysis run found.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Points in the cloud (three per facet).
    pub point_count: usize,
    /// Part bounds, `None` for an empty mesh.
    pub bounds: Option<Bounds>,
    /// Axis the analysis ran along.
    pub axis: Axis,
    /// Estimated axis center, `None` for an empty mesh.
    pub axis_center: Option<Point2>,
    /// Bores, highest confidence first.
    pub bores: Vec<ClassifiedBore>,
    /// Facet normal statistics, when facets were available.
    pub normals: Option<NormalStats>,
    /// Height level regularity, `None` with fewer than two levels.
    pub spacing: Option<LevelSpacing>,
}

impl AnalysisReport {
    /// Flat records for every bore.
    pub fn hole_records(&self) -> Vec<HoleRecord> {
        self.bores.iter().map(HoleRecord::from).collect()
    }

    /// Number of bores classified as threaded.
    pub fn threaded_count(&self) -> usize {
        self.bores.iter().filter(|b| b.thread.is_helical()).count()
    }
}

/// Runs the pipeline with one validated set of settings.
#[derive(Debug, Clone)]
pub struct Analyzer {
    settings: AnalysisSettings,
}

impl Analyzer {
    /// Validate `settings` and build an analyzer.
    pub fn new(settings: AnalysisSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Settings in use.
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Read and analyze an STL file.
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<AnalysisReport> {
        let facets = borescan_stl::read_stl(path)?;
        self.analyze_facets(&facets)
    }

    /// Parse and analyze STL bytes.
    pub fn analyze_bytes(&self, data: &[u8]) -> Result<AnalysisReport> {
        let facets = borescan_stl::parse_stl(data)?;
        self.analyze_facets(&facets)
    }

    /// Analyze parsed facets.
    pub fn analyze_facets(&self, facets: &[Facet]) -> Result<AnalysisReport> {
        let cloud = extract(facets);
        let mut report = self.analyze_cloud(&cloud)?;
        report.normals = Some(NormalStats::from_facets(
            facets,
            self.settings.axis,
            &self.settings.surface,
        ));
        Ok(report)
    }

    /// Analyze a point cloud.
    pub fn analyze_cloud(&self, cloud: &PointCloud) -> Result<AnalysisReport> {
        let s = &self.settings;
        let axis = s.axis;
        let spacing = LevelSpacing::from_cloud(cloud, axis, &s.surface);

        let Some(estimate) = estimate_axis(cloud, axis, s.seed()) else {
            info!("empty point cloud, nothing to analyze");
            return Ok(AnalysisReport {
                point_count: 0,
                bounds: None,
                axis,
                axis_center: None,
                bores: Vec::new(),
                normals: None,
                spacing,
            });
        };

        let mut hits: Vec<BoreHit> = Vec::new();
        if s.detectors.cross_sections {
            let samples = find_cross_sections(cloud, &estimate, &s.cross_section);
            hits.extend(samples.iter().map(BoreHit::from));
        }
        if s.detectors.radial_scan {
            hits.extend(scan_rings(cloud, &estimate, &s.radial));
        }
        if s.detectors.void_sweep {
            let voids = sweep_radii(cloud, axis, &s.sweep)?;
            hits.extend(voids.iter().map(BoreHit::from));
        }
        debug!(hits = hits.len(), "collected detector hits");

        let mut candidates = drop_nested_voids(cluster_hits(&hits, axis, &s.cluster));
        for bore in candidates
            .iter_mut()
            .filter(|b| b.sources == [HitSource::VoidSweep])
        {
            match scan_depth(
                cloud,
                axis,
                bore.center,
                bore.radius,
                s.sweep.face_side,
                &s.depth,
            ) {
                Ok(spans) => {
                    if let Some(span) = spans.first() {
                        bore.height_min = bore.height_min.min(span.bottom());
                        bore.height_max = bore.height_max.max(span.top());
                    }
                }
                // The opening itself is still reported, at face height.
                Err(err) => warn!(u = bore.center.x, v = bore.center.y, %err, "depth scan skipped"),
            }
        }

        let bores: Vec<ClassifiedBore> = candidates
            .into_iter()
            .map(|bore| {
                let thread = classify_thread(cloud, &bore, &s.helix);
                ClassifiedBore { bore, thread }
            })
            .collect();

        let report = AnalysisReport {
            point_count: cloud.len(),
            bounds: cloud.bounds(),
            axis,
            axis_center: Some(estimate.center),
            bores,
            normals: None,
            spacing,
        };
        info!(
            points = report.point_count,
            bores = report.bores.len(),
            threaded = report.threaded_count(),
            "analysis complete"
        );
        Ok(report)
    }
}
