//! borescan CLI - find bores in STL parts and tell threads from smooth holes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use borescan::{
    classify_band, extract, select_openings, sweep_face, AnalysisReport, AnalysisSettings,
    Analyzer, Axis, FaceSide, HoleRecord, LevelSpacing, NormalStats, Point2, RadiusBand,
    ThreadClassification,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "borescan")]
#[command(about = "Find bores in STL parts and classify them as smooth or threaded", long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and classify bores
    Analyze {
        /// Input STL file
        file: PathBuf,
        /// Axis the bores run along
        #[arg(short, long)]
        axis: Option<Axis>,
        /// Known bore center in the axis plane, as "u,v"
        #[arg(short, long, value_parser = parse_center)]
        center: Option<[f64; 2]>,
        /// Settings file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip the face void sweep
        #[arg(long)]
        no_sweep: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Write [u, v, start, depth, diameter] tuples to this file
        #[arg(long)]
        positions: Option<PathBuf>,
    },
    /// Show mesh statistics
    Info {
        /// Input STL file
        file: PathBuf,
        /// Axis for level and normal statistics
        #[arg(short, long, default_value = "z")]
        axis: Axis,
    },
    /// Classify the wall around a known axis
    Helix {
        /// Input STL file
        file: PathBuf,
        /// Bore center in the axis plane, as "u,v"
        #[arg(short, long, value_parser = parse_center)]
        center: [f64; 2],
        /// Expected bore radius (mm)
        #[arg(short, long)]
        radius: f64,
        /// Axis the bore runs along
        #[arg(short, long, default_value = "z")]
        axis: Axis,
        /// Settings file (TOML); only the helix table is used
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Sweep an end face for round openings
    Sweep {
        /// Input STL file
        file: PathBuf,
        /// SampleDisk radii to try (mm); 3, 4, 5 and 6 when omitted
        #[arg(short, long, num_args = 1..)]
        radius: Vec<f64>,
        /// Axis normal to the face
        #[arg(short, long, default_value = "z")]
        axis: Axis,
        /// Which end of the part to sweep
        #[arg(long, value_enum, default_value_t = Side::Max)]
        side: Side,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Min,
    Max,
}

impl From<Side> for FaceSide {
    fn from(s: Side) -> Self {
        match s {
            Side::Min => FaceSide::Min,
            Side::Max => FaceSide::Max,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            file,
            axis,
            center,
            config,
            no_sweep,
            json,
            positions,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            if let Some(axis) = axis {
                settings.axis = axis;
            }
            if center.is_some() {
                settings.seed_center = center;
            }
            if no_sweep {
                settings.detectors.void_sweep = false;
            }
            analyze_file(&file, settings, json, positions.as_deref())?;
        }
        Commands::Info { file, axis } => {
            show_info(&file, axis)?;
        }
        Commands::Helix {
            file,
            center,
            radius,
            axis,
            config,
        } => {
            let settings = load_settings(config.as_deref())?;
            classify_wall(&file, axis, center, radius, &settings)?;
        }
        Commands::Sweep {
            file,
            radius,
            axis,
            side,
        } => {
            sweep_file(&file, &radius, axis, side.into())?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_center(s: &str) -> std::result::Result<[f64; 2], String> {
    let (u, v) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"u,v\", got '{s}'"))?;
    let parse = |t: &str| {
        t.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate '{t}': {e}"))
    };
    Ok([parse(u)?, parse(v)?])
}

fn load_settings(path: Option<&Path>) -> Result<AnalysisSettings> {
    let Some(path) = path else {
        return Ok(AnalysisSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    AnalysisSettings::from_toml_str(&text)
        .with_context(|| format!("loading settings {}", path.display()))
}

fn analyze_file(
    file: &Path,
    settings: AnalysisSettings,
    json: bool,
    positions: Option<&Path>,
) -> Result<()> {
    let analyzer = Analyzer::new(settings)?;
    let report = analyzer
        .analyze_path(file)
        .with_context(|| format!("analyzing {}", file.display()))?;
    let records = report.hole_records();

    if json {
        let out = serde_json::json!({
            "file": file.display().to_string(),
            "axis": report.axis,
            "point_count": report.point_count,
            "bores": records,
            "normals": report.normals,
            "spacing": report.spacing,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_report(file, &report, &records);
    }

    if let Some(out) = positions {
        let list = borescan::position_list(&records);
        std::fs::write(out, serde_json::to_string_pretty(&list)?)
            .with_context(|| format!("writing {}", out.display()))?;
        if !json {
            println!("\nWrote {} positions to {}", list.len(), out.display());
        }
    }

    Ok(())
}

fn print_report(file: &Path, report: &AnalysisReport, records: &[HoleRecord]) {
    println!("Bore analysis: {}", file.display());
    println!("  Points: {}", report.point_count);
    if let Some(b) = report.bounds {
        println!(
            "  Bounds: [{:.2}, {:.2}, {:.2}] to [{:.2}, {:.2}, {:.2}]",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        );
    }
    if let Some(c) = report.axis_center {
        println!("  Axis: {} through ({:.3}, {:.3})", report.axis, c.x, c.y);
    }

    if records.is_empty() {
        println!("\nNo bores found.");
        return;
    }

    println!("\nBores ({}):", records.len());
    for (i, (rec, bore)) in records.iter().zip(&report.bores).enumerate() {
        println!(
            "  #{}: center ({:.3}, {:.3})  start {:.2}  depth {:.2}  diameter {:.2}  confidence {}",
            i + 1,
            rec.center[0],
            rec.center[1],
            rec.start,
            rec.depth,
            rec.diameter,
            rec.confidence
        );
        match &bore.thread {
            ThreadClassification::Helical(fit) => {
                print!(
                    "       threaded: pitch {:.3} mm, {}-hand",
                    fit.pitch, fit.handedness
                );
                match rec.pitch_match(0.1) {
                    Some(spec) => println!(" (matches {})", spec.name),
                    None => println!(),
                }
            }
            ThreadClassification::NotHelical { reason, .. } => {
                print!("       smooth ({reason})");
                match rec.tap_drill_match(0.25) {
                    Some(spec) => println!(", tap drill size for {}", spec.name),
                    None => println!(),
                }
            }
        }
    }

    if let Some(n) = report.normals {
        println!(
            "\nNormals: {} radial, {} angled{}",
            n.radial,
            n.angled,
            if n.radial_dominant() {
                " (vertical walls dominate)"
            } else {
                ""
            }
        );
    }

    println!("\n// Hole positions [u, v, start, depth, diameter]");
    for rec in records {
        let t = rec.as_tuple();
        println!(
            "  [{:.3}, {:.3}, {:.3}, {:.3}, {:.3}],",
            t[0], t[1], t[2], t[3], t[4]
        );
    }
}

fn show_info(file: &Path, axis: Axis) -> Result<()> {
    let mesh = borescan_stl::read_stl_mesh(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let cloud = extract(&mesh.facets);
    let settings = AnalysisSettings::default();

    println!("STL file: {}", file.display());
    println!("  Format: {:?}", mesh.format);
    if let Some(name) = &mesh.name {
        println!("  Solid: {}", name);
    }
    println!("  Facets: {}", mesh.facets.len());
    println!("  Points: {}", cloud.len());

    if let (Some(b), Some(c)) = (cloud.bounds(), cloud.centroid()) {
        let size = b.size();
        println!(
            "  Bounds: [{:.2}, {:.2}, {:.2}] to [{:.2}, {:.2}, {:.2}]",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        );
        println!("  Size: {:.2} x {:.2} x {:.2}", size.x, size.y, size.z);
        println!("  Centroid: ({:.3}, {:.3}, {:.3})", c.x, c.y, c.z);
    }

    let normals = NormalStats::from_facets(&mesh.facets, axis, &settings.surface);
    println!("\nNormals relative to {axis}:");
    println!("  Radial: {}", normals.radial);
    println!("  Angled: {}", normals.angled);
    println!("  Mean |axial|: {:.3}", normals.mean_axial);

    if let Some(spacing) = LevelSpacing::from_cloud(&cloud, axis, &settings.surface) {
        println!("\nLevels along {axis}:");
        println!("  Count: {}", spacing.levels);
        println!("  Mean spacing: {:.3}", spacing.mean);
        println!("  Spacing variance: {:.3}", spacing.variance);
        if spacing.suggests_thread(&settings.surface) {
            println!("  Regular spacing suggests printed threads");
        }
    }

    Ok(())
}

fn classify_wall(
    file: &Path,
    axis: Axis,
    center: [f64; 2],
    radius: f64,
    settings: &AnalysisSettings,
) -> Result<()> {
    let facets =
        borescan_stl::read_stl(file).with_context(|| format!("reading {}", file.display()))?;
    let cloud = extract(&facets);
    let center = Point2::new(center[0], center[1]);
    let band = RadiusBand::around(radius, settings.helix.radius_band);

    println!(
        "Wall around {} axis at ({:.3}, {:.3}), radius {:.2} to {:.2}",
        axis, center.x, center.y, band.min, band.max
    );
    match classify_band(&cloud, axis, center, band, &settings.helix) {
        ThreadClassification::Helical(fit) => {
            println!("  Helical: yes");
            println!("  Pitch: {:.3} mm", fit.pitch);
            println!("  Handedness: {}", fit.handedness);
            println!("  Slope: {:.4} rad/mm (variance {:.5})", fit.slope, fit.slope_variance);
            println!("  Levels: {}", fit.levels);
            println!("  Mean radius: {:.3}", fit.mean_radius);
        }
        ThreadClassification::NotHelical {
            reason,
            levels,
            slope,
            slope_variance,
        } => {
            println!("  Helical: no ({reason})");
            println!("  Levels: {levels}");
            if let (Some(s), Some(v)) = (slope, slope_variance) {
                println!("  Slope: {:.4} rad/mm (variance {:.5})", s, v);
            }
        }
    }

    Ok(())
}

fn sweep_file(file: &Path, radii: &[f64], axis: Axis, side: FaceSide) -> Result<()> {
    let facets =
        borescan_stl::read_stl(file).with_context(|| format!("reading {}", file.display()))?;
    let cloud = extract(&facets);
    let mut settings = AnalysisSettings::default().sweep;
    settings.face_side = side;
    if !radii.is_empty() {
        settings.sample_radii = radii.to_vec();
    }
    settings.validate()?;

    let mut per_radius = Vec::with_capacity(settings.sample_radii.len());
    for &radius in &settings.sample_radii {
        let mut hits = sweep_face(&cloud, axis, radius, &settings)?;
        hits.sort_by(|a, b| b.annulus_count.cmp(&a.annulus_count));
        println!("SampleDisk radius {radius:.1} mm: {} void locations", hits.len());
        for (i, h) in hits.iter().take(5).enumerate() {
            println!(
                "  #{}: ({:.1}, {:.1})  inner {}  rim {}  ratio {:.1}",
                i + 1,
                h.center.x,
                h.center.y,
                h.inner_count,
                h.annulus_count,
                h.ratio()
            );
        }
        per_radius.push(hits);
    }

    let openings = select_openings(per_radius, settings.min_separation);
    println!("\nOpenings ({}):", openings.len());
    for (i, h) in openings.iter().enumerate() {
        println!(
            "  #{}: ({:.2}, {:.2})  sample {:.1}  rim radius {:.2}  confidence {}",
            i + 1,
            h.center.x,
            h.center.y,
            h.sample_radius,
            h.rim_radius,
            h.annulus_count
        );
    }

    Ok(())
}
