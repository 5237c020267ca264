//! curvetrack CLI: track a boundary across an ordered sequence of frames.

use clap::{Args, Parser, Subcommand};
use curvetrack::{
    BSplineCurve, CannyEdgeDetector, CurveTracker, CycleStats, ImagePoint, SiteList, TrackerConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "curvetrack")]
#[command(about = "Moving-edges B-spline tracking of an image boundary across frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a boundary through a sequence of frames.
    Track(CliTrackArgs),

    /// Print the default tracker configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Input frames, in playback order.
    #[arg(long = "frame", required = true, num_args = 1..)]
    frames: Vec<PathBuf>,

    /// Initial boundary point `ROW,COL` on the first frame; repeat in boundary order.
    #[arg(long = "point", required = true, value_parser = parse_point)]
    points: Vec<ImagePoint>,

    /// Path to write per-frame results (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Minimum spacing between sites (px).
    #[arg(long)]
    sample_step: Option<f64>,

    /// Half-length of the per-site search segment (px).
    #[arg(long)]
    range: Option<u32>,

    /// Number of parameter samples used when (re)sampling the curve.
    #[arg(long)]
    points_to_track: Option<usize>,

    /// Control points of the per-frame curve fit.
    #[arg(long)]
    control_points: Option<usize>,

    /// Minimum absolute mask response for an edge.
    #[arg(long)]
    threshold: Option<f64>,

    /// Enable contour recovery at failing ends (Canny edge maps).
    #[arg(long)]
    recovery: bool,

    /// Canny low threshold used by contour recovery.
    #[arg(long)]
    canny_low: Option<f32>,

    /// Canny high threshold used by contour recovery.
    #[arg(long)]
    canny_high: Option<f32>,

    /// Number of curve segments written per frame (samples + 1 points).
    #[arg(long, default_value = "100")]
    polyline_samples: usize,
}

impl CliTrackArgs {
    fn to_config(&self) -> TrackerConfig {
        let mut cfg = TrackerConfig::default();
        if let Some(v) = self.sample_step {
            cfg.sample_step = v;
        }
        if let Some(v) = self.range {
            cfg.moving_edge.range = v;
        }
        if let Some(v) = self.points_to_track {
            cfg.points_to_track = v;
        }
        if let Some(v) = self.control_points {
            cfg.n_control_points = v;
        }
        if let Some(v) = self.threshold {
            cfg.moving_edge.threshold = v;
        }
        if let Some(v) = self.canny_low {
            cfg.recovery.canny_low = v;
        }
        if let Some(v) = self.canny_high {
            cfg.recovery.canny_high = v;
        }
        cfg
    }
}

fn parse_point(s: &str) -> Result<ImagePoint, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL, got `{s}`"))?;
    let row: f64 = row.trim().parse().map_err(|e| format!("bad row `{row}`: {e}"))?;
    let col: f64 = col.trim().parse().map_err(|e| format!("bad col `{col}`: {e}"))?;
    Ok(ImagePoint::new(row, col))
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    frame: String,
    stats: CycleStats,
    sites: &'a SiteList,
    curve: Vec<ImagePoint>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&TrackerConfig::default())?);
    Ok(())
}

// ── track ──────────────────────────────────────────────────────────────

fn load_gray(path: &Path) -> CliResult<image::GrayImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_luma8())
}

fn polyline(curve: Option<&BSplineCurve>, samples: usize) -> Vec<ImagePoint> {
    curve.map(|c| c.polyline(samples)).unwrap_or_default()
}

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    let config = args.to_config();
    let mut tracker = CurveTracker::new(config)?;
    if args.recovery {
        tracker = tracker.with_edge_detector(CannyEdgeDetector);
    }

    let mut json_frames = Vec::with_capacity(args.frames.len());
    for (i, path) in args.frames.iter().enumerate() {
        let gray = load_gray(path)?;
        let (w, h) = gray.dimensions();
        tracing::info!("Frame {}: {} ({}x{})", i, path.display(), w, h);

        let stats = if i == 0 {
            tracker.init_from_points(&gray, &args.points)?
        } else {
            tracker.track(&gray)?
        };
        tracing::info!(
            "  {} sites, {} lost, length {:.1}px{}",
            stats.n_sites,
            stats.lost,
            stats.curve_length,
            if stats.global_resample { " (resampled)" } else { "" }
        );

        let record = FrameRecord {
            frame: path.display().to_string(),
            stats,
            sites: tracker.sites(),
            curve: polyline(tracker.curve(), args.polyline_samples),
        };
        json_frames.push(serde_json::to_value(&record)?);
    }

    let json = serde_json::to_string_pretty(&json_frames)?;
    std::fs::write(&args.out, json)?;
    tracing::info!(
        "Results for {} frames written to {}",
        json_frames.len(),
        args.out.display()
    );
    Ok(())
}
