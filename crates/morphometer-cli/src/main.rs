//! morphometer CLI: measure one segmented Daphnia specimen.

use clap::{Args, Parser, Subcommand};
use morphometer::{
    BinaryMask, MeasureConfig, Measurer, SegmentationMask, SpecimenId, SpecimenInputs,
};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "morphometer")]
#[command(about = "Morphometric measurements (size, landmarks, pedestal) of segmented Daphnia images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure one specimen and write its record as JSON.
    Measure(CliMeasureArgs),

    /// Estimate pixels-per-mm from a micrometer photograph.
    Calibrate(CliCalibrateArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliMeasureArgs {
    /// Full-body photograph.
    #[arg(long)]
    photo: Option<PathBuf>,

    /// Segmentation mask (label image or RGB-encoded labels).
    #[arg(long)]
    mask: PathBuf,

    /// Eye-only mask; overrides the eye channel of --mask.
    #[arg(long)]
    eye_mask: Option<PathBuf>,

    /// Micrometer photograph for automatic calibration.
    #[arg(long)]
    micrometer: Option<PathBuf>,

    /// Manual calibration; takes precedence over --micrometer.
    #[arg(long)]
    pixels_per_mm: Option<f64>,

    /// Specimen identifier (defaults to the mask file stem).
    #[arg(long)]
    id: Option<String>,

    /// Extra identity fields copied to the record (KEY=VALUE, repeatable).
    #[arg(long = "field", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,

    #[command(flatten)]
    config: CliConfigArgs,

    /// Path to write the measurement record (JSON).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct CliCalibrateArgs {
    /// Micrometer photograph.
    #[arg(long)]
    micrometer: PathBuf,

    #[command(flatten)]
    config: CliConfigArgs,
}

#[derive(Debug, Clone, Args)]
struct CliConfigArgs {
    /// Configuration JSON (missing fields use defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Physical ruler ticks per millimeter.
    #[arg(long)]
    ticks_per_mm: Option<f64>,

    /// Boundary tracer threshold on the smoothed mask value.
    #[arg(long)]
    trace_threshold: Option<f64>,

    /// Maximum active-contour iterations for the pedestal height.
    #[arg(long)]
    snake_max_iterations: Option<usize>,
}

impl CliConfigArgs {
    fn to_config(&self) -> CliResult<MeasureConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                tracing::info!("Loading config: {}", path.display());
                MeasureConfig::from_json_file(path)?
            }
            None => MeasureConfig::default(),
        };
        if let Some(v) = self.ticks_per_mm {
            if !(v.is_finite() && v > 0.0) {
                return Err(format!("--ticks-per-mm must be positive, got {}", v).into());
            }
            cfg.calibration.period.ticks_per_mm = v;
        }
        if let Some(v) = self.trace_threshold {
            cfg.trace.threshold = v;
        }
        if let Some(v) = self.snake_max_iterations {
            cfg.pedestal.snake.max_iterations = v;
        }
        Ok(cfg)
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if k.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((k.to_string(), v.to_string()))
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
        Commands::Measure(args) => run_measure(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

fn load_gray(path: &Path) -> CliResult<image::GrayImage> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path)?.to_luma8();
    tracing::info!("Image size: {}x{}", img.width(), img.height());
    Ok(img)
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", MeasureConfig::default().to_json_pretty()?);
    Ok(())
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(args: &CliCalibrateArgs) -> CliResult<()> {
    let measurer = Measurer::with_config(args.config.to_config()?);
    let img = load_gray(&args.micrometer)?;
    let cal = measurer.calibrate(&img)?;
    tracing::info!(lines = cal.lines_used, "Calibration succeeded");
    println!("{}", cal.pixels_per_mm);
    Ok(())
}

// ── measure ────────────────────────────────────────────────────────────

fn run_measure(args: &CliMeasureArgs) -> CliResult<()> {
    let measurer = Measurer::with_config(args.config.to_config()?);

    // Unreadable inputs are fatal; a mask that decodes but fails validation
    // only leaves the mask-derived fields undefined.
    tracing::info!("Loading mask: {}", args.mask.display());
    let mask_img = image::open(&args.mask)?;
    let mut inputs = SpecimenInputs::new(SegmentationMask::from_dynamic(&mask_img));
    if let Some(path) = &args.photo {
        inputs = inputs.with_photo(load_gray(path)?);
    }
    if let Some(path) = &args.eye_mask {
        inputs = inputs.with_eye_mask(BinaryMask::from_gray(&load_gray(path)?));
    }
    if let Some(path) = &args.micrometer {
        inputs = inputs.with_micrometer(load_gray(path)?);
    }
    inputs.pixels_per_mm = args.pixels_per_mm;

    let id = match &args.id {
        Some(id) => id.clone(),
        None => args
            .mask
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let mut specimen = SpecimenId::new(id);
    for (k, v) in &args.fields {
        specimen = specimen.with_field(k, v);
    }

    let record = measurer.measure(specimen, inputs);
    tracing::info!(
        "Measured {}: length={:?} mm, area={:?} mm², pedestal height={:?} mm",
        record.specimen_id,
        record.animal_length,
        record.animal_area,
        record.pedestal_height
    );
    for (field, reason) in &record.failures {
        tracing::info!("  {} undefined: {}", field, reason);
    }

    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&args.out, json)?;
    tracing::info!("Results written to {}", args.out.display());
    Ok(())
}
