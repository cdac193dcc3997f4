//! Command-line interface for the PIV pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::core::loaders::Dataset;
use crate::core::writers;
use crate::processors::colormap::{
    lower_fraction, upper_fraction, ColorWindow, LOWER_SLIDER_DEFAULT, UPPER_SLIDER_DEFAULT,
};
use crate::processors::profile::{Orientation, ProfileExtractor};
use crate::processors::streamlines::compute_streamlines;
use crate::visualization;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "piv-pipeline")]
#[command(about = "PIV measurement table reconstruction and query pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Slicing direction, as exposed on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    Horizontal,
    Vertical,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Horizontal => Orientation::Horizontal,
            OrientationArg::Vertical => Orientation::Vertical,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the grid shape and field names of a dataset
    Info {
        /// PIV export table (delimiter auto-detected)
        file: PathBuf,
    },

    /// Extract a profile and export it as delimited text
    Profile {
        /// PIV export table
        file: PathBuf,
        /// Field to slice
        #[arg(short, long)]
        field: String,
        /// Slice index (row for horizontal, column for vertical)
        #[arg(short, long)]
        index: usize,
        /// Slicing direction
        #[arg(short, long, value_enum, default_value = "horizontal")]
        orientation: OrientationArg,
        /// Output directory (defaults to the configured export directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Also render the profile as a PNG line plot
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Render a field as a colormapped heatmap PNG
    Render {
        /// PIV export table
        file: PathBuf,
        /// Field to render
        #[arg(short, long)]
        field: String,
        /// Output PNG path (defaults to `{dataset}_{field}.png`)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Upper color-bound slider position (0-2000)
        #[arg(long, default_value_t = UPPER_SLIDER_DEFAULT)]
        upper: u32,
        /// Lower color-bound slider position (0-2000)
        #[arg(long, default_value_t = LOWER_SLIDER_DEFAULT)]
        lower: u32,
    },

    /// Resample the velocity components and render a vector plot PNG
    Streamlines {
        /// PIV export table
        file: PathBuf,
        /// Output PNG path (defaults to `{dataset}_streamlines.png`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    let result = match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Profile {
            file,
            field,
            index,
            orientation,
            output_dir,
            plot,
        } => cmd_profile(&file, &field, index, orientation.into(), output_dir, plot, &config),
        Commands::Render {
            file,
            field,
            output,
            upper,
            lower,
        } => cmd_render(&file, &field, output, upper, lower, &config),
        Commands::Streamlines { file, output } => cmd_streamlines(&file, output, &config),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_dataset(file: &PathBuf) -> anyhow::Result<Dataset> {
    let spinner = create_spinner("Loading dataset...");
    let dataset = Dataset::load(file)
        .with_context(|| format!("failed to load {}", file.display()));
    spinner.finish_and_clear();
    dataset
}

fn cmd_info(file: &PathBuf) -> anyhow::Result<()> {
    let start = Instant::now();
    let dataset = load_dataset(file)?;
    let store = dataset.store();

    print_summary(
        "Dataset Loaded",
        &[
            ("Name", dataset.name().to_string()),
            ("Grid size", dataset.grid().to_string()),
            ("Scan lines", dataset.rows().to_string()),
            ("Coordinates", store.names()[..2].join(", ")),
            ("Data fields", store.data_names().join(", ")),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_profile(
    file: &PathBuf,
    field: &str,
    index: usize,
    orientation: Orientation,
    output_dir: Option<PathBuf>,
    plot: Option<PathBuf>,
    config: &PipelineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let dataset = load_dataset(file)?;

    let mut extractor = ProfileExtractor::new();
    extractor.select_field(field);
    extractor.set_orientation(orientation);
    let profile = extractor
        .extract(&dataset, index)
        .context("profile extraction failed")?;

    let dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
    let name = profile.file_name(dataset.name());
    let written = writers::save_table(&dir, &name, &profile.columns(), &config.export.separator)
        .context("profile export failed")?;

    if let Some(png) = &plot {
        visualization::render_profile_png(
            png,
            std::slice::from_ref(&profile),
            (config.render.width, config.render.height),
        )
        .context("profile plot failed")?;
    }

    print_summary(
        "Profile Exported",
        &[
            ("Dataset", dataset.name().to_string()),
            ("Field", profile.key.clone()),
            ("Orientation", profile.orientation.file_label().to_string()),
            ("Slice coordinate", format!("{:.6}", profile.cursor)),
            ("Samples", profile.len().to_string()),
            ("Output file", written.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_render(
    file: &PathBuf,
    field: &str,
    output: Option<PathBuf>,
    upper: u32,
    lower: u32,
    config: &PipelineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let dataset = load_dataset(file)?;

    let field_ref = dataset
        .store()
        .get(field)
        .with_context(|| format!("unknown field '{}'", field))?;

    let mut window = ColorWindow::for_field(field_ref);
    if window.set_upper_scale(upper_fraction(upper)).is_none() {
        warn!("upper slider position {} would cross the lower bound, ignored", upper);
    }
    if window.set_lower_scale(lower_fraction(lower)).is_none() {
        warn!("lower slider position {} would cross the upper bound, ignored", lower);
    }

    let output_path = output.unwrap_or_else(|| {
        PathBuf::from(format!("{}_{}.png", dataset.name(), field.replace('/', "_")))
    });

    let spinner = create_spinner("Rendering field...");
    let render_result = visualization::render_field_png(
        &output_path,
        &dataset,
        field,
        &window,
        (config.render.width, config.render.height),
    );
    spinner.finish_and_clear();
    render_result.context("field rendering failed")?;

    let (low, high) = window.bounds();
    print_summary(
        "Field Rendered",
        &[
            ("Dataset", dataset.name().to_string()),
            ("Field", field.to_string()),
            ("Color window", format!("[{:.6}, {:.6}]", low, high)),
            ("Output PNG", output_path.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_streamlines(
    file: &PathBuf,
    output: Option<PathBuf>,
    config: &PipelineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let dataset = load_dataset(file)?;

    let spinner = create_spinner("Resampling velocity components...");
    let grid_result = compute_streamlines(&dataset);
    spinner.finish_and_clear();
    let grid = grid_result.context("streamline resampling failed")?;

    let output_path =
        output.unwrap_or_else(|| PathBuf::from(format!("{}_streamlines.png", dataset.name())));

    visualization::render_streamlines_png(
        &output_path,
        &grid,
        (config.render.width, config.render.height),
    )
    .context("streamline rendering failed")?;

    print_summary(
        "Streamlines Rendered",
        &[
            ("Dataset", dataset.name().to_string()),
            ("Target grid", format!("{} x {}", grid.yi.len(), grid.xi.len())),
            ("Output PNG", output_path.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}
