use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use frame_pipeline::{
    annotate, AnnotateConfig, OrderingConfig, PipelineConfig, QualityConfig, Strategy,
};
use gif_export::GifOptions;
use imagery_client::{ChipRequest, GbdxClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gifr")]
#[command(about = "Create an animated flyover GIF of a landmark from point coordinates")]
struct Cli {
    /// Latitude and longitude in decimal degrees, e.g. "40.689, -74.044"
    #[arg(long)]
    coord: String,

    /// Ground resolution in meters per pixel; raise it to zoom out
    #[arg(long, default_value = "0.3")]
    resolution: f64,

    /// Width and height of the square chips in pixels. Doubling the width
    /// quadruples the download and file size
    #[arg(long, default_value = "512")]
    width: u32,

    /// Ordering method: flyover, panby or date
    #[arg(long, default_value = "flyover")]
    order: Strategy,

    /// Output GIF path
    #[arg(short, long, default_value = "my.gif")]
    output: PathBuf,

    /// GBDX access token
    #[arg(long, env = "GBDX_TOKEN", hide_env_values = true)]
    token: String,

    /// Optional RGBA logo overlaid on the top-right of every frame
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Fraction of pure-black pixels above which a chip is thrown out
    #[arg(long, default_value = "0.3")]
    no_data_fraction: f64,

    /// Luma variance below which a chip counts as flat grey
    #[arg(long, default_value = "50.0")]
    grey_variance: f64,

    /// Mean luma above which a chip counts as overexposed
    #[arg(long, default_value = "220.0")]
    overexposed_mean: f64,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let started = Instant::now();
    let (lat, lon) = parse_coord(&cli.coord)?;

    let client = GbdxClient::new(&cli.token);
    let records = client.search(lat, lon).await?;
    let pairs = imagery_client::pair_records(&records);
    if pairs.is_empty() {
        bail!("no usable multispectral/panchromatic pairs for {lat}, {lon}");
    }
    println!("Found {} image pairs", pairs.len());

    let request = ChipRequest {
        lat,
        lon,
        width: cli.width,
        resolution: cli.resolution,
    };
    let raw = client.fetch_all(&pairs, &request).await;

    let config = PipelineConfig {
        strategy: cli.order,
        quality: QualityConfig {
            no_data_fraction: cli.no_data_fraction,
            grey_variance: cli.grey_variance,
            overexposed_mean: cli.overexposed_mean,
        },
        ordering: OrderingConfig::default(),
        annotate: AnnotateConfig::default(),
    };
    let sequence = frame_pipeline::run(raw, &config)
        .context("could not build a frame sequence for this location")?;
    println!(
        "Using {} chips for the {} order method",
        sequence.len(),
        cli.order
    );

    let mut frames: Vec<_> = sequence.frames.into_iter().map(|f| f.image).collect();
    if let Some(logo_path) = &cli.logo {
        let logo = image::open(logo_path)
            .with_context(|| format!("could not open logo {}", logo_path.display()))?
            .to_rgba8();
        frames = frames
            .iter()
            .map(|frame| annotate::overlay_logo(frame, &logo, 20))
            .collect();
    }

    gif_export::encode(&cli.output, &frames, &GifOptions::default())?;

    println!(
        "Wrote {} in {:.1}s",
        cli.output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn parse_coord(coord: &str) -> Result<(f64, f64)> {
    let (lat, lon) = coord
        .split_once(',')
        .context("expected coordinates as \"lat, lon\"")?;
    let lat: f64 = lat.trim().parse().context("unparseable latitude")?;
    let lon: f64 = lon.trim().parse().context("unparseable longitude")?;
    if !(-90.0..=90.0).contains(&lat) {
        bail!("latitude {lat} out of range [-90, 90]");
    }
    if !(-180.0..=180.0).contains(&lon) {
        bail!("longitude {lon} out of range [-180, 180]");
    }
    Ok((lat, lon))
}
