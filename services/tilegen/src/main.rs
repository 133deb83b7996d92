//! Tile pyramid generator.
//!
//! Opens a georeferenced raster (image file plus world-file sidecar) and
//! renders its web-mercator tile pyramid to an output directory, or
//! prints a summary of the raster with `--inspect`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use raster_source::open_image_raster;
use tile_image::TileFormat;
use tiler::{RasterSummary, RasterTiler, TileOptions};

#[derive(Parser, Debug)]
#[command(name = "tilegen")]
#[command(about = "Render a raster into a web-mercator tile pyramid")]
struct Args {
    /// Input raster (PNG/JPEG/TIFF with a world-file sidecar)
    input: PathBuf,

    /// Output directory for the {z}/{x}/{y} tree
    #[arg(default_value = "tiles")]
    output: PathBuf,

    /// Tile edge length in pixels (power of two)
    #[arg(long, default_value_t = 256)]
    tile_size: u32,

    /// Address tile rows in TMS order (row 0 at the south edge)
    #[arg(long)]
    tms: bool,

    /// Tile image format
    #[arg(long, default_value = "png")]
    format: TileFormatArg,

    /// Lowest zoom level to render (default: derived from the raster)
    #[arg(long)]
    min_zoom: Option<u8>,

    /// Highest zoom level to render (default: derived from the raster)
    #[arg(long)]
    max_zoom: Option<u8>,

    /// Render a single zoom level
    #[arg(long, conflicts_with_all = ["min_zoom", "max_zoom"])]
    zoom: Option<u8>,

    /// Print a summary of the raster and exit
    #[arg(long)]
    inspect: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy)]
struct TileFormatArg(TileFormat);

impl std::str::FromStr for TileFormatArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(TileFormatArg)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let raster = open_image_raster(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;

    if args.inspect {
        let summary = RasterSummary::of(&raster)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let options = TileOptions {
        tile_size: args.tile_size,
        tms: args.tms,
        format: args.format.0,
    };
    let tiler = RasterTiler::new(Box::new(raster), &args.input, &args.output, options)
        .context("initializing tile producer")?;

    let (min_zoom, max_zoom) = match args.zoom {
        Some(z) => (z, z),
        None => (
            args.min_zoom.unwrap_or_else(|| tiler.min_zoom()),
            args.max_zoom.unwrap_or_else(|| tiler.max_zoom()),
        ),
    };
    if min_zoom > max_zoom {
        anyhow::bail!("min zoom {min_zoom} exceeds max zoom {max_zoom}");
    }

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        min_zoom,
        max_zoom,
        "rendering tile pyramid"
    );

    let mut total_written = 0usize;
    for z in min_zoom..=max_zoom {
        let mm = tiler.min_max_coords_for_z(z);
        let coords: Vec<(i64, i64)> = (mm.min.x..=mm.max.x)
            .flat_map(|x| (mm.min.y..=mm.max.y).map(move |y| (x, y)))
            .collect();

        // Tile generation is synchronous per call; the source carries its
        // own locking, so tiles within a zoom render in parallel.
        let written = coords
            .par_iter()
            .map(|&(x, y)| match tiler.tile(z, x, y) {
                Ok(_) => Ok(1usize),
                Err(e) if e.is_skippable() => {
                    warn!(z, x, y, error = %e, "skipping tile");
                    Ok(0)
                }
                Err(e) => Err(e),
            })
            .sum::<Result<usize, _>>()
            .with_context(|| format!("rendering zoom level {z}"))?;

        info!(zoom = z, written, candidates = coords.len(), "zoom level done");
        total_written += written;
    }

    info!(total_written, "tile pyramid complete");
    Ok(())
}
