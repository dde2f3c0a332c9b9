mod tracing_setup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::info;

use lmbake_driver::{BakeConfig, DriverError};
use tracing_setup::ensure_logging_hooks;

/// Bakes static lightmaps for a level using hardware ray tracing.
#[derive(Parser, Debug)]
#[command(name = "bake", version, about)]
struct Args {
    /// Binary level container (vertices/indices/surfaces/lights/portals).
    input_level: PathBuf,
    /// Destination path for the baked lightmap atlas.
    output_lightmaps: PathBuf,
    /// Samples per pixel for shadow, bounce, and AO passes.
    #[arg(long, default_value_t = 16)]
    samples: u32,
    /// Number of indirect light bounces beyond the first.
    #[arg(long, default_value_t = 1)]
    bounces: u32,
    /// Atlas page edge length in texels; must be a power of two.
    #[arg(long, default_value_t = 1024)]
    size: u32,
    /// Write a tone-mapped PNG per atlas page alongside the binary output.
    #[arg(long)]
    debug_atlas: bool,
}

/// Top-level error aggregating every crate's failure modes, with an exit
/// code attached per class, so callers can distinguish input, device, and
/// packing failures without parsing stderr.
#[derive(Debug, Error)]
enum AppError {
    #[error("reading {}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing level container")]
    InputFormat(#[source] lmbake_io::IoError),
    #[error(transparent)]
    Gpu(lmbake_gpu::GpuError),
    #[error(transparent)]
    Packing(#[source] lmbake_mesh::MeshError),
    #[error("writing {}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            AppError::ReadInput { .. } | AppError::InputFormat(_) => 1,
            AppError::Gpu(_) => 2,
            AppError::Packing(_) => 3,
            AppError::WriteOutput { .. } => 4,
        }
    }
}

impl From<DriverError> for AppError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Gpu(e) => AppError::Gpu(e),
            DriverError::Mesh(e) => AppError::Packing(e),
        }
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    info!(input = %args.input_level.display(), "reading level");
    let bytes = std::fs::read(&args.input_level).map_err(|source| AppError::ReadInput {
        path: args.input_level.clone(),
        source,
    })?;
    let (mut mesh, lights) = lmbake_io::read_level(&bytes, args.size).map_err(AppError::InputFormat)?;

    let config = BakeConfig {
        sample_count: args.samples,
        bounce_count: args.bounces,
        atlas_size: args.size,
        debug_atlas: args.debug_atlas,
        ..BakeConfig::default()
    };

    info!(surfaces = mesh.surface_count(), lights = lights.len(), "starting bake");
    let pages = lmbake_driver::bake(&mut mesh, &lights, &config)?;

    let output = lmbake_io::write_lightmap_output(&mesh, &pages);
    std::fs::write(&args.output_lightmaps, &output).map_err(|source| AppError::WriteOutput {
        path: args.output_lightmaps.clone(),
        source,
    })?;
    info!(path = %args.output_lightmaps.display(), pages = pages.len(), "wrote lightmap output");

    if config.debug_atlas {
        for (i, page) in pages.iter().enumerate() {
            let img = lmbake_io::debug_atlas::page_to_png(page, config.atlas_size);
            let path = args.output_lightmaps.with_extension(format!("page{i}.png"));
            img.save(&path).map_err(|source| AppError::WriteOutput {
                path: path.clone(),
                source: std::io::Error::other(source),
            })?;

            let tiles_img = lmbake_io::debug_atlas::page_tile_coloring_png(&mesh, i as i32, config.atlas_size);
            let tiles_path = args.output_lightmaps.with_extension(format!("page{i}.tiles.png"));
            tiles_img.save(&tiles_path).map_err(|source| AppError::WriteOutput {
                path: tiles_path.clone(),
                source: std::io::Error::other(source),
            })?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    ensure_logging_hooks();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            // eyre::Report prints the full `#[source]` chain, unlike
            // thiserror's Display which only shows the top message.
            eprintln!("{:?}", eyre::Report::new(err));
            ExitCode::from(code)
        }
    }
}
