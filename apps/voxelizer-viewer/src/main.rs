//! Voxelizer Viewer
//!
//! Voxelizes a built-in test mesh or an OBJ file, logs the result and
//! optionally writes raycast previews of one level of the mip pyramid.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p voxelizer-viewer -- [OPTIONS]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Solid torus at 128^3 with a preview
//! cargo run -p voxelizer-viewer -- --mesh torus --solid -o torus.png
//!
//! # Coarse level of an OBJ model, eight frames around it
//! cargo run -p voxelizer-viewer -- --obj bunny.obj --mip 2 -f 8 -o bunny_{}.png
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;
mod scene;

use std::time::Instant;

use anyhow::Context;
use glam::Vec3;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxelizer_render::{output_path, render_preview, save_png, BoxArray, Camera, PreviewConfig};
use voxelizer_voxel::{VoxelizationReport, Voxelizer};

use crate::args::ViewerArgs;

/// Distance from the camera to the center of the normalized cube.
const CAMERA_DISTANCE: f32 = 3.5;
/// Camera elevation in radians.
const CAMERA_PITCH: f32 = 0.45;

fn main() -> anyhow::Result<()> {
    let args = ViewerArgs::from_args()?;
    if args.help {
        print_help();
        return Ok(());
    }

    init_logging();
    run(&args)
}

fn init_logging() {
    #[cfg(feature = "profiling-tracy")]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,voxelizer_voxel=trace,voxelizer_render=trace,voxelizer_viewer=trace")
        });
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_tracy::TracyLayer::default())
            .init();
    }
    #[cfg(not(feature = "profiling-tracy"))]
    {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }
}

fn run(args: &ViewerArgs) -> anyhow::Result<()> {
    let mesh = scene::load_mesh(&args.source)?;
    let mut voxelizer = Voxelizer::new(args.config.clone())?;

    let start = Instant::now();
    let report = voxelizer.voxelize(&mesh);
    info!(
        "Voxelized at {}^3 ({}, {}) in {:.2?}",
        args.config.resolution,
        args.config.mode,
        args.method().label(),
        start.elapsed()
    );
    log_report(&report);

    let grid = voxelizer.grid();
    for level in 0..grid.level_count() {
        let side = args.config.resolution >> level;
        info!(
            "  level {level}: {side}^3, {} occupied",
            grid.occupied_count(level)
        );
    }

    let level = grid.level(args.mip).with_context(|| {
        format!(
            "--mip {} is out of range, grid has {} levels",
            args.mip,
            grid.level_count()
        )
    })?;
    let boxes = BoxArray::from_level(&level);
    info!(
        "Box array: {} instances ({} bytes) at level {}",
        boxes.instance_count(),
        boxes.as_bytes().len(),
        args.mip
    );

    let Some(pattern) = &args.output else {
        return Ok(());
    };
    let aspect = args.width as f32 / args.height as f32;
    for frame in 0..args.frames {
        let yaw = args.orbit + 360.0 * frame as f32 / args.frames as f32;
        let camera = Camera::orbit(
            Vec3::ZERO,
            CAMERA_DISTANCE,
            yaw.to_radians(),
            CAMERA_PITCH,
            aspect,
        );
        let config = PreviewConfig::new(args.width, args.height)
            .with_level(args.mip)
            .with_camera(camera);
        let image = render_preview(grid, &config)?;
        save_png(
            image.into_raw(),
            args.width,
            args.height,
            output_path(pattern, u64::from(frame)),
        )?;
    }

    Ok(())
}

fn log_report(report: &VoxelizationReport) {
    info!(
        "{} triangles ({} skipped), {} surface + {} interior cells",
        report.triangles, report.skipped_triangles, report.surface_cells, report.interior_cells
    );
    if report.crossings > 0 {
        info!(
            "{} crossings resolved in {} peel passes",
            report.crossings, report.peel_passes
        );
    }
    if report.is_degraded() {
        warn!(
            "Interior incomplete: {} unresolved columns, {} unpaired columns",
            report.unresolved_columns, report.unpaired_columns
        );
    }
}

fn print_help() {
    eprintln!(
        "Voxelizer Viewer

USAGE:
    cargo run -p voxelizer-viewer -- [OPTIONS]

MESH OPTIONS:
    --mesh <NAME>           Built-in mesh: cube, sphere, torus, tetra (default: sphere)
    --obj <PATH>            Load a Wavefront OBJ file instead

VOXELIZATION OPTIONS:
    -r, --resolution <N>    Grid resolution, power of two (default: 128)
    --solid                 Fill the interior (default: surface only)
    --method <NAME>         Projection method: dominant, tessellated, union
                            (default: dominant)
    --slots <N>             Depth slots per column in solid mode (default: 8)
    --max-passes <N>        Maximum depth-peel passes (default: 8)
    --normalize <NAME>      Fit the bounding sphere (sphere) or its inscribed
                            cube (cube) to the grid (default: sphere)

PREVIEW OPTIONS:
    --mip <N>               Level to preview, 0 is full resolution (default: 0)
    -o, --output <PATTERN>  Write preview PNGs (use {{}} for frame number)
    --width <N>             Preview width (default: 512)
    --height <N>            Preview height (default: 512)
    --orbit <DEGREES>       Camera yaw of the first frame (default: 35)
    -f, --frames <N>        Frames spread over a full turn (default: 1)

OTHER:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
