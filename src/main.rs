//! Headless box demo.
//!
//! ```text
//! sphfluid [config.toml] [frames]
//! ```
//!
//! Assets named in the config are resolved relative to the config file.
//! Set `RUST_LOG=sphfluid=debug` for per-step output.

use sphfluid::prelude::*;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_FRAMES: u64 = 600;
/// Frame at which the container starts tilting.
const TILT_START: u64 = 300;
const MAX_TILT: f32 = 20.0;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let frames = match args.next() {
        Some(n) => n.parse::<u64>()?,
        None => DEFAULT_FRAMES,
    };

    let (config, asset_root) = match &config_path {
        Some(path) => {
            let root = Path::new(path).parent().unwrap_or(Path::new(".")).to_path_buf();
            (SessionConfig::load(path)?, root)
        }
        None => (SessionConfig::box_demo(), ".".into()),
    };

    let mut session = FluidSession::new(config)?;
    let mut container = BoxContainer::new(
        session.collisions_mut(),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, 0.0, 1.0),
    );
    session.collisions_mut().add_sphere(Vec3::new(0.0, -0.75, -0.3), 0.2);

    pollster::block_on(session.start(&FsLoader::new(asset_root)))?;

    for frame in 0..frames {
        if frame >= TILT_START {
            let t = (frame - TILT_START) as f32 / (frames - TILT_START).max(1) as f32;
            if frame == TILT_START {
                container.set_floor_enabled(session.collisions_mut(), true);
            }
            container.rotate(session.collisions_mut(), MAX_TILT * t, 0.0);
        }

        if let Some(stats) = session.step() {
            if frame % 100 == 0 {
                info!(
                    frame,
                    live = session.live_particles(),
                    substeps = stats.substeps,
                    max_speed = stats.max_speed,
                    max_density = stats.max_density,
                    "step"
                );
            }
        }
    }

    info!(
        frames,
        simulated = session.time().simulated(),
        particles = session.live_particles(),
        "done"
    );
    session.dispose();
    Ok(())
}
