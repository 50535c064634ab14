mod app;
mod config;
mod orbit;
mod scene;
mod texture;

use anyhow::Context;

use orbis_engine::device::GpuInit;
use orbis_engine::logging::{init_logging, LoggingConfig};
use orbis_engine::window::{Runtime, RuntimeConfig};

use crate::app::GlobeApp;
use crate::config::GlobeConfig;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = GlobeConfig::from_env();
    log::info!(
        "globe: radius {}, {} segments, {} deg/s, marker at {:?}",
        config.radius,
        config.segments,
        config.rotation_speed,
        config.marker
    );
    let app = GlobeApp::new(config).context("failed to build globe scene")?;

    Runtime::run(
        RuntimeConfig { title: "orbis globe".to_string(), ..RuntimeConfig::default() },
        GpuInit::default(),
        app,
    )
}
