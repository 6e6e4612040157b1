use anyhow::{Context, Result};
use glcanvas_engine::device::{Driver, GpuError, GpuSession, SessionConfig};
use glcanvas_engine::logging::{init_logging, LoggingConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    #[cfg(feature = "backend_egl")]
    let driver = glcanvas_engine::device::EglDriver::new();
    #[cfg(not(feature = "backend_egl"))]
    let driver = glcanvas_engine::device::SoftwareDriver::new();

    probe(driver)
}

fn probe<D: Driver>(driver: D) -> Result<()> {
    let config = SessionConfig {
        build_pipeline: true,
        ..SessionConfig::default()
    };
    let mut session = GpuSession::new(driver, config).context("failed to start GPU session")?;
    log::info!("{} ready: {:?}", session.id(), session.graphics_context());

    let first = session.create_texture().context("failed to create first texture")?;
    let second = session.create_texture().context("failed to create second texture")?;
    log::info!("allocated textures {} and {}", first.get(), second.get());

    match session.draw_frame() {
        Err(GpuError::NotImplemented(what)) => log::info!("{what} is not available yet"),
        other => other.context("draw_frame")?,
    }

    session.destroy();
    log::info!("session torn down");
    Ok(())
}
