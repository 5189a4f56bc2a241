//! Context lifecycle host
//!
//! Creates a window and a graphics context, keeps the window surface bound
//! while the application is in the foreground, and shuts everything down
//! in order once the window is closed.

mod config;

use config::HostConfig;
use render_context::logging;
use render_context::{
    pump_events, ConfigError, ContextConfig, DeviceError, GraphicsContext, InitError, LoopControl,
    ShutdownError, SurfaceBinding, Window, WindowError,
};
use thiserror::Error;

/// Host-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The window could not be created
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Context creation failed; startup is aborted
    #[error(transparent)]
    Init(#[from] InitError),

    /// Surface release at shutdown failed
    #[error("Shutdown error: {0}")]
    Shutdown(#[from] ShutdownError),

    /// Final device synchronization failed
    #[error("Teardown error: {0}")]
    Teardown(#[from] DeviceError),
}

/// Drive the window lifecycle until quit, then shut down in order
fn run(window: &mut Window, config: &ContextConfig) -> Result<(), AppError> {
    let context = GraphicsContext::initialize(&*window, config)?;
    log::info!(
        "Graphics context ready on {} (API {})",
        context.device_name(),
        context.api_version()
    );

    let mut binding = SurfaceBinding::new(&context);
    if config.bind_on_startup {
        if let Err(e) = binding.bind(&*window) {
            log::warn!("Initial bind failed, waiting for foreground: {}", e);
        }
    } else {
        log::info!("Deferring surface bind until the application enters the foreground");
    }

    window.show();

    log::info!("Starting event loop...");
    loop {
        let events = window.poll_lifecycle_events();
        let outcome = pump_events(&mut binding, &*window, events);
        for failure in &outcome.failures {
            log::warn!("Continuing without a presentable surface: {}", failure);
        }
        if outcome.control() == LoopControl::Exit {
            break;
        }
    }

    log::info!("Quit requested, shutting down");
    binding.release()?;
    context.teardown()?;
    Ok(())
}

fn main() {
    let config_path = std::env::args().nth(1);
    let config = match HostConfig::resolve(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init(logging::parse_level(&config.log_level));
    log::info!("Starting context_app");

    let result = Window::new(&config.window)
        .map_err(AppError::from)
        .and_then(|mut window| run(&mut window, &config.context));

    match result {
        Ok(()) => log::info!("Shutdown complete"),
        Err(e) => {
            log::error!("Application error: {}", e);
            std::process::exit(1);
        }
    }
}
