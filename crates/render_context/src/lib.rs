//! # Render Context
//!
//! Vulkan context bootstrap and presentation-surface lifecycle.
//!
//! ## Features
//!
//! - **Graphics Context**: instance, device, single queue and memory allocator,
//!   created together and released in reverse order
//! - **Surface Binding**: idempotent bind/unbind of the window surface
//! - **Lifecycle Events**: quit / foreground / background mapped onto the binding
//! - **Backend Seam**: lifecycle rules testable without a GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_context::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut window = Window::new(&WindowConfig::default())?;
//!     let context = GraphicsContext::initialize(&window, &ContextConfig::default())?;
//!
//!     let mut binding = SurfaceBinding::new(&context);
//!     binding.bind(&window)?;
//!     window.show();
//!
//!     loop {
//!         let events = window.poll_lifecycle_events();
//!         if pump_events(&mut binding, &window, events).control() == LoopControl::Exit {
//!             break;
//!         }
//!     }
//!
//!     binding.release()?;
//!     context.teardown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod surface;
pub mod vulkan;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{GraphicsBackend, SurfaceSource};
pub use config::{ApiVersion, Config, ConfigError, ConfigFormat, ContextConfig, PlatformConfig};
pub use context::GraphicsContext;
pub use error::{
    BackendError, DeviceError, InitError, InitStage, ShutdownError, SurfaceError, SurfaceOperation,
};
pub use lifecycle::{pump_events, LifecycleEvent, LoopControl, PumpOutcome};
pub use surface::{BindingState, SurfaceBinding};
pub use vulkan::VulkanBackend;
pub use window::{Window, WindowConfig, WindowError};

/// Common imports for users of the context
pub mod prelude {
    pub use crate::{
        pump_events, ApiVersion, BindingState, Config, ContextConfig, GraphicsContext,
        LifecycleEvent, LoopControl, SurfaceBinding, Window, WindowConfig,
    };
}
