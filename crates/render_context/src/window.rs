//! Window management using GLFW
//!
//! The host window for the Vulkan backend. It reports the instance
//! extensions GLFW needs, creates surfaces through GLFW, and turns GLFW
//! window events into lifecycle events:
//!
//! - close request -> quit
//! - iconified -> enter-background
//! - restored -> enter-foreground

use ash::vk;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::SurfaceSource;
use crate::error::{BackendError, BackendResult};
use crate::lifecycle::LifecycleEvent;
use crate::vulkan::{VulkanBackend, VulkanInstance};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// GLFW reported an error
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Hello World".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a hidden, resizable window without a client API
    ///
    /// The window stays hidden until [`Window::show`], so the context can be
    /// created before anything appears on screen.
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::GlfwError("Vulkan loader not found".to_string()));
        }

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));
        glfw.window_hint(glfw::WindowHint::Visible(false));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_close_polling(true);
        window.set_iconify_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }

    /// Make the window visible
    pub fn show(&mut self) {
        self.window.show();
    }

    /// Poll the window system and return the lifecycle events, in order
    pub fn poll_lifecycle_events(&mut self) -> Vec<LifecycleEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| lifecycle_event(&event))
            .collect()
    }
}

impl SurfaceSource<VulkanBackend> for Window {
    fn required_instance_extensions(&self) -> BackendResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| BackendError::Window("Failed to get required extensions".to_string()))
    }

    fn create_surface(&self, _backend: &VulkanBackend, instance: &VulkanInstance) -> BackendResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance.handle(), std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(BackendError::Api(result))
        }
    }
}

/// Map a GLFW window event onto a lifecycle event
///
/// Everything that is not a close request or an iconify change is ignored.
pub fn lifecycle_event(event: &glfw::WindowEvent) -> Option<LifecycleEvent> {
    match event {
        glfw::WindowEvent::Close => Some(LifecycleEvent::Quit),
        glfw::WindowEvent::Iconify(true) => Some(LifecycleEvent::EnterBackground),
        glfw::WindowEvent::Iconify(false) => Some(LifecycleEvent::EnterForeground),
        _ => None,
    }
}
