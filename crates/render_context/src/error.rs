//! Error types for context creation and surface lifecycle
//!
//! Initialization failures are fatal to the caller and carry the stage that
//! failed. Surface failures are recoverable: the context stays usable and a
//! later bind may succeed.

use ash::vk;
use std::fmt;
use thiserror::Error;

/// Raw failure reported by a graphics backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// The graphics library or its entry points could not be loaded
    #[error("Failed to load graphics library: {0}")]
    Loading(String),

    /// The windowing collaborator rejected a request
    #[error("Window system error: {0}")]
    Window(String),

    /// Any other backend failure
    #[error("{0}")]
    Other(String),
}

impl From<vk::Result> for BackendError {
    fn from(result: vk::Result) -> Self {
        Self::Api(result)
    }
}

/// Result type for raw backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Stage of context creation, reported when initialization fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    /// Dynamic loading of the API entry points
    LoadEntryPoints,
    /// Querying the window system for required instance extensions
    QueryExtensions,
    /// Instance creation
    CreateInstance,
    /// Physical device enumeration
    EnumerateDevices,
    /// Logical device creation
    CreateDevice,
    /// Memory allocator construction
    CreateAllocator,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadEntryPoints => "entry point loading",
            Self::QueryExtensions => "extension query",
            Self::CreateInstance => "instance creation",
            Self::EnumerateDevices => "device enumeration",
            Self::CreateDevice => "device creation",
            Self::CreateAllocator => "allocator creation",
        };
        f.write_str(name)
    }
}

/// Fatal context initialization failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("graphics initialization failed during {stage}: {source}")]
pub struct InitError {
    /// The stage that failed
    pub stage: InitStage,
    /// Underlying backend failure
    pub source: BackendError,
}

impl InitError {
    /// Create an initialization error for the given stage
    pub fn new(stage: InitStage, source: impl Into<BackendError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Surface operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceOperation {
    /// Creating a surface for a window
    Bind,
    /// Destroying the bound surface
    Unbind,
}

impl fmt::Display for SurfaceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => f.write_str("bind"),
            Self::Unbind => f.write_str("unbind"),
        }
    }
}

/// Recoverable surface bind/unbind failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("surface {operation} failed: {source}")]
pub struct SurfaceError {
    /// The operation that failed
    pub operation: SurfaceOperation,
    /// Underlying backend failure
    pub source: BackendError,
}

impl SurfaceError {
    /// Create a surface error for the given operation
    pub fn new(operation: SurfaceOperation, source: impl Into<BackendError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Device-level failures outside of initialization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Waiting for outstanding device work failed (usually device loss)
    #[error("device idle wait failed: {0}")]
    WaitIdle(BackendError),
}

/// Failure while releasing the surface at shutdown
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// The device-idle barrier failed
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The surface could not be destroyed
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
