//! Backend-agnostic graphics API seam
//!
//! [`GraphicsBackend`] is the set of API calls the context and the surface
//! binding need. It owns the loaded entry points, so each context carries
//! its own function tables instead of sharing process-wide globals.
//!
//! [`SurfaceSource`] is the contract for the windowing collaborator: it
//! reports the instance extensions the window system needs and creates a
//! presentation surface against a backend instance.
//!
//! # Testability
//! The Vulkan implementation lives in [`crate::vulkan`]. Tests drive the
//! context and the binding through a recording backend instead, so the
//! lifecycle rules are checked without a GPU.

use crate::config::{ApiVersion, PlatformConfig};
use crate::error::BackendResult;

/// Graphics API calls used by the context lifecycle
///
/// All calls take `&self`: handles are only ever touched from the thread
/// that owns the context.
pub trait GraphicsBackend {
    /// Instance handle together with its instance-level function table
    type Instance;
    /// Physical device handle, owned by the instance
    type PhysicalDevice: Copy;
    /// Logical device handle together with its device-level function table
    type Device;
    /// Queue handle, owned by the device
    type Queue: Copy;
    /// Memory allocator bound to instance, physical device and device
    type Allocator;
    /// Presentation surface handle
    type Surface: Copy + PartialEq;

    /// Create the instance
    ///
    /// `extensions` is the full instance extension list (window system
    /// requirements followed by the platform extras).
    fn create_instance(
        &self,
        application_name: &str,
        api_version: ApiVersion,
        extensions: &[String],
        platform: &PlatformConfig,
        enable_validation: bool,
    ) -> BackendResult<Self::Instance>;

    /// Device extensions needed to present to a surface (swapchain support)
    fn presentation_device_extensions(&self) -> Vec<String>;

    /// List the physical devices in the order the driver reports them
    fn enumerate_physical_devices(
        &self,
        instance: &Self::Instance,
    ) -> BackendResult<Vec<Self::PhysicalDevice>>;

    /// Human-readable name of a physical device
    fn physical_device_name(
        &self,
        instance: &Self::Instance,
        physical_device: Self::PhysicalDevice,
    ) -> String;

    /// Create a logical device with one queue from `queue_family`
    ///
    /// `extensions` is the full device extension list (presentation
    /// extensions followed by the platform extras).
    fn create_device(
        &self,
        instance: &Self::Instance,
        physical_device: Self::PhysicalDevice,
        queue_family: u32,
        extensions: &[String],
    ) -> BackendResult<Self::Device>;

    /// Retrieve a queue created together with the device
    fn device_queue(&self, device: &Self::Device, queue_family: u32, queue_index: u32) -> Self::Queue;

    /// Construct the memory allocator for the device
    fn create_allocator(
        &self,
        instance: &Self::Instance,
        physical_device: Self::PhysicalDevice,
        device: &Self::Device,
        api_version: ApiVersion,
    ) -> BackendResult<Self::Allocator>;

    /// Block until all submitted device work has finished
    fn device_wait_idle(&self, device: &Self::Device) -> BackendResult<()>;

    /// Destroy a presentation surface created against `instance`
    fn destroy_surface(&self, instance: &Self::Instance, surface: Self::Surface) -> BackendResult<()>;

    /// Destroy the allocator; must precede device destruction
    fn destroy_allocator(&self, allocator: Self::Allocator);

    /// Destroy the logical device; must precede instance destruction
    fn destroy_device(&self, device: Self::Device);

    /// Destroy the instance; function tables are invalid afterwards
    fn destroy_instance(&self, instance: Self::Instance);
}

/// Window system collaborator able to host a presentation surface
pub trait SurfaceSource<B: GraphicsBackend + ?Sized> {
    /// Instance extensions the window system requires for presentation
    fn required_instance_extensions(&self) -> BackendResult<Vec<String>>;

    /// Create a presentation surface for this window against `instance`
    fn create_surface(&self, backend: &B, instance: &B::Instance) -> BackendResult<B::Surface>;
}
