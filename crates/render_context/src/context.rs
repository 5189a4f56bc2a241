//! Graphics context management
//!
//! Owns the instance, the selected physical device, the logical device, its
//! single queue and the memory allocator. These are created together in
//! [`GraphicsContext::initialize`] and released together, in reverse
//! creation order, in [`GraphicsContext::teardown`]:
//!
//! ```text
//! create:   instance -> physical device -> device -> queue -> allocator
//! release:  (device idle) -> allocator -> device -> instance
//! ```
//!
//! Device selection is deliberately minimal: the first physical device the
//! driver reports is used, with queue family 0. There is no scoring and no
//! fallback to another GPU.

use std::mem::ManuallyDrop;

use crate::backend::{GraphicsBackend, SurfaceSource};
use crate::config::{ApiVersion, ContextConfig, PlatformConfig};
use crate::error::{BackendError, DeviceError, InitError, InitStage};
use crate::vulkan::VulkanBackend;

/// Queue family the logical device is created with
pub const QUEUE_FAMILY_INDEX: u32 = 0;

/// Main graphics context that owns all core API objects
pub struct GraphicsContext<B: GraphicsBackend> {
    allocator: ManuallyDrop<B::Allocator>,
    queue: B::Queue,
    device: ManuallyDrop<B::Device>,
    physical_device: B::PhysicalDevice,
    device_name: String,
    instance: ManuallyDrop<B::Instance>,
    api_version: ApiVersion,
    platform: PlatformConfig,
    released: bool,
    backend: B,
}

impl GraphicsContext<VulkanBackend> {
    /// Load Vulkan dynamically and create the context
    ///
    /// The window only supplies the instance extensions its window system
    /// needs; no surface is created here.
    pub fn initialize<W>(window: &W, config: &ContextConfig) -> Result<Self, InitError>
    where
        W: SurfaceSource<VulkanBackend>,
    {
        let backend = VulkanBackend::load().map_err(|e| InitError::new(InitStage::LoadEntryPoints, e))?;
        Self::with_backend(backend, window, config)
    }
}

impl<B: GraphicsBackend> GraphicsContext<B> {
    /// Create the context on an already loaded backend
    pub fn with_backend<W>(backend: B, window: &W, config: &ContextConfig) -> Result<Self, InitError>
    where
        W: SurfaceSource<B>,
    {
        let api_version = config.api_version;
        let platform = config.platform.clone();

        let mut instance_extensions = window
            .required_instance_extensions()
            .map_err(|e| InitError::new(InitStage::QueryExtensions, e))?;
        append_unique(&mut instance_extensions, &platform.extra_instance_extensions);
        log::debug!("Instance extensions: {:?}", instance_extensions);

        let instance = backend
            .create_instance(
                &config.application_name,
                api_version,
                &instance_extensions,
                &platform,
                config.validation_enabled(),
            )
            .map_err(|e| InitError::new(InitStage::CreateInstance, e))?;
        log::info!("Created graphics instance (API {})", api_version);

        let physical_device = match Self::select_physical_device(&backend, &instance) {
            Ok(physical_device) => physical_device,
            Err(e) => {
                backend.destroy_instance(instance);
                return Err(e);
            }
        };
        let device_name = backend.physical_device_name(&instance, physical_device);
        log::info!("Selected GPU: {}", device_name);

        let mut device_extensions = backend.presentation_device_extensions();
        append_unique(&mut device_extensions, &platform.extra_device_extensions);

        let device = match backend.create_device(&instance, physical_device, QUEUE_FAMILY_INDEX, &device_extensions) {
            Ok(device) => device,
            Err(e) => {
                backend.destroy_instance(instance);
                return Err(InitError::new(InitStage::CreateDevice, e));
            }
        };
        let queue = backend.device_queue(&device, QUEUE_FAMILY_INDEX, 0);

        let allocator = match backend.create_allocator(&instance, physical_device, &device, api_version) {
            Ok(allocator) => allocator,
            Err(e) => {
                backend.destroy_device(device);
                backend.destroy_instance(instance);
                return Err(InitError::new(InitStage::CreateAllocator, e));
            }
        };
        log::info!("Created logical device and memory allocator");

        Ok(Self {
            allocator: ManuallyDrop::new(allocator),
            queue,
            device: ManuallyDrop::new(device),
            physical_device,
            device_name,
            instance: ManuallyDrop::new(instance),
            api_version,
            platform,
            released: false,
            backend,
        })
    }

    /// Pick the first physical device the driver reports
    fn select_physical_device(backend: &B, instance: &B::Instance) -> Result<B::PhysicalDevice, InitError> {
        let devices = backend
            .enumerate_physical_devices(instance)
            .map_err(|e| InitError::new(InitStage::EnumerateDevices, e))?;

        devices.first().copied().ok_or_else(|| {
            InitError::new(
                InitStage::EnumerateDevices,
                BackendError::Other("No physical devices reported".to_string()),
            )
        })
    }

    /// Get the backend holding the loaded entry points
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the instance
    pub fn instance(&self) -> &B::Instance {
        &self.instance
    }

    /// Get the selected physical device
    pub fn physical_device(&self) -> B::PhysicalDevice {
        self.physical_device
    }

    /// Name of the selected physical device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Get the logical device
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Get the device queue
    pub fn queue(&self) -> B::Queue {
        self.queue
    }

    /// Get the memory allocator
    pub fn allocator(&self) -> &B::Allocator {
        &self.allocator
    }

    /// API version the context was created with
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Platform settings the context was created with
    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    /// Block until all submitted device work has finished
    pub fn wait_idle(&self) -> Result<(), DeviceError> {
        self.backend
            .device_wait_idle(&self.device)
            .map_err(DeviceError::WaitIdle)
    }

    /// Release the allocator, the device and the instance, in that order
    ///
    /// A device-idle wait is always issued first. Every handle is released
    /// even when the wait fails; the failure is reported afterwards.
    /// Surface bindings borrow the context, so none can outlive this call.
    pub fn teardown(mut self) -> Result<(), DeviceError> {
        let result = self.release();
        log::info!("Graphics context torn down");
        result
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let idle = self.wait_idle();

        // SAFETY: `released` guarantees each handle is taken exactly once,
        // and nothing reads them afterwards.
        unsafe {
            self.backend.destroy_allocator(ManuallyDrop::take(&mut self.allocator));
            self.backend.destroy_device(ManuallyDrop::take(&mut self.device));
            self.backend.destroy_instance(ManuallyDrop::take(&mut self.instance));
        }

        idle
    }
}

impl<B: GraphicsBackend> Drop for GraphicsContext<B> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Context dropped after failed idle wait: {}", e);
        }
    }
}

fn append_unique(list: &mut Vec<String>, extra: &[String]) {
    for name in extra {
        if !list.contains(name) {
            list.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PORTABILITY_SUBSET_EXTENSION;
    use crate::testing::{Call, FakeWindow, Recorder, RecordingBackend};
    use std::rc::Rc;

    fn setup(recorder: &Rc<Recorder>, config: &ContextConfig) -> Result<GraphicsContext<RecordingBackend>, InitError> {
        let window = FakeWindow::new(recorder.clone());
        GraphicsContext::with_backend(RecordingBackend::new(recorder.clone()), &window, config)
    }

    fn native_config() -> ContextConfig {
        ContextConfig::new("test")
            .with_validation(false)
            .with_platform(PlatformConfig::native())
    }

    #[test]
    fn test_initialize_creates_all_handles() {
        let recorder = Recorder::with_devices(vec![11, 22]);
        let context = setup(&recorder, &native_config()).unwrap();

        assert_eq!(context.api_version(), ApiVersion::V1_2);
        assert_eq!(context.physical_device(), 11);
        assert_eq!(context.device_name(), "Fake GPU 11");
        assert_eq!(context.queue(), (QUEUE_FAMILY_INDEX, 0));
        assert_eq!(context.device().physical_device, 11);
        assert!(recorder.instance_alive());
        assert!(recorder.allocator_alive());
        assert_eq!(recorder.live_surfaces(), 0);

        assert_eq!(
            recorder.calls(),
            vec![
                Call::CreateInstance,
                Call::EnumerateDevices,
                Call::CreateDevice,
                Call::CreateAllocator,
            ]
        );
    }

    #[test]
    fn test_instance_receives_window_extensions() {
        let recorder = Recorder::with_devices(vec![1]);
        let context = setup(&recorder, &native_config()).unwrap();

        assert_eq!(context.instance().extensions, FakeWindow::EXTENSIONS);
        assert!(!context.instance().enumerate_portability);
        assert_eq!(context.device().extensions, vec!["VK_KHR_swapchain".to_string()]);
    }

    #[test]
    fn test_portability_platform_appends_extensions_and_flag() {
        let recorder = Recorder::with_devices(vec![1]);
        let config = native_config().with_platform(PlatformConfig::portability());
        let context = setup(&recorder, &config).unwrap();

        let instance = context.instance();
        assert!(instance.enumerate_portability);
        assert_eq!(instance.extensions.len(), FakeWindow::EXTENSIONS.len() + 1);
        assert_eq!(
            instance.extensions.last().map(String::as_str),
            Some("VK_KHR_portability_enumeration")
        );
        assert_eq!(
            context.device().extensions,
            vec!["VK_KHR_swapchain".to_string(), PORTABILITY_SUBSET_EXTENSION.to_string()]
        );
    }

    #[test]
    fn test_requested_api_version_is_used() {
        let recorder = Recorder::with_devices(vec![1]);
        let config = native_config().with_api_version(ApiVersion::V1_3);
        let context = setup(&recorder, &config).unwrap();

        assert_eq!(context.instance().api_version, ApiVersion::V1_3);
        assert_eq!(context.allocator().api_version, ApiVersion::V1_3);
    }

    #[test]
    fn test_first_device_is_selected() {
        let recorder = Recorder::with_devices(vec![5, 3, 9]);
        let context = setup(&recorder, &native_config()).unwrap();

        assert_eq!(context.physical_device(), 5);
        assert_eq!(context.allocator().physical_device, 5);
    }

    #[test]
    fn test_no_devices_fails_enumeration_and_releases_instance() {
        let recorder = Recorder::with_devices(Vec::new());
        let error = setup(&recorder, &native_config()).err().unwrap();

        assert_eq!(error.stage, InitStage::EnumerateDevices);
        assert!(!recorder.instance_alive());
    }

    #[test]
    fn test_each_stage_failure_is_reported() {
        let stages = [
            InitStage::QueryExtensions,
            InitStage::CreateInstance,
            InitStage::EnumerateDevices,
            InitStage::CreateDevice,
            InitStage::CreateAllocator,
        ];

        for stage in stages {
            let recorder = Recorder::with_devices(vec![1]);
            recorder.fail_stage(stage);

            let error = setup(&recorder, &native_config()).err().unwrap();
            assert_eq!(error.stage, stage);
            assert!(!recorder.instance_alive(), "instance leaked after {stage} failure");
            assert!(!recorder.device_alive(), "device leaked after {stage} failure");
        }
    }

    #[test]
    fn test_allocator_failure_releases_device_then_instance() {
        let recorder = Recorder::with_devices(vec![1]);
        recorder.fail_stage(InitStage::CreateAllocator);

        setup(&recorder, &native_config()).err().unwrap();
        assert_eq!(
            recorder.calls(),
            vec![
                Call::CreateInstance,
                Call::EnumerateDevices,
                Call::CreateDevice,
                Call::CreateAllocator,
                Call::DestroyDevice,
                Call::DestroyInstance,
            ]
        );
    }

    #[test]
    fn test_teardown_waits_idle_then_releases_in_reverse_order() {
        let recorder = Recorder::with_devices(vec![1]);
        let context = setup(&recorder, &native_config()).unwrap();
        recorder.clear_calls();

        context.teardown().unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                Call::WaitIdle,
                Call::DestroyAllocator,
                Call::DestroyDevice,
                Call::DestroyInstance,
            ]
        );
        assert!(!recorder.instance_alive());
    }

    #[test]
    fn test_teardown_releases_everything_when_idle_wait_fails() {
        let recorder = Recorder::with_devices(vec![1]);
        let context = setup(&recorder, &native_config()).unwrap();
        recorder.fail_wait_idle(true);

        let result = context.teardown();

        assert!(matches!(result, Err(DeviceError::WaitIdle(_))));
        assert!(!recorder.allocator_alive());
        assert!(!recorder.device_alive());
        assert!(!recorder.instance_alive());
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let recorder = Recorder::with_devices(vec![1]);
        let context = setup(&recorder, &native_config()).unwrap();
        recorder.clear_calls();

        drop(context);

        assert_eq!(
            recorder.calls(),
            vec![
                Call::WaitIdle,
                Call::DestroyAllocator,
                Call::DestroyDevice,
                Call::DestroyInstance,
            ]
        );
    }
}
