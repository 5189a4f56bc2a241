//! Vulkan implementation of the graphics backend
//!
//! Entry points are loaded dynamically at runtime; the instance and device
//! carry their own function tables (ash's `Instance` and `Device`), so the
//! whole loader state lives inside the owning context.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain};
use ash::{vk, Device, Entry, Instance};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::backend::GraphicsBackend;
use crate::config::{ApiVersion, PlatformConfig};
use crate::error::{BackendError, BackendResult};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
const ENGINE_NAME: &str = "render_context";

/// Vulkan backend holding the dynamically loaded entry points
pub struct VulkanBackend {
    entry: Entry,
}

impl VulkanBackend {
    /// Load the Vulkan library and its global entry points
    pub fn load() -> BackendResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| BackendError::Loading(format!("Failed to load Vulkan: {e}")))?;
        Ok(Self { entry })
    }

    /// Get a reference to the Vulkan entry
    pub fn entry(&self) -> &Entry {
        &self.entry
    }
}

/// Vulkan instance with the loaders that depend on it
pub struct VulkanInstance {
    instance: Instance,
    surface_loader: Surface,
    debug_messenger: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Instance function table
    pub fn raw(&self) -> &Instance {
        &self.instance
    }

    /// Raw instance handle
    pub fn handle(&self) -> vk::Instance {
        self.instance.handle()
    }

    /// Surface extension loader
    pub fn surface_loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// Whether a validation messenger is installed
    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

fn to_cstrings(names: &[String]) -> BackendResult<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str())
                .map_err(|_| BackendError::Other(format!("Invalid extension name: {name:?}")))
        })
        .collect()
}

/// Decide whether validation can be turned on with what the loader reports
///
/// Validation needs both the Khronos layer and the debug utils extension.
/// When either is missing the instance is created without validation.
fn select_validation(requested: bool, available_layers: &[String], available_extensions: &[String]) -> bool {
    if !requested {
        return false;
    }

    let debug_utils = DebugUtils::name().to_string_lossy();
    let has_layer = available_layers.iter().any(|name| name == VALIDATION_LAYER);
    let has_debug_utils = available_extensions.iter().any(|name| *name == debug_utils);

    if !has_layer {
        log::warn!("{} not installed, continuing without validation", VALIDATION_LAYER);
    } else if !has_debug_utils {
        log::warn!("{} not available, continuing without validation", debug_utils);
    }
    has_layer && has_debug_utils
}

fn c_array_name(raw: &[c_char]) -> String {
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_string_lossy().into_owned()
}

/// Severities the debug messenger subscribes to
fn messenger_severities() -> vk::DebugUtilsMessageSeverityFlagsEXT {
    vk::DebugUtilsMessageSeverityFlagsEXT::INFO
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
}

/// Log level a validation message is forwarded at
fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::Level::Error
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::Level::Warn
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

fn setup_debug_messenger(debug_utils: &DebugUtils) -> BackendResult<vk::DebugUtilsMessengerEXT> {
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(messenger_severities())
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }.map_err(BackendError::Api)
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    log::log!(severity_level(message_severity), "[Vulkan] {:?} - {}", message_type, message);

    vk::FALSE
}

impl VulkanBackend {
    fn validation_available(&self, requested: bool) -> bool {
        if !requested {
            return false;
        }

        let layers = match self.entry.enumerate_instance_layer_properties() {
            Ok(properties) => properties.iter().map(|p| c_array_name(&p.layer_name)).collect(),
            Err(e) => {
                log::warn!("Failed to query instance layers: {}", e);
                Vec::new()
            }
        };
        let extensions = match self.entry.enumerate_instance_extension_properties(None) {
            Ok(properties) => properties.iter().map(|p| c_array_name(&p.extension_name)).collect(),
            Err(e) => {
                log::warn!("Failed to query instance extensions: {}", e);
                Vec::new()
            }
        };

        select_validation(requested, &layers, &extensions)
    }
}

impl GraphicsBackend for VulkanBackend {
    type Instance = VulkanInstance;
    type PhysicalDevice = vk::PhysicalDevice;
    type Device = Device;
    type Queue = vk::Queue;
    type Allocator = vk_mem::Allocator;
    type Surface = vk::SurfaceKHR;

    fn create_instance(
        &self,
        application_name: &str,
        api_version: ApiVersion,
        extensions: &[String],
        platform: &PlatformConfig,
        enable_validation: bool,
    ) -> BackendResult<VulkanInstance> {
        let enable_validation = self.validation_available(enable_validation);
        let app_name = CString::new(application_name)
            .map_err(|_| BackendError::Other(format!("Invalid application name: {application_name:?}")))?;
        let engine_name = CString::new(ENGINE_NAME)
            .map_err(|_| BackendError::Other("Invalid engine name".to_string()))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(api_version.to_packed());

        let mut extension_names = to_cstrings(extensions)?;
        if enable_validation {
            extension_names.push(DebugUtils::name().to_owned());
        }
        let extension_ptrs: Vec<*const c_char> =
            extension_names.iter().map(|name| name.as_ptr()).collect();

        let layer_names = if enable_validation {
            to_cstrings(&[VALIDATION_LAYER.to_string()])?
        } else {
            Vec::new()
        };
        let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .flags(platform.instance_flags())
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { self.entry.create_instance(&create_info, None) }?;

        let debug_messenger = if enable_validation {
            let debug_utils = DebugUtils::new(&self.entry, &instance);
            match setup_debug_messenger(&debug_utils) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        let surface_loader = Surface::new(&self.entry, &instance);

        Ok(VulkanInstance {
            instance,
            surface_loader,
            debug_messenger,
        })
    }

    fn presentation_device_extensions(&self) -> Vec<String> {
        vec![Swapchain::name().to_string_lossy().into_owned()]
    }

    fn enumerate_physical_devices(&self, instance: &VulkanInstance) -> BackendResult<Vec<vk::PhysicalDevice>> {
        unsafe { instance.instance.enumerate_physical_devices() }.map_err(BackendError::Api)
    }

    fn physical_device_name(&self, instance: &VulkanInstance, physical_device: vk::PhysicalDevice) -> String {
        let properties = unsafe { instance.instance.get_physical_device_properties(physical_device) };
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    fn create_device(
        &self,
        instance: &VulkanInstance,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        extensions: &[String],
    ) -> BackendResult<Device> {
        let priorities = [1.0_f32];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family)
            .queue_priorities(&priorities)
            .build();

        let extension_names = to_cstrings(extensions)?;
        let extension_ptrs: Vec<*const c_char> =
            extension_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_info))
            .enabled_extension_names(&extension_ptrs);

        unsafe { instance.instance.create_device(physical_device, &create_info, None) }
            .map_err(BackendError::Api)
    }

    fn device_queue(&self, device: &Device, queue_family: u32, queue_index: u32) -> vk::Queue {
        unsafe { device.get_device_queue(queue_family, queue_index) }
    }

    fn create_allocator(
        &self,
        instance: &VulkanInstance,
        physical_device: vk::PhysicalDevice,
        device: &Device,
        api_version: ApiVersion,
    ) -> BackendResult<vk_mem::Allocator> {
        // vk-mem routes allocation, mapping, binding, buffer/image lifecycle
        // and the *2 requirement/bind entry points through the ash tables.
        let create_info = vk_mem::AllocatorCreateInfo::new(&instance.instance, device, physical_device)
            .vulkan_api_version(api_version.to_packed());

        Ok(vk_mem::Allocator::new(create_info)?)
    }

    fn device_wait_idle(&self, device: &Device) -> BackendResult<()> {
        unsafe { device.device_wait_idle() }.map_err(BackendError::Api)
    }

    fn destroy_surface(&self, instance: &VulkanInstance, surface: vk::SurfaceKHR) -> BackendResult<()> {
        unsafe { instance.surface_loader.destroy_surface(surface, None) };
        Ok(())
    }

    fn destroy_allocator(&self, allocator: vk_mem::Allocator) {
        drop(allocator);
    }

    fn destroy_device(&self, device: Device) {
        unsafe { device.destroy_device(None) };
    }

    fn destroy_instance(&self, instance: VulkanInstance) {
        unsafe {
            if let Some((debug_utils, messenger)) = &instance.debug_messenger {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }
            instance.instance.destroy_instance(None);
        }
    }
}
