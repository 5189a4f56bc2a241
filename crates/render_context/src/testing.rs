//! Recording backend for lifecycle tests
//!
//! Implements [`GraphicsBackend`] without a GPU. Every call is appended to a
//! shared log, live handles are counted, and any creation stage can be made
//! to fail on demand.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ash::vk;

use crate::backend::{GraphicsBackend, SurfaceSource};
use crate::config::{ApiVersion, PlatformConfig};
use crate::error::{BackendError, BackendResult, InitStage};

/// A backend call, in the order it was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    CreateInstance,
    EnumerateDevices,
    CreateDevice,
    CreateAllocator,
    WaitIdle,
    CreateSurface,
    DestroySurface,
    DestroyAllocator,
    DestroyDevice,
    DestroyInstance,
}

#[derive(Debug)]
pub struct FakeInstance {
    pub id: u64,
    pub api_version: ApiVersion,
    pub extensions: Vec<String>,
    pub enumerate_portability: bool,
}

#[derive(Debug)]
pub struct FakeDevice {
    pub physical_device: u32,
    pub extensions: Vec<String>,
}

#[derive(Debug)]
pub struct FakeAllocator {
    pub physical_device: u32,
    pub api_version: ApiVersion,
}

/// Shared call log and failure switches
#[derive(Default)]
pub struct Recorder {
    calls: RefCell<Vec<Call>>,
    devices: Vec<u32>,
    fail_stage: Cell<Option<InitStage>>,
    fail_bind: Cell<bool>,
    fail_unbind: Cell<bool>,
    fail_wait_idle: Cell<bool>,
    next_id: Cell<u64>,
    instance_alive: Cell<bool>,
    device_alive: Cell<bool>,
    allocator_alive: Cell<bool>,
    surfaces: RefCell<HashMap<u64, u64>>,
}

impl Recorder {
    /// Recorder whose instance reports the given physical devices
    pub fn with_devices(devices: Vec<u32>) -> Rc<Self> {
        Rc::new(Self {
            devices,
            next_id: Cell::new(1),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn fail_stage(&self, stage: InitStage) {
        self.fail_stage.set(Some(stage));
    }

    pub fn fail_next_bind(&self) {
        self.fail_bind.set(true);
    }

    pub fn fail_next_unbind(&self) {
        self.fail_unbind.set(true);
    }

    pub fn fail_wait_idle(&self, fail: bool) {
        self.fail_wait_idle.set(fail);
    }

    pub fn instance_alive(&self) -> bool {
        self.instance_alive.get()
    }

    pub fn device_alive(&self) -> bool {
        self.device_alive.get()
    }

    pub fn allocator_alive(&self) -> bool {
        self.allocator_alive.get()
    }

    pub fn live_surfaces(&self) -> usize {
        self.surfaces.borrow().len()
    }

    /// Instance id a live surface was created against
    pub fn surface_instance(&self, surface: u64) -> Option<u64> {
        self.surfaces.borrow().get(&surface).copied()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, stage: InitStage) -> BackendResult<()> {
        if self.fail_stage.get() == Some(stage) {
            Err(BackendError::Api(vk::Result::ERROR_INITIALIZATION_FAILED))
        } else {
            Ok(())
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

pub struct RecordingBackend {
    recorder: Rc<Recorder>,
}

impl RecordingBackend {
    pub fn new(recorder: Rc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl GraphicsBackend for RecordingBackend {
    type Instance = FakeInstance;
    type PhysicalDevice = u32;
    type Device = FakeDevice;
    type Queue = (u32, u32);
    type Allocator = FakeAllocator;
    type Surface = u64;

    fn create_instance(
        &self,
        _application_name: &str,
        api_version: ApiVersion,
        extensions: &[String],
        platform: &PlatformConfig,
        _enable_validation: bool,
    ) -> BackendResult<FakeInstance> {
        self.recorder.record(Call::CreateInstance);
        self.recorder.check(InitStage::CreateInstance)?;
        self.recorder.instance_alive.set(true);
        Ok(FakeInstance {
            id: self.recorder.next_id(),
            api_version,
            extensions: extensions.to_vec(),
            enumerate_portability: platform.enumerate_portability,
        })
    }

    fn presentation_device_extensions(&self) -> Vec<String> {
        vec!["VK_KHR_swapchain".to_string()]
    }

    fn enumerate_physical_devices(&self, _instance: &FakeInstance) -> BackendResult<Vec<u32>> {
        self.recorder.record(Call::EnumerateDevices);
        self.recorder.check(InitStage::EnumerateDevices)?;
        Ok(self.recorder.devices.clone())
    }

    fn physical_device_name(&self, _instance: &FakeInstance, physical_device: u32) -> String {
        format!("Fake GPU {physical_device}")
    }

    fn create_device(
        &self,
        _instance: &FakeInstance,
        physical_device: u32,
        _queue_family: u32,
        extensions: &[String],
    ) -> BackendResult<FakeDevice> {
        self.recorder.record(Call::CreateDevice);
        self.recorder.check(InitStage::CreateDevice)?;
        self.recorder.device_alive.set(true);
        Ok(FakeDevice {
            physical_device,
            extensions: extensions.to_vec(),
        })
    }

    fn device_queue(&self, _device: &FakeDevice, queue_family: u32, queue_index: u32) -> (u32, u32) {
        (queue_family, queue_index)
    }

    fn create_allocator(
        &self,
        _instance: &FakeInstance,
        physical_device: u32,
        _device: &FakeDevice,
        api_version: ApiVersion,
    ) -> BackendResult<FakeAllocator> {
        self.recorder.record(Call::CreateAllocator);
        self.recorder.check(InitStage::CreateAllocator)?;
        self.recorder.allocator_alive.set(true);
        Ok(FakeAllocator {
            physical_device,
            api_version,
        })
    }

    fn device_wait_idle(&self, _device: &FakeDevice) -> BackendResult<()> {
        self.recorder.record(Call::WaitIdle);
        if self.recorder.fail_wait_idle.get() {
            Err(BackendError::Api(vk::Result::ERROR_DEVICE_LOST))
        } else {
            Ok(())
        }
    }

    fn destroy_surface(&self, instance: &FakeInstance, surface: u64) -> BackendResult<()> {
        self.recorder.record(Call::DestroySurface);
        if self.recorder.fail_unbind.replace(false) {
            return Err(BackendError::Other("surface busy".to_string()));
        }
        let owner = self.recorder.surfaces.borrow_mut().remove(&surface);
        assert_eq!(owner, Some(instance.id), "surface destroyed against the wrong instance");
        Ok(())
    }

    fn destroy_allocator(&self, _allocator: FakeAllocator) {
        self.recorder.record(Call::DestroyAllocator);
        assert!(self.recorder.allocator_alive.replace(false));
    }

    fn destroy_device(&self, _device: FakeDevice) {
        self.recorder.record(Call::DestroyDevice);
        assert!(!self.recorder.allocator_alive(), "device destroyed before allocator");
        assert!(self.recorder.device_alive.replace(false));
    }

    fn destroy_instance(&self, _instance: FakeInstance) {
        self.recorder.record(Call::DestroyInstance);
        assert!(!self.recorder.device_alive(), "instance destroyed before device");
        assert_eq!(self.recorder.live_surfaces(), 0, "instance destroyed with a live surface");
        assert!(self.recorder.instance_alive.replace(false));
    }
}

/// Window stand-in reporting fixed extensions
pub struct FakeWindow {
    recorder: Rc<Recorder>,
}

impl FakeWindow {
    pub const EXTENSIONS: [&'static str; 2] = ["VK_KHR_surface", "VK_KHR_xlib_surface"];

    pub fn new(recorder: Rc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl SurfaceSource<RecordingBackend> for FakeWindow {
    fn required_instance_extensions(&self) -> BackendResult<Vec<String>> {
        self.recorder.check(InitStage::QueryExtensions)?;
        Ok(Self::EXTENSIONS.iter().map(|name| (*name).to_string()).collect())
    }

    fn create_surface(&self, _backend: &RecordingBackend, instance: &FakeInstance) -> BackendResult<u64> {
        self.recorder.record(Call::CreateSurface);
        if self.recorder.fail_bind.replace(false) {
            return Err(BackendError::Window("no native window".to_string()));
        }
        let surface = self.recorder.next_id();
        self.recorder.surfaces.borrow_mut().insert(surface, instance.id);
        Ok(surface)
    }
}
