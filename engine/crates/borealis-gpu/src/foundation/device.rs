use std::{ffi::CStr, ops::Deref, rc::Rc};

use ash::vk;
use itertools::Itertools;

use crate::foundation::{
    debug_utils::{GpuDebugType, GpuDebugUtils},
    instance::GpuInstance,
    physical_device::GpuPhysicalDevice,
};

pub struct GpuDevice {
    handle: ash::Device,

    /// swapchain 扩展的函数指针
    swapchain_pf: ash::khr::swapchain::Device,

    debug_utils: GpuDebugUtils,

    graphics_queue_family_index: u32,
    limits: vk::PhysicalDeviceLimits,

    _instance: Rc<GpuInstance>,
}

impl Deref for GpuDevice {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for GpuDevice {
    fn drop(&mut self) {
        log::info!("Destroying GpuDevice");
        unsafe {
            self.handle.destroy_device(None);
        }
    }
}

// 创建
impl GpuDevice {
    pub fn new(instance: Rc<GpuInstance>, pdevice: &GpuPhysicalDevice, graphics_queue_family_index: u32) -> Self {
        // device 所需的所有 extension
        let device_exts = Self::basic_device_exts().iter().map(|e| e.as_ptr()).collect_vec();
        let mut exts_str = String::new();
        for ext in &device_exts {
            exts_str.push_str(&format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) }));
        }
        log::info!("device exts: {}", exts_str);

        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(graphics_queue_family_index)
            .queue_priorities(&[1.0])];

        // device 所需的所有 features
        let mut sync2_features = vk::PhysicalDeviceSynchronization2Features::default().synchronization2(true);
        let mut all_features = vk::PhysicalDeviceFeatures2::default()
            .features(Self::physical_device_basic_features())
            .push_next(&mut sync2_features);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_exts)
            .push_next(&mut all_features);

        let device =
            unsafe { instance.ash_instance().create_device(pdevice.handle, &device_create_info, None).unwrap() };

        let debug_utils = GpuDebugUtils::new(instance.ash_instance(), &device);
        let swapchain_pf = ash::khr::swapchain::Device::new(instance.ash_instance(), &device);

        Self {
            handle: device,
            swapchain_pf,
            debug_utils,
            graphics_queue_family_index,
            limits: pdevice.basic_props.limits,
            _instance: instance,
        }
    }

    /// 必要的 physical device core features
    fn physical_device_basic_features() -> vk::PhysicalDeviceFeatures {
        vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true)
    }

    /// 必要的 device extensions
    fn basic_device_exts() -> Vec<&'static CStr> {
        vec![ash::khr::swapchain::NAME]
    }
}

// getters
impl GpuDevice {
    #[inline]
    pub fn vk_handle(&self) -> vk::Device {
        self.handle.handle()
    }

    #[inline]
    pub fn swapchain_pf(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_pf
    }

    #[inline]
    pub fn debug_utils(&self) -> &GpuDebugUtils {
        &self.debug_utils
    }

    #[inline]
    pub fn graphics_queue_family_index(&self) -> u32 {
        self.graphics_queue_family_index
    }

    #[inline]
    pub fn min_ubo_offset_align(&self) -> vk::DeviceSize {
        self.limits.min_uniform_buffer_offset_alignment
    }
}

// tools
impl GpuDevice {
    /// 将 UBO 的尺寸和 min_UBO_Offset_Align 对齐，使得得到的尺寸是 min_UBO_Offset_Align 的整数倍
    #[inline]
    pub fn aligned_ubo_size<T: bytemuck::Pod>(&self) -> vk::DeviceSize {
        let min_ubo_align = self.limits.min_uniform_buffer_offset_alignment;
        let ubo_size = size_of::<T>() as vk::DeviceSize;
        (ubo_size + min_ubo_align - 1) & !(min_ubo_align - 1)
    }

    #[inline]
    pub fn set_debug_name<T: GpuDebugType>(&self, obj: &T, name: impl AsRef<str>) {
        self.debug_utils.set_debug_name(obj, name);
    }

    #[inline]
    pub fn set_object_debug_name<T: vk::Handle>(&self, handle: T, name: impl AsRef<str>) {
        self.debug_utils.set_object_debug_name(handle, name);
    }

    /// 阻塞等待 device 上所有 queue 空闲
    #[inline]
    pub fn wait_idle(&self) {
        unsafe {
            self.handle.device_wait_idle().unwrap();
        }
    }
}
