use std::ffi::CStr;

use ash::vk;
use itertools::Itertools;

use crate::swapchain::surface::GpuSurface;

/// 表示一张物理显卡
pub struct GpuPhysicalDevice {
    pub handle: vk::PhysicalDevice,

    /// 当前 gpu 支持的 features
    pub features: vk::PhysicalDeviceFeatures,

    /// 当前 gpu 支持的 device extensions
    pub device_extensions: Vec<vk::ExtensionProperties>,

    /// 当前 gpu 的基础属性
    pub basic_props: vk::PhysicalDeviceProperties,

    pub memory_properties: vk::PhysicalDeviceMemoryProperties,

    pub queue_family_properties: Vec<vk::QueueFamilyProperties>,
}

impl GpuPhysicalDevice {
    /// 创建一个新的物理显卡实例
    ///
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    pub fn new_discrete_physical_device(instance: &ash::Instance) -> Self {
        unsafe {
            instance
                .enumerate_physical_devices()
                .unwrap()
                .iter()
                .map(|pdevice| GpuPhysicalDevice::new(*pdevice, instance))
                // 优先使用独立显卡
                .find_or_first(GpuPhysicalDevice::is_discrete_gpu)
                .unwrap()
        }
    }

    pub fn new(pdevice: vk::PhysicalDevice, instance: &ash::Instance) -> Self {
        unsafe {
            let basic_props = instance.get_physical_device_properties(pdevice);
            let physical_device_name = CStr::from_ptr(basic_props.device_name.as_ptr());
            log::info!("found gpu: {:?}", physical_device_name);

            // 找到当前 gpu 支持的 extensions，并打印出来
            let device_extensions = instance.enumerate_device_extension_properties(pdevice).unwrap();
            log::debug!("device supports extensions: ");
            for ext in &device_extensions {
                let ext_name = CStr::from_ptr(ext.extension_name.as_ptr());
                log::debug!("\t{:?}", ext_name.to_str().unwrap());
            }

            Self {
                memory_properties: instance.get_physical_device_memory_properties(pdevice),
                features: instance.get_physical_device_features(pdevice),
                handle: pdevice,
                basic_props,
                queue_family_properties: instance.get_physical_device_queue_family_properties(pdevice),
                device_extensions,
            }
        }
    }
}

// getters
impl GpuPhysicalDevice {
    #[inline]
    /// 当前 gpu 是否是独立显卡
    pub fn is_discrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }

    /// 当 uniform buffer 的 descriptor 在更新时，其 offset 必须是这个值的整数倍
    ///
    /// 注：这个值一定是 power of 2
    #[inline]
    pub fn min_ubo_offset_align(&self) -> vk::DeviceSize {
        self.basic_props.limits.min_uniform_buffer_offset_alignment
    }
}

// tools
impl GpuPhysicalDevice {
    /// 找到同时支持 graphics 和 present 的 queue family 的 index
    pub fn find_graphics_present_family(&self, surface: &GpuSurface) -> Option<u32> {
        self.queue_family_properties
            .iter()
            .enumerate()
            .find(|(index, prop)| {
                prop.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                    && surface.support_present(self.handle, *index as u32)
            })
            .map(|(index, _)| index as u32)
    }

    /// 从候选格式中筛选出支持指定 tiling/feature 的格式
    pub fn find_supported_format(
        &self,
        instance: &ash::Instance,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Vec<vk::Format> {
        candidates
            .iter()
            .filter(|f| {
                let props = unsafe { instance.get_physical_device_format_properties(self.handle, **f) };
                match tiling {
                    vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
                    vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
                    _ => panic!("not supported tiling."),
                }
            })
            .copied()
            .collect()
    }
}
