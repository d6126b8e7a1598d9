use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, instance::GpuInstance};

/// vk::SurfaceKHR 的封装，持有 instance 保证销毁顺序
pub struct GpuSurface {
    handle: vk::SurfaceKHR,
    pf: ash::khr::surface::Instance,

    _instance: Rc<GpuInstance>,
}

// new & init
impl GpuSurface {
    pub fn new(
        instance: Rc<GpuInstance>,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> Self {
        let surface_pf = ash::khr::surface::Instance::new(instance.entry(), instance.ash_instance());

        let handle = unsafe {
            ash_window::create_surface(instance.entry(), instance.ash_instance(), raw_display_handle, raw_window_handle, None)
                .unwrap()
        };

        Self {
            handle,
            pf: surface_pf,
            _instance: instance,
        }
    }
}

// getters
impl GpuSurface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// 指定的 queue family 是否支持向这个 surface 提交 present
    pub fn support_present(&self, pdevice: vk::PhysicalDevice, queue_family_index: u32) -> bool {
        unsafe { self.pf.get_physical_device_surface_support(pdevice, queue_family_index, self.handle).unwrap() }
    }

    pub fn get_capabilities(&self, pdevice: vk::PhysicalDevice) -> vk::SurfaceCapabilitiesKHR {
        unsafe { self.pf.get_physical_device_surface_capabilities(pdevice, self.handle).unwrap() }
    }

    pub fn get_formats(&self, pdevice: vk::PhysicalDevice) -> Vec<vk::SurfaceFormatKHR> {
        unsafe { self.pf.get_physical_device_surface_formats(pdevice, self.handle).unwrap() }
    }

    pub fn get_present_modes(&self, pdevice: vk::PhysicalDevice) -> Vec<vk::PresentModeKHR> {
        unsafe { self.pf.get_physical_device_surface_present_modes(pdevice, self.handle).unwrap() }
    }
}

impl Drop for GpuSurface {
    fn drop(&mut self) {
        unsafe { self.pf.destroy_surface(self.handle, None) }
    }
}

impl GpuDebugType for GpuSurface {
    fn debug_type_name() -> &'static str {
        "GpuSurface"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
