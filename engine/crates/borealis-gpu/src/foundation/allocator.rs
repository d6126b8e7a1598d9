use std::{ops::Deref, rc::Rc};

use ash::vk;

use crate::foundation::{device::GpuDevice, instance::GpuInstance, physical_device::GpuPhysicalDevice};

pub struct GpuAllocator {
    inner: vk_mem::Allocator,

    _instance: Rc<GpuInstance>,
    _device: Rc<GpuDevice>,
}

impl Deref for GpuAllocator {
    type Target = vk_mem::Allocator;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Drop for GpuAllocator {
    fn drop(&mut self) {
        log::info!("Destroying GpuAllocator");
        // vk_mem 是 RAII 的
    }
}

impl GpuAllocator {
    /// vma 需要引用 Instance 以及 Device，并确保在其生命周期之内这两个的引用是有效的。
    /// 因此持有两者的 Rc，确保 Instance 和 Device 比 allocator 活得更久
    pub fn new(instance: Rc<GpuInstance>, pdevice: &GpuPhysicalDevice, device: Rc<GpuDevice>) -> Self {
        let mut vma_ci = vk_mem::AllocatorCreateInfo::new(instance.ash_instance(), &device, pdevice.handle);
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;

        let vma = unsafe { vk_mem::Allocator::new(vma_ci).unwrap() };

        Self {
            inner: vma,
            _instance: instance,
            _device: device,
        }
    }
}
