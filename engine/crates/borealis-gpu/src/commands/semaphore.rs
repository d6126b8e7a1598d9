use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

/// 没有实现 Clone，因此可以放心地在 Drop 中销毁
pub struct GpuSemaphore {
    semaphore: vk::Semaphore,
    device: Rc<GpuDevice>,
}

impl GpuDebugType for GpuSemaphore {
    fn debug_type_name() -> &'static str {
        "GpuSemaphore"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.semaphore
    }
}

impl Drop for GpuSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

impl GpuSemaphore {
    pub fn new(device: Rc<GpuDevice>, debug_name: &str) -> Self {
        let semaphore = unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None).unwrap() };

        let semaphore = Self { semaphore, device: device.clone() };
        device.set_debug_name(&semaphore, debug_name);
        semaphore
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}
