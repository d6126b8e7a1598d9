use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

/// 没有实现 Clone，因此可以放心地在 Drop 中销毁
pub struct GpuFence {
    fence: vk::Fence,
    device: Rc<GpuDevice>,
}

impl GpuDebugType for GpuFence {
    fn debug_type_name() -> &'static str {
        "GpuFence"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.fence
    }
}

impl Drop for GpuFence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

// 创建与销毁
impl GpuFence {
    /// # param
    /// * signaled - 是否创建时就 signaled
    pub fn new(device: Rc<GpuDevice>, signaled: bool, debug_name: &str) -> Self {
        let fence_flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default().flags(fence_flags), None).unwrap() };

        let fence = Self { fence, device: device.clone() };
        device.set_debug_name(&fence, debug_name);
        fence
    }
}

// getters
impl GpuFence {
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

// tools
impl GpuFence {
    /// 阻塞等待 fence，没有超时时间
    ///
    /// 等待失败是无法恢复的错误，直接 panic
    #[inline]
    pub fn wait(&self) {
        unsafe {
            self.device.wait_for_fences(std::slice::from_ref(&self.fence), true, u64::MAX).unwrap();
        }
    }

    #[inline]
    pub fn reset(&self) {
        unsafe {
            self.device.reset_fences(std::slice::from_ref(&self.fence)).unwrap();
        }
    }
}
