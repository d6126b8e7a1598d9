use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::{
    commands::{fence::GpuFence, submit_info::GpuSubmitInfo},
    foundation::{debug_utils::GpuDebugType, device::GpuDevice},
};

/// # destroy
///
/// vk::Queue 在 device 销毁时会被销毁，这里无需 Drop
pub struct GpuQueue {
    handle: vk::Queue,
    queue_family_index: u32,

    device: Rc<GpuDevice>,
}

impl GpuDebugType for GpuQueue {
    fn debug_type_name() -> &'static str {
        "GpuQueue"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl GpuQueue {
    pub fn new(device: Rc<GpuDevice>, queue_family_index: u32, debug_name: &str) -> Self {
        let handle = unsafe { device.get_device_queue(queue_family_index, 0) };
        let queue = Self {
            handle,
            queue_family_index,
            device: device.clone(),
        };
        device.set_debug_name(&queue, debug_name);
        queue
    }

    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// 一次 submit 提交多个 batch，每个 batch 有各自的 wait/signal semaphore
    pub fn submit(&self, batches: &[GpuSubmitInfo], fence: Option<&GpuFence>) {
        unsafe {
            // batches 的存在是有必要的，submit_infos 引用的是 batches 的内存
            let submit_infos = batches.iter().map(|b| b.submit_info()).collect_vec();
            self.device
                .queue_submit2(self.handle, &submit_infos, fence.map_or(vk::Fence::null(), |f| f.handle()))
                .unwrap()
        }
    }

    /// 根据 specification，vkQueueWaitIdle 应该和 Fence 效率相同
    #[inline]
    pub fn wait_idle(&self) {
        unsafe { self.device.queue_wait_idle(self.handle).unwrap() }
    }
}
