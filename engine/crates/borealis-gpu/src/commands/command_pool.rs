use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

/// command pool 是和 queue family 绑定的，而不是和 queue 绑定的
pub struct GpuCommandPool {
    handle: vk::CommandPool,
    queue_family_index: u32,

    device: Rc<GpuDevice>,
    _debug_name: String,
}

impl GpuDebugType for GpuCommandPool {
    fn debug_type_name() -> &'static str {
        "GpuCommandPool"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for GpuCommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.handle, None);
        }
    }
}

impl GpuCommandPool {
    #[inline]
    pub fn new(
        device: Rc<GpuDevice>,
        queue_family_index: u32,
        flags: vk::CommandPoolCreateFlags,
        debug_name: &str,
    ) -> Self {
        let pool = unsafe {
            device
                .create_command_pool(
                    &vk::CommandPoolCreateInfo::default().queue_family_index(queue_family_index).flags(flags),
                    None,
                )
                .unwrap()
        };

        let command_pool = Self {
            handle: pool,
            queue_family_index,
            device: device.clone(),
            _debug_name: debug_name.to_string(),
        };
        device.set_debug_name(&command_pool, debug_name);
        command_pool
    }

    // getters
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// 这个调用并不会释放资源，而是将 pool 内的 command buffer 设置到初始状态
    ///
    /// reset 之后，pool 内的 command buffer 又可以重新录制命令
    pub fn reset_all_buffers(&self) {
        unsafe {
            self.device.reset_command_pool(self.handle, vk::CommandPoolResetFlags::RELEASE_RESOURCES).unwrap();
        }
    }
}
