use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

/// 描述符池创建信息
///
/// pool_sizes 必须和 inner 里的裸指针一起保存，保证指针有效
pub struct GpuDescriptorPoolCreateInfo {
    inner: vk::DescriptorPoolCreateInfo<'static>,
    _pool_sizes: Vec<vk::DescriptorPoolSize>,
}

impl GpuDescriptorPoolCreateInfo {
    #[inline]
    pub fn new(flags: vk::DescriptorPoolCreateFlags, max_sets: u32, pool_sizes: Vec<vk::DescriptorPoolSize>) -> Self {
        let inner = vk::DescriptorPoolCreateInfo {
            flags,
            max_sets,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        Self {
            inner,
            _pool_sizes: pool_sizes,
        }
    }
}

/// 描述符池，分配出的 descriptor set 跟随 pool 一起销毁
pub struct GpuDescriptorPool {
    handle: vk::DescriptorPool,
    _info: Rc<GpuDescriptorPoolCreateInfo>,

    device: Rc<GpuDevice>,
    name: String,
}

impl GpuDescriptorPool {
    #[inline]
    pub fn new(device: Rc<GpuDevice>, ci: Rc<GpuDescriptorPoolCreateInfo>, name: &str) -> Self {
        let pool = unsafe { device.create_descriptor_pool(&ci.inner, None).unwrap() };
        let pool = Self {
            handle: pool,
            _info: ci,
            device,
            name: name.to_string(),
        };
        pool.device.set_debug_name(&pool, name);
        pool
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.handle
    }

    #[inline]
    pub fn device(&self) -> &Rc<GpuDevice> {
        &self.device
    }
}

impl Drop for GpuDescriptorPool {
    fn drop(&mut self) {
        log::info!("destroying GpuDescriptorPool: {}", self.name);
        unsafe { self.device.destroy_descriptor_pool(self.handle, None) };
    }
}

impl GpuDebugType for GpuDescriptorPool {
    fn debug_type_name() -> &'static str {
        "GpuDescriptorPool"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
