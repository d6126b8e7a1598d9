use std::rc::Rc;

use ash::vk;

use crate::{
    commands::{
        command_buffer::GpuCommandBuffer,
        command_pool::GpuCommandPool,
        queue::GpuQueue,
        submit_info::GpuSubmitInfo,
    },
    foundation::{
        allocator::GpuAllocator,
        debug_utils::GpuDebugMessenger,
        device::GpuDevice,
        instance::GpuInstance,
        physical_device::GpuPhysicalDevice,
    },
    swapchain::surface::GpuSurface,
};

/// Vulkan 图形上下文
///
/// 管理所有 Vulkan 核心资源，包括实例、设备、队列、内存分配器等。
/// 上下文通过引用向下传递；各资源持有 `Rc`，销毁顺序由引用计数保证，
/// 不需要显式的 destroy 调用。
///
/// # 初始化流程
/// ```ignore
/// let ctx = GpuContext::new("MyApp", display_handle, window_handle, true);
/// let buffer = GpuBuffer::new_vertex_buffer(&ctx, 1024, "triangle");
/// // ctx 离开作用域时自动销毁
/// ```
pub struct GpuContext {
    instance: Rc<GpuInstance>,
    _debug_messenger: GpuDebugMessenger,

    physical_device: GpuPhysicalDevice,
    surface: Rc<GpuSurface>,

    device: Rc<GpuDevice>,
    allocator: Rc<GpuAllocator>,

    graphics_queue: GpuQueue,

    /// 临时的 graphics command pool，用于一次性的命令
    temp_graphics_command_pool: Rc<GpuCommandPool>,
}

// new & init
impl GpuContext {
    const ENGINE_NAME: &'static str = "Borealis";

    pub fn new(
        app_name: &str,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
        enable_validation: bool,
    ) -> Self {
        let window_exts = ash_window::enumerate_required_extensions(raw_display_handle).unwrap();
        let instance = Rc::new(GpuInstance::new(app_name, Self::ENGINE_NAME, window_exts, enable_validation));
        let debug_messenger = GpuDebugMessenger::new(instance.clone());

        let surface = Rc::new(GpuSurface::new(instance.clone(), raw_display_handle, raw_window_handle));
        let physical_device = GpuPhysicalDevice::new_discrete_physical_device(instance.ash_instance());

        // 单队列设计：graphics 和 present 用同一个 queue family
        let graphics_queue_family_index = physical_device
            .find_graphics_present_family(&surface)
            .expect("no queue family supports both graphics and present");

        let device = Rc::new(GpuDevice::new(instance.clone(), &physical_device, graphics_queue_family_index));
        let allocator = Rc::new(GpuAllocator::new(instance.clone(), &physical_device, device.clone()));
        let graphics_queue = GpuQueue::new(device.clone(), graphics_queue_family_index, "graphics");
        let temp_graphics_command_pool = Rc::new(GpuCommandPool::new(
            device.clone(),
            graphics_queue_family_index,
            vk::CommandPoolCreateFlags::empty(),
            "context-one-time",
        ));

        // 在 device 之前创建的 vk::Handle，现在补上 debug name
        {
            device.set_object_debug_name(instance.vk_instance(), "GpuInstance");
            device.set_object_debug_name(physical_device.handle, "GpuPhysicalDevice");
            device.set_object_debug_name(device.vk_handle(), "GpuDevice");
            device.set_debug_name(&*surface, "main");
        }

        Self {
            instance,
            _debug_messenger: debug_messenger,
            physical_device,
            surface,
            device,
            allocator,
            graphics_queue,
            temp_graphics_command_pool,
        }
    }
}

// getters
impl GpuContext {
    #[inline]
    pub fn instance(&self) -> &Rc<GpuInstance> {
        &self.instance
    }

    #[inline]
    pub fn physical_device(&self) -> &GpuPhysicalDevice {
        &self.physical_device
    }

    #[inline]
    pub fn surface(&self) -> &Rc<GpuSurface> {
        &self.surface
    }

    #[inline]
    pub fn device(&self) -> &Rc<GpuDevice> {
        &self.device
    }

    #[inline]
    pub fn allocator(&self) -> &Rc<GpuAllocator> {
        &self.allocator
    }

    #[inline]
    pub fn graphics_queue(&self) -> &GpuQueue {
        &self.graphics_queue
    }

    /// 当 uniform buffer 的 descriptor 在更新时，其 offset 必须是这个值的整数倍
    ///
    /// 注：这个值一定是 power of 2
    #[inline]
    pub fn min_ubo_offset_align(&self) -> vk::DeviceSize {
        self.physical_device.min_ubo_offset_align()
    }
}

// tools
impl GpuContext {
    /// 根据给定的候选格式，返回当前设备支持的格式
    pub fn find_supported_format(
        &self,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Vec<vk::Format> {
        self.physical_device.find_supported_format(self.instance.ash_instance(), candidates, tiling, features)
    }

    /// 立即执行某个 command，并同步等待执行结果
    pub fn one_time_exec<F, R>(&self, func: F, name: impl AsRef<str>) -> R
    where
        F: FnOnce(&GpuCommandBuffer) -> R,
    {
        let command_buffer = GpuCommandBuffer::new(
            self.device.clone(),
            self.temp_graphics_command_pool.clone(),
            &format!("one-time-{}", name.as_ref()),
        );

        command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, name.as_ref());
        let result = func(&command_buffer);
        command_buffer.end();

        self.graphics_queue.submit(&[GpuSubmitInfo::new(std::slice::from_ref(&command_buffer))], None);
        self.graphics_queue.wait_idle();
        command_buffer.free();

        result
    }

    pub fn wait_idle(&self) {
        self.device.wait_idle();
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        log::info!("destroying gpu context");
        self.device.wait_idle();
    }
}
