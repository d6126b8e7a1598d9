use std::{ptr, rc::Rc};

use ash::vk;
use vk_mem::Alloc;

use crate::{
    context::GpuContext,
    foundation::{allocator::GpuAllocator, debug_utils::GpuDebugType},
};

pub struct GpuBuffer {
    handle: vk::Buffer,
    allocation: vk_mem::Allocation,

    size: vk::DeviceSize,

    /// 在初始化阶段写死
    map_ptr: Option<*mut u8>,

    debug_name: String,

    allocator: Rc<GpuAllocator>,
}

impl GpuDebugType for GpuBuffer {
    fn debug_type_name() -> &'static str {
        "GpuBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.map_ptr.is_some() {
                self.allocator.unmap_memory(&mut self.allocation);
            }

            self.allocator.destroy_buffer(self.handle, &mut self.allocation);
        }
    }
}

// new & init
impl GpuBuffer {
    /// - align: 当 buffer 处于一个大的 memory block 中时，align 用来指定 buffer 的起始 offset
    ///   的内存对齐，默认对齐到 8 字节
    /// - 优先使用 device memory
    pub fn new(
        ctx: &GpuContext,
        buffer_size: vk::DeviceSize,
        buffer_usage: vk::BufferUsageFlags,
        align: Option<vk::DeviceSize>,
        mem_map: bool,
        name: impl AsRef<str>,
    ) -> Self {
        let allocator = ctx.allocator();

        let buffer_ci = vk::BufferCreateInfo::default().size(buffer_size).usage(buffer_usage);
        let alloc_ci = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            flags: if mem_map {
                vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM
            } else {
                vk_mem::AllocationCreateFlags::empty()
            },
            ..Default::default()
        };

        let align = align.unwrap_or(8);
        let (buffer, mut alloc) =
            unsafe { allocator.create_buffer_with_alignment(&buffer_ci, &alloc_ci, align).unwrap() };

        let mut mapped_ptr = None;
        if mem_map {
            unsafe {
                mapped_ptr = Some(allocator.map_memory(&mut alloc).unwrap());
            }
        }

        ctx.device().set_object_debug_name(buffer, format!("Buffer::{}", name.as_ref()));
        Self {
            handle: buffer,
            allocation: alloc,
            size: buffer_size,
            map_ptr: mapped_ptr,
            debug_name: name.as_ref().to_string(),
            allocator: allocator.clone(),
        }
    }

    #[inline]
    pub fn new_stage_buffer(ctx: &GpuContext, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(ctx, size, vk::BufferUsageFlags::TRANSFER_SRC, None, true, debug_name)
    }

    #[inline]
    pub fn new_vertex_buffer(ctx: &GpuContext, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            ctx,
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            None,
            false,
            debug_name,
        )
    }

    #[inline]
    pub fn new_index_buffer(ctx: &GpuContext, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            ctx,
            size,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            None,
            false,
            debug_name,
        )
    }

    /// uniform buffer：host visible 且常驻 map，align 到 min_UBO_offset_align
    #[inline]
    pub fn new_uniform_buffer(ctx: &GpuContext, size: vk::DeviceSize, debug_name: impl AsRef<str>) -> Self {
        Self::new(
            ctx,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            Some(ctx.device().min_ubo_offset_align()),
            true,
            debug_name,
        )
    }
}

// getters
impl GpuBuffer {
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn mapped_ptr(&self) -> *mut u8 {
        self.map_ptr.expect("Buffer is not mapped, create it with mem_map before using mapped_ptr()")
    }
}

// tools
impl GpuBuffer {
    #[inline]
    pub fn flush(&self, offset: vk::DeviceSize, size: vk::DeviceSize) {
        self.allocator.flush_allocation(&self.allocation, offset, size).unwrap();
    }

    /// 通过 mem map 的方式将 data 写入 buffer 的 offset 处
    pub fn write_at_offset<T>(&self, offset: vk::DeviceSize, data: &[T])
    where
        T: Sized + Copy,
    {
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr() as *const u8, self.mapped_ptr().add(offset as usize), size_of_val(data));
        }
        self.allocator.flush_allocation(&self.allocation, offset, size_of_val(data) as vk::DeviceSize).unwrap();
    }

    /// 通过 mem map 的方式将 data 传入到 buffer 中
    pub fn transfer_data_by_mmap<T>(&self, data: &[T])
    where
        T: Sized + Copy,
    {
        self.write_at_offset(0, data);
    }

    #[inline]
    pub fn invalidate(&self, offset: vk::DeviceSize, size: vk::DeviceSize) {
        self.allocator.invalidate_allocation(&self.allocation, offset, size).unwrap();
    }

    /// 通过 mem map 的方式从 buffer 的 offset 处读出 count 个元素
    ///
    /// 调用前必须保证 GPU 写入已经结束（fence 或者 wait idle）
    pub fn read_at_offset<T>(&self, offset: vk::DeviceSize, count: usize) -> Vec<T>
    where
        T: Sized + Copy,
    {
        let byte_len = count * size_of::<T>();
        self.invalidate(offset, byte_len as vk::DeviceSize);

        let mut out = Vec::with_capacity(count);
        unsafe {
            ptr::copy_nonoverlapping(self.mapped_ptr().add(offset as usize) as *const T, out.as_mut_ptr(), count);
            out.set_len(count);
        }
        out
    }

    /// 创建一个临时的 stage buffer，先将数据放入 stage buffer，再 transfer 到 self
    ///
    /// 这个函数是同步等待的，会阻塞运行
    ///
    /// # Note
    /// * 避免使用这个将 *小块* 数据从内存传到 GPU
    /// * 这个应该是用来传输大块数据的
    pub fn transfer_data_sync(&self, ctx: &GpuContext, data: &[impl Sized + Copy]) {
        let stage_buffer =
            Self::new_stage_buffer(ctx, size_of_val(data) as vk::DeviceSize, format!("{}-stage", self.debug_name));

        stage_buffer.transfer_data_by_mmap(data);

        let cmd_name = format!("{}-transfer-data", &self.debug_name);
        ctx.one_time_exec(
            |cmd| {
                cmd.cmd_copy_buffer(
                    &stage_buffer,
                    self,
                    &[vk::BufferCopy {
                        size: size_of_val(data) as vk::DeviceSize,
                        ..Default::default()
                    }],
                );
            },
            &cmd_name,
        );
    }
}
