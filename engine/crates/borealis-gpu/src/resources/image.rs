use std::rc::Rc;

use ash::vk;
use vk_mem::{Alloc, Allocation};

use crate::{
    context::GpuContext,
    foundation::{allocator::GpuAllocator, debug_utils::GpuDebugType},
};

/// Image 来源枚举
pub enum ImageSource {
    /// 由 VMA 分配的 Image
    Allocated(Allocation),
    /// 外部 Image（例如 Swapchain Image），不管理其内存生命周期
    External,
}

pub struct GpuImage {
    handle: vk::Image,
    source: ImageSource,

    extent: vk::Extent3D,
    format: vk::Format,
    mip_levels: u32,
    layer_count: u32,

    name: String,

    allocator: Rc<GpuAllocator>,
}

impl GpuDebugType for GpuImage {
    fn debug_type_name() -> &'static str {
        "GpuImage"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        log::debug!("Destroying GpuImage: {}", self.name);

        match &mut self.source {
            ImageSource::External => (),
            ImageSource::Allocated(allocation) => unsafe {
                self.allocator.destroy_image(self.handle, allocation);
            },
        }
    }
}

// new & init
impl GpuImage {
    pub fn new(
        ctx: &GpuContext,
        image_info: &GpuImageCreateInfo,
        alloc_info: &vk_mem::AllocationCreateInfo,
        debug_name: &str,
    ) -> Self {
        let allocator = ctx.allocator();
        let (image, alloc) = unsafe { allocator.create_image(image_info.as_info(), alloc_info).unwrap() };
        let image = Self {
            handle: image,
            source: ImageSource::Allocated(alloc),
            extent: image_info.inner.extent,
            format: image_info.inner.format,
            mip_levels: image_info.inner.mip_levels,
            layer_count: image_info.inner.array_layers,
            name: debug_name.to_string(),
            allocator: allocator.clone(),
        };
        ctx.device().set_debug_name(&image, debug_name);
        image
    }

    /// device local 的默认分配参数
    #[inline]
    pub fn device_local_alloc_info() -> vk_mem::AllocationCreateInfo {
        vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::AutoPreferDevice,
            ..Default::default()
        }
    }
}

// getters
impl GpuImage {
    #[inline]
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }
}

pub struct GpuImageCreateInfo {
    inner: vk::ImageCreateInfo<'static>,
}

impl GpuImageCreateInfo {
    /// 普通的 2D image
    #[inline]
    pub fn new_image_2d_info(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            inner: vk::ImageCreateInfo {
                image_type: vk::ImageType::TYPE_2D,
                format,
                extent: extent.into(),
                mip_levels: 1,
                array_layers: 1,
                samples: vk::SampleCountFlags::TYPE_1,
                tiling: vk::ImageTiling::OPTIMAL,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                // spec 上面说，这里只能是 UNDEFINED 或者 PREINITIALIZED
                initial_layout: vk::ImageLayout::UNDEFINED,
                ..Default::default()
            },
        }
    }

    /// depth attachment
    #[inline]
    pub fn new_depth_info(extent: vk::Extent2D, format: vk::Format) -> Self {
        Self::new_image_2d_info(
            extent,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        )
    }

    /// shadow map：depth attachment + 可供 shader 采样
    #[inline]
    pub fn new_shadow_map_info(extent: vk::Extent2D, format: vk::Format) -> Self {
        Self::new_image_2d_info(
            extent,
            format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
        )
    }

    /// 离屏渲染目标：可作为 color attachment，也可作为拷贝源
    #[inline]
    pub fn new_offscreen_color_info(extent: vk::Extent2D, format: vk::Format) -> Self {
        Self::new_image_2d_info(
            extent,
            format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC,
        )
    }

    /// cube map：6 个 array layer，CUBE_COMPATIBLE
    #[inline]
    pub fn new_cube_info(size: u32, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self {
            inner: vk::ImageCreateInfo {
                flags: vk::ImageCreateFlags::CUBE_COMPATIBLE,
                image_type: vk::ImageType::TYPE_2D,
                format,
                extent: vk::Extent3D {
                    width: size,
                    height: size,
                    depth: 1,
                },
                mip_levels: 1,
                array_layers: 6,
                samples: vk::SampleCountFlags::TYPE_1,
                tiling: vk::ImageTiling::OPTIMAL,
                usage,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn as_info(&self) -> &vk::ImageCreateInfo<'static> {
        &self.inner
    }

    // builder
    #[inline]
    pub fn mip_levels(mut self, mip_levels: u32) -> Self {
        self.inner.mip_levels = mip_levels;
        self
    }

    // builder
    #[inline]
    pub fn usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.inner.usage = usage;
        self
    }
}
