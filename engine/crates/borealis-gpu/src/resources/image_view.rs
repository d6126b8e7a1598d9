use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

pub struct GpuImageView {
    handle: vk::ImageView,

    desc: GpuImageViewDesc,

    name: String,

    device: Rc<GpuDevice>,
}

impl GpuDebugType for GpuImageView {
    fn debug_type_name() -> &'static str {
        "GpuImageView"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for GpuImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
    }
}

// new & init
impl GpuImageView {
    pub fn new(device: Rc<GpuDevice>, image: vk::Image, view_desc: GpuImageViewDesc, name: impl AsRef<str>) -> Self {
        let info = vk::ImageViewCreateInfo {
            image,
            view_type: view_desc.view_type,
            format: view_desc.format,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: view_desc.aspect_mask,
                base_mip_level: view_desc.mip.0 as u32,
                level_count: view_desc.mip.1 as u32,
                base_array_layer: view_desc.layer.0 as u32,
                layer_count: view_desc.layer.1 as u32,
            },
            ..Default::default()
        };

        let handle = unsafe { device.create_image_view(&info, None).expect("Failed to create GpuImageView") };
        let image_view = Self {
            handle,
            desc: view_desc,
            name: name.as_ref().to_string(),
            device: device.clone(),
        };
        device.set_debug_name(&image_view, &name);
        image_view
    }
}

// getters
impl GpuImageView {
    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }

    #[inline]
    pub fn desc(&self) -> &GpuImageViewDesc {
        &self.desc
    }
}

impl std::fmt::Display for GpuImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpuImageView({}, {:?})", self.name, self.handle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuImageViewDesc {
    /// format 可以基于 vk::Image 重解释
    pub(crate) format: vk::Format,
    /// view type 可以基于 vk::Image 重解释
    pub(crate) view_type: vk::ImageViewType,
    /// aspect 可以基于 vk::Image 重解释
    pub(crate) aspect_mask: vk::ImageAspectFlags,
    /// base mip level 和 mip level count
    pub(crate) mip: (u8, u8),
    /// base layer 和 layer count
    pub(crate) layer: (u8, u8),
}

impl GpuImageViewDesc {
    pub fn new_2d(format: vk::Format, aspect: vk::ImageAspectFlags) -> Self {
        Self {
            format,
            view_type: vk::ImageViewType::TYPE_2D,
            aspect_mask: aspect,
            mip: (0, 1),
            layer: (0, 1),
        }
    }

    /// 覆盖全部 mip level 的 2D 视图
    pub fn new_2d_with_mips(format: vk::Format, aspect: vk::ImageAspectFlags, mip_count: u8) -> Self {
        Self {
            format,
            view_type: vk::ImageViewType::TYPE_2D,
            aspect_mask: aspect,
            mip: (0, mip_count),
            layer: (0, 1),
        }
    }

    /// 覆盖 6 个 face 的 cube 视图
    pub fn new_cube(format: vk::Format, mip_count: u8) -> Self {
        Self {
            format,
            view_type: vk::ImageViewType::CUBE,
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip: (0, mip_count),
            layer: (0, 6),
        }
    }

    /// 完整的视图描述
    ///
    /// # 参数
    /// - `mip_range`: (base_mip_level, level_count)
    /// - `layer_range`: (base_array_layer, layer_count)
    pub fn new(
        format: vk::Format,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
        mip_range: (u8, u8),
        layer_range: (u8, u8),
    ) -> Self {
        Self {
            format,
            view_type,
            aspect_mask,
            mip: mip_range,
            layer: layer_range,
        }
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        self.aspect_mask
    }
}
