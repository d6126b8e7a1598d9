//! vk::RenderPass 和 vk::Framebuffer 的 RAII 封装
//!
//! attachment 和 subpass 的组合由调用方给出，这里只负责创建和销毁。

use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

pub struct GpuRenderPass {
    handle: vk::RenderPass,

    device: Rc<GpuDevice>,
}

impl GpuRenderPass {
    pub fn new(device: Rc<GpuDevice>, render_pass_ci: &vk::RenderPassCreateInfo, debug_name: &str) -> Self {
        let handle = unsafe { device.create_render_pass(render_pass_ci, None).unwrap() };
        let render_pass = Self { handle, device };
        render_pass.device.set_debug_name(&render_pass, debug_name);
        render_pass
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.handle
    }
}

impl Drop for GpuRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.handle, None);
        }
    }
}

impl GpuDebugType for GpuRenderPass {
    fn debug_type_name() -> &'static str {
        "GpuRenderPass"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

pub struct GpuFramebuffer {
    handle: vk::Framebuffer,
    extent: vk::Extent2D,

    device: Rc<GpuDevice>,
}

impl GpuFramebuffer {
    pub fn new(
        device: Rc<GpuDevice>,
        render_pass: &GpuRenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
        debug_name: &str,
    ) -> Self {
        let framebuffer_ci = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let handle = unsafe { device.create_framebuffer(&framebuffer_ci, None).unwrap() };
        let framebuffer = Self {
            handle,
            extent,
            device,
        };
        framebuffer.device.set_debug_name(&framebuffer, debug_name);
        framebuffer
    }

    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.handle
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for GpuFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.handle, None);
        }
    }
}

impl GpuDebugType for GpuFramebuffer {
    fn debug_type_name() -> &'static str {
        "GpuFramebuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
