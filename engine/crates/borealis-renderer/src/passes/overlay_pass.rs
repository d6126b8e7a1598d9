//! overlay pass：在场景之上叠加 UI
//!
//! UI 顶点由外部每帧生成（立即模式），这里只负责搬运和绘制：
//! 顶点写进 slot 自己的 host-visible buffer，按 draw 切换 scissor。
//! color attachment 以 LOAD 接住 scene pass 的结果，
//! 结束时转换到 PRESENT_SRC。

use ash::vk;
use borealis_gpu::{
    basic::color::LabelColor,
    commands::command_buffer::GpuCommandBuffer,
    context::GpuContext,
    descriptors::{
        descriptor::{DescriptorBindings, GpuDescriptorSet, GpuDescriptorSetLayout, GpuWriteDescriptorSet},
        descriptor_pool::GpuDescriptorPool,
    },
    render_pass::{GpuFramebuffer, GpuRenderPass},
    resources::{buffer::GpuBuffer, texture::GpuTexture},
    swapchain::render_swapchain::GpuSwapchain,
};
use borealis_render_interface::{config::RenderConfig, frame_counter::FrameLabel, uniforms::OverlayPush, vertex::OverlayVertex};

use crate::{bindings::OverlayBindings, registry::PipelineRegistry};

/// 一次 UI 绘制：index buffer 的一个区间加一个裁剪矩形
#[derive(Debug, Clone, Copy)]
pub struct OverlayDraw {
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    /// framebuffer 像素坐标下的 [min_x, min_y, max_x, max_y]
    pub clip: [f32; 4],
}

/// 外部 UI 每帧产出的几何数据
#[derive(Debug, Default)]
pub struct OverlayFrameData {
    pub vertices: Vec<OverlayVertex>,
    pub indices: Vec<u32>,
    pub draws: Vec<OverlayDraw>,
}

pub struct OverlayPass {
    render_pass: GpuRenderPass,
    framebuffers: Vec<GpuFramebuffer>,

    /// UI 的字体/图片图集，初始化时注册一次
    atlas: GpuTexture,
    /// 图集是静态的，一个 set 所有 slot 共用
    binding_set: Option<GpuDescriptorSet<OverlayBindings>>,

    /// 每 slot 的顶点/索引 buffer，host-visible 常驻 map
    vertex_buffers: Vec<GpuBuffer>,
    index_buffers: Vec<GpuBuffer>,
}

impl OverlayPass {
    /// 每 slot 顶点 buffer 的容量，超出的 UI 数据整帧丢弃
    pub const MAX_VERTICES: usize = 65536;
    pub const MAX_INDICES: usize = Self::MAX_VERTICES * 3;
}

// new & init
impl OverlayPass {
    pub fn new(
        ctx: &GpuContext,
        config: &RenderConfig,
        swapchain: &GpuSwapchain,
        atlas_size: (u32, u32),
        atlas_rgba8: &[u8],
    ) -> Self {
        let render_pass = Self::create_render_pass(ctx, swapchain.color_format());
        let framebuffers = Self::create_framebuffers(ctx, &render_pass, swapchain);
        let atlas = GpuTexture::from_rgba8(ctx, atlas_size.0, atlas_size.1, atlas_rgba8, "overlay-atlas");

        let vertex_buffers = (0..config.frames_in_flight)
            .map(|i| {
                GpuBuffer::new(
                    ctx,
                    (Self::MAX_VERTICES * size_of::<OverlayVertex>()) as vk::DeviceSize,
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                    None,
                    true,
                    format!("overlay-vertices[{}]", FrameLabel::from_usize(i)),
                )
            })
            .collect();
        let index_buffers = (0..config.frames_in_flight)
            .map(|i| {
                GpuBuffer::new(
                    ctx,
                    (Self::MAX_INDICES * size_of::<u32>()) as vk::DeviceSize,
                    vk::BufferUsageFlags::INDEX_BUFFER,
                    None,
                    true,
                    format!("overlay-indices[{}]", FrameLabel::from_usize(i)),
                )
            })
            .collect();

        Self {
            render_pass,
            framebuffers,
            atlas,
            binding_set: None,
            vertex_buffers,
            index_buffers,
        }
    }

    fn create_render_pass(ctx: &GpuContext, color_format: vk::Format) -> GpuRenderPass {
        let attachment = vk::AttachmentDescription {
            format: color_format,
            samples: vk::SampleCountFlags::TYPE_1,
            // 保留 scene pass 的结果
            load_op: vk::AttachmentLoadOp::LOAD,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        };
        let color_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref));

        // LOAD 会读取 scene pass 的写入
        let dependency = vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            dependency_flags: vk::DependencyFlags::empty(),
        };

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&attachment))
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));
        GpuRenderPass::new(ctx.device().clone(), &create_info, "overlay-pass")
    }

    fn create_framebuffers(ctx: &GpuContext, render_pass: &GpuRenderPass, swapchain: &GpuSwapchain) -> Vec<GpuFramebuffer> {
        (0..swapchain.image_count())
            .map(|i| {
                GpuFramebuffer::new(
                    ctx.device().clone(),
                    render_pass,
                    &[swapchain.image_view(i).handle()],
                    swapchain.extent(),
                    &format!("overlay-pass-{i}"),
                )
            })
            .collect()
    }

    /// 把图集写进唯一的 binding set
    pub fn create_binding_set(
        &mut self,
        ctx: &GpuContext,
        pool: &GpuDescriptorPool,
        layout: &GpuDescriptorSetLayout<OverlayBindings>,
    ) {
        let set = GpuDescriptorSet::new(pool, layout, "overlay-atlas");
        let items = OverlayBindings::shader_bindings();
        let write = items[0]
            .write_image(set.handle(), vec![self.atlas.descriptor_image_info(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)]);
        GpuWriteDescriptorSet::apply(ctx.device(), &[write]);
        self.binding_set = Some(set);
    }

    /// 窗口尺寸变化后重建 framebuffer
    pub fn rebuild(&mut self, ctx: &GpuContext, swapchain: &GpuSwapchain) {
        self.framebuffers = Self::create_framebuffers(ctx, &self.render_pass, swapchain);
    }
}

// getters
impl OverlayPass {
    #[inline]
    pub fn render_pass(&self) -> &GpuRenderPass {
        &self.render_pass
    }
}

// render
impl OverlayPass {
    /// 录制 overlay：即便没有 UI 数据也要跑一次空 pass，
    /// swapchain image 的 PRESENT_SRC 转换发生在这里
    pub fn record(
        &self,
        cmd: &GpuCommandBuffer,
        label: FrameLabel,
        image_index: usize,
        registry: &PipelineRegistry,
        frame_data: Option<&OverlayFrameData>,
    ) {
        let extent = self.framebuffers[image_index].extent();

        cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, &format!("overlay-pass[{label}]"));
        cmd.begin_label("overlay-pass", LabelColor::COLOR_PASS);

        let frame_data = frame_data.filter(|data| !data.draws.is_empty());
        let frame_data = match frame_data {
            Some(data) if data.vertices.len() > Self::MAX_VERTICES || data.indices.len() > Self::MAX_INDICES => {
                log::warn!(
                    "overlay data exceeds buffer capacity ({} vertices / {} indices), dropped this frame",
                    data.vertices.len(),
                    data.indices.len()
                );
                None
            }
            other => other,
        };

        // 顶点上传发生在 render pass 之外
        if let Some(data) = frame_data {
            self.vertex_buffers[*label].write_at_offset(0, &data.vertices);
            self.index_buffers[*label].write_at_offset(0, &data.indices);
        }

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.framebuffers[image_index].handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            });
        cmd.cmd_begin_render_pass(&begin_info, vk::SubpassContents::INLINE);

        if let Some(data) = frame_data {
            let pipeline = registry.overlay_pipeline();
            let binding_set = self.binding_set.as_ref().expect("overlay binding set not created");

            cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
            cmd.cmd_set_viewport(
                0,
                &[vk::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: extent.width as f32,
                    height: extent.height as f32,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            );
            cmd.bind_descriptor_sets(
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout(),
                0,
                &[binding_set.handle()],
                &[],
            );
            // 像素坐标 → NDC
            let push = OverlayPush {
                scale: [2.0 / extent.width as f32, 2.0 / extent.height as f32],
                translate: [-1.0, -1.0],
            };
            cmd.cmd_push_constants(pipeline.layout(), vk::ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(&push));
            cmd.cmd_bind_vertex_buffers(0, &[&self.vertex_buffers[*label]], &[0]);
            cmd.cmd_bind_index_buffer(&self.index_buffers[*label], 0, vk::IndexType::UINT32);

            for draw in &data.draws {
                if let Some(scissor) = Self::clip_to_scissor(draw.clip, extent) {
                    cmd.cmd_set_scissor(0, &[scissor]);
                    cmd.draw_indexed(draw.index_count, draw.first_index, 1, 0, draw.vertex_offset);
                }
            }
        }

        cmd.cmd_end_render_pass();
        cmd.end_label();
        cmd.end();
    }

    /// 裁剪矩形转 scissor，完全在屏幕外或者退化的矩形返回 None
    fn clip_to_scissor(clip: [f32; 4], extent: vk::Extent2D) -> Option<vk::Rect2D> {
        let min_x = clip[0].max(0.0) as i32;
        let min_y = clip[1].max(0.0) as i32;
        let max_x = (clip[2].min(extent.width as f32)).ceil() as i32;
        let max_y = (clip[3].min(extent.height as f32)).ceil() as i32;
        if max_x <= min_x || max_y <= min_y {
            return None;
        }
        Some(vk::Rect2D {
            offset: vk::Offset2D { x: min_x, y: min_y },
            extent: vk::Extent2D {
                width: (max_x - min_x) as u32,
                height: (max_y - min_y) as u32,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    #[test]
    fn test_clip_inside_screen() {
        let scissor = OverlayPass::clip_to_scissor([10.0, 20.0, 110.0, 70.0], EXTENT).unwrap();
        assert_eq!(scissor.offset, vk::Offset2D { x: 10, y: 20 });
        assert_eq!(scissor.extent, vk::Extent2D { width: 100, height: 50 });
    }

    #[test]
    fn test_clip_clamped_to_screen() {
        let scissor = OverlayPass::clip_to_scissor([-50.0, -50.0, 900.0, 700.0], EXTENT).unwrap();
        assert_eq!(scissor.offset, vk::Offset2D { x: 0, y: 0 });
        assert_eq!(scissor.extent, vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_degenerate_clip_is_skipped() {
        assert!(OverlayPass::clip_to_scissor([100.0, 100.0, 100.0, 200.0], EXTENT).is_none());
        // 完全在屏幕外
        assert!(OverlayPass::clip_to_scissor([900.0, 0.0, 950.0, 50.0], EXTENT).is_none());
    }
}
