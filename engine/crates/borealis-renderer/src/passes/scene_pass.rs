//! scene pass：主场景渲染
//!
//! 一个 color attachment（swapchain image）加一个共享的 depth attachment。
//! 绘制顺序固定为 light gizmo → PBR → 天空盒，天空盒的 pipeline 用
//! LESS_OR_EQUAL 的深度比较，放在最后只覆盖空白像素。
//!
//! color 的 final layout 停在 COLOR_ATTACHMENT_OPTIMAL，
//! 交给 overlay pass 以 LOAD 的方式接续。

use ash::vk;
use borealis_gpu::{
    basic::color::LabelColor,
    commands::command_buffer::GpuCommandBuffer,
    context::GpuContext,
    render_pass::{GpuFramebuffer, GpuRenderPass},
    resources::{
        image::{GpuImage, GpuImageCreateInfo},
        image_view::{GpuImageView, GpuImageViewDesc},
    },
    swapchain::render_swapchain::GpuSwapchain,
};
use borealis_render_interface::{config::RenderConfig, frame_counter::FrameLabel};

use crate::{models::RenderModel, registry::PipelineRegistry};

pub struct ScenePass {
    render_pass: GpuRenderPass,

    /// depth 不需要保留到下一帧，所有 slot 共享一张
    _depth_image: GpuImage,
    depth_view: GpuImageView,
    depth_format: vk::Format,

    /// 每个 swapchain image 一个 framebuffer
    framebuffers: Vec<GpuFramebuffer>,
}

// new & init
impl ScenePass {
    pub fn new(ctx: &GpuContext, swapchain: &GpuSwapchain) -> Self {
        let depth_format = *ctx
            .find_supported_format(
                RenderConfig::DEPTH_FORMAT_CANDIDATES,
                vk::ImageTiling::OPTIMAL,
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            )
            .first()
            .expect("no supported depth format");

        let render_pass = Self::create_render_pass(ctx, swapchain.color_format(), depth_format);
        let (depth_image, depth_view) = Self::create_depth(ctx, depth_format, swapchain.extent());
        let framebuffers = Self::create_framebuffers(ctx, &render_pass, &depth_view, swapchain);

        Self {
            render_pass,
            _depth_image: depth_image,
            depth_view,
            depth_format,
            framebuffers,
        }
    }

    fn create_render_pass(ctx: &GpuContext, color_format: vk::Format, depth_format: vk::Format) -> GpuRenderPass {
        let attachments = [
            vk::AttachmentDescription {
                format: color_format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                ..Default::default()
            },
            vk::AttachmentDescription {
                format: depth_format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::DONT_CARE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                ..Default::default()
            },
        ];
        let color_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(std::slice::from_ref(&color_ref))
            .depth_stencil_attachment(&depth_ref);

        // acquire 的 semaphore 在 COLOR_ATTACHMENT_OUTPUT 处放行；
        // depth 被所有 in-flight slot 共享，上一帧的写入也要等
        let dependency = vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            src_access_mask: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dependency_flags: vk::DependencyFlags::empty(),
        };

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));
        GpuRenderPass::new(ctx.device().clone(), &create_info, "scene-pass")
    }

    fn create_depth(ctx: &GpuContext, depth_format: vk::Format, extent: vk::Extent2D) -> (GpuImage, GpuImageView) {
        let image = GpuImage::new(
            ctx,
            &GpuImageCreateInfo::new_depth_info(extent, depth_format),
            &GpuImage::device_local_alloc_info(),
            "scene-depth",
        );
        let view = GpuImageView::new(
            ctx.device().clone(),
            image.handle(),
            GpuImageViewDesc::new_2d(depth_format, vk::ImageAspectFlags::DEPTH),
            "scene-depth",
        );
        (image, view)
    }

    fn create_framebuffers(
        ctx: &GpuContext,
        render_pass: &GpuRenderPass,
        depth_view: &GpuImageView,
        swapchain: &GpuSwapchain,
    ) -> Vec<GpuFramebuffer> {
        (0..swapchain.image_count())
            .map(|i| {
                GpuFramebuffer::new(
                    ctx.device().clone(),
                    render_pass,
                    &[swapchain.image_view(i).handle(), depth_view.handle()],
                    swapchain.extent(),
                    &format!("scene-pass-{i}"),
                )
            })
            .collect()
    }

    /// 窗口尺寸变化后重建 depth attachment 和 framebuffer
    ///
    /// 调用前 swapchain 必须已经 rebuild 完成
    pub fn rebuild(&mut self, ctx: &GpuContext, swapchain: &GpuSwapchain) {
        let (depth_image, depth_view) = Self::create_depth(ctx, self.depth_format, swapchain.extent());
        self._depth_image = depth_image;
        self.depth_view = depth_view;
        self.framebuffers = Self::create_framebuffers(ctx, &self.render_pass, &self.depth_view, swapchain);
    }
}

// getters
impl ScenePass {
    #[inline]
    pub fn render_pass(&self) -> &GpuRenderPass {
        &self.render_pass
    }
}

// render
impl ScenePass {
    /// 录制主场景：依次绘制 light gizmo、PBR 模型、天空盒
    pub fn record(
        &self,
        cmd: &GpuCommandBuffer,
        label: FrameLabel,
        image_index: usize,
        registry: &PipelineRegistry,
        models: &[RenderModel],
        config: &RenderConfig,
    ) {
        let extent = self.framebuffers[image_index].extent();

        cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, &format!("scene-pass[{label}]"));
        cmd.begin_label("scene-pass", LabelColor::COLOR_PASS);

        let clear_values = config.scene_clear_values();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.framebuffers[image_index].handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent,
            })
            .clear_values(&clear_values);
        cmd.cmd_begin_render_pass(&begin_info, vk::SubpassContents::INLINE);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        };

        // 天空盒必须最后绘制，只填充深度为空的像素
        let draw_order = [
            ("light", registry.light_pipeline(), registry.light_models()),
            ("pbr", registry.pbr_pipeline(), registry.pbr_models()),
            ("skybox", registry.skybox_pipeline(), registry.skybox_models()),
        ];
        for (stage, pipeline, indices) in draw_order {
            if indices.is_empty() {
                continue;
            }
            cmd.begin_label(stage, LabelColor::COLOR_STAGE);
            cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
            cmd.cmd_set_viewport(0, &[viewport]);
            cmd.cmd_set_scissor(0, &[scissor]);
            for &index in indices {
                let model = &models[index];
                if model.hidden() {
                    continue;
                }
                model.record_scene_draw(cmd, pipeline.layout(), label);
            }
            cmd.end_label();
        }

        cmd.cmd_end_render_pass();
        cmd.end_label();
        cmd.end();
    }
}
