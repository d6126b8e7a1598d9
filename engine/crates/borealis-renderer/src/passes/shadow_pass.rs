//! shadow pass：从方向光视角渲染一张深度图
//!
//! depth-only，没有 color attachment。shadow map 分辨率固定，
//! 和窗口大小无关，resize 时不需要重建。

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
    resources::{
        image::{GpuImage, GpuImageCreateInfo},
        image_view::{GpuImageView, GpuImageViewDesc},
        sampler::{GpuSampler, GpuSamplerCreateInfo},
        texture::GpuTexture,
    },
};
use borealis_render_interface::{config::RenderConfig, frame_counter::FrameLabel};

use crate::{bindings::ShadowBindings, frame_uniforms::FrameUniforms, models::RenderModel, registry::PipelineRegistry};

pub struct ShadowPass {
    render_pass: GpuRenderPass,
    /// 深度图 + compare sampler，scene pass 直接把它当贴图采样
    map: GpuTexture,
    framebuffer: GpuFramebuffer,
    extent: vk::Extent2D,
    depth_format: vk::Format,

    /// 每个 slot 一个共享的 binding set，所有 caster 复用
    binding_sets: Vec<GpuDescriptorSet<ShadowBindings>>,
}

// new & init
impl ShadowPass {
    pub fn new(ctx: &GpuContext, config: &RenderConfig) -> Self {
        let device = ctx.device();
        let depth_format = *ctx
            .find_supported_format(
                RenderConfig::DEPTH_FORMAT_CANDIDATES,
                vk::ImageTiling::OPTIMAL,
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            )
            .first()
            .expect("no supported depth format");
        let extent = vk::Extent2D {
            width: config.shadow_map_size,
            height: config.shadow_map_size,
        };

        let image = GpuImage::new(
            ctx,
            &GpuImageCreateInfo::new_shadow_map_info(extent, depth_format),
            &GpuImage::device_local_alloc_info(),
            "shadow-map",
        );
        let image_view = GpuImageView::new(
            device.clone(),
            image.handle(),
            GpuImageViewDesc::new_2d(depth_format, vk::ImageAspectFlags::DEPTH),
            "shadow-map",
        );
        let sampler = GpuSampler::new(device.clone(), GpuSamplerCreateInfo::new_shadow().into(), "shadow-map");

        let render_pass = Self::create_render_pass(ctx, depth_format);
        let framebuffer =
            GpuFramebuffer::new(device.clone(), &render_pass, &[image_view.handle()], extent, "shadow-pass");

        Self {
            render_pass,
            map: GpuTexture::from_parts(image, image_view, sampler),
            framebuffer,
            extent,
            depth_format,
            binding_sets: vec![],
        }
    }

    fn create_render_pass(ctx: &GpuContext, depth_format: vk::Format) -> GpuRenderPass {
        let attachment = vk::AttachmentDescription {
            format: depth_format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            // pass 结束后直接处于可采样状态
            final_layout: vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            ..Default::default()
        };
        let depth_ref = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .depth_stencil_attachment(&depth_ref);

        // 上一帧的 fragment 采样 → 本帧的深度写入 → 本帧的 fragment 采样
        let dependencies = [
            vk::SubpassDependency {
                src_subpass: vk::SUBPASS_EXTERNAL,
                dst_subpass: 0,
                src_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER,
                dst_stage_mask: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                src_access_mask: vk::AccessFlags::SHADER_READ,
                dst_access_mask: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                dependency_flags: vk::DependencyFlags::BY_REGION,
            },
            vk::SubpassDependency {
                src_subpass: 0,
                dst_subpass: vk::SUBPASS_EXTERNAL,
                src_stage_mask: vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER,
                src_access_mask: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                dst_access_mask: vk::AccessFlags::SHADER_READ,
                dependency_flags: vk::DependencyFlags::BY_REGION,
            },
        ];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(std::slice::from_ref(&attachment))
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);
        GpuRenderPass::new(ctx.device().clone(), &create_info, "shadow-pass")
    }

    /// 建立每 slot 的共享 binding set，只绑 per-frame UBO
    pub fn create_binding_sets(
        &mut self,
        ctx: &GpuContext,
        pool: &GpuDescriptorPool,
        layout: &GpuDescriptorSetLayout<ShadowBindings>,
        frame_uniforms: &FrameUniforms,
        frames_in_flight: usize,
    ) {
        let items = ShadowBindings::shader_bindings();
        let mut writes = vec![];
        let mut sets = vec![];
        for i in 0..frames_in_flight {
            let label = FrameLabel::from_usize(i);
            let set = GpuDescriptorSet::new(pool, layout, format!("shadow-shared[{label}]"));
            writes.push(items[0].write_buffer(set.handle(), vec![frame_uniforms.descriptor_info(label)]));
            sets.push(set);
        }
        GpuWriteDescriptorSet::apply(ctx.device(), &writes);
        self.binding_sets = sets;
    }
}

// getters
impl ShadowPass {
    #[inline]
    pub fn render_pass(&self) -> &GpuRenderPass {
        &self.render_pass
    }

    /// shadow map 本体，PBR 模型建 binding set 时取它
    #[inline]
    pub fn map(&self) -> &GpuTexture {
        &self.map
    }

    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }
}

// render
impl ShadowPass {
    /// 录制整个 shadow pass：所有未隐藏的 PBR 模型，深度写入 shadow map
    pub fn record(
        &self,
        cmd: &GpuCommandBuffer,
        label: FrameLabel,
        registry: &PipelineRegistry,
        models: &[RenderModel],
        config: &RenderConfig,
    ) {
        cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, &format!("shadow-pass[{label}]"));
        cmd.begin_label("shadow-pass", LabelColor::COLOR_PASS);

        let clear_values = [config.shadow_clear_value()];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.framebuffer.handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: self.extent,
            })
            .clear_values(&clear_values);
        cmd.cmd_begin_render_pass(&begin_info, vk::SubpassContents::INLINE);

        let pipeline = registry.shadow_pipeline();
        cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
        cmd.cmd_set_viewport(
            0,
            &[vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: self.extent.width as f32,
                height: self.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }],
        );
        cmd.cmd_set_scissor(
            0,
            &[vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: self.extent,
            }],
        );
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            pipeline.layout(),
            0,
            &[self.binding_sets[*label].handle()],
            &[],
        );

        for &index in registry.pbr_models() {
            let model = &models[index];
            if model.hidden() {
                continue;
            }
            if let Some(pbr) = model.as_pbr() {
                pbr.record_shadow_draw(cmd, pipeline.layout());
            }
        }

        cmd.cmd_end_render_pass();
        cmd.end_label();
        cmd.end();
    }
}
