//! prefiltered 环境贴图
//!
//! 每个 mip 对应一档 roughness，每个 mip 的 6 个面各渲染一次：
//! 离屏画一个以相机为中心的立方体，fragment 按 roughness 做镜面卷积，
//! 再把离屏结果拷贝到目标立方体贴图的 (mip, face) 上。
//! irradiance 贴图用同一个流程，只是 mip 数为 1、fragment shader 不同。

use std::rc::Rc;

use ash::vk;
use borealis_gpu::{
    basic::color::LabelColor,
    context::GpuContext,
    descriptors::{
        descriptor::{DescriptorBindings, GpuDescriptorSet, GpuDescriptorSetLayout, GpuWriteDescriptorSet},
        descriptor_pool::GpuDescriptorPool,
    },
    pipelines::graphics_pipeline::{GpuGraphicsPipeline, GpuGraphicsPipelineCreateInfo, GpuPipelineLayout},
    render_pass::{GpuFramebuffer, GpuRenderPass},
    resources::{
        buffer::GpuBuffer,
        image::{GpuImage, GpuImageCreateInfo},
        image_view::{GpuImageView, GpuImageViewDesc},
        sampler::{GpuSampler, GpuSamplerCreateInfo},
        texture::GpuTexture,
    },
    transition::cmd_transition_image,
};
use borealis_render_interface::{config::RenderConfig, uniforms::CubeFacePush, vertex::Vertex3D};
use borealis_scene::mesh::MeshData;
use glam::{Mat4, Vec3, Vec4};

use crate::{
    bindings::CubeBakeBindings,
    registry::{shader_file, PipelinePurpose},
};

/// 烘焙计划中的一步：向某个 (mip, face) 渲染一次
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefilterStep {
    pub mip: u32,
    pub face: u32,
    pub extent: vk::Extent2D,
    pub roughness: f32,
}

/// 展开整个烘焙计划，mip 外层、face 内层
pub fn plan(base_size: u32, mip_levels: u32) -> Vec<PrefilterStep> {
    debug_assert!(mip_levels >= 1);
    let mut steps = Vec::with_capacity(mip_levels as usize * 6);
    for mip in 0..mip_levels {
        let size = (base_size >> mip).max(1);
        // roughness 随 mip 线性增长，最高一级是 1.0
        let roughness = if mip_levels > 1 {
            mip as f32 / (mip_levels - 1) as f32
        } else {
            0.0
        };
        for face in 0..6 {
            steps.push(PrefilterStep {
                mip,
                face,
                extent: vk::Extent2D { width: size, height: size },
                roughness,
            });
        }
    }
    steps
}

/// 某个立方体面的 view-projection 矩阵，90° FOV，相机在原点
pub fn face_view_proj(face: u32) -> Mat4 {
    let (target, up) = match face {
        0 => (Vec3::X, Vec3::NEG_Y),
        1 => (Vec3::NEG_X, Vec3::NEG_Y),
        2 => (Vec3::Y, Vec3::Z),
        3 => (Vec3::NEG_Y, Vec3::NEG_Z),
        4 => (Vec3::Z, Vec3::NEG_Y),
        5 => (Vec3::NEG_Z, Vec3::NEG_Y),
        _ => panic!("cube face index {face} out of range"),
    };
    let view = Mat4::look_at_rh(Vec3::ZERO, target, up);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 10.0);
    proj * view
}

pub fn bake_prefiltered_env(
    ctx: &GpuContext,
    config: &RenderConfig,
    pool: &GpuDescriptorPool,
    env_map: &GpuTexture,
) -> GpuTexture {
    bake_cube_map(
        ctx,
        config,
        pool,
        env_map,
        PipelinePurpose::Prefilter,
        config.prefilter_size,
        config.prefilter_mip_levels,
        "prefiltered-env",
    )
}

/// 立方体贴图烘焙的公共流程，prefilter 和 irradiance 共用
///
/// 所有绘制和拷贝录制在同一个 command buffer 里，离屏目标在
/// COLOR_ATTACHMENT 和 TRANSFER_SRC 之间往返，目标立方体保持
/// TRANSFER_DST，最后整体转成 SHADER_READ_ONLY。
#[allow(clippy::too_many_arguments)]
pub(crate) fn bake_cube_map(
    ctx: &GpuContext,
    config: &RenderConfig,
    pool: &GpuDescriptorPool,
    env_map: &GpuTexture,
    purpose: PipelinePurpose,
    base_size: u32,
    mip_levels: u32,
    name: &str,
) -> GpuTexture {
    let device = ctx.device();
    let format = vk::Format::R16G16B16A16_SFLOAT;
    let steps = plan(base_size, mip_levels);

    let mesh = MeshData::cube(2.0);
    let vertex_buffer = GpuBuffer::new_vertex_buffer(
        ctx,
        size_of_val(mesh.vertices.as_slice()) as vk::DeviceSize,
        format!("{name}-cube-vertex"),
    );
    vertex_buffer.transfer_data_sync(ctx, &mesh.vertices);
    let index_buffer = GpuBuffer::new_index_buffer(
        ctx,
        size_of_val(mesh.indices.as_slice()) as vk::DeviceSize,
        format!("{name}-cube-index"),
    );
    index_buffer.transfer_data_sync(ctx, &mesh.indices);
    let index_count = mesh.index_count();

    // 离屏目标固定在 base_size，低 mip 只用左上角的一小块
    let base_extent = vk::Extent2D {
        width: base_size,
        height: base_size,
    };
    let offscreen_ci = GpuImageCreateInfo::new_offscreen_color_info(base_extent, format);
    let offscreen = GpuImage::new(ctx, &offscreen_ci, &GpuImage::device_local_alloc_info(), &format!("{name}-offscreen"));
    let offscreen_view = GpuImageView::new(
        device.clone(),
        offscreen.handle(),
        GpuImageViewDesc::new_2d(format, vk::ImageAspectFlags::COLOR),
        format!("{name}-offscreen"),
    );

    let attachment = vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ..Default::default()
    };
    let color_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_ref));
    let render_pass_ci = vk::RenderPassCreateInfo::default()
        .attachments(std::slice::from_ref(&attachment))
        .subpasses(std::slice::from_ref(&subpass));
    let render_pass = GpuRenderPass::new(device.clone(), &render_pass_ci, &format!("{name}-bake"));
    let framebuffer = GpuFramebuffer::new(
        device.clone(),
        &render_pass,
        &[offscreen_view.handle()],
        base_extent,
        &format!("{name}-bake"),
    );

    let set_layout =
        GpuDescriptorSetLayout::<CubeBakeBindings>::new(device.clone(), vk::DescriptorSetLayoutCreateFlags::empty(), name);
    let set = GpuDescriptorSet::new(pool, &set_layout, name);
    let items = CubeBakeBindings::shader_bindings();
    let write = items[0].write_image(
        set.handle(),
        vec![env_map.descriptor_image_info(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)],
    );
    GpuWriteDescriptorSet::apply(device, &[write]);

    let push_stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
    let push_range = vk::PushConstantRange {
        stage_flags: push_stages,
        offset: 0,
        size: size_of::<CubeFacePush>() as u32,
    };
    let pipeline_layout = Rc::new(GpuPipelineLayout::new(
        device.clone(),
        &[set_layout.handle()],
        std::slice::from_ref(&push_range),
        name,
    ));
    let (vert, frag) = purpose.shader_files();
    let frag = frag.expect("cube bake needs a fragment shader");
    let mut pipeline_ci = GpuGraphicsPipelineCreateInfo::default();
    pipeline_ci
        .render_pass(render_pass.handle(), 0)
        .vertex_shader_stage(&shader_file(config, vert), c"main")
        .fragment_shader_stage(&shader_file(config, frag), c"main")
        .vertex_binding(vec![Vertex3D::binding_desc()])
        .vertex_attribute(Vertex3D::attr_descs())
        .cull_mode(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_test(None, false, false)
        .color_blend(
            vec![vk::PipelineColorBlendAttachmentState {
                blend_enable: vk::FALSE,
                color_write_mask: vk::ColorComponentFlags::RGBA,
                ..Default::default()
            }],
            [0.0; 4],
        );
    let pipeline = GpuGraphicsPipeline::new(device.clone(), &pipeline_ci, pipeline_layout, name);

    let cube_ci = GpuImageCreateInfo::new_cube_info(
        base_size,
        format,
        vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
    )
    .mip_levels(mip_levels);
    let cube_image = GpuImage::new(ctx, &cube_ci, &GpuImage::device_local_alloc_info(), name);
    let cube_view = GpuImageView::new(
        device.clone(),
        cube_image.handle(),
        GpuImageViewDesc::new_cube(format, mip_levels as u8),
        name,
    );
    let sampler = GpuSampler::new(device.clone(), GpuSamplerCreateInfo::new_ibl(mip_levels).into(), name);

    ctx.one_time_exec(
        |cmd| {
            cmd.begin_label(&format!("{name}-bake"), LabelColor::COLOR_PASS);
            cmd_transition_image(
                cmd,
                offscreen.handle(),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                vk::ImageAspectFlags::COLOR,
                (0, 1),
                (0, 1),
            );
            cmd_transition_image(
                cmd,
                cube_image.handle(),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageAspectFlags::COLOR,
                (0, mip_levels),
                (0, 6),
            );

            for step in &steps {
                let push = CubeFacePush {
                    view_proj: face_view_proj(step.face),
                    params: Vec4::new(step.roughness, 0.0, 0.0, 0.0),
                };
                let clear_value = vk::ClearValue {
                    color: vk::ClearColorValue { float32: [0.0; 4] },
                };
                let begin_info = vk::RenderPassBeginInfo::default()
                    .render_pass(render_pass.handle())
                    .framebuffer(framebuffer.handle())
                    .render_area(vk::Rect2D {
                        offset: vk::Offset2D::default(),
                        extent: step.extent,
                    })
                    .clear_values(std::slice::from_ref(&clear_value));
                cmd.cmd_begin_render_pass(&begin_info, vk::SubpassContents::INLINE);
                cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
                cmd.cmd_set_viewport(
                    0,
                    &[vk::Viewport {
                        x: 0.0,
                        y: 0.0,
                        width: step.extent.width as f32,
                        height: step.extent.height as f32,
                        min_depth: 0.0,
                        max_depth: 1.0,
                    }],
                );
                cmd.cmd_set_scissor(
                    0,
                    &[vk::Rect2D {
                        offset: vk::Offset2D::default(),
                        extent: step.extent,
                    }],
                );
                cmd.bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, pipeline.layout(), 0, &[set.handle()], &[]);
                cmd.cmd_push_constants(pipeline.layout(), push_stages, 0, bytemuck::bytes_of(&push));
                cmd.cmd_bind_vertex_buffers(0, &[&vertex_buffer], &[0]);
                cmd.cmd_bind_index_buffer(&index_buffer, 0, vk::IndexType::UINT32);
                cmd.draw_indexed(index_count, 0, 1, 0, 0);
                cmd.cmd_end_render_pass();

                cmd_transition_image(
                    cmd,
                    offscreen.handle(),
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, 1),
                    (0, 1),
                );
                let region = vk::ImageCopy {
                    src_subresource: vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    },
                    src_offset: vk::Offset3D::default(),
                    dst_subresource: vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: step.mip,
                        base_array_layer: step.face,
                        layer_count: 1,
                    },
                    dst_offset: vk::Offset3D::default(),
                    extent: vk::Extent3D {
                        width: step.extent.width,
                        height: step.extent.height,
                        depth: 1,
                    },
                };
                cmd.cmd_copy_image(
                    offscreen.handle(),
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    cube_image.handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
                cmd_transition_image(
                    cmd,
                    offscreen.handle(),
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, 1),
                    (0, 1),
                );
            }

            cmd_transition_image(
                cmd,
                cube_image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::ImageAspectFlags::COLOR,
                (0, mip_levels),
                (0, 6),
            );
            cmd.end_label();
        },
        &format!("{name}-bake"),
    );

    GpuTexture::from_parts(cube_image, cube_view, sampler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_all_mips_and_faces() {
        let steps = plan(128, 5);
        assert_eq!(steps.len(), 5 * 6);
        // mip 外层，face 内层
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.mip, i as u32 / 6);
            assert_eq!(step.face, i as u32 % 6);
        }
    }

    #[test]
    fn test_plan_roughness_endpoints() {
        let steps = plan(128, 5);
        assert_eq!(steps.first().unwrap().roughness, 0.0);
        assert_eq!(steps.last().unwrap().roughness, 1.0);

        // 只有一个 mip 时不做除零
        let single = plan(64, 1);
        assert_eq!(single.len(), 6);
        assert!(single.iter().all(|s| s.roughness == 0.0));
    }

    #[test]
    fn test_plan_extent_halves_with_floor_of_one() {
        let extents: Vec<u32> = plan(4, 4).iter().step_by(6).map(|s| s.extent.width).collect();
        assert_eq!(extents, vec![4, 2, 1, 1]);
    }

    /// 每个面的轴向必须投影到这个面的正中心
    #[test]
    fn test_face_axis_projects_to_center() {
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in axes.iter().enumerate() {
            let ndc = face_view_proj(face as u32).project_point3(*axis * 5.0);
            assert!(ndc.x.abs() < 1e-5, "face {face} center x = {}", ndc.x);
            assert!(ndc.y.abs() < 1e-5, "face {face} center y = {}", ndc.y);
            assert!(ndc.z > 0.0 && ndc.z < 1.0, "face {face} center z = {}", ndc.z);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_face_view_proj_rejects_bad_face() {
        face_view_proj(6);
    }
}
