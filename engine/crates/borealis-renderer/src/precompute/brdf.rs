//! BRDF 积分 LUT
//!
//! compute shader 把 (NdotV, roughness) 的积分结果写进 storage buffer，
//! CPU 回读后去掉 std140 的 padding，重新上传为 RG32F 贴图。

use std::rc::Rc;

use ash::vk;
use borealis_gpu::{
    basic::color::LabelColor,
    commands::barrier::GpuBufferBarrier,
    context::GpuContext,
    descriptors::{
        descriptor::{DescriptorBindings, GpuDescriptorSet, GpuDescriptorSetLayout, GpuWriteDescriptorSet},
        descriptor_pool::GpuDescriptorPool,
    },
    pipelines::{compute_pipeline::GpuComputePipeline, graphics_pipeline::GpuPipelineLayout},
    resources::{buffer::GpuBuffer, sampler::GpuSamplerCreateInfo, texture::GpuTexture},
};
use borealis_render_interface::{config::RenderConfig, uniforms::BrdfLutPush};

use crate::{
    bindings::BrdfComputeBindings,
    registry::{shader_file, PipelinePurpose},
};

/// 和 compute shader 里的 local_size_x/y 一致
const WORKGROUP_SIZE: u32 = 16;
/// 每个 texel 的重要性采样数
const SAMPLE_COUNT: u32 = 1024;
/// std140 里 vec2 数组的 stride 是 16 字节
const PADDED_TEXEL_BYTES: vk::DeviceSize = 16;

/// 去掉 std140 padding：每 4 个 float 里只有前 2 个有效
pub fn repack_padded_rg(padded: &[f32]) -> Vec<f32> {
    debug_assert_eq!(padded.len() % 4, 0);
    let mut tight = Vec::with_capacity(padded.len() / 2);
    for texel in padded.chunks_exact(4) {
        tight.push(texel[0]);
        tight.push(texel[1]);
    }
    tight
}

/// dispatch 一次 compute，等待完成后把结果打包成贴图
pub fn bake_brdf_lut(ctx: &GpuContext, config: &RenderConfig, pool: &GpuDescriptorPool) -> GpuTexture {
    let device = ctx.device();
    let size = config.brdf_lut_size;
    let buffer_size = size as vk::DeviceSize * size as vk::DeviceSize * PADDED_TEXEL_BYTES;

    let lut_buffer = GpuBuffer::new(ctx, buffer_size, vk::BufferUsageFlags::STORAGE_BUFFER, None, true, "brdf-lut");

    let set_layout = GpuDescriptorSetLayout::<BrdfComputeBindings>::new(
        device.clone(),
        vk::DescriptorSetLayoutCreateFlags::empty(),
        "brdf-lut",
    );
    let set = GpuDescriptorSet::new(pool, &set_layout, "brdf-lut");
    let items = BrdfComputeBindings::shader_bindings();
    let write = items[0].write_buffer(
        set.handle(),
        vec![vk::DescriptorBufferInfo {
            buffer: lut_buffer.handle(),
            offset: 0,
            range: buffer_size,
        }],
    );
    GpuWriteDescriptorSet::apply(device, &[write]);

    let push_range = vk::PushConstantRange {
        stage_flags: vk::ShaderStageFlags::COMPUTE,
        offset: 0,
        size: size_of::<BrdfLutPush>() as u32,
    };
    let pipeline_layout = Rc::new(GpuPipelineLayout::new(
        device.clone(),
        &[set_layout.handle()],
        std::slice::from_ref(&push_range),
        "brdf-lut",
    ));
    let (comp, _) = PipelinePurpose::BrdfLut.shader_files();
    let pipeline = GpuComputePipeline::new(device.clone(), &shader_file(config, comp), c"main", pipeline_layout, "brdf-lut");

    let push = BrdfLutPush {
        lut_size: size,
        sample_count: SAMPLE_COUNT,
    };
    let group_count = size.div_ceil(WORKGROUP_SIZE);
    ctx.one_time_exec(
        |cmd| {
            cmd.begin_label("brdf-lut-bake", LabelColor::COLOR_PASS);
            cmd.cmd_bind_pipeline(vk::PipelineBindPoint::COMPUTE, pipeline.handle());
            cmd.bind_descriptor_sets(vk::PipelineBindPoint::COMPUTE, pipeline.layout(), 0, &[set.handle()], &[]);
            cmd.cmd_push_constants(pipeline.layout(), vk::ShaderStageFlags::COMPUTE, 0, bytemuck::bytes_of(&push));
            cmd.cmd_dispatch(group_count, group_count, 1);
            // host 回读要看到 compute 的写入
            let barrier = GpuBufferBarrier::new()
                .buffer(lut_buffer.handle(), 0, buffer_size)
                .src_mask(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::SHADER_WRITE)
                .dst_mask(vk::PipelineStageFlags2::HOST, vk::AccessFlags2::HOST_READ);
            cmd.buffer_memory_barrier(vk::DependencyFlags::empty(), std::slice::from_ref(&barrier));
            cmd.end_label();
        },
        "brdf-lut-bake",
    );

    let padded = lut_buffer.read_at_offset::<f32>(0, (size * size * 4) as usize);
    let tight = repack_padded_rg(&padded);
    GpuTexture::from_raw_pixels(
        ctx,
        size,
        size,
        vk::Format::R32G32_SFLOAT,
        bytemuck::cast_slice(&tight),
        GpuSamplerCreateInfo::new_ibl(1).into(),
        "brdf-lut",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repack_drops_std140_padding() {
        let padded = [1.0, 2.0, -9.0, -9.0, 3.0, 4.0, -9.0, -9.0];
        assert_eq!(repack_padded_rg(&padded), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_repack_halves_len() {
        let size = 8usize;
        let padded = vec![0.5f32; size * size * 4];
        let tight = repack_padded_rg(&padded);
        assert_eq!(tight.len(), size * size * 2);
    }

    /// dispatch 的 group 数要覆盖整张 LUT
    #[test]
    fn test_dispatch_covers_lut() {
        for size in [64u32, 100, 512, 513] {
            let groups = size.div_ceil(WORKGROUP_SIZE);
            assert!(groups * WORKGROUP_SIZE >= size);
            assert!((groups - 1) * WORKGROUP_SIZE < size);
        }
    }
}
