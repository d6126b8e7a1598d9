//! PBR 物体
//!
//! 每个物体持有自己的 mesh buffer、两张材质贴图和 per-model UBO。
//! binding set 除了自身资源还引用三张共享贴图：shadow map 和 IBL 三件套。

use ash::vk;
use borealis_gpu::{
    commands::command_buffer::GpuCommandBuffer,
    context::GpuContext,
    descriptors::{
        descriptor::{DescriptorBindings, GpuDescriptorSet, GpuDescriptorSetLayout, GpuWriteDescriptorSet},
        descriptor_pool::GpuDescriptorPool,
    },
    resources::{buffer::GpuBuffer, texture::GpuTexture},
};
use borealis_render_interface::{
    config::RenderConfig,
    frame_counter::FrameLabel,
    uniforms::{PbrModelUbo, ShadowPush},
};
use borealis_scene::{
    descriptor::{MaterialDesc, ModelDesc},
    loader::DecodedImage,
    mesh::MeshData,
};
use glam::{Mat4, Vec4};

use crate::{bindings::PbrBindings, models::SharedBindings};

/// 由材质参数和变换组装 per-model UBO
pub fn pbr_model_ubo(transform: Mat4, material: &MaterialDesc) -> PbrModelUbo {
    PbrModelUbo {
        model: transform,
        base_color: Vec4::from_array(material.base_color_factor),
        pbr_factors: Vec4::new(material.metallic, material.roughness, 1.0, 0.0),
    }
}

pub struct PbrModel {
    name: String,
    hidden: bool,
    transform: Mat4,
    material: MaterialDesc,

    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,

    base_color_tex: GpuTexture,
    metallic_roughness_tex: GpuTexture,

    /// N 段对齐的 PbrModelUbo
    ubo: GpuBuffer,
    ubo_aligned_size: vk::DeviceSize,

    binding_sets: Vec<GpuDescriptorSet<PbrBindings>>,
}

// new & init
impl PbrModel {
    pub fn upload(
        ctx: &GpuContext,
        config: &RenderConfig,
        desc: &ModelDesc,
        material: &MaterialDesc,
        mesh: &MeshData,
        base_color: Option<DecodedImage>,
        metallic_roughness: Option<DecodedImage>,
    ) -> Self {
        let name = desc.name.clone();

        let vertex_buffer =
            GpuBuffer::new_vertex_buffer(ctx, size_of_val(mesh.vertices.as_slice()) as vk::DeviceSize, format!("{name}-vertices"));
        vertex_buffer.transfer_data_sync(ctx, &mesh.vertices);
        let index_buffer =
            GpuBuffer::new_index_buffer(ctx, size_of_val(mesh.indices.as_slice()) as vk::DeviceSize, format!("{name}-indices"));
        index_buffer.transfer_data_sync(ctx, &mesh.indices);

        // 缺贴图时用 1x1 白色顶替，factor 仍然生效
        let base_color_tex = match base_color {
            Some(img) => GpuTexture::from_rgba8_mipmapped(ctx, img.width, img.height, &img.rgba8, format!("{name}-base-color")),
            None => GpuTexture::solid_color(ctx, [255, 255, 255, 255], format!("{name}-base-color")),
        };
        let metallic_roughness_tex = match metallic_roughness {
            Some(img) => {
                GpuTexture::from_rgba8_mipmapped(ctx, img.width, img.height, &img.rgba8, format!("{name}-metallic-roughness"))
            }
            None => GpuTexture::solid_color(ctx, [255, 255, 255, 255], format!("{name}-metallic-roughness")),
        };

        let ubo_aligned_size = ctx.device().aligned_ubo_size::<PbrModelUbo>();
        let ubo = GpuBuffer::new_uniform_buffer(
            ctx,
            ubo_aligned_size * config.frames_in_flight as vk::DeviceSize,
            format!("{name}-model"),
        );

        Self {
            name,
            hidden: desc.hidden,
            transform: desc.transform,
            material: material.clone(),
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            base_color_tex,
            metallic_roughness_tex,
            ubo,
            ubo_aligned_size,
            binding_sets: vec![],
        }
    }

    /// 每 slot 一个 binding set；IBL 预计算完成之后才能调用
    pub fn create_binding_sets(
        &mut self,
        ctx: &GpuContext,
        pool: &GpuDescriptorPool,
        layout: &GpuDescriptorSetLayout<PbrBindings>,
        shared: &SharedBindings,
    ) {
        let items = PbrBindings::shader_bindings();
        let read_only = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;

        let mut writes = vec![];
        let mut sets = vec![];
        for i in 0..shared.frames_in_flight {
            let label = FrameLabel::from_usize(i);
            let set = GpuDescriptorSet::new(pool, layout, format!("{}[{label}]", self.name));
            let handle = set.handle();

            writes.push(items[0].write_buffer(handle, vec![shared.frame_uniforms.descriptor_info(label)]));
            writes.push(items[1].write_buffer(
                handle,
                vec![vk::DescriptorBufferInfo {
                    buffer: self.ubo.handle(),
                    offset: self.ubo_aligned_size * i as vk::DeviceSize,
                    range: size_of::<PbrModelUbo>() as vk::DeviceSize,
                }],
            ));
            writes.push(items[2].write_image(handle, vec![self.base_color_tex.descriptor_image_info(read_only)]));
            writes.push(items[3].write_image(handle, vec![self.metallic_roughness_tex.descriptor_image_info(read_only)]));
            // shadow pass 的 final layout 是 DEPTH_STENCIL_READ_ONLY
            writes.push(items[4].write_image(
                handle,
                vec![shared.shadow_map.descriptor_image_info(vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL)],
            ));
            writes.push(items[5].write_image(handle, vec![shared.ibl.irradiance().descriptor_image_info(read_only)]));
            writes.push(items[6].write_image(handle, vec![shared.ibl.prefiltered().descriptor_image_info(read_only)]));
            writes.push(items[7].write_image(handle, vec![shared.ibl.brdf_lut().descriptor_image_info(read_only)]));
            sets.push(set);
        }
        GpuWriteDescriptorSet::apply(ctx.device(), &writes);
        self.binding_sets = sets;
    }
}

// getters
impl PbrModel {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }
}

// tools
impl PbrModel {
    #[inline]
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    #[inline]
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn update_ubo(&self, label: FrameLabel) {
        let data = pbr_model_ubo(self.transform, &self.material);
        self.ubo.write_at_offset(self.ubo_aligned_size * *label as vk::DeviceSize, std::slice::from_ref(&data));
    }
}

// render
impl PbrModel {
    /// scene pass 里的绘制
    pub fn record_draw(&self, cmd: &GpuCommandBuffer, layout: vk::PipelineLayout, label: FrameLabel) {
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            layout,
            0,
            &[self.binding_sets[*label].handle()],
            &[],
        );
        cmd.cmd_bind_vertex_buffers(0, &[&self.vertex_buffer], &[0]);
        cmd.cmd_bind_index_buffer(&self.index_buffer, 0, vk::IndexType::UINT32);
        cmd.draw_indexed(self.index_count, 0, 1, 0, 0);
    }

    /// shadow pass 里的绘制；共享 set 由 pass 绑定，模型矩阵走 push constant
    pub fn record_shadow_draw(&self, cmd: &GpuCommandBuffer, layout: vk::PipelineLayout) {
        let push = ShadowPush { model: self.transform };
        cmd.cmd_push_constants(layout, vk::ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(&push));
        cmd.cmd_bind_vertex_buffers(0, &[&self.vertex_buffer], &[0]);
        cmd.cmd_bind_index_buffer(&self.index_buffer, 0, vk::IndexType::UINT32);
        cmd.draw_indexed(self.index_count, 0, 1, 0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ubo_carries_material_factors() {
        let material = MaterialDesc {
            base_color_factor: [0.5, 0.25, 1.0, 1.0],
            metallic: 0.9,
            roughness: 0.3,
            ..Default::default()
        };
        let transform = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));

        let ubo = pbr_model_ubo(transform, &material);
        assert_eq!(ubo.model, transform);
        assert_eq!(ubo.base_color, Vec4::new(0.5, 0.25, 1.0, 1.0));
        assert_eq!(ubo.pbr_factors.x, 0.9);
        assert_eq!(ubo.pbr_factors.y, 0.3);
    }
}
