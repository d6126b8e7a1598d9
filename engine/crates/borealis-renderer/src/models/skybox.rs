//! 天空盒
//!
//! 持有环境立方体贴图和一个单位立方体网格。环境贴图同时是
//! IBL 预计算的输入，所以 upload 必须早于 [`crate::precompute::IblMaps::bake`]。

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
use borealis_render_interface::frame_counter::FrameLabel;
use borealis_scene::{descriptor::ModelDesc, mesh::MeshData};

use crate::{bindings::SkyboxBindings, models::SharedBindings};

pub struct SkyboxModel {
    name: String,
    hidden: bool,

    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,

    env_map: GpuTexture,

    binding_sets: Vec<GpuDescriptorSet<SkyboxBindings>>,
}

// new & init
impl SkyboxModel {
    pub fn upload(ctx: &GpuContext, desc: &ModelDesc, size: u32, faces: &[Vec<u8>; 6]) -> Self {
        let name = desc.name.clone();

        // 顶点着色器会去掉 view 的平移，立方体尺寸无关紧要
        let mesh = MeshData::cube(2.0);
        let vertex_buffer =
            GpuBuffer::new_vertex_buffer(ctx, size_of_val(mesh.vertices.as_slice()) as vk::DeviceSize, format!("{name}-vertices"));
        vertex_buffer.transfer_data_sync(ctx, &mesh.vertices);
        let index_buffer =
            GpuBuffer::new_index_buffer(ctx, size_of_val(mesh.indices.as_slice()) as vk::DeviceSize, format!("{name}-indices"));
        index_buffer.transfer_data_sync(ctx, &mesh.indices);

        let face_refs: [&[u8]; 6] = std::array::from_fn(|i| faces[i].as_slice());
        let env_map = GpuTexture::cube_from_faces(ctx, size, &face_refs, format!("{name}-env"));

        Self {
            name,
            hidden: desc.hidden,
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            env_map,
            binding_sets: vec![],
        }
    }

    pub fn create_binding_sets(
        &mut self,
        ctx: &GpuContext,
        pool: &GpuDescriptorPool,
        layout: &GpuDescriptorSetLayout<SkyboxBindings>,
        shared: &SharedBindings,
    ) {
        let items = SkyboxBindings::shader_bindings();

        let mut writes = vec![];
        let mut sets = vec![];
        for i in 0..shared.frames_in_flight {
            let label = FrameLabel::from_usize(i);
            let set = GpuDescriptorSet::new(pool, layout, format!("{}[{label}]", self.name));

            writes.push(items[0].write_buffer(set.handle(), vec![shared.frame_uniforms.descriptor_info(label)]));
            writes.push(
                items[1].write_image(
                    set.handle(),
                    vec![self.env_map.descriptor_image_info(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)],
                ),
            );
            sets.push(set);
        }
        GpuWriteDescriptorSet::apply(ctx.device(), &writes);
        self.binding_sets = sets;
    }
}

// getters
impl SkyboxModel {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// IBL 预计算的输入
    #[inline]
    pub fn env_map(&self) -> &GpuTexture {
        &self.env_map
    }
}

// tools
impl SkyboxModel {
    #[inline]
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
}

// render
impl SkyboxModel {
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
}
