//! 光源模型
//!
//! 点光源画一个小的发光方块作为 gizmo；方向光只提供光照参数，
//! gizmo 默认隐藏。光照数据本身每帧由 renderer 收集进 per-frame UBO。

use ash::vk;
use borealis_gpu::{
    commands::command_buffer::GpuCommandBuffer,
    context::GpuContext,
    descriptors::{
        descriptor::{DescriptorBindings, GpuDescriptorSet, GpuDescriptorSetLayout, GpuWriteDescriptorSet},
        descriptor_pool::GpuDescriptorPool,
    },
    resources::buffer::GpuBuffer,
};
use borealis_render_interface::{
    config::RenderConfig,
    frame_counter::FrameLabel,
    uniforms::{LightModelUbo, PointLightGpu},
};
use borealis_scene::{
    descriptor::{LightDesc, ModelDesc},
    mesh::MeshData,
};
use glam::{Mat4, Vec4};

use crate::{bindings::LightBindings, models::SharedBindings};

/// 点光源的 GPU 形态；位置取 transform 的平移部分
pub fn point_light_gpu(light: &LightDesc, transform: Mat4) -> Option<PointLightGpu> {
    match light {
        LightDesc::Directional { .. } => None,
        LightDesc::Point {
            color,
            intensity,
            attenuation,
            radius,
        } => Some(PointLightGpu {
            position: (transform.w_axis.truncate(), 0.0).into(),
            color: (*color, *intensity).into(),
            attenuation: Vec4::new(attenuation[0], attenuation[1], attenuation[2], *radius),
        }),
    }
}

pub struct LightModel {
    name: String,
    hidden: bool,
    transform: Mat4,
    light: LightDesc,

    /// gizmo 方块
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,

    /// N 段对齐的 LightModelUbo
    ubo: GpuBuffer,
    ubo_aligned_size: vk::DeviceSize,

    binding_sets: Vec<GpuDescriptorSet<LightBindings>>,
}

// new & init
impl LightModel {
    pub fn upload(ctx: &GpuContext, config: &RenderConfig, desc: &ModelDesc, light: &LightDesc) -> Self {
        let name = desc.name.clone();

        // gizmo 的实际大小由 transform 的缩放控制
        let mesh = MeshData::cube(1.0);
        let vertex_buffer =
            GpuBuffer::new_vertex_buffer(ctx, size_of_val(mesh.vertices.as_slice()) as vk::DeviceSize, format!("{name}-vertices"));
        vertex_buffer.transfer_data_sync(ctx, &mesh.vertices);
        let index_buffer =
            GpuBuffer::new_index_buffer(ctx, size_of_val(mesh.indices.as_slice()) as vk::DeviceSize, format!("{name}-indices"));
        index_buffer.transfer_data_sync(ctx, &mesh.indices);

        let ubo_aligned_size = ctx.device().aligned_ubo_size::<LightModelUbo>();
        let ubo = GpuBuffer::new_uniform_buffer(
            ctx,
            ubo_aligned_size * config.frames_in_flight as vk::DeviceSize,
            format!("{name}-model"),
        );

        Self {
            name,
            hidden: desc.hidden,
            transform: desc.transform,
            light: light.clone(),
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            ubo,
            ubo_aligned_size,
            binding_sets: vec![],
        }
    }

    pub fn create_binding_sets(
        &mut self,
        ctx: &GpuContext,
        pool: &GpuDescriptorPool,
        layout: &GpuDescriptorSetLayout<LightBindings>,
        shared: &SharedBindings,
    ) {
        let items = LightBindings::shader_bindings();

        let mut writes = vec![];
        let mut sets = vec![];
        for i in 0..shared.frames_in_flight {
            let label = FrameLabel::from_usize(i);
            let set = GpuDescriptorSet::new(pool, layout, format!("{}[{label}]", self.name));

            writes.push(items[0].write_buffer(set.handle(), vec![shared.frame_uniforms.descriptor_info(label)]));
            writes.push(items[1].write_buffer(
                set.handle(),
                vec![vk::DescriptorBufferInfo {
                    buffer: self.ubo.handle(),
                    offset: self.ubo_aligned_size * i as vk::DeviceSize,
                    range: size_of::<LightModelUbo>() as vk::DeviceSize,
                }],
            ));
            sets.push(set);
        }
        GpuWriteDescriptorSet::apply(ctx.device(), &writes);
        self.binding_sets = sets;
    }
}

// getters
impl LightModel {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    #[inline]
    pub fn light(&self) -> &LightDesc {
        &self.light
    }

    pub fn point_light_gpu(&self) -> Option<PointLightGpu> {
        point_light_gpu(&self.light, self.transform)
    }
}

// tools
impl LightModel {
    #[inline]
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    #[inline]
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn update_ubo(&self, label: FrameLabel) {
        let color = match &self.light {
            LightDesc::Directional { color, intensity, .. } => (*color, *intensity).into(),
            LightDesc::Point { color, intensity, .. } => (*color, *intensity).into(),
        };
        let data = LightModelUbo {
            model: self.transform,
            color,
        };
        self.ubo.write_at_offset(self.ubo_aligned_size * *label as vk::DeviceSize, std::slice::from_ref(&data));
    }
}

// render
impl LightModel {
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

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_point_light_takes_position_from_transform() {
        let light = LightDesc::Point {
            color: Vec3::new(1.0, 0.8, 0.6),
            intensity: 2.0,
            attenuation: [1.0, 0.09, 0.032],
            radius: 15.0,
        };
        let transform = Mat4::from_translation(Vec3::new(3.0, 4.0, 5.0)) * Mat4::from_scale(Vec3::splat(0.2));

        let gpu = point_light_gpu(&light, transform).unwrap();
        assert_eq!(gpu.position.truncate(), Vec3::new(3.0, 4.0, 5.0));
        assert_eq!(gpu.color.w, 2.0);
        assert_eq!(gpu.attenuation.w, 15.0);
    }

    #[test]
    fn test_directional_light_has_no_gpu_point() {
        let light = LightDesc::Directional {
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
        };
        assert!(point_light_gpu(&light, Mat4::IDENTITY).is_none());
    }
}
