//! 每帧全局 uniform 的环形缓冲
//!
//! 一整块 host-visible buffer 按 slot 切成 N 段，每段对齐到
//! min_UBO_offset_align。fence 保证 GPU 读完之前 CPU 不会改写对应段。

use ash::vk;
use borealis_gpu::{context::GpuContext, resources::buffer::GpuBuffer};
use bytemuck::Zeroable;
use borealis_render_interface::{
    config::RenderConfig,
    frame_counter::FrameLabel,
    uniforms::{MAX_POINT_LIGHTS, PerFrameUbo, PointLightGpu},
};
use glam::{Mat4, Vec3};

pub struct FrameUniforms {
    buffer: GpuBuffer,
    /// 单个 slot 区间的大小，对齐之后的值
    aligned_size: vk::DeviceSize,
}

// new & init
impl FrameUniforms {
    pub fn new(ctx: &GpuContext, config: &RenderConfig) -> Self {
        let aligned_size = ctx.device().aligned_ubo_size::<PerFrameUbo>();
        let buffer =
            GpuBuffer::new_uniform_buffer(ctx, aligned_size * config.frames_in_flight as vk::DeviceSize, "per-frame");
        Self { buffer, aligned_size }
    }
}

// tools
impl FrameUniforms {
    /// 将该帧的全局数据写入 slot 对应的区间
    pub fn write(&self, label: FrameLabel, data: &PerFrameUbo) {
        self.buffer.write_at_offset(self.aligned_size * *label as vk::DeviceSize, std::slice::from_ref(data));
    }

    /// slot 对应区间的 descriptor 信息，binding set 建立时使用
    pub fn descriptor_info(&self, label: FrameLabel) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer.handle(),
            offset: self.aligned_size * *label as vk::DeviceSize,
            range: size_of::<PerFrameUbo>() as vk::DeviceSize,
        }
    }
}

/// 把场景里的点光源打包进 UBO 的定长数组
///
/// 超出 [`MAX_POINT_LIGHTS`] 的光源被丢弃并打印警告，
/// binding set 的形状不随光源数量变化。
pub fn pack_point_lights(lights: &[PointLightGpu]) -> ([PointLightGpu; MAX_POINT_LIGHTS], u32) {
    if lights.len() > MAX_POINT_LIGHTS {
        log::warn!("scene has {} point lights, only the first {} are used", lights.len(), MAX_POINT_LIGHTS);
    }

    let count = lights.len().min(MAX_POINT_LIGHTS);
    let mut packed = [PointLightGpu::zeroed(); MAX_POINT_LIGHTS];
    packed[..count].copy_from_slice(&lights[..count]);
    (packed, count as u32)
}

/// 方向光的 light-space 矩阵：正交投影 × 从光源方向看向场景中心
///
/// radius 是场景的包围半径，正交盒取 ±radius，远平面取 4×radius，
/// 保证光源侧后方的遮挡体也能落在 shadow map 里。
pub fn light_space_matrix(direction: Vec3, center: Vec3, radius: f32) -> Mat4 {
    let dir = direction.normalize();
    // 方向接近竖直时换一个 up，避免 look_at 退化
    let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 { Vec3::Z } else { Vec3::Y };

    let eye = center - dir * radius * 2.0;
    let view = Mat4::look_at_rh(eye, center, up);

    let mut proj = Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.1, radius * 4.0);
    // Vulkan 的裁剪空间 Y 朝下
    proj.y_axis.y *= -1.0;
    proj * view
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    fn light_at(x: f32) -> PointLightGpu {
        PointLightGpu {
            position: Vec4::new(x, 0.0, 0.0, 0.0),
            color: Vec4::ONE,
            attenuation: Vec4::new(1.0, 0.09, 0.032, 10.0),
        }
    }

    #[test]
    fn test_pack_keeps_order_below_limit() {
        let lights = vec![light_at(1.0), light_at(2.0), light_at(3.0)];
        let (packed, count) = pack_point_lights(&lights);
        assert_eq!(count, 3);
        assert_eq!(packed[0].position.x, 1.0);
        assert_eq!(packed[2].position.x, 3.0);
        // 未使用的 slot 保持清零
        assert_eq!(packed[3], PointLightGpu::zeroed());
    }

    #[test]
    fn test_pack_drops_overflow() {
        let lights: Vec<_> = (0..MAX_POINT_LIGHTS + 4).map(|i| light_at(i as f32)).collect();
        let (packed, count) = pack_point_lights(&lights);
        assert_eq!(count, MAX_POINT_LIGHTS as u32);
        // 保留的是前 MAX 个
        assert_eq!(packed[MAX_POINT_LIGHTS - 1].position.x, (MAX_POINT_LIGHTS - 1) as f32);
    }

    #[test]
    fn test_light_space_centers_the_scene() {
        let m = light_space_matrix(Vec3::new(-1.0, -1.0, -0.5), Vec3::ZERO, 10.0);
        let ndc = m.project_point3(Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_light_space_covers_the_radius() {
        let radius = 10.0;
        let m = light_space_matrix(Vec3::new(0.0, -1.0, 0.0), Vec3::ZERO, radius);

        let inside = m.project_point3(Vec3::new(radius * 0.5, 0.0, 0.0));
        assert!(inside.x.abs() <= 1.0 && inside.y.abs() <= 1.0);

        let outside = m.project_point3(Vec3::new(radius * 2.5, 0.0, 0.0));
        assert!(outside.x.abs() > 1.0 || outside.y.abs() > 1.0);
    }

    /// 方向接近竖直时不应产生 NaN
    #[test]
    fn test_light_space_vertical_direction() {
        let m = light_space_matrix(Vec3::new(0.0, -1.0, 0.0), Vec3::ZERO, 5.0);
        assert!(m.is_finite());
    }
}
