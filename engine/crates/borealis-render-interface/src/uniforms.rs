//! CPU 和 shader 共享的 uniform / push constant 布局
//!
//! 所有结构都按 std140 排布，字段一律使用 16 字节对齐的类型，
//! 修改时需要同步修改 `shaders/` 下的对应声明。

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// 点光源数量的上限，编译期固定
///
/// 超出的光源会被丢弃并打印警告，binding set 的形状因此保持不变。
pub const MAX_POINT_LIGHTS: usize = 8;

/// 单个点光源
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightGpu {
    /// xyz 为位置，w 不使用
    pub position: Vec4,
    /// rgb 为颜色，w 为强度
    pub color: Vec4,
    /// x/y/z 为 constant/linear/quadratic 衰减系数，w 为作用半径
    pub attenuation: Vec4,
}

/// 方向光，全场景唯一，同时驱动 shadow pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirLightGpu {
    /// xyz 为照射方向，w 不使用
    pub direction: Vec4,
    /// rgb 为颜色，w 为强度
    pub color: Vec4,
}

/// 每帧更新一次的全局 uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerFrameUbo {
    pub view: Mat4,
    pub proj: Mat4,
    /// 由 shadow pass 产出的 light-space 矩阵
    pub light_space: Mat4,
    /// xyz 为相机位置
    pub camera_pos: Vec4,
    pub dir_light: DirLightGpu,
    pub point_lights: [PointLightGpu; MAX_POINT_LIGHTS],
    /// x 为实际生效的点光源数量
    pub counts: [u32; 4],
}

impl Default for PerFrameUbo {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// PBR 模型的 per-model uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PbrModelUbo {
    pub model: Mat4,
    pub base_color: Vec4,
    /// x=metallic y=roughness z=ao w 不使用
    pub pbr_factors: Vec4,
}

/// 光源 gizmo 的 per-model uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightModelUbo {
    pub model: Mat4,
    pub color: Vec4,
}

/// shadow pass 的 push constant：模型矩阵
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowPush {
    pub model: Mat4,
}

/// 立方体贴图烘焙（prefilter / irradiance）的 push constant
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CubeFacePush {
    /// 固定 90° FOV 投影乘以某个面的 view 矩阵
    pub view_proj: Mat4,
    /// x 为 roughness（irradiance 不使用）
    pub params: Vec4,
}

/// overlay pass 的 push constant：把像素坐标变换到 NDC
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OverlayPush {
    pub scale: [f32; 2],
    pub translate: [f32; 2],
}

/// BRDF LUT compute 的 push constant
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BrdfLutPush {
    pub lut_size: u32,
    pub sample_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_frame_ubo_std140_size() {
        // 3 个 mat4 + camera + 方向光 2 个 vec4 + 8 个点光源 + counts
        assert_eq!(size_of::<PerFrameUbo>(), 192 + 16 + 32 + MAX_POINT_LIGHTS * 48 + 16);
        assert_eq!(size_of::<PerFrameUbo>() % 16, 0);
    }

    #[test]
    fn test_point_light_stride() {
        assert_eq!(size_of::<PointLightGpu>(), 48);
    }

    #[test]
    fn test_model_ubo_sizes() {
        assert_eq!(size_of::<PbrModelUbo>(), 96);
        assert_eq!(size_of::<LightModelUbo>(), 80);
    }

    #[test]
    fn test_push_constant_sizes_within_limit() {
        // Vulkan 保证的 push constant 最小上限是 128 字节
        assert!(size_of::<ShadowPush>() <= 128);
        assert!(size_of::<CubeFacePush>() <= 128);
        assert!(size_of::<OverlayPush>() <= 128);
        assert!(size_of::<BrdfLutPush>() <= 128);
    }
}
