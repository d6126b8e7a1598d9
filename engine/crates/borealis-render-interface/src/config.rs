use std::path::PathBuf;

use ash::vk;

/// 渲染器的全局配置
///
/// 构造一次之后不再修改，沿着构造函数逐层传入各个组件，
/// 不存在任何全局可变状态。
#[derive(Clone)]
pub struct RenderConfig {
    /// Frames in Flight 数量
    pub frames_in_flight: usize,

    /// scene pass 的清屏颜色
    pub clear_color: [f32; 4],
    /// 深度附件的清屏值
    pub clear_depth: f32,

    /// 交换链首选的 surface 格式，不支持时回退到第一个可用格式
    pub preferred_surface_format: vk::SurfaceFormatKHR,
    /// 首选的 present mode，不支持时回退到 FIFO
    pub preferred_present_mode: vk::PresentModeKHR,

    /// shadow map 的边长
    pub shadow_map_size: u32,
    /// BRDF LUT 的边长
    pub brdf_lut_size: u32,
    /// prefiltered env map 第 0 级 mip 的边长
    pub prefilter_size: u32,
    /// prefiltered env map 的 mip 层数，对应 roughness 的离散级数
    pub prefilter_mip_levels: u32,
    /// irradiance map 的边长
    pub irradiance_size: u32,

    /// descriptor pool 的冗余系数，按场景统计出的需求量再乘以该系数
    pub pool_headroom: f32,

    /// 编译好的 spv 所在目录
    pub shader_dir: PathBuf,

    /// 是否开启 validation layer 和 debug messenger
    pub enable_validation: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            clear_color: [0.02, 0.02, 0.03, 1.0],
            clear_depth: 1.0,
            preferred_surface_format: vk::SurfaceFormatKHR {
                // shader 输出 linear 值，由硬件转为 sRGB
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
            shadow_map_size: 2048,
            brdf_lut_size: 512,
            prefilter_size: 128,
            prefilter_mip_levels: 5,
            irradiance_size: 64,
            pool_headroom: 1.5,
            shader_dir: PathBuf::from("shaders/.build"),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

// builder
impl RenderConfig {
    /// 深度格式的候选列表，按优先级排列
    pub const DEPTH_FORMAT_CANDIDATES: &'static [vk::Format] = &[
        vk::Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT,
        vk::Format::D16_UNORM,
    ];

    #[inline]
    pub fn with_frames_in_flight(mut self, n: usize) -> Self {
        self.frames_in_flight = n;
        self
    }

    #[inline]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    #[inline]
    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    #[inline]
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = dir.into();
        self
    }

    #[inline]
    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }
}
// getters
impl RenderConfig {
    /// scene pass 使用的 clear value，下标 0 是 color，1 是 depth
    pub fn scene_clear_values(&self) -> [vk::ClearValue; 2] {
        [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: self.clear_depth,
                    stencil: 0,
                },
            },
        ]
    }

    /// shadow pass 使用的 clear value
    pub fn shadow_clear_value(&self) -> vk::ClearValue {
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: self.clear_depth,
                stencil: 0,
            },
        }
    }
}

/// 场景统计信息，场景加载时确定，用于估算 descriptor pool 的容量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub pbr_models: usize,
    pub light_models: usize,
    pub skyboxes: usize,
}

impl SceneCounts {
    #[inline]
    pub fn total_models(&self) -> usize {
        self.pbr_models + self.light_models + self.skyboxes
    }
}

/// descriptor pool 的保守容量估算
///
/// pool 耗尽是致命错误，因此按每个 set 可能的最大占用来估算：
/// 每个模型每个 frame slot 一个 set，外加 shadow pass 的共享 set
/// 和 overlay pass 的 set，各乘以冗余系数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolSizing {
    pub max_sets: u32,
    pub uniform_buffers: u32,
    pub combined_image_samplers: u32,
}

impl DescriptorPoolSizing {
    /// 单个 set 内 uniform buffer 的上限（per-frame + per-model）
    pub const MAX_UBOS_PER_SET: u32 = 2;
    /// 单个 set 内 combined image sampler 的上限（PBR set 最多：
    /// base color / metallic-roughness / shadow map / irradiance /
    /// prefiltered env / BRDF LUT）
    pub const MAX_SAMPLERS_PER_SET: u32 = 6;

    pub fn conservative(counts: &SceneCounts, config: &RenderConfig) -> Self {
        // 每个 slot：每个模型一个 set + shadow 共享 set + overlay set
        let sets_per_slot = counts.total_models() + 2;
        let sets = sets_per_slot * config.frames_in_flight;

        let with_headroom = |n: usize| (n as f32 * config.pool_headroom).ceil() as u32;
        Self {
            max_sets: with_headroom(sets),
            uniform_buffers: with_headroom(sets * Self::MAX_UBOS_PER_SET as usize),
            combined_image_samplers: with_headroom(sets * Self::MAX_SAMPLERS_PER_SET as usize),
        }
    }

    pub fn pool_sizes(&self) -> Vec<vk::DescriptorPoolSize> {
        vec![
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: self.uniform_buffers,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: self.combined_image_samplers,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_sane() {
        let config = RenderConfig::default();
        assert!(config.frames_in_flight >= 2);
        assert!(config.prefilter_mip_levels >= 1);
        assert!(config.pool_headroom >= 1.0);
        // 最高级 mip 的边长不能小于 1
        assert!(config.prefilter_size >> (config.prefilter_mip_levels - 1) >= 1);
    }

    #[test]
    fn test_builder_overrides() {
        let config = RenderConfig::default().with_frames_in_flight(2).with_shadow_map_size(1024);
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.shadow_map_size, 1024);
    }

    #[test]
    fn test_pool_sizing_covers_scene() {
        let config = RenderConfig::default().with_frames_in_flight(3);
        let counts = SceneCounts {
            pbr_models: 3,
            light_models: 2,
            skyboxes: 1,
        };
        let sizing = DescriptorPoolSizing::conservative(&counts, &config);

        // (6 个模型 + shadow + overlay) * 3 slot = 24 个 set，再乘 1.5 冗余
        assert_eq!(sizing.max_sets, 36);
        assert_eq!(sizing.uniform_buffers, 36 * DescriptorPoolSizing::MAX_UBOS_PER_SET);
        assert_eq!(sizing.combined_image_samplers, 36 * DescriptorPoolSizing::MAX_SAMPLERS_PER_SET);

        let sizes = sizing.pool_sizes();
        assert_eq!(sizes.len(), 2);
        assert!(sizes.iter().all(|s| s.descriptor_count > 0));
    }

    #[test]
    fn test_pool_sizing_scales_with_frames_in_flight() {
        let counts = SceneCounts {
            pbr_models: 1,
            light_models: 0,
            skyboxes: 1,
        };
        let two = DescriptorPoolSizing::conservative(&counts, &RenderConfig::default().with_frames_in_flight(2));
        let three = DescriptorPoolSizing::conservative(&counts, &RenderConfig::default().with_frames_in_flight(3));
        assert!(three.max_sets > two.max_sets);
    }
}
