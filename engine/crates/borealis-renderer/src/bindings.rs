//! 所有 pipeline 的 descriptor set 布局
//!
//! 每种 pipeline 对应一个 [`DescriptorBindings`] 实现，
//! binding 编号和 `shaders/` 下的声明一一对应。
//! 布局变更时，[`DescriptorPoolSizing`] 的每 set 上限也要跟着检查，
//! 对应的测试在本文件底部。

use ash::vk;
use borealis_gpu::descriptors::descriptor::{DescriptorBindings, GpuBindingItem};

/// PBR 模型的 set 布局
///
/// 两个 UBO（per-frame、per-model）加上六张贴图：
/// 两张材质贴图、shadow map，以及 IBL 三件套。
pub struct PbrBindings;
impl DescriptorBindings for PbrBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![
            GpuBindingItem {
                name: "frame_ubo",
                binding: 0,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "model_ubo",
                binding: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "base_color_tex",
                binding: 2,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "metallic_roughness_tex",
                binding: 3,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "shadow_map",
                binding: 4,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "irradiance_map",
                binding: 5,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "prefiltered_map",
                binding: 6,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
            GpuBindingItem {
                name: "brdf_lut",
                binding: 7,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
        ]
    }
}

/// 天空盒的 set 布局：per-frame UBO + 环境立方体贴图
pub struct SkyboxBindings;
impl DescriptorBindings for SkyboxBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![
            GpuBindingItem {
                name: "frame_ubo",
                binding: 0,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                stage_flags: vk::ShaderStageFlags::VERTEX,
                count: 1,
            },
            GpuBindingItem {
                name: "env_map",
                binding: 1,
                descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                stage_flags: vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
        ]
    }
}

/// 光源 gizmo 的 set 布局：per-frame UBO + per-model UBO
pub struct LightBindings;
impl DescriptorBindings for LightBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![
            GpuBindingItem {
                name: "frame_ubo",
                binding: 0,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                stage_flags: vk::ShaderStageFlags::VERTEX,
                count: 1,
            },
            GpuBindingItem {
                name: "model_ubo",
                binding: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                count: 1,
            },
        ]
    }
}

/// shadow pass 的共享 set 布局
///
/// light-space 矩阵在 per-frame UBO 里，模型矩阵走 push constant，
/// 所以整个 pass 只需要一个 set。
pub struct ShadowBindings;
impl DescriptorBindings for ShadowBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![GpuBindingItem {
            name: "frame_ubo",
            binding: 0,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            stage_flags: vk::ShaderStageFlags::VERTEX,
            count: 1,
        }]
    }
}

/// overlay pass 的 set 布局：只有字体图集
pub struct OverlayBindings;
impl DescriptorBindings for OverlayBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![GpuBindingItem {
            name: "font_atlas",
            binding: 0,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            stage_flags: vk::ShaderStageFlags::FRAGMENT,
            count: 1,
        }]
    }
}

/// BRDF LUT compute 的 set 布局：一个输出 storage buffer
pub struct BrdfComputeBindings;
impl DescriptorBindings for BrdfComputeBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![GpuBindingItem {
            name: "lut_out",
            binding: 0,
            descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
            stage_flags: vk::ShaderStageFlags::COMPUTE,
            count: 1,
        }]
    }
}

/// 立方体贴图烘焙（prefilter / irradiance）的 set 布局：环境贴图采样
pub struct CubeBakeBindings;
impl DescriptorBindings for CubeBakeBindings {
    fn shader_bindings() -> Vec<GpuBindingItem> {
        vec![GpuBindingItem {
            name: "env_map",
            binding: 0,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            stage_flags: vk::ShaderStageFlags::FRAGMENT,
            count: 1,
        }]
    }
}

#[cfg(test)]
mod tests {
    use borealis_render_interface::config::DescriptorPoolSizing;

    use super::*;

    fn count_of<T: DescriptorBindings>(ty: vk::DescriptorType) -> u32 {
        T::shader_bindings().iter().filter(|b| b.descriptor_type == ty).map(|b| b.count).sum()
    }

    /// 主 descriptor pool 的保守 sizing 按每 set 上限估算，
    /// 所有从主 pool 分配的布局都必须在上限之内
    #[test]
    fn test_graphics_layouts_fit_pool_sizing_limits() {
        fn assert_fits<T: DescriptorBindings>() {
            let ubos = count_of::<T>(vk::DescriptorType::UNIFORM_BUFFER);
            let samplers = count_of::<T>(vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
            assert!(ubos <= DescriptorPoolSizing::MAX_UBOS_PER_SET);
            assert!(samplers <= DescriptorPoolSizing::MAX_SAMPLERS_PER_SET);
        }

        assert_fits::<PbrBindings>();
        assert_fits::<SkyboxBindings>();
        assert_fits::<LightBindings>();
        assert_fits::<ShadowBindings>();
        assert_fits::<OverlayBindings>();
    }

    #[test]
    fn test_pbr_layout_shape() {
        let items = PbrBindings::shader_bindings();
        assert_eq!(items.len(), 8);
        assert_eq!(count_of::<PbrBindings>(vk::DescriptorType::UNIFORM_BUFFER), 2);
        assert_eq!(count_of::<PbrBindings>(vk::DescriptorType::COMBINED_IMAGE_SAMPLER), 6);
    }

    /// binding 编号必须连续且从 0 开始，和 shader 的声明方式一致
    #[test]
    fn test_bindings_are_dense_and_sorted() {
        fn assert_dense<T: DescriptorBindings>() {
            for (i, item) in T::shader_bindings().iter().enumerate() {
                assert_eq!(item.binding, i as u32, "binding {} out of order", item.name);
            }
        }

        assert_dense::<PbrBindings>();
        assert_dense::<SkyboxBindings>();
        assert_dense::<LightBindings>();
        assert_dense::<ShadowBindings>();
        assert_dense::<OverlayBindings>();
        assert_dense::<BrdfComputeBindings>();
        assert_dense::<CubeBakeBindings>();
    }

    /// 布局是纯函数：两次取回的形状完全一致
    #[test]
    fn test_layout_is_stable_across_calls() {
        let first = PbrBindings::shader_bindings();
        let second = PbrBindings::shader_bindings();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.binding, b.binding);
            assert_eq!(a.descriptor_type, b.descriptor_type);
            assert_eq!(a.stage_flags, b.stage_flags);
            assert_eq!(a.count, b.count);
        }
    }

    #[test]
    fn test_compute_layout_targets_compute_stage() {
        let items = BrdfComputeBindings::shader_bindings();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(items[0].stage_flags, vk::ShaderStageFlags::COMPUTE);
    }
}
