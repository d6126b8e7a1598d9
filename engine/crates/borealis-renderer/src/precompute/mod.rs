//! IBL 预计算
//!
//! 渲染循环开始之前一次性烘焙三张贴图：
//! - BRDF 积分 LUT：compute 写 storage buffer，回读后重新打包成 RG32F 贴图
//! - prefiltered 环境贴图：按 roughness 分 mip 的镜面卷积立方体贴图
//! - irradiance 贴图：漫反射卷积立方体贴图
//!
//! [`IblMaps`] 只能通过 [`IblMaps::bake`] 得到，PBR 的 binding set
//! 依赖这三张贴图，类型上保证了"先预计算、后建 set"的顺序。

pub mod brdf;
pub mod irradiance;
pub mod prefilter;

use std::rc::Rc;

use ash::vk;
use borealis_gpu::{
    context::GpuContext,
    descriptors::descriptor_pool::{GpuDescriptorPool, GpuDescriptorPoolCreateInfo},
    resources::texture::GpuTexture,
};
use borealis_render_interface::config::RenderConfig;

/// 预计算得到的三张 IBL 贴图
pub struct IblMaps {
    brdf_lut: GpuTexture,
    prefiltered: GpuTexture,
    irradiance: GpuTexture,
}

// new & init
impl IblMaps {
    /// 执行全部预计算，每一步各自提交并等待完成
    pub fn bake(ctx: &GpuContext, config: &RenderConfig, env_map: &GpuTexture) -> Self {
        // 预计算自己的 descriptor pool：1 个 storage set + 2 个采样 set
        let pool_sizes = vec![
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2,
            },
        ];
        let pool_ci = GpuDescriptorPoolCreateInfo::new(vk::DescriptorPoolCreateFlags::empty(), 3, pool_sizes);
        let pool = GpuDescriptorPool::new(ctx.device().clone(), Rc::new(pool_ci), "ibl-bake");

        let brdf_lut = brdf::bake_brdf_lut(ctx, config, &pool);
        let prefiltered = prefilter::bake_prefiltered_env(ctx, config, &pool, env_map);
        let irradiance = irradiance::bake_irradiance(ctx, config, &pool, env_map);

        log::info!(
            "IBL precompute done: lut {0}x{0}, prefiltered {1}x{1} ({2} mips), irradiance {3}x{3}",
            config.brdf_lut_size,
            config.prefilter_size,
            config.prefilter_mip_levels,
            config.irradiance_size
        );
        Self {
            brdf_lut,
            prefiltered,
            irradiance,
        }
    }
}

// getters
impl IblMaps {
    #[inline]
    pub fn brdf_lut(&self) -> &GpuTexture {
        &self.brdf_lut
    }

    #[inline]
    pub fn prefiltered(&self) -> &GpuTexture {
        &self.prefiltered
    }

    #[inline]
    pub fn irradiance(&self) -> &GpuTexture {
        &self.irradiance
    }
}
