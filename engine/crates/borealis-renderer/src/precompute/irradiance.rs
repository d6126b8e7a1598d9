//! irradiance 贴图
//!
//! 漫反射部分的环境光照：对半球做余弦加权卷积，结果和视角无关，
//! 所以只需要一张低分辨率、单 mip 的立方体贴图。

use borealis_gpu::{context::GpuContext, descriptors::descriptor_pool::GpuDescriptorPool, resources::texture::GpuTexture};
use borealis_render_interface::config::RenderConfig;

use crate::{precompute::prefilter::bake_cube_map, registry::PipelinePurpose};

pub fn bake_irradiance(
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
        PipelinePurpose::Irradiance,
        config.irradiance_size,
        1,
        "irradiance",
    )
}
