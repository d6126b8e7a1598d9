//! 渲染模型：场景描述解码之后的 GPU 形态
//!
//! 三种模型各自持有 buffer、贴图和每 slot 的 binding set，
//! [`RenderModel`] 在它们之上做 tagged dispatch。加载分两步：
//! `upload` 建好 GPU 资源，`create_binding_sets` 在 IBL 预计算
//! 完成之后补建 binding set（PBR 的 set 需要引用 IBL 贴图）。

pub mod light;
pub mod pbr;
pub mod skybox;

use ash::vk;
use borealis_gpu::{
    commands::command_buffer::GpuCommandBuffer,
    context::GpuContext,
    descriptors::descriptor_pool::GpuDescriptorPool,
    resources::texture::GpuTexture,
};
use borealis_render_interface::{config::RenderConfig, frame_counter::FrameLabel, uniforms::PointLightGpu};
use borealis_scene::{
    descriptor::{ModelDesc, ModelKind},
    loader::{LoadedModel, LoadedPayload},
    mesh::MeshRegistry,
};
use glam::Mat4;

use crate::{
    frame_uniforms::FrameUniforms,
    models::{light::LightModel, pbr::PbrModel, skybox::SkyboxModel},
    precompute::IblMaps,
    registry::{PipelinePurpose, PipelineRegistry},
};

/// binding set 建立时需要引用的共享资源
///
/// 持有 [`IblMaps`] 的引用，从而保证 PBR 的 binding set
/// 只能在 IBL 预计算完成之后建立。
pub struct SharedBindings<'a> {
    pub frame_uniforms: &'a FrameUniforms,
    pub shadow_map: &'a GpuTexture,
    pub ibl: &'a IblMaps,
    pub frames_in_flight: usize,
}

/// 场景中的一个可渲染模型
pub enum RenderModel {
    Skybox(SkyboxModel),
    Pbr(PbrModel),
    Light(LightModel),
}

// new & init
impl RenderModel {
    /// 把加载产物上传到 GPU；binding set 留到 IBL 预计算之后
    pub fn upload(
        ctx: &GpuContext,
        config: &RenderConfig,
        desc: &ModelDesc,
        loaded: LoadedModel,
        meshes: &MeshRegistry,
    ) -> Self {
        match loaded.payload {
            LoadedPayload::Skybox { size, faces } => Self::Skybox(SkyboxModel::upload(ctx, desc, size, &faces)),
            LoadedPayload::Pbr {
                mesh,
                base_color,
                metallic_roughness,
            } => {
                let ModelKind::Pbr { material, .. } = &desc.kind else {
                    panic!("model '{}' has a pbr payload but a non-pbr descriptor", desc.name);
                };
                let mesh = meshes
                    .get(mesh)
                    .unwrap_or_else(|| panic!("model '{}' references a mesh missing from the registry", desc.name));
                Self::Pbr(PbrModel::upload(ctx, config, desc, material, mesh, base_color, metallic_roughness))
            }
            LoadedPayload::Light => {
                let ModelKind::Light { light } = &desc.kind else {
                    panic!("model '{}' has a light payload but a non-light descriptor", desc.name);
                };
                Self::Light(LightModel::upload(ctx, config, desc, light))
            }
        }
    }

    /// 建立每 slot 的 binding set
    pub fn create_binding_sets(
        &mut self,
        ctx: &GpuContext,
        pool: &GpuDescriptorPool,
        registry: &PipelineRegistry,
        shared: &SharedBindings,
    ) {
        match self {
            Self::Skybox(model) => model.create_binding_sets(ctx, pool, registry.skybox_layout(), shared),
            Self::Pbr(model) => model.create_binding_sets(ctx, pool, registry.pbr_layout(), shared),
            Self::Light(model) => model.create_binding_sets(ctx, pool, registry.light_layout(), shared),
        }
    }
}

// getters
impl RenderModel {
    pub fn name(&self) -> &str {
        match self {
            Self::Skybox(model) => model.name(),
            Self::Pbr(model) => model.name(),
            Self::Light(model) => model.name(),
        }
    }

    pub fn hidden(&self) -> bool {
        match self {
            Self::Skybox(model) => model.hidden(),
            Self::Pbr(model) => model.hidden(),
            Self::Light(model) => model.hidden(),
        }
    }

    /// 模型在场景 pass 中使用的 pipeline
    #[inline]
    pub fn pipeline_purpose(&self) -> PipelinePurpose {
        match self {
            Self::Skybox(_) => PipelinePurpose::Skybox,
            Self::Pbr(_) => PipelinePurpose::Pbr,
            Self::Light(_) => PipelinePurpose::Light,
        }
    }

    #[inline]
    pub fn as_pbr(&self) -> Option<&PbrModel> {
        match self {
            Self::Pbr(model) => Some(model),
            _ => None,
        }
    }

    /// 天空盒的环境贴图，IBL 预计算的输入
    pub fn env_map(&self) -> Option<&GpuTexture> {
        match self {
            Self::Skybox(model) => Some(model.env_map()),
            _ => None,
        }
    }

    /// 点光源的 GPU 形态，非点光源返回 None
    pub fn point_light(&self) -> Option<PointLightGpu> {
        match self {
            Self::Light(model) => model.point_light_gpu(),
            _ => None,
        }
    }
}

// tools
impl RenderModel {
    pub fn set_hidden(&mut self, hidden: bool) {
        match self {
            Self::Skybox(model) => model.set_hidden(hidden),
            Self::Pbr(model) => model.set_hidden(hidden),
            Self::Light(model) => model.set_hidden(hidden),
        }
    }

    /// 更新模型变换，下一次 `update_ubo` 时生效
    pub fn set_transform(&mut self, transform: Mat4) {
        match self {
            // 天空盒没有模型变换
            Self::Skybox(_) => {}
            Self::Pbr(model) => model.set_transform(transform),
            Self::Light(model) => model.set_transform(transform),
        }
    }

    /// 把本帧的 per-model 数据写进 slot 对应的 UBO 区间
    pub fn update_ubo(&self, label: FrameLabel) {
        match self {
            // 天空盒只依赖 per-frame UBO
            Self::Skybox(_) => {}
            Self::Pbr(model) => model.update_ubo(label),
            Self::Light(model) => model.update_ubo(label),
        }
    }

    /// scene pass 里的绘制：绑定资源并发出 indexed draw
    ///
    /// 调用方必须已经绑好了与模型类型匹配的 pipeline
    pub fn record_scene_draw(&self, cmd: &GpuCommandBuffer, layout: vk::PipelineLayout, label: FrameLabel) {
        match self {
            Self::Skybox(model) => model.record_draw(cmd, layout, label),
            Self::Pbr(model) => model.record_draw(cmd, layout, label),
            Self::Light(model) => model.record_draw(cmd, layout, label),
        }
    }
}
