//! pipeline 注册表
//!
//! 所有图形 pipeline 以用途为键集中创建，set 布局随 pipeline 一起登记。
//! 每个 pipeline 还带有一份按场景顺序排好的模型下标，pass 录制时直接遍历。

use std::rc::Rc;

use ash::vk;
use borealis_crate_tools::BorealisPath;
use borealis_gpu::{
    context::GpuContext,
    descriptors::descriptor::GpuDescriptorSetLayout,
    pipelines::graphics_pipeline::{GpuGraphicsPipeline, GpuGraphicsPipelineCreateInfo, GpuPipelineLayout},
};
use borealis_render_interface::{
    config::RenderConfig,
    uniforms::{OverlayPush, ShadowPush},
    vertex::{OverlayVertex, Vertex3D},
};

use crate::{
    bindings::{LightBindings, OverlayBindings, PbrBindings, ShadowBindings, SkyboxBindings},
    models::RenderModel,
    passes::{overlay_pass::OverlayPass, scene_pass::ScenePass, shadow_pass::ShadowPass},
};

/// pipeline 的用途，同时是 shader 文件表的键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePurpose {
    Shadow,
    Light,
    Pbr,
    Skybox,
    Overlay,
    BrdfLut,
    Prefilter,
    Irradiance,
}

impl PipelinePurpose {
    /// 用途对应的 spv 文件名：(vertex 或 compute, fragment)
    pub fn shader_files(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Shadow => ("shadow.vert.spv", None),
            Self::Light => ("light.vert.spv", Some("light.frag.spv")),
            Self::Pbr => ("pbr.vert.spv", Some("pbr.frag.spv")),
            Self::Skybox => ("skybox.vert.spv", Some("skybox.frag.spv")),
            Self::Overlay => ("overlay.vert.spv", Some("overlay.frag.spv")),
            Self::BrdfLut => ("brdf_lut.comp.spv", None),
            // 两种立方体烘焙共用一个 vertex shader
            Self::Prefilter => ("cube_bake.vert.spv", Some("prefilter.frag.spv")),
            Self::Irradiance => ("cube_bake.vert.spv", Some("irradiance.frag.spv")),
        }
    }
}

/// 编译好的 spv 的完整路径
pub fn shader_file(config: &RenderConfig, name: &str) -> String {
    BorealisPath::workspace_path().join(&config.shader_dir).join(name).to_str().unwrap().to_string()
}

/// 按 pipeline 归类的模型下标，保持场景声明的顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawLists {
    pub pbr: Vec<usize>,
    pub light: Vec<usize>,
    pub skybox: Vec<usize>,
}

impl DrawLists {
    pub fn collect(purposes: impl IntoIterator<Item = PipelinePurpose>) -> Self {
        let mut lists = Self::default();
        for (index, purpose) in purposes.into_iter().enumerate() {
            match purpose {
                PipelinePurpose::Pbr => lists.pbr.push(index),
                PipelinePurpose::Light => lists.light.push(index),
                PipelinePurpose::Skybox => lists.skybox.push(index),
                other => panic!("{other:?} is not a per-model pipeline"),
            }
        }
        lists
    }

    pub fn from_models(models: &[RenderModel]) -> Self {
        Self::collect(models.iter().map(RenderModel::pipeline_purpose))
    }
}

pub struct PipelineRegistry {
    pbr_layout: GpuDescriptorSetLayout<PbrBindings>,
    skybox_layout: GpuDescriptorSetLayout<SkyboxBindings>,
    light_layout: GpuDescriptorSetLayout<LightBindings>,
    shadow_layout: GpuDescriptorSetLayout<ShadowBindings>,
    overlay_layout: GpuDescriptorSetLayout<OverlayBindings>,

    shadow: GpuGraphicsPipeline,
    light: GpuGraphicsPipeline,
    pbr: GpuGraphicsPipeline,
    skybox: GpuGraphicsPipeline,
    overlay: GpuGraphicsPipeline,

    draw_lists: DrawLists,
}

// new & init
impl PipelineRegistry {
    pub fn new(
        ctx: &GpuContext,
        config: &RenderConfig,
        shadow_pass: &ShadowPass,
        scene_pass: &ScenePass,
        overlay_pass: &OverlayPass,
        models: &[RenderModel],
    ) -> Self {
        let device = ctx.device();
        let flags = vk::DescriptorSetLayoutCreateFlags::empty();
        let pbr_layout = GpuDescriptorSetLayout::<PbrBindings>::new(device.clone(), flags, "pbr");
        let skybox_layout = GpuDescriptorSetLayout::<SkyboxBindings>::new(device.clone(), flags, "skybox");
        let light_layout = GpuDescriptorSetLayout::<LightBindings>::new(device.clone(), flags, "light");
        let shadow_layout = GpuDescriptorSetLayout::<ShadowBindings>::new(device.clone(), flags, "shadow");
        let overlay_layout = GpuDescriptorSetLayout::<OverlayBindings>::new(device.clone(), flags, "overlay");

        // shadow：depth-only，depth bias 缓解 shadow acne
        let shadow = {
            let push = vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                size: size_of::<ShadowPush>() as u32,
            };
            let layout = Rc::new(GpuPipelineLayout::new(
                device.clone(),
                &[shadow_layout.handle()],
                std::slice::from_ref(&push),
                "shadow",
            ));
            let (vert, _) = PipelinePurpose::Shadow.shader_files();
            let mut ci = GpuGraphicsPipelineCreateInfo::default();
            ci.render_pass(shadow_pass.render_pass().handle(), 0)
                .vertex_shader_stage(&shader_file(config, vert), c"main")
                .vertex_binding(vec![Vertex3D::binding_desc()])
                .vertex_attribute(Vertex3D::attr_descs())
                .depth_bias(1.25, 1.75);
            GpuGraphicsPipeline::new(device.clone(), &ci, layout, "shadow")
        };

        let light = {
            let layout = Rc::new(GpuPipelineLayout::new(device.clone(), &[light_layout.handle()], &[], "light"));
            let (vert, frag) = PipelinePurpose::Light.shader_files();
            let mut ci = GpuGraphicsPipelineCreateInfo::default();
            ci.render_pass(scene_pass.render_pass().handle(), 0)
                .vertex_shader_stage(&shader_file(config, vert), c"main")
                .fragment_shader_stage(&shader_file(config, frag.unwrap()), c"main")
                .vertex_binding(vec![Vertex3D::binding_desc()])
                .vertex_attribute(Vertex3D::attr_descs())
                .color_blend(vec![Self::opaque_blend()], [0.0; 4]);
            GpuGraphicsPipeline::new(device.clone(), &ci, layout, "light")
        };

        let pbr = {
            let layout = Rc::new(GpuPipelineLayout::new(device.clone(), &[pbr_layout.handle()], &[], "pbr"));
            let (vert, frag) = PipelinePurpose::Pbr.shader_files();
            let mut ci = GpuGraphicsPipelineCreateInfo::default();
            ci.render_pass(scene_pass.render_pass().handle(), 0)
                .vertex_shader_stage(&shader_file(config, vert), c"main")
                .fragment_shader_stage(&shader_file(config, frag.unwrap()), c"main")
                .vertex_binding(vec![Vertex3D::binding_desc()])
                .vertex_attribute(Vertex3D::attr_descs())
                .color_blend(vec![Self::opaque_blend()], [0.0; 4]);
            GpuGraphicsPipeline::new(device.clone(), &ci, layout, "pbr")
        };

        // skybox：从立方体内部看，关掉剔除；LESS_OR_EQUAL 只填充空白像素
        let skybox = {
            let layout = Rc::new(GpuPipelineLayout::new(device.clone(), &[skybox_layout.handle()], &[], "skybox"));
            let (vert, frag) = PipelinePurpose::Skybox.shader_files();
            let mut ci = GpuGraphicsPipelineCreateInfo::default();
            ci.render_pass(scene_pass.render_pass().handle(), 0)
                .vertex_shader_stage(&shader_file(config, vert), c"main")
                .fragment_shader_stage(&shader_file(config, frag.unwrap()), c"main")
                .vertex_binding(vec![Vertex3D::binding_desc()])
                .vertex_attribute(Vertex3D::attr_descs())
                .cull_mode(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE)
                .depth_test(Some(vk::CompareOp::LESS_OR_EQUAL), false, false)
                .color_blend(vec![Self::opaque_blend()], [0.0; 4]);
            GpuGraphicsPipeline::new(device.clone(), &ci, layout, "skybox")
        };

        // overlay：没有 depth attachment，alpha 混合
        let overlay = {
            let push = vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::VERTEX,
                offset: 0,
                size: size_of::<OverlayPush>() as u32,
            };
            let layout = Rc::new(GpuPipelineLayout::new(
                device.clone(),
                &[overlay_layout.handle()],
                std::slice::from_ref(&push),
                "overlay",
            ));
            let (vert, frag) = PipelinePurpose::Overlay.shader_files();
            let mut ci = GpuGraphicsPipelineCreateInfo::default();
            ci.render_pass(overlay_pass.render_pass().handle(), 0)
                .vertex_shader_stage(&shader_file(config, vert), c"main")
                .fragment_shader_stage(&shader_file(config, frag.unwrap()), c"main")
                .vertex_binding(vec![OverlayVertex::binding_desc()])
                .vertex_attribute(OverlayVertex::attr_descs())
                .cull_mode(vk::CullModeFlags::NONE, vk::FrontFace::COUNTER_CLOCKWISE)
                .depth_test(None, false, false)
                .color_blend(vec![Self::alpha_blend()], [0.0; 4]);
            GpuGraphicsPipeline::new(device.clone(), &ci, layout, "overlay")
        };

        Self {
            pbr_layout,
            skybox_layout,
            light_layout,
            shadow_layout,
            overlay_layout,
            shadow,
            light,
            pbr,
            skybox,
            overlay,
            draw_lists: DrawLists::from_models(models),
        }
    }

    fn opaque_blend() -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::FALSE,
            color_write_mask: vk::ColorComponentFlags::RGBA,
            ..Default::default()
        }
    }

    fn alpha_blend() -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::TRUE,
            src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
            dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            color_blend_op: vk::BlendOp::ADD,
            src_alpha_blend_factor: vk::BlendFactor::ONE,
            dst_alpha_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            alpha_blend_op: vk::BlendOp::ADD,
            color_write_mask: vk::ColorComponentFlags::RGBA,
        }
    }
}

// getters
impl PipelineRegistry {
    #[inline]
    pub fn shadow_pipeline(&self) -> &GpuGraphicsPipeline {
        &self.shadow
    }

    #[inline]
    pub fn light_pipeline(&self) -> &GpuGraphicsPipeline {
        &self.light
    }

    #[inline]
    pub fn pbr_pipeline(&self) -> &GpuGraphicsPipeline {
        &self.pbr
    }

    #[inline]
    pub fn skybox_pipeline(&self) -> &GpuGraphicsPipeline {
        &self.skybox
    }

    #[inline]
    pub fn overlay_pipeline(&self) -> &GpuGraphicsPipeline {
        &self.overlay
    }

    #[inline]
    pub fn pbr_layout(&self) -> &GpuDescriptorSetLayout<PbrBindings> {
        &self.pbr_layout
    }

    #[inline]
    pub fn skybox_layout(&self) -> &GpuDescriptorSetLayout<SkyboxBindings> {
        &self.skybox_layout
    }

    #[inline]
    pub fn light_layout(&self) -> &GpuDescriptorSetLayout<LightBindings> {
        &self.light_layout
    }

    #[inline]
    pub fn shadow_layout(&self) -> &GpuDescriptorSetLayout<ShadowBindings> {
        &self.shadow_layout
    }

    #[inline]
    pub fn overlay_layout(&self) -> &GpuDescriptorSetLayout<OverlayBindings> {
        &self.overlay_layout
    }

    #[inline]
    pub fn pbr_models(&self) -> &[usize] {
        &self.draw_lists.pbr
    }

    #[inline]
    pub fn light_models(&self) -> &[usize] {
        &self.draw_lists.light
    }

    #[inline]
    pub fn skybox_models(&self) -> &[usize] {
        &self.draw_lists.skybox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_table_is_complete() {
        let purposes = [
            PipelinePurpose::Shadow,
            PipelinePurpose::Light,
            PipelinePurpose::Pbr,
            PipelinePurpose::Skybox,
            PipelinePurpose::Overlay,
            PipelinePurpose::BrdfLut,
            PipelinePurpose::Prefilter,
            PipelinePurpose::Irradiance,
        ];
        for purpose in purposes {
            let (first, frag) = purpose.shader_files();
            assert!(first.ends_with(".spv"));
            if let Some(frag) = frag {
                assert!(frag.ends_with(".frag.spv"));
            }
        }
        // depth-only 和 compute 没有 fragment stage
        assert!(PipelinePurpose::Shadow.shader_files().1.is_none());
        assert!(PipelinePurpose::BrdfLut.shader_files().1.is_none());
        assert!(PipelinePurpose::BrdfLut.shader_files().0.ends_with(".comp.spv"));
    }

    #[test]
    fn test_draw_lists_keep_scene_order() {
        let lists = DrawLists::collect([
            PipelinePurpose::Pbr,
            PipelinePurpose::Light,
            PipelinePurpose::Pbr,
            PipelinePurpose::Skybox,
            PipelinePurpose::Light,
        ]);
        assert_eq!(lists.pbr, vec![0, 2]);
        assert_eq!(lists.light, vec![1, 4]);
        assert_eq!(lists.skybox, vec![3]);
    }

    #[test]
    #[should_panic(expected = "not a per-model pipeline")]
    fn test_draw_lists_reject_non_model_purpose() {
        let _ = DrawLists::collect([PipelinePurpose::Overlay]);
    }
}
