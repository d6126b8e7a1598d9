use std::{convert::identity, ffi::CStr, rc::Rc};

use ash::vk;
use itertools::Itertools;

use crate::{
    foundation::{debug_utils::GpuDebugType, device::GpuDevice},
    pipelines::shader::{GpuShaderModuleCache, GpuShaderStageInfo},
};

pub struct GpuPipelineLayout {
    handle: vk::PipelineLayout,

    device: Rc<GpuDevice>,
}

impl GpuPipelineLayout {
    pub fn new(
        device: Rc<GpuDevice>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
        debug_name: impl AsRef<str>,
    ) -> Self {
        let pipeline_layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);
        let handle = unsafe { device.create_pipeline_layout(&pipeline_layout_create_info, None).unwrap() };
        let layout = GpuPipelineLayout { handle, device };
        layout.device.set_debug_name(&layout, debug_name);
        layout
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }
}

impl Drop for GpuPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.handle, None);
        }
    }
}

impl GpuDebugType for GpuPipelineLayout {
    fn debug_type_name() -> &'static str {
        "GpuPipelineLayout"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

pub struct GpuGraphicsPipeline {
    pipeline: vk::Pipeline,

    /// 因为多个 pipeline 可以使用同一个 pipeline layout，所以这里使用 Rc
    pipeline_layout: Rc<GpuPipelineLayout>,

    device: Rc<GpuDevice>,
}

impl GpuGraphicsPipeline {
    pub fn new(
        device: Rc<GpuDevice>,
        create_info: &GpuGraphicsPipelineCreateInfo,
        pipeline_layout: Rc<GpuPipelineLayout>,
        debug_name: &str,
    ) -> Self {
        assert_ne!(create_info.render_pass, vk::RenderPass::null(), "graphics pipeline needs a render pass");

        let mut shader_modules_cache = GpuShaderModuleCache::new();
        let shader_stages_info = create_info
            .shader_stages
            .iter()
            .map(|stage| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(shader_modules_cache.get_or_load(&device, stage.path()).handle())
                    .name(stage.entry_point)
            })
            .collect_vec();

        // 顶点和 index
        let vertex_input_state_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&create_info.vertex_binding_desc)
            .vertex_attribute_descriptions(&create_info.vertex_attribute_desc);

        let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(create_info.primitive_topology)
            .primitive_restart_enable(false);

        // viewport 和 scissor 具体值由 dynamic 决定，但是数量由该 create info 决定
        let viewport_info = vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count: 1,
            ..Default::default()
        };

        // MSAA 配置
        let msaa_info = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(create_info.enable_sample_shading)
            .rasterization_samples(create_info.msaa_sample);

        // 混合设置：需要为每个 color attachment 分别指定
        let color_blend_info = create_info.blend_info.attachments(&create_info.color_attach_blend_states);

        let dynamic_state_info =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&create_info.dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages_info)
            .vertex_input_state(&vertex_input_state_info)
            .input_assembly_state(&input_assembly_info)
            .viewport_state(&viewport_info)
            .rasterization_state(&create_info.rasterize_state_info)
            .multisample_state(&msaa_info)
            .color_blend_state(&color_blend_info)
            .depth_stencil_state(&create_info.depth_stencil_info)
            .layout(pipeline_layout.handle)
            .dynamic_state(&dynamic_state_info)
            .render_pass(create_info.render_pass)
            .subpass(create_info.subpass);

        let pipeline = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
                .unwrap()[0]
        };
        let pipeline = GpuGraphicsPipeline {
            pipeline,
            pipeline_layout,
            device,
        };

        pipeline.device.set_debug_name(&pipeline, debug_name);

        pipeline
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout.handle
    }
}

impl Drop for GpuGraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

impl GpuDebugType for GpuGraphicsPipeline {
    fn debug_type_name() -> &'static str {
        "GpuGraphicsPipeline"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.pipeline
    }
}

pub struct GpuGraphicsPipelineCreateInfo {
    /// pipeline 所属的 render pass 以及 subpass index
    render_pass: vk::RenderPass,
    subpass: u32,

    shader_stages: Vec<GpuShaderStageInfo>,

    vertex_binding_desc: Vec<vk::VertexInputBindingDescription>,
    vertex_attribute_desc: Vec<vk::VertexInputAttributeDescription>,

    primitive_topology: vk::PrimitiveTopology,

    rasterize_state_info: vk::PipelineRasterizationStateCreateInfo<'static>,

    msaa_sample: vk::SampleCountFlags,
    enable_sample_shading: bool,

    color_attach_blend_states: Vec<vk::PipelineColorBlendAttachmentState>,
    blend_info: vk::PipelineColorBlendStateCreateInfo<'static>,

    depth_stencil_info: vk::PipelineDepthStencilStateCreateInfo<'static>,

    dynamic_states: Vec<vk::DynamicState>,
}

impl Default for GpuGraphicsPipelineCreateInfo {
    fn default() -> Self {
        Self {
            render_pass: vk::RenderPass::null(),
            subpass: 0,

            shader_stages: vec![],

            vertex_binding_desc: vec![],
            vertex_attribute_desc: vec![],

            primitive_topology: vk::PrimitiveTopology::TRIANGLE_LIST,

            rasterize_state_info: vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(vk::CullModeFlags::BACK)
                // 按照 OpenGL 的传统，将 CCW 视为 front face
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .depth_bias_enable(false),
            msaa_sample: vk::SampleCountFlags::TYPE_1,
            enable_sample_shading: false,

            color_attach_blend_states: vec![],
            blend_info: vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .blend_constants([0.0, 0.0, 0.0, 0.0]),

            depth_stencil_info: vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(true)
                .depth_compare_op(vk::CompareOp::LESS)
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false),
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
        }
    }
}

// builder
impl GpuGraphicsPipelineCreateInfo {
    /// builder
    #[inline]
    pub fn render_pass(&mut self, render_pass: vk::RenderPass, subpass: u32) -> &mut Self {
        self.render_pass = render_pass;
        self.subpass = subpass;
        self
    }

    /// builder
    #[inline]
    pub fn vertex_shader_stage(&mut self, path: &str, entry_point: &'static CStr) -> &mut Self {
        self.shader_stages.push(GpuShaderStageInfo {
            stage: vk::ShaderStageFlags::VERTEX,
            entry_point,
            path: path.to_string(),
        });
        self
    }

    /// builder
    #[inline]
    pub fn fragment_shader_stage(&mut self, path: &str, entry_point: &'static CStr) -> &mut Self {
        self.shader_stages.push(GpuShaderStageInfo {
            stage: vk::ShaderStageFlags::FRAGMENT,
            entry_point,
            path: path.to_string(),
        });
        self
    }

    /// builder
    #[inline]
    pub fn vertex_binding(&mut self, bindings: Vec<vk::VertexInputBindingDescription>) -> &mut Self {
        self.vertex_binding_desc = bindings;
        self
    }

    /// builder
    #[inline]
    pub fn vertex_attribute(&mut self, attributes: Vec<vk::VertexInputAttributeDescription>) -> &mut Self {
        self.vertex_attribute_desc = attributes;
        self
    }

    /// 为每个 color attachment 指定 blend 操作
    #[inline]
    pub fn color_blend(
        &mut self,
        states: Vec<vk::PipelineColorBlendAttachmentState>,
        blend_constants: [f32; 4],
    ) -> &mut Self {
        self.color_attach_blend_states = states;
        self.blend_info.blend_constants = blend_constants;
        self.blend_info.logic_op_enable = vk::FALSE;
        self
    }

    #[inline]
    pub fn cull_mode(&mut self, mode: vk::CullModeFlags, front_face: vk::FrontFace) -> &mut Self {
        self.rasterize_state_info.cull_mode = mode;
        self.rasterize_state_info.front_face = front_face;
        self
    }

    /// shadow pass 用 depth bias 减轻 shadow acne
    #[inline]
    pub fn depth_bias(&mut self, constant_factor: f32, slope_factor: f32) -> &mut Self {
        self.rasterize_state_info.depth_bias_enable = vk::TRUE;
        self.rasterize_state_info.depth_bias_constant_factor = constant_factor;
        self.rasterize_state_info.depth_bias_slope_factor = slope_factor;
        self
    }

    #[inline]
    pub fn depth_test(
        &mut self,
        depth_test_op: Option<vk::CompareOp>,
        depth_write: bool,
        depth_bounds_test: bool,
    ) -> &mut Self {
        self.depth_stencil_info.depth_test_enable = depth_test_op.map_or(vk::FALSE, |_| vk::TRUE);
        self.depth_stencil_info.depth_compare_op = depth_test_op.map_or(vk::CompareOp::NEVER, identity);
        self.depth_stencil_info.depth_write_enable = if depth_write { vk::TRUE } else { vk::FALSE };
        self.depth_stencil_info.depth_bounds_test_enable = if depth_bounds_test { vk::TRUE } else { vk::FALSE };
        self
    }
}
