use std::{ffi::CStr, rc::Rc};

use ash::vk;

use crate::{
    foundation::{debug_utils::GpuDebugType, device::GpuDevice},
    pipelines::{graphics_pipeline::GpuPipelineLayout, shader::GpuShaderModule},
};

/// 单个 compute shader 的 pipeline
pub struct GpuComputePipeline {
    pipeline: vk::Pipeline,
    pipeline_layout: Rc<GpuPipelineLayout>,

    device: Rc<GpuDevice>,
}

impl GpuComputePipeline {
    pub fn new(
        device: Rc<GpuDevice>,
        shader_path: &str,
        entry_point: &'static CStr,
        pipeline_layout: Rc<GpuPipelineLayout>,
        debug_name: &str,
    ) -> Self {
        let shader_module = GpuShaderModule::new(device.clone(), std::path::Path::new(shader_path));
        let stage_info = vk::PipelineShaderStageCreateInfo::default()
            .module(shader_module.handle())
            .stage(vk::ShaderStageFlags::COMPUTE)
            .name(entry_point);

        let pipeline_ci = vk::ComputePipelineCreateInfo::default().stage(stage_info).layout(pipeline_layout.handle());
        let pipeline = unsafe {
            device
                .create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_ci), None)
                .unwrap()[0]
        };

        let pipeline = Self {
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
        self.pipeline_layout.handle()
    }
}

impl Drop for GpuComputePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

impl GpuDebugType for GpuComputePipeline {
    fn debug_type_name() -> &'static str {
        "GpuComputePipeline"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.pipeline
    }
}
