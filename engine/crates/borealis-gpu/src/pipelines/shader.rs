use std::collections::HashMap;
use std::ffi::CStr;
use std::rc::Rc;

use ash::vk;

use crate::foundation::{debug_utils::GpuDebugType, device::GpuDevice};

/// spv shader 的封装，Drop 时释放
pub struct GpuShaderModule {
    handle: vk::ShaderModule,

    device: Rc<GpuDevice>,
}

impl GpuShaderModule {
    /// # param
    /// * path - spv shader 文件路径
    pub fn new(device: Rc<GpuDevice>, path: &std::path::Path) -> Self {
        let mut file = std::fs::File::open(path).unwrap_or_else(|e| panic!("failed to open shader {path:?}: {e}"));
        let shader_code = ash::util::read_spv(&mut file).unwrap();

        let shader_module_info = vk::ShaderModuleCreateInfo::default().code(&shader_code);

        unsafe {
            let shader_module = device.create_shader_module(&shader_module_info, None).unwrap();
            let shader_module = Self {
                handle: shader_module,
                device,
            };
            shader_module.device.set_debug_name(&shader_module, path.to_str().unwrap());
            shader_module
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }
}

impl Drop for GpuShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.handle, None);
        }
    }
}

impl GpuDebugType for GpuShaderModule {
    fn debug_type_name() -> &'static str {
        "GpuShaderModule"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

/// 可以存放多个 ShaderModule，使用路径进行索引
///
/// pipeline 创建完成后整个 cache 一起 drop
#[derive(Default)]
pub struct GpuShaderModuleCache {
    shader_modules: HashMap<String, GpuShaderModule>,
}

impl GpuShaderModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, device: &Rc<GpuDevice>, path: &std::path::Path) -> &GpuShaderModule {
        let path_str = path.to_str().unwrap().to_string();
        self.shader_modules.entry(path_str).or_insert_with(|| GpuShaderModule::new(device.clone(), path))
    }
}

#[derive(Clone)]
pub struct GpuShaderStageInfo {
    pub stage: vk::ShaderStageFlags,
    pub entry_point: &'static CStr,
    pub path: String,
}

impl GpuShaderStageInfo {
    #[inline]
    pub fn path(&self) -> &std::path::Path {
        std::path::Path::new(self.path.as_str())
    }
}
