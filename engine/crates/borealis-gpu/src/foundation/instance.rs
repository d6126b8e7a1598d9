use std::{
    collections::HashSet,
    ffi::{CStr, CString, c_char},
};

use ash::vk;
use itertools::Itertools;

use crate::foundation::debug_utils::GpuDebugMessenger;

const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct GpuInstance {
    ash_instance: ash::Instance,

    /// vk 基础函数的接口
    ///
    /// entry drop 时会卸载 vulkan dll，Drop::drop 在所有字段 drop 之前执行，
    /// 因此 destroy_instance 一定发生在卸载之前
    entry: ash::Entry,
}

impl Drop for GpuInstance {
    fn drop(&mut self) {
        log::info!("Destroying GpuInstance");
        unsafe {
            self.ash_instance.destroy_instance(None);
        }
    }
}

// 创建
impl GpuInstance {
    /// 设置所需的 layers 和 extensions，创建 vk instance
    ///
    /// `extra_instance_exts` 通常来自 `ash_window::enumerate_required_extensions`
    pub fn new(
        app_name: &str,
        engine_name: &str,
        extra_instance_exts: &[*const c_char],
        enable_validation: bool,
    ) -> Self {
        let entry = unsafe { ash::Entry::load() }.expect("Failed to load vulkan entry");

        let app_name = CString::new(app_name).unwrap();
        let engine_name = CString::new(engine_name).unwrap();
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3) // 版本过低时，有些函数无法正确加载
            .application_name(app_name.as_ref())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(engine_name.as_ref())
            .engine_version(vk::make_api_version(0, 1, 0, 0));

        let enabled_extensions = Self::get_extensions(&entry, extra_instance_exts);
        // 多行输出到一个字符串
        let mut enabled_extensions_str = String::new();
        for ext in &enabled_extensions {
            enabled_extensions_str.push_str(&format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) }));
        }
        log::info!("instance extensions: {}", enabled_extensions_str);

        let enabled_layers = Self::get_layers(&entry, enable_validation);
        let mut enabled_layers_str = String::new();
        for layer in &enabled_layers {
            enabled_layers_str.push_str(&format!("\n\t{:?}", unsafe { CStr::from_ptr(*layer) }));
        }
        log::info!("instance layers: {}", enabled_layers_str);

        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions)
            .enabled_layer_names(&enabled_layers);

        // 为 instance info 添加 debug messenger，覆盖 create/destroy instance 期间的消息
        let mut debug_utils_messenger_ci = GpuDebugMessenger::debug_utils_messenger_ci();
        instance_ci = instance_ci.push_next(&mut debug_utils_messenger_ci);

        let handle = unsafe { entry.create_instance(&instance_ci, None).unwrap() };

        Self {
            ash_instance: handle,
            entry,
        }
    }
}

// getters
impl GpuInstance {
    #[inline]
    pub fn ash_instance(&self) -> &ash::Instance {
        &self.ash_instance
    }

    #[inline]
    pub fn vk_instance(&self) -> vk::Instance {
        self.ash_instance.handle()
    }

    #[inline]
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }
}

// 构造过程
impl GpuInstance {
    /// instance 所需的所有 extension
    ///
    /// # return
    /// instance 所需的，且受支持的 extension
    fn get_extensions<'a>(entry: &ash::Entry, extra_instance_exts: &'a [*const c_char]) -> Vec<*const c_char> {
        let all_ext_props = unsafe { entry.enumerate_instance_extension_properties(None).unwrap() };

        // 外部传入的 extension（window system 相关）+ 基础 extension
        let mut wanted_exts: Vec<&'a CStr> =
            extra_instance_exts.iter().map(|ext| unsafe { CStr::from_ptr(*ext) }).collect_vec();
        wanted_exts.extend(Self::basic_instance_exts());

        // 检查每个 instance ext 并启用，去重
        let mut enabled_extensions: HashSet<&CStr> = HashSet::new();
        for ext in wanted_exts {
            let supported = all_ext_props
                .iter()
                .any(|supported_ext| ext == unsafe { CStr::from_ptr(supported_ext.extension_name.as_ptr()) });
            if supported {
                enabled_extensions.insert(ext);
            } else {
                panic!("Required instance extension ({:?}) is missing", ext)
            }
        }

        enabled_extensions.iter().map(|ext| ext.as_ptr()).collect_vec()
    }

    /// instance 所需的所有 layers
    fn get_layers(entry: &ash::Entry, enable_validation: bool) -> Vec<*const c_char> {
        let all_layer_props = unsafe { entry.enumerate_instance_layer_properties().unwrap() };

        // 存储所有支持的 layers
        let mut valid_layers = Vec::new();

        if enable_validation {
            let is_layer_supported = all_layer_props.iter().any(|available_layer| {
                VALIDATION_LAYER_NAME == unsafe { CStr::from_ptr(available_layer.layer_name.as_ptr()) }
            });
            if is_layer_supported {
                valid_layers.push(VALIDATION_LAYER_NAME);
            } else {
                // validation layer 是调试辅助，缺失时降级运行而不是中断
                log::warn!("validation layer {:?} is not supported, running without it", VALIDATION_LAYER_NAME);
            }
        }

        valid_layers.iter().map(|layer| layer.as_ptr()).collect_vec()
    }

    /// 必须要开启的 instance extensions
    fn basic_instance_exts() -> Vec<&'static CStr> {
        vec![
            // 这个 extension 可以单独使用，提供以下功能：
            // 1. debug messenger
            // 2. 为 vulkan object 设置 debug name
            // 3. 使用 label 标记 queue 或者 command buffer 中的一个一个 section
            vk::EXT_DEBUG_UTILS_NAME,
        ]
    }
}
